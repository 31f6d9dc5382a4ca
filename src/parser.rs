//! The parser engine.
//!
//! Orchestrates header detection, cross-reference discovery, trailer
//! chaining, the rebuild fallback, encryption setup and lazy object
//! materialization. The engine owns the cross-reference table and the
//! cache of parsed object streams; materialized objects flow out to the
//! caller, which is expected to cache and re-serve them.

use crate::PdfData;
use crate::crypto::SecurityHandler;
use crate::lexer::{DEFAULT_READ_BUFFER_SIZE, Lexer, ParseMode, parse_i64, parse_u32};
use crate::linearized::LinearizedHeader;
use crate::object::dict::keys::{
    ENCRYPT, FILTER, ID, INDEX, INFO, METADATA, PREV, ROOT, SIZE, TYPE, W, XREF_STM,
};
use crate::object::{Dict, Object, ObjectId};
use crate::object_stream::ObjectStream;
use crate::xref::{
    CrossRefTable, MAX_OBJECT_NUMBER, MAX_XREF_SIZE, NO_TRAILER_OBJECT_NUMBER, ObjectInfo,
};
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// The size of `%PDF-1.7\n`.
const PDF_HEADER_SIZE: u64 = 9;

/// How far from the end of the file `startxref` may be.
const STARTXREF_WINDOW: u64 = 4096;

/// The fixed size of one classic cross-reference entry.
const XREF_ENTRY_LEN: usize = 20;

/// Read-buffer size while scanning the whole file during a rebuild.
const REBUILD_BUFFER_SIZE: usize = 4096;

/// The required number of fields in a `/W` array.
const MIN_FIELD_COUNT: usize = 3;

/// The three failure kinds a parse can end with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ParseError {
    /// The file structure is broken beyond repair.
    Format,
    /// The document uses a security handler other than `/Standard`.
    Handler,
    /// The standard security handler rejected the password.
    Password,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Format => write!(f, "malformed file structure"),
            ParseError::Handler => write!(f, "unsupported security handler"),
            ParseError::Password => write!(f, "password did not authenticate"),
        }
    }
}

impl std::error::Error for ParseError {}

struct CrossRefObjData {
    obj_num: u32,
    info: ObjectInfo,
}

struct CrossRefStreamIndexEntry {
    start_obj_num: u32,
    obj_count: u32,
}

/// Removes its value from the shared set when dropped, so the guard holds
/// on every exit path.
struct ScopedSetInsertion {
    set: Rc<RefCell<FxHashSet<u32>>>,
    value: u32,
}

impl ScopedSetInsertion {
    fn new(set: &Rc<RefCell<FxHashSet<u32>>>, value: u32) -> Self {
        set.borrow_mut().insert(value);
        Self {
            set: set.clone(),
            value,
        }
    }
}

impl Drop for ScopedSetInsertion {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.value);
    }
}

/// The parser for one document.
pub struct Parser {
    lexer: Lexer,
    password: Vec<u8>,
    cross_ref_table: CrossRefTable,
    object_stream_cache: FxHashMap<u32, Rc<ObjectStream>>,
    security_handler: Option<SecurityHandler>,
    linearized: Option<LinearizedHeader>,
    file_version: u8,
    last_xref_offset: u64,
    xref_stream: bool,
    xref_table_rebuilt: bool,
    has_parsed: bool,
    metadata_obj_num: u32,
    parsing_obj_nums: Rc<RefCell<FxHashSet<u32>>>,
}

impl Parser {
    /// Create a parser over the given bytes. Nothing is read until one of
    /// the `start_*` methods runs.
    pub fn new(data: PdfData) -> Self {
        Self {
            lexer: Lexer::new(data),
            password: vec![],
            cross_ref_table: CrossRefTable::new(),
            object_stream_cache: FxHashMap::default(),
            security_handler: None,
            linearized: None,
            file_version: 0,
            last_xref_offset: 0,
            xref_stream: false,
            xref_table_rebuilt: false,
            has_parsed: false,
            metadata_obj_num: 0,
            parsing_obj_nums: Rc::new(RefCell::new(FxHashSet::default())),
        }
    }

    /// Open the document: locate the header and the cross-reference data,
    /// set up decryption, and resolve the document root.
    pub fn start_parse(&mut self, password: &[u8]) -> Result<(), ParseError> {
        if self.init_lexer().is_none() {
            return Err(ParseError::Format);
        }
        self.password = password.to_vec();

        self.start_parse_internal()
    }

    /// Open only the first-page section of a linearized document. Falls
    /// back to [`Parser::start_parse`] behavior when the file is not
    /// linearized. The main cross-reference table can be brought in later
    /// with [`Parser::load_linearized_main_xref_table`].
    pub fn start_linearized_parse(&mut self, password: &[u8]) -> Result<(), ParseError> {
        debug_assert!(!self.has_parsed);
        self.password = password.to_vec();
        self.xref_stream = false;
        self.last_xref_offset = 0;

        if self.init_lexer().is_none() {
            return Err(ParseError::Format);
        }

        self.linearized = LinearizedHeader::parse(&mut self.lexer);
        let Some(first_xref) = self.linearized.as_ref().map(|l| l.last_xref_offset()) else {
            return self.start_parse_internal();
        };

        self.has_parsed = true;
        self.last_xref_offset = first_xref;

        let first_xref_offset = self.last_xref_offset;
        let loaded_xref_table = self.load_cross_ref_table(first_xref_offset, false).is_some();
        if !loaded_xref_table {
            let mut offset = first_xref_offset;
            if self.load_cross_ref_stream(&mut offset, true).is_none() {
                if !self.rebuild_cross_ref() {
                    return Err(ParseError::Format);
                }
                self.xref_table_rebuilt = true;
                self.last_xref_offset = 0;
            }
        }

        if loaded_xref_table {
            let Some(trailer) = self.load_trailer() else {
                return Ok(());
            };
            self.cross_ref_table
                .set_trailer(trailer, NO_TRAILER_OBJECT_NUMBER);

            let xref_size = self.trailer_int(SIZE).unwrap_or(0);
            if xref_size > 0 {
                // A declared size that disagrees with the entries makes
                // the first-page table untrustworthy.
                let expected_last_obj_num = (xref_size - 1) as u64;
                if u64::from(self.last_obj_num()) != expected_last_obj_num {
                    if !self.rebuild_cross_ref() {
                        return Err(ParseError::Format);
                    }
                    self.xref_table_rebuilt = true;
                }
            }
        }

        self.finish_parse()
    }

    /// Load the main cross-reference table of a linearized document, by
    /// walking `/Prev` from the first-page trailer to completion.
    pub fn load_linearized_main_xref_table(&mut self) -> Result<(), ParseError> {
        if self.cross_ref_table.trailer().is_none() {
            return Err(ParseError::Format);
        }

        let prev = self.trailer_int(PREV).unwrap_or(0);
        if prev < 0 {
            return Err(ParseError::Format);
        }
        if prev == 0 {
            return Ok(());
        }
        let main_xref_offset = prev as u64;

        // Cross-reference streams must not be decrypted; suspending the
        // metadata exemption makes object number 0 exempt throughout.
        let saved_metadata_obj_num = self.metadata_obj_num;
        self.metadata_obj_num = 0;
        self.object_stream_cache.clear();

        let loaded = self
            .load_linearized_all_cross_ref_table(main_xref_offset)
            .is_some()
            || self
                .load_linearized_all_cross_ref_stream(main_xref_offset)
                .is_some();

        self.metadata_obj_num = saved_metadata_obj_num;

        if !loaded {
            self.last_xref_offset = 0;
            return Err(ParseError::Format);
        }

        Ok(())
    }

    fn init_lexer(&mut self) -> Option<()> {
        let header_offset = self.lexer.find_header_offset()?;
        if self.lexer.source_size() < header_offset + PDF_HEADER_SIZE {
            return None;
        }
        self.lexer.rebase(header_offset);

        self.parse_file_version()
    }

    fn parse_file_version(&mut self) -> Option<()> {
        self.file_version = 0;

        let major = self.lexer.get_char_at(5)?;
        if major.is_ascii_digit() {
            self.file_version = (major - b'0') * 10;
        }

        let minor = self.lexer.get_char_at(7)?;
        if minor.is_ascii_digit() {
            self.file_version += minor - b'0';
        }

        Some(())
    }

    fn start_parse_internal(&mut self) -> Result<(), ParseError> {
        debug_assert!(!self.has_parsed);
        debug_assert!(!self.xref_table_rebuilt);
        self.has_parsed = true;
        self.xref_stream = false;

        self.last_xref_offset = self.parse_start_xref();
        if self.last_xref_offset >= PDF_HEADER_SIZE {
            if self
                .load_all_cross_ref_tables_and_streams(self.last_xref_offset)
                .is_none()
            {
                if !self.rebuild_cross_ref() {
                    return Err(ParseError::Format);
                }
                self.xref_table_rebuilt = true;
                self.last_xref_offset = 0;
            }
        } else {
            if !self.rebuild_cross_ref() {
                return Err(ParseError::Format);
            }
            self.xref_table_rebuilt = true;
        }

        self.finish_parse()
    }

    /// The tail shared by the normal and the linearized open path: set up
    /// encryption and resolve the root, with one rebuild retry.
    fn finish_parse(&mut self) -> Result<(), ParseError> {
        self.set_encrypt_handler()?;

        if self.root_dict().is_none() {
            if self.xref_table_rebuilt {
                return Err(ParseError::Format);
            }

            self.security_handler = None;
            if !self.rebuild_cross_ref() {
                return Err(ParseError::Format);
            }
            self.xref_table_rebuilt = true;

            self.set_encrypt_handler()?;
            if self.root_dict().is_none() {
                return Err(ParseError::Format);
            }
        }

        let metadata_exempt = self
            .security_handler
            .as_ref()
            .is_some_and(|handler| !handler.is_metadata_encrypted());
        if metadata_exempt
            && let Some(metadata) = self.root_dict().and_then(|root| root.get_ref(METADATA))
        {
            self.metadata_obj_num = metadata.obj_num;
        }

        Ok(())
    }

    /// Locate the `startxref` keyword near the end of the file and read
    /// the offset after it. Returns 0 when anything is off.
    fn parse_start_xref(&mut self) -> u64 {
        const KEYWORD: &[u8] = b"startxref";

        let document_size = self.lexer.document_size();
        self.lexer
            .set_pos(document_size.saturating_sub(KEYWORD.len() as u64));
        if !self.lexer.backwards_search_to_word(KEYWORD, STARTXREF_WINDOW) {
            return 0;
        }

        // Skip the keyword itself.
        self.lexer.get_keyword();

        let offset_word = self.lexer.get_next_word();
        if !offset_word.is_number || offset_word.word.is_empty() {
            return 0;
        }

        match parse_i64(&offset_word.word) {
            Some(offset) if offset >= 0 && (offset as u64) < document_size => offset as u64,
            _ => 0,
        }
    }

    fn set_encrypt_handler(&mut self) -> Result<(), ParseError> {
        self.security_handler = None;

        let Some(trailer) = self.cross_ref_table.trailer() else {
            return Err(ParseError::Format);
        };
        let encrypt = trailer.get(ENCRYPT).cloned();
        let file_id = trailer
            .get_array(ID)
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_string())
            .map(|id| id.as_bytes().to_vec());

        let encrypt_dict = match encrypt {
            None => return Ok(()),
            Some(Object::Dict(dict)) => dict,
            Some(Object::Reference(r)) => match self.parse_indirect_object(r.obj_num) {
                Some(Object::Dict(dict)) => dict,
                _ => return Ok(()),
            },
            Some(_) => return Ok(()),
        };

        if encrypt_dict.get_name(FILTER).map(|n| n.as_bytes()) != Some(b"Standard") {
            return Err(ParseError::Handler);
        }

        match SecurityHandler::on_init(encrypt_dict, file_id.as_deref(), &self.password) {
            Some(handler) => {
                self.security_handler = Some(handler);
                Ok(())
            }
            None => Err(ParseError::Password),
        }
    }

    /// Load the primary cross-reference section and everything it chains
    /// to through `/Prev`.
    fn load_all_cross_ref_tables_and_streams(&mut self, xref_offset: u64) -> Option<()> {
        let is_xref_stream = self.load_cross_ref_table(xref_offset, true).is_none();
        if is_xref_stream {
            let mut offset_copy = xref_offset;
            self.load_cross_ref_stream(&mut offset_copy, true)?;
        } else {
            let trailer = self.load_trailer()?;
            self.cross_ref_table
                .set_trailer(trailer, NO_TRAILER_OBJECT_NUMBER);

            let xref_size = self.trailer_int(SIZE).unwrap_or(0);
            if xref_size > 0 && xref_size <= MAX_XREF_SIZE as i64 {
                self.cross_ref_table.set_object_map_size(xref_size as u32);
            }
        }

        // Two parallel chronologies, oldest first after the walk.
        let mut xref_list: Vec<u64>;
        let mut xref_stream_list: Vec<u64>;
        if is_xref_stream {
            xref_list = vec![0];
            xref_stream_list = vec![xref_offset];
        } else {
            xref_list = vec![xref_offset];
            xref_stream_list = vec![self.trailer_int(XREF_STM).unwrap_or(0).max(0) as u64];
        }

        let first_prev = self.trailer_int(PREV).unwrap_or(0);
        self.find_all_cross_reference_tables_and_stream(
            xref_offset,
            first_prev,
            &mut xref_list,
            &mut xref_stream_list,
        )?;

        if xref_list[0] > 0 {
            self.load_cross_ref_table(xref_list[0], false)?;
            if !self.verify_cross_ref_table() {
                return None;
            }
        }

        // Classic table entries take precedence over stream entries of
        // the same revision, so streams are applied first and the tables
        // overwrite them. The oldest revision's XRefStm is skipped; such
        // hybrid streams are only meaningful in update sections.
        for i in 1..xref_list.len() {
            if xref_stream_list[i] > 0 {
                let mut offset = xref_stream_list[i];
                self.load_cross_ref_stream(&mut offset, false)?;
            }
            if xref_list[i] > 0 {
                self.load_cross_ref_table(xref_list[i], false)?;
            }
        }

        if is_xref_stream {
            self.object_stream_cache.clear();
            self.xref_stream = true;
        }

        Some(())
    }

    /// Walk backwards through `/Prev`, collecting the chronology of
    /// revisions and merging their trailers. Entries of cross-reference
    /// streams are merged as they are found; classic-table entries are
    /// loaded later by the caller.
    fn find_all_cross_reference_tables_and_stream(
        &mut self,
        main_xref_offset: u64,
        first_prev: i64,
        xref_list: &mut Vec<u64>,
        xref_stream_list: &mut Vec<u64>,
    ) -> Option<()> {
        let mut seen_offsets: FxHashSet<u64> = FxHashSet::default();
        seen_offsets.insert(main_xref_offset);

        let mut xref_offset = first_prev;
        while xref_offset > 0 {
            let offset = xref_offset as u64;
            // A revisited offset means the chain is circular.
            if !seen_offsets.insert(offset) {
                return None;
            }

            let mut offset_copy = offset;
            if self.load_cross_ref_stream(&mut offset_copy, false).is_some() {
                xref_list.insert(0, 0);
                xref_stream_list.insert(0, offset);
                xref_offset = offset_copy as i64;
            } else {
                let _ = self.load_cross_ref_table(offset, true);

                let trailer_dict = self.load_trailer()?;
                let xref_stm = trailer_dict.get_int(XREF_STM).unwrap_or(0).max(0) as u64;
                xref_offset = trailer_dict.get_int(PREV).unwrap_or(0);

                xref_list.insert(0, offset);
                xref_stream_list.insert(0, xref_stm);

                let newer = std::mem::take(&mut self.cross_ref_table);
                self.cross_ref_table = CrossRefTable::merge_up(
                    CrossRefTable::with_trailer(trailer_dict, NO_TRAILER_OBJECT_NUMBER),
                    newer,
                );
            }
        }

        Some(())
    }

    /// Sanity-check the loaded table against the actual bytes: the first
    /// entry with a real offset must point at its own object number.
    /// Checking all of them would be slow, and real-world files are often
    /// slightly wrong in ways that don't matter.
    fn verify_cross_ref_table(&mut self) -> bool {
        let mut to_check = None;
        for (obj_num, info) in self.cross_ref_table.objects_info() {
            if let ObjectInfo::Normal { pos, .. } = info
                && *pos > 0
            {
                to_check = Some((obj_num, *pos));
                break;
            }
        }

        let Some((obj_num, pos)) = to_check else {
            return true;
        };

        let saved_pos = self.lexer.pos();
        self.lexer.set_pos(pos);
        let word = self.lexer.get_next_word();
        self.lexer.set_pos(saved_pos);

        word.is_number && !word.word.is_empty() && parse_u32(&word.word) == Some(obj_num)
    }

    fn load_cross_ref_table(&mut self, pos: u64, skip: bool) -> Option<()> {
        self.lexer.set_pos(pos);
        let objects = self.parse_cross_ref_table(skip)?;
        self.merge_cross_ref_objects_data(&objects);

        Some(())
    }

    fn parse_cross_ref_table(&mut self, skip: bool) -> Option<Vec<CrossRefObjData>> {
        if &*self.lexer.get_keyword() != b"xref" {
            return None;
        }

        let mut result = vec![];
        loop {
            let saved_pos = self.lexer.pos();
            let word = self.lexer.get_next_word();
            if word.word.is_empty() {
                return None;
            }
            if !word.is_number {
                self.lexer.set_pos(saved_pos);
                break;
            }

            let start_obj_num = parse_u32(&word.word)?;
            if start_obj_num >= MAX_OBJECT_NUMBER {
                return None;
            }

            let count = self.lexer.get_direct_num()?;
            self.lexer.skip_white_spaces_and_comments();

            self.parse_and_append_cross_ref_subsection(start_obj_num, count, !skip, &mut result)?;
        }

        Some(result)
    }

    /// Parse one `start count` subsection of 20-byte entries, or skip
    /// over it when only the trailer is of interest.
    fn parse_and_append_cross_ref_subsection(
        &mut self,
        start_obj_num: u32,
        count: u32,
        collect: bool,
        out_objects: &mut Vec<CrossRefObjData>,
    ) -> Option<()> {
        if count == 0 {
            return Some(());
        }

        if !collect {
            let advance = (count as u64).checked_mul(XREF_ENTRY_LEN as u64)?;
            let new_pos = self.lexer.pos().checked_add(advance)?;
            self.lexer.set_pos(new_pos);

            return Some(());
        }

        let new_size = out_objects.len().checked_add(count as usize)?;
        if new_size > MAX_XREF_SIZE as usize {
            return None;
        }
        let max_entries_in_file = self.lexer.document_size() / XREF_ENTRY_LEN as u64;
        if new_size as u64 > max_entries_in_file {
            return None;
        }

        let mut entry = [0u8; XREF_ENTRY_LEN];
        for i in 0..count {
            if !self.lexer.read_block(&mut entry) {
                return None;
            }

            out_objects.push(CrossRefObjData {
                obj_num: start_obj_num + i,
                info: parse_cross_ref_v4_entry(&entry)?,
            });
        }

        Some(())
    }

    fn merge_cross_ref_objects_data(&mut self, objects: &[CrossRefObjData]) {
        for object in objects {
            match object.info {
                ObjectInfo::Free { gen_num } => {
                    if gen_num > 0 {
                        self.cross_ref_table.set_free(object.obj_num, gen_num);
                    }
                }
                ObjectInfo::Normal {
                    pos,
                    gen_num,
                    is_object_stream,
                } => {
                    self.cross_ref_table
                        .add_normal(object.obj_num, gen_num, is_object_stream, pos);
                }
                ObjectInfo::Compressed { container, index } => {
                    self.cross_ref_table
                        .add_compressed(object.obj_num, container, index);
                }
            }
        }
    }

    fn load_trailer(&mut self) -> Option<Dict> {
        if &*self.lexer.get_keyword() != b"trailer" {
            return None;
        }

        match self.lexer.get_object_body()? {
            Object::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Load a cross-reference stream. On success `pos` is replaced with
    /// the stream's `/Prev` value (0 when there is none).
    fn load_cross_ref_stream(&mut self, pos: &mut u64, is_main_xref: bool) -> Option<()> {
        let (id, object) = self.parse_indirect_object_at(*pos, 0)?;
        let Object::Stream(stream) = object else {
            return None;
        };
        if id.obj_num == 0 {
            return None;
        }
        if stream.dict.get_name(TYPE).map(|n| n.as_bytes()) != Some(b"XRef") {
            return None;
        }

        let dict = stream.dict.clone();
        let prev = dict.get_int(PREV).unwrap_or(0);
        if prev < 0 {
            return None;
        }
        let size = dict.get_int(SIZE).unwrap_or(0);
        if size < 0 {
            return None;
        }
        *pos = prev as u64;

        let new_table = CrossRefTable::with_trailer(dict.clone(), id.obj_num);
        if is_main_xref {
            self.cross_ref_table = new_table;
            self.cross_ref_table
                .set_object_map_size(size.min(MAX_XREF_SIZE as i64) as u32);
        } else {
            let newer = std::mem::take(&mut self.cross_ref_table);
            self.cross_ref_table = CrossRefTable::merge_up(new_table, newer);
        }

        let field_widths: Vec<u32> = dict
            .get_array(W)?
            .iter()
            .map(|width| u32::try_from(width.as_int()?).ok())
            .collect::<Option<Vec<_>>>()?;
        if field_widths.len() < MIN_FIELD_COUNT {
            return None;
        }
        let total_width = field_widths
            .iter()
            .try_fold(0u32, |acc, width| acc.checked_add(*width))?
            as u64;

        let indices = cross_ref_stream_indices(dict.get_array(INDEX), size as u32);
        let data = stream.decoded()?;

        let mut segindex: u64 = 0;
        for index in &indices {
            // Segments that don't fit the decoded data are skipped, not
            // fatal; producers overdeclare /Index in the wild.
            let seg_end = (segindex + index.obj_count as u64).checked_mul(total_width);
            match seg_end {
                Some(end) if end <= data.len() as u64 => {}
                _ => continue,
            }

            let Some(new_size) = index.start_obj_num.checked_add(index.obj_count) else {
                continue;
            };

            // The declared /Size may undercount; grow the map bound when
            // a segment goes beyond it, up to the hard limit.
            let current_size = if self.cross_ref_table.is_empty() {
                0
            } else {
                self.last_obj_num() + 1
            };
            let new_size = new_size.min(MAX_XREF_SIZE);
            if new_size > current_size {
                self.cross_ref_table.set_object_map_size(new_size);
            }

            let seg_start = (segindex * total_width) as usize;
            for i in 0..index.obj_count {
                let obj_num = index.start_obj_num + i;
                if obj_num >= MAX_OBJECT_NUMBER {
                    break;
                }

                let entry_start = seg_start + (i as u64 * total_width) as usize;
                let entry = &data[entry_start..entry_start + total_width as usize];
                self.process_cross_ref_stream_entry(entry, &field_widths, obj_num);
            }

            segindex += index.obj_count as u64;
        }

        Some(())
    }

    fn process_cross_ref_stream_entry(
        &mut self,
        entry: &[u8],
        field_widths: &[u32],
        obj_num: u32,
    ) {
        let w0 = field_widths[0] as usize;
        let w1 = field_widths[1] as usize;
        let w2 = field_widths[2] as usize;

        // A zero-width first field means the default entry type, 1.
        let entry_type = if w0 > 0 { get_var_int(&entry[..w0]) } else { 1 };
        let second = get_var_int(&entry[w0..w0 + w1]);
        let third = get_var_int(&entry[w0 + w1..w0 + w1 + w2]);

        match entry_type {
            0 => {
                if let Ok(gen_num) = u16::try_from(third) {
                    self.cross_ref_table.set_free(obj_num, gen_num);
                }
            }
            1 => {
                if let Ok(gen_num) = u16::try_from(third) {
                    self.cross_ref_table
                        .add_normal(obj_num, gen_num, false, second as u64);
                }
            }
            2 => {
                if !self.is_valid_object_number(second) {
                    return;
                }
                self.cross_ref_table.add_compressed(obj_num, second, third);
            }
            unknown => {
                // Unknown types are reserved; readers shall ignore them.
                warn!("cross-reference stream entry has unknown type {unknown}");
            }
        }
    }

    /// Scan the whole file for indirect objects and trailers to
    /// reconstruct the table when the declared one is unusable.
    fn rebuild_cross_ref(&mut self) -> bool {
        warn!("cross-reference data is unusable, rebuilding by scanning the file");

        let mut rebuilt = CrossRefTable::new();
        self.lexer.set_read_buffer_size(REBUILD_BUFFER_SIZE);
        self.lexer.set_pos(0);

        // The last two number tokens seen, oldest first.
        let mut numbers: Vec<(u32, u64)> = vec![];
        loop {
            let word_result = self.lexer.get_next_word();
            if word_result.word.is_empty() {
                break;
            }
            let word = &*word_result.word;

            if word_result.is_number {
                let value = parse_u32(word).unwrap_or(0);
                numbers.push((value, self.lexer.pos() - word.len() as u64));
                if numbers.len() > 2 {
                    numbers.remove(0);
                }
                continue;
            }

            if word == b"(" {
                self.lexer.read_string();
            } else if word == b"<" {
                self.lexer.read_hex_string();
            } else if word == b"trailer" {
                if let Some(object) = self.lexer.get_object_body() {
                    let trailer_dict = match object {
                        Object::Dict(dict) => Some(dict),
                        Object::Stream(stream) => Some(stream.dict),
                        _ => None,
                    };
                    // Later discoveries win: an update section written
                    // behind the original is the newer revision.
                    if let Some(dict) = trailer_dict {
                        rebuilt = CrossRefTable::merge_up(
                            rebuilt,
                            CrossRefTable::with_trailer(dict, NO_TRAILER_OBJECT_NUMBER),
                        );
                    }
                }
            } else if word == b"obj" && numbers.len() == 2 {
                let (obj_num, obj_pos) = numbers[0];
                let (gen_num, _) = numbers[1];

                let resume_pos = self.lexer.pos();
                self.lexer.set_pos(obj_pos);
                let parsed = self.lexer.get_indirect_object(ParseMode::Strict);
                if parsed.is_none() {
                    self.lexer.set_pos(resume_pos);
                }

                let stream = parsed.and_then(|(_, object)| match object {
                    Object::Stream(stream) => Some(stream),
                    _ => None,
                });

                if let Some(stream) = &stream
                    && stream.dict.get_name(TYPE).map(|n| n.as_bytes()) == Some(b"XRef")
                {
                    rebuilt = CrossRefTable::merge_up(
                        rebuilt,
                        CrossRefTable::with_trailer(stream.dict.clone(), obj_num),
                    );
                }

                if obj_num < MAX_OBJECT_NUMBER {
                    rebuilt.add_normal(
                        obj_num,
                        gen_num.min(u16::MAX as u32) as u16,
                        false,
                        obj_pos,
                    );

                    if let Some(stream) = &stream
                        && let Some(object_stream) = ObjectStream::create(stream)
                    {
                        for (i, (member_num, _)) in
                            object_stream.object_info().iter().enumerate()
                        {
                            if *member_num < MAX_OBJECT_NUMBER {
                                rebuilt.add_compressed(*member_num, obj_num, i as u32);
                            }
                        }
                    }
                }
            }

            numbers.clear();
        }

        let older = std::mem::take(&mut self.cross_ref_table);
        self.cross_ref_table = CrossRefTable::merge_up(older, rebuilt);
        self.lexer.set_read_buffer_size(DEFAULT_READ_BUFFER_SIZE);

        self.cross_ref_table.trailer().is_some() && !self.cross_ref_table.is_empty()
    }

    fn load_linearized_all_cross_ref_table(&mut self, main_xref_offset: u64) -> Option<()> {
        self.load_cross_ref_table(main_xref_offset, false)?;

        let main_trailer = self.load_trailer()?;

        // The current trailer is still the first-page trailer here.
        if self.trailer_int(SIZE).unwrap_or(0) == 0 {
            return None;
        }
        let xref_stm = self.trailer_int(XREF_STM).unwrap_or(0).max(0) as u64;

        // No need to read /Prev from the first-page trailer; the caller
        // already did and passed it in as `main_xref_offset`. The chain
        // continues from the main trailer's /Prev instead.
        let main_prev = main_trailer.get_int(PREV).unwrap_or(0);
        let mut xref_list = vec![main_xref_offset];
        let mut xref_stream_list = vec![xref_stm];

        let newer = std::mem::take(&mut self.cross_ref_table);
        self.cross_ref_table = CrossRefTable::merge_up(
            CrossRefTable::with_trailer(main_trailer, NO_TRAILER_OBJECT_NUMBER),
            newer,
        );

        self.find_all_cross_reference_tables_and_stream(
            main_xref_offset,
            main_prev,
            &mut xref_list,
            &mut xref_stream_list,
        )?;

        // Unlike the ordinary load, the first XRefStm entry is processed:
        // the first-page section of a hybrid file is an update section.
        if xref_stream_list[0] > 0 {
            let mut offset = xref_stream_list[0];
            self.load_cross_ref_stream(&mut offset, false)?;
        }

        for i in 1..xref_list.len() {
            if xref_stream_list[i] > 0 {
                let mut offset = xref_stream_list[i];
                self.load_cross_ref_stream(&mut offset, false)?;
            }
            if xref_list[i] > 0 {
                self.load_cross_ref_table(xref_list[i], false)?;
            }
        }

        Some(())
    }

    fn load_linearized_all_cross_ref_stream(&mut self, main_xref_offset: u64) -> Option<()> {
        let mut xref_offset = main_xref_offset;
        self.load_cross_ref_stream(&mut xref_offset, false)?;

        let mut seen_offsets: FxHashSet<u64> = FxHashSet::default();
        while xref_offset != 0 {
            seen_offsets.insert(xref_offset);
            self.load_cross_ref_stream(&mut xref_offset, false)?;

            if seen_offsets.contains(&xref_offset) {
                return None;
            }
        }

        self.object_stream_cache.clear();
        self.xref_stream = true;

        Some(())
    }

    /// Materialize the object with the given number.
    ///
    /// Returns `None` for free slots, unknown numbers, objects whose
    /// stored location turns out to be wrong, objects that fail to
    /// decrypt, and cyclic references back into an object currently being
    /// materialized.
    pub fn parse_indirect_object(&mut self, obj_num: u32) -> Option<Object> {
        if !self.is_valid_object_number(obj_num) {
            return None;
        }

        // A re-entry for the same number means the object (directly or
        // indirectly) references itself; break the cycle.
        if self.parsing_obj_nums.borrow().contains(&obj_num) {
            return None;
        }
        let _guard = ScopedSetInsertion::new(&self.parsing_obj_nums, obj_num);

        match *self.cross_ref_table.get_object_info(obj_num)? {
            ObjectInfo::Free { .. } => None,
            ObjectInfo::Normal { pos, .. } => {
                if pos == 0 {
                    return None;
                }
                self.parse_indirect_object_at(pos, obj_num)
                    .map(|(_, object)| object)
            }
            ObjectInfo::Compressed { container, index } => {
                let object_stream = self.get_object_stream(container)?;
                object_stream.parse_object(obj_num, index)
            }
        }
    }

    /// Resolve an object stream container through the cache.
    fn get_object_stream(&mut self, container: u32) -> Option<Rc<ObjectStream>> {
        if self.parsing_obj_nums.borrow().contains(&container) {
            return None;
        }

        if let Some(cached) = self.object_stream_cache.get(&container) {
            return Some(cached.clone());
        }

        let info = *self.cross_ref_table.get_object_info(container)?;
        let ObjectInfo::Normal {
            pos,
            is_object_stream: true,
            ..
        } = info
        else {
            return None;
        };
        if pos == 0 {
            return None;
        }

        let _guard = ScopedSetInsertion::new(&self.parsing_obj_nums, container);

        let (_, object) = self.parse_indirect_object_at(pos, container)?;
        let Object::Stream(stream) = object else {
            return None;
        };

        let object_stream = Rc::new(ObjectStream::create(&stream)?);
        self.object_stream_cache
            .insert(container, object_stream.clone());

        Some(object_stream)
    }

    /// Parse the indirect object at `pos`, restoring the read position
    /// afterwards. With a nonzero `obj_num` the parsed object number must
    /// match. Decrypts the object tree in place when a crypto handler is
    /// active.
    fn parse_indirect_object_at(&mut self, pos: u64, obj_num: u32) -> Option<(ObjectId, Object)> {
        let saved_pos = self.lexer.pos();
        self.lexer.set_pos(pos);
        let result = self.lexer.get_indirect_object(ParseMode::Loose);
        self.lexer.set_pos(saved_pos);

        let (id, mut object) = result?;
        if obj_num != 0 && id.obj_num != obj_num {
            return None;
        }

        if obj_num != self.metadata_obj_num
            && let Some(crypto) = self
                .security_handler
                .as_ref()
                .and_then(|handler| handler.crypto_handler())
            && !crypto.decrypt_object_tree(&mut object, id)
        {
            // A decryption failure degrades to an absent object so a
            // partially readable document still opens.
            return None;
        }

        Some((id, object))
    }

    fn trailer_int(&self, key: &[u8]) -> Option<i64> {
        self.cross_ref_table.trailer()?.get_int(key)
    }

    fn root_dict(&mut self) -> Option<Dict> {
        let root_obj_num = self.root_obj_num()?;
        match self.parse_indirect_object(root_obj_num)? {
            Object::Dict(dict) => Some(dict),
            Object::Stream(stream) => Some(stream.dict),
            _ => None,
        }
    }

    /// The object number of the document catalog, from the trailer.
    pub fn root_obj_num(&self) -> Option<u32> {
        Some(
            self.cross_ref_table
                .trailer()?
                .get_ref(ROOT)?
                .obj_num,
        )
    }

    /// The object number of the document information dictionary.
    pub fn info_obj_num(&self) -> Option<u32> {
        Some(
            self.cross_ref_table
                .trailer()?
                .get_ref(INFO)?
                .obj_num,
        )
    }

    /// The effective merged trailer.
    pub fn trailer(&self) -> Option<&Dict> {
        self.cross_ref_table.trailer()
    }

    /// The object number of the trailer, 0 for inline trailers.
    pub fn trailer_object_number(&self) -> u32 {
        self.cross_ref_table.trailer_object_number()
    }

    /// The cross-reference table owned by this parser.
    pub fn cross_ref_table(&self) -> &CrossRefTable {
        &self.cross_ref_table
    }

    /// The largest known object number.
    pub fn last_obj_num(&self) -> u32 {
        self.cross_ref_table.last_obj_num()
    }

    /// Whether `obj_num` is within the range of known object numbers.
    pub fn is_valid_object_number(&self, obj_num: u32) -> bool {
        obj_num <= self.last_obj_num()
    }

    /// Whether the slot for `obj_num` is deleted or unknown.
    pub fn is_object_free(&self, obj_num: u32) -> bool {
        match self.cross_ref_table.get_object_info(obj_num) {
            None | Some(ObjectInfo::Free { .. }) => true,
            Some(_) => false,
        }
    }

    /// The byte offset of an object, or 0 when it has none.
    pub fn get_object_position_or_zero(&self, obj_num: u32) -> u64 {
        match self.cross_ref_table.get_object_info(obj_num) {
            Some(ObjectInfo::Normal { pos, .. }) => *pos,
            _ => 0,
        }
    }

    /// The document permissions, 0xFFFFFFFF when the file is not
    /// encrypted.
    pub fn get_permissions(&self, get_owner_perms: bool) -> u32 {
        self.security_handler
            .as_ref()
            .map(|handler| handler.permissions(get_owner_perms))
            .unwrap_or(0xFFFFFFFF)
    }

    /// The security handler, when the document is encrypted.
    pub fn security_handler(&self) -> Option<&SecurityHandler> {
        self.security_handler.as_ref()
    }

    /// The canonical spelling of the password that authenticated.
    pub fn encoded_password(&self) -> Vec<u8> {
        self.security_handler
            .as_ref()
            .map(|handler| handler.encoded_password(&self.password))
            .unwrap_or_else(|| self.password.clone())
    }

    /// The version from the `%PDF-M.N` header, as `10 * M + N`.
    pub fn file_version(&self) -> u8 {
        self.file_version
    }

    /// The size of the document, not counting garbage before the header.
    pub fn document_size(&self) -> u64 {
        self.lexer.document_size()
    }

    /// Where the primary cross-reference section was found; 0 after a
    /// rebuild.
    pub fn last_xref_offset(&self) -> u64 {
        self.last_xref_offset
    }

    /// Whether the primary cross-reference data is a stream.
    pub fn is_xref_stream(&self) -> bool {
        self.xref_stream
    }

    /// Whether the table in use came from the rebuild fallback.
    pub fn xref_table_rebuilt(&self) -> bool {
        self.xref_table_rebuilt
    }

    /// The number of the first page of a linearized document, 0
    /// otherwise.
    pub fn first_page_no(&self) -> u32 {
        self.linearized
            .as_ref()
            .map(|linearized| linearized.first_page_no())
            .unwrap_or(0)
    }

    /// The linearization header, when the document was opened through
    /// [`Parser::start_linearized_parse`] and is linearized.
    pub fn linearized_header(&self) -> Option<&LinearizedHeader> {
        self.linearized.as_ref()
    }

    /// Walk the document recording the end offset of every `trailer`,
    /// `endobj` and `startxref` boundary. Used by upstream validators.
    pub fn trailer_ends(&mut self) -> Vec<u64> {
        self.lexer.set_trailer_ends(Some(vec![]));
        self.lexer.set_pos(0);

        loop {
            let word_result = self.lexer.get_next_word();
            if word_result.is_number {
                // An object number; expect `G obj <body> endobj`.
                let word_result = self.lexer.get_next_word();
                if !word_result.is_number {
                    break;
                }
                let word_result = self.lexer.get_next_word();
                if &*word_result.word != b"obj" {
                    break;
                }
                self.lexer.get_object_body();
                let word_result = self.lexer.get_next_word();
                if &*word_result.word != b"endobj" {
                    break;
                }
            } else if &*word_result.word == b"trailer" {
                self.lexer.get_object_body();
            } else if &*word_result.word == b"startxref" {
                self.lexer.get_next_word();
            } else if &*word_result.word == b"xref" {
                loop {
                    let word_result = self.lexer.get_next_word();
                    if word_result.word.is_empty() || &*word_result.word == b"startxref" {
                        break;
                    }
                }
                self.lexer.get_next_word();
            } else {
                break;
            }
        }

        self.lexer.take_trailer_ends()
    }
}

/// Parse one fixed-width classic entry: `%010d %05d %c\r\n`.
fn parse_cross_ref_v4_entry(entry: &[u8; XREF_ENTRY_LEN]) -> Option<ObjectInfo> {
    let gen_num = parse_i64(&entry[11..16])
        .unwrap_or(0)
        .clamp(0, u16::MAX as i64) as u16;

    if entry[17] == b'f' {
        return Some(ObjectInfo::Free { gen_num });
    }

    let pos = parse_i64(&entry[..10]).unwrap_or(0);

    // A literal zero offset must be spelled with all ten digits; anything
    // else is a corrupted blank.
    if pos == 0 && !entry[..10].iter().all(u8::is_ascii_digit) {
        return None;
    }

    Some(ObjectInfo::Normal {
        pos: pos.max(0) as u64,
        gen_num,
        is_object_stream: false,
    })
}

/// A big-endian accumulator over a variable-width field; a zero-width
/// field reads as 0.
fn get_var_int(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |acc, byte| acc.wrapping_mul(256).wrapping_add(*byte as u32))
}

fn cross_ref_stream_indices(
    array: Option<&[Object]>,
    size: u32,
) -> Vec<CrossRefStreamIndexEntry> {
    let mut indices = vec![];

    if let Some(array) = array {
        for pair in array.chunks_exact(2) {
            let (Some(start), Some(count)) = (pair[0].as_int(), pair[1].as_int()) else {
                continue;
            };
            if start < 0 || count <= 0 {
                continue;
            }
            let (Ok(start), Ok(count)) = (u32::try_from(start), u32::try_from(count)) else {
                continue;
            };

            indices.push(CrossRefStreamIndexEntry {
                start_obj_num: start,
                obj_count: count,
            });
        }
    }

    if indices.is_empty() {
        indices.push(CrossRefStreamIndexEntry {
            start_obj_num: 0,
            obj_count: size,
        });
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_support::{make_owner_entry, make_user_entry};
    use crate::object::{Name, PdfString};
    use std::sync::Arc;

    /// Builds a single-revision document with a classic cross-reference
    /// table, keeping track of object offsets.
    struct FileBuilder {
        data: Vec<u8>,
        objects: Vec<(u32, u64)>,
    }

    impl FileBuilder {
        fn new() -> Self {
            Self {
                data: b"%PDF-1.7\n".to_vec(),
                objects: vec![],
            }
        }

        fn offset(&self) -> u64 {
            self.data.len() as u64
        }

        fn add_object(&mut self, obj_num: u32, body: &str) -> u64 {
            let offset = self.offset();
            self.objects.push((obj_num, offset));
            self.data
                .extend_from_slice(format!("{obj_num} 0 obj\n{body}\nendobj\n").as_bytes());

            offset
        }

        fn add_stream_object(&mut self, obj_num: u32, dict: &str, stream: &[u8]) -> u64 {
            let offset = self.offset();
            self.objects.push((obj_num, offset));
            self.data
                .extend_from_slice(format!("{obj_num} 0 obj\n{dict}\nstream\n").as_bytes());
            self.data.extend_from_slice(stream);
            self.data.extend_from_slice(b"\nendstream\nendobj\n");

            offset
        }

        fn xref_table(&self) -> (String, u32) {
            let max = self.objects.iter().map(|(n, _)| *n).max().unwrap_or(0);
            let size = max + 1;

            let mut table = format!("xref\n0 {size}\n");
            table.push_str("0000000000 65535 f\r\n");
            for num in 1..=max {
                match self.objects.iter().find(|(n, _)| *n == num) {
                    Some((_, offset)) => {
                        table.push_str(&format!("{offset:010} 00000 n\r\n"));
                    }
                    None => table.push_str("0000000000 00000 f\r\n"),
                }
            }

            (table, size)
        }

        /// Append the table, trailer and startxref. Returns the document
        /// and the position of the table.
        fn finish(self, trailer_extra: &str) -> (Vec<u8>, u64) {
            let xref_pos = self.offset();
            self.finish_with_startxref(trailer_extra, xref_pos)
        }

        fn finish_with_startxref(
            mut self,
            trailer_extra: &str,
            startxref: u64,
        ) -> (Vec<u8>, u64) {
            let xref_pos = self.offset();
            let (table, size) = self.xref_table();
            self.data.extend_from_slice(table.as_bytes());
            self.data.extend_from_slice(
                format!(
                    "trailer\n<< /Size {size} {trailer_extra} >>\nstartxref\n{startxref}\n%%EOF"
                )
                .as_bytes(),
            );

            (self.data, xref_pos)
        }
    }

    fn minimal_builder() -> FileBuilder {
        let mut builder = FileBuilder::new();
        builder.add_object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        builder.add_object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
        builder.add_object(3, "<< /Type /Page /Parent 2 0 R >>");

        builder
    }

    fn parser_for(data: Vec<u8>) -> Parser {
        Parser::new(Arc::new(data))
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|byte| format!("{byte:02X}")).collect()
    }

    #[test]
    fn minimal_document() {
        let (data, _) = minimal_builder().finish("/Root 1 0 R");
        let mut parser = parser_for(data);

        parser.start_parse(b"").unwrap();

        assert_eq!(parser.root_obj_num(), Some(1));
        assert_eq!(parser.get_permissions(false), 0xFFFFFFFF);
        assert!(!parser.xref_table_rebuilt());
        assert!(!parser.is_xref_stream());
        assert_eq!(parser.file_version(), 17);
        assert_eq!(parser.last_obj_num(), 3);

        let catalog = parser.parse_indirect_object(1).unwrap();
        let dict = catalog.as_dict().unwrap();
        assert_eq!(dict.get_name(b"Type").unwrap().as_bytes(), b"Catalog");
    }

    #[test]
    fn repeated_materialization_is_stable() {
        let (data, _) = minimal_builder().finish("/Root 1 0 R");
        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        let first = parser.parse_indirect_object(2).unwrap();
        let second = parser.parse_indirect_object(2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn degenerate_inputs_are_format_errors() {
        for data in [
            vec![],
            b"%PDF-".to_vec(),
            b"not a pdf at all".to_vec(),
        ] {
            let mut parser = parser_for(data);
            assert_eq!(parser.start_parse(b""), Err(ParseError::Format));
        }
    }

    #[test]
    fn free_slots_are_absent() {
        let mut builder = minimal_builder();
        builder.add_object(5, "(tail object)");
        let (data, _) = builder.finish("/Root 1 0 R");

        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        assert!(parser.is_object_free(4));
        assert!(parser.parse_indirect_object(4).is_none());
        assert_eq!(parser.get_object_position_or_zero(4), 0);
        assert!(parser.get_object_position_or_zero(5) > 0);
        assert!(parser.parse_indirect_object(5).is_some());
    }

    #[test]
    fn incremental_update_overrides_entries() {
        let (mut data, base_xref) = minimal_builder().finish("/Root 1 0 R");
        let base_obj2 = {
            let mut parser = parser_for(data.clone());
            parser.start_parse(b"").unwrap();
            parser.get_object_position_or_zero(2)
        };

        let update_obj2 = data.len() as u64;
        data.extend_from_slice(
            b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 /Updated true >>\nendobj\n",
        );
        let update_xref = data.len() as u64;
        data.extend_from_slice(
            format!("xref\n0 1\n0000000000 65535 f\r\n2 1\n{update_obj2:010} 00000 n\r\n")
                .as_bytes(),
        );
        data.extend_from_slice(
            format!(
                "trailer\n<< /Size 4 /Root 1 0 R /Prev {base_xref} >>\nstartxref\n{update_xref}\n%%EOF"
            )
            .as_bytes(),
        );

        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        assert_ne!(base_obj2, update_obj2);
        assert_eq!(parser.get_object_position_or_zero(2), update_obj2);
        let pages = parser.parse_indirect_object(2).unwrap();
        assert_eq!(pages.as_dict().unwrap().get_bool(b"Updated"), Some(true));
        // Entries the update does not mention come from the base revision.
        assert!(parser.parse_indirect_object(1).is_some());
        assert!(!parser.xref_table_rebuilt());
    }

    fn circular_prev_document(trailer_extra: &str) -> Vec<u8> {
        let mut data = b"%PDF-1.7\n".to_vec();
        let obj1 = data.len() as u64;
        data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");

        let section = |prev: u64, startxref: Option<u64>| {
            let mut out = format!(
                "xref\n0 2\n0000000000 65535 f\r\n{obj1:010} 00000 n\r\n\
                 trailer\n<< /Size 2 {trailer_extra} /Prev {prev:010} >>\n"
            );
            if let Some(startxref) = startxref {
                out.push_str(&format!("startxref\n{startxref:010}\n%%EOF"));
            }
            out
        };

        let xref_a = data.len() as u64;
        let xref_b = xref_a + section(0, None).len() as u64;

        data.extend_from_slice(section(xref_b, None).as_bytes());
        data.extend_from_slice(section(xref_a, Some(xref_b)).as_bytes());

        data
    }

    #[test]
    fn circular_prev_without_root_is_fatal() {
        let mut parser = parser_for(circular_prev_document(""));
        assert_eq!(parser.start_parse(b""), Err(ParseError::Format));
    }

    #[test]
    fn circular_prev_chain_falls_back_to_rebuild() {
        // The chain is rejected as circular, so opening falls back to the
        // rebuild, which recovers the root.
        let mut parser = parser_for(circular_prev_document("/Root 1 0 R"));
        parser.start_parse(b"").unwrap();

        assert!(parser.xref_table_rebuilt());
        assert!(parser.parse_indirect_object(1).is_some());
    }

    #[test]
    fn corrupted_startxref_triggers_rebuild() {
        let (data, _) = minimal_builder().finish_with_startxref("/Root 1 0 R", 10);

        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        assert!(parser.xref_table_rebuilt());
        assert_eq!(parser.last_xref_offset(), 0);
        assert_eq!(parser.root_obj_num(), Some(1));
        let catalog = parser.parse_indirect_object(1).unwrap();
        assert_eq!(
            catalog.as_dict().unwrap().get_name(b"Type").unwrap().as_bytes(),
            b"Catalog"
        );
    }

    #[test]
    fn missing_startxref_triggers_rebuild() {
        let mut builder = minimal_builder();
        builder.add_object(4, "(no table at all)");
        let mut data = builder.data;
        data.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n%%EOF");

        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        assert!(parser.xref_table_rebuilt());
        assert!(parser.parse_indirect_object(4).is_some());
    }

    #[test]
    fn broken_entry_offsets_are_repaired() {
        let (mut data, xref_pos) = minimal_builder().finish("/Root 1 0 R");

        // Nudge the first entry's offset so verification fails.
        let entry_start = xref_pos as usize + "xref\n0 4\n".len() + XREF_ENTRY_LEN;
        data[entry_start..entry_start + 10].copy_from_slice(b"0000000007");

        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        assert!(parser.xref_table_rebuilt());
        assert_eq!(parser.get_object_position_or_zero(1), 9);
    }

    /// A cross-reference stream document with two objects compressed into
    /// an object stream.
    fn xref_stream_document() -> (Vec<u8>, u64, u64, u64) {
        let mut data = b"%PDF-1.7\n".to_vec();

        let off1 = data.len() as u64;
        data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 4 0 R >>\nendobj\n");

        // Objects 4 and 5 live inside object stream 2.
        let members = b"4 0 5 15 << /Count 0 >> (in-stream)";
        let first = "4 0 5 15 ".len();
        let off2 = data.len() as u64;
        data.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /ObjStm /N 2 /First {first} /Length {} >>\nstream\n",
                members.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(members);
        data.extend_from_slice(b"\nendstream\nendobj\n");

        let off3 = data.len() as u64;
        let entry = |kind: u8, second: u16, third: u8| -> Vec<u8> {
            let mut out = vec![kind];
            out.extend_from_slice(&second.to_be_bytes());
            out.push(third);
            out
        };
        let mut entries = vec![];
        entries.extend(entry(0, 0, 0));
        entries.extend(entry(1, off1 as u16, 0));
        entries.extend(entry(1, off2 as u16, 0));
        entries.extend(entry(1, off3 as u16, 0));
        entries.extend(entry(2, 2, 0));
        entries.extend(entry(2, 2, 1));

        data.extend_from_slice(
            format!(
                "3 0 obj\n<< /Type /XRef /W [1 2 1] /Size 6 /Index [0 6] /Root 1 0 R \
                 /Length {} >>\nstream\n",
                entries.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(&entries);
        data.extend_from_slice(b"\nendstream\nendobj\n");
        data.extend_from_slice(format!("startxref\n{off3}\n%%EOF").as_bytes());

        (data, off1, off2, off3)
    }

    #[test]
    fn xref_stream_document_parses() {
        let (data, off1, off2, off3) = xref_stream_document();
        let mut parser = parser_for(data);

        parser.start_parse(b"").unwrap();

        assert!(parser.is_xref_stream());
        assert!(!parser.xref_table_rebuilt());
        assert_eq!(parser.trailer().unwrap().get_ref(b"Root").unwrap().obj_num, 1);
        assert_eq!(parser.trailer_object_number(), 3);
        assert_eq!(parser.get_object_position_or_zero(1), off1);
        assert_eq!(parser.get_object_position_or_zero(2), off2);
        assert_eq!(parser.get_object_position_or_zero(3), off3);
        assert!(parser.parse_indirect_object(1).is_some());
    }

    #[test]
    fn compressed_objects_resolve_through_the_container() {
        let (data, ..) = xref_stream_document();
        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        let four = parser.parse_indirect_object(4).unwrap();
        assert_eq!(four.as_dict().unwrap().get_int(b"Count"), Some(0));

        let five = parser.parse_indirect_object(5).unwrap();
        assert_eq!(five.as_string().unwrap().as_bytes(), b"in-stream");

        // The container is flagged, and the compressed entries are sound.
        match parser.cross_ref_table().get_object_info(2) {
            Some(ObjectInfo::Normal {
                is_object_stream: true,
                ..
            }) => {}
            other => panic!("container entry is {other:?}"),
        }
        for obj_num in [4u32, 5u32] {
            match parser.cross_ref_table().get_object_info(obj_num) {
                Some(ObjectInfo::Compressed { container: 2, index }) => {
                    assert!(*index < 2);
                }
                other => panic!("compressed entry is {other:?}"),
            }
        }
    }

    #[test]
    fn hybrid_update_prefers_classic_offsets() {
        let (mut data, base_xref) = minimal_builder().finish("/Root 1 0 R");

        // The update adds object stream 4 (holding object 5) plus an
        // auxiliary cross-reference stream, and re-lists object 4 in its
        // classic table with the real offset.
        let members = b"5 0 (hybrid member)";
        let first = "5 0 ".len();
        let obj4_pos = data.len() as u64;
        data.extend_from_slice(
            format!(
                "4 0 obj\n<< /Type /ObjStm /N 1 /First {first} /Length {} >>\nstream\n",
                members.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(members);
        data.extend_from_slice(b"\nendstream\nendobj\n");

        let obj6_pos = data.len() as u64;
        let entry = |kind: u8, second: u16, third: u8| -> Vec<u8> {
            let mut out = vec![kind];
            out.extend_from_slice(&second.to_be_bytes());
            out.push(third);
            out
        };
        let mut entries = vec![];
        // A wrong offset for 4: the classic table must win.
        entries.extend(entry(1, 1, 0));
        entries.extend(entry(2, 4, 0));
        entries.extend(entry(1, obj6_pos as u16, 0));

        data.extend_from_slice(
            format!(
                "6 0 obj\n<< /Type /XRef /W [1 2 1] /Size 7 /Index [4 3] /Root 1 0 R \
                 /Length {} >>\nstream\n",
                entries.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(&entries);
        data.extend_from_slice(b"\nendstream\nendobj\n");

        let update_xref = data.len() as u64;
        data.extend_from_slice(
            format!("xref\n0 1\n0000000000 65535 f\r\n4 1\n{obj4_pos:010} 00000 n\r\n").as_bytes(),
        );
        data.extend_from_slice(
            format!(
                "trailer\n<< /Size 7 /Root 1 0 R /Prev {base_xref} /XRefStm {obj6_pos} >>\n\
                 startxref\n{update_xref}\n%%EOF"
            )
            .as_bytes(),
        );

        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        // The classic entry overrode the stream's wrong offset.
        assert_eq!(parser.get_object_position_or_zero(4), obj4_pos);
        // The stream's compressed entries are visible.
        let five = parser.parse_indirect_object(5).unwrap();
        assert_eq!(five.as_string().unwrap().as_bytes(), b"hybrid member");
        // Entries of the base revision are still reachable.
        assert!(parser.parse_indirect_object(1).is_some());
    }

    fn encrypted_document(filter: &str) -> Vec<u8> {
        const FILE_ID: &[u8] = b"0123456789abcdef";

        let owner_entry = make_owner_entry(b"own", b"pwd", 3, 16);
        let mut encrypt_dict = Dict::new();
        encrypt_dict.insert(Name(b"V".to_vec()), Object::Integer(2));
        encrypt_dict.insert(Name(b"R".to_vec()), Object::Integer(3));
        encrypt_dict.insert(Name(b"Length".to_vec()), Object::Integer(128));
        encrypt_dict.insert(Name(b"P".to_vec()), Object::Integer(-3904));
        encrypt_dict.insert(
            Name(b"O".to_vec()),
            Object::String(PdfString(owner_entry.clone())),
        );
        let user_entry = make_user_entry(&encrypt_dict, b"pwd", 16, FILE_ID);
        encrypt_dict.insert(
            Name(b"U".to_vec()),
            Object::String(PdfString(user_entry.clone())),
        );

        let handler =
            crate::crypto::SecurityHandler::on_init(encrypt_dict, Some(FILE_ID), b"pwd").unwrap();
        let encrypted_title = handler
            .crypto_handler()
            .unwrap()
            .encrypt_content(4, 0, b"hello")
            .unwrap();

        let mut builder = minimal_builder();
        builder.add_object(4, &format!("<< /Title <{}> >>", hex(&encrypted_title)));
        builder.add_object(
            5,
            &format!(
                "<< /Filter /{filter} /V 2 /R 3 /Length 128 /P -3904 /O <{}> /U <{}> >>",
                hex(&owner_entry),
                hex(&user_entry)
            ),
        );

        let id = hex(FILE_ID);
        let (data, _) = builder.finish(&format!(
            "/Root 1 0 R /Encrypt 5 0 R /ID [<{id}> <{id}>]"
        ));

        data
    }

    #[test]
    fn encrypted_document_decrypts_lazily() {
        let mut parser = parser_for(encrypted_document("Standard"));
        parser.start_parse(b"pwd").unwrap();

        assert_eq!(parser.get_permissions(false), 0xFFFFF0C0);
        assert_eq!(parser.encoded_password(), b"pwd");

        let titled = parser.parse_indirect_object(4).unwrap();
        assert_eq!(
            titled.as_dict().unwrap().get_string(b"Title").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn wrong_password_is_a_password_error() {
        let mut parser = parser_for(encrypted_document("Standard"));
        assert_eq!(parser.start_parse(b"nope"), Err(ParseError::Password));
    }

    #[test]
    fn owner_password_opens_the_document() {
        let mut parser = parser_for(encrypted_document("Standard"));
        parser.start_parse(b"own").unwrap();
        assert_eq!(parser.get_permissions(true), 0xFFFFFFFC);
    }

    #[test]
    fn non_standard_filter_is_a_handler_error() {
        let mut parser = parser_for(encrypted_document("Custom"));
        assert_eq!(parser.start_parse(b"pwd"), Err(ParseError::Handler));
    }

    #[test]
    fn short_w_array_cannot_rescue_a_document_without_root() {
        let mut data = b"%PDF-1.7\n".to_vec();
        let off = data.len() as u64;
        data.extend_from_slice(
            b"3 0 obj\n<< /Type /XRef /W [1 2] /Size 4 /Length 4 >>\nstream\n\x01\x00\x09\x00\nendstream\nendobj\n",
        );
        data.extend_from_slice(format!("startxref\n{off}\n%%EOF").as_bytes());

        let mut parser = parser_for(data);
        assert_eq!(parser.start_parse(b""), Err(ParseError::Format));
    }

    #[test]
    fn classic_entry_parsing() {
        let normal: &[u8; 20] = b"0000000123 00007 n\r\n";
        assert_eq!(
            parse_cross_ref_v4_entry(normal),
            Some(ObjectInfo::Normal {
                pos: 123,
                gen_num: 7,
                is_object_stream: false
            })
        );

        let free: &[u8; 20] = b"0000000003 65535 f\r\n";
        assert_eq!(
            parse_cross_ref_v4_entry(free),
            Some(ObjectInfo::Free { gen_num: 65535 })
        );

        // Wide generations clamp to the 16-bit range.
        let wide: &[u8; 20] = b"0000000123 99999 n\r\n";
        assert_eq!(
            parse_cross_ref_v4_entry(wide),
            Some(ObjectInfo::Normal {
                pos: 123,
                gen_num: u16::MAX,
                is_object_stream: false
            })
        );

        // A zero offset must be spelled with all ten digits.
        let blank: &[u8; 20] = b"         0 00000 n\r\n";
        assert_eq!(parse_cross_ref_v4_entry(blank), None);
    }

    #[test]
    fn subsection_table_loads_sparse_entries() {
        let data = b"xref\n\
            0 1\n\
            0000000000 65535 f\r\n\
            3 1\n\
            0000000500 00000 n\r\n\
            6 1\n\
            0000000698 00002 n\r\n\
            trailer\n<< /Size 9 >>\n"
            .to_vec();

        let mut parser = parser_for(data);
        parser.load_cross_ref_table(0, false).unwrap();

        let table = parser.cross_ref_table();
        assert_eq!(
            table.get_object_info(3),
            Some(&ObjectInfo::Normal {
                pos: 500,
                gen_num: 0,
                is_object_stream: false
            })
        );
        assert_eq!(
            table.get_object_info(6),
            Some(&ObjectInfo::Normal {
                pos: 698,
                gen_num: 2,
                is_object_stream: false
            })
        );
        assert_eq!(table.get_object_info(0), Some(&ObjectInfo::Free { gen_num: 65535 }));
        assert_eq!(table.get_object_info(1), None);
        assert_eq!(table.last_obj_num(), 6);
    }

    #[test]
    fn self_referencing_object_is_absent() {
        // Object 1 is its own value through a reference cycle with 2.
        let mut builder = FileBuilder::new();
        builder.add_object(1, "2 0 R");
        builder.add_object(2, "1 0 R");
        builder.add_object(3, "<< /Type /Catalog >>");
        let (data, _) = builder.finish("/Root 3 0 R");

        let mut parser = parser_for(data);
        parser.start_parse(b"").unwrap();

        // Materializing 1 yields the bare reference; the guard only kicks
        // in when a cycle re-enters the same number.
        assert!(parser.parse_indirect_object(1).is_some());

        // Simulate re-entry the way a resolving holder would.
        let guard = ScopedSetInsertion::new(&parser.parsing_obj_nums, 1);
        assert!(parser.parse_indirect_object(1).is_none());
        drop(guard);
        assert!(parser.parse_indirect_object(1).is_some());
    }

    #[test]
    fn trailer_ends_walk() {
        let (data, _) = minimal_builder().finish("/Root 1 0 R");
        let mut parser = parser_for(data);

        let ends = parser.trailer_ends();
        // Three endobj boundaries, one trailer, one startxref.
        assert_eq!(ends.len(), 5);
        let mut sorted = ends.clone();
        sorted.sort_unstable();
        assert_eq!(ends, sorted);
    }

    fn linearized_document() -> Vec<u8> {
        // Fixed-width numbers keep the layout stable across both passes.
        let build = |l: u64, t: u64, prev: u64, e: u64| -> (Vec<u8>, Vec<u64>) {
            let mut data = b"%PDF-1.6\n".to_vec();
            let mut positions = vec![];

            positions.push(data.len() as u64);
            data.extend_from_slice(
                format!(
                    "4 0 obj\n<< /Linearized 1 /L {l:010} /H [0000000000 0000000000] /O 3 \
                     /E {e:010} /N 1 /T {t:010} >>\nendobj\n"
                )
                .as_bytes(),
            );

            positions.push(data.len() as u64);
            data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
            positions.push(data.len() as u64);
            data.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
            positions.push(data.len() as u64);
            data.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R >>\nendobj\n");

            // First-page xref.
            positions.push(data.len() as u64);
            let entries = format!(
                "0000000000 65535 f\r\n{:010} 00000 n\r\n{:010} 00000 n\r\n\
                 {:010} 00000 n\r\n{:010} 00000 n\r\n",
                positions[1], positions[2], positions[3], positions[0]
            );
            data.extend_from_slice(format!("xref\n0 5\n{entries}").as_bytes());
            data.extend_from_slice(
                format!("trailer\n<< /Size 5 /Root 1 0 R /Prev {prev:010} >>\n").as_bytes(),
            );

            // Main xref.
            positions.push(data.len() as u64);
            data.extend_from_slice(format!("xref\n0 5\n{entries}").as_bytes());
            data.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n");

            data.extend_from_slice(format!("startxref\n{:010}\n%%EOF", positions[4]).as_bytes());

            (data, positions)
        };

        let (probe, positions) = build(0, 0, 0, 0);
        let total = probe.len() as u64;
        let first_page_xref = positions[4];
        let main_xref = positions[5];
        let first_page_end = positions[4];

        let (data, _) = build(total, first_page_xref, main_xref, first_page_end);
        assert_eq!(data.len() as u64, total);

        data
    }

    #[test]
    fn linearized_first_page_then_main_table() {
        let mut parser = parser_for(linearized_document());

        parser.start_linearized_parse(b"").unwrap();
        assert!(parser.linearized.is_some());
        assert!(!parser.xref_table_rebuilt());
        assert_eq!(parser.root_obj_num(), Some(1));
        assert!(parser.parse_indirect_object(1).is_some());
        assert_eq!(parser.first_page_no(), 0);

        parser.load_linearized_main_xref_table().unwrap();
        assert!(parser.parse_indirect_object(3).is_some());
        assert!(!parser.xref_table_rebuilt());
    }

    #[test]
    fn non_linearized_files_take_the_ordinary_path() {
        let (data, _) = minimal_builder().finish("/Root 1 0 R");
        let mut parser = parser_for(data);

        parser.start_linearized_parse(b"").unwrap();
        assert!(parser.linearized.is_none());
        assert_eq!(parser.root_obj_num(), Some(1));
    }
}
