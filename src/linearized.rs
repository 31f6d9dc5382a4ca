//! The linearization header of fast-web-view documents.

use crate::lexer::{Lexer, ParseMode};
use crate::object::dict::keys::{E, H, L, LINEARIZED, N, O, P, T};
use crate::object::Object;

/// Where the first object of a linearized document starts, right after the
/// `%PDF-M.N\n` header.
const HEADER_OFFSET: u64 = 9;

/// The parsed linearization dictionary of a fast-web-view document.
#[derive(Debug, Clone)]
pub struct LinearizedHeader {
    file_size: u64,
    first_page_obj_num: u32,
    first_page_end: u64,
    page_count: u32,
    last_xref_offset: u64,
    first_page_no: u32,
    hint_start: u64,
    hint_length: u64,
}

impl LinearizedHeader {
    /// Try to parse a linearization dictionary from the head of the
    /// document. Returns `None` for documents that are not linearized, or
    /// whose header does not validate.
    pub(crate) fn parse(lexer: &mut Lexer) -> Option<LinearizedHeader> {
        let saved_pos = lexer.pos();
        lexer.set_pos(HEADER_OFFSET);
        let result = lexer.get_indirect_object(ParseMode::Loose);
        lexer.set_pos(saved_pos);

        let (_, object) = result?;
        let Object::Dict(dict) = object else {
            return None;
        };

        if !dict.contains_key(LINEARIZED) {
            return None;
        }

        let int = |key: &[u8]| dict.get_int(key).filter(|v| *v > 0);

        let file_size = int(L)? as u64;
        // A linearized header whose length disagrees with the actual file
        // is stale, most likely from an incremental update.
        if file_size != lexer.document_size() {
            return None;
        }

        let first_page_obj_num = int(O)? as u32;
        let first_page_end = int(E)? as u64;
        let page_count = int(N)? as u32;
        let last_xref_offset = int(T)? as u64;
        let first_page_no = dict.get_int(P).unwrap_or(0).max(0) as u32;

        let (hint_start, hint_length) = match dict.get_array(H) {
            Some([Object::Integer(start), Object::Integer(length), ..])
                if *start >= 0 && *length >= 0 =>
            {
                (*start as u64, *length as u64)
            }
            _ => (0, 0),
        };

        Some(LinearizedHeader {
            file_size,
            first_page_obj_num,
            first_page_end,
            page_count,
            last_xref_offset,
            first_page_no,
            hint_start,
            hint_length,
        })
    }

    /// The declared length of the whole file (`/L`).
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The object number of the first page (`/O`).
    pub fn first_page_obj_num(&self) -> u32 {
        self.first_page_obj_num
    }

    /// The end offset of the first-page section (`/E`).
    pub fn first_page_end(&self) -> u64 {
        self.first_page_end
    }

    /// The number of pages in the document (`/N`).
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// The offset of the first-page cross-reference section (`/T`).
    pub fn last_xref_offset(&self) -> u64 {
        self.last_xref_offset
    }

    /// The page number of the first page (`/P`, default 0).
    pub fn first_page_no(&self) -> u32 {
        self.first_page_no
    }

    /// The offset and length of the primary hint stream (`/H`).
    pub fn hint_span(&self) -> (u64, u64) {
        (self.hint_start, self.hint_length)
    }
}
