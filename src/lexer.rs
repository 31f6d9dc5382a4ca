//! The syntax tokenizer: reading bytes, words and PDF objects from a byte
//! source.
//!
//! All positions handed in and out are relative to the header offset, so a
//! document with leading garbage before `%PDF-` behaves as if the garbage
//! did not exist. Reads go through an internal buffer whose size can be
//! tuned for scanning workloads.

use crate::object::{Dict, Name, ObjRef, Object, ObjectId, PdfString, Stream};
use crate::trivia::{is_delimiter, is_eol, is_numeric, is_regular, is_white_space};
use crate::PdfData;
use smallvec::SmallVec;

/// The default size of the internal read buffer.
pub(crate) const DEFAULT_READ_BUFFER_SIZE: usize = 512;

/// The window in which the `%PDF-` header must appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Nesting depth above which arrays and dictionaries are rejected.
const MAX_NESTING_DEPTH: u32 = 64;

/// How tolerant [`Lexer::get_indirect_object`] is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum ParseMode {
    /// The object must be terminated by `endobj`.
    Strict,
    /// A missing `endobj` is accepted.
    Loose,
}

/// A word produced by the tokenizer.
#[derive(Debug, Clone)]
pub(crate) struct WordResult {
    pub(crate) word: SmallVec<[u8; 16]>,
    pub(crate) is_number: bool,
}

impl WordResult {
    fn empty() -> Self {
        Self {
            word: SmallVec::new(),
            is_number: false,
        }
    }
}

/// A tokenizer over a byte source.
pub(crate) struct Lexer {
    source: PdfData,
    header_offset: u64,
    pos: u64,
    buf: Vec<u8>,
    buf_pos: u64,
    buf_size: usize,
    trailer_ends: Option<Vec<u64>>,
}

impl Lexer {
    pub(crate) fn new(source: PdfData) -> Self {
        Self {
            source,
            header_offset: 0,
            pos: 0,
            buf: vec![],
            buf_pos: 0,
            buf_size: DEFAULT_READ_BUFFER_SIZE,
            trailer_ends: None,
        }
    }

    /// Search the `%PDF-` header within the first kilobyte of the source.
    pub(crate) fn find_header_offset(&self) -> Option<u64> {
        let len = usize::try_from(self.source.size())
            .unwrap_or(usize::MAX)
            .min(HEADER_SEARCH_WINDOW);
        let mut window = vec![0; len];
        if !self.source.read_at(0, &mut window) {
            return None;
        }

        window
            .windows(5)
            .position(|w| w == b"%PDF-")
            .map(|p| p as u64)
    }

    /// Make all subsequent positions relative to `header_offset`.
    pub(crate) fn rebase(&mut self, header_offset: u64) {
        self.header_offset = header_offset;
        self.pos = 0;
        self.buf.clear();
    }

    pub(crate) fn document_size(&self) -> u64 {
        self.source.size().saturating_sub(self.header_offset)
    }

    pub(crate) fn source_size(&self) -> u64 {
        self.source.size()
    }

    pub(crate) fn pos(&self) -> u64 {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: u64) {
        self.pos = pos.min(self.document_size());
    }

    pub(crate) fn set_read_buffer_size(&mut self, size: usize) {
        self.buf_size = size.max(1);
        self.buf.clear();
        self.buf_pos = 0;
    }

    /// While set, the end position of every `trailer`, `endobj` and
    /// `startxref` word is recorded into the vector.
    pub(crate) fn set_trailer_ends(&mut self, ends: Option<Vec<u64>>) {
        self.trailer_ends = ends;
    }

    pub(crate) fn take_trailer_ends(&mut self) -> Vec<u64> {
        self.trailer_ends.take().unwrap_or_default()
    }

    /// The byte at `pos`, without moving the read position.
    pub(crate) fn get_char_at(&mut self, pos: u64) -> Option<u8> {
        self.byte_at(pos)
    }

    /// Fill `dst` with the bytes at the current position and advance.
    pub(crate) fn read_block(&mut self, dst: &mut [u8]) -> bool {
        if !self.source.read_at(self.header_offset + self.pos, dst) {
            return false;
        }
        self.pos += dst.len() as u64;

        true
    }

    fn byte_at(&mut self, pos: u64) -> Option<u8> {
        if pos < self.buf_pos || pos >= self.buf_pos + self.buf.len() as u64 {
            self.refill(pos)?;
        }

        Some(self.buf[(pos - self.buf_pos) as usize])
    }

    fn refill(&mut self, pos: u64) -> Option<()> {
        let size = self.document_size();
        if pos >= size {
            return None;
        }

        let start = pos - (pos % self.buf_size as u64);
        let len = (size - start).min(self.buf_size as u64) as usize;
        self.buf.resize(len, 0);
        if !self.source.read_at(self.header_offset + start, &mut self.buf) {
            self.buf.clear();
            return None;
        }
        self.buf_pos = start;

        Some(())
    }

    pub(crate) fn peek_byte(&mut self) -> Option<u8> {
        self.byte_at(self.pos)
    }

    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;

        Some(byte)
    }

    fn forward(&mut self) {
        self.pos += 1;
    }

    pub(crate) fn peek_tag(&mut self, tag: &[u8]) -> bool {
        for (i, byte) in tag.iter().enumerate() {
            if self.byte_at(self.pos + i as u64) != Some(*byte) {
                return false;
            }
        }

        true
    }

    pub(crate) fn forward_tag(&mut self, tag: &[u8]) -> Option<()> {
        if self.peek_tag(tag) {
            self.pos += tag.len() as u64;

            Some(())
        } else {
            None
        }
    }

    pub(crate) fn skip_white_spaces(&mut self) {
        while let Some(byte) = self.peek_byte() {
            if is_white_space(byte) {
                self.forward();
            } else {
                return;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(byte) = self.peek_byte() {
            if is_eol(byte) {
                return;
            }
            self.forward();
        }
    }

    pub(crate) fn skip_white_spaces_and_comments(&mut self) {
        while let Some(byte) = self.peek_byte() {
            if is_white_space(byte) {
                self.forward();
            } else if byte == b'%' {
                self.skip_comment();
            } else {
                return;
            }
        }
    }

    /// Read the next word. At the end of the document the word is empty.
    pub(crate) fn get_next_word(&mut self) -> WordResult {
        self.skip_white_spaces_and_comments();

        let mut result = WordResult::empty();
        let Some(first) = self.peek_byte() else {
            return result;
        };

        if is_delimiter(first) {
            self.forward();
            result.word.push(first);
            match first {
                b'<' => {
                    if self.peek_byte() == Some(b'<') {
                        self.forward();
                        result.word.push(b'<');
                    }
                }
                b'>' => {
                    if self.peek_byte() == Some(b'>') {
                        self.forward();
                        result.word.push(b'>');
                    }
                }
                b'/' => {
                    while let Some(byte) = self.peek_byte() {
                        if is_regular(byte) {
                            self.forward();
                            result.word.push(byte);
                        } else {
                            break;
                        }
                    }
                }
                _ => {}
            }

            return result;
        }

        result.is_number = true;
        while let Some(byte) = self.peek_byte() {
            if !is_regular(byte) {
                break;
            }
            if !is_numeric(byte) {
                result.is_number = false;
            }
            self.forward();
            result.word.push(byte);
        }

        self.record_boundary(&result.word);

        result
    }

    fn record_boundary(&mut self, word: &[u8]) {
        if matches!(word, b"trailer" | b"endobj" | b"startxref") {
            let pos = self.pos;
            if let Some(ends) = &mut self.trailer_ends {
                ends.push(pos);
            }
        }
    }

    /// Read the next word, ignoring whether it is a number.
    pub(crate) fn get_keyword(&mut self) -> SmallVec<[u8; 16]> {
        self.get_next_word().word
    }

    /// Consume exactly one unsigned integer.
    pub(crate) fn get_direct_num(&mut self) -> Option<u32> {
        let result = self.get_next_word();
        if !result.is_number {
            return None;
        }

        parse_u32(&result.word)
    }

    /// Scan backwards from the current position for `word`, looking at no
    /// more than `limit` bytes. On success the position is left at the
    /// start of the word.
    pub(crate) fn backwards_search_to_word(&mut self, word: &[u8], limit: u64) -> bool {
        let size = self.document_size();
        if word.is_empty() || size < word.len() as u64 {
            return false;
        }

        let mut pos = self.pos.min(size - word.len() as u64);
        let mut checked = 0u64;

        loop {
            if self.word_matches_at(pos, word) {
                self.pos = pos;
                return true;
            }

            checked += 1;
            if pos == 0 || checked >= limit {
                return false;
            }
            pos -= 1;
        }
    }

    fn word_matches_at(&mut self, pos: u64, word: &[u8]) -> bool {
        for (i, byte) in word.iter().enumerate() {
            if self.byte_at(pos + i as u64) != Some(*byte) {
                return false;
            }
        }

        // Both ends must be word boundaries.
        if pos > 0
            && self
                .byte_at(pos - 1)
                .is_some_and(is_regular)
        {
            return false;
        }

        !self
            .byte_at(pos + word.len() as u64)
            .is_some_and(is_regular)
    }

    /// Read a literal string. The opening parenthesis has already been
    /// consumed.
    pub(crate) fn read_string(&mut self) -> Vec<u8> {
        let mut out = vec![];
        let mut level = 1u32;

        while let Some(byte) = self.read_byte() {
            match byte {
                b'(' => {
                    level += 1;
                    out.push(b'(');
                }
                b')' => {
                    level -= 1;
                    if level == 0 {
                        break;
                    }
                    out.push(b')');
                }
                b'\\' => {
                    let Some(escaped) = self.read_byte() else {
                        break;
                    };
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u16;
                            for _ in 0..2 {
                                match self.peek_byte() {
                                    Some(digit @ b'0'..=b'7') => {
                                        self.forward();
                                        value = value * 8 + (digit - b'0') as u16;
                                    }
                                    _ => break,
                                }
                            }
                            out.push(value as u8);
                        }
                        b'\r' => {
                            // A backslash before an end-of-line continues
                            // the string on the next line.
                            if self.peek_byte() == Some(b'\n') {
                                self.forward();
                            }
                        }
                        b'\n' => {}
                        other => out.push(other),
                    }
                }
                b'\r' => {
                    // End-of-line inside a string reads as a line feed.
                    if self.peek_byte() == Some(b'\n') {
                        self.forward();
                    }
                    out.push(b'\n');
                }
                other => out.push(other),
            }
        }

        out
    }

    /// Read a hex string. The opening angle bracket has already been
    /// consumed.
    pub(crate) fn read_hex_string(&mut self) -> Vec<u8> {
        let mut out = vec![];
        let mut high: Option<u8> = None;

        while let Some(byte) = self.read_byte() {
            let digit = match byte {
                b'>' => break,
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => continue,
            };

            match high.take() {
                None => high = Some(digit),
                Some(h) => out.push(h << 4 | digit),
            }
        }

        if let Some(h) = high {
            out.push(h << 4);
        }

        out
    }

    /// Parse a single direct object at the current position.
    pub(crate) fn get_object_body(&mut self) -> Option<Object> {
        self.object_body(0)
    }

    fn object_body(&mut self, depth: u32) -> Option<Object> {
        if depth > MAX_NESTING_DEPTH {
            return None;
        }

        self.skip_white_spaces_and_comments();

        match self.peek_byte()? {
            b'n' => {
                self.forward_tag(b"null")?;
                Some(Object::Null)
            }
            b't' => {
                self.forward_tag(b"true")?;
                Some(Object::Boolean(true))
            }
            b'f' => {
                self.forward_tag(b"false")?;
                Some(Object::Boolean(false))
            }
            b'/' => Some(Object::Name(self.read_name()?)),
            b'(' => {
                self.forward();
                Some(Object::String(PdfString(self.read_string())))
            }
            b'<' => {
                if self.peek_tag(b"<<") {
                    self.read_dict_or_stream(depth)
                } else {
                    self.forward();
                    Some(Object::String(PdfString(self.read_hex_string())))
                }
            }
            b'[' => {
                self.forward();
                let mut array = vec![];
                loop {
                    self.skip_white_spaces_and_comments();
                    if self.peek_byte()? == b']' {
                        self.forward();
                        break;
                    }
                    array.push(self.object_body(depth + 1)?);
                }
                Some(Object::Array(array))
            }
            byte if is_numeric(byte) => self.read_number_or_reference(),
            _ => None,
        }
    }

    fn read_name(&mut self) -> Option<Name> {
        self.forward_tag(b"/")?;

        let mut out = vec![];
        while let Some(byte) = self.peek_byte() {
            if !is_regular(byte) {
                break;
            }
            self.forward();

            if byte == b'#' {
                let hex = |b: u8| -> Option<u8> {
                    match b {
                        b'0'..=b'9' => Some(b - b'0'),
                        b'a'..=b'f' => Some(b - b'a' + 10),
                        b'A'..=b'F' => Some(b - b'A' + 10),
                        _ => None,
                    }
                };

                let high = self.peek_byte().and_then(hex);
                if let Some(high) = high {
                    self.forward();
                    let low = self.peek_byte().and_then(hex);
                    if let Some(low) = low {
                        self.forward();
                        out.push(high << 4 | low);
                        continue;
                    }
                }
                // A broken escape reads as a literal number sign.
                out.push(b'#');
            } else {
                out.push(byte);
            }
        }

        Some(Name(out))
    }

    fn read_number_or_reference(&mut self) -> Option<Object> {
        let first = self.read_number_token()?;

        let Number::Integer(obj_num) = first else {
            return Some(number_object(first));
        };

        // An integer may start an `N G R` reference; look ahead to decide.
        let saved_pos = self.pos;
        if obj_num >= 0 && obj_num <= u32::MAX as i64 {
            self.skip_white_spaces_and_comments();
            if let Some(Number::Integer(gen_num)) = self.read_number_token()
                && (0..=u16::MAX as i64).contains(&gen_num)
            {
                self.skip_white_spaces_and_comments();
                if self.peek_byte() == Some(b'R')
                    && !self.byte_at(self.pos + 1).is_some_and(is_regular)
                {
                    self.forward();
                    return Some(Object::Reference(ObjRef {
                        obj_num: obj_num as u32,
                        gen_num: gen_num as u16,
                    }));
                }
            }
        }

        self.pos = saved_pos;
        Some(number_object(first))
    }

    fn read_number_token(&mut self) -> Option<Number> {
        let mut token: SmallVec<[u8; 16]> = SmallVec::new();
        while let Some(byte) = self.peek_byte() {
            if !is_regular(byte) {
                break;
            }
            if !is_numeric(byte) {
                return None;
            }
            self.forward();
            token.push(byte);
        }

        parse_number(&token)
    }

    fn read_dict_or_stream(&mut self, depth: u32) -> Option<Object> {
        let dict = self.read_dict(depth)?;

        let saved_pos = self.pos;
        self.skip_white_spaces_and_comments();
        if self.forward_tag(b"stream").is_some() {
            let data = self.read_stream_data(&dict)?;
            Some(Object::Stream(Stream { dict, data }))
        } else {
            self.pos = saved_pos;
            Some(Object::Dict(dict))
        }
    }

    fn read_dict(&mut self, depth: u32) -> Option<Dict> {
        self.forward_tag(b"<<")?;

        let mut dict = Dict::new();
        loop {
            self.skip_white_spaces_and_comments();
            if self.forward_tag(b">>").is_some() {
                break;
            }

            if self.peek_byte()? == b'/' {
                let key = self.read_name()?;
                let value = self.object_body(depth + 1)?;
                dict.insert(key, value);
            } else {
                // Tolerate garbage between entries by skipping one object.
                self.object_body(depth + 1)?;
            }
        }

        Some(dict)
    }

    fn read_stream_data(&mut self, dict: &Dict) -> Option<Vec<u8>> {
        // The `stream` keyword is followed by a single end-of-line.
        if self.peek_byte() == Some(b'\r') {
            self.forward();
        }
        if self.peek_byte() == Some(b'\n') {
            self.forward();
        }

        let data_start = self.pos;

        if let Some(length) = dict.get_int(crate::object::dict::keys::LENGTH)
            && length >= 0
        {
            let mut data = vec![0; length as usize];
            if self.read_block(&mut data) {
                let saved_pos = self.pos;
                self.skip_white_spaces();
                if self.forward_tag(b"endstream").is_some() {
                    return Some(data);
                }
                self.pos = saved_pos;
            }
        }

        // The declared length is absent, indirect or wrong; fall back to
        // searching for the `endstream` keyword.
        self.pos = data_start;
        let end = self.find_forward(b"endstream")?;

        let mut data_len = end - data_start;
        // The data is terminated by an end-of-line that is not part of it.
        if data_len >= 2
            && self.byte_at(data_start + data_len - 2) == Some(b'\r')
            && self.byte_at(data_start + data_len - 1) == Some(b'\n')
        {
            data_len -= 2;
        } else if data_len >= 1
            && self
                .byte_at(data_start + data_len - 1)
                .is_some_and(is_eol)
        {
            data_len -= 1;
        }

        let mut data = vec![0; data_len as usize];
        self.set_pos(data_start);
        if !self.read_block(&mut data) {
            return None;
        }

        self.set_pos(end);
        self.forward_tag(b"endstream")?;

        Some(data)
    }

    fn find_forward(&mut self, tag: &[u8]) -> Option<u64> {
        let mut pos = self.pos;
        let size = self.document_size();

        while pos + tag.len() as u64 <= size {
            if self.word_matches_at(pos, tag) {
                return Some(pos);
            }
            pos += 1;
        }

        None
    }

    /// Parse an indirect object (`N G obj … endobj`) at the current
    /// position.
    pub(crate) fn get_indirect_object(&mut self, mode: ParseMode) -> Option<(ObjectId, Object)> {
        let saved_pos = self.pos;

        let result = self.indirect_object_inner(mode);
        if result.is_none() {
            self.pos = saved_pos;
        }

        result
    }

    fn indirect_object_inner(&mut self, mode: ParseMode) -> Option<(ObjectId, Object)> {
        self.skip_white_spaces_and_comments();
        let obj_num = match self.read_number_token()? {
            Number::Integer(n) if (0..=u32::MAX as i64).contains(&n) => n as u32,
            _ => return None,
        };

        self.skip_white_spaces_and_comments();
        let gen_num = match self.read_number_token()? {
            Number::Integer(n) if n >= 0 => n.min(u16::MAX as i64) as u16,
            _ => return None,
        };

        self.skip_white_spaces_and_comments();
        self.forward_tag(b"obj")?;

        let object = self.get_object_body()?;

        match mode {
            ParseMode::Strict => {
                self.skip_white_spaces_and_comments();
                self.forward_tag(b"endobj")?;
            }
            ParseMode::Loose => {
                let saved_pos = self.pos;
                self.skip_white_spaces_and_comments();
                if self.forward_tag(b"endobj").is_none() {
                    self.pos = saved_pos;
                }
            }
        }

        Some((ObjectId::new(obj_num, gen_num), object))
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) enum Number {
    Integer(i64),
    Real(f64),
}

fn number_object(number: Number) -> Object {
    match number {
        Number::Integer(i) => Object::Integer(i),
        Number::Real(r) => Object::Real(r),
    }
}

/// Parse a number token. Digits after a second decimal point are ignored,
/// like most readers do.
pub(crate) fn parse_number(token: &[u8]) -> Option<Number> {
    if token.is_empty() {
        return None;
    }

    let (sign, rest) = match token[0] {
        b'+' => (1.0, &token[1..]),
        b'-' => (-1.0, &token[1..]),
        _ => (1.0, token),
    };

    let mut int_part = 0i64;
    let mut frac_part = 0.0f64;
    let mut frac_scale = 1.0f64;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for &byte in rest {
        match byte {
            b'0'..=b'9' => {
                seen_digit = true;
                let digit = (byte - b'0') as i64;
                if seen_dot {
                    frac_scale /= 10.0;
                    frac_part += digit as f64 * frac_scale;
                } else {
                    int_part = int_part.saturating_mul(10).saturating_add(digit);
                }
            }
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }

    if !seen_digit {
        return None;
    }

    if seen_dot {
        Some(Number::Real(sign * (int_part as f64 + frac_part)))
    } else if sign < 0.0 {
        Some(Number::Integer(-int_part))
    } else {
        Some(Number::Integer(int_part))
    }
}

/// Parse the leading unsigned decimal digits of a token.
pub(crate) fn parse_u32(token: &[u8]) -> Option<u32> {
    let rest = token.strip_prefix(b"+").unwrap_or(token);

    let mut value: u32 = 0;
    let mut seen_digit = false;
    for &byte in rest {
        match byte {
            b'0'..=b'9' => {
                seen_digit = true;
                value = value
                    .saturating_mul(10)
                    .saturating_add((byte - b'0') as u32);
            }
            _ => break,
        }
    }

    seen_digit.then_some(value)
}

/// Parse a signed offset the way `atoi64` would: leading digits only.
pub(crate) fn parse_i64(token: &[u8]) -> Option<i64> {
    let (negative, rest) = match token.first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for &byte in rest {
        match byte {
            b'0'..=b'9' => {
                seen_digit = true;
                value = value
                    .saturating_mul(10)
                    .saturating_add((byte - b'0') as i64);
            }
            _ => break,
        }
    }

    if !seen_digit {
        return None;
    }

    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn lexer(data: &[u8]) -> Lexer {
        Lexer::new(Arc::new(data.to_vec()))
    }

    fn object(data: &[u8]) -> Option<Object> {
        lexer(data).get_object_body()
    }

    #[test]
    fn null() {
        assert_eq!(object(b"null").unwrap(), Object::Null);
    }

    #[test]
    fn booleans() {
        assert_eq!(object(b"true").unwrap(), Object::Boolean(true));
        assert_eq!(object(b"false").unwrap(), Object::Boolean(false));
    }

    #[test]
    fn numbers() {
        assert_eq!(object(b"34").unwrap(), Object::Integer(34));
        assert_eq!(object(b"-17").unwrap(), Object::Integer(-17));
        assert_eq!(object(b"34.5").unwrap(), Object::Real(34.5));
        assert_eq!(object(b"-.002").unwrap(), Object::Real(-0.002));
        assert_eq!(object(b"4.").unwrap(), Object::Real(4.0));
    }

    #[test]
    fn strings() {
        assert_eq!(
            object(b"(Hi (nested) there)").unwrap(),
            Object::String(PdfString(b"Hi (nested) there".to_vec()))
        );
        assert_eq!(
            object(b"(a\\) b\\n\\101)").unwrap(),
            Object::String(PdfString(b"a) b\nA".to_vec()))
        );
        assert_eq!(
            object(b"<901FA>").unwrap(),
            Object::String(PdfString(vec![0x90, 0x1f, 0xa0]))
        );
    }

    #[test]
    fn names() {
        assert_eq!(
            object(b"/Name1").unwrap(),
            Object::Name(Name(b"Name1".to_vec()))
        );
        assert_eq!(
            object(b"/A#42").unwrap(),
            Object::Name(Name(b"AB".to_vec()))
        );
    }

    #[test]
    fn arrays() {
        assert_eq!(
            object(b"[1 2 /Three (4)]").unwrap(),
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(2),
                Object::Name(Name(b"Three".to_vec())),
                Object::String(PdfString(b"4".to_vec())),
            ])
        );
    }

    #[test]
    fn references() {
        assert_eq!(
            object(b"12 0 R").unwrap(),
            Object::Reference(ObjRef {
                obj_num: 12,
                gen_num: 0
            })
        );
        // Not a reference: the keyword boundary is missing.
        assert_eq!(object(b"12 0 Rx").unwrap(), Object::Integer(12));
    }

    #[test]
    fn dicts() {
        let obj = object(b"<< /Size 10 /Root 1 0 R /Kind /Catalog >>").unwrap();
        let dict = obj.as_dict().unwrap();

        assert_eq!(dict.get_int(b"Size"), Some(10));
        assert_eq!(
            dict.get_ref(b"Root"),
            Some(ObjRef {
                obj_num: 1,
                gen_num: 0
            })
        );
    }

    #[test]
    fn streams() {
        let obj = object(b"<< /Length 10 >> stream\nabcdefghij\nendstream").unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.data, b"abcdefghij");
    }

    #[test]
    fn stream_with_broken_length() {
        let obj = object(b"<< /Length 10000 >> stream\nabc\nendstream").unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.data, b"abc");

        let obj = object(b"<< /Length 2 0 R >> stream\nxyz\nendstream").unwrap();
        assert_eq!(obj.as_stream().unwrap().data, b"xyz");
    }

    #[test]
    fn indirect_objects() {
        let mut lexer = lexer(b"7 0 obj << /A 5 >> endobj");
        let (id, obj) = lexer.get_indirect_object(ParseMode::Strict).unwrap();

        assert_eq!(id, ObjectId::new(7, 0));
        assert_eq!(obj.as_dict().unwrap().get_int(b"A"), Some(5));
    }

    #[test]
    fn strict_mode_needs_endobj() {
        assert!(
            lexer(b"7 0 obj 42")
                .get_indirect_object(ParseMode::Strict)
                .is_none()
        );
        assert!(
            lexer(b"7 0 obj 42")
                .get_indirect_object(ParseMode::Loose)
                .is_some()
        );
    }

    #[test]
    fn words() {
        let mut lexer = lexer(b"trailer << /Size 5 >>\nstartxref\n116\n%%EOF");

        assert_eq!(&*lexer.get_next_word().word, b"trailer");
        assert_eq!(&*lexer.get_next_word().word, b"<<");
        assert_eq!(&*lexer.get_next_word().word, b"/Size");
        let number = lexer.get_next_word();
        assert_eq!(&*number.word, b"5");
        assert!(number.is_number);
    }

    #[test]
    fn comments_are_skipped() {
        let mut lexer = lexer(b"% a comment\n42");
        assert_eq!(lexer.get_object_body().unwrap(), Object::Integer(42));
    }

    #[test]
    fn backwards_search() {
        let mut lexer = lexer(b"junk startxref\n116\n%%EOF");
        lexer.set_pos(lexer.document_size());

        assert!(lexer.backwards_search_to_word(b"startxref", 4096));
        assert_eq!(lexer.pos(), 5);
        assert!(!lexer.backwards_search_to_word(b"missing", 4096));
    }

    #[test]
    fn header_offset_search() {
        let with_garbage = lexer(b"garbage\n%PDF-1.7\nrest");
        assert_eq!(with_garbage.find_header_offset(), Some(8));

        let without_header = lexer(b"no header here");
        assert_eq!(without_header.find_header_offset(), None);
    }

    #[test]
    fn trailer_ends_are_recorded() {
        let mut lexer = lexer(b"trailer << >> startxref 9");
        lexer.set_trailer_ends(Some(vec![]));

        loop {
            let word = lexer.get_next_word();
            if word.word.is_empty() {
                break;
            }
        }

        assert_eq!(lexer.take_trailer_ends(), vec![7, 23]);
    }
}
