//! PDF character classes.

#[inline(always)]
pub(crate) fn is_white_space(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

#[inline(always)]
pub(crate) fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline(always)]
pub(crate) fn is_regular(byte: u8) -> bool {
    !is_white_space(byte) && !is_delimiter(byte)
}

#[inline(always)]
pub(crate) fn is_eol(byte: u8) -> bool {
    matches!(byte, 0x0a | 0x0d)
}

/// Characters that may make up a number token. Not every sequence of these
/// is a valid number, but the tokenizer only needs the closure.
#[inline(always)]
pub(crate) fn is_numeric(byte: u8) -> bool {
    byte.is_ascii_digit() || matches!(byte, b'+' | b'-' | b'.')
}
