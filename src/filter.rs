//! Decoding of stream filters.
//!
//! Only the filters that can appear on the structural streams this crate
//! must read (cross-reference streams and object streams) are implemented.
//! Image codecs are a concern of higher layers and answer `None` here.

use crate::object::dict::keys::{
    BITS_PER_COMPONENT, COLORS, COLUMNS, DECODE_PARMS, EARLY_CHANGE, FILTER, PREDICTOR,
};
use crate::object::{Dict, Object};
use itertools::izip;
use log::warn;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    AsciiHex,
    Ascii85,
    Lzw,
    Flate,
    RunLength,
}

impl Filter {
    pub(crate) fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ASCIIHexDecode" | b"AHx" => Some(Filter::AsciiHex),
            b"ASCII85Decode" | b"A85" => Some(Filter::Ascii85),
            b"LZWDecode" | b"LZW" => Some(Filter::Lzw),
            b"FlateDecode" | b"Fl" => Some(Filter::Flate),
            b"RunLengthDecode" | b"RL" => Some(Filter::RunLength),
            _ => {
                warn!(
                    "unsupported filter: {}",
                    String::from_utf8_lossy(name)
                );

                None
            }
        }
    }

    fn apply(self, data: &[u8], params: Option<&Dict>) -> Option<Vec<u8>> {
        match self {
            Filter::AsciiHex => ascii_hex(data),
            Filter::Ascii85 => ascii_85(data),
            Filter::RunLength => run_length(data),
            Filter::Lzw => lzw(data, params),
            Filter::Flate => flate(data, params),
        }
    }
}

/// Decode stream data by applying the filter chain declared in `dict`.
pub(crate) fn decode_stream(dict: &Dict, data: &[u8]) -> Option<Vec<u8>> {
    let (filters, params) = filter_chain(dict)?;

    let mut current = data.to_vec();
    for (i, filter) in filters.iter().enumerate() {
        current = filter.apply(&current, params.get(i).and_then(|p| p.as_ref()))?;
    }

    Some(current)
}

fn filter_chain(dict: &Dict) -> Option<(Vec<Filter>, Vec<Option<Dict>>)> {
    let params = match dict.get(DECODE_PARMS) {
        Some(Object::Dict(d)) => vec![Some(d.clone())],
        Some(Object::Array(a)) => a
            .iter()
            .map(|obj| obj.as_dict().cloned())
            .collect(),
        _ => vec![],
    };

    match dict.get(FILTER) {
        None => Some((vec![], params)),
        Some(Object::Name(name)) => {
            Some((vec![Filter::from_name(name.as_bytes())?], params))
        }
        Some(Object::Array(names)) => {
            let filters = names
                .iter()
                .map(|obj| Filter::from_name(obj.as_name()?.as_bytes()))
                .collect::<Option<Vec<_>>>()?;

            Some((filters, params))
        }
        Some(_) => None,
    }
}

fn flate(data: &[u8], params: Option<&Dict>) -> Option<Vec<u8>> {
    let decoded = miniz_oxide::inflate::decompress_to_vec_zlib(data)
        .ok()
        .or_else(|| miniz_oxide::inflate::decompress_to_vec(data).ok())?;

    apply_predictor(decoded, &PredictorParams::from_params(params))
}

fn lzw(data: &[u8], params: Option<&Dict>) -> Option<Vec<u8>> {
    let params = PredictorParams::from_params(params);
    let decoded = lzw_decode(data, params.early_change)?;

    apply_predictor(decoded, &params)
}

const LZW_CLEAR_TABLE: u16 = 256;
const LZW_EOD: u16 = 257;
const LZW_MAX_ENTRIES: usize = 4096;
const LZW_INITIAL_SIZE: usize = 258;

fn lzw_decode(data: &[u8], early_change: bool) -> Option<Vec<u8>> {
    let mut table: Vec<Vec<u8>> = (0..LZW_INITIAL_SIZE)
        .map(|b| vec![b.min(255) as u8])
        .collect();
    let mut reader = bitreader::BitReader::new(data);
    let mut decoded = vec![];
    let mut prev: Option<usize> = None;

    let code_length = |len: usize| -> u8 {
        let adjusted = len + usize::from(early_change);
        match adjusted {
            _ if adjusted >= 2048 => 12,
            _ if adjusted >= 1024 => 11,
            _ if adjusted >= 512 => 10,
            _ => 9,
        }
    };

    loop {
        let Ok(code) = reader.read_u16(code_length(table.len())) else {
            // A stream that ends without EOD decodes to what was seen so far.
            warn!("lzw stream ended without end-of-data marker");
            return Some(decoded);
        };

        match code {
            LZW_CLEAR_TABLE => {
                table.truncate(LZW_INITIAL_SIZE);
                prev = None;
            }
            LZW_EOD => return Some(decoded),
            code => {
                let code = code as usize;
                if let Some(entry) = table.get(code) {
                    let entry = entry.clone();
                    decoded.extend_from_slice(&entry);
                    if let Some(prev) = prev
                        && table.len() < LZW_MAX_ENTRIES
                    {
                        let mut new_entry = table[prev].clone();
                        new_entry.push(entry[0]);
                        table.push(new_entry);
                    }
                } else {
                    // The KwKwK case: the code refers to the entry being built.
                    let prev_entry = table.get(prev?)?.clone();
                    let mut new_entry = prev_entry;
                    new_entry.push(new_entry[0]);
                    decoded.extend_from_slice(&new_entry);
                    if table.len() < LZW_MAX_ENTRIES {
                        table.push(new_entry);
                    }
                }

                prev = Some(code);
            }
        }
    }
}

fn ascii_hex(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = vec![];
    let mut high: Option<u8> = None;

    for byte in data {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            b'>' => break,
            b if crate::trivia::is_white_space(*b) => continue,
            _ => return None,
        };

        match high.take() {
            None => high = Some(digit),
            Some(h) => decoded.push(h << 4 | digit),
        }
    }

    // An odd final digit behaves as if followed by zero.
    if let Some(h) = high {
        decoded.push(h << 4);
    }

    Some(decoded)
}

fn ascii_85(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = vec![];
    let mut group = [0u8; 5];
    let mut group_len = 0;

    for &byte in data {
        match byte {
            b'~' => break,
            b'z' if group_len == 0 => decoded.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[group_len] = byte - b'!';
                group_len += 1;
                if group_len == 5 {
                    let value = group.iter().fold(0u32, |acc, digit| {
                        acc.wrapping_mul(85).wrapping_add(*digit as u32)
                    });
                    decoded.extend_from_slice(&value.to_be_bytes());
                    group_len = 0;
                }
            }
            b if crate::trivia::is_white_space(b) => {}
            _ => return None,
        }
    }

    // A partial final group of n digits encodes n - 1 bytes.
    if group_len > 0 {
        if group_len == 1 {
            return None;
        }
        for slot in group.iter_mut().skip(group_len) {
            *slot = 84;
        }
        let value = group.iter().fold(0u32, |acc, digit| {
            acc.wrapping_mul(85).wrapping_add(*digit as u32)
        });
        decoded.extend_from_slice(&value.to_be_bytes()[..group_len - 1]);
    }

    Some(decoded)
}

fn run_length(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = vec![];
    let mut rest = data;

    loop {
        let (&length, tail) = rest.split_first()?;
        rest = tail;

        match length {
            128 => return Some(decoded),
            0..=127 => {
                let count = length as usize + 1;
                decoded.extend_from_slice(rest.get(..count)?);
                rest = &rest[count..];
            }
            _ => {
                let (&byte, tail) = rest.split_first()?;
                rest = tail;
                decoded.extend(std::iter::repeat_n(byte, 257 - length as usize));
            }
        }
    }
}

struct PredictorParams {
    predictor: u8,
    colors: u8,
    bits_per_component: u8,
    columns: usize,
    early_change: bool,
}

impl PredictorParams {
    fn from_params(params: Option<&Dict>) -> Self {
        let get = |key: &[u8], default: i64| -> i64 {
            params.and_then(|p| p.get_int(key)).unwrap_or(default)
        };

        Self {
            predictor: get(PREDICTOR, 1).clamp(1, 15) as u8,
            colors: get(COLORS, 1).clamp(1, 32) as u8,
            bits_per_component: get(BITS_PER_COMPONENT, 8).clamp(1, 16) as u8,
            columns: get(COLUMNS, 1).max(1) as usize,
            early_change: get(EARLY_CHANGE, 1) != 0,
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        ((self.bits_per_component as usize * self.colors as usize) + 7) / 8
    }

    fn row_length(&self) -> usize {
        (self.columns * self.colors as usize * self.bits_per_component as usize + 7) / 8
    }
}

fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    match params.predictor {
        1 => Some(data),
        2 => apply_tiff_predictor(data, params),
        10..=15 => apply_png_predictor(data, params),
        other => {
            warn!("unknown predictor {other}");

            None
        }
    }
}

fn apply_tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    if params.bits_per_component != 8 {
        warn!("tiff predictor only supported for 8 bits per component");

        return None;
    }

    let bpp = params.bytes_per_pixel();
    for row in data.chunks_mut(params.row_length()) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }

    Some(data)
}

fn apply_png_predictor(data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    let row_len = params.row_length();
    // Each encoded row is prefixed by the filter type actually used.
    let total_row_len = row_len.checked_add(1)?;
    let num_rows = data.len() / total_row_len;

    if num_rows * total_row_len != data.len() {
        return None;
    }

    let bpp = params.bytes_per_pixel();
    let mut out = vec![0; num_rows * row_len];
    let mut prev_row = vec![0u8; row_len];

    for (in_row, out_row) in izip!(
        data.chunks_exact(total_row_len),
        out.chunks_exact_mut(row_len)
    ) {
        let filter_type = in_row[0];
        let in_data = &in_row[1..];

        for i in 0..row_len {
            let raw = in_data[i];
            let left = if i >= bpp { out_row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            out_row[i] = match filter_type {
                0 => raw,
                1 => raw.wrapping_add(left),
                2 => raw.wrapping_add(up),
                3 => raw.wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => raw.wrapping_add(paeth(left, up, up_left)),
                _ => return None,
            };
        }

        prev_row.copy_from_slice(out_row);
    }

    Some(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
