//! Object streams: container objects packing many small objects into one
//! compressed stream.

use crate::lexer::Lexer;
use crate::object::dict::keys::{FIRST, N, TYPE};
use crate::object::{Object, Stream};
use log::warn;
use std::sync::Arc;

/// A parsed object stream.
///
/// The header of the stream data lists, for each member, its object number
/// and its offset relative to the position named by `/First`.
pub(crate) struct ObjectStream {
    data: Arc<Vec<u8>>,
    offsets: Vec<(u32, u64)>,
}

impl ObjectStream {
    /// Parse an object stream from its container stream object.
    pub(crate) fn create(stream: &Stream) -> Option<ObjectStream> {
        if stream.dict.get_name(TYPE).map(|n| n.as_bytes()) != Some(b"ObjStm") {
            return None;
        }

        let num_objects = stream.dict.get_int(N)?;
        let first_offset = stream.dict.get_int(FIRST)?;
        if num_objects < 0 || first_offset < 0 {
            return None;
        }

        let data = Arc::new(stream.decoded()?);
        let mut lexer = Lexer::new(data.clone());

        let mut offsets = vec![];
        for _ in 0..num_objects {
            lexer.skip_white_spaces_and_comments();
            let obj_num = lexer.get_direct_num()?;
            lexer.skip_white_spaces_and_comments();
            let relative_offset = lexer.get_direct_num()?;

            offsets.push((obj_num, first_offset as u64 + relative_offset as u64));
        }

        Some(ObjectStream { data, offsets })
    }

    /// The `(object number, offset)` pairs of all members, in stream order.
    pub(crate) fn object_info(&self) -> &[(u32, u64)] {
        &self.offsets
    }

    /// Extract the member at `index`, checking that the stream header
    /// agrees it is `obj_num`.
    pub(crate) fn parse_object(&self, obj_num: u32, index: u32) -> Option<Object> {
        let &(archived_num, offset) = self.offsets.get(index as usize)?;
        if archived_num != obj_num {
            warn!("object stream header names {archived_num} at index {index}, not {obj_num}");

            return None;
        }

        let mut lexer = Lexer::new(self.data.clone());
        lexer.set_pos(offset);
        lexer.get_object_body()
    }
}
