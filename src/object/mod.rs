//! The PDF object model.
//!
//! Objects materialized by the parser are owned values. References between
//! indirect objects are kept as object numbers only, never as pointers, so
//! the object graph has no cyclic ownership; resolving a [`Object::Reference`]
//! is the job of the layer that holds the parsed objects.

use crate::filter;
use std::fmt::{Debug, Formatter};

pub mod dict;

pub use dict::Dict;

/// The identifier of an indirect object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObjectId {
    /// The object number.
    pub obj_num: u32,
    /// The generation number.
    pub gen_num: u16,
}

impl ObjectId {
    /// Create a new object identifier.
    pub fn new(obj_num: u32, gen_num: u16) -> Self {
        Self { obj_num, gen_num }
    }
}

/// A reference to an indirect object (`N G R`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObjRef {
    /// The object number of the referenced object.
    pub obj_num: u32,
    /// The generation number of the referenced object.
    pub gen_num: u16,
}

impl From<ObjRef> for ObjectId {
    fn from(r: ObjRef) -> Self {
        Self::new(r.obj_num, r.gen_num)
    }
}

/// A name object, stored with escape sequences resolved.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Name(
    /// The unescaped bytes, without the leading slash.
    pub Vec<u8>,
);

impl Name {
    /// The unescaped bytes of the name, without the leading slash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::borrow::Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", String::from_utf8_lossy(&self.0))
    }
}

/// A string object. Whether it was spelled as a literal or hex string is
/// not preserved; only the bytes matter.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PdfString(
    /// The raw bytes of the string.
    pub Vec<u8>,
);

impl PdfString {
    /// The raw bytes of the string.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for PdfString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", String::from_utf8_lossy(&self.0))
    }
}

/// A stream object: a dictionary plus its raw (still filtered) data.
#[derive(Clone, PartialEq)]
pub struct Stream {
    /// The stream dictionary.
    pub dict: Dict,
    /// The raw stream bytes, with filters still applied.
    pub data: Vec<u8>,
}

impl Stream {
    /// Decode the stream data by applying the declared filter chain.
    ///
    /// Returns `None` if a filter is unsupported or the data is broken.
    /// The result is not cached.
    pub fn decoded(&self) -> Option<Vec<u8>> {
        filter::decode_stream(&self.dict, &self.data)
    }
}

impl Debug for Stream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stream(len: {}, dict: {:?})", self.data.len(), self.dict)
    }
}

/// A PDF object.
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    /// The null object.
    Null,
    /// A boolean object.
    Boolean(bool),
    /// An integer object.
    Integer(i64),
    /// A real number object.
    Real(f64),
    /// A string object.
    String(PdfString),
    /// A name object.
    Name(Name),
    /// An array object.
    Array(Vec<Object>),
    /// A dictionary object.
    Dict(Dict),
    /// A stream object.
    Stream(Stream),
    /// A reference to an indirect object.
    Reference(ObjRef),
}

impl Object {
    /// The object as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The object as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The object as a number, converting integers to reals.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// The object as a name, if it is one.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// The object as a string, if it is one.
    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// The object as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The object as a dictionary. A stream also answers with its
    /// dictionary.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dict(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// The object as a stream, if it is one.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// The object as a reference, if it is one.
    pub fn as_reference(&self) -> Option<ObjRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }
}
