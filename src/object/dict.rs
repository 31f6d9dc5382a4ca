//! Dictionaries.

use crate::object::{Name, ObjRef, Object};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// A dictionary object: a map from names to objects.
///
/// Lookups do not resolve references; an entry that is an indirect
/// reference is returned as [`Object::Reference`], and the typed accessors
/// answer `None` for it. Resolution happens in the layers that can reach
/// the cross-reference table.
#[derive(Clone, Default, PartialEq)]
pub struct Dict(BTreeMap<Name, Object>);

impl Dict {
    /// Create a new empty dictionary.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// The number of entries in the dictionary.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the dictionary contains an entry for `key`.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    /// The raw entry for `key`.
    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    /// Insert an entry, replacing any previous value for the key.
    pub fn insert(&mut self, key: Name, value: Object) {
        self.0.insert(key, value);
    }

    /// An iterator over all entries, sorted by key.
    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.0.iter()
    }

    /// Mutable iteration over all values.
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.0.values_mut()
    }

    /// The entry for `key` as an integer, if it is a direct integer.
    pub fn get_int(&self, key: &[u8]) -> Option<i64> {
        self.get(key)?.as_int()
    }

    /// The entry for `key` as a boolean, if it is a direct boolean.
    pub fn get_bool(&self, key: &[u8]) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// The entry for `key` as a name, if it is a direct name.
    pub fn get_name(&self, key: &[u8]) -> Option<&Name> {
        self.get(key)?.as_name()
    }

    /// The entry for `key` as a string, if it is a direct string.
    pub fn get_string(&self, key: &[u8]) -> Option<&[u8]> {
        Some(self.get(key)?.as_string()?.as_bytes())
    }

    /// The entry for `key` as an array, if it is a direct array.
    pub fn get_array(&self, key: &[u8]) -> Option<&[Object]> {
        self.get(key)?.as_array()
    }

    /// The entry for `key` as a dictionary, if it is a direct dictionary.
    pub fn get_dict(&self, key: &[u8]) -> Option<&Dict> {
        self.get(key)?.as_dict()
    }

    /// The entry for `key` as an object reference, if it is one.
    pub fn get_ref(&self, key: &[u8]) -> Option<ObjRef> {
        self.get(key)?.as_reference()
    }
}

impl Debug for Dict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_map();
        for (key, value) in &self.0 {
            debug.entry(key, value);
        }
        debug.finish()
    }
}

/// Well-known dictionary keys.
#[allow(missing_docs)]
pub mod keys {
    macro_rules! key {
        ($i:ident, $e:expr) => {
            pub const $i: &'static [u8] = $e;
        };
    }

    key!(BITS_PER_COMPONENT, b"BitsPerComponent");
    key!(CF, b"CF");
    key!(CFM, b"CFM");
    key!(COLORS, b"Colors");
    key!(COLUMNS, b"Columns");
    key!(DECODE_PARMS, b"DecodeParms");
    key!(E, b"E");
    key!(EARLY_CHANGE, b"EarlyChange");
    key!(ENCRYPT, b"Encrypt");
    key!(ENCRYPT_METADATA, b"EncryptMetadata");
    key!(F, b"F");
    key!(FILTER, b"Filter");
    key!(FIRST, b"First");
    key!(H, b"H");
    key!(ID, b"ID");
    key!(INDEX, b"Index");
    key!(INFO, b"Info");
    key!(L, b"L");
    key!(LENGTH, b"Length");
    key!(LINEARIZED, b"Linearized");
    key!(METADATA, b"Metadata");
    key!(N, b"N");
    key!(O, b"O");
    key!(OE, b"OE");
    key!(P, b"P");
    key!(PERMS, b"Perms");
    key!(PREDICTOR, b"Predictor");
    key!(PREV, b"Prev");
    key!(R, b"R");
    key!(ROOT, b"Root");
    key!(SIZE, b"Size");
    key!(STM_F, b"StmF");
    key!(STR_F, b"StrF");
    key!(T, b"T");
    key!(TYPE, b"Type");
    key!(U, b"U");
    key!(UE, b"UE");
    key!(V, b"V");
    key!(W, b"W");
    key!(XREF_STM, b"XRefStm");
}
