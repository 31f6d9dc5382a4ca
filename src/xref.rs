//! The cross-reference table: the in-memory index from object numbers to
//! object locations, together with the effective trailer dictionary.

use crate::object::Dict;
use std::collections::BTreeMap;

/// A limit on object numbers. Theoretical limits are higher, but this is
/// large enough in practice, and it bounds the size of the table.
pub const MAX_OBJECT_NUMBER: u32 = 1 << 23;

/// A limit on the size of the xref table: one more than the largest object
/// number.
pub const MAX_XREF_SIZE: u32 = MAX_OBJECT_NUMBER + 1;

/// Object number of a trailer that was written inline (introduced by the
/// `trailer` keyword) rather than as a cross-reference stream object.
pub const NO_TRAILER_OBJECT_NUMBER: u32 = 0;

/// The location of a single indirect object.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ObjectInfo {
    /// The slot is deleted.
    Free {
        /// The generation number a reused slot would get.
        gen_num: u16,
    },
    /// The object lives at a byte offset in the main byte stream.
    Normal {
        /// The byte offset of the object.
        pos: u64,
        /// The generation number of the object.
        gen_num: u16,
        /// Whether the object at this slot is an object stream container.
        is_object_stream: bool,
    },
    /// The object is a member of an object stream.
    Compressed {
        /// The object number of the containing object stream.
        container: u32,
        /// The index of the object within the container.
        index: u32,
    },
}

impl ObjectInfo {
    fn is_flagged_container(&self) -> bool {
        matches!(
            self,
            ObjectInfo::Normal {
                is_object_stream: true,
                ..
            }
        )
    }
}

/// The cross-reference table of a document.
///
/// Entries are kept in ascending object-number order. The table itself does
/// not decide precedence between revisions; callers apply entries in the
/// order the precedence rules dictate, and [`CrossRefTable::merge_up`]
/// combines whole revisions with the newer one winning.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    objects: BTreeMap<u32, ObjectInfo>,
    trailer: Option<Dict>,
    trailer_object_number: u32,
    object_map_size: u32,
}

impl CrossRefTable {
    /// Create an empty table without a trailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table that only carries a trailer dictionary.
    pub fn with_trailer(trailer: Dict, trailer_object_number: u32) -> Self {
        Self {
            objects: BTreeMap::new(),
            trailer: Some(trailer),
            trailer_object_number,
            object_map_size: 0,
        }
    }

    /// The effective trailer dictionary, if one is known.
    pub fn trailer(&self) -> Option<&Dict> {
        self.trailer.as_ref()
    }

    /// The object number of the trailer, or [`NO_TRAILER_OBJECT_NUMBER`]
    /// for an inline trailer.
    pub fn trailer_object_number(&self) -> u32 {
        self.trailer_object_number
    }

    /// Replace the trailer.
    pub fn set_trailer(&mut self, trailer: Dict, trailer_object_number: u32) {
        self.trailer = Some(trailer);
        self.trailer_object_number = trailer_object_number;
    }

    /// The declared upper bound on object numbers, clamped to
    /// [`MAX_XREF_SIZE`]. Advisory: the table may still grow beyond it.
    pub fn object_map_size(&self) -> u32 {
        self.object_map_size
    }

    /// Set the advisory upper bound on object numbers.
    pub fn set_object_map_size(&mut self, size: u32) {
        self.object_map_size = size.min(MAX_XREF_SIZE);
    }

    /// The entries of the table, in ascending object-number order.
    pub fn objects_info(&self) -> impl Iterator<Item = (u32, &ObjectInfo)> {
        self.objects.iter().map(|(num, info)| (*num, info))
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// The number of entries in the table.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// The largest object number in the table, or 0 if it is empty.
    pub fn last_obj_num(&self) -> u32 {
        self.objects.keys().next_back().copied().unwrap_or(0)
    }

    /// Look up the entry for an object number.
    pub fn get_object_info(&self, obj_num: u32) -> Option<&ObjectInfo> {
        self.objects.get(&obj_num)
    }

    /// Record an object at a byte offset.
    pub fn add_normal(&mut self, obj_num: u32, gen_num: u16, is_object_stream: bool, pos: u64) {
        if obj_num >= MAX_OBJECT_NUMBER {
            return;
        }

        // A container flag set by an earlier compressed entry survives the
        // arrival of the container's own entry.
        let flagged = self
            .objects
            .get(&obj_num)
            .is_some_and(ObjectInfo::is_flagged_container);

        self.objects.insert(
            obj_num,
            ObjectInfo::Normal {
                pos,
                gen_num,
                is_object_stream: is_object_stream || flagged,
            },
        );
    }

    /// Record an object as the `index`-th member of an object stream.
    pub fn add_compressed(&mut self, obj_num: u32, container: u32, index: u32) {
        if obj_num >= MAX_OBJECT_NUMBER || container >= MAX_OBJECT_NUMBER {
            return;
        }

        self.objects
            .insert(obj_num, ObjectInfo::Compressed { container, index });

        // The container must resolve to an object stream; remember that
        // even when its own entry has not been seen yet.
        match self.objects.get_mut(&container) {
            Some(ObjectInfo::Normal {
                is_object_stream, ..
            }) => *is_object_stream = true,
            Some(_) => {}
            None => {
                self.objects.insert(
                    container,
                    ObjectInfo::Normal {
                        pos: 0,
                        gen_num: 0,
                        is_object_stream: true,
                    },
                );
            }
        }
    }

    /// Mark a slot as deleted.
    pub fn set_free(&mut self, obj_num: u32, gen_num: u16) {
        if obj_num >= MAX_OBJECT_NUMBER {
            return;
        }

        self.objects.insert(obj_num, ObjectInfo::Free { gen_num });
    }

    /// Combine two revisions of a table. Per entry the newer table wins;
    /// the trailer is the union of both with the newer table's keys taking
    /// precedence.
    pub fn merge_up(older: CrossRefTable, newer: CrossRefTable) -> CrossRefTable {
        let mut objects = older.objects;
        for (obj_num, info) in newer.objects {
            match (objects.get(&obj_num), info) {
                // A bare container flag does not replace a real location,
                // it only decorates it.
                (
                    Some(&ObjectInfo::Normal { pos, gen_num, .. }),
                    ObjectInfo::Normal {
                        pos: 0,
                        is_object_stream: true,
                        ..
                    },
                ) if pos != 0 => {
                    objects.insert(
                        obj_num,
                        ObjectInfo::Normal {
                            pos,
                            gen_num,
                            is_object_stream: true,
                        },
                    );
                }
                (Some(old), new) if old.is_flagged_container() => {
                    let new = match new {
                        ObjectInfo::Normal { pos, gen_num, .. } => ObjectInfo::Normal {
                            pos,
                            gen_num,
                            is_object_stream: true,
                        },
                        other => other,
                    };
                    objects.insert(obj_num, new);
                }
                (_, new) => {
                    objects.insert(obj_num, new);
                }
            }
        }

        let (trailer, trailer_object_number) = match (older.trailer, newer.trailer) {
            (Some(old), Some(new)) => {
                let mut merged = old;
                for (key, value) in new.entries() {
                    merged.insert(key.clone(), value.clone());
                }
                (Some(merged), newer.trailer_object_number)
            }
            (None, Some(new)) => (Some(new), newer.trailer_object_number),
            (old, None) => (old, older.trailer_object_number),
        };

        CrossRefTable {
            objects,
            trailer,
            trailer_object_number,
            object_map_size: older.object_map_size.max(newer.object_map_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Name, Object};

    fn trailer(size: i64) -> Dict {
        let mut dict = Dict::new();
        dict.insert(Name(b"Size".to_vec()), Object::Integer(size));
        dict
    }

    #[test]
    fn entries_stay_sorted() {
        let mut table = CrossRefTable::new();
        table.add_normal(9, 0, false, 900);
        table.add_normal(3, 0, false, 300);
        table.add_normal(6, 0, false, 600);

        let nums: Vec<u32> = table.objects_info().map(|(n, _)| n).collect();
        assert_eq!(nums, vec![3, 6, 9]);
        assert_eq!(table.last_obj_num(), 9);
    }

    #[test]
    fn last_obj_num_of_empty_table() {
        assert_eq!(CrossRefTable::new().last_obj_num(), 0);
    }

    #[test]
    fn object_numbers_are_bounded() {
        let mut table = CrossRefTable::new();
        table.add_normal(MAX_OBJECT_NUMBER, 0, false, 100);
        table.add_compressed(MAX_OBJECT_NUMBER + 5, 2, 0);

        assert!(table.is_empty());
        assert!(table.last_obj_num() <= MAX_OBJECT_NUMBER);
    }

    #[test]
    fn compressed_entry_flags_container() {
        let mut table = CrossRefTable::new();
        table.add_normal(2, 0, false, 200);
        table.add_compressed(5, 2, 0);

        assert_eq!(
            table.get_object_info(2),
            Some(&ObjectInfo::Normal {
                pos: 200,
                gen_num: 0,
                is_object_stream: true
            })
        );

        // The flag also survives the container entry arriving afterwards.
        let mut table = CrossRefTable::new();
        table.add_compressed(5, 2, 0);
        table.add_normal(2, 0, false, 200);

        assert_eq!(
            table.get_object_info(2),
            Some(&ObjectInfo::Normal {
                pos: 200,
                gen_num: 0,
                is_object_stream: true
            })
        );
    }

    #[test]
    fn merge_prefers_newer_entries_and_keys() {
        let mut older = CrossRefTable::with_trailer(trailer(4), NO_TRAILER_OBJECT_NUMBER);
        older
            .trailer
            .as_mut()
            .unwrap()
            .insert(Name(b"Info".to_vec()), Object::Integer(7));
        older.add_normal(1, 0, false, 100);
        older.add_normal(2, 0, false, 200);

        let mut newer = CrossRefTable::with_trailer(trailer(5), NO_TRAILER_OBJECT_NUMBER);
        newer.add_normal(2, 0, false, 999);
        newer.set_free(3, 1);

        let merged = CrossRefTable::merge_up(older, newer);

        assert_eq!(
            merged.get_object_info(1),
            Some(&ObjectInfo::Normal {
                pos: 100,
                gen_num: 0,
                is_object_stream: false
            })
        );
        assert_eq!(
            merged.get_object_info(2),
            Some(&ObjectInfo::Normal {
                pos: 999,
                gen_num: 0,
                is_object_stream: false
            })
        );
        assert_eq!(merged.get_object_info(3), Some(&ObjectInfo::Free { gen_num: 1 }));

        let trailer = merged.trailer().unwrap();
        assert_eq!(trailer.get_int(b"Size"), Some(5));
        assert_eq!(trailer.get_int(b"Info"), Some(7));
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut table = CrossRefTable::with_trailer(trailer(3), NO_TRAILER_OBJECT_NUMBER);
        table.add_normal(1, 0, false, 10);
        table.add_normal(2, 3, true, 20);

        let a = CrossRefTable::merge_up(CrossRefTable::new(), table.clone());
        let b = CrossRefTable::merge_up(table.clone(), CrossRefTable::new());
        let c = CrossRefTable::merge_up(table.clone(), table.clone());

        for merged in [a, b, c] {
            assert_eq!(
                merged.objects_info().collect::<Vec<_>>(),
                table.objects_info().collect::<Vec<_>>()
            );
            assert_eq!(merged.trailer(), table.trailer());
        }
    }

    #[test]
    fn placeholder_container_does_not_clobber_real_entry() {
        let mut older = CrossRefTable::new();
        older.add_normal(2, 0, false, 500);

        // The newer revision only saw compressed members of 2.
        let mut newer = CrossRefTable::new();
        newer.add_compressed(7, 2, 0);

        let merged = CrossRefTable::merge_up(older, newer);
        assert_eq!(
            merged.get_object_info(2),
            Some(&ObjectInfo::Normal {
                pos: 500,
                gen_num: 0,
                is_object_stream: true
            })
        );
    }

    #[test]
    fn object_map_size_is_clamped() {
        let mut table = CrossRefTable::new();
        table.set_object_map_size(u32::MAX);
        assert_eq!(table.object_map_size(), MAX_XREF_SIZE);
    }
}
