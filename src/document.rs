//! The document layer: owns the parser and caches materialized objects.
//!
//! The parser hands out objects by value; this layer keeps them alive in
//! shared handles and re-serves them, so repeated lookups of the same
//! object number are cheap and yield the same handle.

use crate::object::{Dict, ObjRef, Object};
use crate::parser::{ParseError, Parser};
use crate::PdfData;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// An opened PDF document.
pub struct Document {
    parser: Parser,
    objects: FxHashMap<u32, Rc<Object>>,
}

impl Document {
    /// Open a document with the given password (empty for unprotected
    /// files).
    pub fn open(data: PdfData, password: &[u8]) -> Result<Self, ParseError> {
        let mut parser = Parser::new(data);
        parser.start_parse(password)?;

        Ok(Self {
            parser,
            objects: FxHashMap::default(),
        })
    }

    /// Open just the first-page section of a linearized document; for
    /// non-linearized files this behaves like [`Document::open`].
    pub fn open_linearized(data: PdfData, password: &[u8]) -> Result<Self, ParseError> {
        let mut parser = Parser::new(data);
        parser.start_linearized_parse(password)?;

        Ok(Self {
            parser,
            objects: FxHashMap::default(),
        })
    }

    /// The parser backing this document.
    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Mutable access to the parser, e.g. to load the main table of a
    /// linearized document.
    pub fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }

    /// Get or materialize the indirect object with the given number.
    pub fn get_or_parse_indirect_object(&mut self, obj_num: u32) -> Option<Rc<Object>> {
        if let Some(object) = self.objects.get(&obj_num) {
            return Some(object.clone());
        }

        let object = Rc::new(self.parser.parse_indirect_object(obj_num)?);
        self.objects.insert(obj_num, object.clone());

        Some(object)
    }

    /// Resolve a reference to its object.
    pub fn resolve_ref(&mut self, reference: ObjRef) -> Option<Rc<Object>> {
        self.get_or_parse_indirect_object(reference.obj_num)
    }

    /// Resolve an object one level: references are looked up, everything
    /// else is returned as a shared handle of a clone.
    pub fn resolve(&mut self, object: &Object) -> Option<Rc<Object>> {
        match object {
            Object::Reference(r) => self.resolve_ref(*r),
            other => Some(Rc::new(other.clone())),
        }
    }

    /// The document catalog.
    pub fn root(&mut self) -> Option<Rc<Object>> {
        let root_obj_num = self.parser.root_obj_num()?;
        self.get_or_parse_indirect_object(root_obj_num)
    }

    /// The document information dictionary.
    pub fn info(&mut self) -> Option<Rc<Object>> {
        let info_obj_num = self.parser.info_obj_num()?;
        self.get_or_parse_indirect_object(info_obj_num)
    }

    /// The effective trailer dictionary.
    pub fn trailer(&self) -> Option<&Dict> {
        self.parser.trailer()
    }

    /// The document permissions.
    pub fn permissions(&self, get_owner_perms: bool) -> u32 {
        self.parser.get_permissions(get_owner_perms)
    }

    /// The file version from the header, as `10 * major + minor`.
    pub fn version(&self) -> u8 {
        self.parser.file_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn minimal_pdf() -> Vec<u8> {
        let mut data = b"%PDF-1.4\n".to_vec();
        let off1 = data.len();
        data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let off2 = data.len();
        data.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref = data.len();
        data.extend_from_slice(
            format!(
                "xref\n0 3\n0000000000 65535 f\r\n{off1:010} 00000 n\r\n{off2:010} 00000 n\r\n"
            )
            .as_bytes(),
        );
        data.extend_from_slice(
            format!("trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF").as_bytes(),
        );

        data
    }

    #[test]
    fn open_and_navigate() {
        let mut doc = Document::open(Arc::new(minimal_pdf()), b"").unwrap();

        assert_eq!(doc.version(), 14);
        assert_eq!(doc.permissions(false), 0xFFFFFFFF);

        let root = doc.root().unwrap();
        let pages_ref = root.as_dict().unwrap().get_ref(b"Pages").unwrap();
        let pages = doc.resolve_ref(pages_ref).unwrap();
        assert_eq!(pages.as_dict().unwrap().get_int(b"Count"), Some(0));
    }

    #[test]
    fn objects_are_cached_as_shared_handles() {
        let mut doc = Document::open(Arc::new(minimal_pdf()), b"").unwrap();

        let first = doc.get_or_parse_indirect_object(2).unwrap();
        let second = doc.get_or_parse_indirect_object(2).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_objects_are_absent() {
        let mut doc = Document::open(Arc::new(minimal_pdf()), b"").unwrap();

        assert!(doc.get_or_parse_indirect_object(0).is_none());
        assert!(doc.get_or_parse_indirect_object(99).is_none());
        assert!(doc.info().is_none());
    }

    #[test]
    fn resolving_direct_objects_is_identity() {
        let mut doc = Document::open(Arc::new(minimal_pdf()), b"").unwrap();

        let resolved = doc.resolve(&Object::Integer(12)).unwrap();
        assert_eq!(*resolved, Object::Integer(12));
    }
}
