/*!
A parser core for PDF files.

This crate implements the file-structure layer of the PDF specification: it
takes the raw bytes of a document and reconstructs the map from object
numbers to indirect objects, together with the trailer dictionary that names
the document catalog. That includes all the unpleasant parts of real-world
PDFs:

- Cross-reference tables in both their classic and stream form, chained
  backwards through `/Prev`, including hybrid-reference files.
- Incremental updates, where newer revisions override entries and trailer
  keys of older ones.
- Broken cross-reference data, which is repaired by scanning the whole file
  for indirect objects and trailers.
- Encrypted documents using the standard security handler (RC4 and AES,
  revisions 2 through 6), decrypted lazily as objects are materialized.
- Objects compressed into object streams, resolved through a memoizing
  cache.
- Linearized documents, whose first-page section can be opened before the
  main cross-reference table is loaded.

What this crate does *not* do: render pages, parse fonts or images, or
interpret content streams. It stops at the object layer, so it can serve as
the foundation for such higher-level processing.

# Example
```no_run
use quire::Document;
use std::sync::Arc;

let data = std::fs::read("file.pdf").unwrap();
let mut doc = Document::open(Arc::new(data), b"").unwrap();

let root = doc.root().unwrap();
println!("catalog: {root:?}");
```

There is no usage of `unsafe` in this crate.
*/

#![deny(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

pub(crate) mod filter;
pub(crate) mod lexer;
pub(crate) mod object_stream;
pub(crate) mod trivia;

pub mod linearized;

pub mod crypto;
pub mod document;
pub mod encryptor;
pub mod object;
pub mod parser;
pub mod source;
pub mod xref;

pub use document::Document;
pub use parser::{ParseError, Parser};
pub use source::ByteSource;

/// A container for the bytes of a PDF file.
pub type PdfData = Arc<dyn ByteSource>;
