//! # chapterize
//!
//! A TOC-driven content segmenter for unpacked ebooks: takes a book's XHTML
//! spine files plus a sparse, anchor-based table of contents and cuts the
//! continuous content stream into one self-contained chapter fragment per
//! TOC entry, renaming embedded images to a stable `image-{n}.{ext}` scheme
//! along the way.
//!
//! Container unpacking, downloading, and persistence are deliberately not
//! here: callers hand in parsed documents, a reading order, navigation
//! entries, and image bytes, and get back serialized chapters plus an image
//! rename map. Segmentation is a pure function of those inputs — no I/O, no
//! shared state, deterministic down to the byte.
//!
//! ## Quick start
//!
//! ```
//! use std::collections::HashMap;
//! use chapterize::{Document, NavEntry, segment};
//!
//! let source = r#"<html><body>
//!     <h1 id="ch1">Chapter One</h1>
//!     <p>It begins.</p>
//! </body></html>"#;
//!
//! let order = vec!["book.xhtml".to_string()];
//! let documents = HashMap::from([
//!     ("book.xhtml".to_string(), Document::parse("book.xhtml", source).unwrap()),
//! ]);
//! let navigation = HashMap::from([
//!     ("book.xhtml".to_string(), vec![NavEntry::new("Chapter One", Some("ch1"))]),
//! ]);
//!
//! let result = segment(&order, &documents, &HashMap::new(), &navigation).unwrap();
//! assert_eq!(result.chapters.len(), 1);
//! assert!(result.chapters[0].content.starts_with("<body>"));
//! ```
//!
//! ## Splitting model
//!
//! Chapter boundaries are elements named by anchor. At each boundary the
//! containing ancestors are cloned as emptied "shells" into both the closing
//! and the opening chapter, so every fragment is well formed on its own and
//! unrelated content keeps its structural position. Content before the first
//! entry is dropped; files without entries merge wholesale into whichever
//! chapter is open when they are reached.

pub mod dom;
pub mod error;
pub mod nav;
pub mod segment;
pub mod util;

pub use dom::{Attr, Document, NodeData, NodeId, serialize_fragment};
pub use error::{Error, Result};
pub use nav::NavEntry;
pub use segment::{AssetRenamer, Chapter, Segmentation, segment};
