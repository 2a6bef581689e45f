//! Error types for segmentation operations.

use thiserror::Error;

/// Errors that can occur while segmenting a book.
///
/// Segmentation is all-or-nothing: any of these aborts the book and no
/// partial chapter list is returned.
#[derive(Error, Debug)]
pub enum Error {
    #[error("anchor `{anchor}` for entry \"{title}\" not found in {file}")]
    AnchorNotFound {
        file: String,
        title: String,
        anchor: String,
    },

    #[error("anchor id `{anchor}` appears more than once in {file}")]
    DuplicateAnchor { file: String, anchor: String },

    #[error("navigation anchors for {file} are not in document order")]
    AnchorOrder { file: String },

    #[error("invalid navigation for {file}: {reason}")]
    InvalidNavigation { file: String, reason: String },

    #[error("malformed document {file}: {reason}")]
    MalformedDocument { file: String, reason: String },

    #[error("image `{src}` in chapter \"{chapter}\" has no matching asset")]
    UnknownAsset { src: String, chapter: String },

    #[error("reading order names {0} but no document was supplied for it")]
    MissingDocument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
