//! Error types for dawn operations.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while opening, reading or writing an EPUB.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The caller used the API in a way the current document does not allow.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A referenced key does not exist.
    #[error("{kind} not found: {key}")]
    NotFound { kind: Lookup, key: String },

    #[error("Unsupported EPUB version: {0}")]
    UnsupportedVersion(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),
}

/// What a [`Error::NotFound`] was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// A manifest href (fragment already stripped).
    Href,
    /// A manifest identifier.
    Id,
    /// The identifier designated by the package's `unique-identifier`.
    UniqueIdentifier,
    /// A path inside the archive.
    Entry,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lookup::Href => "Manifest href",
            Lookup::Id => "Manifest id",
            Lookup::UniqueIdentifier => "Unique identifier",
            Lookup::Entry => "Archive entry",
        })
    }
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Lookup,
    Format,
    Io,
}

impl Error {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }

    pub(crate) fn not_found(kind: Lookup, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Usage(_) => ErrorKind::Usage,
            Error::NotFound { .. } => ErrorKind::Lookup,
            Error::UnsupportedVersion(_)
            | Error::MissingElement(_)
            | Error::InvalidEpub(_)
            | Error::Xml(_)
            | Error::XmlAttr(_)
            | Error::Utf8(_) => ErrorKind::Format,
            Error::Io(_) | Error::Zip(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found(Lookup::Href, "missing.xhtml");
        assert_eq!(err.to_string(), "Manifest href not found: missing.xhtml");
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::usage("nope").kind(), ErrorKind::Usage);
        assert_eq!(
            Error::UnsupportedVersion("4.0".into()).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            Error::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_messages_share_one_register() {
        let errors = [
            Error::usage("nope"),
            Error::not_found(Lookup::Id, "x"),
            Error::UnsupportedVersion("4.0".into()),
            Error::MissingElement("package".into()),
            Error::InvalidEpub("bad".into()),
        ];
        for err in errors {
            let msg = err.to_string();
            assert!(msg.starts_with(char::is_uppercase), "{msg}");
        }
        assert_eq!(Error::usage("nope").to_string(), "Usage error: nope");
    }
}
