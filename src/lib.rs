//! # dawn
//!
//! Read and write EPUB 2.0 and EPUB 3.0 publications through one document
//! model.
//!
//! ## Features
//!
//! - A single [`Manifest`], [`Spine`], [`Toc`] and [`Metadata`] for both versions
//! - NCX tables of contents (2.0) and XHTML navigation documents (3.0)
//! - `opf:` qualified metadata (2.0) and `<meta refines>` refinements (3.0)
//! - Tolerant reading: non-UTF-8 package documents, XHTML entities,
//!   percent-encoded hrefs
//!
//! ## Reading
//!
//! ```no_run
//! let epub = dawn::open("book.epub")?;
//! println!("EPUB {}", epub.version());
//! for title in &epub.meta.titles {
//!     println!("Title: {title}");
//! }
//! for item in &epub.spine {
//!     println!("{} -> {}", item.id, item.href);
//! }
//! # Ok::<(), dawn::Error>(())
//! ```
//!
//! ## Writing
//!
//! ```no_run
//! use dawn::{AttributedString, Version};
//!
//! let mut epub = dawn::create("book.epub", Version::V2)?;
//! let chapter = epub.write("chapter.html", b"<html>...</html>")?;
//! epub.spine.push(&chapter);
//! epub.toc.append("chapter.html", "Chapter 1");
//! epub.meta.titles.push(AttributedString::new("My Book").with("lang", "en"));
//! epub.close()?;
//! # Ok::<(), dawn::Error>(())
//! ```

pub mod epub;
pub mod error;
pub mod io;
pub mod model;
pub mod util;
pub mod xml;

use std::path::Path;

pub use epub::{Epub, Mode, OpenOptions, Target, Version};
pub use error::{Error, ErrorKind, Lookup, Result};
pub use io::Compression;
pub use model::{AttributedString, Dates, Field, Item, Manifest, Metadata, Spine, Toc, TocEntry};

/// Open an EPUB file for reading.
pub fn open(path: impl AsRef<Path>) -> Result<Epub<'static>> {
    OpenOptions::new().open(path)
}

/// Create an EPUB file for writing with the given package version.
pub fn create(path: impl AsRef<Path>, version: Version) -> Result<Epub<'static>> {
    OpenOptions::new()
        .mode(Mode::Write)
        .version(version)
        .open(path)
}
