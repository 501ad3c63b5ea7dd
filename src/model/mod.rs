//! Version-agnostic document model.
//!
//! Both EPUB dialects read into and write from these types:
//! - [`Manifest`] and [`Item`]: the publication's resources
//! - [`Spine`]: the reading order
//! - [`Toc`] and [`TocEntry`]: the table of contents tree
//! - [`Metadata`] and [`AttributedString`]: Dublin Core fields

mod manifest;
mod metadata;
mod toc;

pub use manifest::{Item, Manifest, Spine};
pub use metadata::{AttributedString, DateKind, Dates, Field, Metadata};
pub use toc::{Toc, TocEntry};
