//! Archive access behind a small path-addressed interface.
//!
//! The document layer only ever needs whole-entry reads and writes, so
//! the ZIP details stay in [`archive`].

mod archive;

pub use archive::{ZipReader, ZipSink};

use crate::error::Result;

/// Compression hint for [`Archive::write_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

/// A path-addressed archive, opened either for reading or for writing.
pub trait Archive {
    /// Names of all entries, in archive order.
    fn entries(&self) -> Vec<String>;

    /// Read a whole entry.
    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>>;

    /// Append an entry.
    fn write_entry(&mut self, path: &str, data: &[u8], compression: Compression) -> Result<()>;

    /// Finalize the archive. Must be called at most once.
    fn finish(&mut self) -> Result<()>;
}
