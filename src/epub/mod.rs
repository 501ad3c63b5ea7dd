//! Opening, reading and writing EPUB packages.
//!
//! An [`Epub`] is opened either for reading, in which case the whole
//! package is parsed into the document model immediately, or for writing,
//! in which case the caller fills the model and [`Epub::close`] serializes
//! it. The package version selects the [`Dialect`] that does the mapping.

pub mod container;
mod dialect;
mod epub2;
mod epub3;

pub use dialect::{Dialect, MetaRule, Version};
pub use epub2::Epub2;
pub use epub3::Epub3;

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Lookup, Result};
use crate::io::{Archive, Compression, ZipReader, ZipSink};
use crate::model::{AttributedString, Item, Manifest, Metadata, Spine, Toc};
use crate::util::{parent_dir, resolve_path, strip_fragment};
use crate::xml::{Element, ns};

/// Package document path used when writing without an explicit one.
pub const DEFAULT_OPF_PATH: &str = "content.opf";

/// Identifier id of the synthesized unique identifier.
pub const UID_ID: &str = "uid_id";

const PACKAGE_NSMAP: &[(&str, &str)] = &[("", ns::OPF), ("opf", ns::OPF), ("dc", ns::DC)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Read,
    Write,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Mode::Read),
            "w" => Ok(Mode::Write),
            other => Err(Error::usage(format!(
                "unsupported mode {:?}; supported modes are r and w",
                other
            ))),
        }
    }
}

/// Options for opening an [`Epub`].
///
/// # Example
///
/// ```no_run
/// use dawn::{Mode, OpenOptions, Version};
///
/// OpenOptions::new()
///     .mode(Mode::Write)
///     .version(Version::V3)
///     .opf_path("OEBPS/content.opf")
///     .with("book.epub", |epub| {
///         let chapter = epub.write("chapter.xhtml", b"<html/>")?;
///         epub.spine.push(&chapter);
///         epub.toc.append(&chapter.href, "Chapter 1");
///         Ok(())
///     })?;
/// # Ok::<(), dawn::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    mode: Mode,
    version: Option<Version>,
    opf_path: Option<String>,
    compression: Compression,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Required when writing. When reading, overrides the version the
    /// package declares.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Where to write the package document. Only valid when writing.
    pub fn opf_path(mut self, path: impl Into<String>) -> Self {
        self.opf_path = Some(path.into());
        self
    }

    /// Compression used by [`Epub::write`] and for the package document.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Open a file. In write mode the file is created (or truncated) only
    /// after the options have been validated.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Epub<'static>> {
        self.validate()?;
        match self.mode {
            Mode::Read => self.open_reader(File::open(path)?),
            Mode::Write => self.open_writer(File::create(path)?),
        }
    }

    /// Open for reading from any [`Read`] + [`Seek`] source.
    pub fn open_reader<'a, R: Read + Seek + 'a>(&self, reader: R) -> Result<Epub<'a>> {
        self.validate()?;
        if self.mode != Mode::Read {
            return Err(Error::usage("open_reader requires read mode"));
        }
        let archive = Box::new(ZipReader::new(reader)?);
        Epub::read_from(archive, self.version, self.compression)
    }

    /// Open for writing into any [`Write`] + [`Seek`] sink.
    pub fn open_writer<'a, W: Write + Seek + 'a>(&self, writer: W) -> Result<Epub<'a>> {
        self.validate()?;
        if self.mode != Mode::Write {
            return Err(Error::usage("open_writer requires write mode"));
        }
        let version = self
            .version
            .ok_or_else(|| Error::usage("a version is required in write mode"))?;
        let opf_path = self.opf_path.as_deref().unwrap_or(DEFAULT_OPF_PATH);
        Epub::create_in(Box::new(ZipSink::new(writer)), version, opf_path, self.compression)
    }

    /// Open `path`, run `f`, and close the document whatever `f` returns.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with<T>(
        &self,
        path: impl AsRef<Path>,
        f: impl FnOnce(&mut Epub<'static>) -> Result<T>,
    ) -> Result<T> {
        let mut epub = self.open(path)?;
        let result = f(&mut epub);
        let closed = epub.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    fn validate(&self) -> Result<()> {
        match self.mode {
            Mode::Read if self.opf_path.is_some() => Err(Error::usage(
                "opf_path can only be set in write mode",
            )),
            Mode::Write if self.version.is_none() => {
                Err(Error::usage("a version is required in write mode"))
            }
            Mode::Write if self.opf_path.as_deref() == Some("") => {
                Err(Error::usage("opf_path must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Something [`Epub::write`] can store data under.
#[derive(Debug, Clone, Copy)]
pub enum Target<'t> {
    /// A path relative to the package document; added to the manifest.
    Href(&'t str),
    /// A manifest item; added to the manifest if it is not there yet.
    Item(&'t Item),
}

impl<'t> From<&'t str> for Target<'t> {
    fn from(href: &'t str) -> Self {
        Target::Href(href)
    }
}

impl<'t> From<&'t String> for Target<'t> {
    fn from(href: &'t String) -> Self {
        Target::Href(href)
    }
}

impl<'t> From<&'t Item> for Target<'t> {
    fn from(item: &'t Item) -> Self {
        Target::Item(item)
    }
}

/// An open EPUB package.
pub struct Epub<'a> {
    archive: Box<dyn Archive + 'a>,
    mode: Mode,
    version: Version,
    opf_path: String,
    uid_id: Option<String>,
    compression: Compression,
    pub manifest: Manifest,
    pub spine: Spine,
    pub toc: Toc,
    pub meta: Metadata,
}

impl<'a> Epub<'a> {
    fn new(
        archive: Box<dyn Archive + 'a>,
        mode: Mode,
        version: Version,
        opf_path: String,
        compression: Compression,
    ) -> Self {
        Self {
            archive,
            mode,
            version,
            opf_path,
            uid_id: None,
            compression,
            manifest: Manifest::new(),
            spine: Spine::new(),
            toc: Toc::new(),
            meta: Metadata::new(),
        }
    }

    fn read_from(
        mut archive: Box<dyn Archive + 'a>,
        version: Option<Version>,
        compression: Compression,
    ) -> Result<Self> {
        let opf_path = container::find_opf_path(archive.as_mut())?;
        let opf = Element::parse(&archive.read_entry(&opf_path)?)?;
        if !opf.is(ns::OPF, "package") {
            return Err(Error::MissingElement("package".into()));
        }

        let version = match version {
            Some(version) => version,
            None => ns::get_attr(&opf, "version")
                .ok_or_else(|| Error::MissingElement("package/@version".into()))?
                .parse()?,
        };
        tracing::debug!(%version, opf_path = %opf_path, "opening EPUB for reading");

        let mut epub = Epub::new(archive, Mode::Read, version, opf_path, compression);
        let dialect = version.dialect();
        dialect.read_manifest(&mut epub, &opf)?;
        dialect.read_spine(&mut epub, &opf)?;
        dialect.read_toc(&mut epub, &opf)?;
        dialect.read_meta(&mut epub.meta, &opf)?;

        if let Some(uid_id) = ns::get_attr(&opf, "unique-identifier") {
            if !epub.meta.identifiers.iter().any(|i| i.get("id") == Some(uid_id)) {
                return Err(Error::not_found(Lookup::UniqueIdentifier, uid_id));
            }
            epub.uid_id = Some(uid_id.to_string());
        }

        tracing::debug!(
            manifest = epub.manifest.len(),
            spine = epub.spine.len(),
            toc = epub.toc.len(),
            "package read"
        );
        Ok(epub)
    }

    fn create_in(
        mut archive: Box<dyn Archive + 'a>,
        version: Version,
        opf_path: &str,
        compression: Compression,
    ) -> Result<Self> {
        tracing::debug!(%version, opf_path, "opening EPUB for writing");
        container::write_bootstrap(archive.as_mut(), opf_path)?;

        let mut epub = Epub::new(archive, Mode::Write, version, opf_path.to_string(), compression);
        let uid = AttributedString::new(uuid::Uuid::new_v4().to_string())
            .with("id", UID_ID)
            .with("scheme", "uuid");
        epub.meta.identifiers = vec![uid];
        epub.uid_id = Some(UID_ID.to_string());
        Ok(epub)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The identifier the package designates as unique, if any.
    pub fn uid(&self) -> Option<&AttributedString> {
        let uid_id = self.uid_id.as_deref()?;
        self.meta
            .identifiers
            .iter()
            .find(|i| i.get("id") == Some(uid_id))
    }

    /// Path of the package document inside the archive.
    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    /// Entry names in the archive (so far, when writing).
    pub fn entries(&self) -> Vec<String> {
        self.archive.entries()
    }

    /// Read a resource by href (relative to the package document) or item.
    pub fn read(&mut self, target: impl AsRef<str>) -> Result<Vec<u8>> {
        let path = self.archive_path(strip_fragment(target.as_ref()));
        self.archive.read_entry(&path)
    }

    /// Like [`Epub::read`], as a reader.
    pub fn open(&mut self, target: impl AsRef<str>) -> Result<Cursor<Vec<u8>>> {
        Ok(Cursor::new(self.read(target)?))
    }

    /// Store `data` in the archive and make sure the manifest lists it.
    ///
    /// An href is added through [`Manifest::add`]; an item is inserted
    /// as-is unless its id is already in the manifest.
    pub fn write<'t>(&mut self, target: impl Into<Target<'t>>, data: &[u8]) -> Result<Item> {
        self.write_with(target, data, self.compression)
    }

    pub fn write_with<'t>(
        &mut self,
        target: impl Into<Target<'t>>,
        data: &[u8],
        compression: Compression,
    ) -> Result<Item> {
        if self.mode != Mode::Write {
            return Err(Error::usage("cannot write: EPUB was opened for reading"));
        }

        let target = target.into();
        let href = match target {
            Target::Href(href) => href,
            Target::Item(item) => item.href.as_str(),
        };
        if href.is_empty() {
            return Err(Error::usage("write needs an href or a manifest item"));
        }

        let path = self.archive_path(href);
        self.archive.write_entry(&path, data, compression)?;

        let item = match target {
            Target::Item(item) if self.manifest.contains(&item.id) => item.clone(),
            Target::Item(item) => self.manifest.insert_item(item.clone()),
            Target::Href(href) => self.manifest.add(href),
        };
        tracing::trace!(id = %item.id, path = %path, "resource written");
        Ok(item)
    }

    /// Write a resource that is not part of the manifest.
    pub(crate) fn write_resource(&mut self, href: &str, data: &[u8]) -> Result<()> {
        let path = self.archive_path(href);
        self.archive.write_entry(&path, data, self.compression)
    }

    /// Finish the document. In write mode this serializes the package.
    ///
    /// The archive is finalized even when serialization fails; the first
    /// error is returned.
    pub fn close(mut self) -> Result<()> {
        let written = match self.mode {
            Mode::Write => self.write_package(),
            Mode::Read => Ok(()),
        };
        let finished = self.archive.finish();
        tracing::debug!(
            mode = ?self.mode,
            entries = self.archive.entries().len(),
            ok = written.is_ok() && finished.is_ok(),
            "EPUB closed"
        );
        written.and(finished)
    }

    fn write_package(&mut self) -> Result<()> {
        self.meta.dates.modification = Some(chrono::Utc::now().naive_utc());

        let dialect = self.version.dialect();
        if !self.toc.is_empty() || self.toc.item.is_some() {
            dialect.write_toc(self)?;
        }

        let mut package = Element::new(ns::OPF, "package").with_attr("version", self.version.as_str());
        if let Some(uid_id) = &self.uid_id {
            if self.uid().is_none() {
                tracing::warn!(uid_id = %uid_id, "unique identifier missing from identifiers");
            }
            package = package.with_attr("unique-identifier", uid_id);
        }
        package.push(dialect.xml_meta(self));
        package.push(dialect.xml_manifest(self));
        package.push(dialect.xml_spine(self)?);

        let data = package.to_xml(PACKAGE_NSMAP)?;
        self.archive.write_entry(&self.opf_path, &data, self.compression)
    }

    /// `href` if neither the manifest nor the archive uses it yet,
    /// otherwise the first free `<stem>-<n>.<ext>`.
    pub(crate) fn free_href(&self, href: &str) -> String {
        let entries = self.archive.entries();
        let taken = |candidate: &str| {
            entries.contains(&self.archive_path(candidate))
                || self
                    .manifest
                    .iter()
                    .any(|item| strip_fragment(&item.href) == candidate)
        };
        if !taken(href) {
            return href.to_string();
        }

        let (stem, ext) = match href.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (href, None),
        };
        (1..)
            .map(|n| match ext {
                Some(ext) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", stem, n),
            })
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| href.to_string())
    }

    fn archive_path(&self, href: &str) -> String {
        resolve_path(parent_dir(&self.opf_path), href)
    }
}

impl fmt::Debug for Epub<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Epub")
            .field("version", &self.version)
            .field("mode", &self.mode)
            .field("opf_path", &self.opf_path)
            .field("manifest", &self.manifest.len())
            .field("spine", &self.spine.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn writer(version: Version) -> Epub<'static> {
        OpenOptions::new()
            .mode(Mode::Write)
            .version(version)
            .open_writer(Cursor::new(Vec::new()))
            .unwrap()
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("r".parse::<Mode>().unwrap(), Mode::Read);
        assert_eq!("w".parse::<Mode>().unwrap(), Mode::Write);
        assert_eq!("a".parse::<Mode>().unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_option_validation() {
        let err = OpenOptions::new()
            .mode(Mode::Write)
            .open_writer(Cursor::new(Vec::new()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = OpenOptions::new()
            .opf_path("x.opf")
            .open_reader(Cursor::new(Vec::new()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = OpenOptions::new()
            .version(Version::V2)
            .open_writer(Cursor::new(Vec::new()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_write_mode_bootstrap() {
        let epub = writer(Version::V2);
        assert_eq!(epub.entries(), ["mimetype", "META-INF/container.xml"]);
        assert_eq!(epub.opf_path(), DEFAULT_OPF_PATH);

        let uid = epub.uid().unwrap();
        assert_eq!(uid.get("id"), Some(UID_ID));
        assert_eq!(uid.get("scheme"), Some("uuid"));
        assert_eq!(uuid::Uuid::parse_str(&uid.value).unwrap().get_version_num(), 4);
        assert_eq!(epub.meta.identifiers.len(), 1);
    }

    #[test]
    fn test_write_targets() {
        let mut epub = OpenOptions::new()
            .mode(Mode::Write)
            .version(Version::V3)
            .opf_path("OEBPS/content.opf")
            .open_writer(Cursor::new(Vec::new()))
            .unwrap();

        let a = epub.write("text/a.xhtml", b"a").unwrap();
        assert_eq!(a.id, "item-0");

        let custom = Item::new("cover", "cover.png");
        let b = epub.write(&custom, b"png").unwrap();
        assert_eq!(b, custom);
        // An id already in the manifest keeps its existing entry.
        let again = epub.write(&Item::new("cover", "cover-2.png"), b"png").unwrap();
        assert_eq!(again.href, "cover-2.png");
        assert_eq!(epub.manifest.get("cover").unwrap().href, "cover.png");
        assert_eq!(epub.manifest.len(), 2);

        assert!(epub.entries().contains(&"OEBPS/text/a.xhtml".to_string()));
        assert!(epub.entries().contains(&"OEBPS/cover.png".to_string()));

        assert_eq!(epub.write("", b"").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(epub.read("text/a.xhtml").unwrap_err().kind(), ErrorKind::Usage);
        epub.close().unwrap();
    }

    #[test]
    fn test_free_href() {
        let mut epub = writer(Version::V3);
        assert_eq!(epub.free_href("nav.xhtml"), "nav.xhtml");

        epub.write("nav.xhtml", b"chapter").unwrap();
        assert_eq!(epub.free_href("nav.xhtml"), "nav-1.xhtml");

        // Manifest entries count even when nothing was written yet.
        epub.manifest.add("nav-1.xhtml#top");
        assert_eq!(epub.free_href("nav.xhtml"), "nav-2.xhtml");
        epub.close().unwrap();
    }

    #[test]
    fn test_close_reports_dangling_spine() {
        let mut epub = writer(Version::V2);
        let item = epub.manifest.add("gone.html");
        epub.spine.push(&item);
        epub.manifest.remove(&item.id);

        let err = epub.close().unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                kind: Lookup::Id,
                ..
            }
        ));
    }
}
