//! `META-INF/container.xml`: where the package document lives.

use crate::error::{Error, Result};
use crate::io::{Archive, Compression};
use crate::xml::{Element, ns};

pub const CONTAINER_PATH: &str = "META-INF/container.xml";
pub const MIMETYPE_PATH: &str = "mimetype";
pub const EPUB_MIMETYPE: &str = "application/epub+zip";
pub const OPF_MIMETYPE: &str = "application/oebps-package+xml";

/// Read the package document path from the archive's container file.
pub fn find_opf_path(archive: &mut dyn Archive) -> Result<String> {
    let data = archive.read_entry(CONTAINER_PATH)?;
    parse_container(&data)
}

/// First `rootfile/@full-path` in a container document.
///
/// The `rootfile` element is accepted anywhere in the tree and in any
/// namespace; some producers omit the container namespace.
pub fn parse_container(data: &[u8]) -> Result<String> {
    let root = Element::parse(data)?;
    let rootfile = root
        .find_descendant(&|e| e.name.local == "rootfile")
        .ok_or_else(|| Error::MissingElement("rootfile in container.xml".into()))?;

    match ns::get_attr(rootfile, "full-path") {
        Some(path) if !path.is_empty() => Ok(path.to_string()),
        _ => Err(Error::InvalidEpub("rootfile has no full-path".into())),
    }
}

pub fn container_xml(opf_path: &str) -> Result<Vec<u8>> {
    let root = Element::new(ns::CONTAINER, "container")
        .with_attr("version", "1.0")
        .with_child(
            Element::new(ns::CONTAINER, "rootfiles").with_child(
                Element::new(ns::CONTAINER, "rootfile")
                    .with_attr("full-path", opf_path)
                    .with_attr("media-type", OPF_MIMETYPE),
            ),
        );
    root.to_xml(&[("", ns::CONTAINER)])
}

/// Write `mimetype` (stored, first) and the container file.
pub fn write_bootstrap(archive: &mut dyn Archive, opf_path: &str) -> Result<()> {
    archive.write_entry(MIMETYPE_PATH, EPUB_MIMETYPE.as_bytes(), Compression::Stored)?;
    archive.write_entry(CONTAINER_PATH, &container_xml(opf_path)?, Compression::Stored)?;
    Ok(())
}
