//! Reading hand-built EPUB 2 and EPUB 3 packages.

mod common;

use std::io::{Cursor, Read};

use chrono::{Datelike, Timelike};
use common::*;
use dawn::{AttributedString, ErrorKind, Lookup, OpenOptions, TocEntry, Version};

#[test]
fn test_read_epub2_structure() {
    let epub = read(epub2_fixture()).unwrap();

    assert_eq!(epub.version(), Version::V2);
    assert_eq!(epub.opf_path(), "OEBPS/content.opf");

    // The NCX is the TOC's backing item, not an ordinary resource.
    let ids: Vec<_> = epub.manifest.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["intro", "ench", "css"]);
    assert_eq!(epub.toc.item.as_ref().unwrap().href, "toc.ncx");

    let spine: Vec<_> = epub.spine.iter().map(|i| i.href.as_str()).collect();
    assert_eq!(spine, ["text/intro.xhtml", "text/enchiridion%20one.xhtml"]);
}

#[test]
fn test_read_epub2_toc() {
    let epub = read(epub2_fixture()).unwrap();

    assert_eq!(epub.toc.title.as_deref(), Some("Short Works"));
    assert_eq!(epub.toc.len(), 2);
    assert_eq!(epub.toc[0], TocEntry::new("text/intro.xhtml", "Introduction"));
    assert_eq!(epub.toc[1].title, "The Enchiridion");
    assert_eq!(
        epub.toc[1].children,
        [TocEntry::new("text/enchiridion%20one.xhtml#s1", "Section 1")]
    );
}

#[test]
fn test_read_epub2_metadata() {
    let epub = read(epub2_fixture()).unwrap();
    let meta = &epub.meta;

    assert_eq!(meta.titles, [AttributedString::new("Short Works")]);
    assert_eq!(
        meta.creators,
        [AttributedString::new("Epictetus")
            .with("role", "aut")
            .with("file-as", "Epictetus")]
    );
    assert_eq!(meta.contributors[0].get("role"), Some("trl"));
    assert_eq!(meta.subjects.len(), 2);
    assert_eq!(
        meta.description.as_ref().unwrap().value,
        "Discourses & fragments\u{a0}in translation"
    );

    let publication = meta.dates.publication.unwrap();
    assert_eq!((publication.year(), publication.month(), publication.day()), (2014, 5, 6));
    let modification = meta.dates.modification.unwrap();
    assert_eq!(modification.second(), 5);
    assert!(meta.dates.creation.is_none());

    let uid = epub.uid().unwrap();
    assert_eq!(uid.value, "urn:uuid:12345678-1234-1234-1234-123456789abc");
    assert_eq!(uid.get("scheme"), Some("UUID"));
}

#[test]
fn test_read_percent_encoded_href() {
    let mut epub = read(epub2_fixture()).unwrap();
    let item = epub.manifest.get("ench").unwrap().clone();
    assert_eq!(epub.read(&item).unwrap(), b"<html>enchiridion</html>");

    let mut text = String::new();
    epub.open("css/core.css")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "body {}");

    let err = epub.read("missing.xhtml").unwrap_err();
    assert!(matches!(
        err,
        dawn::Error::NotFound {
            kind: Lookup::Entry,
            ..
        }
    ));
}

#[test]
fn test_read_epub3() {
    let epub = read(epub3_fixture()).unwrap();

    assert_eq!(epub.version(), Version::V3);
    assert_eq!(epub.manifest.len(), 2);
    assert!(epub.manifest.get("nav").is_none());
    assert_eq!(epub.toc.item.as_ref().unwrap().id, "nav");

    // Only the toc nav is read, and its heading becomes the title.
    assert_eq!(epub.toc.title.as_deref(), Some("Contents"));
    assert_eq!(epub.toc.len(), 2);
    assert_eq!(epub.toc[0].title, "Introduction");
    assert_eq!(
        epub.toc[1].children,
        [TocEntry::new("text/enchiridion.xhtml#s1", "Section 1")]
    );

    let meta = &epub.meta;
    let uid = epub.uid().unwrap();
    assert_eq!(uid.value, "urn:isbn:9780000000001");
    assert_eq!(uid.get("scheme"), Some("15"));
    assert_eq!(uid.get("id"), Some("pub-id"));
    assert_eq!(meta.titles, [AttributedString::new("Short Works")]);
    assert_eq!(meta.creators[0].get("role"), Some("aut"));
    assert_eq!(meta.creators[0].get("file-as"), Some("Epictetus"));
    assert_eq!(
        meta.publisher,
        Some(AttributedString::new("Standard Ebooks").with("lang", "en"))
    );
    assert_eq!(meta.dates.publication.unwrap().year(), 2014);
    assert_eq!(meta.dates.modification.unwrap().year(), 2020);
}

#[test]
fn test_version_override() {
    // A 3.0 package read with the 2.0 dialect: no spine toc, so no TOC.
    let epub = OpenOptions::new()
        .version(Version::V2)
        .open_reader(Cursor::new(epub3_fixture()))
        .unwrap();
    assert_eq!(epub.version(), Version::V2);
    assert!(epub.toc.is_empty());
    assert!(epub.toc.item.is_none());
    assert!(epub.manifest.get("nav").is_some());
}

#[test]
fn test_unsupported_version() {
    let opf = EPUB2_OPF.replace(r#"version="2.0""#, r#"version="4.0""#);
    let bytes = build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
    ]);
    let err = read(bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(matches!(err, dawn::Error::UnsupportedVersion(ref v) if v == "4.0"));
}

#[test]
fn test_missing_container() {
    let bytes = build_epub(&[("OEBPS/content.opf", EPUB2_OPF.as_bytes())]);
    let err = read(bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn test_missing_package_sections() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf" version="2.0"><metadata/></package>"#;
    let bytes = build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
    ]);
    let err = read(bytes).unwrap_err();
    assert!(matches!(err, dawn::Error::MissingElement(_)));
}

#[test]
fn test_dangling_unique_identifier() {
    let opf = EPUB2_OPF.replace(r#"unique-identifier="BookId""#, r#"unique-identifier="nope""#);
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/toc.ncx", EPUB2_NCX.as_bytes()),
    ];
    let err = read(build_epub(&entries)).unwrap_err();
    assert!(matches!(
        err,
        dawn::Error::NotFound {
            kind: Lookup::UniqueIdentifier,
            ref key,
        } if key == "nope"
    ));

    // Without the attribute there is simply no uid.
    let opf = EPUB2_OPF.replace(r#" unique-identifier="BookId""#, "");
    entries[1] = ("OEBPS/content.opf", opf.as_bytes());
    let epub = read(build_epub(&entries)).unwrap();
    assert!(epub.uid().is_none());
}

#[test]
fn test_spine_references_unknown_item() {
    let opf = EPUB2_OPF.replace(r#"<itemref idref="ench"/>"#, r#"<itemref idref="ghost"/>"#);
    let bytes = build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/toc.ncx", EPUB2_NCX.as_bytes()),
    ]);
    let err = read(bytes).unwrap_err();
    assert!(matches!(
        err,
        dawn::Error::NotFound {
            kind: Lookup::Id,
            ..
        }
    ));
}

#[test]
fn test_latin1_package_document() {
    let mut opf = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Caf"#
        .to_vec();
    opf.push(0xE9);
    opf.extend_from_slice(b"</dc:title></metadata><manifest/><spine/></package>");

    let bytes = build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", opf.as_slice()),
    ]);
    let epub = read(bytes).unwrap();
    assert_eq!(epub.meta.titles[0].value, "Café");
    assert!(epub.uid().is_none());
}

#[test]
fn test_read_mode_rejects_writes() {
    let mut epub = read(epub2_fixture()).unwrap();
    let err = epub.write("new.xhtml", b"x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
    epub.close().unwrap();
}
