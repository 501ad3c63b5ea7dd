//! Shared fixtures: small EPUBs assembled in memory with the zip crate.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use dawn::{Epub, Mode, OpenOptions, Version};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const EPUB2_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Short Works</dc:title>
    <dc:creator opf:role="aut" opf:file-as="Epictetus">Epictetus</dc:creator>
    <dc:contributor opf:role="trl">George Long</dc:contributor>
    <dc:language>en</dc:language>
    <dc:identifier id="BookId" opf:scheme="UUID">urn:uuid:12345678-1234-1234-1234-123456789abc</dc:identifier>
    <dc:subject>Philosophy</dc:subject>
    <dc:subject>Stoicism</dc:subject>
    <dc:description>Discourses &amp; fragments&nbsp;in translation</dc:description>
    <dc:date opf:event="publication">2014-05-06</dc:date>
    <dc:date opf:event="modification">2020-01-02T03:04:05Z</dc:date>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="intro" href="text/intro.xhtml" media-type="application/xhtml+xml"/>
    <item id="ench" href="text/enchiridion%20one.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="css/core.css" media-type="text/css"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="intro"/>
    <itemref idref="ench"/>
  </spine>
</package>"#;

pub const EPUB2_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:12345678-1234-1234-1234-123456789abc"/></head>
  <docTitle><text>Short Works</text></docTitle>
  <navMap>
    <navPoint id="np1" playOrder="1">
      <navLabel><text>Introduction</text></navLabel>
      <content src="text/intro.xhtml"/>
    </navPoint>
    <navPoint id="np2" playOrder="2">
      <navLabel><text>The Enchiridion</text></navLabel>
      <content src="text/enchiridion%20one.xhtml"/>
      <navPoint id="np3" playOrder="3">
        <navLabel><text>Section 1</text></navLabel>
        <content src="text/enchiridion%20one.xhtml#s1"/>
      </navPoint>
    </navPoint>
  </navMap>
</ncx>"#;

pub const EPUB3_OPF: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="pub-id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="pub-id">urn:isbn:9780000000001</dc:identifier>
    <meta refines="#pub-id" property="identifier-type">15</meta>
    <dc:title id="title">Short Works</dc:title>
    <dc:creator id="author">Epictetus</dc:creator>
    <meta refines="#author" property="role">aut</meta>
    <meta refines="#author" property="file-as">Epictetus</meta>
    <dc:language>en-GB</dc:language>
    <dc:publisher xml:lang="en">Standard Ebooks</dc:publisher>
    <dc:date>2014-05-06T00:00:00Z</dc:date>
    <meta property="dcterms:modified">2020-01-02T03:04:05Z</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="intro" href="text/intro.xhtml" media-type="application/xhtml+xml"/>
    <item id="ench" href="text/enchiridion.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="intro"/>
    <itemref idref="ench"/>
  </spine>
</package>"##;

pub const EPUB3_NAV: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
  <head><title>Table of Contents</title></head>
  <body>
    <nav epub:type="landmarks"><ol><li><a href="text/intro.xhtml">Skip me</a></li></ol></nav>
    <nav epub:type="toc" id="toc">
      <h2>Contents</h2>
      <ol>
        <li><a href="text/intro.xhtml">Introduction</a></li>
        <li>
          <a href="text/enchiridion.xhtml">The Enchiridion</a>
          <ol>
            <li><a href="text/enchiridion.xhtml#s1">Section <span>1</span></a></li>
          </ol>
        </li>
      </ol>
    </nav>
  </body>
</html>"#;

/// Zip `entries` into an in-memory EPUB, `mimetype` first and stored.
pub fn build_epub(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    for (name, data) in entries {
        zip.start_file(*name, deflated).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn epub2_fixture() -> Vec<u8> {
    build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", EPUB2_OPF.as_bytes()),
        ("OEBPS/toc.ncx", EPUB2_NCX.as_bytes()),
        ("OEBPS/text/intro.xhtml", b"<html>intro</html>"),
        ("OEBPS/text/enchiridion one.xhtml", b"<html>enchiridion</html>"),
        ("OEBPS/css/core.css", b"body {}"),
    ])
}

pub fn epub3_fixture() -> Vec<u8> {
    build_epub(&[
        ("META-INF/container.xml", CONTAINER.as_bytes()),
        ("OEBPS/content.opf", EPUB3_OPF.as_bytes()),
        ("OEBPS/nav.xhtml", EPUB3_NAV.as_bytes()),
        ("OEBPS/text/intro.xhtml", b"<html>intro</html>"),
        ("OEBPS/text/enchiridion.xhtml", b"<html>enchiridion</html>"),
    ])
}

pub fn read(bytes: Vec<u8>) -> dawn::Result<Epub<'static>> {
    OpenOptions::new().open_reader(Cursor::new(bytes))
}

/// Write a document with `fill`, close it, and return the archive bytes.
pub fn write(version: Version, fill: impl FnOnce(&mut Epub<'_>)) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    let mut epub = OpenOptions::new()
        .mode(Mode::Write)
        .version(version)
        .open_writer(&mut buf)
        .unwrap();
    fill(&mut epub);
    epub.close().unwrap();
    buf.into_inner()
}
