//! Package versions and the per-version read/write strategy.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use super::Epub;
use super::epub2::Epub2;
use super::epub3::Epub3;
use crate::error::{Error, Lookup, Result};
use crate::model::{AttributedString, Field, Item, Metadata};
use crate::util::parse_date;
use crate::xml::{Element, ns};

/// The package dialects dawn understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum Version {
    /// EPUB 2.0: NCX table of contents, `opf:`-qualified Dublin Core.
    #[cfg_attr(feature = "cli", serde(rename = "2.0"))]
    V2,
    /// EPUB 3.0: XHTML navigation document, `<meta refines>` metadata.
    #[cfg_attr(feature = "cli", serde(rename = "3.0"))]
    V3,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::V2 => "2.0",
            Version::V3 => "3.0",
        }
    }

    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Version::V2 => &Epub2,
            Version::V3 => &Epub3,
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "2.0" => Ok(Version::V2),
            "3.0" => Ok(Version::V3),
            other => Err(Error::UnsupportedVersion(other.to_string())),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one package version maps between XML and the document model.
///
/// Reading runs `read_manifest`, `read_spine`, `read_toc`, `read_meta` in
/// that order against the parsed package root. Writing calls `write_toc`
/// (only when there is a TOC to write) and then builds the package from
/// `xml_meta`, `xml_manifest` and `xml_spine`.
pub trait Dialect: Sync {
    fn version(&self) -> Version;

    fn read_manifest(&self, epub: &mut Epub<'_>, opf: &Element) -> Result<()> {
        let manifest = section(opf, "manifest")?;
        for item in manifest.find_all(ns::OPF, "item") {
            match (ns::get_attr(item, "id"), ns::get_attr(item, "href")) {
                (Some(id), Some(href)) => {
                    epub.manifest.insert(id, href);
                }
                _ => tracing::warn!("manifest item without id or href skipped"),
            }
        }
        Ok(())
    }

    fn read_spine(&self, epub: &mut Epub<'_>, opf: &Element) -> Result<()> {
        let spine = section(opf, "spine")?;
        for itemref in spine.find_all(ns::OPF, "itemref") {
            let Some(idref) = ns::get_attr(itemref, "idref") else {
                tracing::warn!("spine itemref without idref skipped");
                continue;
            };
            let item = epub
                .manifest
                .get(idref)
                .ok_or_else(|| Error::not_found(Lookup::Id, idref))?;
            epub.spine.push(item);
        }
        Ok(())
    }

    fn read_toc(&self, epub: &mut Epub<'_>, opf: &Element) -> Result<()>;

    fn read_meta(&self, meta: &mut Metadata, opf: &Element) -> Result<()>;

    /// Write the TOC resource and make sure `epub.toc.item` points at it.
    fn write_toc(&self, epub: &mut Epub<'_>) -> Result<()>;

    fn xml_meta(&self, epub: &Epub<'_>) -> Element;

    fn xml_manifest(&self, epub: &Epub<'_>) -> Element {
        manifest_element(epub.manifest.iter())
    }

    fn xml_spine(&self, epub: &Epub<'_>) -> Result<Element> {
        spine_element(epub)
    }
}

/// One row of a metadata mapping table: the field and the attributes
/// written directly on its `dc:` element, as wire names.
#[derive(Debug, Clone, Copy)]
pub struct MetaRule {
    pub field: Field,
    pub attrs: &'static [&'static str],
}

impl MetaRule {
    pub const fn new(field: Field, attrs: &'static [&'static str]) -> Self {
        Self { field, attrs }
    }

    /// Whether `key` (a model attribute name) has a direct wire slot.
    pub fn has_slot(&self, key: &str) -> bool {
        self.attrs.iter().any(|a| ns::local_part(a) == key)
    }
}

/// A required child of the package root.
pub(crate) fn section<'e>(opf: &'e Element, name: &str) -> Result<&'e Element> {
    opf.find(ns::OPF, name)
        .ok_or_else(|| Error::MissingElement(format!("package/{}", name)))
}

/// Every `dc:<tag>` for `rule`, with the rule's attributes copied under
/// their model names.
pub(crate) fn extract(metadata: &Element, rule: &MetaRule) -> Vec<(AttributedString, Option<String>)> {
    metadata
        .find_all(ns::DC, rule.field.tag())
        .map(|el| {
            let mut value = AttributedString::new(el.text());
            for wire in rule.attrs {
                if let Some(v) = ns::get_attr(el, wire) {
                    value.insert(ns::local_part(wire), v);
                }
            }
            let id = ns::get_attr(el, "id").map(str::to_string);
            (value, id)
        })
        .collect()
}

/// Parse a metadata date, logging what gets dropped.
pub(crate) fn read_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let date = parse_date(text);
    if date.is_none() {
        tracing::warn!(date = text, "unparseable date ignored");
    }
    date
}

/// A `dc:<tag>` element carrying the rule's attributes that `value` sets.
pub(crate) fn dc_element(rule: &MetaRule, value: &AttributedString) -> Element {
    let mut el = Element::new(ns::DC, rule.field.tag()).with_text(&value.value);
    for wire in rule.attrs {
        if let Some(v) = value.get(ns::local_part(wire))
            && !v.is_empty()
        {
            el.set_attr(ns::qualify(wire), v);
        }
    }
    el
}

/// `<metadata>` opened with the format declaration every package carries.
pub(crate) fn metadata_element() -> Element {
    Element::new(ns::OPF, "metadata")
        .with_child(Element::new(ns::DC, "format").with_text(super::container::EPUB_MIMETYPE))
}

pub(crate) fn item_element(item: &Item) -> Element {
    let mut el = Element::new(ns::OPF, "item")
        .with_attr("id", &item.id)
        .with_attr("href", &item.href);
    if let Some(mimetype) = item.mimetype() {
        el = el.with_attr("media-type", mimetype);
    }
    el
}

pub(crate) fn manifest_element<'i>(items: impl IntoIterator<Item = &'i Item>) -> Element {
    let mut manifest = Element::new(ns::OPF, "manifest");
    for item in items {
        manifest.push(item_element(item));
    }
    manifest
}

/// `<spine>`; every referenced item must still be in the manifest.
pub(crate) fn spine_element(epub: &Epub<'_>) -> Result<Element> {
    let mut spine = Element::new(ns::OPF, "spine");
    for item in &epub.spine {
        if !epub.manifest.contains(&item.id) {
            return Err(Error::not_found(Lookup::Id, &item.id));
        }
        spine.push(Element::new(ns::OPF, "itemref").with_attr("idref", &item.id));
    }
    Ok(spine)
}
