//! EPUB 2.0: NCX navigation and `opf:`-qualified Dublin Core.

use super::Epub;
use super::dialect::{
    Dialect, MetaRule, Version, dc_element, extract, manifest_element, metadata_element,
    read_date, section, spine_element,
};
use crate::error::{Error, Lookup, Result};
use crate::model::{DateKind, Field, Item, Metadata, Toc, TocEntry};
use crate::util::format_date;
use crate::xml::{Element, ns};

const NCX_ID: &str = "ncx";
const NCX_HREF: &str = "toc.ncx";

/// Dublin Core fields and their `opf:` attributes. `type`, `format`,
/// `relation`, `coverage` and `rights` are not read; dates are handled
/// separately through `opf:event`.
const META: &[MetaRule] = &[
    MetaRule::new(Field::Title, &["xml:lang"]),
    MetaRule::new(Field::Creator, &["opf:role", "opf:file-as"]),
    MetaRule::new(Field::Subject, &[]),
    MetaRule::new(Field::Description, &["xml:lang"]),
    MetaRule::new(Field::Publisher, &["xml:lang"]),
    MetaRule::new(Field::Contributor, &["opf:role", "opf:file-as"]),
    MetaRule::new(Field::Identifier, &["id", "opf:scheme"]),
    MetaRule::new(Field::Source, &[]),
    MetaRule::new(Field::Language, &[]),
];

pub struct Epub2;

impl Dialect for Epub2 {
    fn version(&self) -> Version {
        Version::V2
    }

    fn read_toc(&self, epub: &mut Epub<'_>, opf: &Element) -> Result<()> {
        let spine = section(opf, "spine")?;
        let Some(toc_id) = ns::get_attr(spine, "toc") else {
            return Ok(());
        };

        let item = epub
            .manifest
            .remove(toc_id)
            .ok_or_else(|| Error::not_found(Lookup::Id, toc_id))?;
        let data = epub.read(&item)?;
        epub.toc.item = Some(item);

        let ncx = Element::parse(&data)?;
        if let Some(nav_map) = ncx.find(ns::NCX, "navMap") {
            epub.toc.entries = nav_points(nav_map);
        }
        epub.toc.title = ncx
            .find(ns::NCX, "docTitle")
            .and_then(|t| t.find(ns::NCX, "text"))
            .map(Element::text)
            .filter(|t| !t.trim().is_empty());

        Ok(())
    }

    fn read_meta(&self, meta: &mut Metadata, opf: &Element) -> Result<()> {
        let metadata = section(opf, "metadata")?;

        for rule in META {
            let values = extract(metadata, rule).into_iter().map(|(v, _)| v).collect();
            meta.set(rule.field, values);
        }

        for date in metadata.find_all(ns::DC, "date") {
            let event = ns::get_attr(date, "opf:event").or_else(|| ns::get_attr(date, "event"));
            // An undated event is the publication date.
            let kind = match event {
                Some(event) => DateKind::from_name(event),
                None => Some(DateKind::Publication),
            };
            match kind {
                Some(kind) => {
                    if let Some(parsed) = read_date(&date.text()) {
                        meta.dates.set(kind, Some(parsed));
                    }
                }
                None => tracing::warn!(event, "unrecognized date event ignored"),
            }
        }

        Ok(())
    }

    fn write_toc(&self, epub: &mut Epub<'_>) -> Result<()> {
        let item = match &epub.toc.item {
            Some(item) => item.clone(),
            None => {
                let item = Item::new(epub.manifest.free_id(NCX_ID), epub.free_href(NCX_HREF));
                epub.toc.item = Some(item.clone());
                item
            }
        };

        let uid = epub.uid().map(|u| u.value.as_str());
        let data = ncx_document(&epub.toc, uid).to_xml(&[("", ns::NCX)])?;
        epub.write_resource(&item.href, &data)
    }

    fn xml_meta(&self, epub: &Epub<'_>) -> Element {
        let mut metadata = metadata_element();

        for kind in DateKind::ALL {
            if let Some(date) = epub.meta.dates.get(kind) {
                metadata.push(
                    Element::new(ns::DC, "date")
                        .with_attr("opf:event", kind.name())
                        .with_text(format_date(&date)),
                );
            }
        }

        for rule in META {
            for value in epub.meta.values(rule.field) {
                metadata.push(dc_element(rule, value));
            }
        }

        metadata
    }

    fn xml_manifest(&self, epub: &Epub<'_>) -> Element {
        manifest_element(epub.manifest.iter().chain(epub.toc.item.iter()))
    }

    fn xml_spine(&self, epub: &Epub<'_>) -> Result<Element> {
        let mut spine = spine_element(epub)?;
        if let Some(item) = &epub.toc.item {
            spine.set_attr(ns::qualify("toc"), &item.id);
        }
        Ok(spine)
    }
}

fn nav_points(parent: &Element) -> Vec<TocEntry> {
    parent
        .find_all(ns::NCX, "navPoint")
        .map(|point| {
            let href = point
                .find(ns::NCX, "content")
                .and_then(|c| ns::get_attr(c, "src"))
                .unwrap_or_default();
            let title = point
                .find(ns::NCX, "navLabel")
                .and_then(|l| l.find(ns::NCX, "text"))
                .map(Element::text)
                .unwrap_or_default();
            tracing::trace!(href, title = %title, "navPoint");

            TocEntry {
                href: href.to_string(),
                title,
                children: nav_points(point),
            }
        })
        .collect()
}

/// The NCX document for `toc`.
pub(crate) fn ncx_document(toc: &Toc, uid: Option<&str>) -> Element {
    let meta = |name: &str, content: &str| {
        Element::new(ns::NCX, "meta")
            .with_attr("name", name)
            .with_attr("content", content)
    };

    let head = Element::new(ns::NCX, "head")
        .with_child(meta("dtb:uid", uid.unwrap_or_default()))
        .with_child(meta("dtb:depth", &toc.depth().max(1).to_string()))
        .with_child(meta("dtb:totalPageCount", "0"))
        .with_child(meta("dtb:maxPageNumber", "0"));

    let title = toc.title.as_deref().unwrap_or_default();
    let doc_title = Element::new(ns::NCX, "docTitle")
        .with_child(Element::new(ns::NCX, "text").with_text(title));

    let mut nav_map = Element::new(ns::NCX, "navMap");
    let mut play_order = 1;
    write_nav_points(&mut nav_map, &toc.entries, &mut play_order);

    Element::new(ns::NCX, "ncx")
        .with_attr("version", "2005-1")
        .with_child(head)
        .with_child(doc_title)
        .with_child(nav_map)
}

fn write_nav_points(parent: &mut Element, entries: &[TocEntry], play_order: &mut usize) {
    for entry in entries {
        let order = play_order.to_string();
        *play_order += 1;

        let mut point = Element::new(ns::NCX, "navPoint")
            .with_attr("id", format!("navpoint-{}", order))
            .with_attr("playOrder", order)
            .with_child(
                Element::new(ns::NCX, "navLabel")
                    .with_child(Element::new(ns::NCX, "text").with_text(&entry.title)),
            )
            .with_child(Element::new(ns::NCX, "content").with_attr("src", &entry.href));

        write_nav_points(&mut point, &entry.children, play_order);
        parent.push(point);
    }
}
