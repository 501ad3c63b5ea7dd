//! EPUB 3.0: XHTML navigation document and `<meta refines>` metadata.

use std::collections::{BTreeSet, HashMap};

use super::Epub;
use super::dialect::{
    Dialect, MetaRule, Version, dc_element, extract, item_element, manifest_element,
    metadata_element, read_date, section,
};
use crate::error::{Error, Lookup, Result};
use crate::model::{AttributedString, DateKind, Field, Item, Metadata, Toc, TocEntry};
use crate::util::format_date;
use crate::xml::{Element, QName, ns};

const NAV_ID: &str = "nav";
const NAV_HREF: &str = "nav.xhtml";

/// Dublin Core fields and their direct attributes. Everything else on a
/// value travels as a refinement. `coverage`, `format`, `relation`,
/// `rights` and `type` are not read.
const META: &[MetaRule] = &[
    MetaRule::new(Field::Identifier, &["id"]),
    MetaRule::new(Field::Title, &["xml:lang"]),
    MetaRule::new(Field::Language, &[]),
    MetaRule::new(Field::Contributor, &[]),
    MetaRule::new(Field::Creator, &[]),
    MetaRule::new(Field::Description, &["xml:lang"]),
    MetaRule::new(Field::Publisher, &["xml:lang"]),
    MetaRule::new(Field::Source, &[]),
    MetaRule::new(Field::Subject, &[]),
];

/// Dates stored as `<meta property>`; publication is `dc:date`.
const DATE_PROPERTIES: &[(&str, DateKind)] = &[
    ("dcterms:created", DateKind::Creation),
    ("dcterms:modified", DateKind::Modification),
];

/// The model's `scheme` is written as the `identifier-type` refinement.
const SCHEME: &str = "scheme";
const IDENTIFIER_TYPE: &str = "identifier-type";

/// Prefix of synthesized refinement anchors. Ids carrying it are never
/// read back into the model.
const ANCHOR_PREFIX: &str = "anchor-";

pub struct Epub3;

impl Dialect for Epub3 {
    fn version(&self) -> Version {
        Version::V3
    }

    fn read_toc(&self, epub: &mut Epub<'_>, opf: &Element) -> Result<()> {
        let manifest = section(opf, "manifest")?;
        let nav_id = manifest
            .find_all(ns::OPF, "item")
            .find(|item| has_token(ns::get_attr(item, "properties"), "nav"))
            .and_then(|item| ns::get_attr(item, "id"));
        let Some(nav_id) = nav_id else {
            return Ok(());
        };

        let item = epub
            .manifest
            .remove(nav_id)
            .ok_or_else(|| Error::not_found(Lookup::Id, nav_id))?;
        let data = epub.read(&item)?;
        epub.toc.item = Some(item);

        let doc = Element::parse(&data)?;
        let nav = doc.find_descendant(&|e| {
            e.is(ns::XHTML, "nav") && has_token(ns::get_attr(e, "epub:type"), "toc")
        });
        let Some(nav) = nav else {
            tracing::warn!("navigation document has no toc nav");
            return Ok(());
        };

        epub.toc.title = nav
            .elements()
            .find(|e| is_heading(e))
            .map(Element::text_content)
            .filter(|t| !t.is_empty());
        if let Some(ol) = nav.find(ns::XHTML, "ol") {
            epub.toc.entries = list_items(ol);
        }

        Ok(())
    }

    fn read_meta(&self, meta: &mut Metadata, opf: &Element) -> Result<()> {
        let metadata = section(opf, "metadata")?;
        let refinements = refinements(metadata);
        let mut refined = BTreeSet::new();

        for rule in META {
            let values = extract(metadata, rule)
                .into_iter()
                .map(|(mut value, id)| {
                    if let Some(props) = id.as_deref().and_then(|id| refinements.get(id)) {
                        for (property, v) in props {
                            value.insert(property.as_str(), v.as_str());
                        }
                        refined.extend(id);
                    }
                    if rule.field == Field::Identifier
                        && let Some(scheme) = value.remove(IDENTIFIER_TYPE)
                    {
                        value.insert(SCHEME, scheme);
                    }
                    if value.get("id").is_some_and(|id| id.starts_with(ANCHOR_PREFIX)) {
                        value.remove("id");
                    }
                    value
                })
                .collect();
            meta.set(rule.field, values);
        }

        for target in refinements.keys().filter(|t| !refined.contains(*t)) {
            tracing::warn!(target = %target, "refinement of unknown element ignored");
        }

        if let Some(date) = metadata.find(ns::DC, "date")
            && let Some(parsed) = read_date(&date.text())
        {
            meta.dates.publication = Some(parsed);
        }
        for meta_el in metadata.find_all(ns::OPF, "meta") {
            if ns::get_attr(meta_el, "refines").is_some() {
                continue;
            }
            let property = ns::get_attr(meta_el, "property");
            if let Some((_, kind)) = DATE_PROPERTIES.iter().find(|(p, _)| Some(*p) == property)
                && let Some(parsed) = read_date(&meta_el.text())
            {
                meta.dates.set(*kind, Some(parsed));
            }
        }

        Ok(())
    }

    fn write_toc(&self, epub: &mut Epub<'_>) -> Result<()> {
        let item = match &epub.toc.item {
            Some(item) => item.clone(),
            None => {
                let item = Item::new(epub.manifest.free_id(NAV_ID), epub.free_href(NAV_HREF));
                epub.toc.item = Some(item.clone());
                item
            }
        };

        let data = nav_document(&epub.toc).to_xml(&[("", ns::XHTML), ("epub", ns::OPS)])?;
        epub.write_resource(&item.href, &data)
    }

    fn xml_meta(&self, epub: &Epub<'_>) -> Element {
        metadata_xml(&epub.meta)
    }

    fn xml_manifest(&self, epub: &Epub<'_>) -> Element {
        let mut manifest = manifest_element(epub.manifest.iter());
        if let Some(item) = &epub.toc.item {
            manifest.push(item_element(item).with_attr("properties", "nav"));
        }
        manifest
    }
}

fn has_token(list: Option<&str>, token: &str) -> bool {
    list.is_some_and(|l| l.split_whitespace().any(|t| t == token))
}

fn is_heading(el: &Element) -> bool {
    el.name.ns.as_deref() == Some(ns::XHTML)
        && matches!(el.name.local.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// `<li>` entries of a nav list: a link (or a span heading) and an
/// optional nested `<ol>`.
fn list_items(ol: &Element) -> Vec<TocEntry> {
    ol.find_all(ns::XHTML, "li")
        .map(|li| {
            let label = li
                .elements()
                .find(|e| e.is(ns::XHTML, "a") || e.is(ns::XHTML, "span"));
            let href = label
                .and_then(|a| ns::get_attr(a, "href"))
                .unwrap_or_default();
            let title = label.map(Element::text_content).unwrap_or_default();
            tracing::trace!(href, title = %title, "nav entry");

            TocEntry {
                href: href.to_string(),
                title,
                children: li.find(ns::XHTML, "ol").map(list_items).unwrap_or_default(),
            }
        })
        .collect()
}

/// The navigation document for `toc`.
pub(crate) fn nav_document(toc: &Toc) -> Element {
    let title = toc.title.as_deref().unwrap_or_default();

    let mut nav = Element::new(ns::XHTML, "nav")
        .with_attr("epub:type", "toc")
        .with_attr("id", "toc");
    if let Some(heading) = &toc.title {
        nav.push(Element::new(ns::XHTML, "h1").with_text(heading));
    }
    nav.push(nav_list(&toc.entries));

    Element::new(ns::XHTML, "html")
        .with_child(
            Element::new(ns::XHTML, "head")
                .with_child(Element::new(ns::XHTML, "title").with_text(title)),
        )
        .with_child(Element::new(ns::XHTML, "body").with_child(nav))
}

fn nav_list(entries: &[TocEntry]) -> Element {
    let mut ol = Element::new(ns::XHTML, "ol");
    for entry in entries {
        let mut li = Element::new(ns::XHTML, "li").with_child(
            Element::new(ns::XHTML, "a")
                .with_attr("href", &entry.href)
                .with_text(&entry.title),
        );
        if !entry.children.is_empty() {
            li.push(nav_list(&entry.children));
        }
        ol.push(li);
    }
    ol
}

/// `<meta refines="#id" property="p">v</meta>` grouped by target id.
fn refinements(metadata: &Element) -> HashMap<String, Vec<(String, String)>> {
    let mut out: HashMap<String, Vec<(String, String)>> = HashMap::new();
    for meta in metadata.find_all(ns::OPF, "meta") {
        let (Some(refines), Some(property)) =
            (ns::get_attr(meta, "refines"), ns::get_attr(meta, "property"))
        else {
            continue;
        };
        let target = refines.strip_prefix('#').unwrap_or(refines);
        out.entry(target.to_string())
            .or_default()
            .push((property.to_string(), meta.text()));
    }
    out
}

/// Hands out `anchor-<tag>-<n>` refinement anchors that collide with no
/// id already in use.
struct Anchors {
    used: BTreeSet<String>,
    next: HashMap<&'static str, usize>,
}

impl Anchors {
    fn new(meta: &Metadata) -> Self {
        let used = Field::ALL
            .into_iter()
            .flat_map(|f| meta.values(f))
            .filter_map(|v| v.get("id"))
            .map(str::to_string)
            .collect();
        Self {
            used,
            next: HashMap::new(),
        }
    }

    fn take(&mut self, tag: &'static str) -> String {
        let n = self.next.entry(tag).or_insert(0);
        loop {
            let id = format!("{}{}-{}", ANCHOR_PREFIX, tag, n);
            *n += 1;
            if self.used.insert(id.clone()) {
                return id;
            }
        }
    }
}

fn metadata_xml(meta: &Metadata) -> Element {
    let mut metadata = metadata_element();

    if let Some(date) = meta.dates.publication {
        metadata.push(Element::new(ns::DC, "date").with_text(format_date(&date)));
    }
    for (property, kind) in DATE_PROPERTIES {
        if let Some(date) = meta.dates.get(*kind) {
            metadata.push(
                Element::new(ns::OPF, "meta")
                    .with_attr("property", *property)
                    .with_text(format_date(&date)),
            );
        }
    }

    let mut anchors = Anchors::new(meta);
    for rule in META {
        for value in meta.values(rule.field) {
            let mut value = value.clone();
            if rule.field == Field::Identifier
                && let Some(scheme) = value.remove(SCHEME)
            {
                value.insert(IDENTIFIER_TYPE, scheme);
            }

            let mut el = dc_element(rule, &value);
            let leftovers = refinable(rule, &value);
            if leftovers.is_empty() {
                metadata.push(el);
                continue;
            }

            let id = match el.attr_ns(None, "id") {
                Some(id) => id.to_string(),
                None => {
                    let id = anchors.take(rule.field.tag());
                    el.set_attr(QName::new(None, "id"), &id);
                    id
                }
            };
            metadata.push(el);
            for (property, v) in leftovers {
                metadata.push(
                    Element::new(ns::OPF, "meta")
                        .with_attr("refines", format!("#{}", id))
                        .with_attr("property", property)
                        .with_text(v),
                );
            }
        }
    }

    metadata
}

/// Attributes of `value` with no direct slot in `rule`. `id` is never a
/// refinement: it is the anchor refinements point at.
fn refinable<'v>(rule: &MetaRule, value: &'v AttributedString) -> Vec<(&'v str, &'v str)> {
    value
        .attrs
        .iter()
        .filter(|(k, _)| k.as_str() != "id" && !rule.has_slot(k))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}
