//! Namespace-aware XML element tree on top of quick-xml.
//!
//! Parsing resolves every element and attribute name to its namespace URI,
//! so lookups never depend on the prefixes a document happened to use.
//! Serialization goes the other way: callers pass a prefix table and the
//! writer picks prefixes from it.

pub mod ns;

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};

use crate::error::{Error, Result};
use crate::util::{decode_text, extract_xml_encoding};

/// An element or attribute name with its resolved namespace URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub ns: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(ns: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            ns: ns.map(str::to_string),
            local: local.into(),
        }
    }

    pub fn is(&self, ns: Option<&str>, local: &str) -> bool {
        self.ns.as_deref() == ns && self.local == local
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attrs: Vec<(QName, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(ns: &str, local: impl Into<String>) -> Self {
        Self {
            name: QName::new(Some(ns), local),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.name.is(Some(ns), local)
    }

    /// Exact attribute lookup by resolved name.
    pub fn attr_ns(&self, ns: Option<&str>, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name.is(ns, local))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any previous value under the same name.
    pub fn set_attr(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Builder form of [`Element::set_attr`]; `name` may be `prefix:local`.
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(ns::qualify(name), value);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        self.push_text(text);
        self
    }

    /// Child elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn find(&self, ns: &str, local: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(ns, local))
    }

    pub fn find_all<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is(ns, local))
    }

    /// First descendant (depth-first, document order) matching `pred`.
    pub fn find_descendant(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Direct text content, as written.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    /// Text of this element and all descendants, with runs of whitespace
    /// collapsed to single spaces.
    pub fn text_content(&self) -> String {
        fn collect(el: &Element, out: &mut String) {
            for node in &el.children {
                match node {
                    Node::Text(t) => out.push_str(t),
                    Node::Element(e) => collect(e, out),
                }
            }
        }
        let mut raw = String::new();
        collect(self, &mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Remove indentation between child elements: whitespace-only text
    /// that spans a line break. Inline spaces such as the one in
    /// `<em>A</em> <em>B</em>` are kept.
    fn drop_indentation(&mut self) {
        if self.elements().next().is_some() {
            self.children.retain(|node| {
                !matches!(node, Node::Text(t) if t.trim().is_empty() && t.contains('\n'))
            });
        }
    }

    /// Parse a document and return its root element.
    ///
    /// Non-UTF-8 input is decoded using the encoding named in the XML
    /// declaration, falling back to Windows-1252.
    pub fn parse(bytes: &[u8]) -> Result<Element> {
        let text = decode_text(bytes, extract_xml_encoding(bytes));
        let mut reader = NsReader::from_str(&text);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let ns = namespace_of(resolved);

            match event {
                Event::Start(e) => {
                    let el = start_element(&reader, ns, &e)?;
                    stack.push(el);
                }
                Event::Empty(e) => {
                    let el = start_element(&reader, ns, &e)?;
                    attach(&mut stack, &mut root, el);
                }
                Event::End(_) => {
                    if let Some(mut el) = stack.pop() {
                        el.drop_indentation();
                        attach(&mut stack, &mut root, el);
                    }
                }
                Event::Text(e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::CData(e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(String::from_utf8_lossy(&e));
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let entity = String::from_utf8_lossy(e.as_ref());
                        match resolve_entity(&entity) {
                            Some(resolved) => parent.push_text(resolved),
                            None => parent.push_text(format!("&{};", entity)),
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or_else(|| Error::InvalidEpub("XML document has no root element".into()))
    }

    /// Serialize with an XML declaration.
    ///
    /// `nsmap` is a list of `(prefix, uri)` pairs declared on this element;
    /// an empty prefix declares the default namespace. Attributes are
    /// always written with an explicit prefix when they carry a namespace.
    pub fn to_xml(&self, nsmap: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self, nsmap, true)?;

        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok(out)
    }
}

fn namespace_of(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        // The `xml` prefix is bound by definition.
        ResolveResult::Unknown(prefix) if prefix.as_slice() == b"xml" => {
            Some(ns::XML.to_string())
        }
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn start_element(
    reader: &NsReader<&[u8]>,
    ns: Option<String>,
    e: &BytesStart<'_>,
) -> Result<Element> {
    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut el = Element {
        name: QName { ns, local },
        attrs: Vec::new(),
        children: Vec::new(),
    };

    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let name = QName {
            ns: namespace_of(resolved),
            local: String::from_utf8_lossy(local.as_ref()).into_owned(),
        };
        let value = attr.unescape_value()?.into_owned();
        el.attrs.push((name, value));
    }

    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.push(el),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

fn element_name(name: &QName, nsmap: &[(&str, &str)]) -> (String, Option<String>) {
    let Some(uri) = name.ns.as_deref() else {
        return (name.local.clone(), None);
    };
    if nsmap.iter().any(|(p, u)| p.is_empty() && *u == uri) {
        return (name.local.clone(), None);
    }
    match nsmap.iter().find(|(p, u)| !p.is_empty() && *u == uri) {
        Some((prefix, _)) => (format!("{}:{}", prefix, name.local), None),
        // Not in the table: declare it locally as the default namespace.
        None => (name.local.clone(), Some(uri.to_string())),
    }
}

fn attr_name(name: &QName, nsmap: &[(&str, &str)]) -> String {
    match name.ns.as_deref() {
        None => name.local.clone(),
        Some(ns::XML) => format!("xml:{}", name.local),
        Some(uri) => match nsmap.iter().find(|(p, u)| !p.is_empty() && *u == uri) {
            Some((prefix, _)) => format!("{}:{}", prefix, name.local),
            None => name.local.clone(),
        },
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    el: &Element,
    nsmap: &[(&str, &str)],
    declare: bool,
) -> Result<()> {
    let (tag, local_default) = element_name(&el.name, nsmap);
    let mut start = BytesStart::new(tag.as_str());

    if declare {
        for (prefix, uri) in nsmap {
            if prefix.is_empty() {
                start.push_attribute(("xmlns", *uri));
            } else {
                start.push_attribute((format!("xmlns:{}", prefix).as_str(), *uri));
            }
        }
    }
    if let Some(uri) = &local_default {
        start.push_attribute(("xmlns", uri.as_str()));
    }
    for (name, value) in &el.attrs {
        start.push_attribute((attr_name(name, nsmap).as_str(), value.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(writer, e, nsmap, false)?,
            Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    Ok(())
}

/// Resolve XML and common XHTML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        "mdash" => return Some("\u{2014}".to_string()),
        "ndash" => return Some("\u{2013}".to_string()),
        "hellip" => return Some("\u{2026}".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}
