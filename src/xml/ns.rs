//! Namespace table and attribute resolution.

use super::{Element, QName};

pub const CONTAINER: &str = "urn:oasis:names:tc:opendocument:xmlns:container";
pub const OPF: &str = "http://www.idpf.org/2007/opf";
pub const OPS: &str = "http://www.idpf.org/2007/ops";
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
pub const NCX: &str = "http://www.daisy.org/z3986/2005/ncx/";
pub const XHTML: &str = "http://www.w3.org/1999/xhtml";
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Registered prefixes. Each URI appears once, so the reverse lookup is
/// unambiguous for this table.
pub const PREFIXES: &[(&str, &str)] = &[
    ("container", CONTAINER),
    ("opf", OPF),
    ("epub", OPS),
    ("dc", DC),
    ("ncx", NCX),
    ("html", XHTML),
    ("xml", XML),
];

/// Namespace URI registered for `prefix`.
pub fn namespace(prefix: &str) -> Option<&'static str> {
    PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
}

/// Prefix registered for `uri`.
pub fn prefix(uri: &str) -> Option<&'static str> {
    PREFIXES
        .iter()
        .find(|(_, u)| *u == uri)
        .map(|(p, _)| *p)
}

/// Turn `prefix:local` into a resolved name; a bare name stays unqualified.
///
/// An unregistered prefix is kept as part of the local name.
pub fn qualify(name: &str) -> QName {
    match name.split_once(':') {
        Some((p, local)) => match namespace(p) {
            Some(uri) => QName::new(Some(uri), local),
            None => QName::new(None, name),
        },
        None => QName::new(None, name),
    }
}

/// The model key for a wire attribute name: `opf:file-as` -> `file-as`.
pub fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Look up an attribute by `prefix:local` or bare name.
///
/// A prefixed name is resolved through [`PREFIXES`]. A bare name is first
/// tried unqualified; if that fails, the element's own namespace is mapped
/// back to its registered prefix and the lookup is retried under it, which
/// finds attributes written as e.g. `opf:scheme` on an `opf:` element but
/// asked for as plain `scheme`.
///
/// If two prefixes ever shared a URI, the retry would pick whichever comes
/// first in the table and could return an unrelated attribute.
pub fn get_attr<'e>(el: &'e Element, name: &str) -> Option<&'e str> {
    if let Some((p, local)) = name.split_once(':') {
        let uri = namespace(p)?;
        return el.attr_ns(Some(uri), local);
    }

    if let Some(value) = el.attr_ns(None, name) {
        return Some(value);
    }

    let uri = el.name.ns.as_deref()?;
    let uri = namespace(prefix(uri)?)?;
    el.attr_ns(Some(uri), name)
}
