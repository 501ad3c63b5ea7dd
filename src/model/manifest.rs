//! Manifest items and the reading order.

use std::ops::Deref;

use indexmap::IndexMap;

use crate::error::{Error, Lookup, Result};
use crate::util::{guess_media_type, strip_fragment};

/// A resource declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Item {
    pub id: String,
    /// Path relative to the package document's directory.
    pub href: String,
}

impl Item {
    pub fn new(id: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
        }
    }

    /// Media type derived from the href's extension.
    pub fn mimetype(&self) -> Option<&'static str> {
        guess_media_type(strip_fragment(&self.href))
    }
}

impl AsRef<str> for Item {
    fn as_ref(&self) -> &str {
        &self.href
    }
}

/// Identifier-keyed resources, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(transparent))]
pub struct Manifest {
    items: IndexMap<String, Item>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `href` under a fresh `item-<n>` identifier.
    ///
    /// `n` starts at the current item count and advances past ids that
    /// are already taken, so repeated calls never collide.
    pub fn add(&mut self, href: impl Into<String>) -> Item {
        let id = self.fresh_id("item", self.items.len());
        self.insert(id, href)
    }

    /// Insert `href` under `id`, replacing any previous item with that id.
    pub fn insert(&mut self, id: impl Into<String>, href: impl Into<String>) -> Item {
        self.insert_item(Item::new(id, href))
    }

    /// Insert an existing item under its own id.
    pub fn insert_item(&mut self, item: Item) -> Item {
        tracing::trace!(id = %item.id, href = %item.href, "manifest item");
        self.items.insert(item.id.clone(), item.clone());
        item
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Remove an item, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Item> {
        self.items.shift_remove(id)
    }

    /// Find the first item whose href matches `href` with any `#fragment`
    /// removed.
    pub fn by_href(&self, href: &str) -> Result<&Item> {
        let href = strip_fragment(href);
        self.items
            .values()
            .find(|item| item.href == href)
            .ok_or_else(|| Error::not_found(Lookup::Href, href))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `<prefix>-<n>` for the first `n >= start` not used as an id.
    pub(crate) fn fresh_id(&self, prefix: &str, start: usize) -> String {
        (start..)
            .map(|n| format!("{}-{}", prefix, n))
            .find(|id| !self.items.contains_key(id))
            .unwrap_or_else(|| prefix.to_string())
    }

    /// `base` if free, otherwise the first free `base-<n>`.
    pub(crate) fn free_id(&self, base: &str) -> String {
        if self.items.contains_key(base) {
            self.fresh_id(base, 1)
        } else {
            base.to_string()
        }
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a Item;
    type IntoIter = indexmap::map::Values<'a, String, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}

/// The reading order: manifest items, repeats allowed.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(transparent))]
pub struct Spine {
    items: Vec<Item>,
}

impl Spine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: &Item) {
        tracing::trace!(id = %item.id, "spine itemref");
        self.items.push(item.clone());
    }
}

impl Deref for Spine {
    type Target = [Item];

    fn deref(&self) -> &[Item] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a Spine {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
