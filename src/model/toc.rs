//! Table of contents tree.

use std::ops::Deref;

use super::Item;

/// Root of the table of contents.
///
/// `item` is the resource the TOC itself is stored in (an NCX file or a
/// navigation document). It is kept out of the [`Manifest`](super::Manifest)
/// and only added to the package manifest when the package is written.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Toc {
    pub title: Option<String>,
    pub item: Option<Item>,
    pub entries: Vec<TocEntry>,
}

/// A node of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct TocEntry {
    pub href: String,
    pub title: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<TocEntry>,
}

impl Toc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level entry and return it for further nesting.
    pub fn append(&mut self, href: impl Into<String>, title: impl Into<String>) -> &mut TocEntry {
        self.append_entry(TocEntry::new(href, title))
    }

    /// Append a top-level entry with nested children.
    ///
    /// ```
    /// let mut toc = dawn::model::Toc::new();
    /// toc.append_with("s1", "Part", [("s1a", "Sub")]);
    /// assert_eq!(toc[0].children[0].title, "Sub");
    /// ```
    pub fn append_with<C>(
        &mut self,
        href: impl Into<String>,
        title: impl Into<String>,
        children: impl IntoIterator<Item = C>,
    ) -> &mut TocEntry
    where
        C: Into<TocEntry>,
    {
        self.append_entry(TocEntry::new(href, title).with_children(children))
    }

    pub fn append_entry(&mut self, entry: TocEntry) -> &mut TocEntry {
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Number of levels below the root; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        self.entries.iter().map(TocEntry::depth).max().unwrap_or(0)
    }
}

impl Deref for Toc {
    type Target = [TocEntry];

    fn deref(&self) -> &[TocEntry] {
        &self.entries
    }
}

impl TocEntry {
    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: title.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children<C: Into<TocEntry>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Append a child entry and return it.
    pub fn append(&mut self, href: impl Into<String>, title: impl Into<String>) -> &mut TocEntry {
        self.children.push(TocEntry::new(href, title));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Levels in this subtree, counting this entry.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(TocEntry::depth).max().unwrap_or(0)
    }
}

impl<H: Into<String>, T: Into<String>> From<(H, T)> for TocEntry {
    fn from((href, title): (H, T)) -> Self {
        TocEntry::new(href, title)
    }
}

impl<H, T, C> From<(H, T, Vec<C>)> for TocEntry
where
    H: Into<String>,
    T: Into<String>,
    C: Into<TocEntry>,
{
    fn from((href, title, children): (H, T, Vec<C>)) -> Self {
        TocEntry::new(href, title).with_children(children)
    }
}
