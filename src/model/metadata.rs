//! Bibliographic metadata.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

/// A metadata value with an open set of attributes (`lang`, `role`,
/// `file-as`, `id`, `scheme`, ...).
///
/// Two values are equal when both the text and every attribute match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct AttributedString {
    pub value: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "BTreeMap::is_empty"))]
    pub attrs: BTreeMap<String, String>,
}

impl AttributedString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Builder form of [`AttributedString::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.attrs.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.attrs.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }
}

impl fmt::Display for AttributedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for AttributedString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AttributedString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// The three dates both dialects can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Dates {
    pub creation: Option<NaiveDateTime>,
    pub publication: Option<NaiveDateTime>,
    pub modification: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Creation,
    Publication,
    Modification,
}

impl DateKind {
    pub const ALL: [DateKind; 3] = [
        DateKind::Creation,
        DateKind::Publication,
        DateKind::Modification,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DateKind::Creation => "creation",
            DateKind::Publication => "publication",
            DateKind::Modification => "modification",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl Dates {
    pub fn get(&self, kind: DateKind) -> Option<NaiveDateTime> {
        match kind {
            DateKind::Creation => self.creation,
            DateKind::Publication => self.publication,
            DateKind::Modification => self.modification,
        }
    }

    pub fn set(&mut self, kind: DateKind, date: Option<NaiveDateTime>) {
        match kind {
            DateKind::Creation => self.creation = date,
            DateKind::Publication => self.publication = date,
            DateKind::Modification => self.modification = date,
        }
    }
}

/// A Dublin Core field the model knows about. Dates are handled
/// separately through [`Dates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Creator,
    Subject,
    Description,
    Publisher,
    Contributor,
    Identifier,
    Source,
    Language,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Title,
        Field::Creator,
        Field::Subject,
        Field::Description,
        Field::Publisher,
        Field::Contributor,
        Field::Identifier,
        Field::Source,
        Field::Language,
    ];

    /// Local name of the `dc:` element.
    pub fn tag(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Creator => "creator",
            Field::Subject => "subject",
            Field::Description => "description",
            Field::Publisher => "publisher",
            Field::Contributor => "contributor",
            Field::Identifier => "identifier",
            Field::Source => "source",
            Field::Language => "language",
        }
    }

    pub fn is_multi(self) -> bool {
        !matches!(self, Field::Description | Field::Publisher | Field::Source)
    }
}

/// Publication metadata. List fields may repeat; `description`,
/// `publisher` and `source` hold at most one value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Metadata {
    pub titles: Vec<AttributedString>,
    pub creators: Vec<AttributedString>,
    pub subjects: Vec<AttributedString>,
    pub description: Option<AttributedString>,
    pub publisher: Option<AttributedString>,
    pub contributors: Vec<AttributedString>,
    pub dates: Dates,
    pub identifiers: Vec<AttributedString>,
    pub source: Option<AttributedString>,
    pub languages: Vec<AttributedString>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values of `field`; a single-valued field yields zero or one.
    pub fn values(&self, field: Field) -> &[AttributedString] {
        match field {
            Field::Title => &self.titles,
            Field::Creator => &self.creators,
            Field::Subject => &self.subjects,
            Field::Description => self.description.as_slice(),
            Field::Publisher => self.publisher.as_slice(),
            Field::Contributor => &self.contributors,
            Field::Identifier => &self.identifiers,
            Field::Source => self.source.as_slice(),
            Field::Language => &self.languages,
        }
    }

    /// Replace the values of `field`. A single-valued field keeps the
    /// first value and drops the rest.
    pub fn set(&mut self, field: Field, values: Vec<AttributedString>) {
        if !field.is_multi() && values.len() > 1 {
            tracing::warn!(
                field = field.tag(),
                count = values.len(),
                "single-valued field given several values; keeping the first"
            );
        }

        match field {
            Field::Description => self.description = values.into_iter().next(),
            Field::Publisher => self.publisher = values.into_iter().next(),
            Field::Source => self.source = values.into_iter().next(),
            Field::Title => self.titles = values,
            Field::Creator => self.creators = values,
            Field::Subject => self.subjects = values,
            Field::Contributor => self.contributors = values,
            Field::Identifier => self.identifiers = values,
            Field::Language => self.languages = values,
        }
    }
}
