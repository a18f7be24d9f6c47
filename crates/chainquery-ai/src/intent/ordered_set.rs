use serde::{Serialize, Serializer};
use std::collections::HashSet;

/// Insertion-ordered set of strings, deduplicated case-insensitively.
///
/// The first occurrence of a value keeps its position and its spelling;
/// later duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct OrderedSet {
    items: Vec<String>,
    keys: HashSet<String>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when an equal value (ignoring case) is already present.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.keys.insert(value.to_lowercase()) {
            self.items.push(value);
            true
        } else {
            false
        }
    }

    pub fn extend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.insert(value);
        }
    }

    /// Earliest-inserted value
    pub fn first(&self) -> Option<&str> {
        self.items.first().map(String::as_str)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.keys.contains(&value.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }
}

impl PartialEq for OrderedSet {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for OrderedSet {}

impl<S: Into<String>> FromIterator<S> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = OrderedSet::new();
        set.extend(iter);
        set
    }
}

impl Serialize for OrderedSet {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.items.serialize(serializer)
    }
}
