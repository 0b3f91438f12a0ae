//! Per-database snapshot documents.
//!
//! A [`Document`] is what one extractor run produces against one database:
//! an ordered mapping from table (or sequence) name to a [`Value`]. Order
//! is kept for display; equality and diffing ignore it.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Name of the synthetic column section of a [`SchemaDocument`].
pub const COLUMNS_SECTION: &str = "Columns";

/// Header block written ahead of the column rows by
/// [`SchemaDocument::to_describe_text`], so that the normalizer's optional
/// header skip never swallows a real column row.
const CANONICAL_HEADER: &str = "Table \"canonical\"\nColumn | Type\n---\n";

/// Value stored for one key of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Owning schema name (table inventory).
    Text(String),
    /// Row count, byte size, or sequence last value.
    Integer(i64),
    /// Normalized `\d` description.
    Structure(SchemaDocument),
}

impl Value {
    /// Integer payload, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Structure(doc) => write!(
                f,
                "<{} column(s), {} section(s)>",
                doc.columns.len(),
                doc.sections.len()
            ),
        }
    }
}

/// Ordered, unique-key mapping from table or sequence name to value.
///
/// Equality holds when both sides have the same keys with equal values,
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    entries: IndexMap<String, Value>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position and gets the new
    /// value; the previous value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Sum of all integer values. Non-integer values contribute nothing.
    pub fn total(&self) -> i64 {
        self.entries.values().filter_map(Value::as_integer).sum()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

/// Canonical form of one table's `\d` output.
///
/// Column rows are kept as trimmed pipe-delimited fields; every other
/// section is a list of trimmed lines keyed by its title (without the
/// trailing colon). All lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SchemaDocument {
    /// Column rows: name, type, collation, nullability, default, ...
    pub columns: Vec<Vec<String>>,
    /// Named sections such as "Indexes" or "Triggers".
    pub sections: BTreeMap<String, Vec<String>>,
}

impl SchemaDocument {
    /// Lines of a section, with `"Columns"` rendered as `a | b | c` rows.
    pub fn section(&self, name: &str) -> Option<Vec<String>> {
        if name == COLUMNS_SECTION {
            return Some(self.column_lines());
        }
        self.sections.get(name).cloned()
    }

    /// Section names, `"Columns"` first.
    pub fn section_names(&self) -> Vec<&str> {
        std::iter::once(COLUMNS_SECTION)
            .chain(self.sections.keys().map(|k| k.as_str()))
            .collect()
    }

    /// Column rows joined back into `a | b | c` form.
    pub fn column_lines(&self) -> Vec<String> {
        self.columns.iter().map(|row| row.join(" | ")).collect()
    }

    /// Render back into `\d`-style text.
    ///
    /// Normalizing the result with the same section titles yields this
    /// document again.
    pub fn to_describe_text(&self) -> String {
        let mut out = String::from(CANONICAL_HEADER);
        for line in self.column_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        for (title, lines) in &self.sections {
            out.push_str(title);
            out.push_str(":\n");
            for line in lines {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}
