//! Parser for `psql`'s `\d <table>` output.
//!
//! Turns the human-readable description into a [`SchemaDocument`] whose
//! column rows and section lines are sorted, so that two databases whose
//! describe output differs only in line order compare equal.
//!
//! Expected shape (leading header lines are each optional):
//!
//! ```text
//!                 Table "public.users"
//!  Column |  Type   | Collation | Nullable | Default
//! --------+---------+-----------+----------+---------
//!  id     | integer |           | not null |
//!  email  | text    |           |          |
//! Indexes:
//!     "users_pkey" PRIMARY KEY, btree (id)
//! Triggers:
//!     audit_users AFTER INSERT ON users ...
//! ```

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::config::{DescribeConfig, FilterConfig};
use crate::document::SchemaDocument;

/// Title line of a `\d` table description, e.g. `Table "public.users"` or
/// `Partitioned table "public.events"`.
static TABLE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:(?:Unlogged|Partitioned|Foreign)\s+table|Table)\b"#).unwrap()
});

const COLUMN_HEADER_PREFIX: &str = "Column";
const SEPARATOR_PREFIX: &str = "---";

/// Normalizes describe output with a fixed set of section titles and
/// excluded substrings.
#[derive(Debug, Clone)]
pub struct Normalizer {
    section_titles: Vec<String>,
    excluded_keywords: Vec<String>,
}

impl Normalizer {
    pub fn new(section_titles: Vec<String>, excluded_keywords: Vec<String>) -> Self {
        Self {
            section_titles,
            excluded_keywords,
        }
    }

    /// Build from the describe and filter configuration.
    pub fn from_config(describe: &DescribeConfig, filters: &FilterConfig) -> Self {
        Self::new(
            describe.section_titles.clone(),
            filters.excluded_keywords.clone(),
        )
    }

    fn is_section_title(&self, line: &str) -> bool {
        self.section_titles.iter().any(|t| t == line)
    }

    fn is_excluded(&self, line: &str) -> bool {
        self.excluded_keywords
            .iter()
            .any(|k| !k.is_empty() && line.contains(k.as_str()))
    }

    /// Parse one table's describe text.
    ///
    /// Sections left without lines (because the table has none, or every
    /// line was excluded) are omitted from the result.
    pub fn normalize(&self, raw: &str) -> SchemaDocument {
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let mut idx = 0;

        // Header lines, each optional, in this order.
        if lines.get(idx).is_some_and(|l| TABLE_HEADER_RE.is_match(l)) {
            idx += 1;
        }
        if lines.get(idx).is_some_and(|l| l.starts_with(COLUMN_HEADER_PREFIX)) {
            idx += 1;
        }
        if lines.get(idx).is_some_and(|l| l.starts_with(SEPARATOR_PREFIX)) {
            idx += 1;
        }

        let mut doc = SchemaDocument::default();

        while idx < lines.len() && !self.is_section_title(lines[idx]) {
            doc.columns.push(
                lines[idx]
                    .split('|')
                    .map(|field| field.trim().to_string())
                    .collect(),
            );
            idx += 1;
        }
        doc.columns.sort();

        while idx < lines.len() {
            let title = lines[idx];
            idx += 1;

            let mut body = Vec::new();
            while idx < lines.len() && !self.is_section_title(lines[idx]) {
                let line = lines[idx];
                if !self.is_excluded(line) {
                    body.push(line.to_string());
                }
                idx += 1;
            }

            if body.is_empty() {
                continue;
            }
            let name = title.strip_suffix(':').unwrap_or(title).to_string();
            let section = doc.sections.entry(name).or_default();
            section.extend(body);
            section.sort();
        }

        doc
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&DescribeConfig::default(), &FilterConfig::default())
    }
}
