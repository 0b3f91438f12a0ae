//! Structural diff between two documents.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::document::{Document, SchemaDocument, Value, COLUMNS_SECTION};

/// Difference between a source and a target document.
///
/// Empty if and only if the two documents are deeply equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentDiff {
    /// Keys only present in the source, in source order.
    pub removed: Vec<Entry>,
    /// Keys only present in the target, in target order.
    pub added: Vec<Entry>,
    /// Keys present on both sides with different values, in source order.
    pub changed: Vec<ChangedEntry>,
}

/// A key and its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

/// A key whose value differs between source and target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangedEntry {
    pub key: String,
    pub change: ValueChange,
}

/// How a value changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueChange {
    /// A text or integer value (or a value of a different kind) was replaced.
    Scalar { from: Value, to: Value },
    /// A schema document differs section by section.
    Structure(SchemaDocumentDiff),
}

impl ValueChange {
    /// `to - from` for integer changes.
    pub fn delta(&self) -> Option<i64> {
        match self {
            ValueChange::Scalar {
                from: Value::Integer(a),
                to: Value::Integer(b),
            } => Some(b.saturating_sub(*a)),
            _ => None,
        }
    }
}

/// Section-level difference between two schema documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaDocumentDiff {
    /// Sections only in the source.
    pub sections_removed: Vec<String>,
    /// Sections only in the target.
    pub sections_added: Vec<String>,
    /// Sections on both sides whose lines differ (including "Columns").
    pub sections_changed: Vec<SectionDiff>,
}

impl SchemaDocumentDiff {
    pub fn is_empty(&self) -> bool {
        self.sections_removed.is_empty()
            && self.sections_added.is_empty()
            && self.sections_changed.is_empty()
    }
}

/// Lines that differ within one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionDiff {
    pub name: String,
    /// Lines only in the source.
    pub removed: Vec<String>,
    /// Lines only in the target.
    pub added: Vec<String>,
}

impl DocumentDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.changed.is_empty()
    }

    /// Number of differing keys.
    pub fn len(&self) -> usize {
        self.removed.len() + self.added.len() + self.changed.len()
    }
}

/// Compare two documents key by key, ignoring insertion order.
pub fn diff_documents(source: &Document, target: &Document) -> DocumentDiff {
    let mut diff = DocumentDiff::default();

    for (key, value) in source.iter() {
        match target.get(key) {
            None => diff.removed.push(Entry {
                key: key.to_string(),
                value: value.clone(),
            }),
            Some(other) if other != value => {
                if let Some(change) = diff_values(value, other) {
                    diff.changed.push(ChangedEntry {
                        key: key.to_string(),
                        change,
                    });
                }
            }
            Some(_) => {}
        }
    }

    for (key, value) in target.iter() {
        if !source.contains_key(key) {
            diff.added.push(Entry {
                key: key.to_string(),
                value: value.clone(),
            });
        }
    }

    diff
}

fn diff_values(from: &Value, to: &Value) -> Option<ValueChange> {
    match (from, to) {
        (Value::Structure(a), Value::Structure(b)) => {
            let d = diff_schema_documents(a, b);
            if !d.is_empty() {
                Some(ValueChange::Structure(d))
            } else if a != b {
                // Same lines but different shape, e.g. unsorted or re-split columns.
                Some(ValueChange::Scalar {
                    from: from.clone(),
                    to: to.clone(),
                })
            } else {
                None
            }
        }
        (a, b) => (a != b).then(|| ValueChange::Scalar {
            from: a.clone(),
            to: b.clone(),
        }),
    }
}

/// Compare two schema documents section by section.
pub fn diff_schema_documents(source: &SchemaDocument, target: &SchemaDocument) -> SchemaDocumentDiff {
    let mut diff = SchemaDocumentDiff::default();

    let (removed, added) = sorted_difference(&source.column_lines(), &target.column_lines());
    if !removed.is_empty() || !added.is_empty() {
        diff.sections_changed.push(SectionDiff {
            name: COLUMNS_SECTION.to_string(),
            removed,
            added,
        });
    }

    for (name, lines) in &source.sections {
        match target.sections.get(name) {
            None => diff.sections_removed.push(name.clone()),
            Some(other) => {
                let (removed, added) = sorted_difference(lines, other);
                if !removed.is_empty() || !added.is_empty() {
                    diff.sections_changed.push(SectionDiff {
                        name: name.clone(),
                        removed,
                        added,
                    });
                }
            }
        }
    }

    for name in target.sections.keys() {
        if !source.sections.contains_key(name) {
            diff.sections_added.push(name.clone());
        }
    }

    diff
}

/// Multiset difference of two sorted lists: `(only in a, only in b)`.
///
/// Column rows are sorted as field lists, which can order differently from
/// their joined text, so both sides are re-sorted as strings first.
fn sorted_difference(a: &[String], b: &[String]) -> (Vec<String>, Vec<String>) {
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    b.sort();

    let mut only_a = Vec::new();
    let mut only_b = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(b[j]) {
            Ordering::Less => {
                only_a.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                only_b.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    only_a.extend(a[i..].iter().map(|s| (*s).clone()));
    only_b.extend(b[j..].iter().map(|s| (*s).clone()));
    (only_a, only_b)
}

impl fmt::Display for DocumentDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.removed {
            writeln!(f, "- {} ({})", e.key, e.value)?;
        }
        for e in &self.added {
            writeln!(f, "+ {} ({})", e.key, e.value)?;
        }
        for c in &self.changed {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Display for ChangedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.change {
            ValueChange::Scalar { from, to } => writeln!(f, "~ {}: {} -> {}", self.key, from, to),
            ValueChange::Structure(d) => {
                writeln!(f, "~ {}", self.key)?;
                for s in &d.sections_removed {
                    writeln!(f, "    - section {}", s)?;
                }
                for s in &d.sections_added {
                    writeln!(f, "    + section {}", s)?;
                }
                for s in &d.sections_changed {
                    writeln!(f, "    ~ {}", s.name)?;
                    for line in &s.removed {
                        writeln!(f, "        - {}", line)?;
                    }
                    for line in &s.added {
                        writeln!(f, "        + {}", line)?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn counts(pairs: &[(&str, i64)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (*k, Value::Integer(*v)))
            .collect()
    }

    fn schema(columns: &[&[&str]], sections: &[(&str, &[&str])]) -> SchemaDocument {
        SchemaDocument {
            columns: columns
                .iter()
                .map(|r| r.iter().map(|f| f.to_string()).collect())
                .collect(),
            sections: sections
                .iter()
                .map(|(n, lines)| (n.to_string(), lines.iter().map(|l| l.to_string()).collect()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_identical_documents_have_empty_diff() {
        let a = counts(&[("users", 10), ("orders", 5)]);
        let diff = diff_documents(&a, &a.clone());
        assert!(diff.is_empty());
        assert_eq!(diff.len(), 0);
    }

    #[test]
    fn test_row_count_scenario() {
        let source = counts(&[("users", 10), ("orders", 5)]);
        let target = counts(&[("users", 10), ("orders", 6), ("audit", 0)]);
        let diff = diff_documents(&source, &target);

        assert!(diff.removed.is_empty());
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].key, "audit");
        assert_eq!(diff.added[0].value, Value::Integer(0));
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].key, "orders");
        assert_eq!(
            diff.changed[0].change,
            ValueChange::Scalar {
                from: Value::Integer(5),
                to: Value::Integer(6)
            }
        );
        assert_eq!(diff.changed[0].change.delta(), Some(1));
        assert!(!format!("{}", diff).contains("users"));
    }

    #[test]
    fn test_single_value_change_reports_only_that_key() {
        let a = counts(&[("a", 1), ("b", 2), ("c", 3)]);
        let b = counts(&[("c", 3), ("b", 20), ("a", 1)]);
        let diff = diff_documents(&a, &b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.changed[0].key, "b");
    }

    #[test]
    fn test_key_set_difference_counts() {
        let a = counts(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        let b = counts(&[("c", 1), ("d", 1), ("e", 1)]);
        let diff = diff_documents(&a, &b);
        let removed: Vec<&str> = diff.removed.iter().map(|e| e.key.as_str()).collect();
        let added: Vec<&str> = diff.added.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(removed, vec!["a", "b"]);
        assert_eq!(added, vec!["e"]);
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn test_text_values_compare() {
        let a: Document = vec![("users", Value::Text("public".to_string()))]
            .into_iter()
            .collect();
        let b: Document = vec![("users", Value::Text("app".to_string()))]
            .into_iter()
            .collect();
        let diff = diff_documents(&a, &b);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].change.delta(), None);
    }

    #[test]
    fn test_schema_diff_reports_sections_and_lines() {
        let a = schema(
            &[&["id", "integer"], &["email", "text"]],
            &[
                ("Indexes", &["\"t_pkey\" PRIMARY KEY, btree (id)"]),
                ("Triggers", &["touch BEFORE UPDATE"]),
            ],
        );
        let b = schema(
            &[&["id", "bigint"], &["email", "text"]],
            &[
                ("Indexes", &["\"t_pkey\" PRIMARY KEY, btree (id)"]),
                ("Referenced by", &["TABLE \"x\" CONSTRAINT \"x_fk\""]),
            ],
        );
        let d = diff_schema_documents(&a, &b);

        assert_eq!(d.sections_removed, vec!["Triggers"]);
        assert_eq!(d.sections_added, vec!["Referenced by"]);
        assert_eq!(
            d.sections_changed,
            vec![SectionDiff {
                name: "Columns".to_string(),
                removed: vec!["id | integer".to_string()],
                added: vec!["id | bigint".to_string()],
            }]
        );
    }

    #[test]
    fn test_equal_schemas_produce_no_change() {
        let a = schema(&[&["id", "integer"]], &[("Indexes", &["i"])]);
        let source: Document = vec![("t", Value::Structure(a.clone()))].into_iter().collect();
        let target: Document = vec![("t", Value::Structure(a))].into_iter().collect();
        assert!(diff_documents(&source, &target).is_empty());
    }

    #[test]
    fn test_unequal_schemas_with_same_lines_are_still_changed() {
        let sorted = schema(&[&["a", "int"], &["b", "text"]], &[]);
        let unsorted = schema(&[&["b", "text"], &["a", "int"]], &[]);
        let resplit = schema(&[&["a | int"], &["b | text"]], &[]);
        assert!(diff_schema_documents(&sorted, &unsorted).is_empty());
        assert!(diff_schema_documents(&sorted, &resplit).is_empty());

        let source: Document = vec![("t", Value::Structure(sorted.clone()))]
            .into_iter()
            .collect();
        for other in [unsorted, resplit] {
            let target: Document = vec![("t", Value::Structure(other.clone()))]
                .into_iter()
                .collect();
            let diff = diff_documents(&source, &target);
            assert_eq!(diff.len(), 1);
            assert_eq!(
                diff.changed[0].change,
                ValueChange::Scalar {
                    from: Value::Structure(sorted.clone()),
                    to: Value::Structure(other),
                }
            );
        }
    }

    #[test]
    fn test_sorted_difference_handles_duplicates() {
        let a = vec!["x".to_string(), "x".to_string(), "y".to_string()];
        let b = vec!["x".to_string(), "z".to_string()];
        let (only_a, only_b) = sorted_difference(&a, &b);
        assert_eq!(only_a, vec!["x", "y"]);
        assert_eq!(only_b, vec!["z"]);
    }
}
