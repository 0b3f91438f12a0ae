//! Comparison categories.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::PgDiffError;

/// The fixed set of things two databases can be compared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Base table names (value: owning schema).
    TableName,
    /// Number of base tables (same extraction as `TableName`).
    TableCount,
    /// Exact row count per table.
    RowCount,
    /// Normalized `\d` description per table.
    TableSchema,
    /// `pg_table_size` per table.
    TableSize,
    /// `pg_indexes_size` per table.
    IndexSize,
    /// `pg_total_relation_size` per table.
    TableTotalSize,
    /// Last value of every sequence.
    Sequence,
}

impl Category {
    /// All categories, in the order they are listed to users.
    pub const ALL: [Category; 8] = [
        Category::TableName,
        Category::TableCount,
        Category::TableSchema,
        Category::RowCount,
        Category::TableSize,
        Category::IndexSize,
        Category::TableTotalSize,
        Category::Sequence,
    ];

    /// Canonical snake_case name, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TableName => "table_name",
            Category::TableCount => "table_count",
            Category::RowCount => "row_count",
            Category::TableSchema => "table_schema",
            Category::TableSize => "table_size",
            Category::IndexSize => "index_size",
            Category::TableTotalSize => "table_total_size",
            Category::Sequence => "sequence",
        }
    }

    /// Human label, e.g. "table total size".
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Values are byte sizes.
    pub fn is_size(&self) -> bool {
        matches!(
            self,
            Category::TableSize | Category::IndexSize | Category::TableTotalSize
        )
    }

    /// Values (or the total) are counts.
    pub fn is_count(&self) -> bool {
        matches!(self, Category::RowCount | Category::TableCount)
    }

    /// Values come from the table inventory query.
    pub fn is_inventory(&self) -> bool {
        matches!(self, Category::TableName | Category::TableCount)
    }

    /// Whether an info summary carries a meaningful total.
    pub fn has_total(&self) -> bool {
        !matches!(self, Category::TableSchema)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PgDiffError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                PgDiffError::ValidationFailed(format!(
                    "Unknown type '{}'. Valid types: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}
