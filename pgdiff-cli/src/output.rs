//! Terminal output formatting for diff and info reports.
//! Uses comfy-table for tabular output and colored for
//! add/remove/change styling.

use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use pgdiff_core::diff::{ChangedEntry, ValueChange};
use pgdiff_core::{Category, DiffReport, Document, InfoReport, Value};

/// hurry.filesize "traditional" units: integer division, no decimals.
const SIZE_UNITS: [(i64, &str); 6] = [
    (1 << 50, "P"),
    (1 << 40, "T"),
    (1 << 30, "G"),
    (1 << 20, "M"),
    (1 << 10, "K"),
    (1, "B"),
];

/// Render a byte count as `123B`, `4K`, `17M`, ...
pub fn format_size(bytes: i64) -> String {
    let (factor, suffix) = SIZE_UNITS
        .iter()
        .find(|(factor, _)| bytes >= *factor)
        .copied()
        .unwrap_or((1, "B"));
    format!("{}{}", bytes / factor, suffix)
}

/// Render an integer with thousands separators, e.g. `1,234,567`.
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Format a single value the way the category is read by humans.
fn format_value(category: Category, value: &Value) -> String {
    match value {
        Value::Integer(n) => format_total(category, *n),
        other => other.to_string(),
    }
}

fn format_total(category: Category, n: i64) -> String {
    if category.is_size() {
        format_size(n)
    } else if category.is_count() || category.is_inventory() {
        format_count(n)
    } else {
        n.to_string()
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.into_iter().map(Cell::new).collect::<Vec<_>>());
    table
}

/// Print a whole document as a two-column table (or a schema overview).
fn print_document(title: &str, category: Category, doc: &Document) {
    println!("{}", title.bold());
    if doc.is_empty() {
        println!("{}", "  (empty)".dimmed());
        return;
    }

    let label = category.label();
    let mut table = if category == Category::TableSchema {
        new_table(vec!["Table", "Columns", "Sections"])
    } else if category.is_inventory() {
        new_table(vec!["Table", "Schema"])
    } else if category == Category::Sequence {
        new_table(vec!["Sequence", "Last Value"])
    } else {
        new_table(vec!["Table", label.as_str()])
    };

    for (key, value) in doc.iter() {
        match value {
            Value::Structure(s) => {
                table.add_row(vec![
                    Cell::new(key),
                    Cell::new(s.columns.len()),
                    Cell::new(s.sections.keys().cloned().collect::<Vec<_>>().join(", ")),
                ]);
            }
            other => {
                table.add_row(vec![Cell::new(key), Cell::new(format_value(category, other))]);
            }
        }
    }
    println!("{table}");
}

fn print_changed(category: Category, entry: &ChangedEntry) {
    match &entry.change {
        ValueChange::Scalar { from, to } => {
            let delta = entry
                .change
                .delta()
                .map(|d| {
                    let sign = if d >= 0 { "+" } else { "-" };
                    let magnitude = d.saturating_abs();
                    format!(" ({}{})", sign, format_total(category, magnitude))
                })
                .unwrap_or_default();
            println!(
                "  {}",
                format!(
                    "~ {}: {} -> {}{}",
                    entry.key,
                    format_value(category, from),
                    format_value(category, to),
                    delta
                )
                .yellow()
            );
        }
        ValueChange::Structure(d) => {
            println!("  {}", format!("~ {}", entry.key).yellow());
            for s in &d.sections_removed {
                println!("      {}", format!("- section {}", s).red());
            }
            for s in &d.sections_added {
                println!("      {}", format!("+ section {}", s).green());
            }
            for s in &d.sections_changed {
                println!("      {}", format!("~ {}", s.name).yellow());
                for line in &s.removed {
                    println!("          {}", format!("- {}", line).red());
                }
                for line in &s.added {
                    println!("          {}", format!("+ {}", line).green());
                }
            }
        }
    }
}

/// Print a diff report.
pub fn print_diff_report(report: &DiffReport) {
    let category = report.category;
    println!(
        "{}",
        format!(
            "Comparing {}: {} -> {}",
            category.label(),
            report.source,
            report.target
        )
        .dimmed()
    );

    if let Some(ref docs) = report.documents {
        println!();
        print_document("Source:", category, &docs.source);
        println!();
        print_document("Target:", category, &docs.target);
    }

    if category == Category::TableCount {
        println!();
        println!(
            "Source tables: {}, target tables: {}",
            format_count(report.source_entries as i64).bold(),
            format_count(report.target_entries as i64).bold()
        );
    }

    println!();
    println!("{}", "Diff Result:".bold());
    println!();

    if report.identical {
        println!("{}", "They are the same.".green().bold());
        return;
    }

    println!(
        "{}",
        format!("Found {} difference(s):", report.diff.len())
            .yellow()
            .bold()
    );
    println!();

    for e in &report.diff.removed {
        println!(
            "  {}",
            format!("- {} ({})", e.key, format_value(category, &e.value)).red()
        );
    }
    for e in &report.diff.added {
        println!(
            "  {}",
            format!("+ {} ({})", e.key, format_value(category, &e.value)).green()
        );
    }
    for c in &report.diff.changed {
        print_changed(category, c);
    }

    println!();
    println!(
        "{}",
        "- only in source, + only in target, ~ changed".dimmed()
    );
}

/// Print an info report.
pub fn print_info_report(report: &InfoReport) {
    let category = report.category;

    if let Some(ref doc) = report.documents {
        print_document("Info Result:", category, doc);
        println!();
    }

    match report.total {
        Some(total) => println!(
            "Total {}: {}",
            category.label(),
            format_total(category, total).bold()
        ),
        None => println!(
            "{} table(s) described in {}.",
            format_count(report.entries as i64).bold(),
            report.database
        ),
    }
}
