//! Output formatting helpers for human-readable and JSON output.

use canopy::{Composite, Node, Property, Value};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    // Column width is the widest of header and cells
    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_line.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .take(col_count)
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
}

/// One row per leaf: qualified name, value type, value
pub fn leaf_rows(root: &Composite) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    collect_rows(root, &mut rows);
    rows
}

fn collect_rows(composite: &Composite, rows: &mut Vec<Vec<String>>) {
    for (_, child) in composite.children() {
        match &child {
            Node::Leaf(leaf) => {
                let value = leaf.value();
                rows.push(vec![
                    leaf.qualified_name().to_string(),
                    value.type_name().to_string(),
                    value.to_string(),
                ]);
            }
            Node::Composite(nested) => collect_rows(nested, rows),
        }
    }
}

/// Print one change event
pub fn print_event(format: OutputFormat, old: &Value, new: &Value, name: &str) {
    match format {
        OutputFormat::Human => println!("{name}: {old} -> {new}"),
        OutputFormat::Json => {
            let event = serde_json::json!({
                "name": name,
                "old": old.to_json(),
                "new": new.to_json(),
            });
            println!("{event}");
        }
    }
}
