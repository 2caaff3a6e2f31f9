//! Terminal rendering with comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use tabula_cache::CacheKey;
use tabula_model::{Page, Row, RowAccess};

use crate::commands::{ReplayReport, TreeLine};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

/// `user / active / page 1 of 3 / 21 rows / search "ad" / role=admin`
pub fn page_heading(key: &CacheKey, page: &Page<Row>) -> String {
    let params = &key.params;
    let mut parts = vec![
        key.resource.to_string(),
        params.status.to_string(),
        format!("page {} of {}", params.page, page.total_pages.max(1)),
        format!("{} rows", page.total),
    ];
    if !params.search.is_empty() {
        parts.push(format!("search {:?}", params.search));
    }
    parts.extend(params.filters.iter().map(|(k, v)| format!("{k}={v}")));
    parts.join(" / ")
}

pub fn page_table(page: &Page<Row>, columns: &[String]) -> Table {
    let mut table = Table::new();
    let mut header = vec![header_cell("#")];
    header.extend(columns.iter().map(|c| header_cell(c)));
    table.set_header(header);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);

    let first = page.first_row_number();
    for (offset, row) in page.rows.iter().enumerate() {
        let mut cells = vec![dim_cell(first + offset)];
        cells.extend(columns.iter().map(|column| match row.field_text(column) {
            Some(text) => Cell::new(text),
            None => dim_cell("-"),
        }));
        table.add_row(cells);
    }
    table
}

/// Columns printed for replayed pages when none are requested.
pub fn default_columns(search_fields: &[String]) -> Vec<String> {
    let mut columns = vec!["id".to_string()];
    columns.extend(search_fields.iter().filter(|f| *f != "id").cloned());
    columns
}

pub fn print_replay(report: &ReplayReport, columns: &[String]) {
    for (key, page) in &report.pages {
        println!("{}", page_heading(key, page));
        if page.rows.is_empty() {
            println!("  (no rows)");
        } else {
            println!("{}", page_table(page, columns));
        }
    }
    println!(
        "Applied {} event(s), skipped {}, {} entry update(s), {} version bump(s).",
        report.stats.applied,
        report.stats.skipped + report.unreadable.len(),
        report.stats.entries_changed,
        report.version_bumps
    );
    for bad in &report.unreadable {
        eprintln!("- line {}: {}", bad.line, bad.error);
    }
}

pub fn tree_table(lines: &[TreeLine]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Label"),
        header_cell("Depth"),
        header_cell("Indent"),
        header_cell("Children"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for line in lines {
        let label = format!("{}{}", "  ".repeat(line.depth), line.label);
        let label = if line.orphan {
            Cell::new(label).fg(Color::Yellow)
        } else {
            Cell::new(label)
        };
        table.add_row(vec![
            Cell::new(line.id.as_str()),
            label,
            Cell::new(line.depth),
            dim_cell(format!("{}px", line.indent)),
            Cell::new(expander(line)),
        ]);
    }
    table
}

/// Indented outline, one row per line.
pub fn tree_outline(lines: &[TreeLine]) -> String {
    lines
        .iter()
        .map(|line| {
            let orphan = if line.orphan { " (orphan)" } else { "" };
            format!(
                "{} {}{} [{}]{orphan}",
                expander(line),
                "  ".repeat(line.depth),
                line.label,
                line.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn expander(line: &TreeLine) -> &'static str {
    match (line.has_children, line.expanded) {
        (false, _) => "-",
        (true, true) => "v",
        (true, false) => ">",
    }
}
