// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use gridline_app::{CellValue, ColumnDescriptor, GridCoordinator, GridHost, Overlay, Pagination, Row};
use std::fmt::Write as _;

const COLUMN_GAP: &str = "  ";
const DEFAULT_MAX_WIDTH: usize = 32;

/// Plain-text rendering of what the grid shows: the visible rows, or the
/// overlay message, followed by the pager line.
pub fn render_grid<H: GridHost>(grid: &GridCoordinator<H>) -> String {
    let mut out = String::new();
    match grid.overlay() {
        Overlay::Rows => render_rows(&mut out, grid.columns(), &grid.visible_rows()),
        Overlay::Loading => out.push_str("Loading...\n"),
        Overlay::Empty => out.push_str("No rows to show\n"),
        Overlay::Error(message) => {
            let _ = writeln!(out, "Error: {message}");
        }
    }
    out.push_str(&pager_line(grid.pagination()));
    out.push('\n');
    out
}

fn column_width(column: &ColumnDescriptor, rows: &[&Row]) -> usize {
    let widest = rows
        .iter()
        .map(|row| cell_text(row, &column.field).chars().count())
        .chain(std::iter::once(column.header.chars().count()))
        .max()
        .unwrap_or(0);
    let min = column.min_width.map_or(0, usize::from);
    let max = column.max_width.map_or(DEFAULT_MAX_WIDTH, usize::from).max(min);
    widest.clamp(min, max)
}

fn cell_text(row: &Row, field: &str) -> String {
    row.get(field).map(CellValue::display).unwrap_or_default()
}

fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return format!("{text:<width$}");
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('~');
    clipped
}

fn render_rows(out: &mut String, columns: &[ColumnDescriptor], rows: &[&Row]) {
    let widths: Vec<usize> = columns
        .iter()
        .map(|column| column_width(column, rows))
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| fit(&column.header, *width))
        .collect();
    out.push_str(header.join(COLUMN_GAP).trim_end());
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| fit(&cell_text(row, &column.field), *width))
            .collect();
        out.push_str(cells.join(COLUMN_GAP).trim_end());
        out.push('\n');
    }
}

/// `Page 2 of 5  1 [2] 3 4 5  (11-20 of 42)`
pub fn pager_line(pagination: &Pagination) -> String {
    let current = pagination.current_page();
    let window: Vec<String> = pagination
        .visible_page_window()
        .into_iter()
        .map(|page| {
            if page == current {
                format!("[{page}]")
            } else {
                page.to_string()
            }
        })
        .collect();
    format!(
        "Page {current} of {}  {}  ({})",
        pagination.total_pages(),
        window.join(" "),
        pagination.range_label()
    )
}
