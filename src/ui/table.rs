use crate::step_logger::{LogEntry, StepStatus};

const HEADERS: [&str; 5] = ["Order", "Timestamp", "Step Description", "Tool/App/URL/EXE", "Status"];

const RESET: &str = "\x1b[0m";

/// ANSI color of a status cell; `None` keeps the terminal default
pub fn status_color(status: &StepStatus) -> Option<&'static str> {
    match status {
        StepStatus::Started => Some("\x1b[34m"),
        StepStatus::Success => Some("\x1b[32m"),
        StepStatus::Failed => Some("\x1b[31m"),
        // closest to orange in the 16-color palette
        StepStatus::Retried => Some("\x1b[33m"),
        StepStatus::Other(_) => None,
    }
}

fn row_cells(entry: &LogEntry) -> [String; 5] {
    [
        entry.order.to_string(),
        entry.timestamp.format("%H:%M:%S").to_string(),
        entry.step.clone(),
        entry.tool.clone(),
        entry.status.to_string(),
    ]
}

/// Render entries in insertion order as a fixed-width text table
pub fn render_table(entries: &[LogEntry], colored: bool) -> String {
    let rows: Vec<[String; 5]> = entries.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(String::from), &widths, None);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&separator.join("-+-"));
    out.push('\n');

    for (entry, row) in entries.iter().zip(rows.iter()) {
        let color = if colored { status_color(&entry.status) } else { None };
        push_row(&mut out, row, &widths, color);
    }

    out
}

/// One entry as a single unpadded line, for append-only output
pub fn render_row(entry: &LogEntry, colored: bool) -> String {
    let cells = row_cells(entry);
    let status = match status_color(&entry.status) {
        Some(color) if colored => format!("{}{}{}", color, cells[4], RESET),
        _ => cells[4].clone(),
    };
    format!("{} | {} | {} | {} | {}", cells[0], cells[1], cells[2], cells[3], status)
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5], status_color: Option<&str>) {
    let last = cells.len() - 1;
    for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        if i > 0 {
            out.push_str(" | ");
        }
        let padded = format!("{:<width$}", cell, width = *width);
        match status_color {
            Some(color) if i == last => {
                out.push_str(color);
                out.push_str(&padded);
                out.push_str(RESET);
            }
            _ => out.push_str(&padded),
        }
    }
    // trailing padding is noise in captured output
    let trimmed = out.trim_end_matches(' ').len();
    out.truncate(trimmed);
    out.push('\n');
}
