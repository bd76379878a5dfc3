use crate::block::ListKind;
use crate::tree::{DocumentTree, Node, ParagraphNode, Run, TableNode};

/// Convert a document tree to markup. Lines are joined with `\n`, without a
/// trailing break.
pub fn decompile(tree: &DocumentTree) -> String {
    let mut lines = Vec::new();

    for node in &tree.nodes {
        match node {
            Node::Paragraph(paragraph) => emit_paragraph(paragraph, &mut lines),
            Node::Table(table) => {
                emit_table(table, &mut lines);
                lines.push(String::new());
            }
        }
    }

    lines.join("\n")
}

fn emit_paragraph(paragraph: &ParagraphNode, lines: &mut Vec<String>) {
    let mut buffer = String::new();

    for run in &paragraph.runs {
        let mut parts = run.text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                run_to_markup(run, part, &mut buffer);
            }
            // Every part but the last was followed by a line break.
            if parts.peek().is_some() {
                flush_line(paragraph, &mut buffer, lines);
            }
        }
    }

    flush_line(paragraph, &mut buffer, lines);
}

/// Apply block-level formatting to the buffered line and move it to `lines`.
/// Empty lines are dropped.
fn flush_line(paragraph: &ParagraphNode, buffer: &mut String, lines: &mut Vec<String>) {
    let line = std::mem::take(buffer);
    let line = line.trim_end();
    if line.is_empty() {
        return;
    }

    let prefix = match (paragraph.style.heading_level(), paragraph.list) {
        (Some(level), _) => format!("{} ", "#".repeat(level as usize)),
        (None, Some(ListKind::Bullet)) => "- ".to_string(),
        (None, Some(ListKind::Numbered)) => "1. ".to_string(),
        (None, None) => String::new(),
    };
    lines.push(format!("{prefix}{line}"));
}

fn run_to_markup(run: &Run, text: &str, out: &mut String) {
    let delimiter = if run.code {
        "```"
    } else {
        match (run.bold, run.italic) {
            (true, true) => "***",
            (true, false) => "**",
            (false, true) => "*",
            (false, false) => "",
        }
    };
    out.push_str(delimiter);
    out.push_str(text);
    out.push_str(delimiter);
}

fn cell_to_markup(runs: &[Run]) -> String {
    let parts: Vec<String> = runs
        .iter()
        .map(|run| {
            let mut part = String::new();
            run_to_markup(run, &run.text, &mut part);
            part
        })
        .collect();
    parts.join(" ").trim().replace('|', "\\|")
}

/// Header, a plain dash separator, then data rows. Each column is padded to
/// its widest cell. Source alignment is not rendered.
fn emit_table(table: &TableNode, lines: &mut Vec<String>) {
    let rendered: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell_to_markup(cell)).collect())
        .collect();

    let Some(header) = rendered.first() else {
        return;
    };

    let mut widths = vec![0; header.len()];
    for row in &rendered {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    lines.push(table_row(header, &widths));
    let separators: Vec<String> = widths.iter().map(|&w| "-".repeat(w.max(3))).collect();
    lines.push(format!("|{}|", separators.join("|")));
    for row in &rendered[1..] {
        lines.push(table_row(row, &widths));
    }
}

fn table_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    format!("| {} |", padded.join(" | "))
}
