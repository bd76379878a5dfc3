//! Pipe table structure parsing.
//!
//! A table is a pipe-delimited header line immediately followed by a
//! separator line, then one or more pipe-delimited data rows. Every row must
//! have exactly as many cells as the header.

use crate::block::{Alignment, TableSpec};
use crate::error::CompileError;

/// `| ... |` with at least one character between the outer pipes.
pub(crate) fn is_table_row(line: &str) -> bool {
    line.len() >= 3 && line.starts_with('|') && line.ends_with('|')
}

/// `|---|:--:|--:|`: every cell is dashes with optional colons and spaces around them.
pub(crate) fn is_separator(line: &str) -> bool {
    if line.len() < 2 || !line.starts_with('|') || !line.ends_with('|') {
        return false;
    }
    line[1..line.len() - 1].split('|').all(|cell| {
        let dashes = cell.trim_matches(|c: char| c.is_whitespace() || c == ':');
        !dashes.is_empty() && dashes.chars().all(|c| c == '-')
    })
}

pub(crate) fn is_table_start(lines: &[&str], idx: usize) -> bool {
    is_table_row(lines[idx]) && lines.get(idx + 1).is_some_and(|next| is_separator(next))
}

/// Split a row into trimmed cells. `\|` is a literal pipe inside a cell.
pub(crate) fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim_matches('|').trim();
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    cells.push(current);

    cells.into_iter().map(|cell| cell.trim().to_string()).collect()
}

fn alignment(cell: &str) -> Alignment {
    let cell = cell.trim();
    if cell.starts_with(':') && cell.ends_with(':') {
        Alignment::Center
    } else if cell.ends_with(':') {
        Alignment::Right
    } else {
        Alignment::Left
    }
}

/// Parse the table starting at `start` (0-based line index).
///
/// Returns the table and the number of lines it consumed. The table's
/// `insertion_index` is left at 0 for the compiler to fill in.
pub fn parse_table(lines: &[&str], start: usize) -> Result<(TableSpec, usize), CompileError> {
    let header_line = start + 1;

    let separator = match lines.get(start + 1) {
        Some(line) if is_separator(line) => *line,
        _ => {
            return Err(CompileError::structural(
                header_line,
                "Table header must be followed by separator row",
            ));
        }
    };

    let data: Vec<&str> = lines[start + 2..]
        .iter()
        .take_while(|line| is_table_row(line))
        .copied()
        .collect();
    if data.is_empty() {
        return Err(CompileError::structural(
            header_line,
            "Table must have header, separator, and at least one data row",
        ));
    }

    let headers = split_cells(lines[start]);
    let columns = headers.len();

    let alignments: Vec<Alignment> = split_cells(separator).iter().map(|c| alignment(c)).collect();
    if alignments.len() != columns {
        return Err(CompileError::structural(
            header_line + 1,
            format!(
                "Separator has {} columns, header has {}",
                alignments.len(),
                columns
            ),
        ));
    }

    let mut rows = Vec::with_capacity(data.len());
    for (offset, line) in data.iter().enumerate() {
        let cells = split_cells(line);
        if cells.len() != columns {
            return Err(CompileError::structural(
                header_line + 2 + offset,
                format!("Row has {} columns, expected {}", cells.len(), columns),
            ));
        }
        rows.push(cells);
    }

    let consumed = 2 + rows.len();
    Ok((
        TableSpec {
            headers,
            alignments,
            rows,
            source_line: header_line,
            insertion_index: 0,
        },
        consumed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn simple_table() {
        let src = lines("| a | b |\n|---|---|\n| 1 | 2 |");
        let (table, consumed) = parse_table(&src, 0).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
        assert_eq!(table.alignments, vec![Alignment::Left, Alignment::Left]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn short_row_is_rejected() {
        let src = lines("| a | b |\n|---|---|\n| 1 |");
        let err = parse_table(&src, 0).unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert!(err.to_string().contains("Row has 1 columns, expected 2"));
    }

    #[test]
    fn separator_alignment() {
        let src = lines("| a | b |\n|:---:|---:|\n| 1 | 2 |");
        let (table, _) = parse_table(&src, 0).unwrap();
        assert_eq!(table.alignments, vec![Alignment::Center, Alignment::Right]);

        let src = lines("| a |\n|:---|\n| 1 |");
        let (table, _) = parse_table(&src, 0).unwrap();
        assert_eq!(table.alignments, vec![Alignment::Left]);
    }

    #[test]
    fn separator_column_mismatch() {
        let src = lines("| a | b |\n|---|\n| 1 | 2 |");
        let err = parse_table(&src, 0).unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn header_without_rows() {
        let src = lines("| a | b |\n|---|---|\nafter");
        let err = parse_table(&src, 0).unwrap_err();
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn missing_separator() {
        let src = lines("| a | b |\n| 1 | 2 |");
        assert!(!is_table_start(&src, 0));
        assert!(parse_table(&src, 0).is_err());
    }

    #[test]
    fn table_stops_at_first_non_row() {
        let src = lines("| a |\n|---|\n| 1 |\n| 2 |\ntext\n| 3 |");
        let (table, consumed) = parse_table(&src, 0).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn escaped_pipe_is_cell_content() {
        assert_eq!(split_cells(r"| a \| b | c |"), vec!["a | b", "c"]);
    }

    #[test]
    fn separator_shapes() {
        assert!(is_separator("|---|"));
        assert!(is_separator("| :-: | --: |"));
        assert!(!is_separator("|-:-|"));
        assert!(!is_separator("||"));
        assert!(!is_separator("| a |"));
    }

    #[test]
    fn cells_are_row_major() {
        let src = lines("| a | b |\n|---|---|\n| 1 | 2 |");
        let (table, _) = parse_table(&src, 0).unwrap();
        let cells: Vec<_> = table.cells().collect();
        assert_eq!(
            cells,
            vec![(0, 0, "a"), (0, 1, "b"), (1, 0, "1"), (1, 1, "2")]
        );
    }
}
