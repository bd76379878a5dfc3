use crate::block::{Block, SourceBlock};
use crate::error::CompileError;
use crate::table;

/// Parse markup into line-level blocks
pub fn parse(markdown: &str) -> Result<Vec<SourceBlock>, CompileError> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::with_capacity(lines.len());
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        let number = idx + 1;

        if table::is_table_start(&lines, idx) {
            let (spec, consumed) = table::parse_table(&lines, idx)?;
            blocks.push(SourceBlock {
                line: number,
                block: Block::Table(spec),
            });
            idx += consumed;
            continue;
        }

        blocks.push(SourceBlock {
            line: number,
            block: parse_line(line),
        });
        idx += 1;
    }

    Ok(blocks)
}

/// Classify a single non-table line
fn parse_line(line: &str) -> Block {
    if line.is_empty() {
        return Block::Blank;
    }
    if let Some((level, text)) = heading(line) {
        return Block::Heading {
            level,
            text: text.to_string(),
        };
    }
    if let Some(text) = line.strip_prefix('-').and_then(marker_content) {
        return Block::BulletItem(text.to_string());
    }
    if let Some(text) = ordered_item(line) {
        return Block::NumberedItem(text.to_string());
    }
    Block::Paragraph(line.to_string())
}

/// `# x`, `## x` or `### x`
fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    marker_content(&line[hashes..]).map(|text| (hashes as u8, text))
}

/// `1. x`, any run of digits
fn ordered_item(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix('.').and_then(marker_content)
}

/// Content after a block marker: at least one whitespace, then something.
fn marker_content(rest: &str) -> Option<&str> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim_start();
    (!content.is_empty()).then_some(content)
}
