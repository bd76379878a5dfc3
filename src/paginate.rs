use serde::Serialize;

/// One window of a document read as lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub title: String,
    pub total_lines: usize,
    /// 1-based, as requested.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub remaining_lines: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_start_line: Option<usize>,
    pub content: String,
}

/// Return up to `max_lines` lines of `text` starting at the 1-based
/// `start_line`. Lines are split on `\n`, so a trailing break yields a
/// final empty line.
pub fn paginate(text: &str, title: &str, start_line: usize, max_lines: usize) -> Page {
    let lines: Vec<&str> = text.split('\n').collect();
    let total_lines = lines.len();

    let start = start_line.saturating_sub(1).min(total_lines);
    let end = start.saturating_add(max_lines).min(total_lines);
    let remaining_lines = total_lines - end;
    let has_more = remaining_lines > 0;

    Page {
        title: title.to_string(),
        total_lines,
        start_line,
        end_line: end,
        remaining_lines,
        has_more,
        next_start_line: has_more.then_some(end + 1),
        content: lines[start..end].join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page() {
        let page = paginate("a\nb\nc\nd", "Doc", 1, 2);
        assert_eq!(page.content, "a\nb");
        assert_eq!(page.total_lines, 4);
        assert_eq!(page.end_line, 2);
        assert_eq!(page.remaining_lines, 2);
        assert!(page.has_more);
        assert_eq!(page.next_start_line, Some(3));
    }

    #[test]
    fn last_page() {
        let page = paginate("a\nb\nc\nd", "Doc", 3, 10);
        assert_eq!(page.content, "c\nd");
        assert_eq!(page.end_line, 4);
        assert!(!page.has_more);
        assert_eq!(page.next_start_line, None);
    }

    #[test]
    fn start_past_end_is_empty() {
        let page = paginate("a\nb", "Doc", 9, 5);
        assert_eq!(page.content, "");
        assert_eq!(page.start_line, 9);
        assert_eq!(page.end_line, 2);
        assert!(!page.has_more);
    }

    #[test]
    fn trailing_break_counts_as_line() {
        assert_eq!(paginate("a\n", "Doc", 1, 100).total_lines, 2);
        assert_eq!(paginate("", "Doc", 1, 100).total_lines, 1);
    }

    #[test]
    fn wire_shape() {
        let value = serde_json::to_value(paginate("x", "T", 1, 1)).unwrap();
        assert_eq!(value["totalLines"], 1);
        assert_eq!(value["hasMore"], false);
        assert!(value.get("nextStartLine").is_none());
    }
}
