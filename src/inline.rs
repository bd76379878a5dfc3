//! Inline span parsing: code, bold and italic.
//!
//! The line is scanned once per span kind, in priority order. A candidate
//! that overlaps an already accepted higher-priority span is dropped whole,
//! so overlapping markers degrade to literal text instead of producing
//! crossed ranges. Unterminated markers are left as literal text.

use std::ops::Range;

use crate::block::{InlineSpan, SpanKind};
use crate::config::StyleConfig;
use crate::directive::TextStyle;
use crate::offset::{TextRange, doc_len};

/// A line with its inline markers removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineLine {
    pub plain: String,
    /// Spans covering `plain` in order, styled and plain runs alike.
    pub spans: Vec<InlineSpan>,
}

impl InlineLine {
    pub fn styled(&self) -> impl Iterator<Item = &InlineSpan> {
        self.spans.iter().filter(|s| s.kind != SpanKind::PlainRun)
    }

    /// Text-style ranges for the styled spans, for a line placed at `base`.
    pub fn text_styles(&self, base: usize, styles: &StyleConfig) -> Vec<(TextRange, TextStyle)> {
        self.styled()
            .map(|span| {
                let start = base + doc_len(&self.plain[..span.start]);
                let range = TextRange::new(start, start + doc_len(&span.text));
                let style = match span.kind {
                    SpanKind::Code => TextStyle::monospace(&styles.code_font, styles.code_font_size),
                    SpanKind::Bold => TextStyle::bold(),
                    _ => TextStyle::italic(),
                };
                (range, style)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Marker {
    kind: SpanKind,
    outer: Range<usize>,
    content: Range<usize>,
}

impl Marker {
    fn overlaps(&self, other: &Marker) -> bool {
        self.outer.start < other.outer.end && other.outer.start < self.outer.end
    }
}

/// Parse the inline markup of one line.
pub fn parse_line(line: &str) -> InlineLine {
    let mut accepted = find_code(line);

    for candidate in find_bold(line) {
        if !accepted.iter().any(|m| m.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }
    for candidate in find_italic(line) {
        if !accepted.iter().any(|m| m.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|m| m.outer.start);
    rebuild(line, &accepted)
}

fn rebuild(line: &str, markers: &[Marker]) -> InlineLine {
    let mut plain = String::with_capacity(line.len());
    let mut spans = Vec::with_capacity(markers.len() * 2 + 1);
    let mut last = 0;

    let mut push = |plain: &mut String, kind: SpanKind, text: &str| {
        if text.is_empty() {
            return;
        }
        let start = plain.len();
        plain.push_str(text);
        spans.push(InlineSpan {
            kind,
            start,
            end: plain.len(),
            text: text.to_string(),
        });
    };

    for marker in markers {
        push(&mut plain, SpanKind::PlainRun, &line[last..marker.outer.start]);
        push(&mut plain, marker.kind, &line[marker.content.clone()]);
        last = marker.outer.end;
    }
    push(&mut plain, SpanKind::PlainRun, &line[last..]);

    InlineLine { plain, spans }
}

/// Byte index just past the first character at `at`, if any.
fn after_first_char(line: &str, at: usize) -> Option<usize> {
    line[at..].chars().next().map(|c| at + c.len_utf8())
}

/// `` ```x``` `` first, then `` `x` ``.
fn find_code(line: &str) -> Vec<Marker> {
    let bytes = line.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        if line[i..].starts_with("```") {
            let content_start = i + 3;
            if let Some(search_from) = after_first_char(line, content_start) {
                if let Some(rel) = line[search_from..].find("```") {
                    let close = search_from + rel;
                    found.push(Marker {
                        kind: SpanKind::Code,
                        outer: i..close + 3,
                        content: content_start..close,
                    });
                    i = close + 3;
                    continue;
                }
            }
        }

        let content_start = i + 1;
        if let Some(rel) = line[content_start..].find('`') {
            if rel > 0 {
                let close = content_start + rel;
                found.push(Marker {
                    kind: SpanKind::Code,
                    outer: i..close + 1,
                    content: content_start..close,
                });
                i = close + 1;
                continue;
            }
        }

        i += 1;
    }

    found
}

/// `**x**`, shortest match, at least one character of content.
fn find_bold(line: &str) -> Vec<Marker> {
    let mut found = Vec::new();
    let mut i = 0;

    while i + 1 < line.len() {
        if !line.is_char_boundary(i) || !line[i..].starts_with("**") {
            i += 1;
            continue;
        }
        let content_start = i + 2;
        let close = after_first_char(line, content_start)
            .and_then(|from| line[from..].find("**").map(|rel| from + rel));
        match close {
            Some(close) => {
                found.push(Marker {
                    kind: SpanKind::Bold,
                    outer: i..close + 2,
                    content: content_start..close,
                });
                i = close + 2;
            }
            None => i += 1,
        }
    }

    found
}

/// `*x*` where neither delimiter touches another `*`.
fn find_italic(line: &str) -> Vec<Marker> {
    let bytes = line.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'*' || (i > 0 && bytes[i - 1] == b'*') {
            i += 1;
            continue;
        }
        let content_start = i + 1;
        let run = bytes[content_start..]
            .iter()
            .take_while(|&&b| b != b'*')
            .count();
        let close = content_start + run;
        let closes = run > 0
            && close < bytes.len()
            && bytes.get(close + 1).is_none_or(|&b| b != b'*');
        if closes {
            found.push(Marker {
                kind: SpanKind::Italic,
                outer: i..close + 1,
                content: content_start..close,
            });
            i = close + 1;
        } else {
            i += 1;
        }
    }

    found
}
