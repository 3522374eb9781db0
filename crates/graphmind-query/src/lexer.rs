//! Quote- and comment-aware scanning of statement text.
//!
//! Statement text is split into spans that are plain, quoted (single, double
//! or backtick, delimiters included) or comments (`//` to end of line,
//! `/* ... */`). Everything that has to ignore the contents of literals and
//! comments (terminator detection, placeholder discovery, clause detection)
//! works from these spans.

/// What a span of statement text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Plain,
    Quoted,
    Comment,
}

/// A run of statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    /// Byte offset of the span in the scanned input.
    pub start: usize,
    pub text: &'a str,
    pub kind: SpanKind,
    /// False only for a final quoted span or block comment missing its
    /// closing delimiter.
    pub terminated: bool,
}

impl Span<'_> {
    pub fn is_plain(&self) -> bool {
        self.kind == SpanKind::Plain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Quote(char),
    LineComment,
    BlockComment,
}

fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

fn push_span<'a>(out: &mut Vec<Span<'a>>, input: &'a str, from: usize, to: usize, kind: SpanKind) {
    if to > from {
        out.push(Span {
            start: from,
            text: &input[from..to],
            kind,
            terminated: true,
        });
    }
}

/// Split `input` into plain, quoted and comment spans.
///
/// Inside string literals a backslash escapes the next character. A doubled
/// delimiter inside any quoted span stands for the delimiter itself. A line
/// comment stops before its newline.
pub fn spans(input: &str) -> Vec<Span<'_>> {
    let mut out = Vec::new();
    let mut chars = input.char_indices().peekable();
    let mut start = 0;
    let mut open: Option<Open> = None;

    while let Some((i, c)) = chars.next() {
        match open {
            None => {
                let next = chars.peek().map(|(_, n)| *n);
                let opened = if is_quote(c) {
                    Some(Open::Quote(c))
                } else if c == '/' && next == Some('/') {
                    chars.next();
                    Some(Open::LineComment)
                } else if c == '/' && next == Some('*') {
                    chars.next();
                    Some(Open::BlockComment)
                } else {
                    None
                };
                if let Some(opened) = opened {
                    push_span(&mut out, input, start, i, SpanKind::Plain);
                    start = i;
                    open = Some(opened);
                }
            }
            Some(Open::LineComment) => {
                if c == '\n' {
                    push_span(&mut out, input, start, i, SpanKind::Comment);
                    start = i;
                    open = None;
                }
            }
            Some(Open::BlockComment) => {
                if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                    chars.next();
                    let end = i + 2;
                    push_span(&mut out, input, start, end, SpanKind::Comment);
                    start = end;
                    open = None;
                }
            }
            Some(Open::Quote(q)) if c == '\\' && q != '`' => {
                chars.next();
            }
            Some(Open::Quote(q)) if c == q => {
                if matches!(chars.peek(), Some((_, next)) if *next == q) {
                    chars.next();
                    continue;
                }
                let end = i + c.len_utf8();
                push_span(&mut out, input, start, end, SpanKind::Quoted);
                start = end;
                open = None;
            }
            Some(Open::Quote(_)) => {}
        }
    }

    if start < input.len() {
        let (kind, terminated) = match open {
            None => (SpanKind::Plain, true),
            Some(Open::LineComment) => (SpanKind::Comment, true),
            Some(Open::BlockComment) => (SpanKind::Comment, false),
            Some(Open::Quote(_)) => (SpanKind::Quoted, false),
        };
        out.push(Span {
            start,
            text: &input[start..],
            kind,
            terminated,
        });
    }

    out
}

/// Whether a quoted span or block comment is left open at the end of `input`.
pub fn has_unterminated_span(input: &str) -> bool {
    spans(input).iter().any(|s| !s.terminated)
}

/// Copy of `input` with the contents of quoted spans blanked out and comments
/// replaced by spaces. Quote delimiters are kept so the result still reads as
/// a statement.
pub fn neutralize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for span in spans(input) {
        match span.kind {
            SpanKind::Plain => out.push_str(span.text),
            SpanKind::Comment => out.extend(std::iter::repeat(' ').take(span.text.chars().count())),
            SpanKind::Quoted => {
                let mut chars = span.text.chars();
                if let Some(first) = chars.next() {
                    out.push(first);
                }
                let inner: Vec<char> = chars.collect();
                let (body, last) = match (span.terminated, inner.split_last()) {
                    (true, Some((last, body))) => (body, Some(*last)),
                    _ => (inner.as_slice(), None),
                };
                out.extend(std::iter::repeat(' ').take(body.len()));
                if let Some(last) = last {
                    out.push(last);
                }
            }
        }
    }
    out
}

/// Copy of `input` with every comment replaced by a single space.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for span in spans(input) {
        match span.kind {
            SpanKind::Comment => out.push(' '),
            _ => out.push_str(span.text),
        }
    }
    out
}

/// Byte offset of the first `;` outside any quoted span or comment.
pub fn first_terminator(input: &str) -> Option<usize> {
    spans(input)
        .iter()
        .filter(|s| s.is_plain())
        .find_map(|s| s.text.find(';').map(|pos| s.start + pos))
}

/// Text up to, not including, the first top-level terminator.
pub fn first_statement(input: &str) -> &str {
    match first_terminator(input) {
        Some(pos) => &input[..pos],
        None => input,
    }
}

/// Whether a top-level terminator is followed by anything other than
/// whitespace or further terminators.
pub fn has_multiple_statements(input: &str) -> bool {
    match first_terminator(input) {
        Some(pos) => input[pos + 1..]
            .chars()
            .any(|c| !c.is_whitespace() && c != ';'),
        None => false,
    }
}

/// Names of `$placeholders` appearing in plain text, first-seen order.
pub fn placeholders(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for span in spans(input).iter().filter(|s| s.is_plain()) {
        let mut rest = span.text;
        while let Some(pos) = rest.find('$') {
            let after = &rest[pos + 1..];
            let len = after
                .char_indices()
                .take_while(|(i, c)| {
                    *c == '_' || c.is_ascii_alphanumeric() && (*i > 0 || !c.is_ascii_digit())
                })
                .count();
            if len > 0 {
                let name = &after[..len];
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            rest = &after[len..];
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_split_on_quotes() {
        let s = spans("MATCH (n {name: 'a;b'}) RETURN n");
        assert_eq!(s.len(), 3);
        assert_eq!(s[1].text, "'a;b'");
        assert_eq!(s[1].kind, SpanKind::Quoted);
        assert!(s[0].is_plain() && s[2].is_plain());
        assert_eq!(s[2].start, 21);
    }

    #[test]
    fn test_escapes_and_doubled_quotes() {
        let s = spans(r#"RETURN "say \"hi\"; ok", 'it''s'"#);
        let quoted: Vec<&str> = s.iter().filter(|s| s.kind == SpanKind::Quoted).map(|s| s.text).collect();
        assert_eq!(quoted, vec![r#""say \"hi\"; ok""#, "'it''s'"]);
    }

    #[test]
    fn test_backticks_are_quotes() {
        assert_eq!(first_terminator("MATCH (n) RETURN n.`a;b` LIMIT 1"), None);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(has_unterminated_span("MATCH (n {name: 'oops}) RETURN n"));
        assert!(!has_unterminated_span("MATCH (n {name: 'ok'}) RETURN n"));
    }

    #[test]
    fn test_neutralize_blanks_literals() {
        assert_eq!(neutralize("RETURN 'a;b', x"), "RETURN '   ', x");
        assert_eq!(
            neutralize("RETURN 'LIMIT 5'"),
            format!("RETURN '{}'", " ".repeat(7))
        );
    }

    #[test]
    fn test_first_statement() {
        assert_eq!(
            first_statement("MATCH (n {name: 'x;y'}) RETURN n LIMIT 1; MATCH (m) RETURN m"),
            "MATCH (n {name: 'x;y'}) RETURN n LIMIT 1"
        );
        assert_eq!(first_statement("RETURN 1"), "RETURN 1");
    }

    #[test]
    fn test_multiple_statements() {
        assert!(!has_multiple_statements("MATCH (n {name: 'a;b'}) RETURN n"));
        assert!(!has_multiple_statements("MATCH (n) RETURN n LIMIT 1;  "));
        assert!(has_multiple_statements("MATCH (n) RETURN n; MATCH (m) RETURN m"));
    }

    #[test]
    fn test_placeholders_skip_quoted_text() {
        let names = placeholders("MATCH (n {name: $name}) WHERE n.note = '$fake' AND n.age > $min_age RETURN n, $name");
        assert_eq!(names, vec!["name".to_string(), "min_age".to_string()]);
    }

    #[test]
    fn test_placeholder_must_start_with_letter() {
        assert!(placeholders("RETURN $1").is_empty());
        assert_eq!(placeholders("RETURN $_x1"), vec!["_x1".to_string()]);
    }

    #[test]
    fn test_comment_spans() {
        let s = spans("MATCH (n) // all nodes; really\nRETURN n /* LIMIT 5 */ LIMIT 1");
        let comments: Vec<&str> = s
            .iter()
            .filter(|s| s.kind == SpanKind::Comment)
            .map(|s| s.text)
            .collect();
        assert_eq!(comments, vec!["// all nodes; really", "/* LIMIT 5 */"]);
        assert_eq!(first_terminator("MATCH (n) // a;b\nRETURN n"), None);
    }

    #[test]
    fn test_comment_markers_inside_literals() {
        let s = spans("MATCH (n {url: 'http://x'}) RETURN n");
        assert!(s.iter().all(|s| s.kind != SpanKind::Comment));
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(has_unterminated_span("MATCH (n) RETURN n /* LIMIT 1"));
        assert!(!has_unterminated_span("MATCH (n) RETURN n // trailing"));
    }

    #[test]
    fn test_neutralize_and_strip_comments() {
        assert_eq!(neutralize("RETURN n // LIMIT 10"), format!("RETURN n {}", " ".repeat(11)));
        assert_eq!(strip_comments("RETURN n /* x */ LIMIT 1 // y"), "RETURN n   LIMIT 1  ");
        assert!(placeholders("RETURN n // $hidden").is_empty());
    }
}
