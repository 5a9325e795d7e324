//! Source normalizer feeding the code fingerprint. The goal is that purely
//! cosmetic edits — comments, trailing whitespace, blank lines, extra
//! spaces between tokens — leave the fingerprint unchanged, while any edit
//! to the logic itself changes it.

/// Normalizes one blob of source text.
///
/// The rule, precisely: a single quote-aware pass removes `#` and `//` line
/// comments and `/* ... */` block comments. Single- and double-quoted
/// string literals are honoured, including backslash escapes, so
/// comment-like text inside a literal survives. A block comment is replaced
/// by one space to avoid joining the surrounding tokens. Afterwards every
/// line is right-trimmed, interior runs of spaces and tabs collapse to a
/// single space (leading indentation is preserved), and lines left empty
/// are dropped.
pub fn strip_source(source: &str) -> String {
    let decommented = remove_comments(source);
    let mut out = String::with_capacity(decommented.len());
    for line in decommented.lines() {
        let collapsed = collapse_interior_whitespace(line);
        let trimmed = collapsed.trim_end();
        if trimmed.trim_start().is_empty() {
            continue;
        }
        out.push_str(trimmed);
        out.push('\n');
    }
    out
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Code,
    Str(char),
    LineComment,
    BlockComment,
}

fn remove_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Code => match ch {
                '#' => state = State::LineComment,
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                '\'' | '"' => {
                    state = State::Str(ch);
                    out.push(ch);
                }
                _ => out.push(ch),
            },
            State::Str(quote) => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if ch == quote {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if ch == '\n' {
                    out.push('\n');
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push(' ');
                    state = State::Code;
                }
            }
        }
    }
    out
}

fn collapse_interior_whitespace(line: &str) -> String {
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    let (indent, rest) = line.split_at(indent_len);
    let mut collapsed = String::with_capacity(line.len());
    collapsed.push_str(indent);
    let mut in_gap = false;
    for ch in rest.chars() {
        if ch == ' ' || ch == '\t' {
            if !in_gap {
                collapsed.push(' ');
                in_gap = true;
            }
        } else {
            collapsed.push(ch);
            in_gap = false;
        }
    }
    collapsed
}
