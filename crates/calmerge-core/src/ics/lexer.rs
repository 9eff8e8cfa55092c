//! Content line handling (RFC 5545 §3.1).
//!
//! Unfolds continuation lines and splits a logical line into name,
//! parameters and raw value.

use std::collections::BTreeMap;

use super::component::Property;

/// Joins folded continuation lines into logical lines.
///
/// `\r\n` is normalized to `\n` first. A physical line starting with a single
/// SPACE or HTAB continues the previous logical line: the marker character is
/// dropped and the rest appended verbatim. Empty physical lines are dropped.
pub fn unfold_lines(input: &str) -> Vec<String> {
    let normalized = input.replace("\r\n", "\n");
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for raw in normalized.split('\n') {
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            match current.as_mut() {
                Some(line) => line.push_str(rest),
                // Continuation with nothing to continue starts a new line.
                None => current = Some(rest.to_string()),
            }
            continue;
        }

        if let Some(done) = current.take() {
            lines.push(done);
        }
        if !raw.is_empty() {
            current = Some(raw.to_string());
        }
    }

    if let Some(done) = current {
        lines.push(done);
    }

    lines
}

/// Splits `s` on `sep`, ignoring separators inside double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Finds the byte index of the first `:` that is neither quoted nor escaped.
fn find_value_separator(line: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parses one logical line into a [`Property`].
///
/// Returns `None` when the line has no value separator or an empty name.
/// Parameter segments without `=` are dropped.
pub fn parse_property(line: &str) -> Option<Property> {
    let colon = find_value_separator(line)?;
    let (head, value) = (&line[..colon], &line[colon + 1..]);

    let mut segments = split_unquoted(head, ';').into_iter();
    let name = segments.next()?.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }

    let mut params = BTreeMap::new();
    for segment in segments {
        let Some((key, val)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        if key.is_empty() {
            continue;
        }
        let val = val
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(val);
        params.insert(key, val.to_string());
    }

    Some(Property {
        name,
        value: value.to_string(),
        params,
    })
}

/// Unescapes a TEXT value (RFC 5545 §3.3.11).
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
