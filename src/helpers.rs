//! Scanning helpers for link labels, destinations, and titles.
//!
//! These are plain cursor-based scanners rather than trigger patterns: link
//! grammar needs bracket counting and escape awareness that a single regular
//! expression cannot express. Both the block pass (reference definitions)
//! and the inline pass (links and images) build on them.

use crate::util::{escape_url, safe_entity, unescape_char};

/// Pattern fragment for a reference label body, reused by every rule that
/// matches `[label]` syntax. At most 500 units, no bare brackets.
pub const LINK_LABEL: &str = r"(?:[^\\\[\]]|\\.){0,500}";

/// Pattern fragment for an HTML tag name.
pub const HTML_TAGNAME: &str = "[A-Za-z][A-Za-z0-9-]*";

/// Pattern fragment for zero or more HTML attributes, including values.
pub const HTML_ATTRIBUTES: &str =
    r#"(?:\s+[A-Za-z_:][A-Za-z0-9_.:-]*(?:\s*=\s*(?:[^ !"'=<>`]+|'[^']*'|"[^"]*"))?)*"#;

/// Scans the text of a link or image, starting just past the opening `[`.
///
/// Unlike a reference label, link text may contain balanced bracket pairs.
/// Returns the text and the position just past the closing `]`.
pub fn parse_link_text(src: &str, pos: usize) -> Option<(&str, usize)> {
    let bytes = src.as_bytes();
    let mut level = 1u32;
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && bytes[i + 1].is_ascii_punctuation() => i += 2,
            b'[' => {
                level += 1;
                i += 1;
            }
            b']' => {
                level -= 1;
                if level == 0 {
                    return Some((&src[pos..i], i + 1));
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Scans a reference label, starting just past the opening `[`.
///
/// Labels are flat: a bare `[` ends the scan with no match, and labels
/// longer than 500 units are rejected. Returns the label and the position
/// just past the closing `]`.
pub fn parse_link_label(src: &str, pos: usize) -> Option<(&str, usize)> {
    let bytes = src.as_bytes();
    let mut i = pos;
    let mut units = 0;
    while i < bytes.len() && units <= 500 {
        match bytes[i] {
            b']' => return Some((&src[pos..i], i + 1)),
            b'[' => return None,
            b'\\' if i + 1 < bytes.len() => {
                i += 2;
                units += 1;
            }
            _ => {
                i += src[i..].chars().next()?.len_utf8();
                units += 1;
            }
        }
    }
    None
}

/// Scans a link destination.
///
/// Either an angle-bracketed destination, which may contain spaces but no
/// newlines, or a bare destination ending at whitespace or an unbalanced
/// closing parenthesis. In block position at most one leading newline is
/// allowed, so a definition's destination may sit on the line after its
/// label. Returns the raw destination, still escaped, and the position
/// after it.
pub fn parse_link_href(src: &str, pos: usize, block: bool) -> Option<(&str, usize)> {
    let bytes = src.as_bytes();
    let mut i = pos;
    let mut newlines = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'\n' if block => {
                newlines += 1;
                if newlines > 1 {
                    return None;
                }
                i += 1;
            }
            _ => break,
        }
    }
    if i >= bytes.len() {
        return None;
    }
    if bytes[i] == b'<' {
        let start = i + 1;
        let mut j = start;
        while j < bytes.len() {
            match bytes[j] {
                b'\n' | b'<' => return None,
                b'>' => return Some((&src[start..j], j + 1)),
                b'\\' if j + 1 < bytes.len() => j += 2,
                _ => j += 1,
            }
        }
        return None;
    }
    let start = i;
    let mut depth = 0u32;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | 0x0b | 0x0c => break,
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                i += 1;
            }
            b'\\' if i + 1 < bytes.len() && bytes[i + 1].is_ascii_punctuation() => i += 2,
            _ => i += 1,
        }
    }
    if depth > 0 {
        return None;
    }
    Some((&src[start..i], i))
}

/// Scans a link title between `pos` and `max_pos`.
///
/// A title needs at least one whitespace character before it and is
/// delimited by double quotes, single quotes, or parentheses. Escape pairs
/// are resolved in the returned title.
pub fn parse_link_title(src: &str, pos: usize, max_pos: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut i = pos;
    let mut saw_whitespace = false;
    while i < max_pos {
        match bytes[i] {
            b' ' | b'\t' | b'\n' => {
                saw_whitespace = true;
                i += 1;
            }
            _ => break,
        }
    }
    if !saw_whitespace || i >= max_pos {
        return None;
    }
    let open = bytes[i];
    let close = match open {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let start = i + 1;
    let mut j = start;
    while j < max_pos {
        let b = bytes[j];
        if b == b'\\' && j + 1 < max_pos {
            j += 2;
            continue;
        }
        if b == close {
            return Some((unescape_char(&src[start..j]), j + 1));
        }
        if open == b'(' && b == b'(' {
            return None;
        }
        j += 1;
    }
    None
}

/// Scans the `(destination "title")` tail of an inline link, starting just
/// past the opening parenthesis. Returns the encoded URL, the
/// entity-escaped title if present, and the position after the closing
/// parenthesis.
pub fn parse_link_target(src: &str, pos: usize) -> Option<(String, Option<String>, usize)> {
    let (href, href_pos) = parse_link_href(src, pos, false)?;
    let title = parse_link_title(src, href_pos, src.len());
    let mut i = match &title {
        Some((_, title_pos)) => *title_pos,
        None => href_pos,
    };
    let bytes = src.as_bytes();
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n') {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b')' {
        return None;
    }
    let url = escape_url(&unescape_char(href));
    let title = title.map(|(t, _)| safe_entity(&t));
    Some((url, title, i + 1))
}
