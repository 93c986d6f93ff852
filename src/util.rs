//! Text utilities shared by the parsers and renderers.
//!
//! Escaping here follows the reference behavior for Markdown-to-HTML
//! conversion: entity references in source text are decoded once before
//! re-encoding, so `&amp;` does not double-escape into `&amp;amp;`, and
//! URLs are percent-encoded with the RFC 3986 delimiters left intact.

/// Escapes `&`, `<`, `>`, and `"` as HTML entities.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes text while keeping entity references that are already present.
///
/// `&copy;` stays `&copy;` but a bare `&` still becomes `&amp;`.
pub fn safe_entity(text: &str) -> String {
    escape(&unescape(text))
}

/// Decodes entity references.
///
/// Numeric references are decoded fully. Named references are resolved
/// against a table of the entities that commonly appear in prose; unknown
/// names are left untouched. A reference without a trailing semicolon is
/// not a reference at all.
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'&' {
            let c = text[i..].chars().next().unwrap_or('\u{FFFD}');
            out.push(c);
            i += c.len_utf8();
            continue;
        }
        match parse_charref(&text[i..]) {
            Some((decoded, len)) => {
                out.push_str(&decoded);
                i += len;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out
}

/// Parses one entity reference at the start of `text` (which begins with
/// `&`). Returns the decoded text and the byte length consumed.
fn parse_charref(text: &str) -> Option<(String, usize)> {
    let rest = &text[1..];
    if let Some(num) = rest.strip_prefix('#') {
        let (radix, digits) = match num.strip_prefix(['x', 'X']) {
            Some(hexdigits) => (16, hexdigits),
            None => (10, num),
        };
        let end = digits.find(';')?;
        let max_len = if radix == 16 { 6 } else { 7 };
        if end == 0 || end > max_len {
            return None;
        }
        if !digits[..end].bytes().all(|b| (b as char).is_digit(radix)) {
            return None;
        }
        let code = u32::from_str_radix(&digits[..end], radix).ok()?;
        let c = match char::from_u32(code) {
            Some('\0') | None => '\u{FFFD}',
            Some(c) => c,
        };
        let prefix = if radix == 16 { 3 } else { 2 };
        return Some((c.to_string(), prefix + end + 1));
    }
    let end = rest.find(';')?;
    if end == 0 || end > 32 {
        return None;
    }
    let name = &rest[..end];
    if name.bytes().any(|b| b"\t\n\x0c <&#;".contains(&b)) {
        return None;
    }
    let decoded = named_entity(name)?;
    Some((decoded.to_string(), end + 2))
}

fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" | "AMP" => "&",
        "lt" | "LT" => "<",
        "gt" | "GT" => ">",
        "quot" | "QUOT" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "deg" => "\u{b0}",
        "plusmn" => "\u{b1}",
        "middot" => "\u{b7}",
        "frac12" => "\u{bd}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "dagger" => "\u{2020}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "prime" => "\u{2032}",
        "trade" => "\u{2122}",
        "larr" => "\u{2190}",
        "rarr" => "\u{2192}",
        _ => return None,
    };
    Some(decoded)
}

/// Percent-encodes a link target, keeping RFC 3986 delimiters and bytes
/// that are already part of an encoded octet, then escapes the result for
/// use in an HTML attribute.
pub fn escape_url(link: &str) -> String {
    const SAFE: &[u8] = b":/?#@!$&()*+,;=%~";
    let decoded = unescape(link);
    let mut quoted = String::with_capacity(decoded.len());
    for &b in decoded.as_bytes() {
        if b.is_ascii_alphanumeric() || b"_.-~".contains(&b) || SAFE.contains(&b) {
            quoted.push(b as char);
        } else {
            quoted.push('%');
            quoted.push_str(&format!("{b:02X}"));
        }
    }
    escape(&quoted)
}

/// Removes the backslash from escaped ASCII punctuation.
pub fn unescape_char(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_punctuation() {
            out.push(bytes[i + 1] as char);
            i += 2;
        } else {
            let c = text[i..].chars().next().unwrap_or('\u{FFFD}');
            out.push(c);
            i += c.len_utf8();
        }
    }
    out
}

/// Normalizes a reference label into its lookup key: internal whitespace
/// collapses to single spaces and case differences are folded away.
pub fn unikey(label: &str) -> String {
    let key = label.split_whitespace().collect::<Vec<_>>().join(" ");
    key.to_lowercase().to_uppercase()
}

/// Expands a leading tab on each line into spaces, padding to `width`
/// columns. Up to three leading spaces may sit before the tab; only the
/// first tab of a line is expanded.
pub fn expand_leading_tab(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let spaces = line.bytes().take(3).take_while(|&b| b == b' ').count();
        if line.as_bytes().get(spaces) == Some(&b'\t') {
            out.push_str(&line[..spaces]);
            for _ in spaces..width {
                out.push(' ');
            }
            out.push_str(&line[spaces + 1..]);
        } else {
            out.push_str(line);
        }
    }
    out
}

/// [`expand_leading_tab`] with the standard tab stop of four columns.
pub fn expand_tab(text: &str) -> String {
    expand_leading_tab(text, 4)
}
