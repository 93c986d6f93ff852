use std::sync::LazyLock;

use regex::Regex;

use crate::block_parser::{BLANK_LINE_RE, BlockParser};
use crate::error::Error;
use crate::helpers::{parse_link_href, parse_link_title};
use crate::registry::Matched;
use crate::state::{BlockState, LinkDef};
use crate::util::{escape_url, safe_entity, unescape_char, unikey};

static BLANK_TO_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A[ \t]*\n").unwrap());

/// Link reference definition: `[label]: destination "title"`.
///
/// Definitions produce no node; they only record the destination in the
/// environment so inline resolution can look the label up later, even
/// when the reference precedes the definition. The first definition of a
/// label wins. A line that does not complete as a definition is left to
/// the paragraph fallback.
pub(super) fn parse_ref_link(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    // A definition cannot interrupt a paragraph.
    if let Some(end) = state.append_paragraph() {
        return Ok(Some(end));
    }
    let collected = {
        let src = state.src();
        let label = &src[m.group(1).expect("definition trigger captures the label")];
        let key = unikey(label);
        if key.is_empty() {
            None
        } else {
            scan_definition(src, m.end(), state.cursor_max())
                .map(|(url, title, end)| (key, label.to_string(), url, title, end))
        }
    };
    let Some((key, label, url, title, end_pos)) = collected else {
        return Ok(None);
    };
    state.env.add_ref_link(key, LinkDef { url, title, label });
    Ok(Some(end_pos))
}

/// Scans destination and optional title after the `[label]:` head.
/// Returns the encoded URL, escaped title, and the position after the
/// definition's last line.
fn scan_definition(
    src: &str,
    pos: usize,
    cursor_max: usize,
) -> Option<(String, Option<String>, usize)> {
    let (href, href_pos) = parse_link_href(src, pos, true)?;
    // A title may continue over lines, but never across a blank one.
    let max_pos = BLANK_LINE_RE
        .find_at(src, href_pos)
        .map_or(cursor_max, |b| b.start());
    let mut title = parse_link_title(src, href_pos, max_pos);
    let mut end_pos = None;
    if let Some((_, title_pos)) = &title {
        match to_line_end(src, *title_pos) {
            Some(end) => end_pos = Some(end),
            // Trailing garbage after the title: drop the title and try
            // to close the definition right after the destination.
            None => title = None,
        }
    }
    let end_pos = match end_pos {
        Some(end) => end,
        None => to_line_end(src, href_pos)?,
    };
    let url = escape_url(&unescape_char(href));
    let title = title.map(|(t, _)| safe_entity(&t));
    Some((url, title, end_pos))
}

/// Position past the newline when only whitespace remains on the line.
fn to_line_end(src: &str, pos: usize) -> Option<usize> {
    BLANK_TO_LINE.find(&src[pos..]).map(|m| pos + m.end())
}
