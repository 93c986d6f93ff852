use std::sync::LazyLock;

use regex::Regex;

use crate::block_parser::{BLANK_LINE_RE, BlockParser};
use crate::error::Error;
use crate::helpers::{HTML_ATTRIBUTES, HTML_TAGNAME};
use crate::node::Node;
use crate::registry::Matched;
use crate::state::BlockState;

/// Tag names whose open or close tag starts an HTML block on its own.
pub(super) const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section", "source",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

/// Tags whose content runs verbatim until the matching close tag.
pub(super) const PRE_TAGS: &[&str] = &["pre", "script", "style", "textarea"];

/// Rest of a complete open tag: attributes, then `>` and only whitespace.
static OPEN_TAG_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\A{HTML_ATTRIBUTES}[ \t]*/?>[ \t]*(?:\n|\z)")).unwrap()
});

/// Rest of a complete close tag.
static CLOSE_TAG_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t]*>[ \t]*(?:\n|\z)").unwrap());

/// Trigger for HTML blocks opened by a known block-level tag. Break rules
/// of other containers reference this narrower trigger by name.
pub(super) fn block_html_pattern() -> String {
    let mut tags: Vec<&str> = Vec::with_capacity(BLOCK_TAGS.len() + PRE_TAGS.len());
    tags.extend_from_slice(BLOCK_TAGS);
    tags.extend_from_slice(PRE_TAGS);
    format!(r" {{0,3}}</?(?:{})(?:[ \t/>]|$)", tags.join("|"))
}

/// Trigger for every remaining HTML block form: arbitrary tags, comments,
/// processing instructions, declarations, and CDATA sections.
pub(super) fn raw_html_pattern() -> String {
    format!(r" {{0,3}}(?:</?{HTML_TAGNAME}|<!--|<\?|<!)")
}

enum HtmlKind {
    /// Runs until an end marker; the search starts past the opening.
    ToEnd(&'static str, usize),
    /// Runs until the close tag of a verbatim element.
    ToCloseTag(String, usize),
    /// Runs until the next blank line.
    ToBlankLine,
    /// Needs the complete-tag check before it can start a block.
    CompleteTag { tag_end: usize, open: bool },
}

/// HTML block openers, classified from the line at the cursor rather than
/// from the trigger's extent, so both triggers share this handler.
pub(super) fn parse_raw_html(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let kind = {
        let src = state.src();
        let lt = m.start() + src[m.start()..].bytes().take_while(|&b| b == b' ').count();
        classify(src, lt)
    };
    match kind {
        HtmlKind::ToEnd(marker, from) => Ok(Some(html_to_end(state, marker, from))),
        HtmlKind::ToCloseTag(name, from) => {
            let end_tag = format!("</{name}>");
            Ok(Some(html_to_end(state, &end_tag, from)))
        }
        HtmlKind::ToBlankLine => Ok(Some(html_to_newline(state))),
        HtmlKind::CompleteTag { tag_end, open } => {
            // An unrecognized tag opens a block only as a complete tag on
            // its own line, and never interrupts a paragraph.
            if let Some(end) = state.append_paragraph() {
                return Ok(Some(end));
            }
            let complete = {
                let tail = &state.src()[tag_end..];
                if open {
                    OPEN_TAG_END.is_match(tail)
                } else {
                    CLOSE_TAG_END.is_match(tail)
                }
            };
            if complete {
                Ok(Some(html_to_newline(state)))
            } else {
                Ok(None)
            }
        }
    }
}

fn classify(src: &str, lt: usize) -> HtmlKind {
    let rest = &src[lt..];
    if rest.starts_with("<!--") {
        return HtmlKind::ToEnd("-->", lt + 4);
    }
    if rest.starts_with("<?") {
        return HtmlKind::ToEnd("?>", lt + 2);
    }
    if rest.starts_with("<![") {
        return HtmlKind::ToEnd("]]>", lt + 3);
    }
    if rest.starts_with("<!") {
        return HtmlKind::ToEnd(">", lt + 2);
    }
    let close = rest.as_bytes().get(1) == Some(&b'/');
    let name_start = lt + if close { 2 } else { 1 };
    let name_len = src[name_start..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
        .count();
    let name = src[name_start..name_start + name_len].to_ascii_lowercase();
    let tag_end = name_start + name_len;
    if close {
        if BLOCK_TAGS.contains(&name.as_str()) || PRE_TAGS.contains(&name.as_str()) {
            HtmlKind::ToBlankLine
        } else {
            HtmlKind::CompleteTag { tag_end, open: false }
        }
    } else if PRE_TAGS.contains(&name.as_str()) {
        HtmlKind::ToCloseTag(name, tag_end)
    } else if BLOCK_TAGS.contains(&name.as_str()) {
        HtmlKind::ToBlankLine
    } else {
        HtmlKind::CompleteTag { tag_end, open: true }
    }
}

/// Consumes through the line that carries `end_marker`, or to the end of
/// the frame when the marker never appears.
fn html_to_end(state: &mut BlockState, end_marker: &str, from: usize) -> usize {
    let (text, end_pos) = {
        let src = state.src();
        match src[from..].find(end_marker) {
            Some(i) => {
                let marker_end = from + i + end_marker.len();
                let line_end = match src[marker_end..].find('\n') {
                    Some(j) => marker_end + j + 1,
                    None => src.len(),
                };
                (src[state.cursor()..line_end].to_string(), line_end)
            }
            None => (src[state.cursor()..].to_string(), state.cursor_max()),
        }
    };
    state.append_token(Node::raw("block_html", text));
    end_pos
}

/// Consumes up to the next blank line, leaving the blank line itself for
/// its own rule.
fn html_to_newline(state: &mut BlockState) -> usize {
    let (text, end_pos) = {
        let src = state.src();
        match BLANK_LINE_RE.find_at(src, state.cursor()) {
            Some(b) => (src[state.cursor()..b.start()].to_string(), b.start()),
            None => (src[state.cursor()..].to_string(), state.cursor_max()),
        }
    };
    state.append_token(Node::raw("block_html", text));
    end_pos
}
