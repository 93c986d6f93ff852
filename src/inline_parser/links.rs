use crate::error::Error;
use crate::helpers::{parse_link_label, parse_link_target, parse_link_text};
use crate::node::Node;
use crate::registry::Matched;
use crate::state::InlineState;
use crate::util::{escape_url, unikey};

use super::{InlineParser, precedence_scan};

const PREC_RULES: &[&str] = &["codespan", "auto_link", "inline_html"];

/// A `[` or `![` opening a link or image. Covers the inline form
/// `[text](url "title")` and the reference forms `[text][label]`,
/// `[label][]` and `[label]`. A reference without a definition declines,
/// leaving the bracket as literal text.
pub(super) fn parse_link(
    parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let pos = m.end();
    let is_image = state.src()[m.range()].starts_with('!');
    // Link text may not contain another link, image text may not contain
    // another image. The marker decays to text.
    if (is_image && state.in_image) || (!is_image && state.in_link) {
        let marker = state.src()[m.range()].to_string();
        state.append_text(&marker);
        return Ok(Some(pos));
    }

    let (text, mut label, mut end_pos) = {
        let src = state.src();
        if let Some((label, end)) = parse_link_label(src, pos) {
            (label.to_string(), Some(label.to_string()), end)
        } else if let Some((text, end)) = parse_link_text(src, pos) {
            (text.to_string(), None, end)
        } else {
            return Ok(None);
        }
    };
    if end_pos >= state.src().len() && label.is_none() {
        return Ok(None);
    }
    if let Some(prec) = precedence_scan(parser, m, state, end_pos, PREC_RULES)? {
        return Ok(Some(prec));
    }

    let target = {
        let src = state.src();
        if end_pos < src.len() && src.as_bytes()[end_pos] == b'(' {
            parse_link_target(src, end_pos + 1)
        } else {
            None
        }
    };
    if let Some((url, title, after)) = target {
        let token = link_token(parser, state, is_image, &text, url, title)?;
        state.append_token(token);
        return Ok(Some(after));
    }

    let reference = {
        let src = state.src();
        if end_pos < src.len() && src.as_bytes()[end_pos] == b'[' {
            parse_link_label(src, end_pos + 1).map(|(label, end)| (label.to_string(), end))
        } else {
            None
        }
    };
    if let Some((second, end)) = reference {
        end_pos = end;
        if !second.is_empty() {
            label = Some(second);
        }
    }
    let Some(label) = label else {
        return Ok(None);
    };

    let key = unikey(&label);
    let Some(def) = state.env.ref_link(&key) else {
        return Ok(None);
    };
    let (url, title) = (def.url.clone(), def.title.clone());
    let token = link_token(parser, state, is_image, &text, url, title)?.with_attr("label", key);
    state.append_token(token);
    Ok(Some(end_pos))
}

/// Parses the bracketed text in a nested frame and wraps it in a link or
/// image node carrying `url` and an optional `title`.
fn link_token(
    parser: &InlineParser,
    state: &mut InlineState,
    is_image: bool,
    text: &str,
    url: String,
    title: Option<String>,
) -> Result<Node, Error> {
    let saved_link = state.in_link;
    let saved_image = state.in_image;
    if is_image {
        state.in_image = true;
    } else {
        state.in_link = true;
    }
    state.push_frame(text.to_string(), parser.max_nested_level())?;
    let result = parser.parse(state);
    let children = state.pop_frame();
    state.in_link = saved_link;
    state.in_image = saved_image;
    result?;

    let kind = if is_image { "image" } else { "link" };
    let mut token = Node::container(kind, children).with_attr("url", url);
    if let Some(title) = title {
        token = token.with_attr("title", title);
    }
    Ok(token)
}

/// An absolute URI in angle brackets, like `<https://example.com>`.
pub(super) fn parse_auto_link(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    if state.in_link {
        let whole = state.src()[m.range()].to_string();
        state.append_text(&whole);
        return Ok(Some(m.end()));
    }
    let (url, text) = {
        let src = state.src();
        let inner = &src[m.start() + 1..m.end() - 1];
        (escape_url(inner), inner.to_string())
    };
    let token = Node::container("link", vec![Node::raw("text", text)]).with_attr("url", url);
    state.append_token(token);
    Ok(Some(m.end()))
}

/// An email address in angle brackets; the link target gets a `mailto:`
/// scheme prepended.
pub(super) fn parse_auto_email(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    if state.in_link {
        let whole = state.src()[m.range()].to_string();
        state.append_text(&whole);
        return Ok(Some(m.end()));
    }
    let (url, text) = {
        let src = state.src();
        let inner = &src[m.start() + 1..m.end() - 1];
        (escape_url(&format!("mailto:{inner}")), inner.to_string())
    };
    let token = Node::container("link", vec![Node::raw("text", text)]).with_attr("url", url);
    state.append_token(token);
    Ok(Some(m.end()))
}
