//! Paired-marker formatting spans: strikethrough, mark, insert,
//! superscript, and subscript.

use crate::error::Error;
use crate::inline_parser::InlineParser;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::InlineState;

/// `~~text~~` renders as `<del>`.
pub fn strikethrough(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "strikethrough",
            r"~~[^\s~]",
            Box::new(|parser, m, state| parse_wrapped(parser, m, state, "strikethrough", "~~")),
            Position::before("link"),
        )
        .expect("default rule `link` is registered");
    md.renderer_mut()
        .register("strikethrough", wrap_render_fn("del"));
}

/// `==text==` renders as `<mark>`.
pub fn mark(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "mark",
            r"==[^\s=]",
            Box::new(|parser, m, state| parse_wrapped(parser, m, state, "mark", "==")),
            Position::before("link"),
        )
        .expect("default rule `link` is registered");
    md.renderer_mut().register("mark", wrap_render_fn("mark"));
}

/// `^^text^^` renders as `<ins>`.
pub fn insert(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "insert",
            r"\^\^[^\s^]",
            Box::new(|parser, m, state| parse_wrapped(parser, m, state, "insert", "^^")),
            Position::before("link"),
        )
        .expect("default rule `link` is registered");
    md.renderer_mut().register("insert", wrap_render_fn("ins"));
}

/// `^text^` renders as `<sup>`. A space inside must be escaped as `\ `.
pub fn superscript(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "superscript",
            r"\^(?:[^\s^]|\\ )+?\^",
            Box::new(|parser, m, state| parse_script(parser, m, state, "superscript")),
            Position::before("linebreak"),
        )
        .expect("default rule `linebreak` is registered");
    md.renderer_mut()
        .register("superscript", wrap_render_fn("sup"));
}

/// `~text~` renders as `<sub>`. Registered after strikethrough when both
/// are in use, so `~~` keeps meaning strikethrough.
pub fn subscript(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "subscript",
            r"~(?:[^\s~]|\\ )+?~",
            Box::new(|parser, m, state| parse_script(parser, m, state, "subscript")),
            Position::before("linebreak"),
        )
        .expect("default rule `linebreak` is registered");
    md.renderer_mut().register("subscript", wrap_render_fn("sub"));
}

/// The trigger covers the marker plus the first content character, which
/// keeps a marker followed by whitespace from matching at all.
fn parse_wrapped(
    parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
    kind: &str,
    marker: &str,
) -> Result<Option<usize>, Error> {
    let content_start = m.start() + marker.len();
    let closed = {
        let src = state.src();
        find_marker_end(src, m.end(), marker)
    };
    let Some((text_end, end_pos)) = closed else {
        return Ok(None);
    };
    let text = state.src()[content_start..text_end].to_string();
    let children = parser.parse_tokens(text, state)?;
    state.append_token(Node::container(kind, children));
    Ok(Some(end_pos))
}

fn parse_script(
    parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
    kind: &str,
) -> Result<Option<usize>, Error> {
    let text = {
        let src = state.src();
        src[m.start() + 1..m.end() - 1].replace("\\ ", " ")
    };
    let children = parser.parse_tokens(text, state)?;
    state.append_token(Node::container(kind, children));
    Ok(Some(m.end()))
}

/// The closing marker must follow a non-whitespace character.
fn find_marker_end(src: &str, from: usize, marker: &str) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(i) = src[search..].find(marker) {
        let at = search + i;
        let prev_ws = src[..at].chars().next_back().is_none_or(char::is_whitespace);
        if !prev_ws {
            return Some((at, at + marker.len()));
        }
        search = at + marker.len();
    }
    None
}

fn wrap_render_fn(tag: &'static str) -> crate::renderer::RenderFn {
    Box::new(move |_, _, body| {
        format!("<{tag}>{}</{tag}>", body.unwrap_or_default())
    })
}

#[cfg(test)]
mod tests {
    use crate::markdown::Markdown;

    #[test]
    fn test_strikethrough() {
        let md = Markdown::builder().plugin(super::strikethrough).build();
        assert_eq!(
            md.render("a ~~b~~ c").unwrap(),
            "<p>a <del>b</del> c</p>\n"
        );
    }

    #[test]
    fn test_strikethrough_needs_content_after_marker() {
        let md = Markdown::builder().plugin(super::strikethrough).build();
        assert_eq!(md.render("a ~~ b").unwrap(), "<p>a ~~ b</p>\n");
    }

    #[test]
    fn test_unclosed_strikethrough_is_literal() {
        let md = Markdown::builder().plugin(super::strikethrough).build();
        assert_eq!(md.render("a ~~b c").unwrap(), "<p>a ~~b c</p>\n");
    }

    #[test]
    fn test_mark_and_insert() {
        let md = Markdown::builder()
            .plugin(super::mark)
            .plugin(super::insert)
            .build();
        assert_eq!(
            md.render("==hi== and ^^new^^").unwrap(),
            "<p><mark>hi</mark> and <ins>new</ins></p>\n"
        );
    }

    #[test]
    fn test_superscript_with_escaped_space() {
        let md = Markdown::builder().plugin(super::superscript).build();
        assert_eq!(md.render("x^a\\ b^").unwrap(), "<p>x<sup>a b</sup></p>\n");
    }

    #[test]
    fn test_insert_coexists_with_superscript() {
        let md = Markdown::builder()
            .plugin(super::insert)
            .plugin(super::superscript)
            .build();
        assert_eq!(
            md.render("^^new^^ and x^2^").unwrap(),
            "<p><ins>new</ins> and x<sup>2</sup></p>\n"
        );
    }

    #[test]
    fn test_subscript_coexists_with_strikethrough() {
        let md = Markdown::builder()
            .plugin(super::strikethrough)
            .plugin(super::subscript)
            .build();
        assert_eq!(
            md.render("~~del~~ and H~2~O").unwrap(),
            "<p><del>del</del> and H<sub>2</sub>O</p>\n"
        );
    }

    #[test]
    fn test_nested_emphasis_inside_strikethrough() {
        let md = Markdown::builder().plugin(super::strikethrough).build();
        assert_eq!(
            md.render("~~a *b*~~").unwrap(),
            "<p><del>a <em>b</em></del></p>\n"
        );
    }
}
