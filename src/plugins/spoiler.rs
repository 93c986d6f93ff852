//! Spoilers: `>!` marked blocks and `>!text!<` inline spans.

use std::sync::LazyLock;

use regex::Regex;

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::inline_parser::InlineParser;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::{BlockState, InlineState};

static SPOILER_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(?: {0,3}>![^\n]*(?:\n|\z))+").unwrap());

static SPOILER_TRIM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ {0,3}>! ?").unwrap());

pub fn spoiler(md: &mut Markdown) {
    md.block_parser_mut()
        .register(
            "block_spoiler",
            r" {0,3}>![^\n]*(?:\n|$)",
            Box::new(parse_block_spoiler),
            Position::before("block_quote"),
        )
        .expect("default rule `block_quote` is registered");
    md.inline_parser_mut()
        .register(
            "inline_spoiler",
            r">![ \t]*([^\n]+?)[ \t]*!<",
            Box::new(parse_inline_spoiler),
            Position::Append,
        )
        .expect("the rule name `inline_spoiler` is free");

    let renderer = md.renderer_mut();
    renderer.register(
        "block_spoiler",
        Box::new(|_, _, body| format!("<div class=\"spoiler\">\n{}</div>\n", body.unwrap_or_default())),
    );
    renderer.register(
        "inline_spoiler",
        Box::new(|_, _, body| format!("<span class=\"spoiler\">{}</span>", body.unwrap_or_default())),
    );
}

/// A run of `>!` lines, parsed like a block quote with a different
/// marker.
fn parse_block_spoiler(
    parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let (inner, end) = {
        let src = state.src();
        let rest = &src[m.start()..];
        let run = SPOILER_LINES.find(rest).map_or(0, |f| f.end());
        let inner = SPOILER_TRIM.replace_all(&rest[..run], "").into_owned();
        (inner, m.start() + run)
    };
    let children = parser.parse_tokens(inner, state)?;
    state.append_token(Node::container("block_spoiler", children));
    Ok(Some(end))
}

fn parse_inline_spoiler(
    parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let text = m
        .group(1)
        .map_or(String::new(), |r| state.src()[r].to_string());
    let children = parser.parse_tokens(text, state)?;
    state.append_token(Node::container("inline_spoiler", children));
    Ok(Some(m.end()))
}
