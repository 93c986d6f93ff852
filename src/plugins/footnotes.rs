//! Footnotes in the PHP Markdown Extra style: `[^key]` references, block
//! definitions, and a numbered section appended to the document.
//!
//! Reference indices are assigned in first-use order while inline text
//! resolves; the section itself is built afterwards by a resolver, so a
//! footnote whose text references another footnote still works.

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::helpers::LINK_LABEL;
use crate::inline_parser::InlineParser;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::{BlockState, InlineState, ParseEnv};
use crate::util::{expand_tab, unikey};

pub fn footnotes(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "footnote",
            &format!(r"\[\^({LINK_LABEL})\]"),
            Box::new(parse_footnote_ref),
            Position::before("link"),
        )
        .expect("default rule `link` is registered");
    md.block_parser_mut()
        .register(
            "ref_footnote",
            &format!(
                r" {{0,3}}\[\^({LINK_LABEL})\]:[ \t]([^\n]*(?:\n+|$)(?: {{1,3}}[^ \n][^\n]*\n+)*(?:\n*(?: {{4}}| *\t)[^\n]*)*)"
            ),
            Box::new(parse_ref_footnote),
            Position::before("ref_link"),
        )
        .expect("default rule `ref_link` is registered");
    md.add_resolver(Box::new(append_footnotes));

    let renderer = md.renderer_mut();
    renderer.register(
        "footnote_ref",
        Box::new(|_, node, _| {
            let index = node.attr_int("index").unwrap_or(0);
            format!(
                "<sup class=\"footnote-ref\" id=\"fnref-{index}\">\
                 <a href=\"#fn-{index}\">{index}</a></sup>"
            )
        }),
    );
    renderer.register(
        "footnotes",
        Box::new(|_, _, body| {
            format!(
                "<section class=\"footnotes\">\n<ol>\n{}</ol>\n</section>\n",
                body.unwrap_or_default()
            )
        }),
    );
    renderer.register(
        "footnote_item",
        Box::new(|_, node, body| {
            let index = node.attr_int("index").unwrap_or(0);
            let back = format!("<a href=\"#fnref-{index}\" class=\"footnote\">&#8617;</a>");
            let mut text = body.unwrap_or_default().trim_end().to_string();
            if let Some(stripped) = text.strip_suffix("</p>") {
                text = format!("{stripped}{back}</p>");
            } else {
                text.push_str(&back);
            }
            format!("<li id=\"fn-{index}\">{text}</li>\n")
        }),
    );
}

/// A `[^key]` reference. Only keys with a definition produce a node; an
/// unknown key falls through as literal text.
fn parse_footnote_ref(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let key = {
        let label = m.group(1).map_or("", |r| &state.src()[r]);
        unikey(label)
    };
    let Some(index) = state.env.claim_footnote_index(&key) else {
        return Ok(None);
    };
    state.append_token(Node::raw("footnote_ref", key).with_attr("index", index));
    Ok(Some(m.end()))
}

/// A `[^key]: text` definition, with lazily or four-space indented
/// continuation lines. Produces no token; the body goes into the
/// environment for the resolver.
fn parse_ref_footnote(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let (key, body) = {
        let src = state.src();
        let key = unikey(m.group(1).map_or("", |r| &src[r]));
        if key.is_empty() {
            return Ok(None);
        }
        (key, m.group(2).map_or("", |r| &src[r]).to_string())
    };
    state.env.add_footnote(key, body);
    Ok(Some(m.end()))
}

/// Builds the `footnotes` section from every referenced definition. Each
/// body is block-parsed with the shared environment, so definitions may
/// contain full markdown, including references to further footnotes.
fn append_footnotes(
    md: &Markdown,
    tokens: &mut Vec<Node>,
    env: &mut ParseEnv,
) -> Result<(), Error> {
    let mut items = Vec::new();
    let mut i = 0;
    // Resolving an item may claim new keys, so the list can grow while
    // this runs.
    while i < env.used_footnotes().len() {
        let key = env.used_footnotes()[i].clone();
        let index = i + 1;
        let Some(text) = env.footnote(&key) else {
            i += 1;
            continue;
        };
        let text = dedent(&expand_tab(text));

        let mut state = BlockState::new(text);
        std::mem::swap(&mut state.env, env);
        let parsed = md.block_parser().parse(&mut state);
        let (mut children, mut inner_env) = state.finish();
        std::mem::swap(&mut inner_env, env);
        parsed?;
        md.resolve_inline(&mut children, env)?;

        items.push(
            Node::container("footnote_item", children)
                .with_attr("key", key)
                .with_attr("index", index),
        );
        i += 1;
    }
    if !items.is_empty() {
        tokens.push(Node::container("footnotes", items));
    }
    Ok(())
}

/// Strips the continuation indentation from a definition body. The first
/// non-empty line after the head fixes the width.
fn dedent(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("");
    let rest: Vec<&str> = lines.collect();
    let width = rest
        .iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .unwrap_or(0);
    let mut out = String::from(first);
    for line in &rest {
        let strip = line.bytes().take(width).take_while(|&b| b == b' ').count();
        out.push('\n');
        out.push_str(&line[strip..]);
    }
    out
}
