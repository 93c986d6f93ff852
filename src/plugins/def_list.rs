//! Definition lists in the PHP Markdown Extra style: one or more term
//! lines followed by `: ` definition lines.

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::BlockState;

const DEF_LIST_TRIGGER: &str = r"(?:[^\n]+\n)+:[ \t][^\n]*(?:\n|$)";

pub fn def_list(md: &mut Markdown) {
    md.block_parser_mut()
        .register(
            "def_list",
            DEF_LIST_TRIGGER,
            Box::new(parse_def_list),
            Position::Append,
        )
        .expect("the rule name `def_list` is free");

    let renderer = md.renderer_mut();
    renderer.register(
        "def_list",
        Box::new(|_, _, body| format!("<dl>\n{}</dl>\n", body.unwrap_or_default())),
    );
    renderer.register(
        "def_list_head",
        Box::new(|_, _, body| format!("<dt>{}</dt>\n", body.unwrap_or_default())),
    );
    renderer.register(
        "def_list_item",
        Box::new(|_, _, body| format!("<dd>{}</dd>\n", body.unwrap_or_default())),
    );
}

fn parse_def_list(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    // A line that reads like a term can also be a lazy paragraph
    // continuation; the open paragraph takes it.
    if let Some(end) = state.append_paragraph() {
        return Ok(Some(end));
    }
    let built = {
        let src = state.src();
        build_def_list(&src[m.start()..])
    };
    match built {
        Some((token, consumed)) => {
            state.append_token(token);
            Ok(Some(m.start() + consumed))
        }
        None => Ok(None),
    }
}

/// Walks term and definition line groups until a blank line or a line
/// that fits neither. Returns the node and the consumed byte count.
fn build_def_list(src: &str) -> Option<(Node, usize)> {
    let mut children = Vec::new();
    let mut pos = 0;
    loop {
        let group_start = pos;
        let mut terms = Vec::new();
        while let Some((line, next)) = next_line(src, pos) {
            let body = line.trim_end();
            if body.is_empty() || body.starts_with(':') {
                break;
            }
            terms.push(body.trim_start().to_string());
            pos = next;
        }
        if terms.is_empty() {
            break;
        }
        let mut defs = Vec::new();
        while let Some((line, next)) = next_line(src, pos) {
            let body = line.trim_end();
            let Some(rest) = body.strip_prefix(':') else {
                break;
            };
            if !rest.starts_with([' ', '\t']) {
                break;
            }
            let mut text = rest.trim_start().to_string();
            pos = next;
            // Indented lines continue the definition.
            while let Some((cont, cont_next)) = next_line(src, pos) {
                let trimmed = cont.trim_end();
                if !(trimmed.starts_with("    ") || trimmed.starts_with('\t')) {
                    break;
                }
                text.push('\n');
                text.push_str(trimmed.trim_start());
                pos = cont_next;
            }
            defs.push(text);
        }
        if defs.is_empty() {
            pos = group_start;
            break;
        }
        for term in terms {
            children.push(Node::text("def_list_head", term));
        }
        for def in defs {
            children.push(Node::text("def_list_item", def));
        }
    }
    if children.is_empty() {
        return None;
    }
    Some((Node::container("def_list", children), pos))
}

fn next_line(src: &str, pos: usize) -> Option<(&str, usize)> {
    if pos >= src.len() {
        return None;
    }
    let end = src[pos..].find('\n').map_or(src.len(), |i| pos + i + 1);
    Some((&src[pos..end], end))
}

#[cfg(test)]
mod tests {
    use crate::markdown::Markdown;

    fn render(src: &str) -> String {
        Markdown::builder()
            .plugin(super::def_list)
            .build()
            .render(src)
            .unwrap()
    }

    #[test]
    fn test_single_term_and_definition() {
        assert_eq!(
            render("term\n: definition\n"),
            "<dl>\n<dt>term</dt>\n<dd>definition</dd>\n</dl>\n"
        );
    }

    #[test]
    fn test_multiple_terms_and_definitions() {
        assert_eq!(
            render("first\nsecond\n: one\n: two\n"),
            "<dl>\n<dt>first</dt>\n<dt>second</dt>\n<dd>one</dd>\n<dd>two</dd>\n</dl>\n"
        );
    }

    #[test]
    fn test_terms_and_definitions_resolve_inline() {
        assert_eq!(
            render("*t*\n: **d**\n"),
            "<dl>\n<dt><em>t</em></dt>\n<dd><strong>d</strong></dd>\n</dl>\n"
        );
    }

    #[test]
    fn test_indented_continuation_joins_the_definition() {
        assert_eq!(
            render("term\n: first\n    second\n"),
            "<dl>\n<dt>term</dt>\n<dd>first\nsecond</dd>\n</dl>\n"
        );
    }

    #[test]
    fn test_blank_line_ends_the_list() {
        assert_eq!(
            render("term\n: def\n\nafter\n"),
            "<dl>\n<dt>term</dt>\n<dd>def</dd>\n</dl>\n<p>after</p>\n"
        );
    }

    #[test]
    fn test_lone_definition_line_is_a_paragraph() {
        assert_eq!(render(": nothing\n"), "<p>: nothing</p>\n");
    }
}
