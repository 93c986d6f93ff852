//! Ruby annotations: `[漢(kan)字(ji)]`, optionally followed by a link
//! target or reference label that wraps the whole run.

use crate::error::Error;
use crate::helpers::{parse_link_label, parse_link_target};
use crate::inline_parser::InlineParser;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::InlineState;
use crate::util::unikey;

const RUBY_PATTERN: &str = r"\[(?:\w+\(\w+\))+\]";

pub fn ruby(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "ruby",
            RUBY_PATTERN,
            Box::new(parse_ruby),
            Position::before("link"),
        )
        .expect("default rule `link` is registered");
    md.renderer_mut().register(
        "ruby",
        Box::new(|_, node, _| {
            format!(
                "<ruby><rb>{}</rb><rt>{}</rt></ruby>",
                node.as_raw().unwrap_or_default(),
                node.attr_str("rt").unwrap_or_default()
            )
        }),
    );
}

fn parse_ruby(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let tokens = {
        let src = state.src();
        ruby_tokens(&src[m.start() + 1..m.end() - 1])
    };
    let end = m.end();

    // A target or label directly after the bracket links the whole run.
    match state.src().as_bytes().get(end).copied() {
        Some(b'(') => {
            let target = parse_link_target(state.src(), end + 1);
            if let Some((url, title, after)) = target {
                let mut token = Node::container("link", tokens).with_attr("url", url);
                if let Some(title) = title {
                    token = token.with_attr("title", title);
                }
                state.append_token(token);
                return Ok(Some(after));
            }
        }
        Some(b'[') => {
            let reference =
                parse_link_label(state.src(), end + 1).map(|(label, after)| (unikey(label), after));
            if let Some((key, after)) = reference
                && let Some(def) = state.env.ref_link(&key)
            {
                let (url, title) = (def.url.clone(), def.title.clone());
                let mut token = Node::container("link", tokens)
                    .with_attr("url", url)
                    .with_attr("label", key);
                if let Some(title) = title {
                    token = token.with_attr("title", title);
                }
                state.append_token(token);
                return Ok(Some(after));
            }
        }
        _ => {}
    }

    for token in tokens {
        state.append_token(token);
    }
    Ok(Some(end))
}

fn ruby_tokens(inner: &str) -> Vec<Node> {
    inner
        .split(')')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            pair.split_once('(')
                .map(|(rb, rt)| Node::raw("ruby", rb).with_attr("rt", rt))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::markdown::Markdown;

    fn render(src: &str) -> String {
        Markdown::builder()
            .plugin(super::ruby)
            .build()
            .render(src)
            .unwrap()
    }

    #[test]
    fn test_annotated_run() {
        assert_eq!(
            render("[漢(kan)字(ji)]\n"),
            "<p><ruby><rb>漢</rb><rt>kan</rt></ruby><ruby><rb>字</rb><rt>ji</rt></ruby></p>\n"
        );
    }

    #[test]
    fn test_run_with_inline_link() {
        assert_eq!(
            render("[漢(kan)](https://example.com)\n"),
            "<p><a href=\"https://example.com\"><ruby><rb>漢</rb><rt>kan</rt></ruby></a></p>\n"
        );
    }

    #[test]
    fn test_run_with_reference_link() {
        assert_eq!(
            render("[字(ji)][k]\n\n[k]: https://example.com\n"),
            "<p><a href=\"https://example.com\"><ruby><rb>字</rb><rt>ji</rt></ruby></a></p>\n"
        );
    }

    #[test]
    fn test_unresolved_reference_stays_plain() {
        assert_eq!(
            render("[字(ji)][nope]\n"),
            "<p><ruby><rb>字</rb><rt>ji</rt></ruby>[nope]</p>\n"
        );
    }
}
