//! TeX math: `$$ ... $$` blocks and `$...$` spans. The content is kept
//! verbatim for a client-side typesetter.

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::inline_parser::InlineParser;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::{BlockState, InlineState};

const BLOCK_MATH: &str = r" {0,3}\$\$[ \t]*\n((?s:.+?))\n\$\$[ \t]*$";

const INLINE_MATH: &str = r"\$([^\s$](?:[^$\n]*[^\s$])?)\$";

pub fn math(md: &mut Markdown) {
    md.block_parser_mut()
        .register(
            "block_math",
            BLOCK_MATH,
            Box::new(parse_block_math),
            Position::before("list"),
        )
        .expect("default rule `list` is registered");
    md.inline_parser_mut()
        .register(
            "inline_math",
            INLINE_MATH,
            Box::new(parse_inline_math),
            Position::before("link"),
        )
        .expect("default rule `link` is registered");

    let renderer = md.renderer_mut();
    renderer.register(
        "block_math",
        Box::new(|_, node, _| {
            format!(
                "<div class=\"math\">$$\n{}\n$$</div>\n",
                node.as_raw().unwrap_or_default()
            )
        }),
    );
    renderer.register(
        "inline_math",
        Box::new(|_, node, _| {
            format!(
                "<span class=\"math\">\\({}\\)</span>",
                node.as_raw().unwrap_or_default()
            )
        }),
    );
}

fn parse_block_math(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let text = m
        .group(1)
        .map_or(String::new(), |r| state.src()[r].to_string());
    state.append_token(Node::raw("block_math", text));
    Ok(Some(m.end() + 1))
}

fn parse_inline_math(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let text = m
        .group(1)
        .map_or(String::new(), |r| state.src()[r].to_string());
    state.append_token(Node::raw("inline_math", text));
    Ok(Some(m.end()))
}

#[cfg(test)]
mod tests {
    use crate::markdown::Markdown;

    fn render(src: &str) -> String {
        Markdown::builder()
            .plugin(super::math)
            .build()
            .render(src)
            .unwrap()
    }

    #[test]
    fn test_block_math() {
        assert_eq!(
            render("$$\nx^2 + y^2 = z^2\n$$\n"),
            "<div class=\"math\">$$\nx^2 + y^2 = z^2\n$$</div>\n"
        );
    }

    #[test]
    fn test_block_math_spans_lines() {
        assert_eq!(
            render("$$\n\\int_0^1\nf(x)\n$$\n"),
            "<div class=\"math\">$$\n\\int_0^1\nf(x)\n$$</div>\n"
        );
    }

    #[test]
    fn test_inline_math() {
        assert_eq!(
            render("Euler: $e^{i\\pi} = -1$\n"),
            "<p>Euler: <span class=\"math\">\\(e^{i\\pi} = -1\\)</span></p>\n"
        );
    }

    #[test]
    fn test_unclosed_dollar_is_literal() {
        assert_eq!(render("costs $5\n"), "<p>costs $5</p>\n");
    }

    #[test]
    fn test_unclosed_block_is_a_paragraph() {
        assert_eq!(render("$$\nx\n"), "<p>$$\nx</p>\n");
    }
}
