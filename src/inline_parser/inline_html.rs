use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::InlineState;

use super::InlineParser;

/// Trigger for raw inline HTML: an open or close tag, a comment, a
/// processing instruction, a declaration, or a CDATA section. Comments
/// may not contain `--`, which also keeps the scan from running away on
/// an unclosed comment.
pub(super) fn inline_html_pattern() -> String {
    format!(
        r"<{tag}{attrs}\s*/?>|</{tag}\s*>|<!--(?:[^-]|-[^-])*-->|<\?(?s:.*?)\?>|<![A-Z][^>]*>|<!\[CDATA\[(?s:.*?)\]\]>",
        tag = crate::helpers::HTML_TAGNAME,
        attrs = crate::helpers::HTML_ATTRIBUTES,
    )
}

pub(super) fn parse_inline_html(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let html = state.src()[m.range()].to_string();
    state.append_token(Node::raw("inline_html", html));
    Ok(Some(m.end()))
}

#[cfg(test)]
mod tests {
    use crate::node::Node;
    use crate::state::{InlineState, ParseEnv};

    use super::super::InlineParser;

    fn parse(src: &str) -> Vec<Node> {
        let parser = InlineParser::new();
        let mut env = ParseEnv::default();
        let mut state = InlineState::new(&mut env);
        parser.parse_tokens(src.to_string(), &mut state).unwrap()
    }

    #[test]
    fn test_open_and_close_tags_pass_through() {
        let tokens = parse(r#"a <span class="x">b</span> c"#);
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["text", "inline_html", "text", "inline_html", "text"]
        );
        assert_eq!(tokens[1].as_raw(), Some(r#"<span class="x">"#));
        assert_eq!(tokens[3].as_raw(), Some("</span>"));
    }

    #[test]
    fn test_self_closing_tag() {
        let tokens = parse("a <hr/> b");
        assert_eq!(tokens[1].kind, "inline_html");
        assert_eq!(tokens[1].as_raw(), Some("<hr/>"));
    }

    #[test]
    fn test_comment_is_raw_html() {
        let tokens = parse("a <!-- note --> b");
        assert_eq!(tokens[1].kind, "inline_html");
        assert_eq!(tokens[1].as_raw(), Some("<!-- note -->"));
    }

    #[test]
    fn test_angle_bracket_without_tag_is_text() {
        let tokens = parse("1 < 2 and 3 > 2");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("1 < 2 and 3 > 2"));
    }

    #[test]
    fn test_unclosed_tag_is_text() {
        let tokens = parse("a <span b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("a <span b"));
    }
}
