use crate::error::Error;
use crate::registry::Matched;
use crate::state::InlineState;
use crate::util::unescape_char;

use super::InlineParser;

/// A run of backslash escapes. The backslashes are dropped and the
/// escaped punctuation becomes plain text.
pub(super) fn parse_escape(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let text = unescape_char(&state.src()[m.range()]);
    state.append_text(&text);
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
    fn test_escaped_star_does_not_open_emphasis() {
        let tokens = parse(r"\*not em\*");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("*not em*"));
    }

    #[test]
    fn test_consecutive_escapes_collapse_into_one_text() {
        let tokens = parse(r"\[\]\(\)");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("[]()"));
    }

    #[test]
    fn test_backslash_before_letter_stays_literal() {
        let tokens = parse(r"a\b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some(r"a\b"));
    }
}
