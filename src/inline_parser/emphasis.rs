use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::InlineState;

use super::{InlineParser, precedence_scan};

const PREC_RULES: &[&str] = &["codespan", "link", "auto_link", "inline_html"];

/// A run of one to three `*` or `_` opening emphasis. One marker is
/// emphasis, two are strong, three are strong wrapping emphasis. The
/// underscore form only opens and closes at word boundaries.
pub(super) fn parse_emphasis(
    parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let (marker_char, mlen, valid) = {
        let src = state.src();
        let marker = src[m.range()].as_bytes()[0] as char;
        let next = src[m.end()..].chars().next();
        let valid = next.is_some_and(|c| !c.is_whitespace() && c != marker);
        (marker, m.end() - m.start(), valid)
    };
    if !valid {
        return Ok(None);
    }
    // An open construct of the same kind turns the run into plain text
    // instead of nesting.
    if (mlen == 1 && state.in_emphasis) || (mlen == 2 && state.in_strong) {
        let marker = state.src()[m.range()].to_string();
        state.append_text(&marker);
        return Ok(Some(m.end()));
    }
    let closer = {
        let src = state.src();
        find_emphasis_end(src, m.end(), marker_char, mlen)
    };
    let Some((text_end, end_pos)) = closer else {
        let marker = state.src()[m.range()].to_string();
        state.append_text(&marker);
        return Ok(Some(m.end()));
    };
    if let Some(prec) = precedence_scan(parser, m, state, end_pos, PREC_RULES)? {
        return Ok(Some(prec));
    }

    let text = state.src()[m.end()..text_end].to_string();
    let saved_emphasis = state.in_emphasis;
    let saved_strong = state.in_strong;
    match mlen {
        1 => state.in_emphasis = true,
        2 => state.in_strong = true,
        _ => {
            state.in_emphasis = true;
            state.in_strong = true;
        }
    }
    state.push_frame(text, parser.max_nested_level())?;
    let result = parser.parse(state);
    let children = state.pop_frame();
    state.in_emphasis = saved_emphasis;
    state.in_strong = saved_strong;
    result?;

    let token = match mlen {
        1 => Node::container("emphasis", children),
        2 => Node::container("strong", children),
        _ => Node::container("strong", vec![Node::container("emphasis", children)]),
    };
    state.append_token(token);
    Ok(Some(end_pos))
}

/// Finds the closing run for an emphasis opened with `mlen` markers.
/// Returns the text end and the position past the closer.
///
/// A run closes only when it has exactly the opener's length and the
/// character before it is content: not whitespace, not a marker, with an
/// escape pair counting as content. Runs of any other length are opaque.
fn find_emphasis_end(
    src: &str,
    from: usize,
    marker: char,
    mlen: usize,
) -> Option<(usize, usize)> {
    let bytes = src.as_bytes();
    let mut i = from;
    let mut prev_ok = false;
    while i < src.len() {
        let c = src[i..].chars().next()?;
        if c == '\\' && i + 1 < src.len() && bytes[i + 1].is_ascii_punctuation() {
            prev_ok = true;
            i += 2;
            continue;
        }
        if c == marker {
            let start = i;
            while i < src.len() && bytes[i] == marker as u8 {
                i += 1;
            }
            if i - start == mlen && prev_ok && (marker != '_' || word_boundary_after(src, i)) {
                return Some((start, i));
            }
            prev_ok = false;
            continue;
        }
        prev_ok = !c.is_whitespace();
        i += c.len_utf8();
    }
    None
}

fn word_boundary_after(src: &str, at: usize) -> bool {
    src[at..]
        .chars()
        .next()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
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
    fn test_single_star_is_emphasis() {
        let tokens = parse("a *b* c");
        assert_eq!(tokens[1].kind, "emphasis");
        let children = tokens[1].children().unwrap();
        assert_eq!(children[0].as_raw(), Some("b"));
    }

    #[test]
    fn test_double_star_is_strong() {
        let tokens = parse("**bold**");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, "strong");
    }

    #[test]
    fn test_triple_star_nests_emphasis_in_strong() {
        let tokens = parse("***both***");
        assert_eq!(tokens[0].kind, "strong");
        let inner = tokens[0].children().unwrap();
        assert_eq!(inner[0].kind, "emphasis");
        assert_eq!(inner[0].children().unwrap()[0].as_raw(), Some("both"));
    }

    #[test]
    fn test_strong_may_contain_emphasis() {
        let tokens = parse("**a *b* c**");
        assert_eq!(tokens[0].kind, "strong");
        let inner = tokens[0].children().unwrap();
        assert_eq!(inner[1].kind, "emphasis");
    }

    #[test]
    fn test_emphasis_does_not_nest_in_itself() {
        let tokens = parse("*a *b* c*");
        assert_eq!(tokens[0].kind, "emphasis");
        let inner = tokens[0].children().unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].as_raw(), Some("a *b"));
    }

    #[test]
    fn test_underscore_inside_word_is_literal() {
        let tokens = parse("snake_case_name");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("snake_case_name"));
    }

    #[test]
    fn test_underscore_emphasis_at_word_boundary() {
        let tokens = parse("an _emphasized_ word");
        assert_eq!(tokens[1].kind, "emphasis");
    }

    #[test]
    fn test_space_after_marker_keeps_it_literal() {
        let tokens = parse("2 * 3 * 4");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("2 * 3 * 4"));
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let tokens = parse("*open but no close");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("*open but no close"));
    }

    #[test]
    fn test_code_span_crossing_the_closer_wins() {
        let tokens = parse("*a `b*` c");
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["text", "codespan", "text"]);
        assert_eq!(tokens[0].as_raw(), Some("*a "));
        assert_eq!(tokens[1].as_raw(), Some("b*"));
        assert_eq!(tokens[2].as_raw(), Some(" c"));
    }

    #[test]
    fn test_code_span_inside_emphasis_stays_inside() {
        let tokens = parse("*a `b` c*");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, "emphasis");
        let inner = tokens[0].children().unwrap();
        assert_eq!(inner[1].kind, "codespan");
    }

    #[test]
    fn test_escaped_closer_does_not_close() {
        let tokens = parse(r"*a\* b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("*a* b"));
    }
}
