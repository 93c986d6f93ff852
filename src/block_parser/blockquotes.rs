use std::sync::LazyLock;

use regex::Regex;

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::BlockState;
use crate::util::{expand_leading_tab, expand_tab};

static QUOTE_LEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ *>").unwrap());
static QUOTE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ ?").unwrap());
static STRICT_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(?: {0,3}>[^\n]*(?:\n|\z))+").unwrap());
static LINE_BLANK_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n\z").unwrap());

/// Constructs that end a lazy block quote when they start a line without
/// the `>` marker.
const QUOTE_BREAK_RULES: &[&str] =
    &["blank_line", "thematic_break", "fenced_code", "list", "block_html"];

/// Block quote: `>`-marked lines plus lazy continuation lines, reparsed
/// as a nested document.
pub(super) fn parse_block_quote(
    parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let (text, end_pos) = extract_block_quote(parser, m, state)?;
    let children = parser.parse_tokens(text, state)?;
    let token = Node::container("block_quote", children);
    match end_pos {
        // A break rule already consumed text and appended its token, so
        // the quote has to slot in before it.
        Some(end) => {
            state.prepend_token(token);
            Ok(Some(end))
        }
        None => {
            state.append_token(token);
            Ok(Some(state.cursor()))
        }
    }
}

/// Collects the quote's unmarked text and, when a break rule fired, the
/// position the engine should continue from.
fn extract_block_quote(
    parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<(String, Option<usize>), Error> {
    let mut text = {
        let body = &state.src()[m.group(1).expect("quote trigger captures the line body")];
        let first = expand_leading_tab(&format!("{body}\n"), 3);
        QUOTE_TRIM.replace(&first, "").into_owned()
    };
    // When the first line opens a code block or is blank, continuation
    // lines must carry the marker themselves; laziness is off.
    let require_marker = parser.test_rules(&["blank_line", "indent_code", "fenced_code"], &text);
    state.set_cursor(m.end() + 1);

    let mut end_pos = None;
    if require_marker {
        if let Some((quote, quote_end)) = strict_quote(state) {
            text.push_str(&quote);
            state.set_cursor(quote_end);
        }
    } else {
        let mut prev_blank_line = false;
        while state.cursor() < state.cursor_max() {
            if let Some((quote, quote_end)) = strict_quote(state) {
                prev_blank_line = quote.trim().is_empty() || LINE_BLANK_END.is_match(&quote);
                text.push_str(&quote);
                state.set_cursor(quote_end);
                continue;
            }
            if prev_blank_line {
                // Laziness does not resume across a blank line.
                break;
            }
            if let Some(end) = parser.match_rules(QUOTE_BREAK_RULES, state)? {
                end_pos = Some(end);
                break;
            }
            let pos = state.find_line_end();
            let line = expand_leading_tab(state.get_text(pos), 3);
            text.push_str(&line);
            state.set_cursor(pos);
        }
    }
    // A tab right after the marker expands relative to the marker width.
    Ok((expand_tab(&text), end_pos))
}

/// Matches a run of marker-carrying lines at the cursor and strips the
/// markers. Returns the unmarked text and the position after the run.
fn strict_quote(state: &BlockState) -> Option<(String, usize)> {
    let src = state.src();
    let found = STRICT_QUOTE.find(&src[state.cursor()..])?;
    let end = state.cursor() + found.end();
    let stripped = QUOTE_LEADING.replace_all(found.as_str(), "");
    let expanded = expand_leading_tab(&stripped, 3);
    let cleaned = QUOTE_TRIM.replace_all(&expanded, "").into_owned();
    Some((cleaned, end))
}

#[cfg(test)]
mod tests {
    use crate::block_parser::BlockParser;
    use crate::node::Node;
    use crate::state::BlockState;

    fn parse(src: &str) -> Vec<Node> {
        let parser = BlockParser::new();
        let mut state = BlockState::new(src.to_string());
        parser.parse(&mut state).unwrap();
        state.finish().0
    }

    #[test]
    fn test_marked_lines_form_one_quote() {
        let tokens = parse("> first\n> second\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, "block_quote");
        let children = tokens[0].children().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].as_text(), Some("first\nsecond\n"));
    }

    #[test]
    fn test_lazy_continuation_joins_the_quote() {
        let tokens = parse("> first\nsecond\n");
        assert_eq!(tokens.len(), 1);
        let children = tokens[0].children().unwrap();
        assert_eq!(children[0].as_text(), Some("first\nsecond\n"));
    }

    #[test]
    fn test_blank_marker_line_stops_laziness() {
        let tokens = parse("> a\n>\nb\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, "block_quote");
        assert_eq!(tokens[1].kind, "paragraph");
        assert_eq!(tokens[1].as_text(), Some("b\n"));
    }

    #[test]
    fn test_blank_line_ends_the_quote_in_order() {
        let tokens = parse("> a\n\nb\n");
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["block_quote", "blank_line", "paragraph"]);
    }

    #[test]
    fn test_thematic_break_ends_the_quote_in_order() {
        let tokens = parse("> a\n---\n");
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["block_quote", "thematic_break"]);
    }

    #[test]
    fn test_quotes_nest() {
        let tokens = parse("> > deep\n");
        let outer = tokens[0].children().unwrap();
        assert_eq!(outer[0].kind, "block_quote");
        let inner = outer[0].children().unwrap();
        assert_eq!(inner[0].as_text(), Some("deep\n"));
    }

    #[test]
    fn test_code_fence_in_quote_requires_markers() {
        let tokens = parse("> ```\n> code\nafter\n");
        assert_eq!(tokens[0].kind, "block_quote");
        let children = tokens[0].children().unwrap();
        assert_eq!(children[0].kind, "block_code");
        assert_eq!(children[0].as_raw(), Some("code\n"));
        assert_eq!(tokens[1].kind, "paragraph");
        assert_eq!(tokens[1].as_text(), Some("after\n"));
    }

    #[test]
    fn test_nested_list_inside_quote() {
        let tokens = parse("> - one\n> - two\n");
        let children = tokens[0].children().unwrap();
        assert_eq!(children[0].kind, "list");
        assert_eq!(children[0].children().unwrap().len(), 2);
    }
}
