use std::sync::LazyLock;

use regex::Regex;

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::BlockState;

/// Trigger for a list: a bullet or ordered marker, bare or followed by
/// spaced content.
pub(super) const LIST_PATTERN: &str = r" {0,3}([*+-]|\d{1,9}[.)])([ \t]*|[ \t][^\n]*)$";

/// An item-start line, re-matched against each line during collection.
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A( {0,3})([*+-]|\d{1,9}[.)])([ \t]*|[ \t].*)\z").unwrap());

/// Constructs that end an open list when they appear unindented.
const LIST_BREAK_RULES: &[&str] = &["thematic_break", "fenced_code"];

/// List of one or more items sharing a marker family.
///
/// Collection walks the frame line by line: lines indented to the item's
/// content column are dedented into the item source, blank lines stay in
/// it, and a compatible marker opens the next item. Each item source is
/// then reparsed as a nested document. A marker from a different family
/// ends the list and starts a sibling list at the engine level.
pub(super) fn parse_list(
    parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let (ordered, start, family) = {
        let src = state.src();
        let marker = &src[m.group(1).expect("list trigger captures the marker")];
        let body = m.group(2).map_or("", |r| &src[r]);
        let family = marker.as_bytes()[marker.len() - 1];
        let ordered = matches!(family, b'.' | b')');
        let start = if ordered {
            marker[..marker.len() - 1].parse::<i64>().unwrap_or(1)
        } else {
            1
        };
        // Only a list whose first item has content, and whose numbering
        // starts at one, may interrupt a paragraph.
        if state.last_token().is_some_and(|t| t.kind == "paragraph")
            && (body.trim().is_empty() || (ordered && start != 1))
        {
            return Ok(None);
        }
        (ordered, start, family)
    };

    let depth = state.depth() as i64;
    let mut item_sources: Vec<String> = Vec::new();
    let mut loose = false;
    let mut breaker: Option<usize> = None;
    let mut pos = state.cursor();

    'items: loop {
        // The line at `pos` starts an item; the trigger guarantees this
        // for the first pass and the classifier for every later one.
        let (mut item, width) = {
            let src = state.src();
            let line_end = line_end_at(src, pos);
            let body = src[pos..line_end].trim_end_matches('\n');
            let Some(caps) = ITEM_RE.captures(body) else {
                break 'items;
            };
            let head = caps.get(1).map_or(0, |g| g.as_str().len())
                + caps.get(2).map_or(1, |g| g.as_str().len());
            let rest = caps.get(3).map_or("", |g| g.as_str());
            pos = line_end;
            split_item_start(rest, head)
        };
        let mut prev_blank = false;

        while pos < state.cursor_max() {
            let (step, line_end) = {
                let src = state.src();
                let line_end = line_end_at(src, pos);
                (
                    classify_line(parser, &src[pos..line_end], width, family),
                    line_end,
                )
            };
            match step {
                Step::Blank => {
                    item.push('\n');
                    prev_blank = true;
                    pos = line_end;
                }
                Step::Continuation(stripped) => {
                    if prev_blank {
                        loose = true;
                    }
                    prev_blank = false;
                    item.push_str(&stripped);
                    item.push('\n');
                    pos = line_end;
                }
                Step::NextItem => {
                    if prev_blank {
                        loose = true;
                    }
                    item_sources.push(item);
                    continue 'items;
                }
                Step::End => {
                    item_sources.push(item);
                    break 'items;
                }
                Step::TryBreak => {
                    state.set_cursor(pos);
                    if let Some(end) = parser.match_rules(LIST_BREAK_RULES, state)? {
                        breaker = Some(end);
                        item_sources.push(item);
                        break 'items;
                    }
                    if prev_blank {
                        item_sources.push(item);
                        break 'items;
                    }
                    // The candidate declined, so the line is an ordinary
                    // lazy continuation.
                    let line = state.src()[pos..line_end].to_string();
                    item.push_str(&line);
                    pos = line_end;
                }
                Step::Lazy(line) => {
                    if prev_blank {
                        item_sources.push(item);
                        break 'items;
                    }
                    item.push_str(&line);
                    pos = line_end;
                }
            }
        }
        if pos >= state.cursor_max() {
            item_sources.push(item);
            break;
        }
    }

    let mut children = Vec::with_capacity(item_sources.len());
    for item_src in item_sources {
        let tokens = parser.parse_tokens(trim_item(item_src), state)?;
        children.push(Node::container("list_item", tokens));
    }
    let mut list = Node::container("list", children)
        .with_attr("ordered", ordered)
        .with_attr("depth", depth)
        .with_attr("tight", !loose);
    if ordered && start != 1 {
        list = list.with_attr("start", start);
    }
    match breaker {
        Some(end) => {
            state.prepend_token(list);
            Ok(Some(end))
        }
        None => {
            state.append_token(list);
            Ok(Some(pos))
        }
    }
}

enum Step {
    Blank,
    Continuation(String),
    NextItem,
    End,
    TryBreak,
    Lazy(String),
}

fn classify_line(parser: &BlockParser, line: &str, width: usize, family: u8) -> Step {
    let body = line.trim_end_matches('\n');
    if body.trim().is_empty() {
        return Step::Blank;
    }
    if let Some(stripped) = strip_columns(body, width) {
        return Step::Continuation(stripped);
    }
    if parser.test_rules(LIST_BREAK_RULES, line) {
        return Step::TryBreak;
    }
    if let Some(caps) = ITEM_RE.captures(body) {
        let marker = caps.get(2).map_or("", |g| g.as_str());
        return if compatible_markers(family, marker) {
            Step::NextItem
        } else {
            Step::End
        };
    }
    Step::Lazy(line.to_string())
}

/// Splits the text after a marker into the first content chunk and the
/// item's content column. More than four separating spaces means the item
/// starts with indented code, so only one space belongs to the marker.
fn split_item_start(rest: &str, head: usize) -> (String, usize) {
    if rest.trim().is_empty() {
        return (String::new(), head + 1);
    }
    let ws = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    if ws <= 4 {
        (format!("{}\n", &rest[ws..]), head + ws)
    } else {
        (format!("{}\n", &rest[1..]), head + 1)
    }
}

/// Removes `width` columns of leading whitespace, a tab counting to the
/// next stop of four. `None` when the line is not indented that far.
fn strip_columns(line: &str, width: usize) -> Option<String> {
    let bytes = line.as_bytes();
    let mut cols = 0;
    let mut i = 0;
    while i < bytes.len() && cols < width {
        match bytes[i] {
            b' ' => cols += 1,
            b'\t' => cols += 4 - cols % 4,
            _ => return None,
        }
        i += 1;
    }
    if cols < width {
        return None;
    }
    let mut out = " ".repeat(cols - width);
    out.push_str(&line[i..]);
    Some(out)
}

fn compatible_markers(family: u8, marker: &str) -> bool {
    marker.as_bytes()[marker.len() - 1] == family
}

/// Blank padding inside an item collapses: one trailing newline stays and
/// leading blank lines go, so nested parses see a clean source.
fn trim_item(mut src: String) -> String {
    while src.ends_with("\n\n") {
        src.pop();
    }
    match src.find(|c| c != '\n') {
        Some(0) | None => src,
        Some(at) => src.split_off(at),
    }
}

fn line_end_at(src: &str, pos: usize) -> usize {
    match src[pos..].find('\n') {
        Some(i) => pos + i + 1,
        None => src.len(),
    }
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

    fn item_texts(list: &Node) -> Vec<String> {
        list.children()
            .unwrap()
            .iter()
            .map(|item| {
                item.children()
                    .unwrap()
                    .first()
                    .and_then(|t| t.as_text())
                    .unwrap_or("")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_bullet_list_is_tight_without_blanks() {
        let tokens = parse("- one\n- two\n");
        assert_eq!(tokens.len(), 1);
        let list = &tokens[0];
        assert_eq!(list.kind, "list");
        assert_eq!(list.attr_bool("ordered"), Some(false));
        assert_eq!(list.attr_bool("tight"), Some(true));
        assert_eq!(item_texts(list), vec!["one\n", "two\n"]);
    }

    #[test]
    fn test_blank_between_items_loosens_the_list() {
        let tokens = parse("- one\n\n- two\n");
        assert_eq!(tokens[0].attr_bool("tight"), Some(false));
        assert_eq!(tokens[0].children().unwrap().len(), 2);
    }

    #[test]
    fn test_trailing_blank_keeps_the_list_tight() {
        let tokens = parse("- one\n- two\n\npara\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].attr_bool("tight"), Some(true));
        assert_eq!(tokens[1].kind, "paragraph");
    }

    #[test]
    fn test_ordered_start_is_recorded() {
        let tokens = parse("3. c\n4. d\n");
        let list = &tokens[0];
        assert_eq!(list.attr_bool("ordered"), Some(true));
        assert_eq!(list.attr_int("start"), Some(3));
    }

    #[test]
    fn test_marker_family_change_starts_a_sibling_list() {
        let tokens = parse("- a\n* b\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, "list");
        assert_eq!(tokens[1].kind, "list");
        assert_eq!(tokens[0].children().unwrap().len(), 1);
    }

    #[test]
    fn test_indented_lines_continue_the_item() {
        let tokens = parse("- head\n  tail\n");
        assert_eq!(item_texts(&tokens[0]), vec!["head\ntail\n"]);
    }

    #[test]
    fn test_nested_list_by_indentation() {
        let tokens = parse("- a\n  - b\n");
        let items = tokens[0].children().unwrap();
        assert_eq!(items.len(), 1);
        let inner = items[0].children().unwrap();
        assert_eq!(inner[0].kind, "paragraph");
        assert_eq!(inner[1].kind, "list");
        assert_eq!(inner[1].attr_int("depth"), Some(1));
    }

    #[test]
    fn test_two_paragraph_item_is_loose() {
        let tokens = parse("- a\n\n  b\n- c\n");
        let list = &tokens[0];
        assert_eq!(list.attr_bool("tight"), Some(false));
        let first = list.children().unwrap()[0].children().unwrap();
        let kinds: Vec<&str> = first.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["paragraph", "blank_line", "paragraph"]);
    }

    #[test]
    fn test_thematic_break_ends_the_list_in_order() {
        let tokens = parse("- a\n***\n");
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["list", "thematic_break"]);
    }

    #[test]
    fn test_empty_item_has_no_children() {
        let tokens = parse("- a\n-\n- b\n");
        let items = tokens[0].children().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[1].children().unwrap().is_empty());
    }

    #[test]
    fn test_numbered_list_cannot_interrupt_at_two() {
        let tokens = parse("text\n2. item\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_text(), Some("text\n2. item\n"));
    }

    #[test]
    fn test_bullet_with_content_interrupts_a_paragraph() {
        let tokens = parse("text\n- item\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, "list");
    }

    #[test]
    fn test_lazy_line_joins_the_item_paragraph() {
        let tokens = parse("- head\nlazy\n");
        assert_eq!(item_texts(&tokens[0]), vec!["head\nlazy\n"]);
    }

    #[test]
    fn test_marker_indent_beyond_three_spaces_is_content() {
        let tokens = parse("- a\n    - b\n");
        // Four spaces put the nested marker inside the item content.
        let items = tokens[0].children().unwrap();
        assert_eq!(items.len(), 1);
        let inner = items[0].children().unwrap();
        assert_eq!(inner[1].kind, "list");
    }
}
