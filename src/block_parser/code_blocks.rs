use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::BlockState;
use crate::util::unescape_char;

/// Fenced code block.
///
/// The trigger matched the opening fence line; everything up to a closing
/// fence of the same character, at least as long and indented at most
/// three spaces, is raw code. An unterminated fence runs to the end of
/// the frame.
pub(super) fn parse_fenced_code(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let (code, info, end_pos) = {
        let src = state.src();
        let spaces = m.group(1).map_or(0, |r| r.len());
        let marker = &src[m.group(2).expect("fence trigger captures the marker")];
        let fence_char = marker.as_bytes()[0];
        let info_raw = m.group(3).map_or("", |r| &src[r]);
        // Info strings of backtick fences cannot contain backticks.
        if fence_char == b'`' && info_raw.contains('`') {
            return Ok(None);
        }
        let content_start = m.end() + 1;
        let (code_end, end_pos) =
            match find_fence_close(src, content_start, fence_char, marker.len()) {
                Some(found) => found,
                None => (state.cursor_max(), state.cursor_max()),
            };
        let mut code = src[content_start.min(code_end)..code_end].to_string();
        if spaces > 0 && !code.is_empty() {
            code = strip_indent(&code, spaces);
        }
        let info = Some(unescape_char(info_raw))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        (code, info, end_pos)
    };
    let mut token = Node::raw("block_code", code);
    if let Some(info) = info {
        token = token.with_attr("info", info);
    }
    state.append_token(token);
    Ok(Some(end_pos))
}

/// Finds the closing fence line at or after `from`. Returns the start of
/// that line (the end of the code) and the position past its newline.
fn find_fence_close(src: &str, from: usize, fence_char: u8, min_len: usize) -> Option<(usize, usize)> {
    let mut pos = from;
    while pos < src.len() {
        let line_end = match src[pos..].find('\n') {
            Some(i) => pos + i + 1,
            None => src.len(),
        };
        let line = src[pos..line_end].trim_end_matches('\n');
        let unindented = line.trim_start_matches(' ');
        let indent = line.len() - unindented.len();
        if indent <= 3 {
            let run = unindented.bytes().take_while(|&b| b == fence_char).count();
            if run >= min_len && unindented[run..].bytes().all(|b| b == b' ' || b == b'\t') {
                return Some((pos, line_end));
            }
        }
        pos = line_end;
    }
    None
}

/// Removes up to `width` leading spaces from every line, mirroring the
/// indentation of the opening fence.
fn strip_indent(code: &str, width: usize) -> String {
    let mut out = String::with_capacity(code.len());
    for line in code.split_inclusive('\n') {
        let mut rest = line;
        let mut removed = 0;
        while removed < width && rest.starts_with(' ') {
            rest = &rest[1..];
            removed += 1;
        }
        out.push_str(rest);
    }
    out
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
    fn test_basic_fence_with_info() {
        let tokens = parse("```rust\nfn main() {}\n```\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, "block_code");
        assert_eq!(tokens[0].as_raw(), Some("fn main() {}\n"));
        assert_eq!(tokens[0].attr_str("info"), Some("rust"));
    }

    #[test]
    fn test_unterminated_fence_runs_to_the_end() {
        let tokens = parse("```\ncode\nmore\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_raw(), Some("code\nmore\n"));
    }

    #[test]
    fn test_closing_fence_must_be_long_enough() {
        let tokens = parse("````\n```\nstill code\n````\n");
        assert_eq!(tokens[0].as_raw(), Some("```\nstill code\n"));
    }

    #[test]
    fn test_backtick_info_cannot_contain_backticks() {
        let tokens = parse("``` a`b\ntext\n```\n");
        // The opening line declines and the block falls apart into
        // paragraph text plus an empty fenced block.
        assert_eq!(tokens[0].kind, "paragraph");
    }

    #[test]
    fn test_tilde_info_may_contain_backticks() {
        let tokens = parse("~~~ a`b\ncode\n~~~\n");
        assert_eq!(tokens[0].kind, "block_code");
        assert_eq!(tokens[0].attr_str("info"), Some("a`b"));
    }

    #[test]
    fn test_fence_indent_is_stripped_from_the_code() {
        let tokens = parse("  ```\n    indented\n  done\n  ```\n");
        assert_eq!(tokens[0].as_raw(), Some("  indented\ndone\n"));
    }

    #[test]
    fn test_empty_fence_is_an_empty_block() {
        let tokens = parse("```\n```\n");
        assert_eq!(tokens[0].kind, "block_code");
        assert_eq!(tokens[0].as_raw(), Some(""));
    }

    #[test]
    fn test_info_unescapes_backslash_pairs() {
        let tokens = parse("~~~ foo\\+bar\nx\n~~~\n");
        assert_eq!(tokens[0].attr_str("info"), Some("foo+bar"));
    }
}
