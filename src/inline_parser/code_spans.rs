use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::InlineState;

use super::InlineParser;

/// A backtick run opening a code span. The closer is the next run of
/// exactly the same length; anything shorter or longer stays part of the
/// code. Without a closer the opening run is literal text.
pub(super) fn parse_codespan(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let closed = {
        let src = state.src();
        find_closing_run(src, m.end(), m.end() - m.start()).map(|(code_end, end_pos)| {
            let mut code = src[m.end()..code_end].replace('\n', " ");
            if !code.trim().is_empty() && code.starts_with(' ') && code.ends_with(' ') {
                code = code[1..code.len() - 1].to_string();
            }
            (code, end_pos)
        })
    };
    match closed {
        Some((code, end_pos)) => {
            state.append_token(Node::raw("codespan", code));
            Ok(Some(end_pos))
        }
        None => {
            let marker = state.src()[m.range()].to_string();
            state.append_text(&marker);
            Ok(Some(m.end()))
        }
    }
}

/// Finds the next backtick run of exactly `len` from `from` on. Returns
/// the run's start and the position past it. Runs of other lengths are
/// skipped whole, so a closer is never carved out of a longer run.
fn find_closing_run(src: &str, from: usize, len: usize) -> Option<(usize, usize)> {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let start = i;
            while i < bytes.len() && bytes[i] == b'`' {
                i += 1;
            }
            if i - start == len && start > from {
                return Some((start, i));
            }
        } else {
            i += 1;
        }
    }
    None
}
