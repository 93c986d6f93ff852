use std::sync::LazyLock;

use regex::Regex;

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::BlockState;
use crate::util::expand_tab;

static INDENT_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ {1,4}").unwrap());

/// Code block formed by four-space (or tab) indentation.
///
/// Indented text directly below a paragraph is a lazy continuation line,
/// not code, so an open paragraph absorbs it first.
pub(super) fn parse_indent_code(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    if let Some(end) = state.append_paragraph() {
        return Ok(Some(end));
    }
    let code = {
        let expanded = expand_tab(&state.src()[m.range()]);
        INDENT_TRIM.replace_all(&expanded, "").into_owned()
    };
    let code = code.trim_matches('\n');
    state.append_token(Node::raw("block_code", code));
    Ok(Some(m.end()))
}
