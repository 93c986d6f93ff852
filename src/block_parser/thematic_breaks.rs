use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::BlockState;

/// A line of three or more `-`, `_`, or `*` markers, optionally spaced.
pub(super) fn parse_thematic_break(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    state.append_token(Node::marker("thematic_break"));
    // The trigger stops just before the line's newline.
    Ok(Some(m.end() + 1))
}
