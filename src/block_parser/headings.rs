use std::sync::LazyLock;

use regex::Regex;

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::node::Node;
use crate::registry::Matched;
use crate::state::BlockState;

/// Closing hash run of an ATX heading, including its separating space.
static AXT_TRIM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[ \t]+|^)#+[ \t]*$").unwrap());

/// ATX heading: one to six `#` markers, then the heading text.
///
/// The trigger is permissive, so the separator rules live here: the text
/// must either be empty or start with a space or tab. A seventh `#` lands
/// in the text group and fails that check, which also rejects overlong
/// marker runs.
pub(super) fn parse_axt_heading(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let (level, text) = {
        let src = state.src();
        let level = m.group(1).map_or(0, |r| r.len()) as i64;
        let rest = m.group(2).map_or("", |r| &src[r]);
        if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
            return Ok(None);
        }
        let trimmed = rest.trim();
        (level, AXT_TRIM.replace(trimmed, "").into_owned())
    };
    state.append_token(Node::text("heading", text).with_attr("level", level));
    Ok(Some(m.end() + 1))
}

/// Setext underline: a run of `=` or `-` promoting the open paragraph to
/// a heading. Without an open paragraph the line is retried as a thematic
/// break or list before giving up.
pub(super) fn parse_setex_heading(
    parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let level: i64 = {
        let marker = m.group(1).expect("setext trigger captures the underline");
        if state.src()[marker].ends_with('=') { 1 } else { 2 }
    };
    if let Some(last) = state.last_token_mut()
        && last.kind == "paragraph"
    {
        last.kind = "heading".to_string();
        last.set_attr("level", level);
        return Ok(Some(m.end() + 1));
    }
    parser.match_rules(&["thematic_break", "list"], state)
}
