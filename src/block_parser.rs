//! The block phase: splits a document into block-level nodes.
//!
//! The engine is a linear scan. The cursor always sits at a line start;
//! each step probes the registered rules in order, anchored at the cursor,
//! and the first trigger that matches gets to run its handler. A handler
//! either consumes text (returning the new cursor position) or declines,
//! in which case the current line is folded into a paragraph. That
//! fallback is also what guarantees progress: no rule outcome can leave
//! the cursor where it was.

mod blockquotes;
mod code_blocks;
mod headings;
mod html_blocks;
mod indented_code;
mod lists;
mod reference_definitions;
mod thematic_breaks;

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::node::Node;
use crate::registry::{Matched, Phase, Position, Registry};
use crate::state::BlockState;

/// Blank line runs, shared by several rules that scan ahead for one.
pub(crate) static BLANK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^[ \t\x0B\x0C]*\n)+").unwrap());

/// Handler for a block rule.
///
/// Fired when the rule's trigger matched at the cursor. Returns the
/// position the engine should continue from, or `None` to decline the
/// match. A declining handler must leave the state untouched.
pub type BlockHandler = Box<
    dyn Fn(&BlockParser, &Matched, &mut BlockState) -> Result<Option<usize>, Error> + Send + Sync,
>;

/// Default nesting limit for containers.
pub const DEFAULT_MAX_NESTED_LEVEL: usize = 64;

/// The block-phase parser: an ordered rule registry plus the scan loop.
pub struct BlockParser {
    registry: Registry<BlockHandler>,
    max_nested_level: usize,
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockParser {
    /// A parser with the standard block rules registered, in scan order:
    /// fenced and indented code, headings, thematic breaks, block quotes,
    /// lists, reference definitions, HTML blocks, and blank lines.
    pub fn new() -> Self {
        let mut parser = BlockParser {
            registry: Registry::new(Phase::Block),
            max_nested_level: DEFAULT_MAX_NESTED_LEVEL,
        };
        parser.install(
            "fenced_code",
            r"( {0,3})(`{3,}|~{3,})[ \t]*([^\n]*)$",
            Box::new(code_blocks::parse_fenced_code),
        );
        parser.install(
            "indent_code",
            r"(?: {4}| *\t)[^\n]+(?:\n+|$)(?:(?:(?: {4}| *\t)[^\n]+(?:\n+|$))|\s)*",
            Box::new(indented_code::parse_indent_code),
        );
        parser.install(
            "axt_heading",
            r" {0,3}(#{1,6})([^\n]*)$",
            Box::new(headings::parse_axt_heading),
        );
        parser.install(
            "setex_heading",
            r" {0,3}([=-]+)[ \t]*$",
            Box::new(headings::parse_setex_heading),
        );
        parser.install(
            "thematic_break",
            r" {0,3}((?:-[ \t]*){3,}|(?:_[ \t]*){3,}|(?:\*[ \t]*){3,})$",
            Box::new(thematic_breaks::parse_thematic_break),
        );
        parser.install(
            "block_quote",
            r" {0,3}>([^\n]*)$",
            Box::new(blockquotes::parse_block_quote),
        );
        parser.install("list", lists::LIST_PATTERN, Box::new(lists::parse_list));
        parser.install(
            "ref_link",
            &format!(r" {{0,3}}\[({})\]:", crate::helpers::LINK_LABEL),
            Box::new(reference_definitions::parse_ref_link),
        );
        parser.install(
            "block_html",
            &html_blocks::block_html_pattern(),
            Box::new(html_blocks::parse_raw_html),
        );
        parser.install(
            "raw_html",
            &html_blocks::raw_html_pattern(),
            Box::new(html_blocks::parse_raw_html),
        );
        parser.install(
            "blank_line",
            r"(?:[ \t\x0B\x0C]*\n)+",
            Box::new(parse_blank_line),
        );
        parser
    }

    fn install(&mut self, name: &str, pattern: &str, handler: BlockHandler) {
        self.registry
            .register(name, pattern, handler, Position::Append)
            .expect("default block rules are valid");
    }

    /// Registers a block rule. See [`Registry::register`].
    pub fn register(
        &mut self,
        name: &str,
        pattern: &str,
        handler: BlockHandler,
        position: Position,
    ) -> Result<(), Error> {
        self.registry.register(name, pattern, handler, position)
    }

    /// Removes a block rule by name.
    pub fn remove(&mut self, name: &str) -> Result<(), Error> {
        self.registry.remove(name)
    }

    pub fn registry(&self) -> &Registry<BlockHandler> {
        &self.registry
    }

    pub fn max_nested_level(&self) -> usize {
        self.max_nested_level
    }

    pub fn set_max_nested_level(&mut self, limit: usize) {
        self.max_nested_level = limit.max(1);
    }

    /// Runs the scan loop over the state's current frame until its source
    /// is exhausted.
    pub fn parse(&self, state: &mut BlockState) -> Result<(), Error> {
        while state.cursor() < state.cursor_max() {
            let before = state.cursor();
            match self.dispatch(state)? {
                Some(end) if end > before => state.set_cursor(end),
                _ => {
                    // No rule claimed the line; it belongs to a paragraph.
                    let end = state.find_line_end();
                    state.add_paragraph(end);
                }
            }
        }
        Ok(())
    }

    fn dispatch(&self, state: &mut BlockState) -> Result<Option<usize>, Error> {
        let cursor = state.cursor();
        for rule in self.registry.ordered_rules() {
            let matched = rule.try_match_at(state.src(), cursor);
            if let Some(m) = matched {
                log::trace!("block rule `{}` matched at {}", rule.name(), cursor);
                return (rule.handler())(self, &m, state);
            }
        }
        Ok(None)
    }

    /// Dispatches among a named subset of rules, anchored at the cursor.
    /// Names without a registered rule are skipped. Handlers use this to
    /// delegate to other constructs, e.g. a setext underline falling back
    /// to a thematic break, or a block quote ending at a list marker.
    pub fn match_rules(
        &self,
        names: &[&str],
        state: &mut BlockState,
    ) -> Result<Option<usize>, Error> {
        let cursor = state.cursor();
        for name in names {
            let Some(rule) = self.registry.get(name) else {
                continue;
            };
            let matched = rule.try_match_at(state.src(), cursor);
            if let Some(m) = matched {
                log::trace!("block rule `{name}` (subset) matched at {cursor}");
                return (rule.handler())(self, &m, state);
            }
        }
        Ok(None)
    }

    /// Whether any of the named rules' triggers match at the start of
    /// `text`, without running a handler.
    pub fn test_rules(&self, names: &[&str], text: &str) -> bool {
        names.iter().any(|name| {
            self.registry
                .get(name)
                .is_some_and(|rule| rule.try_match_at(text, 0).is_some())
        })
    }

    /// Parses a nested source in a fresh frame and returns its tokens.
    /// Fails with [`Error::DepthExceeded`] past the nesting limit.
    pub fn parse_tokens(&self, src: String, state: &mut BlockState) -> Result<Vec<Node>, Error> {
        state.push_frame(src, self.max_nested_level)?;
        let result = self.parse(state);
        let tokens = state.pop_frame();
        result?;
        Ok(tokens)
    }
}

fn parse_blank_line(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    state.append_token(Node::marker("blank_line"));
    Ok(Some(m.end()))
}
