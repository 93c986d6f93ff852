//! The inline phase: resolves one leaf's text into span-level nodes.
//!
//! Unlike the block engine, the inline engine is not anchored: each step
//! finds the earliest trigger match at or after the scan position, with
//! ties going to registration order. Text between matches becomes text
//! nodes. A handler that declines turns the trigger character itself into
//! literal text, so the scan always moves forward.

mod code_spans;
mod emphasis;
mod escapes;
mod inline_html;
mod links;

use crate::block_parser::DEFAULT_MAX_NESTED_LEVEL;
use crate::error::Error;
use crate::node::Node;
use crate::registry::{Matched, Phase, Position, Registry, Rule};
use crate::state::InlineState;

/// Handler for an inline rule. Returns the position to continue scanning
/// from, or `None` to decline, in which case the trigger character is
/// emitted as literal text. A declining handler must leave the state
/// untouched.
pub type InlineHandler = Box<
    dyn Fn(&InlineParser, &Matched, &mut InlineState) -> Result<Option<usize>, Error> + Send + Sync,
>;

/// The inline-phase parser.
pub struct InlineParser {
    registry: Registry<InlineHandler>,
    hard_wrap: bool,
    max_nested_level: usize,
}

impl Default for InlineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineParser {
    /// A parser with the standard inline rules registered, in precedence
    /// order for same-position ties.
    pub fn new() -> Self {
        let mut parser = InlineParser {
            registry: Registry::new(Phase::Inline),
            hard_wrap: false,
            max_nested_level: DEFAULT_MAX_NESTED_LEVEL,
        };
        parser.install(
            "escape",
            r"(?:\\[!-/:-@\[-`{-~])+",
            Box::new(escapes::parse_escape),
        );
        parser.install("codespan", "`{1,}", Box::new(code_spans::parse_codespan));
        parser.install(
            "emphasis",
            r"\*{1,3}|\b_{1,3}",
            Box::new(emphasis::parse_emphasis),
        );
        parser.install("link", r"!?\[", Box::new(links::parse_link));
        parser.install(
            "auto_link",
            r"<[A-Za-z][A-Za-z0-9.+-]{1,31}:[^<>\x00-\x20]*>",
            Box::new(links::parse_auto_link),
        );
        parser.install(
            "auto_email",
            r"<[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*>",
            Box::new(links::parse_auto_email),
        );
        parser.install(
            "inline_html",
            &inline_html::inline_html_pattern(),
            Box::new(inline_html::parse_inline_html),
        );
        parser.install(
            "linebreak",
            r"(?:\\| {2,})\n\s*",
            Box::new(parse_linebreak),
        );
        parser.install("softbreak", r" *\n\s*", Box::new(parse_softbreak));
        parser
    }

    fn install(&mut self, name: &str, pattern: &str, handler: InlineHandler) {
        self.registry
            .register(name, pattern, handler, Position::Append)
            .expect("default inline rules are valid");
    }

    /// Registers an inline rule. See [`Registry::register`].
    pub fn register(
        &mut self,
        name: &str,
        pattern: &str,
        handler: InlineHandler,
        position: Position,
    ) -> Result<(), Error> {
        self.registry.register(name, pattern, handler, position)
    }

    /// Removes an inline rule by name.
    pub fn remove(&mut self, name: &str) -> Result<(), Error> {
        self.registry.remove(name)
    }

    pub fn registry(&self) -> &Registry<InlineHandler> {
        &self.registry
    }

    /// Render every soft line break as a hard one.
    pub fn set_hard_wrap(&mut self, on: bool) {
        self.hard_wrap = on;
    }

    pub fn hard_wrap(&self) -> bool {
        self.hard_wrap
    }

    pub fn max_nested_level(&self) -> usize {
        self.max_nested_level
    }

    pub fn set_max_nested_level(&mut self, limit: usize) {
        self.max_nested_level = limit.max(1);
    }

    /// Runs the scan loop over the state's current frame.
    ///
    /// Every rule's next match is memoized: a cached match stays valid as
    /// long as the scan position has not passed its start, so the text is
    /// walked once per rule rather than once per step.
    pub fn parse(&self, state: &mut InlineState) -> Result<(), Error> {
        let rules: Vec<&Rule<InlineHandler>> = self.registry.ordered_rules().collect();
        let mut memo: Vec<Option<Option<Matched>>> = vec![None; rules.len()];
        let mut pos = 0;
        while pos < state.src().len() {
            let mut best: Option<(usize, Matched)> = None;
            for (idx, rule) in rules.iter().enumerate() {
                let found = match &memo[idx] {
                    Some(Some(m)) if m.start() >= pos => Some(m.clone()),
                    Some(None) => None,
                    _ => {
                        let found = rule.find_from(state.src(), pos);
                        memo[idx] = Some(found.clone());
                        found
                    }
                };
                let Some(m) = found else { continue };
                if best.as_ref().is_none_or(|(_, b)| m.start() < b.start()) {
                    let at_pos = m.start() == pos;
                    best = Some((idx, m));
                    if at_pos {
                        break;
                    }
                }
            }
            let Some((idx, matched)) = best else {
                let rest = state.src()[pos..].to_string();
                state.append_text(&rest);
                return Ok(());
            };
            if matched.start() > pos {
                let hole = state.src()[pos..matched.start()].to_string();
                state.append_text(&hole);
            }
            log::trace!(
                "inline rule `{}` matched at {}",
                rules[idx].name(),
                matched.start()
            );
            match (rules[idx].handler())(self, &matched, state)? {
                Some(end) if end > matched.start() => pos = end,
                _ => {
                    let advance = state.src()[matched.start()..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    let literal =
                        state.src()[matched.start()..matched.start() + advance].to_string();
                    state.append_text(&literal);
                    pos = matched.start() + advance;
                }
            }
        }
        Ok(())
    }

    /// Parses a nested source in a fresh frame and returns its tokens.
    pub fn parse_tokens(&self, src: String, state: &mut InlineState) -> Result<Vec<Node>, Error> {
        state.push_frame(src, self.max_nested_level)?;
        let result = self.parse(state);
        let tokens = state.pop_frame();
        result?;
        Ok(tokens)
    }
}

/// Scans the range between a construct's opener and its would-be closer
/// for a construct that binds tighter. When one starts inside the range
/// and ends at or past `end_pos`, it wins: the opener decays to literal
/// text and the inner construct's tokens stand.
pub(crate) fn precedence_scan(
    parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
    end_pos: usize,
    rules: &[&str],
) -> Result<Option<usize>, Error> {
    let candidate = {
        let src = state.src();
        let mut best: Option<(usize, &str)> = None;
        for name in rules {
            let Some(rule) = parser.registry().get(name) else {
                continue;
            };
            if let Some(c) = rule.find_from(src, m.end())
                && c.start() < end_pos
                && best.is_none_or(|(s, _)| c.start() < s)
            {
                best = Some((c.start(), name));
            }
        }
        best
    };
    let Some((cand_start, name)) = candidate else {
        return Ok(None);
    };
    let rule = parser
        .registry()
        .get(name)
        .expect("candidate rule was just looked up");
    let matched = {
        let src = state.src();
        rule.find_from(src, cand_start)
            .expect("candidate rule matched a moment ago")
    };
    let snapshot = state.token_count();
    match (rule.handler())(parser, &matched, state)? {
        Some(new_end) if new_end >= end_pos => {
            let prefix = state.src()[m.start()..cand_start].to_string();
            state.insert_token(snapshot, Node::raw("text", prefix));
            Ok(Some(new_end))
        }
        _ => {
            state.truncate_tokens(snapshot);
            Ok(None)
        }
    }
}

fn parse_linebreak(
    _parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    state.append_token(Node::marker("linebreak"));
    Ok(Some(m.end()))
}

fn parse_softbreak(
    parser: &InlineParser,
    m: &Matched,
    state: &mut InlineState,
) -> Result<Option<usize>, Error> {
    let kind = if parser.hard_wrap {
        "linebreak"
    } else {
        "softbreak"
    };
    state.append_token(Node::marker(kind));
    Ok(Some(m.end()))
}
