//! Ordered rule registries for the block and inline phases.
//!
//! A registry holds named rules in an explicit order; scan order is
//! registration order, and relative insertion with [`Position`] is the only
//! way to change it. Rules cannot be registered while a parse is running:
//! parsing borrows the registry shared, mutation requires it exclusive, so
//! the single-writer discipline is enforced at compile time.

use std::fmt;
use std::ops::Range;

use regex::{Regex, RegexBuilder};

use crate::error::Error;

/// The parsing phase a registry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Block,
    Inline,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Block => f.write_str("block"),
            Phase::Inline => f.write_str("inline"),
        }
    }
}

/// Where a new rule lands relative to the rules already registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// After every existing rule.
    Append,
    /// Immediately before the named rule.
    Before(String),
    /// Immediately after the named rule.
    After(String),
}

impl Position {
    pub fn before(name: &str) -> Self {
        Position::Before(name.to_string())
    }

    pub fn after(name: &str) -> Self {
        Position::After(name.to_string())
    }
}

/// A resolved trigger match.
///
/// Carries byte spans into the frame source rather than borrowed slices, so
/// handlers can hold one while mutating parse state. Group 0 is the whole
/// match; further groups follow the trigger pattern's capture groups.
#[derive(Debug, Clone)]
pub struct Matched {
    start: usize,
    end: usize,
    groups: Vec<Option<(usize, usize)>>,
}

impl Matched {
    fn from_captures(caps: &regex::Captures, offset: usize) -> Self {
        let groups = (0..caps.len())
            .map(|i| caps.get(i).map(|g| (g.start() + offset, g.end() + offset)))
            .collect();
        Matched {
            start: caps.get(0).map(|g| g.start() + offset).unwrap_or(offset),
            end: caps.get(0).map(|g| g.end() + offset).unwrap_or(offset),
            groups,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The byte span of a capture group, if it participated in the match.
    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        self.groups
            .get(index)
            .copied()
            .flatten()
            .map(|(start, end)| start..end)
    }
}

/// A named rule: a compiled trigger and its handler.
pub struct Rule<H> {
    name: String,
    trigger: Regex,
    handler: H,
}

impl<H> Rule<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Matches the trigger anchored at `at`. Block triggers are compiled
    /// anchored, so this is how the block engine probes a rule.
    pub fn try_match_at(&self, src: &str, at: usize) -> Option<Matched> {
        self.trigger
            .captures(&src[at..])
            .map(|caps| Matched::from_captures(&caps, at))
    }

    /// Finds the earliest trigger match at or after `from`. This is the
    /// inline engine's probe; inline triggers are compiled unanchored.
    pub fn find_from(&self, src: &str, from: usize) -> Option<Matched> {
        self.trigger
            .captures_at(src, from)
            .map(|caps| Matched::from_captures(&caps, 0))
    }
}

/// An ordered collection of rules for one phase.
pub struct Registry<H> {
    phase: Phase,
    rules: Vec<Rule<H>>,
}

impl<H> Registry<H> {
    pub fn new(phase: Phase) -> Self {
        Registry {
            phase,
            rules: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Rules in scan order.
    pub fn ordered_rules(&self) -> impl Iterator<Item = &Rule<H>> {
        self.rules.iter()
    }

    /// Rule names in scan order.
    pub fn ordered_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Rule<H>> {
        self.index_of(name).map(|i| &self.rules[i])
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.name == name)
    }

    /// Registers a rule. The trigger pattern is compiled once, here;
    /// ordering errors and name collisions are also caught here, before
    /// the rule can affect any parse.
    pub fn register(
        &mut self,
        name: &str,
        pattern: &str,
        handler: H,
        position: Position,
    ) -> Result<(), Error> {
        if self.contains(name) {
            return Err(Error::Duplicate {
                phase: self.phase,
                name: name.to_string(),
            });
        }
        let index = match &position {
            Position::Append => self.rules.len(),
            Position::Before(reference) => {
                self.index_of(reference).ok_or_else(|| Error::Ordering {
                    phase: self.phase,
                    reference: reference.clone(),
                })?
            }
            Position::After(reference) => {
                self.index_of(reference).ok_or_else(|| Error::Ordering {
                    phase: self.phase,
                    reference: reference.clone(),
                })? + 1
            }
        };
        let trigger = self.compile(name, pattern)?;
        self.rules.insert(
            index,
            Rule {
                name: name.to_string(),
                trigger,
                handler,
            },
        );
        Ok(())
    }

    /// Removes a rule by name.
    pub fn remove(&mut self, name: &str) -> Result<(), Error> {
        match self.index_of(name) {
            Some(index) => {
                self.rules.remove(index);
                Ok(())
            }
            None => Err(Error::NotFound {
                phase: self.phase,
                name: name.to_string(),
            }),
        }
    }

    fn compile(&self, name: &str, pattern: &str) -> Result<Regex, Error> {
        let result = match self.phase {
            // Block triggers only ever fire at the cursor, which sits at a
            // line start, so they are anchored and line-aware.
            Phase::Block => RegexBuilder::new(&format!(r"\A(?:{pattern})"))
                .multi_line(true)
                .build(),
            Phase::Inline => Regex::new(pattern),
        };
        result.map_err(|source| Error::Pattern {
            name: name.to_string(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry<u32> {
        let mut reg = Registry::new(Phase::Block);
        reg.register("alpha", "a+", 1, Position::Append).unwrap();
        reg.register("gamma", "g+", 3, Position::Append).unwrap();
        reg
    }

    #[test]
    fn test_append_preserves_registration_order() {
        let reg = registry();
        assert_eq!(reg.ordered_names(), vec!["alpha", "gamma"]);
    }

    #[test]
    fn test_before_and_after_insertion() {
        let mut reg = registry();
        reg.register("beta", "b+", 2, Position::before("gamma"))
            .unwrap();
        reg.register("delta", "d+", 4, Position::after("gamma"))
            .unwrap();
        assert_eq!(reg.ordered_names(), vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn test_ordering_error_names_the_missing_rule() {
        let mut reg = registry();
        let err = reg
            .register("beta", "b+", 2, Position::before("nonexistent"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ordering { reference, .. } if reference == "nonexistent"
        ));
        // The failed registration must not have touched the order.
        assert_eq!(reg.ordered_names(), vec!["alpha", "gamma"]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut reg = registry();
        let err = reg.register("alpha", "x", 9, Position::Append).unwrap_err();
        assert!(matches!(err, Error::Duplicate { name, .. } if name == "alpha"));
    }

    #[test]
    fn test_bad_pattern_is_rejected_at_registration() {
        let mut reg = registry();
        let err = reg.register("broken", "(unclosed", 9, Position::Append);
        assert!(matches!(err, Err(Error::Pattern { name, .. }) if name == "broken"));
        assert!(!reg.contains("broken"));
    }

    #[test]
    fn test_remove_unknown_rule_errors() {
        let mut reg = registry();
        assert!(reg.remove("alpha").is_ok());
        assert!(matches!(
            reg.remove("alpha"),
            Err(Error::NotFound { name, .. }) if name == "alpha"
        ));
    }

    #[test]
    fn test_block_triggers_are_anchored() {
        let reg = registry();
        let rule = reg.get("alpha").unwrap();
        assert!(rule.try_match_at("aaab", 0).is_some());
        // Not at the probe position: no match, even though "a" occurs later.
        assert!(rule.try_match_at("baaa", 0).is_none());
        let m = rule.try_match_at("xaaa", 1).unwrap();
        assert_eq!(m.range(), 1..4);
    }

    #[test]
    fn test_inline_triggers_search_forward() {
        let mut reg = Registry::new(Phase::Inline);
        reg.register("code", "`+", 1, Position::Append).unwrap();
        let rule = reg.get("code").unwrap();
        let m = rule.find_from("ab `code`", 0).unwrap();
        assert_eq!(m.range(), 3..4);
        let m = rule.find_from("ab `code`", 4).unwrap();
        assert_eq!(m.range(), 8..9);
    }

    #[test]
    fn test_group_spans_are_absolute() {
        let mut reg = Registry::new(Phase::Block);
        reg.register("pair", "(x+)(y+)", 1, Position::Append).unwrap();
        let src = "..xxyy";
        let m = reg.get("pair").unwrap().try_match_at(src, 2).unwrap();
        assert_eq!(m.group(1), Some(2..4));
        assert_eq!(m.group(2), Some(4..6));
        assert_eq!(&src[m.group(2).unwrap()], "yy");
    }
}
