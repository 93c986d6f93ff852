//! Parse state shared across rules and phases.
//!
//! State is layered: document-scoped collections live in [`ParseEnv`] and
//! survive from the block pass into inline resolution, while per-source
//! fields (source text, cursor, output tokens) live in frames. Entering a
//! container pushes a frame, leaving it pops the frame, so nested parses
//! never clobber their parent's cursor. The frame count doubles as the
//! nesting depth and is what the depth limit checks against.

use std::collections::{BTreeMap, HashMap};

use crate::error::Error;
use crate::node::{Node, Payload};

/// A link reference definition collected during the block pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDef {
    /// Encoded destination, ready for an `href` attribute.
    pub url: String,
    /// Entity-escaped title, if the definition carried one.
    pub title: Option<String>,
    /// The label as written at the definition site.
    pub label: String,
}

/// Document-scoped environment: definitions collected by the block pass and
/// consumed during inline resolution.
#[derive(Debug, Default)]
pub struct ParseEnv {
    ref_links: HashMap<String, LinkDef>,
    footnotes: HashMap<String, String>,
    footnote_order: Vec<String>,
    abbrs: BTreeMap<String, String>,
}

impl ParseEnv {
    /// Records a link reference definition. The first definition of a key
    /// wins; later duplicates are ignored.
    pub fn add_ref_link(&mut self, key: String, def: LinkDef) {
        self.ref_links.entry(key).or_insert(def);
    }

    pub fn ref_link(&self, key: &str) -> Option<&LinkDef> {
        self.ref_links.get(key)
    }

    /// Records a footnote definition. First definition wins.
    pub fn add_footnote(&mut self, key: String, body: String) {
        self.footnotes.entry(key).or_insert(body);
    }

    pub fn footnote(&self, key: &str) -> Option<&str> {
        self.footnotes.get(key).map(String::as_str)
    }

    /// Assigns the footnote its reference index, in first-use order. A key
    /// that was already referenced keeps its original index; a key with no
    /// definition gets none at all.
    pub fn claim_footnote_index(&mut self, key: &str) -> Option<usize> {
        if !self.footnotes.contains_key(key) {
            return None;
        }
        if let Some(i) = self.footnote_order.iter().position(|k| k == key) {
            return Some(i + 1);
        }
        self.footnote_order.push(key.to_string());
        Some(self.footnote_order.len())
    }

    /// Footnote keys that were actually referenced, in first-use order.
    pub fn used_footnotes(&self) -> &[String] {
        &self.footnote_order
    }

    /// Records an abbreviation. First definition wins.
    pub fn add_abbr(&mut self, term: String, description: String) {
        self.abbrs.entry(term).or_insert(description);
    }

    pub fn abbrs(&self) -> &BTreeMap<String, String> {
        &self.abbrs
    }
}

#[derive(Debug)]
struct Frame {
    src: String,
    cursor: usize,
    tokens: Vec<Node>,
}

impl Frame {
    fn new(mut src: String) -> Self {
        // Every non-empty frame source ends with a newline, so line-oriented
        // rules can rely on one being there.
        if !src.is_empty() && !src.ends_with('\n') {
            src.push('\n');
        }
        Frame {
            src,
            cursor: 0,
            tokens: Vec::new(),
        }
    }
}

/// State threaded through the block pass.
#[derive(Debug)]
pub struct BlockState {
    frames: Vec<Frame>,
    pub env: ParseEnv,
}

impl BlockState {
    pub fn new(src: String) -> Self {
        BlockState {
            frames: vec![Frame::new(src)],
            env: ParseEnv::default(),
        }
    }

    fn frame(&self) -> &Frame {
        self.frames.last().expect("state always has a root frame")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("state always has a root frame")
    }

    /// The source text of the innermost frame.
    pub fn src(&self) -> &str {
        &self.frame().src
    }

    pub fn cursor(&self) -> usize {
        self.frame().cursor
    }

    pub fn set_cursor(&mut self, pos: usize) {
        self.frame_mut().cursor = pos;
    }

    pub fn cursor_max(&self) -> usize {
        self.frame().src.len()
    }

    /// Nesting depth: zero at the document level.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Position just past the current line's newline.
    pub fn find_line_end(&self) -> usize {
        let frame = self.frame();
        match frame.src[frame.cursor..].find('\n') {
            Some(i) => frame.cursor + i + 1,
            None => frame.src.len(),
        }
    }

    /// Source text from the cursor up to `end`.
    pub fn get_text(&self, end: usize) -> &str {
        let frame = self.frame();
        &frame.src[frame.cursor..end]
    }

    pub fn append_token(&mut self, token: Node) {
        self.frame_mut().tokens.push(token);
    }

    /// Inserts a token just before the most recently appended one. Rules
    /// that consume a construct which terminates their own container use
    /// this to keep document order intact.
    pub fn prepend_token(&mut self, token: Node) {
        let tokens = &mut self.frame_mut().tokens;
        let at = tokens.len().saturating_sub(1);
        tokens.insert(at, token);
    }

    pub fn last_token(&self) -> Option<&Node> {
        self.frame().tokens.last()
    }

    pub fn last_token_mut(&mut self) -> Option<&mut Node> {
        self.frame_mut().tokens.last_mut()
    }

    /// Takes the current line span up to `end` as paragraph text, merging
    /// into a trailing paragraph when one is open, and moves the cursor
    /// past it.
    pub fn add_paragraph(&mut self, end: usize) {
        let frame = self.frame_mut();
        let text = frame.src[frame.cursor..end].to_string();
        if let Some(last) = frame.tokens.last_mut()
            && last.kind == "paragraph"
            && let Payload::Text(existing) = &mut last.payload
        {
            existing.push_str(&text);
        } else {
            frame.tokens.push(Node::text("paragraph", text));
        }
        frame.cursor = end;
    }

    /// If a paragraph is open, folds the current line into it and returns
    /// the position after that line. Rules that cannot interrupt a
    /// paragraph call this first and yield when it succeeds.
    pub fn append_paragraph(&mut self) -> Option<usize> {
        let pos = self.find_line_end();
        let frame = self.frame_mut();
        if let Some(last) = frame.tokens.last_mut()
            && last.kind == "paragraph"
            && let Payload::Text(existing) = &mut last.payload
        {
            existing.push_str(&frame.src[frame.cursor..pos]);
            Some(pos)
        } else {
            None
        }
    }

    /// Enters a nested source. Fails when the frame count would pass
    /// `limit`; the parse is aborted rather than silently degraded.
    pub fn push_frame(&mut self, src: String, limit: usize) -> Result<(), Error> {
        if self.frames.len() >= limit {
            return Err(Error::DepthExceeded { limit });
        }
        self.frames.push(Frame::new(src));
        Ok(())
    }

    /// Leaves a nested source, yielding the tokens it produced.
    pub fn pop_frame(&mut self) -> Vec<Node> {
        debug_assert!(self.frames.len() > 1, "pop_frame without a matching push_frame");
        self.frames.pop().map(|f| f.tokens).unwrap_or_default()
    }

    /// Document-level tokens, for hooks that rewrite the tree between the
    /// block pass and inline resolution.
    pub fn tokens_mut(&mut self) -> &mut Vec<Node> {
        &mut self.frames[0].tokens
    }

    /// Tears the state down into the document tokens and the environment.
    pub fn finish(mut self) -> (Vec<Node>, ParseEnv) {
        let tokens = std::mem::take(&mut self.frames[0].tokens);
        (tokens, self.env)
    }
}

/// State threaded through inline parsing of one leaf's text.
///
/// The environment is borrowed from the enclosing document parse, so
/// reference lookups see every definition the block pass collected, no
/// matter where the leaf sits in the tree. The flags are scoped manually:
/// a rule that sets one for a nested parse restores it afterwards.
#[derive(Debug)]
pub struct InlineState<'env> {
    pub env: &'env mut ParseEnv,
    frames: Vec<Frame>,
    pub in_link: bool,
    pub in_image: bool,
    pub in_emphasis: bool,
    pub in_strong: bool,
}

impl<'env> InlineState<'env> {
    pub fn new(env: &'env mut ParseEnv) -> Self {
        InlineState {
            env,
            frames: Vec::new(),
            in_link: false,
            in_image: false,
            in_emphasis: false,
            in_strong: false,
        }
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("inline state has no active frame")
    }

    /// The source text of the innermost frame.
    pub fn src(&self) -> &str {
        self.frames.last().map(|f| f.src.as_str()).unwrap_or("")
    }

    /// Inline nesting depth, counting the outermost text as one.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_frame(&mut self, src: String, limit: usize) -> Result<(), Error> {
        if self.frames.len() >= limit {
            return Err(Error::DepthExceeded { limit });
        }
        // Inline sources are not line-oriented; no trailing newline here.
        self.frames.push(Frame {
            src,
            cursor: 0,
            tokens: Vec::new(),
        });
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Vec<Node> {
        self.frames.pop().map(|f| f.tokens).unwrap_or_default()
    }

    pub fn append_token(&mut self, token: Node) {
        self.frame_mut().tokens.push(token);
    }

    /// Emits literal text, merging into a trailing text node so runs of
    /// literals come out as one node.
    pub fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let tokens = &mut self.frame_mut().tokens;
        if let Some(last) = tokens.last_mut()
            && last.kind == "text"
            && let Payload::Raw(raw) = &mut last.payload
        {
            raw.push_str(text);
        } else {
            tokens.push(Node::raw("text", text));
        }
    }

    /// Number of tokens in the active frame. Paired with
    /// [`truncate_tokens`](Self::truncate_tokens) to roll back a
    /// speculative parse.
    pub fn token_count(&self) -> usize {
        self.frames.last().map(|f| f.tokens.len()).unwrap_or(0)
    }

    pub fn truncate_tokens(&mut self, len: usize) {
        self.frame_mut().tokens.truncate(len);
    }

    /// Inserts a token at `at` in the active frame.
    pub fn insert_token(&mut self, at: usize, token: Node) {
        self.frame_mut().tokens.insert(at, token);
    }
}
