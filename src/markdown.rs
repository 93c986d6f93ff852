//! The document pipeline: preprocess, block pass, hooks, inline
//! resolution, document resolvers, then rendering.

use crate::block_parser::{BlockParser, DEFAULT_MAX_NESTED_LEVEL};
use crate::error::Error;
use crate::inline_parser::InlineParser;
use crate::node::{Node, Payload};
use crate::renderer::{HtmlRenderer, Renderer};
use crate::state::{BlockState, InlineState, ParseEnv};

/// Installs rules, hooks, and render functions on a [`Markdown`] instance.
pub type Plugin = fn(&mut Markdown);

/// A pass over the whole document tree.
///
/// Hooks added with [`Markdown::add_before_render_hook`] run after the
/// block pass, while leaves still hold unresolved text. Hooks added with
/// [`Markdown::add_resolver`] run after inline resolution, when
/// everything collected in the [`ParseEnv`] is known.
pub type RenderHook =
    Box<dyn Fn(&Markdown, &mut Vec<Node>, &mut ParseEnv) -> Result<(), Error> + Send + Sync>;

/// A configured markdown processor.
///
/// The two parsers and the renderer are plain fields behind accessors, so
/// rules and render functions can be changed after construction; parsing
/// itself takes `&self` and is reusable across documents.
pub struct Markdown {
    block: BlockParser,
    inline: InlineParser,
    renderer: HtmlRenderer,
    before_render_hooks: Vec<RenderHook>,
    resolvers: Vec<RenderHook>,
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Markdown {
    pub fn new() -> Self {
        Markdown {
            block: BlockParser::new(),
            inline: InlineParser::new(),
            renderer: HtmlRenderer::new(),
            before_render_hooks: Vec::new(),
            resolvers: Vec::new(),
        }
    }

    pub fn builder() -> MarkdownBuilder {
        MarkdownBuilder::new()
    }

    pub fn block_parser(&self) -> &BlockParser {
        &self.block
    }

    pub fn block_parser_mut(&mut self) -> &mut BlockParser {
        &mut self.block
    }

    pub fn inline_parser(&self) -> &InlineParser {
        &self.inline
    }

    pub fn inline_parser_mut(&mut self) -> &mut InlineParser {
        &mut self.inline
    }

    pub fn renderer(&self) -> &HtmlRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut HtmlRenderer {
        &mut self.renderer
    }

    pub fn add_before_render_hook(&mut self, hook: RenderHook) {
        self.before_render_hooks.push(hook);
    }

    pub fn add_resolver(&mut self, resolver: RenderHook) {
        self.resolvers.push(resolver);
    }

    pub fn use_plugin(&mut self, plugin: Plugin) -> &mut Self {
        plugin(self);
        self
    }

    /// Parses a document to a resolved node tree plus the environment
    /// collected on the way.
    pub fn parse(&self, src: &str) -> Result<(Vec<Node>, ParseEnv), Error> {
        let mut state = BlockState::new(preprocess(src));
        self.block.parse(&mut state)?;
        let (mut tokens, mut env) = state.finish();
        log::debug!("block pass produced {} top-level tokens", tokens.len());
        for hook in &self.before_render_hooks {
            hook(self, &mut tokens, &mut env)?;
        }
        self.resolve_inline(&mut tokens, &mut env)?;
        for resolver in &self.resolvers {
            resolver(self, &mut tokens, &mut env)?;
        }
        Ok((tokens, env))
    }

    /// Parses a document and returns the resolved tree. The nodes
    /// serialize with serde, so this is the AST entry point.
    pub fn parse_to_ast(&self, src: &str) -> Result<Vec<Node>, Error> {
        let (tokens, _env) = self.parse(src)?;
        Ok(tokens)
    }

    /// Parses and renders with the built-in HTML renderer.
    pub fn render(&self, src: &str) -> Result<String, Error> {
        let (tokens, _env) = self.parse(src)?;
        self.renderer.render(&tokens)
    }

    /// Parses and renders with a caller-supplied renderer.
    pub fn render_with<R: Renderer>(&self, src: &str, renderer: &R) -> Result<R::Output, Error> {
        let (tokens, _env) = self.parse(src)?;
        renderer.render(&tokens)
    }

    /// Replaces every text leaf with its parsed inline children.
    ///
    /// Tight lists are handled here as well: their items' paragraphs
    /// become bare `block_text` nodes before resolution, so the renderer
    /// never needs to know about tightness. Resolvers that synthesize new
    /// blocks, such as a footnotes section, call this on them too.
    pub(crate) fn resolve_inline(&self, nodes: &mut [Node], env: &mut ParseEnv) -> Result<(), Error> {
        for node in nodes.iter_mut() {
            if node.kind == "list" && node.attr_bool("tight") == Some(true) {
                flatten_tight_items(node);
            }
            match std::mem::replace(&mut node.payload, Payload::None) {
                Payload::Text(text) => {
                    let mut state = InlineState::new(env);
                    let children = self
                        .inline
                        .parse_tokens(text.trim().to_string(), &mut state)?;
                    node.payload = Payload::Children(children);
                }
                Payload::Children(mut children) => {
                    self.resolve_inline(&mut children, env)?;
                    node.payload = Payload::Children(children);
                }
                other => node.payload = other,
            }
        }
        Ok(())
    }
}

fn flatten_tight_items(list: &mut Node) {
    let Some(items) = list.children_mut() else {
        return;
    };
    for item in items {
        let Some(children) = item.children_mut() else {
            continue;
        };
        for child in children {
            if child.kind == "paragraph" {
                child.kind = "block_text".to_string();
            }
        }
    }
}

/// Normalizes line endings to `\n` and replaces NUL bytes before any
/// rule sees the source.
fn preprocess(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// Builder for a [`Markdown`] processor.
pub struct MarkdownBuilder {
    escape: bool,
    hard_wrap: bool,
    allow_harmful_protocols: bool,
    max_nested_level: usize,
    plugins: Vec<Plugin>,
}

impl Default for MarkdownBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        MarkdownBuilder {
            escape: true,
            hard_wrap: false,
            allow_harmful_protocols: false,
            max_nested_level: DEFAULT_MAX_NESTED_LEVEL,
            plugins: Vec::new(),
        }
    }

    /// Whether text leaves are HTML-escaped from scratch. When off,
    /// character references written in the source are preserved.
    pub fn escape(mut self, on: bool) -> Self {
        self.escape = on;
        self
    }

    /// Render every soft line break as `<br />`.
    pub fn hard_wrap(mut self, on: bool) -> Self {
        self.hard_wrap = on;
        self
    }

    pub fn allow_harmful_protocols(mut self, on: bool) -> Self {
        self.allow_harmful_protocols = on;
        self
    }

    /// Maximum nesting depth for containers in both phases.
    pub fn max_nested_level(mut self, limit: usize) -> Self {
        self.max_nested_level = limit;
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn build(self) -> Markdown {
        let mut md = Markdown::new();
        md.renderer.set_escape(self.escape);
        md.renderer
            .set_allow_harmful_protocols(self.allow_harmful_protocols);
        md.inline.set_hard_wrap(self.hard_wrap);
        md.block.set_max_nested_level(self.max_nested_level);
        md.inline.set_max_nested_level(self.max_nested_level);
        for plugin in self.plugins {
            plugin(&mut md);
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(src: &str) -> String {
        Markdown::new().render(src).unwrap()
    }

    #[test]
    fn test_paragraph_with_emphasis() {
        assert_eq!(
            render("hello *world*"),
            "<p>hello <em>world</em></p>\n"
        );
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            render("# Title\n\nBody text.\n"),
            "<h1>Title</h1>\n<p>Body text.</p>\n"
        );
    }

    #[test]
    fn test_setext_heading_renders() {
        assert_eq!(render("Title\n=====\n"), "<h1>Title</h1>\n");
    }

    #[test]
    fn test_reference_defined_after_use() {
        let html = render("See [docs][1].\n\n[1]: http://example.com\n");
        assert_eq!(
            html,
            "<p>See <a href=\"http://example.com\">docs</a>.</p>\n"
        );
    }

    #[test]
    fn test_tight_list_items_have_no_paragraphs() {
        assert_eq!(
            render("- a\n- b\n"),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_loose_list_items_keep_paragraphs() {
        assert_eq!(
            render("- a\n\n- b\n"),
            "<ul>\n<li><p>a</p>\n</li>\n<li><p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_block_quote_renders() {
        assert_eq!(
            render("> quoted\n"),
            "<blockquote>\n<p>quoted</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn test_fenced_code_renders() {
        assert_eq!(
            render("```rust\nlet x = 1;\n```\n"),
            "<pre><code class=\"language-rust\">let x = 1;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_crlf_and_nul_are_normalized() {
        assert_eq!(preprocess("a\r\nb\rc\0d"), "a\nb\nc\u{FFFD}d");
        assert_eq!(render("# a\r\n\r\nb\r\n"), "<h1>a</h1>\n<p>b</p>\n");
    }

    #[test]
    fn test_hard_wrap_option() {
        let md = Markdown::builder().hard_wrap(true).build();
        assert_eq!(md.render("a\nb").unwrap(), "<p>a<br />\nb</p>\n");
    }

    #[test]
    fn test_escape_off_keeps_entities() {
        let md = Markdown::builder().escape(false).build();
        assert_eq!(md.render("AT&amp;T").unwrap(), "<p>AT&amp;T</p>\n");
        assert_eq!(render("AT&amp;T"), "<p>AT&amp;amp;T</p>\n");
    }

    #[test]
    fn test_nesting_limit_aborts() {
        let md = Markdown::builder().max_nested_level(3).build();
        let src = "> > > > > deep\n";
        assert!(matches!(
            md.render(src),
            Err(Error::DepthExceeded { limit: 3 })
        ));
    }

    #[test]
    fn test_ast_serializes_to_json() {
        let nodes = Markdown::new().parse_to_ast("# h\n").unwrap();
        let json = serde_json::to_value(&nodes).unwrap();
        assert_eq!(json[0]["type"], "heading");
        assert_eq!(json[0]["attrs"]["level"], 1);
        assert_eq!(json[0]["children"][0]["raw"], "h");
    }

    #[test]
    fn test_custom_renderer_through_render_with() {
        use crate::renderer::Renderer;

        struct KindLister;
        impl Renderer for KindLister {
            type Output = Vec<String>;
            fn render(&self, tokens: &[Node]) -> Result<Vec<String>, Error> {
                Ok(tokens.iter().map(|t| t.kind.clone()).collect())
            }
        }
        let kinds = Markdown::new()
            .render_with("# a\ntext\n", &KindLister)
            .unwrap();
        assert_eq!(kinds, vec!["heading".to_string(), "paragraph".to_string()]);
    }
}
