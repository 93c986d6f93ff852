//! The default HTML backend.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::node::{Node, Payload};
use crate::util::{escape, safe_entity};

use super::Renderer;

/// Renders one node kind. Receives the renderer, the node, and the
/// already-rendered HTML of the node's children when it has any.
pub type RenderFn = Box<dyn Fn(&HtmlRenderer, &Node, Option<&str>) -> String + Send + Sync>;

/// HTML renderer with per-kind overrides.
///
/// Registered render functions take precedence over the built-in ones, so
/// both plugins and applications can change how any node kind is written
/// out. A kind with neither is an [`Error::UnknownNodeType`].
pub struct HtmlRenderer {
    escape: bool,
    allow_harmful_protocols: bool,
    custom: BTreeMap<String, RenderFn>,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlRenderer {
    pub fn new() -> Self {
        HtmlRenderer {
            escape: true,
            allow_harmful_protocols: false,
            custom: BTreeMap::new(),
        }
    }

    /// When turned off, character references already present in the text
    /// are kept instead of being escaped a second time.
    pub fn set_escape(&mut self, on: bool) {
        self.escape = on;
    }

    /// Lets `javascript:` and friends through [`safe_url`](Self::safe_url)
    /// untouched.
    pub fn set_allow_harmful_protocols(&mut self, on: bool) {
        self.allow_harmful_protocols = on;
    }

    /// Registers a render function for a node kind, replacing any earlier
    /// registration and shadowing the built-in rendering.
    pub fn register(&mut self, kind: &str, render: RenderFn) {
        self.custom.insert(kind.to_string(), render);
    }

    /// Replaces the URL of a link pointing at a script-execution scheme
    /// with a harmless fragment. Data URLs are kept for images only.
    pub fn safe_url<'a>(&self, url: &'a str) -> &'a str {
        if self.allow_harmful_protocols {
            return url;
        }
        let harmful = ["javascript:", "vbscript:", "file:", "data:"]
            .iter()
            .any(|scheme| starts_with_ignore_case(url, scheme));
        if harmful && !starts_with_ignore_case(url, "data:image/") {
            return "#harmful-link";
        }
        url
    }

    fn text_html(&self, raw: &str) -> String {
        if self.escape {
            escape(raw)
        } else {
            safe_entity(raw)
        }
    }

    pub fn render_tokens(&self, tokens: &[Node]) -> Result<String, Error> {
        let mut out = String::new();
        for token in tokens {
            out.push_str(&self.render_node(token)?);
        }
        Ok(out)
    }

    pub fn render_node(&self, node: &Node) -> Result<String, Error> {
        let body = match node.children() {
            Some(children) => Some(self.render_tokens(children)?),
            None => None,
        };
        if let Some(custom) = self.custom.get(node.kind.as_str()) {
            return Ok(custom(self, node, body.as_deref()));
        }
        let body = body.unwrap_or_default();
        let html = match node.kind.as_str() {
            "text" => self.text_html(node.as_raw().unwrap_or_default()),
            "paragraph" => format!("<p>{body}</p>\n"),
            "block_text" => body,
            "heading" => {
                let level = node.attr_int("level").unwrap_or(1);
                format!("<h{level}>{body}</h{level}>\n")
            }
            "thematic_break" => "<hr />\n".to_string(),
            "blank_line" => String::new(),
            "block_code" => self.block_code_html(node),
            "block_quote" => format!("<blockquote>\n{body}</blockquote>\n"),
            "block_html" => {
                let raw = node.as_raw().unwrap_or_default();
                format!("{}\n", raw.trim())
            }
            "list" => list_html(node, &body),
            "list_item" => format!("<li>{body}</li>\n"),
            "codespan" => format!("<code>{}</code>", escape(node.as_raw().unwrap_or_default())),
            "emphasis" => format!("<em>{body}</em>"),
            "strong" => format!("<strong>{body}</strong>"),
            "link" => self.link_html(node, &body),
            "image" => self.image_html(node),
            "inline_html" => node.as_raw().unwrap_or_default().to_string(),
            "linebreak" => "<br />\n".to_string(),
            "softbreak" => "\n".to_string(),
            kind => {
                return Err(Error::UnknownNodeType {
                    kind: kind.to_string(),
                });
            }
        };
        Ok(html)
    }

    fn block_code_html(&self, node: &Node) -> String {
        let mut out = String::from("<pre><code");
        if let Some(info) = node.attr_str("info") {
            let info = safe_entity(info);
            if let Some(lang) = info.split_whitespace().next() {
                out.push_str(&format!(" class=\"language-{lang}\""));
            }
        }
        let mut code = escape(node.as_raw().unwrap_or_default());
        if !code.ends_with('\n') {
            code.push('\n');
        }
        out.push('>');
        out.push_str(&code);
        out.push_str("</code></pre>\n");
        out
    }

    fn link_html(&self, node: &Node, body: &str) -> String {
        let url = node.attr_str("url").unwrap_or_default();
        let mut out = format!("<a href=\"{}\"", self.safe_url(url));
        if let Some(title) = node.attr_str("title") {
            out.push_str(&format!(" title=\"{title}\""));
        }
        out.push('>');
        out.push_str(body);
        out.push_str("</a>");
        out
    }

    fn image_html(&self, node: &Node) -> String {
        let url = node.attr_str("url").unwrap_or_default();
        let alt = escape(&plain_text(node));
        let mut out = format!("<img src=\"{}\" alt=\"{alt}\"", self.safe_url(url));
        if let Some(title) = node.attr_str("title") {
            out.push_str(&format!(" title=\"{title}\""));
        }
        out.push_str(" />");
        out
    }
}

impl Renderer for HtmlRenderer {
    type Output = String;

    fn render(&self, tokens: &[Node]) -> Result<String, Error> {
        self.render_tokens(tokens)
    }
}

/// Flattens a subtree to the plain text used for image alt attributes.
/// Markup nodes contribute their text content only; raw HTML is dropped.
pub fn plain_text(node: &Node) -> String {
    let mut out = String::new();
    collect_plain_text(node, &mut out);
    out
}

fn collect_plain_text(node: &Node, out: &mut String) {
    match node.kind.as_str() {
        "linebreak" | "softbreak" => out.push('\n'),
        "inline_html" => {}
        _ => match &node.payload {
            Payload::Raw(raw) | Payload::Text(raw) => out.push_str(raw),
            Payload::Children(children) => {
                for child in children {
                    collect_plain_text(child, out);
                }
            }
            Payload::None => {}
        },
    }
}

fn list_html(node: &Node, body: &str) -> String {
    if node.attr_bool("ordered").unwrap_or(false) {
        match node.attr_int("start") {
            Some(start) => format!("<ol start=\"{start}\">\n{body}</ol>\n"),
            None => format!("<ol>\n{body}</ol>\n"),
        }
    } else {
        format!("<ul>\n{body}</ul>\n")
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(nodes: &[Node]) -> String {
        HtmlRenderer::new().render_tokens(nodes).unwrap()
    }

    #[test]
    fn test_paragraph_with_text() {
        let nodes = vec![Node::container(
            "paragraph",
            vec![Node::raw("text", "hello")],
        )];
        assert_eq!(render(&nodes), "<p>hello</p>\n");
    }

    #[test]
    fn test_text_is_escaped_by_default() {
        let nodes = vec![Node::raw("text", "1 < 2 &amp; more")];
        assert_eq!(render(&nodes), "1 &lt; 2 &amp;amp; more");
    }

    #[test]
    fn test_escape_off_keeps_existing_entities() {
        let mut renderer = HtmlRenderer::new();
        renderer.set_escape(false);
        let nodes = vec![Node::raw("text", "1 < 2 &amp; more")];
        assert_eq!(
            renderer.render_tokens(&nodes).unwrap(),
            "1 &lt; 2 &amp; more"
        );
    }

    #[test]
    fn test_heading_level() {
        let nodes = vec![
            Node::container("heading", vec![Node::raw("text", "t")]).with_attr("level", 3i64),
        ];
        assert_eq!(render(&nodes), "<h3>t</h3>\n");
    }

    #[test]
    fn test_code_block_language_class() {
        let nodes =
            vec![Node::raw("block_code", "let x = 1;\n").with_attr("info", "rust ignore")];
        assert_eq!(
            render(&nodes),
            "<pre><code class=\"language-rust\">let x = 1;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_code_block_without_trailing_newline_gets_one() {
        let nodes = vec![Node::raw("block_code", "x")];
        assert_eq!(render(&nodes), "<pre><code>x\n</code></pre>\n");
    }

    #[test]
    fn test_ordered_list_with_start() {
        let item = Node::container("list_item", vec![Node::raw("text", "a")]);
        let nodes = vec![
            Node::container("list", vec![item])
                .with_attr("ordered", true)
                .with_attr("start", 3i64),
        ];
        assert_eq!(render(&nodes), "<ol start=\"3\">\n<li>a</li>\n</ol>\n");
    }

    #[test]
    fn test_harmful_link_is_neutralized() {
        let nodes = vec![
            Node::container("link", vec![Node::raw("text", "x")])
                .with_attr("url", "JavaScript:alert(1)"),
        ];
        assert_eq!(render(&nodes), "<a href=\"#harmful-link\">x</a>");
    }

    #[test]
    fn test_data_image_url_is_kept() {
        let renderer = HtmlRenderer::new();
        assert_eq!(
            renderer.safe_url("data:image/png;base64,AAAA"),
            "data:image/png;base64,AAAA"
        );
        assert_eq!(renderer.safe_url("data:text/html,x"), "#harmful-link");
    }

    #[test]
    fn test_image_alt_flattens_markup() {
        let children = vec![
            Node::raw("text", "a "),
            Node::container("emphasis", vec![Node::raw("text", "b")]),
        ];
        let nodes = vec![Node::container("image", children).with_attr("url", "/i.png")];
        assert_eq!(render(&nodes), "<img src=\"/i.png\" alt=\"a b\" />");
    }

    #[test]
    fn test_registered_render_fn_shadows_builtin() {
        let mut renderer = HtmlRenderer::new();
        renderer.register(
            "paragraph",
            Box::new(|_, _, body| format!("<div>{}</div>", body.unwrap_or_default())),
        );
        let nodes = vec![Node::container(
            "paragraph",
            vec![Node::raw("text", "x")],
        )];
        assert_eq!(renderer.render_tokens(&nodes).unwrap(), "<div>x</div>");
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let nodes = vec![Node::marker("wat")];
        let err = HtmlRenderer::new().render_tokens(&nodes).unwrap_err();
        assert!(matches!(err, Error::UnknownNodeType { kind } if kind == "wat"));
    }
}
