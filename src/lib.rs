pub mod block_parser;
pub mod error;
pub mod helpers;
pub mod inline_parser;
pub mod markdown;
pub mod node;
pub mod plugins;
pub mod registry;
pub mod renderer;
pub mod state;
pub mod util;

pub use error::Error;
pub use markdown::Markdown;
pub use markdown::MarkdownBuilder;
pub use markdown::Plugin;
pub use markdown::RenderHook;
pub use node::AttrValue;
pub use node::Node;
pub use node::Payload;
pub use renderer::HtmlRenderer;
pub use renderer::Renderer;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Converts markdown to HTML with the common extensions enabled.
///
/// Strikethrough, tables, and footnotes are on, and character references
/// written in the source are preserved rather than escaped again. For any
/// other combination, configure a processor through [`Markdown::builder`].
///
/// # Examples
///
/// ```
/// let html = plume::html("# Title\n\nSome *text*.\n").unwrap();
/// assert_eq!(html, "<h1>Title</h1>\n<p>Some <em>text</em>.</p>\n");
/// ```
///
/// # Arguments
///
/// * `input` - The markdown document to convert
pub fn html(input: &str) -> Result<String, Error> {
    #[cfg(debug_assertions)]
    {
        init_logger();
    }

    let md = Markdown::builder()
        .escape(false)
        .plugin(plugins::strikethrough)
        .plugin(plugins::table)
        .plugin(plugins::footnotes)
        .build();
    md.render(input)
}

/// Parses markdown into its node tree without rendering it.
///
/// # Examples
///
/// ```
/// let tree = plume::parse("# Heading\n\nParagraph text.\n").unwrap();
/// assert_eq!(tree[0].kind, "heading");
/// ```
///
/// # Arguments
///
/// * `input` - The markdown document to parse
pub fn parse(input: &str) -> Result<Vec<Node>, Error> {
    Markdown::new().parse_to_ast(input)
}
