//! Output backends for a parsed node tree.
//!
//! The parse phases never produce output themselves; they hand a tree of
//! [`Node`](crate::node::Node)s to a [`Renderer`]. The bundled
//! [`HtmlRenderer`] covers HTML; anything else, from ANSI terminal output
//! to a token stream for testing, is a matter of implementing the trait.

pub mod html;

pub use html::{HtmlRenderer, RenderFn};

use crate::error::Error;
use crate::node::Node;

/// Turns a resolved node tree into output.
pub trait Renderer {
    type Output;

    fn render(&self, tokens: &[Node]) -> Result<Self::Output, Error>;
}
