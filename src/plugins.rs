//! Optional syntax, shipped as plugins.
//!
//! A plugin is a plain `fn(&mut Markdown)` that registers block or inline
//! rules, tree hooks, and render functions. Apply one with
//! [`Markdown::use_plugin`](crate::markdown::Markdown::use_plugin) or
//! [`MarkdownBuilder::plugin`](crate::markdown::MarkdownBuilder::plugin):
//!
//! ```
//! use plume::Markdown;
//! use plume::plugins;
//!
//! let md = Markdown::builder()
//!     .plugin(plugins::strikethrough)
//!     .plugin(plugins::table)
//!     .build();
//! assert_eq!(
//!     md.render("~~gone~~").unwrap(),
//!     "<p><del>gone</del></p>\n"
//! );
//! ```

pub mod abbr;
pub mod def_list;
pub mod footnotes;
pub mod formatting;
pub mod math;
pub mod ruby;
pub mod spoiler;
pub mod table;
pub mod task_lists;
pub mod url;

pub use abbr::abbr;
pub use def_list::def_list;
pub use footnotes::footnotes;
pub use formatting::{insert, mark, strikethrough, subscript, superscript};
pub use math::math;
pub use ruby::ruby;
pub use spoiler::spoiler;
pub use table::table;
pub use task_lists::task_lists;
pub use url::url;
