//! Bare `http(s)://` URLs become links without angle brackets.

use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::Position;
use crate::util::escape_url;

/// The trailing character class keeps common punctuation after a URL out
/// of the link target.
const URL_PATTERN: &str = r#"https?://[^\s<]+[^<.,:;"')\]\s]"#;

pub fn url(md: &mut Markdown) {
    md.inline_parser_mut()
        .register(
            "url_link",
            URL_PATTERN,
            Box::new(|_, m, state| {
                let text = state.src()[m.range()].to_string();
                if state.in_link {
                    state.append_text(&text);
                    return Ok(Some(m.end()));
                }
                let token = Node::container("link", vec![Node::raw("text", text.clone())])
                    .with_attr("url", escape_url(&text));
                state.append_token(token);
                Ok(Some(m.end()))
            }),
            Position::before("auto_link"),
        )
        .expect("default rule `auto_link` is registered");
}
