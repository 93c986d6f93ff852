//! GitHub-style task lists: list items starting with `[ ]` or `[x]`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::markdown::Markdown;
use crate::node::{Node, Payload};
use crate::state::ParseEnv;

static TASK_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([ xX])\]\s+").expect("task item pattern is valid"));

/// Rewrites matching list items before inline resolution, so the marker
/// never reaches the rendered text.
pub fn task_lists(md: &mut Markdown) {
    md.add_before_render_hook(Box::new(rewrite_tree));
    md.renderer_mut().register(
        "task_list_item",
        Box::new(|_, node, body| {
            let mut checkbox =
                String::from("<input class=\"task-list-item-checkbox\" type=\"checkbox\" disabled");
            if node.attr_bool("checked") == Some(true) {
                checkbox.push_str(" checked/>");
            } else {
                checkbox.push_str("/>");
            }
            format!(
                "<li class=\"task-list-item\">{checkbox}{}</li>\n",
                body.unwrap_or_default()
            )
        }),
    );
}

fn rewrite_tree(_md: &Markdown, tokens: &mut Vec<Node>, _env: &mut ParseEnv) -> Result<(), Error> {
    rewrite_all(tokens);
    Ok(())
}

fn rewrite_all(tokens: &mut [Node]) {
    for token in tokens {
        if token.kind == "list"
            && let Some(items) = token.children_mut()
        {
            for item in items.iter_mut() {
                rewrite_item(item);
            }
        }
        if let Some(children) = token.children_mut() {
            rewrite_all(children);
        }
    }
}

fn rewrite_item(item: &mut Node) {
    if item.kind != "list_item" {
        return;
    }
    let Some(children) = item.children_mut() else {
        return;
    };
    let Some(first) = children.first_mut() else {
        return;
    };
    let Payload::Text(text) = &mut first.payload else {
        return;
    };
    let Some(m) = TASK_ITEM_RE.captures(text) else {
        return;
    };
    let checked = &m[1] != " ";
    let rest = text[m.get(0).map_or(0, |g| g.end())..].to_string();
    first.payload = Payload::Text(rest);
    item.kind = "task_list_item".to_string();
    item.set_attr("checked", checked);
}
