//! GFM tables, in the piped form and the bare "np" form without outer
//! pipes. Cell text goes through inline resolution like any other text.

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::BlockState;

const TABLE_PATTERN: &str = r" {0,3}\|(.+)\|[ \t]*\n {0,3}\|( *[-:]+[-| :]*)\|[ \t]*\n((?: {0,3}\|.*\|[ \t]*(?:\n|$))*)\n*";

const NP_TABLE_PATTERN: &str =
    r" {0,3}(\S.*\|.*)\n {0,3}([-:]+ *\|[-| :]*)\n((?:.*\|.*(?:\n|$))*)\n*";

/// Enables tables. The delimiter row fixes the column count; a header or
/// body row with a different count rejects the whole table.
pub fn table(md: &mut Markdown) {
    md.block_parser_mut()
        .register(
            "table",
            TABLE_PATTERN,
            Box::new(parse_table),
            Position::before("list"),
        )
        .expect("default rule `list` is registered");
    md.block_parser_mut()
        .register(
            "nptable",
            NP_TABLE_PATTERN,
            Box::new(parse_nptable),
            Position::before("list"),
        )
        .expect("default rule `list` is registered");

    let renderer = md.renderer_mut();
    renderer.register(
        "table",
        Box::new(|_, _, body| format!("<table>\n{}</table>\n", body.unwrap_or_default())),
    );
    renderer.register(
        "table_head",
        Box::new(|_, _, body| {
            format!("<thead>\n<tr>\n{}</tr>\n</thead>\n", body.unwrap_or_default())
        }),
    );
    renderer.register(
        "table_body",
        Box::new(|_, _, body| format!("<tbody>\n{}</tbody>\n", body.unwrap_or_default())),
    );
    renderer.register(
        "table_row",
        Box::new(|_, _, body| format!("<tr>\n{}</tr>\n", body.unwrap_or_default())),
    );
    renderer.register(
        "table_cell",
        Box::new(|_, node, body| {
            let tag = if node.attr_bool("head") == Some(true) {
                "th"
            } else {
                "td"
            };
            let mut html = format!("  <{tag}");
            if let Some(align) = node.attr_str("align") {
                html.push_str(&format!(" style=\"text-align:{align}\""));
            }
            html.push('>');
            html.push_str(body.unwrap_or_default());
            html.push_str(&format!("</{tag}>\n"));
            html
        }),
    );
}

fn parse_table(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let token = {
        let src = state.src();
        let head = m.group(1).map_or("", |r| &src[r]);
        let align = m.group(2).map_or("", |r| &src[r]);
        let body = m.group(3).map_or("", |r| &src[r]);
        build_table(head, align, body, true)
    };
    match token {
        Some(token) => {
            state.append_token(token);
            Ok(Some(m.end()))
        }
        None => Ok(None),
    }
}

fn parse_nptable(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let token = {
        let src = state.src();
        let head = m.group(1).map_or("", |r| &src[r]);
        let align = m.group(2).map_or("", |r| &src[r]);
        let body = m.group(3).map_or("", |r| &src[r]);
        build_table(head, align, body, false)
    };
    match token {
        Some(token) => {
            state.append_token(token);
            Ok(Some(m.end()))
        }
        None => Ok(None),
    }
}

fn build_table(head: &str, align: &str, body: &str, outer_pipes: bool) -> Option<Node> {
    let aligns: Vec<Option<&'static str>> =
        split_cells(align).iter().map(|c| classify_align(c)).collect();
    let head_cells = split_cells(head);
    if head_cells.len() != aligns.len() {
        return None;
    }
    let head_children = head_cells
        .into_iter()
        .zip(&aligns)
        .map(|(text, align)| cell_node(text, *align, true))
        .collect();

    let mut rows = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rows.push(process_row(line, &aligns, outer_pipes)?);
    }

    Some(Node::container(
        "table",
        vec![
            Node::container("table_head", head_children),
            Node::container("table_body", rows),
        ],
    ))
}

fn process_row(line: &str, aligns: &[Option<&'static str>], outer_pipes: bool) -> Option<Node> {
    let mut text = line;
    if outer_pipes {
        text = text.strip_prefix('|').unwrap_or(text);
        if text.ends_with('|') && !text.ends_with("\\|") {
            text = &text[..text.len() - 1];
        }
    }
    let cells = split_cells(text);
    if cells.len() != aligns.len() {
        return None;
    }
    let children = cells
        .into_iter()
        .zip(aligns)
        .map(|(cell, align)| cell_node(cell, *align, false))
        .collect();
    Some(Node::container("table_row", children))
}

fn cell_node(text: String, align: Option<&'static str>, head: bool) -> Node {
    let mut node = Node::text("table_cell", text);
    if head {
        node.set_attr("head", true);
    }
    if let Some(align) = align {
        node.set_attr("align", align);
    }
    node
}

/// Splits a row on unescaped pipes; `\|` is a literal pipe inside a cell.
fn split_cells(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                current.push('|');
            }
            '|' => cells.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    cells.push(current);
    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

fn classify_align(spec: &str) -> Option<&'static str> {
    let spec = spec.trim();
    match (spec.starts_with(':'), spec.ends_with(':')) {
        (true, true) if spec.len() > 1 => Some("center"),
        (false, true) => Some("right"),
        (true, false) => Some("left"),
        _ => None,
    }
}
