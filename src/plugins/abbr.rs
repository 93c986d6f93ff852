//! Abbreviations: `*[ABBR]: description` definitions, applied to every
//! whole-word occurrence in the document's text after inline resolution.

use crate::block_parser::BlockParser;
use crate::error::Error;
use crate::markdown::Markdown;
use crate::node::Node;
use crate::registry::{Matched, Position};
use crate::state::{BlockState, ParseEnv};
use crate::util::escape;

const REF_ABBR: &str = r" {0,3}\*\[([^\]]+)\]:([^\n]*)";

pub fn abbr(md: &mut Markdown) {
    md.block_parser_mut()
        .register(
            "ref_abbr",
            REF_ABBR,
            Box::new(parse_ref_abbr),
            Position::before("ref_link"),
        )
        .expect("default rule `ref_link` is registered");
    md.add_resolver(Box::new(expand_abbrs));
    md.renderer_mut().register(
        "abbr",
        Box::new(|_, node, _| {
            let term = escape(node.as_raw().unwrap_or_default());
            match node.attr_str("title") {
                Some(title) if !title.is_empty() => {
                    format!("<abbr title=\"{}\">{term}</abbr>", escape(title))
                }
                _ => format!("<abbr>{term}</abbr>"),
            }
        }),
    );
}

fn parse_ref_abbr(
    _parser: &BlockParser,
    m: &Matched,
    state: &mut BlockState,
) -> Result<Option<usize>, Error> {
    let (term, desc) = {
        let src = state.src();
        let term = m.group(1).map_or("", |r| &src[r]).to_string();
        let desc = m.group(2).map_or("", |r| &src[r]).trim().to_string();
        (term, desc)
    };
    state.env.add_abbr(term, desc);
    Ok(Some(m.end() + 1))
}

/// Splits every text leaf on defined terms. Longer terms are tried first,
/// so overlapping definitions pick the longest match.
fn expand_abbrs(_md: &Markdown, tokens: &mut Vec<Node>, env: &mut ParseEnv) -> Result<(), Error> {
    if env.abbrs().is_empty() {
        return Ok(());
    }
    let mut keys: Vec<(String, String)> = env
        .abbrs()
        .iter()
        .map(|(term, desc)| (term.clone(), desc.clone()))
        .collect();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    expand_in(tokens, &keys);
    Ok(())
}

fn expand_in(nodes: &mut Vec<Node>, keys: &[(String, String)]) {
    let mut i = 0;
    while i < nodes.len() {
        if let Some(children) = nodes[i].children_mut() {
            expand_in(children, keys);
            i += 1;
            continue;
        }
        if nodes[i].kind != "text" {
            i += 1;
            continue;
        }
        let pieces = nodes[i].as_raw().and_then(|raw| split_on_terms(raw, keys));
        match pieces {
            Some(pieces) => {
                let count = pieces.len();
                nodes.splice(i..=i, pieces);
                i += count;
            }
            None => i += 1,
        }
    }
}

fn split_on_terms(raw: &str, keys: &[(String, String)]) -> Option<Vec<Node>> {
    let mut pieces: Vec<Node> = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;
    while pos < raw.len() {
        let hit = keys.iter().find(|(term, _)| {
            raw[pos..].starts_with(term.as_str())
                && boundary_before(raw, pos)
                && boundary_after(raw, pos + term.len())
        });
        match hit {
            Some((term, desc)) => {
                if plain_start < pos {
                    pieces.push(Node::raw("text", &raw[plain_start..pos]));
                }
                pieces.push(Node::raw("abbr", term.clone()).with_attr("title", desc.clone()));
                pos += term.len();
                plain_start = pos;
            }
            None => {
                pos += raw[pos..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    if pieces.is_empty() {
        return None;
    }
    if plain_start < raw.len() {
        pieces.push(Node::raw("text", &raw[plain_start..]));
    }
    Some(pieces)
}

fn boundary_before(raw: &str, pos: usize) -> bool {
    raw[..pos]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric())
}

fn boundary_after(raw: &str, end: usize) -> bool {
    raw[end..].chars().next().is_none_or(|c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use crate::markdown::Markdown;

    fn render(src: &str) -> String {
        Markdown::builder()
            .plugin(super::abbr)
            .build()
            .render(src)
            .unwrap()
    }

    #[test]
    fn test_occurrences_are_wrapped() {
        assert_eq!(
            render("The HTML spec\n\n*[HTML]: HyperText Markup Language\n"),
            "<p>The <abbr title=\"HyperText Markup Language\">HTML</abbr> spec</p>\n"
        );
    }

    #[test]
    fn test_partial_words_are_left_alone() {
        let html = render("XHTML uses HTML\n\n*[HTML]: markup\n");
        assert!(html.starts_with("<p>XHTML uses <abbr"));
    }

    #[test]
    fn test_longest_term_wins() {
        let html = render("HTML5 rocks\n\n*[HTML]: markup\n*[HTML5]: newer markup\n");
        assert!(html.contains("<abbr title=\"newer markup\">HTML5</abbr> rocks"));
    }

    #[test]
    fn test_title_is_escaped() {
        let html = render("AT\n\n*[AT]: a \"quote\" & more\n");
        assert!(html.contains("<abbr title=\"a &quot;quote&quot; &amp; more\">AT</abbr>"));
    }

    #[test]
    fn test_terms_inside_emphasis() {
        let html = render("*the HTML*\n\n*[HTML]: markup\n");
        assert!(html.contains("<em>the <abbr title=\"markup\">HTML</abbr></em>"));
    }
}
