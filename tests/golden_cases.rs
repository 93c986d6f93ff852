//! Golden-file tests. Each directory under `tests/cases/` holds an
//! `input.md` and the `expected.html` it renders to, plus an optional
//! `ast.json` pinning the parsed tree. Run with `UPDATE_EXPECTED=1` or
//! `UPDATE_AST=1` to regenerate the files from the current output.

use std::fs;
use std::path::Path;

use plume::{Markdown, plugins};

/// A processor with every bundled plugin enabled, so the cases cover the
/// extended syntax next to the core one.
fn processor() -> Markdown {
    Markdown::builder()
        .plugin(plugins::abbr)
        .plugin(plugins::def_list)
        .plugin(plugins::footnotes)
        .plugin(plugins::insert)
        .plugin(plugins::mark)
        .plugin(plugins::math)
        .plugin(plugins::ruby)
        .plugin(plugins::spoiler)
        .plugin(plugins::strikethrough)
        .plugin(plugins::subscript)
        .plugin(plugins::superscript)
        .plugin(plugins::table)
        .plugin(plugins::task_lists)
        .plugin(plugins::url)
        .build()
}

fn run_golden_case(case_name: &str) {
    let case_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("cases")
        .join(case_name);
    let input_path = case_dir.join("input.md");
    let input = fs::read_to_string(&input_path)
        .unwrap_or_else(|err| panic!("cannot read {}: {err}", input_path.display()));

    let md = processor();
    let output = md.render(&input).unwrap();

    let expected_path = case_dir.join("expected.html");
    if std::env::var_os("UPDATE_EXPECTED").is_some() {
        fs::write(&expected_path, &output).unwrap();
    } else {
        let expected = fs::read_to_string(&expected_path)
            .unwrap_or_else(|err| panic!("cannot read {}: {err}", expected_path.display()));
        similar_asserts::assert_eq!(expected, output, "case: {case_name}");
    }

    // The processor keeps no per-document state, so rendering the same
    // input again must give the same result.
    let again = md.render(&input).unwrap();
    similar_asserts::assert_eq!(output, again, "repeat render of case: {case_name}");

    let ast_path = case_dir.join("ast.json");
    if std::env::var_os("UPDATE_AST").is_some() {
        let ast = md.parse_to_ast(&input).unwrap();
        let mut json = serde_json::to_string_pretty(&ast).unwrap();
        json.push('\n');
        fs::write(&ast_path, json).unwrap();
    } else if ast_path.exists() {
        let ast = md.parse_to_ast(&input).unwrap();
        let expected: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&ast_path).unwrap()).unwrap();
        let actual = serde_json::to_value(&ast).unwrap();
        similar_asserts::assert_eq!(expected, actual, "ast of case: {case_name}");
    }
}

macro_rules! golden_test_cases {
    ($($case:ident),+ $(,)?) => {
        $(
            #[test]
            fn $case() {
                run_golden_case(stringify!($case));
            }
        )+
    };
}

golden_test_cases!(
    abbreviations,
    bare_urls,
    blockquotes,
    code_spans,
    crlf_input,
    definition_lists,
    display_math,
    emphasis,
    escapes,
    fenced_code,
    headings,
    html_blocks,
    indented_code,
    links_inline,
    links_reference,
    lists_bullet,
    lists_ordered,
    lists_task,
    paragraphs,
    pipe_tables,
    reference_footnotes,
    ruby_annotations,
    spoilers,
    strikethrough_mark_insert,
    sub_and_superscript,
    thematic_breaks,
);
