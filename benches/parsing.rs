use criterion::{Criterion, black_box, criterion_group, criterion_main};
use plume::{Markdown, plugins};

fn sample_document(repeats: usize) -> String {
    let base = "# Section\n\nSome *text* with a [link](https://example.com) and `code`.\n\n\
                - one\n- two\n  - nested\n\n> quoted line\n> with a second line\n\n\
                ```rust\nfn demo() -> u32 {\n    42\n}\n```\n\n";
    base.repeat(repeats)
}

fn bench_core(c: &mut Criterion) {
    let mut group = c.benchmark_group("core");
    group.sample_size(20);

    let input = sample_document(100);
    let md = Markdown::new();

    group.bench_function("parse_to_ast", |b| {
        b.iter(|| {
            let ast = md.parse_to_ast(black_box(&input)).unwrap();
            black_box(ast);
        });
    });

    group.bench_function("render", |b| {
        b.iter(|| {
            let html = md.render(black_box(&input)).unwrap();
            black_box(html);
        });
    });

    group.finish();
}

fn bench_plugins(c: &mut Criterion) {
    let mut group = c.benchmark_group("plugins");
    group.sample_size(20);

    let extras = "| a | b |\n| --- | --- |\n| 1 | 2 |\n\n\
                  with ~~old~~ and ==marked== text[^n]\n\n[^n]: a footnote\n\n";
    let input = format!("{}{}", sample_document(50), extras.repeat(50));
    let md = Markdown::builder()
        .plugin(plugins::footnotes)
        .plugin(plugins::mark)
        .plugin(plugins::strikethrough)
        .plugin(plugins::table)
        .build();

    group.bench_function("render", |b| {
        b.iter(|| {
            let html = md.render(black_box(&input)).unwrap();
            black_box(html);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_core, bench_plugins);
criterion_main!(benches);
