use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pdf_formfill::loader::load_config;
use pdf_formfill::{Context, Evaluator, Template};

const CONFIG: &str = r#"
name:
  first: Ada
  last: Lovelace
ssn: 123-45-6789
w2:
  wages: "52,310.17"
  tips: "1,200.00"
status: single
"#;

const TEMPLATES: &[&str] = &[
    "ctx.name.first",
    "ctx.name.first + ' ' + ctx.name.last",
    "${ctx.name.first} ${ctx.name.last}",
    "currency(parseCurrency(ctx.w2.wages) + parseCurrency(ctx.w2.tips))",
    "strNoDash(ctx.ssn)",
    "ctx.missing.deeply.nested",
];

fn context() -> Context {
    let config = load_config(serde_yaml::from_str::<serde_yaml::Value>(CONFIG).unwrap()).unwrap();
    Context::new(config).unwrap()
}

fn benchmark_compile(c: &mut Criterion) {
    for (i, source) in TEMPLATES.iter().enumerate() {
        c.bench_function(&format!("template_{}_compile", i), |b| {
            b.iter(|| black_box(Template::compile(black_box(source))))
        });
    }
}

fn benchmark_render(c: &mut Criterion) {
    let ctx = context();
    let evaluator = Evaluator::default();

    for (i, source) in TEMPLATES.iter().enumerate() {
        let template = Template::compile(source).unwrap();
        c.bench_function(&format!("template_{}_render", i), |b| {
            b.iter(|| black_box(evaluator.render(black_box(&ctx), &template)))
        });
    }
}

fn benchmark_calculate(c: &mut Criterion) {
    let ctx = context();
    let evaluator = Evaluator::default();
    let calculate = "(ctx, value) => { switch (value) { case 'single': return { field: 3, fill: 1 }; default: return { field: 4, fill: 1 }; } }";

    c.bench_function("calculate", |b| {
        b.iter(|| black_box(evaluator.eval_calculate(&ctx, black_box(calculate), "single".into())))
    });
}

criterion_group!(benches, benchmark_compile, benchmark_render, benchmark_calculate);
criterion_main!(benches);
