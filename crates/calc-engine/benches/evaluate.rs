use calc_engine::{Dictionary, Engine, EvaluateOptions, Record};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const EXPRESSIONS: &[&str] = &[
    "1 + 2 * 3",
    "IF(Age > 18, 'adult', 'minor')",
    "15 * Children('Kim').Age + 14",
    "SUM(Range(1, 100)) / COUNT(Range(1, 100))",
    "CONCATENATE(SUBSTITUTE(Name, 'e', 'E', 1), '-', LEN(Name))",
];

fn engine() -> Engine {
    let kim = Record::new("Person").with("Name", "Kim").with("Age", 2);
    let mut engine = Engine::new();
    engine.set_data_context(
        Record::new("Person")
            .with("Name", "Lee")
            .with("Age", 40)
            .with("Children", Dictionary::new().with("Kim", kim)),
    );
    engine
}

fn benchmark_evaluate(c: &mut Criterion) {
    let engine = engine();
    let cached = EvaluateOptions::default().with_trace(false);
    let uncached = cached.clone().with_cache(false);

    for (i, expression) in EXPRESSIONS.iter().enumerate() {
        c.bench_function(&format!("expr_{}_cached", i), |b| {
            b.iter(|| black_box(engine.evaluate_with(black_box(expression), cached.clone())))
        });

        c.bench_function(&format!("expr_{}_uncached", i), |b| {
            b.iter(|| black_box(engine.evaluate_with(black_box(expression), uncached.clone())))
        });
    }
}

fn benchmark_traced(c: &mut Criterion) {
    let engine = engine();
    c.bench_function("traced_binding", |b| {
        b.iter(|| black_box(engine.evaluate(black_box("15 * Children('Kim').Age + 14"))))
    });
}

fn benchmark_parse(c: &mut Criterion) {
    let engine = engine();
    c.bench_function("parse_only", |b| {
        b.iter(|| black_box(engine.parse(black_box("IF(Age > 18, MAX(1, 2, 3) * Age, Children('Kim').Age)"))))
    });
}

criterion_group!(benches, benchmark_evaluate, benchmark_traced, benchmark_parse);
criterion_main!(benches);
