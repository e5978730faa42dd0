use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_toml_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("toml_parsing");

    let small_toml = generate_test_toml(5);
    let medium_toml = generate_test_toml(50);
    let large_toml = generate_test_toml(200);

    for (name, toml) in [
        ("5_questions", &small_toml),
        ("50_questions", &medium_toml),
        ("200_questions", &large_toml),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                quizmark_core::parser::parse_test_str(
                    black_box(toml),
                    black_box("bench.toml".as_ref()),
                )
            })
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let definition =
        quizmark_core::parser::parse_test_str(&generate_test_toml(200), "bench.toml".as_ref())
            .unwrap();

    c.bench_function("validate_200_questions", |b| {
        b.iter(|| quizmark_core::parser::validate_test(black_box(&definition)))
    });
}

fn generate_test_toml(n: usize) -> String {
    let mut s = String::new();
    s.push_str(
        r#"[test]
id = "bench"
title = "Benchmark"
category = "test"
"#,
    );
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[questions]]
id = "q{i}"
type = "single"
text = "Question {i}?"
points = {points}
options = [
    {{ id = "a", text = "First", is_correct = true }},
    {{ id = "b", text = "Second" }},
    {{ id = "c", text = "Third" }},
]
"#,
            points = i % 3 + 1
        ));
    }
    s
}

criterion_group!(benches, bench_toml_parsing, bench_validation);
criterion_main!(benches);
