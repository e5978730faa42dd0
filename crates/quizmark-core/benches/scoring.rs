use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizmark_core::model::{Answer, Answers, ChoiceOption, Question, QuestionKind};
use quizmark_core::scoring::{score, ScoringMode};

fn options(n: usize) -> Vec<ChoiceOption> {
    (0..n)
        .map(|i| ChoiceOption {
            id: format!("o{i}"),
            text: format!("Option {i}"),
        })
        .collect()
}

/// A mix of single, multiple and text questions with every other one answered.
fn make_test(n: usize) -> (Vec<Question>, Answers) {
    let mut questions = Vec::with_capacity(n);
    let mut answers = Answers::new();
    for i in 0..n {
        let id = format!("q{i}");
        let kind = match i % 3 {
            0 => QuestionKind::Single {
                options: options(4),
                correct_option_id: Some("o1".into()),
            },
            1 => QuestionKind::Multiple {
                options: options(5),
                correct_option_ids: ["o0", "o3"].iter().map(|s| s.to_string()).collect(),
            },
            _ => QuestionKind::Text,
        };
        if i % 2 == 0 {
            let answer = match &kind {
                QuestionKind::Single { .. } => Answer::Choice("o1".into()),
                QuestionKind::Multiple { .. } => Answer::choices(["o0", "o3"]),
                _ => Answer::Text("free text".into()),
            };
            answers.insert(id.clone(), answer);
        }
        questions.push(Question {
            id,
            text: format!("Question {i}"),
            points: Some((i % 4) as i64),
            kind,
        });
    }
    (questions, answers)
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for n in [10, 100, 1000] {
        let (questions, answers) = make_test(n);

        group.bench_function(format!("weighted_{n}_questions"), |b| {
            b.iter(|| {
                score(
                    black_box(&questions),
                    black_box(&answers),
                    ScoringMode::Weighted,
                )
            })
        });

        group.bench_function(format!("uniform_{n}_questions"), |b| {
            b.iter(|| {
                score(
                    black_box(&questions),
                    black_box(&answers),
                    ScoringMode::Uniform,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
