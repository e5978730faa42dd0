//! The `quizmark score` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizmark_core::scoring::{score, ScoreResult, ScoringMode};

pub fn execute(test_path: PathBuf, answers_path: PathBuf, mode: String, format: String) -> Result<()> {
    let test = super::load_test(&test_path)?;
    let sheet = super::load_sheet_for(&answers_path, &test)?;
    let answers = sheet.bind(&test);

    let modes = match mode.as_str() {
        "both" => vec![ScoringMode::Weighted, ScoringMode::Uniform],
        other => vec![other.parse::<ScoringMode>().map_err(|e| anyhow::anyhow!(e))?],
    };

    let results: Vec<ScoreResult> = modes
        .into_iter()
        .map(|m| score(&test.questions, &answers, m))
        .collect();

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&results)?),
        _ => print_text(&test.title, &sheet.user_id, &results),
    }

    Ok(())
}

fn print_text(title: &str, user_id: &str, results: &[ScoreResult]) {
    println!("{title} :: {user_id}");

    let mut summary = Table::new();
    summary.set_header(vec!["Mode", "Score", "Max", "Percentage"]);
    for r in results {
        summary.add_row(vec![
            Cell::new(r.mode),
            Cell::new(r.score),
            Cell::new(r.max_score),
            Cell::new(format!("{}%", r.percentage)),
        ]);
    }
    println!("{summary}");

    let Some(first) = results.first() else {
        return;
    };
    let mut detail = Table::new();
    detail.set_header(vec!["Question", "Verdict", "Points"]);
    for o in &first.outcomes {
        detail.add_row(vec![
            Cell::new(&o.question_id),
            Cell::new(o.verdict),
            Cell::new(format!("{}/{}", o.points_awarded, o.points_possible)),
        ]);
    }
    println!("{detail}");
}
