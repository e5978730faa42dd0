//! The `quizmark report` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizmark_core::model::Roster;
use quizmark_core::parser;
use quizmark_core::report::AdminReport;
use quizmark_core::traits::ResultStore;
use quizmark_store::config::load_config_from;
use quizmark_store::FileStore;

pub async fn execute(
    test_path: PathBuf,
    results_dir: PathBuf,
    roster_path: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let session = config.session();
    session.require_admin("the report command")?;

    let test = super::load_test(&test_path)?;
    let roster = match &roster_path {
        Some(path) => parser::parse_roster(path)?,
        None => Roster::default(),
    };

    let store = FileStore::new(&results_dir);
    let results = store
        .list_for_test(&test.id)
        .await
        .with_context(|| format!("failed to read results from {}", results_dir.display()))?;

    let threshold = test.passing_percentage.unwrap_or(config.passing_percentage);
    let report = AdminReport::build(&session, &test, results, &roster, threshold)?;

    if let Some(path) = &output {
        report.save_json(path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    match format.as_str() {
        "markdown" | "md" => println!("{}", report.to_markdown()),
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &AdminReport) {
    let s = &report.stats;
    println!("{} ({})", report.test.title, report.test.id);
    println!(
        "Attempts: {} ({} completed, {} expired, {} in progress)",
        s.attempts, s.completed, s.expired, s.in_progress
    );
    println!(
        "Average {:.2}%  Median {:.2}%  Min {:.2}%  Max {:.2}%",
        s.average_percentage, s.median_percentage, s.min_percentage, s.max_percentage
    );
    println!(
        "Pass rate {:.1}% (pass mark {}%), average time {}s",
        s.pass_rate * 100.0,
        s.passing_percentage,
        s.average_time_spent_secs
    );

    let mut questions = Table::new();
    questions.set_header(vec!["Question", "Answered", "Correct", "Correct rate"]);
    for q in s.per_question.values() {
        questions.add_row(vec![
            Cell::new(&q.question_id),
            Cell::new(q.answered),
            Cell::new(q.correct),
            Cell::new(format!("{:.1}%", q.correct_rate * 100.0)),
        ]);
    }
    println!("\n{questions}");

    if !s.per_group.is_empty() {
        let mut groups = Table::new();
        groups.set_header(vec!["Group", "Completed", "Average", "Pass rate"]);
        for g in s.per_group.values() {
            groups.add_row(vec![
                Cell::new(&g.group),
                Cell::new(g.completed),
                Cell::new(format!("{:.2}%", g.average_percentage)),
                Cell::new(format!("{:.1}%", g.pass_rate * 100.0)),
            ]);
        }
        println!("\n{groups}");
    }
}
