//! The `quizmark grade` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizmark_core::engine::{BatchReport, GradingEngine, ProgressReporter};
use quizmark_core::parser;
use quizmark_core::results::AttemptResult;
use quizmark_store::config::{create_store, load_config_from};

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_sheet_graded(&self, result: &AttemptResult, stored_id: &str) {
        eprintln!(
            "  Graded: {} {}/{} ({}%) -> {stored_id}",
            result.user_id, result.score, result.max_score, result.percentage
        );
    }

    fn on_sheet_error(&self, user_id: &str, error: &str) {
        eprintln!("  ERROR: {user_id}: {error}");
    }

    fn on_batch_complete(&self, total: usize, saved: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {saved}/{total} saved, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    test_path: PathBuf,
    answers_dir: PathBuf,
    parallelism: Option<usize>,
    store_name: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(p) = parallelism {
        anyhow::ensure!(p >= 1, "parallelism must be at least 1");
    }

    let config = load_config_from(config_path.as_deref())?;
    let session = config.session();
    let (store_name, store_config) = config.store_config(store_name.as_deref())?;

    let test = super::load_test(&test_path)?;
    let sheets = parser::load_answer_sheets(&answers_dir)?;
    anyhow::ensure!(
        !sheets.is_empty(),
        "no answer sheets found in {}",
        answers_dir.display()
    );

    let mut grading = config.grading_config();
    if let Some(p) = parallelism {
        grading.parallelism = p;
    }

    eprintln!(
        "Grading {} answer sheet(s) for '{}' into store '{store_name}'",
        sheets.len(),
        test.title
    );

    let engine = GradingEngine::new(create_store(&store_config, &session), grading);
    let report = engine.grade_batch(&test, &sheets, &ConsoleReporter).await;

    let threshold = test.passing_percentage.unwrap_or(config.passing_percentage);
    print_summary(&report, threshold);

    if report.has_failures() {
        anyhow::bail!("{} answer sheet(s) could not be graded", report.failures.len());
    }
    Ok(())
}

fn print_summary(report: &BatchReport, threshold: f64) {
    let mut rows: Vec<_> = report.saved.iter().collect();
    rows.sort_by(|a, b| a.1.user_id.cmp(&b.1.user_id));

    let mut table = Table::new();
    table.set_header(vec!["User", "Score", "Percentage", "Result", "Stored id"]);
    for (stored_id, r) in rows {
        table.add_row(vec![
            Cell::new(&r.user_id),
            Cell::new(format!("{}/{}", r.score, r.max_score)),
            Cell::new(format!("{}%", r.percentage)),
            Cell::new(if r.passed(threshold) { "PASS" } else { "FAIL" }),
            Cell::new(stored_id),
        ]);
    }
    println!("{table}");
}
