//! The `quizmark submit` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use quizmark_runner::{Attempt, AttemptRunner};
use quizmark_store::config::{create_store, load_config_from};

pub async fn execute(
    test_path: PathBuf,
    answers_path: PathBuf,
    store_name: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let session = config.session();
    let (store_name, store_config) = config.store_config(store_name.as_deref())?;

    let test = Arc::new(super::load_test(&test_path)?);
    let sheet = super::load_sheet_for(&answers_path, &test)?;
    let user_id = if sheet.user_id.is_empty() {
        session.user_id.as_str()
    } else {
        sheet.user_id.as_str()
    };

    let now = Utc::now();
    let completed_at = sheet.completed_at.unwrap_or(now);
    let started_at = sheet.started_at.unwrap_or(completed_at);

    let runner = AttemptRunner::new(create_store(&store_config, &session));
    let mut attempt = Attempt::start(Arc::clone(&test), user_id, started_at);
    for (question_id, answer) in sheet.bind(&test) {
        runner.answer(&mut attempt, &question_id, answer)?;
    }

    let receipt = runner
        .submit(&mut attempt, completed_at)
        .await
        .with_context(|| format!("failed to submit to store '{store_name}'"))?;

    let r = &receipt.result;
    println!(
        "Submitted {} for {}: {}/{} ({}%)",
        test.title, r.user_id, r.score, r.max_score, r.percentage
    );
    let threshold = test.passing_percentage.unwrap_or(config.passing_percentage);
    println!(
        "Result: {}",
        if r.passed(threshold) { "PASS" } else { "FAIL" }
    );
    println!("Stored as {} in '{store_name}'", receipt.stored_id);

    Ok(())
}
