//! The `quizmark compare` command.

use std::path::PathBuf;

use anyhow::Result;

use quizmark_core::report::AdminReport;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_decline: bool,
    format: String,
) -> Result<()> {
    let baseline = AdminReport::load_json(&baseline_path)?;
    let current = AdminReport::load_json(&current_path)?;

    if baseline.test.id != current.test.id {
        tracing::warn!(
            baseline = %baseline.test.id,
            current = %current.test.id,
            "comparing reports for different tests"
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Comparison: {} declines, {} gains, {} unchanged",
                report.declines.len(),
                report.gains.len(),
                report.unchanged
            );

            if !report.declines.is_empty() {
                println!("\nDeclines:");
                for d in &report.declines {
                    println!(
                        "  {} {:.1}% -> {:.1}% ({:+.1}%)",
                        d.question_id,
                        d.baseline_rate * 100.0,
                        d.current_rate * 100.0,
                        d.delta * 100.0
                    );
                }
            }

            if !report.gains.is_empty() {
                println!("\nGains:");
                for g in &report.gains {
                    println!(
                        "  {} {:.1}% -> {:.1}% (+{:.1}%)",
                        g.question_id,
                        g.baseline_rate * 100.0,
                        g.current_rate * 100.0,
                        g.delta * 100.0
                    );
                }
            }

            if report.new_questions > 0 {
                println!("\n{} new question(s)", report.new_questions);
            }
            if report.removed_questions > 0 {
                println!("{} removed question(s)", report.removed_questions);
            }
        }
    }

    if fail_on_decline && report.has_declines() {
        std::process::exit(1);
    }

    Ok(())
}
