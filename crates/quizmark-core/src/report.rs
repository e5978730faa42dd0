//! Admin reports with JSON persistence and cohort drift detection.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Roster, Test, TestCategory};
use crate::results::AttemptResult;
use crate::session::{AccessError, Session};
use crate::statistics::{compute_test_stats, TestStats};

/// An aggregate report over every attempt at one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Who built the report.
    pub generated_by: String,
    pub test: TestSummary,
    pub results: Vec<AttemptResult>,
    pub stats: TestStats,
}

/// Summary of a test (without the full question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: String,
    pub title: String,
    pub category: TestCategory,
    pub question_count: usize,
}

impl TestSummary {
    pub fn of(test: &Test) -> Self {
        Self {
            id: test.id.clone(),
            title: test.title.clone(),
            category: test.category,
            question_count: test.questions.len(),
        }
    }
}

impl AdminReport {
    /// Build a report for `test`. Only admin sessions may do this.
    pub fn build(
        session: &Session,
        test: &Test,
        results: Vec<AttemptResult>,
        roster: &Roster,
        passing_percentage: f64,
    ) -> Result<Self, AccessError> {
        session.require_admin("building an admin report")?;

        let stats = compute_test_stats(test, &results, roster, passing_percentage);
        tracing::info!(
            test_id = %test.id,
            attempts = stats.attempts,
            completed = stats.completed,
            "built admin report"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            generated_by: session.user_id.clone(),
            test: TestSummary::of(test),
            results,
            stats,
        })
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }

    /// Render the report as markdown.
    pub fn to_markdown(&self) -> String {
        let s = &self.stats;
        let mut md = String::new();

        md.push_str(&format!("# {} ({})\n\n", self.test.title, self.test.id));
        md.push_str(&format!(
            "Generated {} by {}\n\n",
            self.created_at.format("%Y-%m-%d %H:%M UTC"),
            self.generated_by
        ));

        md.push_str("| Attempts | Completed | Expired | Average | Median | Min | Max | Pass rate |\n");
        md.push_str("|----------|-----------|---------|---------|--------|-----|-----|-----------|\n");
        md.push_str(&format!(
            "| {} | {} | {} | {:.2}% | {:.2}% | {:.2}% | {:.2}% | {:.1}% |\n\n",
            s.attempts,
            s.completed,
            s.expired,
            s.average_percentage,
            s.median_percentage,
            s.min_percentage,
            s.max_percentage,
            s.pass_rate * 100.0
        ));

        if !s.per_question.is_empty() {
            md.push_str("### Questions\n\n");
            md.push_str("| Question | Answered | Correct | Correct rate |\n");
            md.push_str("|----------|----------|---------|--------------|\n");
            for q in s.per_question.values() {
                md.push_str(&format!(
                    "| {} | {} | {} | {:.1}% |\n",
                    q.question_id,
                    q.answered,
                    q.correct,
                    q.correct_rate * 100.0
                ));
            }
            md.push('\n');
        }

        if !s.per_group.is_empty() {
            md.push_str("### Groups\n\n");
            md.push_str("| Group | Completed | Average | Pass rate |\n");
            md.push_str("|-------|-----------|---------|-----------|\n");
            for g in s.per_group.values() {
                md.push_str(&format!(
                    "| {} | {} | {:.2}% | {:.1}% |\n",
                    g.group,
                    g.completed,
                    g.average_percentage,
                    g.pass_rate * 100.0
                ));
            }
        }

        md
    }

    /// Compare per-question correct rates against a baseline report.
    pub fn compare(&self, baseline: &AdminReport, threshold: f64) -> DriftReport {
        let baseline_rates = &baseline.stats.per_question;
        let current_rates = &self.stats.per_question;

        let mut declines = Vec::new();
        let mut gains = Vec::new();
        let mut unchanged = 0usize;
        let mut new_questions = 0usize;

        for (question_id, current) in current_rates {
            let Some(base) = baseline_rates.get(question_id) else {
                new_questions += 1;
                continue;
            };
            let drift = QuestionDrift {
                question_id: question_id.clone(),
                baseline_rate: base.correct_rate,
                current_rate: current.correct_rate,
                delta: current.correct_rate - base.correct_rate,
            };
            if drift.delta < -threshold {
                declines.push(drift);
            } else if drift.delta > threshold {
                gains.push(drift);
            } else {
                unchanged += 1;
            }
        }

        let removed_questions = baseline_rates
            .keys()
            .filter(|k| !current_rates.contains_key(*k))
            .count();

        DriftReport {
            declines,
            gains,
            unchanged,
            new_questions,
            removed_questions,
        }
    }
}

/// Result of comparing two admin reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    /// Questions whose correct rate fell.
    pub declines: Vec<QuestionDrift>,
    /// Questions whose correct rate rose.
    pub gains: Vec<QuestionDrift>,
    pub unchanged: usize,
    /// Questions in current but not baseline.
    pub new_questions: usize,
    /// Questions in baseline but not current.
    pub removed_questions: usize,
}

/// Correct-rate change for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDrift {
    pub question_id: String,
    pub baseline_rate: f64,
    pub current_rate: f64,
    pub delta: f64,
}

impl DriftReport {
    /// Format the drift report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} declines, {} gains, {} unchanged\n\n",
            self.declines.len(),
            self.gains.len(),
            self.unchanged
        ));

        let mut table = |title: &str, rows: &[QuestionDrift], sign: &str| {
            if rows.is_empty() {
                return;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Question | Baseline | Current | Delta |\n");
            md.push_str("|----------|----------|---------|-------|\n");
            for d in rows {
                md.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {sign}{:.1}% |\n",
                    d.question_id,
                    d.baseline_rate * 100.0,
                    d.current_rate * 100.0,
                    d.delta * 100.0
                ));
            }
            md.push('\n');
        };
        table("Declines", &self.declines, "");
        table("Gains", &self.gains, "+");

        md
    }

    /// Returns true if any question's correct rate fell.
    pub fn has_declines(&self) -> bool {
        !self.declines.is_empty()
    }
}
