//! Aggregate statistics over many attempts at one test.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{Answer, Roster, Test};
use crate::results::{AttemptResult, AttemptStatus};
use crate::scoring::{round_to, Verdict};

/// Group name used for students with no group in the roster.
pub const UNGROUPED: &str = "ungrouped";

/// Aggregate statistics for one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStats {
    pub test_id: String,
    /// All attempts seen, whatever their status.
    pub attempts: usize,
    pub completed: usize,
    pub expired: usize,
    pub in_progress: usize,
    /// Percentage figures below cover completed attempts only.
    pub average_percentage: f64,
    pub median_percentage: f64,
    pub min_percentage: f64,
    pub max_percentage: f64,
    /// Share of completed attempts at or above the passing percentage.
    pub pass_rate: f64,
    pub passing_percentage: f64,
    pub average_time_spent_secs: u64,
    /// Per-question statistics, keyed by question id.
    pub per_question: BTreeMap<String, QuestionStats>,
    /// Per-group statistics, keyed by group name.
    pub per_group: BTreeMap<String, GroupStats>,
}

/// Statistics for a single question across completed attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: String,
    /// Attempts that gave any answer.
    pub answered: usize,
    /// Attempts that answered correctly (auto-scored questions only).
    pub correct: usize,
    /// `correct / completed attempts`, 0 when nothing was completed.
    pub correct_rate: f64,
    /// How often each option was picked, keyed by option id.
    pub option_counts: BTreeMap<String, usize>,
}

/// Statistics for one study group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupStats {
    pub group: String,
    pub completed: usize,
    pub average_percentage: f64,
    pub pass_rate: f64,
}

/// Median of an already sorted slice.
pub fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Compute aggregate statistics for `test` from its results.
///
/// Results belonging to other tests are ignored.
pub fn compute_test_stats(
    test: &Test,
    results: &[AttemptResult],
    roster: &Roster,
    passing_percentage: f64,
) -> TestStats {
    let own: Vec<&AttemptResult> = results.iter().filter(|r| r.test_id == test.id).collect();
    let count_status = |s: AttemptStatus| own.iter().filter(|r| r.status == s).count();

    let completed: Vec<&AttemptResult> = own
        .iter()
        .copied()
        .filter(|r| r.status == AttemptStatus::Completed)
        .collect();

    let mut percentages: Vec<f64> = completed.iter().map(|r| r.percentage).collect();
    percentages.sort_by(|a, b| a.total_cmp(b));

    let passed = completed
        .iter()
        .filter(|r| r.passed(passing_percentage))
        .count();

    let average_time_spent_secs = if completed.is_empty() {
        0
    } else {
        completed.iter().map(|r| r.time_spent_secs).sum::<u64>() / completed.len() as u64
    };

    // Per-question stats
    let mut per_question: BTreeMap<String, QuestionStats> = test
        .questions
        .iter()
        .map(|q| {
            (
                q.id.clone(),
                QuestionStats {
                    question_id: q.id.clone(),
                    answered: 0,
                    correct: 0,
                    correct_rate: 0.0,
                    option_counts: q
                        .kind
                        .options()
                        .iter()
                        .map(|o| (o.id.clone(), 0))
                        .collect(),
                },
            )
        })
        .collect();

    for result in &completed {
        for record in &result.answers {
            let Some(stats) = per_question.get_mut(&record.question_id) else {
                continue;
            };
            if let Some(answer) = record.answer.as_ref().filter(|a| !a.is_empty()) {
                stats.answered += 1;
                match answer {
                    Answer::Choice(id) => {
                        *stats.option_counts.entry(id.clone()).or_default() += 1;
                    }
                    Answer::Choices(ids) => {
                        for id in ids {
                            *stats.option_counts.entry(id.clone()).or_default() += 1;
                        }
                    }
                    Answer::Text(_) => {}
                }
            }
            if record.verdict == Verdict::Correct {
                stats.correct += 1;
            }
        }
    }
    for stats in per_question.values_mut() {
        stats.correct_rate = rate(stats.correct, completed.len());
    }

    // Per-group stats
    let mut grouped: HashMap<String, Vec<&AttemptResult>> = HashMap::new();
    for &r in &completed {
        let group = roster.group_of(&r.user_id).unwrap_or(UNGROUPED);
        grouped.entry(group.to_string()).or_default().push(r);
    }
    let per_group = grouped
        .into_iter()
        .map(|(group, members)| {
            let pcts: Vec<f64> = members.iter().map(|r| r.percentage).collect();
            let passed = members
                .iter()
                .filter(|r| r.passed(passing_percentage))
                .count();
            let stats = GroupStats {
                group: group.clone(),
                completed: members.len(),
                average_percentage: round_to(mean(&pcts), 2),
                pass_rate: rate(passed, members.len()),
            };
            (group, stats)
        })
        .collect();

    TestStats {
        test_id: test.id.clone(),
        attempts: own.len(),
        completed: completed.len(),
        expired: count_status(AttemptStatus::Expired),
        in_progress: count_status(AttemptStatus::InProgress),
        average_percentage: round_to(mean(&percentages), 2),
        median_percentage: round_to(median(&percentages), 2),
        min_percentage: percentages.first().copied().unwrap_or(0.0),
        max_percentage: percentages.last().copied().unwrap_or(0.0),
        pass_rate: rate(passed, completed.len()),
        passing_percentage,
        average_time_spent_secs,
        per_question,
        per_group,
    }
}
