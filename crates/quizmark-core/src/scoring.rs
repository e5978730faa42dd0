//! Scoring engine.
//!
//! Maps a question set plus submitted answers to a [`ScoreResult`]. Two
//! modes are provided:
//!
//! * [`ScoringMode::Weighted`]: points-weighted, used for persisted results.
//!   Every question counts toward `max_score`, including ones that are never
//!   auto-scored. Percentage is rounded to two decimal places.
//! * [`ScoringMode::Uniform`]: one unit per auto-scored question, used for
//!   live feedback while a test is being taken. Open-ended questions are left
//!   out of the denominator. Percentage is rounded to an integer.
//!
//! Scoring never fails: missing answers, mismatched answer shapes and
//! questions without an answer key all score as not correct.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Answer, Answers, Question, QuestionKind};

/// Which scoring strategy to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    #[default]
    Weighted,
    Uniform,
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Weighted => write!(f, "weighted"),
            ScoringMode::Uniform => write!(f, "uniform"),
        }
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weighted" | "a" => Ok(ScoringMode::Weighted),
            "uniform" | "b" => Ok(ScoringMode::Uniform),
            other => Err(format!("unknown scoring mode: {other}")),
        }
    }
}

/// Outcome of checking one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unanswered,
    /// Open-ended question, never auto-scored.
    NotScored,
}

impl Verdict {
    pub fn is_correct(self) -> bool {
        self == Verdict::Correct
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => write!(f, "correct"),
            Verdict::Incorrect => write!(f, "incorrect"),
            Verdict::Unanswered => write!(f, "unanswered"),
            Verdict::NotScored => write!(f, "not_scored"),
        }
    }
}

/// Per-question breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub verdict: Verdict,
    pub points_awarded: u32,
    pub points_possible: u32,
}

/// Result of scoring one set of answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub mode: ScoringMode,
    /// Weighted points (weighted mode) or correct count (uniform mode).
    pub score: u32,
    /// Attainable points (weighted mode) or auto-scored question count.
    pub max_score: u32,
    pub percentage: f64,
    pub outcomes: Vec<QuestionOutcome>,
}

impl ScoreResult {
    pub fn correct_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.verdict.is_correct())
            .count()
    }

    pub fn outcome(&self, question_id: &str) -> Option<&QuestionOutcome> {
        self.outcomes.iter().find(|o| o.question_id == question_id)
    }
}

/// Check a single answer against a question's key.
pub fn grade_question(question: &Question, answer: Option<&Answer>) -> Verdict {
    if !question.kind.is_auto_scored() {
        return Verdict::NotScored;
    }
    let Some(answer) = answer.filter(|a| !a.is_empty()) else {
        return Verdict::Unanswered;
    };

    let correct = match (&question.kind, answer) {
        (
            QuestionKind::Single {
                correct_option_id: Some(key),
                ..
            },
            Answer::Choice(id),
        ) => id == key,
        (
            QuestionKind::Multiple {
                correct_option_ids, ..
            },
            Answer::Choices(ids),
        ) => ids == correct_option_ids,
        _ => false,
    };

    if correct {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

/// Score `answers` against `questions` with the given mode.
pub fn score(questions: &[Question], answers: &Answers, mode: ScoringMode) -> ScoreResult {
    let mut total = 0u32;
    let mut max = 0u32;
    let mut outcomes = Vec::with_capacity(questions.len());

    for question in questions {
        let verdict = grade_question(question, answers.get(&question.id));
        let possible = match mode {
            ScoringMode::Weighted => question.weight(),
            ScoringMode::Uniform if question.kind.is_auto_scored() => 1,
            ScoringMode::Uniform => 0,
        };
        let awarded = if verdict.is_correct() { possible } else { 0 };

        total = total.saturating_add(awarded);
        max = max.saturating_add(possible);
        outcomes.push(QuestionOutcome {
            question_id: question.id.clone(),
            verdict,
            points_awarded: awarded,
            points_possible: possible,
        });
    }

    let percentage = if max == 0 {
        0.0
    } else {
        let raw = f64::from(total) / f64::from(max) * 100.0;
        match mode {
            ScoringMode::Weighted => round_to(raw, 2),
            ScoringMode::Uniform => raw.round(),
        }
    };

    ScoreResult {
        mode,
        score: total,
        max_score: max,
        percentage,
        outcomes,
    }
}

/// Shorthand for [`ScoringMode::Weighted`].
pub fn score_weighted(questions: &[Question], answers: &Answers) -> ScoreResult {
    score(questions, answers, ScoringMode::Weighted)
}

/// Shorthand for [`ScoringMode::Uniform`].
pub fn score_uniform(questions: &[Question], answers: &Answers) -> ScoreResult {
    score(questions, answers, ScoringMode::Uniform)
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChoiceOption;

    fn opts(ids: &[&str]) -> Vec<ChoiceOption> {
        ids.iter()
            .map(|id| ChoiceOption {
                id: id.to_string(),
                text: id.to_string(),
            })
            .collect()
    }

    fn single(id: &str, correct: &str) -> Question {
        Question {
            id: id.into(),
            text: String::new(),
            points: None,
            kind: QuestionKind::Single {
                options: opts(&["a", "b", "c"]),
                correct_option_id: Some(correct.into()),
            },
        }
    }

    fn multiple(id: &str, correct: &[&str]) -> Question {
        Question {
            id: id.into(),
            text: String::new(),
            points: None,
            kind: QuestionKind::Multiple {
                options: opts(&["x", "y", "z"]),
                correct_option_ids: correct.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    fn text(id: &str) -> Question {
        Question {
            id: id.into(),
            text: String::new(),
            points: Some(1),
            kind: QuestionKind::Text,
        }
    }

    fn sample() -> Vec<Question> {
        vec![
            single("single", "b"),
            multiple("multiple", &["x", "z"]),
            text("text"),
        ]
    }

    fn answers(entries: Vec<(&str, Answer)>) -> Answers {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn empty_question_set_scores_zero_in_both_modes() {
        for mode in [ScoringMode::Weighted, ScoringMode::Uniform] {
            let result = score(&[], &Answers::new(), mode);
            assert_eq!(result.score, 0);
            assert_eq!(result.max_score, 0);
            assert_eq!(result.percentage, 0.0);
        }
    }

    #[test]
    fn all_correct_is_full_marks() {
        let questions = vec![single("s", "b"), multiple("m", &["x", "z"])];
        let given = answers(vec![
            ("s", Answer::Choice("b".into())),
            ("m", Answer::choices(["z", "x"])),
        ]);
        assert_eq!(score_weighted(&questions, &given).percentage, 100.0);
        assert_eq!(score_uniform(&questions, &given).percentage, 100.0);
    }

    #[test]
    fn all_unanswered_scores_zero() {
        let questions = sample();
        for mode in [ScoringMode::Weighted, ScoringMode::Uniform] {
            let result = score(&questions, &Answers::new(), mode);
            assert_eq!(result.score, 0);
            assert_eq!(result.percentage, 0.0);
        }
        let result = score_weighted(&questions, &Answers::new());
        assert_eq!(result.outcome("single").unwrap().verdict, Verdict::Unanswered);
        assert_eq!(result.outcome("text").unwrap().verdict, Verdict::NotScored);
    }

    #[test]
    fn mixed_scenario_keeps_mode_asymmetry() {
        let given = answers(vec![
            ("single", Answer::Choice("b".into())),
            ("multiple", Answer::choices(["x", "z"])),
            ("text", Answer::Text("anything".into())),
        ]);

        let weighted = score_weighted(&sample(), &given);
        assert_eq!(weighted.score, 2);
        assert_eq!(weighted.max_score, 3);
        assert_eq!(weighted.percentage, 66.67);

        let uniform = score_uniform(&sample(), &given);
        assert_eq!(uniform.score, 2);
        assert_eq!(uniform.max_score, 2);
        assert_eq!(uniform.percentage, 100.0);
    }

    #[test]
    fn wrong_answers_score_zero() {
        let given = answers(vec![
            ("single", Answer::Choice("a".into())),
            ("multiple", Answer::choices(["x"])),
            ("text", Answer::Text(String::new())),
        ]);
        let weighted = score_weighted(&sample(), &given);
        assert_eq!(weighted.score, 0);
        assert_eq!(weighted.percentage, 0.0);
        assert_eq!(score_uniform(&sample(), &given).percentage, 0.0);
    }

    #[test]
    fn multiple_requires_exact_set() {
        let q = multiple("m", &["x", "z"]);
        let superset = Answer::choices(["x", "y", "z"]);
        let subset = Answer::choices(["z"]);
        let exact = Answer::choices(["z", "x"]);
        assert_eq!(grade_question(&q, Some(&superset)), Verdict::Incorrect);
        assert_eq!(grade_question(&q, Some(&subset)), Verdict::Incorrect);
        assert_eq!(grade_question(&q, Some(&exact)), Verdict::Correct);
    }

    #[test]
    fn superset_contributes_nothing() {
        let questions = vec![multiple("m", &["x", "z"])];
        let given = answers(vec![("m", Answer::choices(["x", "y", "z"]))]);
        let weighted = score_weighted(&questions, &given);
        assert_eq!(weighted.score, 0);
        let uniform = score_uniform(&questions, &given);
        assert_eq!(uniform.correct_count(), 0);
    }

    #[test]
    fn rounding_differs_between_modes() {
        let questions = vec![
            single("q1", "a"),
            single("q2", "a"),
            single("q3", "a"),
        ];
        let given = answers(vec![
            ("q1", Answer::Choice("a".into())),
            ("q2", Answer::Choice("a".into())),
            ("q3", Answer::Choice("b".into())),
        ]);
        assert_eq!(score_weighted(&questions, &given).percentage, 66.67);
        assert_eq!(score_uniform(&questions, &given).percentage, 67.0);
    }

    #[test]
    fn weighted_mode_is_order_independent() {
        let questions = sample();
        let forward: Answers = answers(vec![
            ("single", Answer::Choice("b".into())),
            ("multiple", Answer::choices(["x", "z"])),
        ]);
        let mut reversed = Answers::new();
        reversed.insert("multiple".into(), Answer::choices(["z", "x"]));
        reversed.insert("single".into(), Answer::Choice("b".into()));
        assert_eq!(
            score_weighted(&questions, &forward),
            score_weighted(&questions, &reversed)
        );
    }

    #[test]
    fn points_weight_the_score() {
        let mut heavy = single("heavy", "a");
        heavy.points = Some(3);
        let mut broken = single("broken", "a");
        broken.points = Some(-2);
        let questions = vec![heavy, broken];
        let given = answers(vec![("heavy", Answer::Choice("a".into()))]);

        let result = score_weighted(&questions, &given);
        assert_eq!(result.score, 3);
        assert_eq!(result.max_score, 4);
        assert_eq!(result.percentage, 75.0);
    }

    #[test]
    fn mismatched_shape_is_incorrect() {
        let q = single("s", "b");
        assert_eq!(
            grade_question(&q, Some(&Answer::choices(["b"]))),
            Verdict::Incorrect
        );
    }

    #[test]
    fn missing_answer_key_is_never_correct() {
        let q = Question {
            id: "s".into(),
            text: String::new(),
            points: None,
            kind: QuestionKind::Single {
                options: vec![],
                correct_option_id: None,
            },
        };
        assert_eq!(
            grade_question(&q, Some(&Answer::Choice("a".into()))),
            Verdict::Incorrect
        );
    }

    #[test]
    fn empty_set_is_unanswered() {
        let q = multiple("m", &[]);
        assert_eq!(
            grade_question(&q, Some(&Answer::choices(Vec::<String>::new()))),
            Verdict::Unanswered
        );
    }

    #[test]
    fn open_ended_kinds_are_not_scored() {
        let questions = vec![
            single("s", "a"),
            Question {
                id: "n".into(),
                text: String::new(),
                points: None,
                kind: QuestionKind::Number,
            },
            Question {
                id: "r".into(),
                text: String::new(),
                points: None,
                kind: QuestionKind::Rating { scale: 5 },
            },
        ];
        let given = answers(vec![
            ("s", Answer::Choice("a".into())),
            ("n", Answer::Text("7".into())),
        ]);
        let uniform = score_uniform(&questions, &given);
        assert_eq!((uniform.score, uniform.max_score), (1, 1));
        let weighted = score_weighted(&questions, &given);
        assert_eq!((weighted.score, weighted.max_score), (1, 3));
    }

    #[test]
    fn mode_parse() {
        assert_eq!("A".parse::<ScoringMode>().unwrap(), ScoringMode::Weighted);
        assert_eq!("uniform".parse::<ScoringMode>().unwrap(), ScoringMode::Uniform);
        assert!("median".parse::<ScoringMode>().is_err());
    }

    #[test]
    fn round_to_two_places() {
        assert_eq!(round_to(200.0 / 3.0, 2), 66.67);
        assert_eq!(round_to(100.0 / 3.0, 2), 33.33);
        assert_eq!(round_to(12.5, 0), 13.0);
    }
}
