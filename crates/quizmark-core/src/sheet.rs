//! Answer sheets: submitted answers before they are matched to a test.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Answer, Answers, QuestionKind, Test};

/// An answer value as it arrives from a client, before its shape is known
/// to match the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    Text(String),
    List(Vec<String>),
    Number(f64),
}

/// One user's submitted answers for one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub test_id: String,
    pub user_id: String,
    #[serde(default)]
    pub answers: HashMap<String, Option<RawAnswer>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnswerSheet {
    /// Match raw answers to the test's question kinds.
    ///
    /// Values whose shape does not fit the question (a list for a `single`
    /// question, say) and values for unknown questions are dropped, so they
    /// score as unanswered.
    pub fn bind(&self, test: &Test) -> Answers {
        let mut answers = Answers::new();

        for (question_id, raw) in &self.answers {
            let Some(question) = test.question(question_id) else {
                tracing::debug!(%question_id, test_id = %test.id, "ignoring answer to unknown question");
                continue;
            };
            let Some(raw) = raw else {
                continue;
            };
            match bind_one(&question.kind, raw) {
                Some(answer) => {
                    answers.insert(question_id.clone(), answer);
                }
                None => {
                    tracing::debug!(
                        %question_id,
                        question_type = %question.kind.question_type(),
                        "answer shape does not match question type"
                    );
                }
            }
        }

        answers
    }
}

fn bind_one(kind: &QuestionKind, raw: &RawAnswer) -> Option<Answer> {
    match (kind, raw) {
        (QuestionKind::Single { .. }, RawAnswer::Text(id)) => Some(Answer::Choice(id.clone())),
        (QuestionKind::Multiple { .. }, RawAnswer::List(ids)) => {
            Some(Answer::choices(ids.iter().cloned()))
        }
        (
            QuestionKind::Text | QuestionKind::Number | QuestionKind::Rating { .. },
            RawAnswer::Text(text),
        ) => Some(Answer::Text(text.clone())),
        (QuestionKind::Number | QuestionKind::Rating { .. }, RawAnswer::Number(n)) => {
            Some(Answer::Text(format_number(*n)))
        }
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
