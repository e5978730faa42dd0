//! Core data model types for quizmark.
//!
//! Two shapes coexist: the authoring/storage shape (`TestDefinition`,
//! `QuestionDefinition`) mirrors the documents kept in the backend, with
//! per-option `is_correct` flags; the scoring shape (`Test`, `Question`)
//! carries a closed `QuestionKind` so a question's answer key always
//! matches its type.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
}

/// What kind of question this is, together with its answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    /// Exactly one option is correct.
    Single {
        options: Vec<ChoiceOption>,
        /// `None` only for badly authored questions; such a question can
        /// never be answered correctly.
        correct_option_id: Option<String>,
    },
    /// Any subset of the options may be correct.
    Multiple {
        options: Vec<ChoiceOption>,
        correct_option_ids: BTreeSet<String>,
    },
    /// Free-form text, never auto-scored.
    Text,
    /// Numeric entry, never auto-scored.
    Number,
    /// Rating on a 1..=scale range, never auto-scored.
    Rating { scale: u8 },
}

impl QuestionKind {
    /// Whether answers to this kind are checked against an answer key.
    pub fn is_auto_scored(&self) -> bool {
        matches!(self, QuestionKind::Single { .. } | QuestionKind::Multiple { .. })
    }

    /// The selectable options, empty for open-ended kinds.
    pub fn options(&self) -> &[ChoiceOption] {
        match self {
            QuestionKind::Single { options, .. } | QuestionKind::Multiple { options, .. } => {
                options
            }
            _ => &[],
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Single { .. } => QuestionType::Single,
            QuestionKind::Multiple { .. } => QuestionType::Multiple,
            QuestionKind::Text => QuestionType::Text,
            QuestionKind::Number => QuestionType::Number,
            QuestionKind::Rating { .. } => QuestionType::Rating,
        }
    }
}

/// A question ready to be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Raw weight as authored. Use [`Question::weight`] when scoring.
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    /// Scoring weight: the authored points when positive, otherwise 1.
    pub fn weight(&self) -> u32 {
        match self.points {
            Some(p) if p > 0 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        }
    }
}

/// A submitted answer, one variant per answerable shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Answer {
    /// One option id, for `single` questions.
    Choice(String),
    /// A set of option ids, for `multiple` questions.
    Choices(BTreeSet<String>),
    /// Free-form entry, for `text`, `number` and `rating` questions.
    Text(String),
}

impl Answer {
    /// Build a `Choices` answer from any iterator of ids.
    pub fn choices<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Answer::Choices(ids.into_iter().map(Into::into).collect())
    }

    /// An empty string or empty set counts as no answer.
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Choice(id) => id.trim().is_empty(),
            Answer::Choices(ids) => ids.is_empty(),
            Answer::Text(text) => text.trim().is_empty(),
        }
    }

    /// Whether this answer shape is the one `kind` expects.
    pub fn fits(&self, kind: &QuestionKind) -> bool {
        matches!(
            (self, kind),
            (Answer::Choice(_), QuestionKind::Single { .. })
                | (Answer::Choices(_), QuestionKind::Multiple { .. })
                | (
                    Answer::Text(_),
                    QuestionKind::Text | QuestionKind::Number | QuestionKind::Rating { .. }
                )
        )
    }
}

/// Answers keyed by question id.
pub type Answers = HashMap<String, Answer>;

/// Whether a question set is graded or purely informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    #[default]
    Test,
    Survey,
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestCategory::Test => write!(f, "test"),
            TestCategory::Survey => write!(f, "survey"),
        }
    }
}

/// A test or survey ready to be taken and scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: TestCategory,
    /// Time limit for one attempt, if any.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    /// Percentage at or above which an attempt passes.
    #[serde(default)]
    pub passing_percentage: Option<f64>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Test {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

// ---------------------------------------------------------------------------
// Authoring / storage shape
// ---------------------------------------------------------------------------

/// Question type as it appears in stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[serde(alias = "radio")]
    Single,
    #[serde(alias = "checkbox")]
    Multiple,
    Text,
    Number,
    Rating,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Single => write!(f, "single"),
            QuestionType::Multiple => write!(f, "multiple"),
            QuestionType::Text => write!(f, "text"),
            QuestionType::Number => write!(f, "number"),
            QuestionType::Rating => write!(f, "rating"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "radio" => Ok(QuestionType::Single),
            "multiple" | "checkbox" => Ok(QuestionType::Multiple),
            "text" => Ok(QuestionType::Text),
            "number" => Ok(QuestionType::Number),
            "rating" => Ok(QuestionType::Rating),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// An option as stored, with its correctness flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// A question as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
    /// Upper bound for `rating` questions.
    #[serde(default)]
    pub scale: Option<u8>,
}

impl QuestionDefinition {
    pub fn correct_option_ids(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id.as_str())
    }

    /// Convert into the scoring shape.
    ///
    /// Never fails: a `single` question flagged with several correct
    /// options keys on the first one, and options on open-ended questions
    /// are dropped. Validation reports both.
    pub fn into_question(self) -> Question {
        let options: Vec<ChoiceOption> = self
            .options
            .iter()
            .map(|o| ChoiceOption {
                id: o.id.clone(),
                text: o.text.clone(),
            })
            .collect();

        let kind = match self.question_type {
            QuestionType::Single => QuestionKind::Single {
                correct_option_id: self.correct_option_ids().next().map(str::to_string),
                options,
            },
            QuestionType::Multiple => QuestionKind::Multiple {
                correct_option_ids: self.correct_option_ids().map(str::to_string).collect(),
                options,
            },
            QuestionType::Text => QuestionKind::Text,
            QuestionType::Number => QuestionKind::Number,
            QuestionType::Rating => QuestionKind::Rating {
                scale: self.scale.unwrap_or(DEFAULT_RATING_SCALE),
            },
        };

        Question {
            id: self.id,
            text: self.text,
            points: self.points,
            kind,
        }
    }
}

const DEFAULT_RATING_SCALE: u8 = 5;

/// A test or survey as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: TestCategory,
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    #[serde(default)]
    pub passing_percentage: Option<f64>,
    #[serde(default)]
    pub questions: Vec<QuestionDefinition>,
}

impl TestDefinition {
    pub fn into_test(self) -> Test {
        Test {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            time_limit_secs: self.time_limit_secs,
            passing_percentage: self.passing_percentage,
            questions: self
                .questions
                .into_iter()
                .map(QuestionDefinition::into_question)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// A student known to the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Study group, e.g. "CS-21".
    #[serde(default)]
    pub group: Option<String>,
}

/// Students keyed by user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Roster {
    pub fn get(&self, user_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == user_id)
    }

    pub fn group_of(&self, user_id: &str) -> Option<&str> {
        self.get(user_id).and_then(|s| s.group.as_deref())
    }
}
