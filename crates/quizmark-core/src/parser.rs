//! TOML test-definition parser and answer-sheet loader.
//!
//! Loads tests from TOML files and directories, loads answer sheets from
//! JSON or TOML, and checks test definitions for authoring errors.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{QuestionDefinition, QuestionType, Roster, TestCategory, TestDefinition};
use crate::sheet::AnswerSheet;

/// Intermediate TOML structure for parsing test files.
#[derive(Debug, Deserialize)]
struct TomlTestFile {
    test: TomlTestHeader,
    #[serde(default)]
    questions: Vec<QuestionDefinition>,
}

#[derive(Debug, Deserialize)]
struct TomlTestHeader {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_category_str")]
    category: String,
    #[serde(default)]
    time_limit_secs: Option<u64>,
    #[serde(default)]
    passing_percentage: Option<f64>,
}

fn default_category_str() -> String {
    "test".to_string()
}

fn parse_category(s: &str) -> Result<TestCategory> {
    match s.to_lowercase().as_str() {
        "test" | "quiz" => Ok(TestCategory::Test),
        "survey" | "poll" => Ok(TestCategory::Survey),
        other => anyhow::bail!("unknown test category: {other}"),
    }
}

/// Parse a single TOML file into a `TestDefinition`.
pub fn parse_test(path: &Path) -> Result<TestDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test file: {}", path.display()))?;

    parse_test_str(&content, path)
}

/// Parse a TOML string into a `TestDefinition` (useful for testing).
pub fn parse_test_str(content: &str, source_path: &Path) -> Result<TestDefinition> {
    let parsed: TomlTestFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let category = parse_category(&parsed.test.category)?;

    Ok(TestDefinition {
        id: parsed.test.id,
        title: parsed.test.title,
        description: parsed.test.description,
        category,
        time_limit_secs: parsed.test.time_limit_secs,
        passing_percentage: parsed.test.passing_percentage,
        questions: parsed.questions,
    })
}

/// Recursively load all `.toml` test files from a directory.
pub fn load_test_directory(dir: &Path) -> Result<Vec<TestDefinition>> {
    let mut tests = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            tests.extend(load_test_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_test(&path) {
                Ok(test) => tests.push(test),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(tests)
}

/// Load a test file, or every test file under a directory.
pub fn load_tests(path: &Path) -> Result<Vec<TestDefinition>> {
    if path.is_dir() {
        load_test_directory(path)
    } else {
        Ok(vec![parse_test(path)?])
    }
}

/// Load an answer sheet from a `.json` or `.toml` file.
pub fn parse_answer_sheet(path: &Path) -> Result<AnswerSheet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON: {}", path.display()))
    }
}

/// Load every `.json` / `.toml` answer sheet in a directory (not recursive).
pub fn load_answer_sheets(dir: &Path) -> Result<Vec<AnswerSheet>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p
                    .extension()
                    .is_some_and(|ext| ext == "json" || ext == "toml")
        })
        .collect();
    paths.sort();

    let mut sheets = Vec::with_capacity(paths.len());
    for path in paths {
        match parse_answer_sheet(&path) {
            Ok(sheet) => sheets.push(sheet),
            Err(e) => tracing::warn!("skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(sheets)
}

/// Load a student roster from a `.json` or `.toml` file.
pub fn parse_roster(path: &Path) -> Result<Roster> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster: {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON: {}", path.display()))
    } else {
        toml::from_str(&content)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))
    }
}

/// A warning from test validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a test definition for authoring errors.
///
/// Scoring tolerates every issue reported here; this check is meant to run
/// before a test is published. Surveys carry no answer key, so key checks
/// are skipped for them.
pub fn validate_test(test: &TestDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let keyed = test.category == TestCategory::Test;

    if test.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "test has no questions".into(),
        });
    }

    if let Some(pct) = test.passing_percentage {
        if !(0.0..=100.0).contains(&pct) {
            warnings.push(ValidationWarning {
                question_id: None,
                message: format!("passing_percentage {pct} is outside 0-100"),
            });
        }
    }

    let mut seen_ids = HashSet::new();
    for q in &test.questions {
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!("duplicate question ID: {}", q.id),
            ));
        }
    }

    for q in &test.questions {
        if q.text.trim().is_empty() {
            warnings.push(ValidationWarning::question(&q.id, "question text is empty"));
        }

        if let Some(points) = q.points {
            if points <= 0 {
                warnings.push(ValidationWarning::question(
                    &q.id,
                    format!("points must be positive, got {points} (scored as 1)"),
                ));
            }
        }

        let mut option_ids = HashSet::new();
        for opt in &q.options {
            if !option_ids.insert(&opt.id) {
                warnings.push(ValidationWarning::question(
                    &q.id,
                    format!("duplicate option ID: {}", opt.id),
                ));
            }
        }

        let correct = q.correct_option_ids().count();
        match q.question_type {
            QuestionType::Single | QuestionType::Multiple if q.options.is_empty() => {
                warnings.push(ValidationWarning::question(
                    &q.id,
                    format!("{} question has no options", q.question_type),
                ));
            }
            QuestionType::Single if keyed && correct != 1 => {
                warnings.push(ValidationWarning::question(
                    &q.id,
                    format!("single question must have exactly one correct option, found {correct}"),
                ));
            }
            QuestionType::Multiple if keyed && correct == 0 => {
                warnings.push(ValidationWarning::question(
                    &q.id,
                    "multiple question has no correct options",
                ));
            }
            QuestionType::Text | QuestionType::Number | QuestionType::Rating
                if !q.options.is_empty() =>
            {
                warnings.push(ValidationWarning::question(
                    &q.id,
                    format!("{} question has options that will be ignored", q.question_type),
                ));
            }
            _ => {}
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[test]
id = "geo-1"
title = "Geography basics"
description = "Capitals and rivers"
category = "test"
time_limit_secs = 600
passing_percentage = 60.0

[[questions]]
id = "capital"
type = "single"
text = "Capital of France?"
options = [
    { id = "a", text = "Lyon" },
    { id = "b", text = "Paris", is_correct = true },
    { id = "c", text = "Nice" },
]

[[questions]]
id = "rivers"
type = "multiple"
text = "Which of these are rivers?"
points = 2
options = [
    { id = "x", text = "Danube", is_correct = true },
    { id = "y", text = "Alps" },
    { id = "z", text = "Rhine", is_correct = true },
]

[[questions]]
id = "essay"
type = "text"
text = "Describe your favourite city."
"#;

    #[test]
    fn parse_valid_toml() {
        let def = parse_test_str(VALID_TOML, &PathBuf::from("geo.toml")).unwrap();
        assert_eq!(def.id, "geo-1");
        assert_eq!(def.time_limit_secs, Some(600));
        assert_eq!(def.questions.len(), 3);
        assert_eq!(def.questions[1].points, Some(2));
        assert!(validate_test(&def).is_empty());

        let test = def.into_test();
        match &test.questions[1].kind {
            QuestionKind::Multiple {
                correct_option_ids, ..
            } => {
                assert!(correct_option_ids.contains("x"));
                assert!(correct_option_ids.contains("z"));
                assert_eq!(correct_option_ids.len(), 2);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[test]
id = "minimal"
title = "Minimal"

[[questions]]
id = "q1"
type = "text"
"#;
        let def = parse_test_str(toml, &PathBuf::from("min.toml")).unwrap();
        assert_eq!(def.category, TestCategory::Test);
        assert!(def.time_limit_secs.is_none());
        assert!(def.questions[0].options.is_empty());
    }

    #[test]
    fn parse_radio_and_checkbox_aliases() {
        let toml = r#"
[test]
id = "aliases"
title = "Aliases"

[[questions]]
id = "pick-one"
type = "radio"
text = "Pick one"
options = [
    { id = "a", text = "A", is_correct = true },
    { id = "b", text = "B" },
]

[[questions]]
id = "pick-many"
type = "checkbox"
text = "Pick many"
options = [
    { id = "x", text = "X", is_correct = true },
    { id = "y", text = "Y", is_correct = true },
]
"#;
        let def = parse_test_str(toml, &PathBuf::from("aliases.toml")).unwrap();
        assert_eq!(def.questions[0].question_type, QuestionType::Single);
        assert_eq!(def.questions[1].question_type, QuestionType::Multiple);
        assert!(validate_test(&def).is_empty());

        let test = def.into_test();
        assert!(matches!(
            test.questions[0].kind,
            QuestionKind::Single { ref correct_option_id, .. } if correct_option_id.as_deref() == Some("a")
        ));
        assert!(matches!(
            test.questions[1].kind,
            QuestionKind::Multiple { ref correct_option_ids, .. } if correct_option_ids.len() == 2
        ));
    }

    #[test]
    fn parse_survey_category() {
        let toml = r#"
[test]
id = "s"
title = "Feedback"
category = "survey"
"#;
        let def = parse_test_str(toml, &PathBuf::from("s.toml")).unwrap();
        assert_eq!(def.category, TestCategory::Survey);
    }

    #[test]
    fn parse_unknown_category_fails() {
        let toml = r#"
[test]
id = "s"
title = "Feedback"
category = "exam-ish"
"#;
        assert!(parse_test_str(toml, &PathBuf::from("s.toml")).is_err());
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_test_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn validate_authoring_errors() {
        let toml = r#"
[test]
id = "broken"
title = "Broken"
passing_percentage = 120.0

[[questions]]
id = "two-right"
type = "single"
text = "Pick"
options = [
    { id = "a", is_correct = true },
    { id = "b", is_correct = true },
]

[[questions]]
id = "none-right"
type = "multiple"
text = "Pick many"
options = [{ id = "a" }, { id = "a" }]

[[questions]]
id = "no-options"
type = "single"
text = "Empty"

[[questions]]
id = "open"
type = "text"
text = ""
points = 0
options = [{ id = "a" }]

[[questions]]
id = "open"
type = "rating"
text = "Rate us"
"#;
        let def = parse_test_str(toml, &PathBuf::from("broken.toml")).unwrap();
        let warnings = validate_test(&def);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));

        assert!(has("outside 0-100"));
        assert!(has("exactly one correct option, found 2"));
        assert!(has("no correct options"));
        assert!(has("duplicate option ID: a"));
        assert!(has("single question has no options"));
        assert!(has("question text is empty"));
        assert!(has("points must be positive"));
        assert!(has("options that will be ignored"));
        assert!(has("duplicate question ID: open"));
    }

    #[test]
    fn surveys_skip_answer_key_checks() {
        let toml = r#"
[test]
id = "fb"
title = "Feedback"
category = "survey"

[[questions]]
id = "format"
type = "single"
text = "Preferred format"
options = [{ id = "live", text = "Live" }, { id = "online", text = "Online" }]
"#;
        let def = parse_test_str(toml, &PathBuf::from("fb.toml")).unwrap();
        assert!(validate_test(&def).is_empty());
    }

    #[test]
    fn validate_empty_test() {
        let toml = r#"
[test]
id = "empty"
title = "Empty"
"#;
        let def = parse_test_str(toml, &PathBuf::from("e.toml")).unwrap();
        let warnings = validate_test(&def);
        assert!(warnings.iter().any(|w| w.message.contains("no questions")));
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("geo.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not toml [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let tests = load_test_directory(dir.path()).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].id, "geo-1");
    }

    #[test]
    fn load_answer_sheets_from_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"test_id": "geo-1", "user_id": "u1", "answers": {"capital": "b"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.toml"),
            "test_id = \"geo-1\"\nuser_id = \"u2\"\n\n[answers]\nrivers = [\"x\", \"z\"]\n",
        )
        .unwrap();

        let sheets = load_answer_sheets(dir.path()).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].user_id, "u1");
        assert_eq!(sheets[1].user_id, "u2");
    }

    #[test]
    fn parse_roster_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        std::fs::write(
            &path,
            r#"
[[students]]
id = "u1"
name = "Ann"
group = "CS-21"

[[students]]
id = "u2"
"#,
        )
        .unwrap();

        let roster = parse_roster(&path).unwrap();
        assert_eq!(roster.students.len(), 2);
        assert_eq!(roster.group_of("u1"), Some("CS-21"));
        assert_eq!(roster.group_of("u2"), None);
    }
}
