//! The `quizmark init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizmark.toml").exists() {
        println!("quizmark.toml already exists, skipping.");
    } else {
        std::fs::write("quizmark.toml", SAMPLE_CONFIG)?;
        println!("Created quizmark.toml");
    }

    std::fs::create_dir_all("tests")?;
    let example_path = std::path::Path::new("tests/example.toml");
    if example_path.exists() {
        println!("tests/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_TEST)?;
        println!("Created tests/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizmark.toml to pick a result store");
    println!("  2. Run: quizmark validate --test tests/example.toml");
    println!("  3. Run: quizmark score --test tests/example.toml --answers <sheet.json>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizmark configuration

default_store = "local"
passing_percentage = 60.0
parallelism = 4
max_retries = 3
retry_delay_ms = 500

[session]
user_id = "admin"
role = "admin"
token = "${QUIZMARK_TOKEN}"

[stores.local]
type = "file"
dir = "./quizmark-results"

# [stores.cloud]
# type = "rest"
# base_url = "https://db.example.com/v1"
# token = "${QUIZMARK_DB_TOKEN}"
"#;

const EXAMPLE_TEST: &str = r#"[test]
id = "example"
title = "Example Quiz"
description = "A short quiz to get started"
category = "test"
time_limit_secs = 600
passing_percentage = 60.0

[[questions]]
id = "capital"
type = "single"
text = "What is the capital of France?"
options = [
    { id = "a", text = "Berlin" },
    { id = "b", text = "Paris", is_correct = true },
    { id = "c", text = "Madrid" },
]

[[questions]]
id = "primes"
type = "multiple"
text = "Which of these numbers are prime?"
points = 2
options = [
    { id = "x", text = "2", is_correct = true },
    { id = "y", text = "4" },
    { id = "z", text = "7", is_correct = true },
]

[[questions]]
id = "feedback"
type = "text"
text = "Anything you would like to add?"
"#;
