pub mod compare;
pub mod grade;
pub mod init;
pub mod report;
pub mod score;
pub mod submit;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use quizmark_core::model::Test;
use quizmark_core::parser;
use quizmark_core::sheet::AnswerSheet;

/// Load a single test definition and turn it into a scorable test.
pub(crate) fn load_test(path: &Path) -> Result<Test> {
    Ok(parser::parse_test(path)?.into_test())
}

/// Load an answer sheet and check that it belongs to `test`.
pub(crate) fn load_sheet_for(path: &Path, test: &Test) -> Result<AnswerSheet> {
    let sheet = parser::parse_answer_sheet(path)?;
    anyhow::ensure!(
        sheet.test_id == test.id,
        "answer sheet {} is for test '{}', not '{}'",
        path.display(),
        sheet.test_id,
        test.id
    );
    Ok(sheet)
}
