//! quizmark-core: data model, scoring, result lifecycle, and reports.
//!
//! Scoring itself is synchronous and side-effect free. Persistence goes
//! through the [`traits::ResultStore`] trait, implemented in
//! `quizmark-store`.

pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod results;
pub mod scoring;
pub mod session;
pub mod sheet;
pub mod statistics;
pub mod traits;
