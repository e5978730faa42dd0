//! quizmark-store: result store backends.
//!
//! Implements the `ResultStore` trait for an in-memory map, a local
//! directory of JSON files, and a remote document database, and loads the
//! `quizmark.toml` configuration that selects between them.

pub mod config;
pub mod file;
pub mod memory;
pub mod rest;

pub use config::{create_store, load_config, load_config_from, QuizmarkConfig, StoreConfig};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use rest::RestStore;
