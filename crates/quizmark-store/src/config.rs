//! Configuration loading and store factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizmark_core::engine::GradingConfig;
use quizmark_core::session::{Role, Session};
use quizmark_core::traits::ResultStore;

use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::rest::RestStore;

/// Configuration for a single result store.
///
/// Note: Custom Debug impl masks tokens to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_results_dir")]
        dir: PathBuf,
    },
    Rest {
        base_url: String,
        #[serde(default)]
        token: Option<String>,
    },
    Memory,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::File { dir } => f.debug_struct("File").field("dir", dir).finish(),
            StoreConfig::Rest { base_url, token } => f
                .debug_struct("Rest")
                .field("base_url", base_url)
                .field("token", &token.as_ref().map(|_| "***"))
                .finish(),
            StoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./quizmark-results")
}

/// The `[session]` table.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_user")]
    pub user_id: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: default_user(),
            role: Role::Student,
            token: None,
        }
    }
}

fn default_user() -> String {
    "anonymous".to_string()
}

/// Top-level quizmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizmarkConfig {
    /// Store used when none is named explicitly.
    #[serde(default = "default_store")]
    pub default_store: String,
    /// Default pass mark for tests that do not set their own.
    #[serde(default = "default_passing_percentage")]
    pub passing_percentage: f64,
    /// Max concurrent saves during batch grading.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Max retries on transient store errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub session: SessionConfig,
    /// Store configurations keyed by name.
    #[serde(default)]
    pub stores: HashMap<String, StoreConfig>,
}

fn default_store() -> String {
    "local".to_string()
}
fn default_passing_percentage() -> f64 {
    60.0
}
fn default_parallelism() -> usize {
    4
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    500
}

impl Default for QuizmarkConfig {
    fn default() -> Self {
        Self {
            default_store: default_store(),
            passing_percentage: default_passing_percentage(),
            parallelism: default_parallelism(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            session: SessionConfig::default(),
            stores: HashMap::new(),
        }
    }
}

impl QuizmarkConfig {
    /// The acting session described by the `[session]` table.
    pub fn session(&self) -> Session {
        Session {
            user_id: self.session.user_id.clone(),
            role: self.session.role,
            token: self.session.token.clone().filter(|t| !t.is_empty()),
        }
    }

    pub fn grading_config(&self) -> GradingConfig {
        GradingConfig {
            parallelism: self.parallelism,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Look up a store by name, falling back to `default_store`.
    ///
    /// The default store name resolves to a file store under
    /// `./quizmark-results` when it is not configured.
    pub fn store_config(&self, name: Option<&str>) -> Result<(String, StoreConfig)> {
        let name = name.unwrap_or(self.default_store.as_str());
        match self.stores.get(name) {
            Some(config) => Ok((name.to_string(), config.clone())),
            None if name == self.default_store => Ok((
                name.to_string(),
                StoreConfig::File {
                    dir: default_results_dir(),
                },
            )),
            None => {
                let mut known: Vec<&str> = self.stores.keys().map(String::as_str).collect();
                known.sort_unstable();
                anyhow::bail!(
                    "store '{name}' is not configured (known stores: {})",
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )
            }
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::File { dir } => StoreConfig::File {
            dir: PathBuf::from(resolve_env_vars(&dir.to_string_lossy())),
        },
        StoreConfig::Rest { base_url, token } => StoreConfig::Rest {
            base_url: resolve_env_vars(base_url),
            token: token.as_ref().map(|t| resolve_env_vars(t)),
        },
        StoreConfig::Memory => StoreConfig::Memory,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizmark.toml` in the current directory
/// 2. `~/.config/quizmark/config.toml`
///
/// Environment variable overrides: `QUIZMARK_USER`, `QUIZMARK_ROLE`, `QUIZMARK_TOKEN`.
pub fn load_config() -> Result<QuizmarkConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizmarkConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("quizmark.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizmarkConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizmarkConfig::default(),
    };

    finish_config(config, |key| std::env::var(key).ok())
}

/// Apply environment overrides and resolve `${VAR}` references.
fn finish_config(
    mut config: QuizmarkConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<QuizmarkConfig> {
    if let Some(user) = env("QUIZMARK_USER") {
        config.session.user_id = user;
    }
    if let Some(role) = env("QUIZMARK_ROLE") {
        config.session.role = role
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("invalid QUIZMARK_ROLE")?;
    }
    if let Some(token) = env("QUIZMARK_TOKEN") {
        config.session.token = Some(token);
    }

    config.session.token = config.session.token.as_deref().map(resolve_env_vars);
    config.stores = config
        .stores
        .iter()
        .map(|(k, v)| (k.clone(), resolve_store_config(v)))
        .collect();

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizmark"))
}

/// Create a store instance from its configuration.
///
/// Remote stores use the store's own token if set, else the session's.
pub fn create_store(config: &StoreConfig, session: &Session) -> Arc<dyn ResultStore> {
    match config {
        StoreConfig::File { dir } => Arc::new(FileStore::new(dir.clone())),
        StoreConfig::Rest { base_url, token } => {
            let token = token
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| session.token.clone());
            Arc::new(RestStore::new(base_url, token))
        }
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZMARK_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZMARK_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZMARK_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no vars"), "no vars");
        assert_eq!(resolve_env_vars("dangling ${"), "dangling ${");
        std::env::remove_var("_QUIZMARK_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = QuizmarkConfig::default();
        assert_eq!(config.default_store, "local");
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.session().role, Role::Student);
        assert_eq!(
            config.grading_config().retry_delay,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn parse_store_config() {
        let toml_str = r#"
default_store = "cloud"
passing_percentage = 75.0

[session]
user_id = "teacher"
role = "admin"

[stores.local]
type = "file"
dir = "./results"

[stores.cloud]
type = "rest"
base_url = "https://db.example.com/v1"
token = "abc"

[stores.scratch]
type = "memory"
"#;
        let config: QuizmarkConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stores.len(), 3);
        assert_eq!(config.passing_percentage, 75.0);
        assert!(config.session().is_admin());

        let (name, store) = config.store_config(None).unwrap();
        assert_eq!(name, "cloud");
        assert!(matches!(store, StoreConfig::Rest { .. }));
        assert!(matches!(
            config.store_config(Some("scratch")).unwrap().1,
            StoreConfig::Memory
        ));
    }

    #[test]
    fn unconfigured_default_store_is_a_local_dir() {
        let config = QuizmarkConfig::default();
        let (_, store) = config.store_config(None).unwrap();
        assert!(matches!(store, StoreConfig::File { .. }));

        let err = config.store_config(Some("cloud")).unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn env_overrides_session() {
        let env = |key: &str| match key {
            "QUIZMARK_USER" => Some("root".to_string()),
            "QUIZMARK_ROLE" => Some("admin".to_string()),
            "QUIZMARK_TOKEN" => Some("t0ken".to_string()),
            _ => None,
        };
        let config = finish_config(QuizmarkConfig::default(), env).unwrap();
        let session = config.session();
        assert_eq!(session.user_id, "root");
        assert!(session.is_admin());
        assert_eq!(session.token.as_deref(), Some("t0ken"));
    }

    #[test]
    fn bad_role_override_is_rejected() {
        let env = |key: &str| (key == "QUIZMARK_ROLE").then(|| "owner".to_string());
        let err = finish_config(QuizmarkConfig::default(), env).unwrap_err();
        assert!(format!("{err:#}").contains("unknown role"));
    }

    #[test]
    fn debug_masks_tokens() {
        let store = StoreConfig::Rest {
            base_url: "https://db".into(),
            token: Some("secret".into()),
        };
        assert!(!format!("{store:?}").contains("secret"));

        let session = SessionConfig {
            token: Some("secret".into()),
            ..Default::default()
        };
        assert!(!format!("{session:?}").contains("secret"));
    }

    #[test]
    fn rest_store_falls_back_to_session_token() {
        let session = Session::admin("a").with_token("from-session");
        let store = create_store(
            &StoreConfig::Rest {
                base_url: "http://localhost".into(),
                token: None,
            },
            &session,
        );
        assert_eq!(store.name(), "rest");
        assert_eq!(create_store(&StoreConfig::Memory, &session).name(), "memory");
    }
}
