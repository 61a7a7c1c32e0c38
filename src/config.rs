//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/tlc.sqlite"
//!
//! [curation]
//! context_char_budget = 8000
//! merge_max_retries = 3
//!
//! [oracle]
//! provider = "openai"
//! model = "gpt-4o-mini"
//!
//! [taxonomy]
//! "Creative Works" = ["Music Releases", "Film & Television", "Awards & Honors"]
//! ```
//!
//! Every section except `[db]` is optional. See [`load_config`] for the
//! validation rules.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use timeline_curator_core::dedup::DEFAULT_DUPLICATE_THRESHOLD;
use timeline_curator_core::normalize::DEFAULT_TITLE_MAX_CHARS;
use timeline_curator_core::taxonomy::Taxonomy;
use timeline_curator_core::window::{
    WindowBudget, DEFAULT_CANDIDATE_SUMMARY_BUDGET, DEFAULT_CONTEXT_CHAR_BUDGET,
    DEFAULT_MAX_CONTEXT_EVENTS,
};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub curation: CurationConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub taxonomy: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurationConfig {
    #[serde(default = "default_context_char_budget")]
    pub context_char_budget: usize,
    #[serde(default = "default_candidate_summary_budget")]
    pub candidate_summary_budget: usize,
    #[serde(default = "default_max_context_events")]
    pub max_context_events: usize,
    #[serde(default = "default_merge_max_retries")]
    pub merge_max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    #[serde(default = "default_entity_concurrency")]
    pub entity_concurrency: usize,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            context_char_budget: default_context_char_budget(),
            candidate_summary_budget: default_candidate_summary_budget(),
            max_context_events: default_max_context_events(),
            merge_max_retries: default_merge_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            duplicate_threshold: default_duplicate_threshold(),
            entity_concurrency: default_entity_concurrency(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

impl CurationConfig {
    pub fn window_budget(&self) -> WindowBudget {
        WindowBudget {
            max_chars: self.context_char_budget,
            max_events: self.max_context_events,
        }
    }
}

fn default_context_char_budget() -> usize {
    DEFAULT_CONTEXT_CHAR_BUDGET
}
fn default_candidate_summary_budget() -> usize {
    DEFAULT_CANDIDATE_SUMMARY_BUDGET
}
fn default_max_context_events() -> usize {
    DEFAULT_MAX_CONTEXT_EVENTS
}
fn default_merge_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2_000
}
fn default_duplicate_threshold() -> f64 {
    DEFAULT_DUPLICATE_THRESHOLD
}
fn default_entity_concurrency() -> usize {
    4
}
fn default_title_max_chars() -> usize {
    DEFAULT_TITLE_MAX_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: default_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
        }
    }
}

impl OracleConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// The taxonomy this configuration selects: the `[taxonomy]` table if
    /// present, otherwise the built-in one.
    pub fn taxonomy(&self) -> Result<Taxonomy> {
        match &self.taxonomy {
            Some(map) => Taxonomy::from_map(map).context("Invalid [taxonomy] section"),
            None => Ok(Taxonomy::builtin()),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let c = &config.curation;

    // Validate curation budgets
    if c.context_char_budget == 0 {
        anyhow::bail!("curation.context_char_budget must be > 0");
    }
    if c.candidate_summary_budget == 0 {
        anyhow::bail!("curation.candidate_summary_budget must be > 0");
    }
    if c.candidate_summary_budget > c.context_char_budget {
        anyhow::bail!("curation.candidate_summary_budget must be <= curation.context_char_budget");
    }
    if c.max_context_events == 0 {
        anyhow::bail!("curation.max_context_events must be > 0");
    }
    if c.title_max_chars == 0 {
        anyhow::bail!("curation.title_max_chars must be > 0");
    }
    if !(0.0..=1.0).contains(&c.duplicate_threshold) {
        anyhow::bail!("curation.duplicate_threshold must be in [0.0, 1.0]");
    }
    if c.entity_concurrency == 0 {
        anyhow::bail!("curation.entity_concurrency must be >= 1");
    }

    // Validate oracle
    match config.oracle.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown oracle provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.oracle.is_enabled() && config.oracle.model.is_none() {
        anyhow::bail!(
            "oracle.model must be specified when provider is '{}'",
            config.oracle.provider
        );
    }

    config.taxonomy()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Result<Config> {
        let content = format!("[db]\npath = \"/tmp/tlc.sqlite\"\n{}", extra);
        let config: Config = toml::from_str(&content)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.curation.context_char_budget, 8_000);
        assert_eq!(config.curation.candidate_summary_budget, 2_000);
        assert_eq!(config.curation.merge_max_retries, 3);
        assert!((config.curation.duplicate_threshold - 0.75).abs() < 1e-9);
        assert!(!config.oracle.is_enabled());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.taxonomy().unwrap(), Taxonomy::builtin());
    }

    #[test]
    fn test_openai_requires_model() {
        assert!(parse("[oracle]\nprovider = \"openai\"\n").is_err());
        assert!(parse("[oracle]\nprovider = \"openai\"\nmodel = \"gpt-4o-mini\"\n").is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(parse("[oracle]\nprovider = \"carrier-pigeon\"\n").is_err());
    }

    #[test]
    fn test_budget_rules() {
        assert!(parse("[curation]\ncontext_char_budget = 0\n").is_err());
        assert!(parse("[curation]\ncandidate_summary_budget = 9000\n").is_err());
        assert!(parse("[curation]\nduplicate_threshold = 1.5\n").is_err());
        assert!(parse("[curation]\nentity_concurrency = 0\n").is_err());
    }

    #[test]
    fn test_taxonomy_override() {
        let config = parse("[taxonomy]\n\"Sports\" = [\"Matches\", \"Transfers\"]\n").unwrap();
        let taxonomy = config.taxonomy().unwrap();
        assert!(taxonomy.validate("Sports", "Transfers").is_some());
        assert!(taxonomy.validate("Creative Works", "Music Releases").is_none());
    }

    #[test]
    fn test_invalid_taxonomy_rejected() {
        assert!(parse("[taxonomy]\n\"A\" = [\"x\"]\n\"B\" = [\"x\"]\n").is_err());
    }
}
