use anyhow::{Context, Result};
use safe_scan_core::poll::BackoffPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub counter: CounterConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.virustotal.com/api/v3".to_string()
}
fn default_api_key_env() -> String {
    "VIRUSTOTAL_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            initial_interval_ms: default_initial_interval_ms(),
            multiplier: default_multiplier(),
            max_interval_ms: default_max_interval_ms(),
            max_attempts: default_max_attempts(),
            transient_retries: default_transient_retries(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    3000
}
fn default_initial_interval_ms() -> u64 {
    2000
}
fn default_multiplier() -> f64 {
    1.5
}
fn default_max_interval_ms() -> u64 {
    8000
}
fn default_max_attempts() -> u32 {
    20
}
fn default_transient_retries() -> u32 {
    2
}

impl PollConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.initial_interval_ms),
            multiplier: self.multiplier,
            max: Duration::from_millis(self.max_interval_ms),
            max_attempts: self.max_attempts,
            transient_retries: self.transient_retries,
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    #[serde(default = "default_feedback_path")]
    pub path: PathBuf,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            path: default_feedback_path(),
        }
    }
}

fn default_feedback_path() -> PathBuf {
    PathBuf::from("./data/feedback.jsonl")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CounterConfig {
    #[serde(default = "default_counter_backend")]
    pub backend: String,
    #[serde(default = "default_counter_path")]
    pub path: PathBuf,
    #[serde(default = "default_counter_key")]
    pub key: String,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            backend: default_counter_backend(),
            path: default_counter_path(),
            key: default_counter_key(),
        }
    }
}

fn default_counter_backend() -> String {
    "sqlite".to_string()
}
fn default_counter_path() -> PathBuf {
    PathBuf::from("./data/safe-scan.sqlite")
}
fn default_counter_key() -> String {
    "visitor-count".to_string()
}

impl CounterConfig {
    pub fn is_persistent(&self) -> bool {
        self.backend == "sqlite"
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
    // Validate scanner
    url::Url::parse(&config.scanner.base_url)
        .with_context(|| format!("scanner.base_url is not a URL: {}", config.scanner.base_url))?;
    if config.scanner.timeout_secs == 0 {
        anyhow::bail!("scanner.timeout_secs must be > 0");
    }
    if config.scanner.api_key_env.trim().is_empty() {
        anyhow::bail!("scanner.api_key_env must not be empty");
    }

    // Validate poll
    if config.poll.max_attempts < 1 {
        anyhow::bail!("poll.max_attempts must be >= 1");
    }
    if !config.poll.multiplier.is_finite() || config.poll.multiplier < 1.0 {
        anyhow::bail!("poll.multiplier must be >= 1.0");
    }
    if config.poll.initial_interval_ms > config.poll.max_interval_ms {
        anyhow::bail!("poll.initial_interval_ms must be <= poll.max_interval_ms");
    }

    // Validate counter
    match config.counter.backend.as_str() {
        "memory" | "sqlite" => {}
        other => anyhow::bail!(
            "Unknown counter backend: '{}'. Must be memory or sqlite.",
            other
        ),
    }
    if config.counter.key.trim().is_empty() {
        anyhow::bail!("counter.key must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3001");
        assert_eq!(config.scanner.api_key_env, "VIRUSTOTAL_API_KEY");
        assert_eq!(config.poll.max_attempts, 20);
        assert_eq!(config.counter.backend, "sqlite");

        let policy = config.poll.backoff();
        assert_eq!(policy.initial, Duration::from_millis(2000));
        assert_eq!(policy.max, Duration::from_millis(8000));
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
[scanner]
base_url = "http://127.0.0.1:9999/api/v3"
timeout_secs = 5

[poll]
initial_interval_ms = 5000
multiplier = 1.0
max_interval_ms = 5000

[counter]
backend = "memory"
"#,
        )
        .unwrap();
        assert_eq!(config.scanner.timeout_secs, 5);
        assert_eq!(config.poll.backoff().delay_after(7), Duration::from_millis(5000));
        assert!(!config.counter.is_persistent());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse("[counter]\nbackend = \"redis\"").is_err());
        assert!(parse("[poll]\nmax_attempts = 0").is_err());
        assert!(parse("[poll]\nmultiplier = 0.5").is_err());
        assert!(parse("[poll]\ninitial_interval_ms = 9000").is_err());
        assert!(parse("[scanner]\nbase_url = \"not a url\"").is_err());
        assert!(parse("[scanner]\ntimeout_secs = 0").is_err());
    }
}
