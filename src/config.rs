//! Configuration System
//!
//! Layered configuration for the probe: built-in defaults, then an optional
//! TOML file, then `WATCHPOST__*` environment variables. CLI flags are applied
//! on top by the binary. Tests included.

use crate::error::MonitorError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "watchpost.toml";

/// Environment prefix; nested keys are separated by `__`
/// (e.g. `WATCHPOST__SCHEDULE__INTERVAL_SECS`)
pub const ENV_PREFIX: &str = "WATCHPOST";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP method used against the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET", alias = "get", alias = "Get")]
    Get,
    #[serde(rename = "POST", alias = "post", alias = "Post")]
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!("Unsupported method: {} (must be GET or POST)", other)),
        }
    }
}

/// The monitored endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_method")]
    pub method: HttpMethod,

    /// JSON request body (POST only; `{}` when absent).
    ///
    /// Written as a JSON string, e.g. `body = '{"userId": 1}'`. The config
    /// layer folds the case of table keys, so a TOML table here would not
    /// reach the request as written and is rejected.
    #[serde(default, with = "json_text")]
    pub body: Option<serde_json::Value>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

mod json_text {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        body: &Option<Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match body {
            Some(value) => serializer.serialize_some(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Value>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| {
                serde_json::from_str(&text)
                    .map_err(|e| D::Error::custom(format!("target.body is not valid JSON: {}", e)))
            })
            .transpose()
    }
}

fn default_method() -> HttpMethod {
    HttpMethod::Post
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: default_method(),
            body: None,
            headers: BTreeMap::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Where state lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Append-only change history (JSON lines); disabled when unset
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

fn default_state_file() -> PathBuf {
    PathBuf::from("api_response.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            history_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Stop after this many cycles; run until cancelled when unset
    #[serde(default)]
    pub max_runs: Option<u64>,
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_runs: None,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// What the prober does when stored state exists but cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptStatePolicy {
    /// Warn and compare as if no prior state existed
    #[default]
    #[serde(rename = "first_run")]
    TreatAsFirstRun,
    /// Fail the cycle without touching the stored state
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Overwrite the stored snapshot even when content is unchanged,
    /// refreshing its timestamp
    #[serde(default = "default_true")]
    pub refresh_unchanged: bool,

    #[serde(default)]
    pub on_corrupt_state: CorruptStatePolicy,
}

fn default_true() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            refresh_unchanged: true,
            on_corrupt_state: CorruptStatePolicy::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Target(String),
    Storage(String),
    Schedule(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Target(msg) => write!(f, "Target: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Schedule(msg) => write!(f, "Schedule: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl MonitorConfig {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// An explicit `config_file` must exist; otherwise `watchpost.toml` in the
    /// working directory is used when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();

        match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(MonitorError::ConfigError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    debug!(path = %default_path.display(), "Using config file from working directory");
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: MonitorConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.target.url.trim().is_empty() {
            errors.push(ValidationError::Target("URL cannot be empty".to_string()));
        } else {
            match reqwest::Url::parse(&self.target.url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => errors.push(ValidationError::Target(format!(
                    "Unsupported URL scheme '{}'",
                    url.scheme()
                ))),
                Err(e) => errors.push(ValidationError::Target(format!(
                    "Invalid URL '{}': {}",
                    self.target.url, e
                ))),
            }
        }

        if self.target.request_timeout_secs == 0 {
            errors.push(ValidationError::Target(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.storage.state_file.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "State file path cannot be empty".to_string(),
            ));
        }

        if self.schedule.interval_secs == 0 {
            errors.push(ValidationError::Schedule(
                "Interval must be greater than zero".to_string(),
            ));
        }

        if self.schedule.max_runs == Some(0) {
            errors.push(ValidationError::Schedule(
                "max_runs must be at least 1 (omit it to run until cancelled)".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `validate` folded into a single `MonitorError`
    pub fn validated(self) -> Result<Self, MonitorError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            MonitorError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}
