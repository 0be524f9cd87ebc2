//! Configuration management for navflow
//!
//! Values are resolved from defaults, then `NAVFLOW_*` environment variables,
//! then an optional `navflow.yaml` file. Later sources win.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "navflow.yaml";
const ENV_PREFIX: &str = "NAVFLOW";

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path to the configuration file with invalid YAML content
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the configuration field
        field: String,
        /// The invalid value that was provided
        value: String,
        /// How to fix it
        hint: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// Descriptive message about the validation failure
        message: String,
    },
}

/// Runtime settings for graph caching and workflow execution
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding one JSON file per cached unified graph
    pub cache_dir: PathBuf,
    /// Age after which a cached graph is treated as absent (default: 86400)
    pub cache_ttl_seconds: u64,
    /// Block execution cap for one workflow run (default: 1000)
    pub max_workflow_iterations: usize,
    /// Finished asynchronous runs kept for polling (default: 100)
    pub max_retained_executions: usize,
    /// Age after which finished asynchronous runs are pruned (default: 3600)
    pub execution_retention_seconds: u64,
    /// Whether navigation sleeps for an edge's final wait time (default: true)
    pub apply_final_wait: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("navflow_graph_cache"),
            cache_ttl_seconds: 86_400,
            max_workflow_iterations: 1000,
            max_retained_executions: 100,
            execution_retention_seconds: 3600,
            apply_final_wait: true,
        }
    }
}

impl Config {
    /// Create a configuration from defaults, environment and YAML file
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_vars();

        match YamlConfig::load_or_default() {
            Ok(yaml_config) => {
                yaml_config.apply_to_config(&mut config);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load YAML configuration, falling back to env vars and defaults: {}",
                    e
                );
            }
        }

        if let Err(e) = config.validate() {
            tracing::warn!("Invalid configuration ({}), using defaults", e);
            return Self::default();
        }

        config
    }

    /// Get the global configuration instance
    pub fn global() -> &'static Self {
        static CONFIG: std::sync::OnceLock<Config> = std::sync::OnceLock::new();
        CONFIG.get_or_init(Config::new)
    }

    fn apply_env_vars(&mut self) {
        let loader = EnvLoader::new(ENV_PREFIX);

        if let Some(dir) = loader.load_optional::<String>("CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        self.cache_ttl_seconds = loader.load_parsed("CACHE_TTL_SECONDS", self.cache_ttl_seconds);
        self.max_workflow_iterations =
            loader.load_parsed("MAX_WORKFLOW_ITERATIONS", self.max_workflow_iterations);
        self.max_retained_executions =
            loader.load_parsed("MAX_RETAINED_EXECUTIONS", self.max_retained_executions);
        self.execution_retention_seconds = loader.load_parsed(
            "EXECUTION_RETENTION_SECONDS",
            self.execution_retention_seconds,
        );
        self.apply_final_wait = loader.load_parsed("APPLY_FINAL_WAIT", self.apply_final_wait);
    }

    /// Cache TTL as a [`Duration`]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Execution retention as a [`Duration`]
    pub fn execution_retention(&self) -> Duration {
        Duration::from_secs(self.execution_retention_seconds)
    }

    /// Find the navflow.yaml configuration file
    ///
    /// The search order is:
    /// 1. Current working directory: `navflow.yaml`
    /// 2. Home directory: `~/.config/navflow/navflow.yaml`
    pub fn find_yaml_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home_dir) = dirs::home_dir() {
            search_paths.push(home_dir.join(".config").join("navflow").join(CONFIG_FILE_NAME));
        }

        let found = search_paths.into_iter().find(|p| p.is_file());
        match &found {
            Some(path) => tracing::debug!("Found configuration file: {:?}", path),
            None => tracing::debug!("No navflow.yaml configuration file found"),
        }
        found
    }

    /// Validate the current configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl_seconds".to_string(),
                value: self.cache_ttl_seconds.to_string(),
                hint: "cache_ttl_seconds must be at least 1".to_string(),
            });
        }
        if self.max_workflow_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_workflow_iterations".to_string(),
                value: self.max_workflow_iterations.to_string(),
                hint: "max_workflow_iterations must be at least 1".to_string(),
            });
        }
        if self.max_retained_executions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retained_executions".to_string(),
                value: self.max_retained_executions.to_string(),
                hint: "max_retained_executions must be at least 1".to_string(),
            });
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "cache_dir cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Generate an example YAML configuration file content
    pub fn example_yaml_config() -> &'static str {
        r#"# navflow.yaml
cache_dir: "/var/tmp/navflow_graph_cache"
cache_ttl_seconds: 86400
max_workflow_iterations: 1000
max_retained_executions: 100
execution_retention_seconds: 3600
apply_final_wait: true
"#
    }
}

/// Configuration loaded from navflow.yaml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
    /// Cache TTL override
    pub cache_ttl_seconds: Option<u64>,
    /// Iteration cap override
    pub max_workflow_iterations: Option<usize>,
    /// Retained execution count override
    pub max_retained_executions: Option<usize>,
    /// Execution retention override
    pub execution_retention_seconds: Option<u64>,
    /// Final wait override
    pub apply_final_wait: Option<bool>,
}

impl YamlConfig {
    /// Apply YAML values to an existing Config; YAML takes precedence
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(ref dir) = self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(v) = self.cache_ttl_seconds {
            config.cache_ttl_seconds = v;
        }
        if let Some(v) = self.max_workflow_iterations {
            config.max_workflow_iterations = v;
        }
        if let Some(v) = self.max_retained_executions {
            config.max_retained_executions = v;
        }
        if let Some(v) = self.execution_retention_seconds {
            config.execution_retention_seconds = v;
        }
        if let Some(v) = self.apply_final_wait {
            config.apply_final_wait = v;
        }
    }

    /// Load YAML configuration from a file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("Loading YAML configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Try to load YAML configuration, returning default if no file is found
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Config::find_yaml_config_file() {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Loads prefixed environment variables with typed fallbacks
#[derive(Debug)]
struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    fn load_parsed<T: FromStr>(&self, suffix: &str, default: T) -> T {
        self.load_optional(suffix).unwrap_or(default)
    }

    fn load_optional<T: FromStr>(&self, suffix: &str) -> Option<T> {
        std::env::var(self.key(suffix))
            .ok()
            .and_then(|v| v.parse().ok())
    }
}
