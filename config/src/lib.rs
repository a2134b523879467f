//! Configuration for offload.
//!
//! Loaded from `~/.offload/config.toml`, or from the path in `OFFLOAD_CONFIG`.
//! Every section is optional; a missing file is not an error.
//!
//! ```toml
//! [dispatcher]
//! thread_name_prefix = "offload-worker"
//! stack_size_bytes = 8388608
//!
//! [log]
//! filter = "offload=debug"
//!
//! [demo]
//! cycles = 5
//! heartbeat_ms = 50
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "OFFLOAD_CONFIG";

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "offload-worker";

/// Smallest worker stack accepted from config.
pub const MIN_STACK_SIZE_BYTES: usize = 16 * 1024;

const DEFAULT_DEMO_CYCLES: u64 = 5;
const DEFAULT_HEARTBEAT_MS: u64 = 50;

fn default_thread_name_prefix() -> String {
    DEFAULT_THREAD_NAME_PREFIX.to_string()
}

const fn default_demo_cycles() -> u64 {
    DEFAULT_DEMO_CYCLES
}

const fn default_heartbeat_ms() -> u64 {
    DEFAULT_HEARTBEAT_MS
}

#[derive(Debug, Default, Deserialize)]
pub struct OffloadConfig {
    pub dispatcher: Option<DispatcherConfig>,
    pub log: Option<LogConfig>,
    pub demo: Option<DemoConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config at {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

/// Worker spawning settings.
///
/// ```toml
/// [dispatcher]
/// thread_name_prefix = "offload-worker"
/// stack_size_bytes = 8388608
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatcherConfig {
    /// Worker threads are named `{prefix}-{dispatch_id}`.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Stack size for worker threads. Platform default when unset.
    pub stack_size_bytes: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins when set.
    pub filter: Option<String>,
}

/// Defaults for the demo binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_demo_cycles")]
    pub cycles: u64,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cycles: DEFAULT_DEMO_CYCLES,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}

/// Expand `${VAR}` references from the environment. Unset variables become empty.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".offload").join("config.toml"))
}

impl OffloadConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        Self::parse(&content, path).map(Some)
    }

    /// Parse config text. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = match toml::from_str(content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse config at {}: {}", path.display(), err);
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        config.expand_env();
        config.validate(path)?;
        Ok(config)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn dispatcher(&self) -> DispatcherConfig {
        self.dispatcher.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log
            .as_ref()
            .and_then(|log| log.filter.as_deref())
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
    }

    #[must_use]
    pub fn demo(&self) -> DemoConfig {
        self.demo.unwrap_or_default()
    }

    fn expand_env(&mut self) {
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.thread_name_prefix = expand_env_vars(&dispatcher.thread_name_prefix);
        }
        if let Some(filter) = self.log.as_mut().and_then(|log| log.filter.as_mut()) {
            *filter = expand_env_vars(filter);
        }
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        };

        if let Some(dispatcher) = &self.dispatcher {
            if dispatcher.thread_name_prefix.trim().is_empty() {
                return Err(invalid(
                    "dispatcher.thread_name_prefix must not be empty".to_string(),
                ));
            }
            if let Some(bytes) = dispatcher.stack_size_bytes
                && bytes < MIN_STACK_SIZE_BYTES
            {
                return Err(invalid(format!(
                    "dispatcher.stack_size_bytes must be at least {MIN_STACK_SIZE_BYTES}, got {bytes}"
                )));
            }
        }

        if let Some(demo) = &self.demo
            && demo.heartbeat_ms == 0
        {
            return Err(invalid("demo.heartbeat_ms must be greater than 0".to_string()));
        }

        Ok(())
    }
}
