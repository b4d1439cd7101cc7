use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::normalize::{DURATION_FIELDS, PLAIN_NUMBER_FIELDS};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub datadog_config: DatadogConfig,
	pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatadogConfig {
	pub host: String,
	pub port: u16,
	pub namespace: String,
	pub watchlist: Vec<String>,
}

impl Default for DatadogConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".into(),
			port: 8125,
			namespace: "apcupsd".into(),
			watchlist: PLAIN_NUMBER_FIELDS.into_iter().chain(DURATION_FIELDS).map(String::from).collect(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
	pub interval_secs: u64,
	pub timeout_ms: u64,
	pub command: String,
	pub args: Vec<String>,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval_secs: 30,
			timeout_ms: 5000,
			command: "apcaccess".into(),
			args: vec!["status".into()],
		}
	}
}

impl PollConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs)
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("reading {path}: {source}")]
	Io { path: String, source: std::io::Error },
	#[error("parsing {path}: {source}")]
	Yaml { path: String, source: serde_yaml::Error },
	#[error("poll.interval_secs must be greater than zero")]
	ZeroInterval,
	#[error("poll.timeout_ms must be greater than zero")]
	ZeroTimeout,
}

impl Config {
	/// Load from `path`, falling back to defaults when the file does not exist.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let shown = path.display().to_string();
		let exists = fs::exists(path).map_err(|source| ConfigError::Io {
			path: shown.clone(),
			source,
		})?;
		if !exists {
			warn!("{shown} not found, using default configuration");
			return Ok(Default::default());
		}
		let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: shown.clone(),
			source,
		})?;
		Self::from_yaml(&contents).map_err(|e| match e {
			ConfigError::Yaml { source, .. } => ConfigError::Yaml { path: shown, source },
			other => other,
		})
	}

	pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
		let config: Config = serde_ignored::deserialize(serde_yaml::Deserializer::from_str(contents), |path| {
			warn!("Ignoring unknown configuration key {path}")
		})
		.map_err(|source| ConfigError::Yaml {
			path: "<inline>".into(),
			source,
		})?;
		if config.poll.interval_secs == 0 {
			return Err(ConfigError::ZeroInterval);
		}
		if config.poll.timeout_ms == 0 {
			return Err(ConfigError::ZeroTimeout);
		}
		Ok(config)
	}
}
