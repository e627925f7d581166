// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reporter configuration: built-in defaults, then an optional TOML file,
//! then `DUMPLINK_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dumplink_core::{CleanupPolicy, ScanPolicy};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::executor::DEFAULT_THREAD_NAME;
use crate::upload::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};

/// Prefix of the persisted watermark key.
pub const DEFAULT_NAMESPACE: &str = "dumplink";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
	pub endpoint: String,
	pub request_timeout: Duration,
	/// Directory holding the watermark files.
	pub state_dir: PathBuf,
	pub namespace: String,
	pub scan_policy: ScanPolicy,
	pub cleanup_policy: CleanupPolicy,
	pub thread_name: String,
}

impl Default for ReporterConfig {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_ENDPOINT.to_string(),
			request_timeout: DEFAULT_TIMEOUT,
			state_dir: default_state_dir(),
			namespace: DEFAULT_NAMESPACE.to_string(),
			scan_policy: ScanPolicy::default(),
			cleanup_policy: CleanupPolicy::default(),
			thread_name: DEFAULT_THREAD_NAME.to_string(),
		}
	}
}

impl ReporterConfig {
	/// Loads defaults < `path` (or the default config file) < environment.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let path = path.map(Path::to_path_buf).or_else(default_config_path);

		let mut layer = match path {
			Some(path) => ReporterConfigLayer::from_file(&path)?,
			None => ReporterConfigLayer::default(),
		};
		layer.merge(ReporterConfigLayer::from_env()?);
		layer.finalize()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReporterConfigLayer {
	pub endpoint: Option<String>,
	pub request_timeout_secs: Option<u64>,
	pub state_dir: Option<PathBuf>,
	pub namespace: Option<String>,
	pub scan_policy: Option<ScanPolicy>,
	pub cleanup_policy: Option<CleanupPolicy>,
	pub thread_name: Option<String>,
}

impl ReporterConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.endpoint.is_some() {
			self.endpoint = other.endpoint;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.state_dir.is_some() {
			self.state_dir = other.state_dir;
		}
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
		if other.scan_policy.is_some() {
			self.scan_policy = other.scan_policy;
		}
		if other.cleanup_policy.is_some() {
			self.cleanup_policy = other.cleanup_policy;
		}
		if other.thread_name.is_some() {
			self.thread_name = other.thread_name;
		}
	}

	pub fn finalize(self) -> Result<ReporterConfig, ConfigError> {
		let defaults = ReporterConfig::default();

		let endpoint = self.endpoint.unwrap_or(defaults.endpoint);
		validate_endpoint(&endpoint)?;

		let request_timeout = match self.request_timeout_secs {
			Some(0) => {
				return Err(ConfigError::invalid_value(
					"request_timeout_secs",
					"must be greater than zero",
				))
			}
			Some(secs) => Duration::from_secs(secs),
			None => defaults.request_timeout,
		};

		let namespace = self.namespace.unwrap_or(defaults.namespace);
		if namespace.trim().is_empty() {
			return Err(ConfigError::invalid_value("namespace", "must not be empty"));
		}

		let thread_name = self.thread_name.unwrap_or(defaults.thread_name);
		if thread_name.contains('\0') {
			return Err(ConfigError::invalid_value(
				"thread_name",
				"must not contain NUL bytes",
			));
		}

		Ok(ReporterConfig {
			endpoint,
			request_timeout,
			state_dir: self.state_dir.unwrap_or(defaults.state_dir),
			namespace,
			scan_policy: self.scan_policy.unwrap_or(defaults.scan_policy),
			cleanup_policy: self.cleanup_policy.unwrap_or(defaults.cleanup_policy),
			thread_name,
		})
	}

	pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
		toml::from_str(content).map_err(|source| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// A missing file yields an empty layer.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			debug!(path = %path.display(), "config file not found, skipping");
			return Ok(Self::default());
		}

		debug!(path = %path.display(), "loading config file");
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
			path: path.to_path_buf(),
			source,
		})?;
		let layer = Self::from_toml_str(&content, path)?;
		trace!(?layer, "parsed config layer from TOML");
		Ok(layer)
	}

	/// Convention: `DUMPLINK_<FIELD>`. Empty values are ignored.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_vars(|name| std::env::var(name).ok())
	}

	pub fn from_env_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

		let request_timeout_secs = match var("DUMPLINK_REQUEST_TIMEOUT_SECS") {
			Some(v) => Some(v.parse::<u64>().map_err(|_| {
				ConfigError::invalid_value(
					"DUMPLINK_REQUEST_TIMEOUT_SECS",
					format!("invalid u64 value '{v}'"),
				)
			})?),
			None => None,
		};
		let scan_policy = match var("DUMPLINK_SCAN_POLICY") {
			Some(v) => Some(
				v.parse::<ScanPolicy>()
					.map_err(|e| ConfigError::invalid_value("DUMPLINK_SCAN_POLICY", format!("{e}")))?,
			),
			None => None,
		};
		let cleanup_policy = match var("DUMPLINK_CLEANUP_POLICY") {
			Some(v) => Some(
				v.parse::<CleanupPolicy>()
					.map_err(|e| ConfigError::invalid_value("DUMPLINK_CLEANUP_POLICY", format!("{e}")))?,
			),
			None => None,
		};

		Ok(Self {
			endpoint: var("DUMPLINK_ENDPOINT"),
			request_timeout_secs,
			state_dir: var("DUMPLINK_STATE_DIR").map(PathBuf::from),
			namespace: var("DUMPLINK_NAMESPACE"),
			scan_policy,
			cleanup_policy,
			thread_name: var("DUMPLINK_THREAD_NAME"),
		})
	}
}

/// `<config dir>/dumplink/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("dumplink").join("config.toml"))
}

fn default_state_dir() -> PathBuf {
	dirs::data_dir()
		.unwrap_or_else(std::env::temp_dir)
		.join("dumplink")
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
	let url = Url::parse(endpoint)
		.map_err(|e| ConfigError::invalid_value("endpoint", format!("'{endpoint}': {e}")))?;
	match url.scheme() {
		"http" | "https" => Ok(()),
		other => Err(ConfigError::invalid_value(
			"endpoint",
			format!("unsupported scheme '{other}'"),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use tempfile::TempDir;

	fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| map.get(name).cloned()
	}

	#[test]
	fn test_default_values() {
		let config = ReporterConfig::default();
		assert_eq!(config.endpoint, "https://crash.dumplink.dev/crash");
		assert_eq!(config.request_timeout, Duration::from_secs(30));
		assert_eq!(config.namespace, "dumplink");
		assert_eq!(config.scan_policy, ScanPolicy::NewerThanWatermark);
		assert_eq!(config.cleanup_policy, CleanupPolicy::ClearDirectory);
		assert_eq!(config.thread_name, "dumplink-worker");
		assert!(config.state_dir.ends_with("dumplink"));
	}

	#[test]
	fn test_layer_finalize_defaults() {
		let config = ReporterConfigLayer::default().finalize().unwrap();
		assert_eq!(config, ReporterConfig::default());
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = ReporterConfigLayer {
			endpoint: Some("https://a.example/crash".to_string()),
			namespace: Some("base".to_string()),
			..Default::default()
		};
		base.merge(ReporterConfigLayer {
			endpoint: Some("https://b.example/crash".to_string()),
			cleanup_policy: Some(CleanupPolicy::RetainFailed),
			..Default::default()
		});

		assert_eq!(base.endpoint.as_deref(), Some("https://b.example/crash"));
		assert_eq!(base.namespace.as_deref(), Some("base"));
		assert_eq!(base.cleanup_policy, Some(CleanupPolicy::RetainFailed));
	}

	#[test]
	fn test_from_toml() {
		let toml = r#"
endpoint = "http://localhost:8080/crash"
request_timeout_secs = 5
state_dir = "/var/lib/dumplink"
scan_policy = "all"
cleanup_policy = "retain_failed"
"#;
		let config = ReporterConfigLayer::from_toml_str(toml, Path::new("config.toml"))
			.unwrap()
			.finalize()
			.unwrap();

		assert_eq!(config.endpoint, "http://localhost:8080/crash");
		assert_eq!(config.request_timeout, Duration::from_secs(5));
		assert_eq!(config.state_dir, PathBuf::from("/var/lib/dumplink"));
		assert_eq!(config.scan_policy, ScanPolicy::All);
		assert_eq!(config.cleanup_policy, CleanupPolicy::RetainFailed);
	}

	#[test]
	fn test_unknown_toml_key_is_rejected() {
		let result = ReporterConfigLayer::from_toml_str("retries = 3", Path::new("config.toml"));
		assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
	}

	#[test]
	fn test_missing_file_is_empty_layer() {
		let tmp = TempDir::new().unwrap();
		let layer = ReporterConfigLayer::from_file(&tmp.path().join("absent.toml")).unwrap();
		assert_eq!(layer, ReporterConfigLayer::default());
	}

	#[test]
	fn test_from_file() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("config.toml");
		std::fs::write(&path, "namespace = \"acme\"\n").unwrap();

		let layer = ReporterConfigLayer::from_file(&path).unwrap();
		assert_eq!(layer.namespace.as_deref(), Some("acme"));
	}

	#[test]
	fn test_from_env_vars() {
		let layer = ReporterConfigLayer::from_env_vars(env(&[
			("DUMPLINK_ENDPOINT", "https://collector.example/crash"),
			("DUMPLINK_REQUEST_TIMEOUT_SECS", "12"),
			("DUMPLINK_SCAN_POLICY", "ALL"),
			("DUMPLINK_CLEANUP_POLICY", "retain"),
			("DUMPLINK_THREAD_NAME", ""),
		]))
		.unwrap();

		assert_eq!(
			layer.endpoint.as_deref(),
			Some("https://collector.example/crash")
		);
		assert_eq!(layer.request_timeout_secs, Some(12));
		assert_eq!(layer.scan_policy, Some(ScanPolicy::All));
		assert_eq!(layer.cleanup_policy, Some(CleanupPolicy::RetainFailed));
		assert_eq!(layer.thread_name, None);
	}

	#[test]
	fn test_env_rejects_bad_numbers_and_policies() {
		let err = ReporterConfigLayer::from_env_vars(env(&[(
			"DUMPLINK_REQUEST_TIMEOUT_SECS",
			"soon",
		)]))
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "DUMPLINK_REQUEST_TIMEOUT_SECS"));

		let err =
			ReporterConfigLayer::from_env_vars(env(&[("DUMPLINK_SCAN_POLICY", "sometimes")]))
				.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "DUMPLINK_SCAN_POLICY"));
	}

	#[test]
	fn test_env_overrides_file() {
		let mut layer =
			ReporterConfigLayer::from_toml_str("namespace = \"file\"", Path::new("c.toml")).unwrap();
		layer.merge(
			ReporterConfigLayer::from_env_vars(env(&[("DUMPLINK_NAMESPACE", "env")])).unwrap(),
		);
		assert_eq!(layer.finalize().unwrap().namespace, "env");
	}

	#[test]
	fn test_finalize_validation() {
		let bad_scheme = ReporterConfigLayer {
			endpoint: Some("ftp://example.com/crash".to_string()),
			..Default::default()
		};
		assert!(bad_scheme.finalize().is_err());

		let not_a_url = ReporterConfigLayer {
			endpoint: Some("crash server".to_string()),
			..Default::default()
		};
		assert!(not_a_url.finalize().is_err());

		let zero_timeout = ReporterConfigLayer {
			request_timeout_secs: Some(0),
			..Default::default()
		};
		assert!(zero_timeout.finalize().is_err());

		let blank_namespace = ReporterConfigLayer {
			namespace: Some("  ".to_string()),
			..Default::default()
		};
		assert!(blank_namespace.finalize().is_err());
	}
}
