// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the uploader SDK.
//!
//! None of these reach the host application through
//! [`CrashReporter::init_crash_reporting`](crate::CrashReporter::init_crash_reporting);
//! they are logged where the unit of work they belong to ends.

use std::path::PathBuf;

use dumplink_core::CoreError;
use thiserror::Error;

/// The dump directory could not be prepared or listed. Aborts the run.
#[derive(Debug, Error)]
pub enum ScanError {
	#[error("could not create dump directory {path}: {source}")]
	CreateDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("could not read dump directory {path}: {source}")]
	ReadDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{0} exists but is not a directory")]
	NotADirectory(PathBuf),
}

#[derive(Debug, Error)]
pub enum WatermarkError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Failure of a single dump upload. The run moves on to the next dump.
#[derive(Debug, Error)]
pub enum UploadError {
	#[error("could not open dump {path}: {source}")]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	#[error("server responded {status} {reason}")]
	UnexpectedStatus { status: u16, reason: String },

	#[error("could not encode metadata: {0}")]
	Metadata(#[from] CoreError),
}

#[derive(Debug, Error)]
pub enum ExecutorError {
	#[error("could not spawn executor thread: {0}")]
	Spawn(#[source] std::io::Error),

	#[error("executor failed to start: {0}")]
	StartupFailed(String),

	#[error("executor has been shut down")]
	Shutdown,
}

/// A best-effort host lookup that produced no value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
	#[error("{0} is not available")]
	Unavailable(&'static str),

	#[error("{what} lookup failed: {message}")]
	Failed { what: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum ReporterError {
	#[error("no API key provided")]
	MissingApiKey,

	#[error("invalid API key: {0}")]
	InvalidApiKey(#[source] CoreError),

	#[error("could not build HTTP client: {0}")]
	HttpClient(#[source] reqwest::Error),

	#[error("flush called from the executor thread")]
	FlushFromWorker,

	#[error(transparent)]
	Executor(#[from] ExecutorError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}

impl ConfigError {
	pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			key: key.into(),
			message: message.into(),
		}
	}
}
