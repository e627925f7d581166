// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policies that shape a single upload run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which plain files in the dump directory are eligible for upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPolicy {
	/// Only files modified strictly after the watermark.
	#[default]
	NewerThanWatermark,
	/// Every plain file, ignoring the watermark.
	All,
}

impl fmt::Display for ScanPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ScanPolicy::NewerThanWatermark => write!(f, "newer_than_watermark"),
			ScanPolicy::All => write!(f, "all"),
		}
	}
}

impl FromStr for ScanPolicy {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"newer_than_watermark" | "newer" => Ok(ScanPolicy::NewerThanWatermark),
			"all" => Ok(ScanPolicy::All),
			_ => Err(CoreError::InvalidScanPolicy(s.to_string())),
		}
	}
}

/// What happens to dump files once a run has attempted them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
	/// Remove every plain file in the directory at the end of the run,
	/// including dumps whose upload failed.
	#[default]
	ClearDirectory,
	/// Remove a dump only after its upload succeeded; failed dumps stay for
	/// a later run. Runs under this policy scan every file on disk, ignoring
	/// the watermark, so a failure older than the watermark is still retried.
	RetainFailed,
}

impl fmt::Display for CleanupPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CleanupPolicy::ClearDirectory => write!(f, "clear_directory"),
			CleanupPolicy::RetainFailed => write!(f, "retain_failed"),
		}
	}
}

impl FromStr for CleanupPolicy {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"clear_directory" | "clear" => Ok(CleanupPolicy::ClearDirectory),
			"retain_failed" | "retain" => Ok(CleanupPolicy::RetainFailed),
			_ => Err(CoreError::InvalidCleanupPolicy(s.to_string())),
		}
	}
}
