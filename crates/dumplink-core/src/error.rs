// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types shared across dumplink crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
	#[error("API key is empty")]
	EmptyApiKey,

	#[error("invalid scan policy: {0}")]
	InvalidScanPolicy(String),

	#[error("invalid cleanup policy: {0}")]
	InvalidCleanupPolicy(String),

	#[error("extras must be a JSON object, got {0}")]
	InvalidExtras(&'static str),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
