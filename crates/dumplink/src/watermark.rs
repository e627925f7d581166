// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable "last successful upload" watermark.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WatermarkError;

/// Key under which the watermark is persisted.
pub const WATERMARK_KEY: &str = "lastSuccessfulUploadTime";

/// A durable slot holding the modification time (epoch millis) of the most
/// recent successfully uploaded dump.
///
/// Only the upload worker thread calls into a store, so implementations need
/// no locking of their own beyond `Send + Sync`.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
	/// Returns the stored watermark, or 0 when none has been written.
	async fn get(&self) -> Result<i64, WatermarkError>;

	async fn set(&self, timestamp: i64) -> Result<(), WatermarkError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
	#[serde(rename = "lastSuccessfulUploadTime")]
	last_successful_upload_time: i64,
}

/// Stores the watermark as a small JSON file, one per host application.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
	path: PathBuf,
}

impl FileWatermarkStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Store for one host application: `<state_dir>/<namespace>.<app_identity>.json`.
	pub fn for_app(state_dir: &Path, namespace: &str, app_identity: &str) -> Self {
		let file_name = format!(
			"{}.{}.json",
			sanitize_component(namespace),
			sanitize_component(app_identity)
		);
		Self::new(state_dir.join(file_name))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
	async fn get(&self) -> Result<i64, WatermarkError> {
		let contents = match tokio::fs::read_to_string(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "no watermark stored yet");
				return Ok(0);
			}
			Err(e) => return Err(e.into()),
		};

		let file: WatermarkFile = serde_json::from_str(&contents)?;
		Ok(file.last_successful_upload_time)
	}

	async fn set(&self, timestamp: i64) -> Result<(), WatermarkError> {
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		let json = serde_json::to_string(&WatermarkFile {
			last_successful_upload_time: timestamp,
		})?;

		let mut tmp_path = self.path.clone().into_os_string();
		tmp_path.push(".tmp");
		let tmp_path = PathBuf::from(tmp_path);

		tokio::fs::write(&tmp_path, json).await?;
		tokio::fs::rename(&tmp_path, &self.path).await?;

		debug!(path = %self.path.display(), watermark = timestamp, "saved watermark");
		Ok(())
	}
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
	value: AtomicI64,
}

impl MemoryWatermarkStore {
	pub fn new(initial: i64) -> Self {
		Self {
			value: AtomicI64::new(initial),
		}
	}

	pub fn current(&self) -> i64 {
		self.value.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
	async fn get(&self) -> Result<i64, WatermarkError> {
		Ok(self.current())
	}

	async fn set(&self, timestamp: i64) -> Result<(), WatermarkError> {
		self.value.store(timestamp, Ordering::SeqCst);
		Ok(())
	}
}

/// Keeps identities like `com.example.app` readable while stripping path
/// separators and other characters that do not belong in a file name.
fn sanitize_component(component: &str) -> String {
	let sanitized: String = component
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
				c
			} else {
				'_'
			}
		})
		.collect();

	match sanitized.trim_matches('.') {
		"" => "default".to_string(),
		trimmed => trimmed.to_string(),
	}
}
