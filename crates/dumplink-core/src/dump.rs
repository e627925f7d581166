// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash dumps discovered on local storage.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// A dump file written by an external crash handler.
///
/// Only the path and the filesystem attributes are held here; the contents
/// are streamed from disk when the dump is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashDump {
	/// Absolute path of the dump file.
	pub path: PathBuf,
	/// Last-modified time in epoch milliseconds. Sent as `crashtime`.
	pub modified_ms: i64,
	/// Size in bytes at scan time.
	pub size: u64,
}

impl CrashDump {
	pub fn new(path: impl Into<PathBuf>, modified_ms: i64, size: u64) -> Self {
		Self {
			path: path.into(),
			modified_ms,
			size,
		}
	}

	/// Base name of the dump, used as the multipart `filename`.
	pub fn file_name(&self) -> String {
		self
			.path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_default()
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

/// Converts a filesystem timestamp to epoch milliseconds.
///
/// Times before the epoch come out negative rather than failing.
pub fn epoch_millis(time: SystemTime) -> i64 {
	DateTime::<Utc>::from(time).timestamp_millis()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn file_name_is_base_name() {
		let dump = CrashDump::new("/var/crash/app/d1.dmp", 1000, 12);
		assert_eq!(dump.file_name(), "d1.dmp");
	}

	#[test]
	fn file_name_of_root_is_empty() {
		let dump = CrashDump::new("/", 0, 0);
		assert_eq!(dump.file_name(), "");
	}

	#[test]
	fn epoch_millis_keeps_millisecond_precision() {
		let t = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
		assert_eq!(epoch_millis(t), 1_700_000_000_123);
	}

	#[test]
	fn epoch_millis_before_epoch_is_negative() {
		let t = SystemTime::UNIX_EPOCH - Duration::from_millis(5);
		assert_eq!(epoch_millis(t), -5);
	}
}
