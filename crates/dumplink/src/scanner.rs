// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Discovery and removal of dump files in the dump directory.

use std::io::ErrorKind;
use std::path::Path;

use dumplink_core::{epoch_millis, CrashDump, ScanPolicy};
use tracing::{debug, info, trace, warn};

use crate::error::ScanError;

/// Lists the dumps eligible for upload, newest first.
///
/// The directory is created when it does not exist. Only plain files are
/// considered; with [`ScanPolicy::NewerThanWatermark`] a file must have been
/// modified strictly after `watermark` (epoch millis).
pub async fn scan(
	dir: &Path,
	policy: ScanPolicy,
	watermark: i64,
) -> Result<Vec<CrashDump>, ScanError> {
	ensure_directory(dir).await?;

	let mut dumps: Vec<CrashDump> = list_plain_files(dir)
		.await?
		.into_iter()
		.filter(|dump| match policy {
			ScanPolicy::NewerThanWatermark => dump.modified_ms > watermark,
			ScanPolicy::All => true,
		})
		.collect();
	sort_newest_first(&mut dumps);

	debug!(
		dir = %dir.display(),
		policy = %policy,
		watermark,
		count = dumps.len(),
		"scanned dump directory"
	);

	Ok(dumps)
}

/// Orders dumps by modification time, newest first. Equal times fall back to
/// path order so the result does not depend on directory listing order.
pub fn sort_newest_first(dumps: &mut [CrashDump]) {
	dumps.sort_by(|a, b| {
		b.modified_ms
			.cmp(&a.modified_ms)
			.then_with(|| a.path.cmp(&b.path))
	});
}

/// Deletes every plain file in `dir`, returning how many were removed.
///
/// Failures are logged per file and never stop the sweep.
pub async fn remove_plain_files(dir: &Path) -> usize {
	let dumps = match list_plain_files(dir).await {
		Ok(dumps) => dumps,
		Err(e) => {
			warn!(dir = %dir.display(), error = %e, "could not list dump directory for cleanup");
			return 0;
		}
	};

	let mut removed = 0;
	for dump in &dumps {
		if remove_dump(dump).await {
			removed += 1;
		}
	}
	removed
}

/// Deletes a single dump. A dump that is already gone counts as removed.
pub async fn remove_dump(dump: &CrashDump) -> bool {
	match tokio::fs::remove_file(&dump.path).await {
		Ok(()) => {
			trace!(path = %dump.path.display(), "removed dump");
			true
		}
		Err(e) if e.kind() == ErrorKind::NotFound => true,
		Err(e) => {
			warn!(path = %dump.path.display(), error = %e, "could not remove dump");
			false
		}
	}
}

async fn ensure_directory(dir: &Path) -> Result<(), ScanError> {
	match tokio::fs::metadata(dir).await {
		Ok(metadata) if metadata.is_dir() => Ok(()),
		Ok(_) => Err(ScanError::NotADirectory(dir.to_path_buf())),
		Err(e) if e.kind() == ErrorKind::NotFound => {
			tokio::fs::create_dir_all(dir)
				.await
				.map_err(|source| ScanError::CreateDir {
					path: dir.to_path_buf(),
					source,
				})?;
			info!(dir = %dir.display(), "created dump directory");
			Ok(())
		}
		Err(source) => Err(ScanError::ReadDir {
			path: dir.to_path_buf(),
			source,
		}),
	}
}

async fn list_plain_files(dir: &Path) -> Result<Vec<CrashDump>, ScanError> {
	let read_dir_error = |source| ScanError::ReadDir {
		path: dir.to_path_buf(),
		source,
	};

	let dir = tokio::fs::canonicalize(dir)
		.await
		.unwrap_or_else(|_| dir.to_path_buf());
	let mut entries = tokio::fs::read_dir(&dir).await.map_err(read_dir_error)?;
	let mut dumps = Vec::new();

	while let Some(entry) = entries.next_entry().await.map_err(read_dir_error)? {
		let path = entry.path();

		// DirEntry::file_type does not follow symlinks.
		match entry.file_type().await {
			Ok(file_type) if file_type.is_file() => {}
			Ok(_) => {
				trace!(path = %path.display(), "skipping non-regular entry");
				continue;
			}
			Err(e) => {
				warn!(path = %path.display(), error = %e, "could not stat entry");
				continue;
			}
		}

		let metadata = match entry.metadata().await {
			Ok(metadata) => metadata,
			Err(e) => {
				warn!(path = %path.display(), error = %e, "could not read dump metadata");
				continue;
			}
		};

		let modified = match metadata.modified() {
			Ok(modified) => epoch_millis(modified),
			Err(e) => {
				warn!(path = %path.display(), error = %e, "dump has no modification time");
				continue;
			}
		};

		dumps.push(CrashDump::new(path, modified, metadata.len()));
	}

	Ok(dumps)
}
