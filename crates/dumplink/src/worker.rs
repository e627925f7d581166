// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One scan, upload and cleanup cycle over the dump directory.

use std::path::PathBuf;
use std::sync::Arc;

use dumplink_core::{CleanupPolicy, ScanPolicy, UploadMetadata};
use tracing::{error, info, instrument, warn};

use crate::scanner;
use crate::upload::DumpUploader;
use crate::watermark::WatermarkStore;

/// Everything a run needs. Built on the calling thread and moved onto the
/// executor.
pub struct UploadRun {
	pub dump_dir: PathBuf,
	pub uploader: Arc<DumpUploader>,
	pub metadata: Arc<UploadMetadata>,
	pub watermark_store: Arc<dyn WatermarkStore>,
	pub scan_policy: ScanPolicy,
	pub cleanup_policy: CleanupPolicy,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
	/// Dumps selected by the scan.
	pub discovered: usize,
	pub uploaded: usize,
	pub failed: usize,
	/// Files removed from the dump directory.
	pub deleted: usize,
	/// Watermark at the end of the run.
	pub watermark: i64,
	/// The scan failed and nothing was uploaded or deleted.
	pub aborted: bool,
}

impl UploadRun {
	/// The scan policy actually applied.
	///
	/// With [`CleanupPolicy::RetainFailed`] every dump still on disk is one
	/// that was never uploaded: successes are deleted right away. The
	/// watermark may already be past an older failure, so it must not gate
	/// the scan or the failure would never be retried.
	pub fn effective_scan_policy(&self) -> ScanPolicy {
		match self.cleanup_policy {
			CleanupPolicy::RetainFailed => ScanPolicy::All,
			CleanupPolicy::ClearDirectory => self.scan_policy,
		}
	}

	/// Runs to completion. Failures are logged and reflected in the summary;
	/// nothing is returned to the caller as an error.
	#[instrument(skip(self), fields(dir = %self.dump_dir.display()))]
	pub async fn execute(self) -> RunSummary {
		let mut summary = RunSummary::default();

		let mut watermark = match self.watermark_store.get().await {
			Ok(watermark) => watermark,
			Err(e) => {
				warn!(error = %e, "could not read watermark, treating as 0");
				0
			}
		};
		summary.watermark = watermark;

		let dumps = match scanner::scan(&self.dump_dir, self.effective_scan_policy(), watermark).await
		{
			Ok(dumps) => dumps,
			Err(e) => {
				error!(error = %e, "scan failed, skipping run");
				summary.aborted = true;
				return summary;
			}
		};
		summary.discovered = dumps.len();

		for dump in &dumps {
			match self.uploader.upload(&self.metadata, dump).await {
				Ok(()) => {
					summary.uploaded += 1;
					info!(path = %dump.path.display(), crashtime = dump.modified_ms, "uploaded dump");

					if dump.modified_ms > watermark {
						watermark = dump.modified_ms;
						if let Err(e) = self.watermark_store.set(watermark).await {
							warn!(error = %e, watermark, "could not persist watermark");
						}
					}

					if self.cleanup_policy == CleanupPolicy::RetainFailed && scanner::remove_dump(dump).await {
						summary.deleted += 1;
					}
				}
				Err(e) => {
					summary.failed += 1;
					warn!(path = %dump.path.display(), error = %e, "dump upload failed");
				}
			}
		}
		summary.watermark = watermark;

		if self.cleanup_policy == CleanupPolicy::ClearDirectory {
			summary.deleted = scanner::remove_plain_files(&self.dump_dir).await;
		}

		info!(
			discovered = summary.discovered,
			uploaded = summary.uploaded,
			failed = summary.failed,
			deleted = summary.deleted,
			watermark = summary.watermark,
			cleanup = %self.cleanup_policy,
			"upload run finished"
		);

		summary
	}
}
