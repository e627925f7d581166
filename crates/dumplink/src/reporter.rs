// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The host-facing entry point.
//!
//! A [`CrashReporter`] owns the background executor and the HTTP client.
//! Each [`CrashReporter::init_crash_reporting`] call validates its options on
//! the calling thread and queues one [`UploadRun`]; metadata collection,
//! scanning, uploads and cleanup all happen on the executor thread.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dumplink_core::{ApiKey, CleanupPolicy, ScanPolicy, REDACTED};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::ReporterConfig;
use crate::error::{ExecutorError, ReporterError};
use crate::executor::TaskExecutor;
use crate::metadata::{self, HostContext};
use crate::upload::DumpUploader;
use crate::watermark::{FileWatermarkStore, WatermarkStore};
use crate::worker::{RunSummary, UploadRun};

/// Arguments of one initialization call.
#[derive(Clone)]
pub struct InitOptions {
	/// Directory the external crash handler writes dumps into.
	pub dump_dir: PathBuf,
	pub api_key: Option<String>,
	/// Overrides the host's own version lookup.
	pub app_version: Option<String>,
	/// Extra key-values for the `metadata` part. Must be a JSON object.
	pub extras: Option<Value>,
}

impl InitOptions {
	pub fn new(dump_dir: impl Into<PathBuf>) -> Self {
		Self {
			dump_dir: dump_dir.into(),
			api_key: None,
			app_version: None,
			extras: None,
		}
	}

	pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
		self.api_key = Some(api_key.into());
		self
	}

	pub fn app_version(mut self, version: impl Into<String>) -> Self {
		self.app_version = Some(version.into());
		self
	}

	pub fn extras(mut self, extras: Value) -> Self {
		self.extras = Some(extras);
		self
	}
}

impl fmt::Debug for InitOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InitOptions")
			.field("dump_dir", &self.dump_dir)
			.field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
			.field("app_version", &self.app_version)
			.field("extras", &self.extras)
			.finish()
	}
}

#[derive(Default)]
pub struct CrashReporterBuilder {
	config: ReporterConfig,
	watermark_store: Option<Arc<dyn WatermarkStore>>,
	http_client: Option<Client>,
}

impl CrashReporterBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the whole configuration. Later setters still apply on top.
	pub fn config(mut self, config: ReporterConfig) -> Self {
		self.config = config;
		self
	}

	pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.config.endpoint = endpoint.into();
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.config.state_dir = dir.into();
		self
	}

	pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
		self.config.namespace = namespace.into();
		self
	}

	pub fn scan_policy(mut self, policy: ScanPolicy) -> Self {
		self.config.scan_policy = policy;
		self
	}

	pub fn cleanup_policy(mut self, policy: CleanupPolicy) -> Self {
		self.config.cleanup_policy = policy;
		self
	}

	pub fn thread_name(mut self, name: impl Into<String>) -> Self {
		self.config.thread_name = name.into();
		self
	}

	/// Uses `store` for every run instead of a per-application file under
	/// the state directory.
	pub fn watermark_store(mut self, store: Arc<dyn WatermarkStore>) -> Self {
		self.watermark_store = Some(store);
		self
	}

	/// Uses a caller-built client; the configured timeout is then ignored.
	pub fn http_client(mut self, client: Client) -> Self {
		self.http_client = Some(client);
		self
	}

	/// Builds the HTTP client and starts the executor thread.
	pub fn build(self) -> Result<CrashReporter, ReporterError> {
		let uploader = match self.http_client {
			Some(client) => DumpUploader::with_client(client, self.config.endpoint.clone()),
			None => DumpUploader::new(self.config.endpoint.clone(), self.config.request_timeout)
				.map_err(ReporterError::HttpClient)?,
		};
		let executor = TaskExecutor::start(self.config.thread_name.clone())?;

		info!(
			endpoint = %self.config.endpoint,
			thread = %self.config.thread_name,
			scan_policy = %self.config.scan_policy,
			cleanup_policy = %self.config.cleanup_policy,
			user_agent = %dumplink_common_http::user_agent(),
			"crash reporter started"
		);

		Ok(CrashReporter {
			inner: Arc::new(Inner {
				config: self.config,
				uploader: Arc::new(uploader),
				watermark_store: self.watermark_store,
				last_summary: Arc::new(Mutex::new(None)),
				executor,
			}),
		})
	}
}

struct Inner {
	config: ReporterConfig,
	uploader: Arc<DumpUploader>,
	watermark_store: Option<Arc<dyn WatermarkStore>>,
	last_summary: Arc<Mutex<Option<RunSummary>>>,
	executor: TaskExecutor,
}

/// Cheap to clone; all clones share one executor thread.
#[derive(Clone)]
pub struct CrashReporter {
	inner: Arc<Inner>,
}

impl CrashReporter {
	pub fn builder() -> CrashReporterBuilder {
		CrashReporterBuilder::new()
	}

	pub fn config(&self) -> &ReporterConfig {
		&self.inner.config
	}

	/// Queues one run over `options.dump_dir`. Never fails: problems are
	/// logged and, for a missing API key, no run is queued.
	pub fn init_crash_reporting(&self, context: Arc<dyn HostContext>, options: InitOptions) {
		if let Err(e) = self.try_init_crash_reporting(context, options) {
			error!(error = %e, "crash reporting not initialized");
		}
	}

	/// Like [`init_crash_reporting`](Self::init_crash_reporting) but hands
	/// the error back.
	pub fn try_init_crash_reporting(
		&self,
		context: Arc<dyn HostContext>,
		options: InitOptions,
	) -> Result<(), ReporterError> {
		let api_key = match options.api_key {
			Some(key) if !key.is_empty() => ApiKey::new(key).map_err(ReporterError::InvalidApiKey)?,
			_ => return Err(ReporterError::MissingApiKey),
		};

		let InitOptions {
			dump_dir,
			app_version,
			extras,
			..
		} = options;
		let config = &self.inner.config;
		let uploader = Arc::clone(&self.inner.uploader);
		let store_override = self.inner.watermark_store.clone();
		let state_dir = config.state_dir.clone();
		let namespace = config.namespace.clone();
		let scan_policy = config.scan_policy;
		let cleanup_policy = config.cleanup_policy;
		let last_summary = Arc::clone(&self.inner.last_summary);

		debug!(dir = %dump_dir.display(), "queueing upload run");
		self.inner.executor.post(async move {
			let metadata = metadata::collect(&*context, api_key, app_version.as_deref(), extras);
			let watermark_store = store_override.unwrap_or_else(|| {
				Arc::new(FileWatermarkStore::for_app(
					&state_dir,
					&namespace,
					&context.app_identity(),
				)) as Arc<dyn WatermarkStore>
			});

			let summary = UploadRun {
				dump_dir,
				uploader,
				metadata: Arc::new(metadata),
				watermark_store,
				scan_policy,
				cleanup_policy,
			}
			.execute()
			.await;

			*last_summary.lock().unwrap_or_else(PoisonError::into_inner) = Some(summary);
		})?;

		Ok(())
	}

	/// Blocks until every run queued before this call has finished.
	pub fn flush(&self) -> Result<(), ReporterError> {
		if self.inner.executor.is_worker_thread() {
			return Err(ReporterError::FlushFromWorker);
		}

		let (done_tx, done_rx) = std_mpsc::channel();
		self.inner.executor.post(async move {
			let _ = done_tx.send(());
		})?;
		done_rx
			.recv()
			.map_err(|_| ReporterError::Executor(ExecutorError::Shutdown))
	}

	/// Summary of the most recently finished run.
	pub fn last_summary(&self) -> Option<RunSummary> {
		self.inner
			.last_summary
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Finishes queued runs and stops the executor thread. Later
	/// initialization calls are rejected.
	pub fn shutdown(&self) {
		self.inner.executor.shutdown();
	}
}
