// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background uploader for crash dumps written by an external crash handler.
//!
//! The host application builds one [`CrashReporter`] and calls
//! [`CrashReporter::init_crash_reporting`] with the dump directory and its
//! API key. The call returns immediately; on a dedicated background thread
//! the reporter then:
//!
//! 1. collects a metadata snapshot from the [`HostContext`] and the device
//! 2. lists the dumps newer than the persisted watermark, newest first
//! 3. posts each dump as a streamed multipart request, advancing the
//!    watermark after every `200 OK`
//! 4. clears the dump directory
//!
//! Upload failures are logged and never reach the host.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dumplink::{CrashReporter, InitOptions, ProcessContext};
//!
//! # fn main() -> Result<(), dumplink::ReporterError> {
//! let reporter = CrashReporter::builder().build()?;
//! let context = Arc::new(ProcessContext::new().with_version_name("1.4.2"));
//! reporter.init_crash_reporting(
//! 	context,
//! 	InitOptions::new("/var/crash/myapp").api_key("k-123"),
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod multipart;
pub mod reporter;
pub mod scanner;
pub mod upload;
pub mod watermark;
pub mod worker;

pub use config::{default_config_path, ReporterConfig, ReporterConfigLayer, DEFAULT_NAMESPACE};
pub use error::{
	ConfigError, ExecutorError, LookupError, ReporterError, ScanError, UploadError, WatermarkError,
};
pub use executor::{TaskExecutor, DEFAULT_THREAD_NAME};
pub use metadata::{HostContext, ProcessContext};
pub use reporter::{CrashReporter, CrashReporterBuilder, InitOptions};
pub use upload::{DumpUploader, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use watermark::{FileWatermarkStore, MemoryWatermarkStore, WatermarkStore, WATERMARK_KEY};
pub use worker::{RunSummary, UploadRun};

pub use dumplink_core::{
	ApiKey, CleanupPolicy, CrashDump, DeviceContext, ScanPolicy, UploadMetadata,
};
