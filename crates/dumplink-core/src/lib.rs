// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the dumplink crash-dump uploader.
//!
//! This crate holds the plain data shared by the uploader SDK (`dumplink`)
//! and its command-line front end:
//!
//! - [`CrashDump`]: a dump file discovered on local storage
//! - [`UploadMetadata`]: the immutable client/device snapshot sent with every dump
//! - [`ApiKey`]: the ingestion key, redacted in logs and zeroized on drop
//! - [`ScanPolicy`] and [`CleanupPolicy`]: how a run picks and removes dumps

pub mod api_key;
pub mod dump;
pub mod error;
pub mod metadata;
pub mod policy;

pub use api_key::{ApiKey, REDACTED};
pub use dump::{epoch_millis, CrashDump};
pub use error::{CoreError, Result};
pub use metadata::{DeviceContext, UploadMetadata, UNKNOWN_VERSION_CODE};
pub use policy::{CleanupPolicy, ScanPolicy};
