// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client builders with a consistent User-Agent header.

use reqwest::ClientBuilder;

/// SDK name used in the User-Agent.
const SDK_NAME: &str = "dumplink";
/// SDK version used in the User-Agent.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Target operating system, e.g. "linux".
const PLATFORM: &str = std::env::consts::OS;

/// Creates a client builder with the standard dumplink User-Agent header.
///
/// The uploader adds its own timeout before building.
///
/// # Example
/// ```ignore
/// let client = dumplink_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	reqwest::Client::builder().user_agent(user_agent())
}

/// Returns the standard User-Agent string.
///
/// Format: `dumplink/{version}/{os}-{arch}`
pub fn user_agent() -> String {
	format!(
		"{SDK_NAME}/{SDK_VERSION}/{PLATFORM}-{}",
		std::env::consts::ARCH
	)
}
