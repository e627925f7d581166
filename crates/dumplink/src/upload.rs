// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP upload of a single dump.

use std::time::Duration;

use chrono::Utc;
use dumplink_core::{CrashDump, UploadMetadata};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Client, StatusCode};
use tracing::{debug, instrument};

use crate::error::UploadError;
use crate::multipart::{self, MultipartBody};

/// Collection endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://crash.dumplink.dev/crash";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts dumps to the collection endpoint, one request per dump.
#[derive(Debug, Clone)]
pub struct DumpUploader {
	client: Client,
	endpoint: String,
}

impl DumpUploader {
	/// Builds an uploader with its own client carrying the dumplink
	/// User-Agent and the given request timeout.
	pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
		let client = dumplink_common_http::builder().timeout(timeout).build()?;
		Ok(Self::with_client(client, endpoint))
	}

	/// Uses a caller-provided client, e.g. one shared with the host.
	pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
		Self {
			client,
			endpoint: endpoint.into(),
		}
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Uploads one dump. Only `200 OK` counts as success.
	#[instrument(skip(self, metadata, dump), fields(path = %dump.path.display(), size = dump.size))]
	pub async fn upload(&self, metadata: &UploadMetadata, dump: &CrashDump) -> Result<(), UploadError> {
		let upload_time_ms = Utc::now().timestamp_millis();
		let body = MultipartBody::open(metadata, dump, upload_time_ms).await?;

		let response = self
			.client
			.post(&self.endpoint)
			.header(CONTENT_TYPE, multipart::content_type())
			.body(Body::wrap_stream(body.into_stream()))
			.send()
			.await?;

		let status = response.status();
		// Drain so the connection can be reused; the content is not used.
		let drained = response.bytes().await.map(|b| b.len()).unwrap_or(0);
		debug!(status = status.as_u16(), response_bytes = drained, "upload response received");

		if status != StatusCode::OK {
			return Err(UploadError::UnexpectedStatus {
				status: status.as_u16(),
				reason: status.canonical_reason().unwrap_or("").to_string(),
			});
		}

		Ok(())
	}
}
