// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Streaming multipart/form-data encoding of one dump and its metadata.
//!
//! The body is laid out as:
//!
//! ```text
//! --BOUNDARY\r\nContent-Disposition: form-data; name="apiKey"\r\n\r\n<key>\r\n
//! ... appName, version, versionCode, crashtime, metadata (JSON), uploadtime ...
//! --BOUNDARY\r\nContent-Disposition: form-data; name="minidump"; filename="<name>"\r\n
//! Content-Type: application/octet-stream\r\n\r\n<dump bytes>\r\n--BOUNDARY--
//! ```
//!
//! Everything before the dump bytes is rendered up front; the dump itself is
//! streamed from disk in [`CHUNK_SIZE`] pieces.

use std::io;

use bytes::{Bytes, BytesMut};
use dumplink_core::{CoreError, CrashDump, UploadMetadata};
use futures::stream::{self, Stream, StreamExt};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::error::UploadError;

/// Boundary shared by every upload for the lifetime of the process.
pub const BOUNDARY: &str = "----dumplinkBoundary7MA4YWxkTrZu0gW";

/// Read size used when streaming dump contents.
pub const CHUNK_SIZE: usize = 4096;

/// Field name of the binary dump part.
pub const DUMP_FIELD: &str = "minidump";

const CRLF: &[u8] = b"\r\n";

/// Value of the request's `Content-Type` header.
pub fn content_type() -> String {
	format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Renders every text part plus the headers of the dump part.
pub fn encode_head(
	metadata: &UploadMetadata,
	dump: &CrashDump,
	upload_time_ms: i64,
) -> Result<Bytes, CoreError> {
	let payload = metadata.payload_json()?;

	let mut head = BytesMut::with_capacity(512 + payload.len());
	text_part(&mut head, "apiKey", None, metadata.api_key.expose());
	text_part(&mut head, "appName", None, &metadata.app_name);
	text_part(&mut head, "version", None, &metadata.version);
	text_part(&mut head, "versionCode", None, &metadata.version_code.to_string());
	text_part(&mut head, "crashtime", None, &dump.modified_ms.to_string());
	text_part(&mut head, "metadata", Some("application/json"), &payload);
	text_part(&mut head, "uploadtime", None, &upload_time_ms.to_string());

	delimiter(&mut head);
	head.extend_from_slice(
		format!(
			"Content-Disposition: form-data; name=\"{DUMP_FIELD}\"; filename=\"{}\"\r\n",
			escape_filename(&dump.file_name())
		)
		.as_bytes(),
	);
	head.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
	head.extend_from_slice(CRLF);

	Ok(head.freeze())
}

/// Closes the dump part and the body.
pub fn encode_tail() -> Bytes {
	Bytes::from(format!("\r\n--{BOUNDARY}--"))
}

fn delimiter(buf: &mut BytesMut) {
	buf.extend_from_slice(b"--");
	buf.extend_from_slice(BOUNDARY.as_bytes());
	buf.extend_from_slice(CRLF);
}

fn text_part(buf: &mut BytesMut, name: &str, content_type: Option<&str>, value: &str) {
	delimiter(buf);
	buf.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes());
	if let Some(content_type) = content_type {
		buf.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
	}
	buf.extend_from_slice(CRLF);
	buf.extend_from_slice(value.as_bytes());
	buf.extend_from_slice(CRLF);
}

/// Percent-encodes the characters that would terminate the quoted
/// `filename` parameter or the header line.
fn escape_filename(name: &str) -> String {
	name.replace('"', "%22")
		.replace('\r', "%0D")
		.replace('\n', "%0A")
}

/// A multipart body whose dump contents have not been read yet.
pub struct MultipartBody {
	head: Bytes,
	file: File,
	tail: Bytes,
}

impl MultipartBody {
	/// Renders the text parts and opens the dump for streaming.
	pub async fn open(
		metadata: &UploadMetadata,
		dump: &CrashDump,
		upload_time_ms: i64,
	) -> Result<Self, UploadError> {
		let head = encode_head(metadata, dump, upload_time_ms)?;
		let file = File::open(&dump.path)
			.await
			.map_err(|source| UploadError::Open {
				path: dump.path.clone(),
				source,
			})?;

		Ok(Self {
			head,
			file,
			tail: encode_tail(),
		})
	}

	/// The body as a byte stream: head, dump chunks, tail.
	pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + Sync + 'static {
		let Self { head, file, tail } = self;
		stream::once(async move { Ok::<_, io::Error>(head) })
			.chain(ReaderStream::with_capacity(file, CHUNK_SIZE))
			.chain(stream::once(async move { Ok(tail) }))
	}
}
