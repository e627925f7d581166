// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client, application and device metadata attached to every upload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api_key::ApiKey;
use crate::error::{CoreError, Result};

/// Version code reported when the host cannot provide one.
pub const UNKNOWN_VERSION_CODE: i64 = -1;

/// Device, operating system, locale and network details.
///
/// Every field is best-effort: lookups that fail leave an empty string, or
/// `-1` for `os_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
	/// "linux", "macos", "windows", "android"
	pub platform: String,
	/// Numeric OS version (kernel major, SDK level).
	pub os_version: i64,
	/// Human readable OS release, e.g. "Ubuntu 24.04 LTS".
	pub os_release: String,
	pub brand: String,
	pub manufacturer: String,
	pub model: String,
	/// ISO 3166 country code from the system locale.
	pub country: String,
	/// ISO 639 language code from the system locale.
	pub language: String,
	pub carrier: String,
}

impl Default for DeviceContext {
	fn default() -> Self {
		Self {
			platform: String::new(),
			os_version: -1,
			os_release: String::new(),
			brand: String::new(),
			manufacturer: String::new(),
			model: String::new(),
			country: String::new(),
			language: String::new(),
			carrier: String::new(),
		}
	}
}

/// Immutable snapshot taken once per initialization and shared by every
/// upload of the run.
#[derive(Debug, Clone)]
pub struct UploadMetadata {
	pub api_key: ApiKey,
	pub app_name: String,
	pub version: String,
	pub version_code: i64,
	pub device: DeviceContext,
	/// Caller supplied key-values. Must be a JSON object when present.
	pub extras: Option<Value>,
}

#[derive(Serialize)]
struct MetadataPayload<'a> {
	#[serde(flatten)]
	device: &'a DeviceContext,
	extras: &'a Map<String, Value>,
}

impl UploadMetadata {
	/// Serializes everything that does not get its own multipart part: the
	/// device context fields plus `extras`.
	pub fn payload_json(&self) -> Result<String> {
		let empty = Map::new();
		let extras = match &self.extras {
			None => &empty,
			Some(Value::Object(map)) => map,
			Some(other) => return Err(CoreError::InvalidExtras(value_kind(other))),
		};
		let payload = MetadataPayload {
			device: &self.device,
			extras,
		};
		Ok(serde_json::to_string(&payload)?)
	}
}

fn value_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
