// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collection of the per-initialization metadata snapshot.

use dumplink_core::{ApiKey, DeviceContext, UploadMetadata, UNKNOWN_VERSION_CODE};
use serde_json::Value;
use tracing::debug;

use crate::device;
use crate::error::LookupError;

/// What the uploader needs to know about the host application.
///
/// Lookups are best-effort; an `Err` is logged and replaced by a default
/// rather than aborting initialization.
pub trait HostContext: Send + Sync {
	/// Stable identifier of the host application (package or bundle id).
	/// Scopes the persisted watermark.
	fn app_identity(&self) -> String;

	/// Display name of the application.
	fn app_name(&self) -> Result<String, LookupError>;

	fn version_name(&self) -> Result<String, LookupError>;

	fn version_code(&self) -> Result<i64, LookupError>;

	fn device(&self) -> DeviceContext {
		device::detect()
	}
}

/// Builds the snapshot sent with every dump of one run.
///
/// `explicit_version` takes precedence over the host's version lookup. Names
/// and versions default to an empty string and the version code to
/// [`UNKNOWN_VERSION_CODE`].
pub fn collect(
	context: &dyn HostContext,
	api_key: ApiKey,
	explicit_version: Option<&str>,
	extras: Option<Value>,
) -> UploadMetadata {
	let app_name = context.app_name().unwrap_or_else(|e| {
		debug!(error = %e, "using empty application name");
		String::new()
	});

	let version = match explicit_version {
		Some(version) => version.to_string(),
		None => context.version_name().unwrap_or_else(|e| {
			debug!(error = %e, "using empty application version");
			String::new()
		}),
	};

	let version_code = context.version_code().unwrap_or_else(|e| {
		debug!(error = %e, "using unknown version code");
		UNKNOWN_VERSION_CODE
	});

	UploadMetadata {
		api_key,
		app_name,
		version,
		version_code,
		device: context.device(),
		extras,
	}
}

/// A [`HostContext`] built from values the embedding application already
/// knows about itself.
///
/// Unset identity and name fall back to the executable's file stem; unset
/// versions are reported as unavailable.
#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
	identity: Option<String>,
	app_name: Option<String>,
	version_name: Option<String>,
	version_code: Option<i64>,
	device: Option<DeviceContext>,
}

impl ProcessContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
		self.identity = Some(identity.into());
		self
	}

	pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
		self.app_name = Some(name.into());
		self
	}

	pub fn with_version_name(mut self, version: impl Into<String>) -> Self {
		self.version_name = Some(version.into());
		self
	}

	pub fn with_version_code(mut self, code: i64) -> Self {
		self.version_code = Some(code);
		self
	}

	/// Replaces device detection with a fixed context.
	pub fn with_device(mut self, device: DeviceContext) -> Self {
		self.device = Some(device);
		self
	}
}

fn executable_stem() -> Result<String, LookupError> {
	let exe = std::env::current_exe().map_err(|e| LookupError::Failed {
		what: "executable path",
		message: e.to_string(),
	})?;
	exe.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.ok_or(LookupError::Unavailable("executable name"))
}

impl HostContext for ProcessContext {
	fn app_identity(&self) -> String {
		self
			.identity
			.clone()
			.or_else(|| executable_stem().ok())
			.unwrap_or_else(|| "unknown".to_string())
	}

	fn app_name(&self) -> Result<String, LookupError> {
		match &self.app_name {
			Some(name) => Ok(name.clone()),
			None => executable_stem(),
		}
	}

	fn version_name(&self) -> Result<String, LookupError> {
		self
			.version_name
			.clone()
			.ok_or(LookupError::Unavailable("application version"))
	}

	fn version_code(&self) -> Result<i64, LookupError> {
		self
			.version_code
			.ok_or(LookupError::Unavailable("application version code"))
	}

	fn device(&self) -> DeviceContext {
		self.device.clone().unwrap_or_else(device::detect)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	struct FailingContext;

	impl HostContext for FailingContext {
		fn app_identity(&self) -> String {
			"com.example.broken".to_string()
		}

		fn app_name(&self) -> Result<String, LookupError> {
			Err(LookupError::Failed {
				what: "application label",
				message: "package not found".to_string(),
			})
		}

		fn version_name(&self) -> Result<String, LookupError> {
			Err(LookupError::Unavailable("application version"))
		}

		fn version_code(&self) -> Result<i64, LookupError> {
			Err(LookupError::Unavailable("application version code"))
		}

		fn device(&self) -> DeviceContext {
			DeviceContext::default()
		}
	}

	fn key() -> ApiKey {
		ApiKey::new("K").unwrap()
	}

	#[test]
	fn test_collect_uses_context_values() {
		let context = ProcessContext::new()
			.with_identity("com.example.notes")
			.with_app_name("Notes")
			.with_version_name("3.1.0")
			.with_version_code(31)
			.with_device(DeviceContext {
				platform: "linux".to_string(),
				..Default::default()
			});

		let metadata = collect(&context, key(), None, Some(json!({"tier": "pro"})));

		assert_eq!(metadata.api_key.expose(), "K");
		assert_eq!(metadata.app_name, "Notes");
		assert_eq!(metadata.version, "3.1.0");
		assert_eq!(metadata.version_code, 31);
		assert_eq!(metadata.device.platform, "linux");
		assert_eq!(metadata.extras, Some(json!({"tier": "pro"})));
	}

	#[test]
	fn test_explicit_version_wins() {
		let context = ProcessContext::new().with_version_name("3.1.0");
		let metadata = collect(&context, key(), Some("3.2.0-beta"), None);
		assert_eq!(metadata.version, "3.2.0-beta");
	}

	#[test]
	fn test_failed_lookups_use_defaults() {
		let metadata = collect(&FailingContext, key(), None, None);

		assert_eq!(metadata.app_name, "");
		assert_eq!(metadata.version, "");
		assert_eq!(metadata.version_code, UNKNOWN_VERSION_CODE);
		assert_eq!(metadata.device, DeviceContext::default());
		assert!(metadata.extras.is_none());
	}

	#[test]
	fn test_process_context_defaults_to_executable_name() {
		let context = ProcessContext::new();
		let name = context.app_name().unwrap();
		assert!(!name.is_empty());
		assert_eq!(context.app_identity(), name);
		assert!(context.version_name().is_err());
		assert!(context.version_code().is_err());
	}
}
