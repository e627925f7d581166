// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The ingestion API key.
//!
//! [`ApiKey`] keeps the key out of logs: `Debug` and `Display` both print
//! [`REDACTED`], and the backing memory is zeroed when the value is dropped.
//! The only way to read the key is [`ApiKey::expose`], which the multipart
//! encoder calls when it writes the `apiKey` part.
//!
//! ```
//! use dumplink_core::ApiKey;
//!
//! let key = ApiKey::new("k-123").unwrap();
//! assert_eq!(format!("{key}"), "[REDACTED]");
//! assert_eq!(key.expose(), "k-123");
//! ```

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey {
	inner: String,
}

impl ApiKey {
	/// Wraps a key, rejecting empty or whitespace-only values.
	pub fn new(key: impl Into<String>) -> Result<Self> {
		let inner = key.into();
		if inner.trim().is_empty() {
			return Err(CoreError::EmptyApiKey);
		}
		Ok(Self { inner })
	}

	pub fn expose(&self) -> &str {
		&self.inner
	}
}

impl fmt::Debug for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ApiKey").field(&REDACTED).finish()
	}
}

impl fmt::Display for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}
