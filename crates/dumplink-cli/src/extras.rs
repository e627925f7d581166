// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `--extra KEY=VALUE` parsing.

use anyhow::{bail, Result};
use serde_json::{Map, Value};

/// Builds the extras object from repeated `KEY=VALUE` flags. Later keys
/// replace earlier ones. Values that parse as JSON scalars keep their type.
pub fn parse_extras(pairs: &[String]) -> Result<Option<Value>> {
	if pairs.is_empty() {
		return Ok(None);
	}

	let mut map = Map::new();
	for pair in pairs {
		let Some((key, value)) = pair.split_once('=') else {
			bail!("invalid extra '{pair}': expected KEY=VALUE");
		};
		let key = key.trim();
		if key.is_empty() {
			bail!("invalid extra '{pair}': key is empty");
		}
		map.insert(key.to_string(), parse_value(value));
	}
	Ok(Some(Value::Object(map)))
}

fn parse_value(raw: &str) -> Value {
	match serde_json::from_str::<Value>(raw) {
		Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => value,
		_ => Value::String(raw.to_string()),
	}
}
