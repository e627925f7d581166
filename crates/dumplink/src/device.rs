// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort detection of device, OS and locale details.

use std::path::Path;

use dumplink_core::DeviceContext;
use tracing::trace;

const OS_RELEASE_PATH: &str = "/etc/os-release";
const KERNEL_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";
const DMI_DIR: &str = "/sys/class/dmi/id";

/// Detects the device context of the running machine.
///
/// Anything that cannot be determined is left empty (or `-1` for the OS
/// version). Desktop and server hosts have no carrier.
pub fn detect() -> DeviceContext {
	let (language, country) = sys_locale::get_locale()
		.map(|locale| split_locale(&locale))
		.unwrap_or_default();

	DeviceContext {
		platform: std::env::consts::OS.to_string(),
		os_version: read_trimmed(Path::new(KERNEL_RELEASE_PATH))
			.and_then(|release| major_version(&release))
			.unwrap_or(-1),
		os_release: std::fs::read_to_string(OS_RELEASE_PATH)
			.ok()
			.and_then(|contents| parse_os_release(&contents))
			.unwrap_or_default(),
		brand: read_dmi("board_vendor"),
		manufacturer: read_dmi("sys_vendor"),
		model: read_dmi("product_name"),
		country,
		language,
		carrier: String::new(),
	}
}

fn read_dmi(field: &str) -> String {
	read_trimmed(&Path::new(DMI_DIR).join(field)).unwrap_or_default()
}

fn read_trimmed(path: &Path) -> Option<String> {
	match std::fs::read_to_string(path) {
		Ok(contents) => Some(contents.trim().to_string()).filter(|s| !s.is_empty()),
		Err(e) => {
			trace!(path = %path.display(), error = %e, "device lookup unavailable");
			None
		}
	}
}

/// Splits a locale such as `en_US.UTF-8` or `en-GB` into `(language, country)`.
pub(crate) fn split_locale(locale: &str) -> (String, String) {
	let locale = locale.split(['.', '@']).next().unwrap_or_default();
	let mut parts = locale.split(['_', '-']);

	let language = parts.next().unwrap_or_default().to_lowercase();
	if language == "c" || language == "posix" {
		return (String::new(), String::new());
	}

	// Skip script subtags like the "Hant" in zh-Hant-TW.
	let country = parts
		.find(|part| part.len() == 2 || (part.len() == 3 && part.chars().all(|c| c.is_ascii_digit())))
		.unwrap_or_default()
		.to_uppercase();

	(language, country)
}

/// Leading integer of a release string: `6.5.0-14-generic` -> 6.
pub(crate) fn major_version(release: &str) -> Option<i64> {
	let digits: String = release
		.trim()
		.chars()
		.take_while(|c| c.is_ascii_digit())
		.collect();
	digits.parse().ok()
}

/// Reads `PRETTY_NAME` from os-release contents, falling back to
/// `NAME VERSION`.
pub(crate) fn parse_os_release(contents: &str) -> Option<String> {
	let value = |key: &str| {
		contents.lines().find_map(|line| {
			let (k, v) = line.split_once('=')?;
			(k.trim() == key).then(|| v.trim().trim_matches(['"', '\'']).to_string())
		})
	};

	if let Some(pretty) = value("PRETTY_NAME").filter(|v| !v.is_empty()) {
		return Some(pretty);
	}

	match (value("NAME"), value("VERSION")) {
		(Some(name), Some(version)) => Some(format!("{name} {version}")),
		(Some(name), None) => Some(name),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_split_locale() {
		assert_eq!(split_locale("en_US.UTF-8"), ("en".into(), "US".into()));
		assert_eq!(split_locale("en-GB"), ("en".into(), "GB".into()));
		assert_eq!(split_locale("de_DE@euro"), ("de".into(), "DE".into()));
		assert_eq!(split_locale("zh-Hant-TW"), ("zh".into(), "TW".into()));
		assert_eq!(split_locale("es-419"), ("es".into(), "419".into()));
		assert_eq!(split_locale("fr"), ("fr".into(), String::new()));
	}

	#[test]
	fn test_split_locale_posix_is_unknown() {
		assert_eq!(split_locale("C"), (String::new(), String::new()));
		assert_eq!(split_locale("POSIX"), (String::new(), String::new()));
		assert_eq!(split_locale("C.UTF-8"), (String::new(), String::new()));
	}

	#[test]
	fn test_major_version() {
		assert_eq!(major_version("6.5.0-14-generic"), Some(6));
		assert_eq!(major_version("23.1.0"), Some(23));
		assert_eq!(major_version("unknown"), None);
		assert_eq!(major_version(""), None);
	}

	#[test]
	fn test_parse_os_release_prefers_pretty_name() {
		let contents = "NAME=\"Ubuntu\"\nVERSION=\"24.04 LTS (Noble Numbat)\"\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\n";
		assert_eq!(parse_os_release(contents).as_deref(), Some("Ubuntu 24.04 LTS"));
	}

	#[test]
	fn test_parse_os_release_falls_back_to_name_and_version() {
		let contents = "NAME=Alpine\nVERSION='3.19'\n";
		assert_eq!(parse_os_release(contents).as_deref(), Some("Alpine 3.19"));
		assert_eq!(parse_os_release("ID=arch\n"), None);
	}

	#[test]
	fn test_detect_reports_platform() {
		let device = detect();
		assert_eq!(device.platform, std::env::consts::OS);
		assert!(device.carrier.is_empty());
	}
}
