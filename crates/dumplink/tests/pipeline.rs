// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end runs through the public reporter API against a mock collector.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use dumplink::{
	CleanupPolicy, CrashReporter, DeviceContext, FileWatermarkStore, InitOptions, ProcessContext,
	WatermarkStore,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_dump(dir: &Path, name: &str, bytes: &[u8], mtime_ms: u64) -> PathBuf {
	let path = dir.join(name);
	let mut file = std::fs::File::create(&path).unwrap();
	file.write_all(bytes).unwrap();
	file.set_modified(UNIX_EPOCH + Duration::from_millis(mtime_ms))
		.unwrap();
	path
}

fn context() -> Arc<ProcessContext> {
	Arc::new(
		ProcessContext::new()
			.with_identity("com.example.editor")
			.with_app_name("Editor")
			.with_version_name("9.9.9")
			.with_version_code(99)
			.with_device(DeviceContext {
				platform: "linux".to_string(),
				os_version: 6,
				os_release: "Test OS".to_string(),
				language: "en".to_string(),
				country: "AU".to_string(),
				..Default::default()
			}),
	)
}

async fn flush(reporter: &CrashReporter) {
	let reporter = reporter.clone();
	tokio::task::spawn_blocking(move || reporter.flush())
		.await
		.unwrap()
		.unwrap();
}

fn remaining(dir: &Path) -> usize {
	std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test(flavor = "multi_thread")]
async fn uploads_every_dump_with_full_metadata() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/crash"))
		.and(body_string_contains("name=\"apiKey\"\r\n\r\nproject-key\r\n"))
		.respond_with(ResponseTemplate::new(200))
		.expect(3)
		.mount(&server)
		.await;

	let dumps = TempDir::new().unwrap();
	let state = TempDir::new().unwrap();
	write_dump(dumps.path(), "one.dmp", b"first", 1_000);
	write_dump(dumps.path(), "two.dmp", b"second", 2_000);
	write_dump(dumps.path(), "three.dmp", b"third", 3_000);

	let reporter = CrashReporter::builder()
		.endpoint(format!("{}/crash", server.uri()))
		.state_dir(state.path())
		.build()
		.unwrap();
	reporter.init_crash_reporting(
		context(),
		InitOptions::new(dumps.path())
			.api_key("project-key")
			.app_version("10.0.0")
			.extras(json!({"channel": "beta"})),
	);
	flush(&reporter).await;

	let requests = server.received_requests().await.unwrap();
	let first = String::from_utf8_lossy(&requests[0].body).into_owned();
	assert!(first.contains("filename=\"three.dmp\""));
	assert!(first.contains("name=\"appName\"\r\n\r\nEditor\r\n"));
	assert!(first.contains("name=\"version\"\r\n\r\n10.0.0\r\n"));
	assert!(first.contains("name=\"versionCode\"\r\n\r\n99\r\n"));
	assert!(first.contains("name=\"crashtime\"\r\n\r\n3000\r\n"));
	assert!(first.contains("\"country\":\"AU\""));
	assert!(first.contains("\"extras\":{\"channel\":\"beta\"}"));

	let store = FileWatermarkStore::for_app(state.path(), "dumplink", "com.example.editor");
	assert_eq!(store.get().await.unwrap(), 3_000);
	assert_eq!(remaining(dumps.path()), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_collector_still_clears_dumps() {
	let dumps = TempDir::new().unwrap();
	let state = TempDir::new().unwrap();
	for (name, mtime) in [("a.dmp", 1_000), ("b.dmp", 2_000), ("c.dmp", 3_000)] {
		write_dump(dumps.path(), name, b"payload", mtime);
	}

	let reporter = CrashReporter::builder()
		.endpoint("http://127.0.0.1:1/crash")
		.request_timeout(Duration::from_secs(2))
		.state_dir(state.path())
		.build()
		.unwrap();
	reporter.init_crash_reporting(context(), InitOptions::new(dumps.path()).api_key("K"));
	flush(&reporter).await;

	let summary = reporter.last_summary().unwrap();
	assert_eq!(summary.failed, 3);
	assert_eq!(summary.deleted, 3);
	assert_eq!(remaining(dumps.path()), 0);

	let store = FileWatermarkStore::for_app(state.path(), "dumplink", "com.example.editor");
	assert_eq!(store.get().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn watermark_survives_a_new_reporter() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(200))
		.mount(&server)
		.await;

	let dumps = TempDir::new().unwrap();
	let state = TempDir::new().unwrap();
	write_dump(dumps.path(), "uploaded.dmp", b"x", 4_000);

	let build = || {
		CrashReporter::builder()
			.endpoint(server.uri())
			.state_dir(state.path())
			.build()
			.unwrap()
	};

	let first = build();
	first.init_crash_reporting(context(), InitOptions::new(dumps.path()).api_key("K"));
	flush(&first).await;
	drop(first);

	// An older dump appearing later is not sent, only cleared.
	write_dump(dumps.path(), "stale.dmp", b"x", 3_500);
	let second = build();
	second.init_crash_reporting(context(), InitOptions::new(dumps.path()).api_key("K"));
	flush(&second).await;

	assert_eq!(server.received_requests().await.unwrap().len(), 1);
	assert_eq!(second.last_summary().unwrap().discovered, 0);
	assert_eq!(remaining(dumps.path()), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn retained_failure_is_sent_by_a_later_reporter() {
	let flaky = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&flaky)
		.await;
	let healthy = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&healthy)
		.await;

	let dumps = TempDir::new().unwrap();
	let state = TempDir::new().unwrap();
	write_dump(dumps.path(), "kept.dmp", b"x", 2_000);

	let build = |endpoint: String| {
		CrashReporter::builder()
			.endpoint(endpoint)
			.state_dir(state.path())
			.cleanup_policy(CleanupPolicy::RetainFailed)
			.build()
			.unwrap()
	};

	let first = build(flaky.uri());
	first.init_crash_reporting(context(), InitOptions::new(dumps.path()).api_key("K"));
	flush(&first).await;
	assert_eq!(first.last_summary().unwrap().failed, 1);
	assert_eq!(remaining(dumps.path()), 1);
	drop(first);

	let second = build(healthy.uri());
	second.init_crash_reporting(context(), InitOptions::new(dumps.path()).api_key("K"));
	flush(&second).await;

	assert_eq!(second.last_summary().unwrap().uploaded, 1);
	assert_eq!(remaining(dumps.path()), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_initializations_run_one_after_another() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(20)))
		.mount(&server)
		.await;

	let state = TempDir::new().unwrap();
	let dirs: Vec<TempDir> = (0..8).map(|_| TempDir::new().unwrap()).collect();
	for (i, dir) in dirs.iter().enumerate() {
		write_dump(dir.path(), "crash.dmp", b"x", 10_000 + i as u64);
	}

	let reporter = CrashReporter::builder()
		.endpoint(server.uri())
		.state_dir(state.path())
		.build()
		.unwrap();

	let handles: Vec<_> = dirs
		.iter()
		.map(|dir| {
			let reporter = reporter.clone();
			let dump_dir = dir.path().to_path_buf();
			std::thread::spawn(move || {
				reporter.init_crash_reporting(context(), InitOptions::new(dump_dir).api_key("K"));
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}
	flush(&reporter).await;

	for dir in &dirs {
		assert_eq!(remaining(dir.path()), 0);
	}
	let store = FileWatermarkStore::for_app(state.path(), "dumplink", "com.example.editor");
	assert!(store.get().await.unwrap() >= 10_000);
}
