// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! dumplink CLI
//!
//! Uploads the crash dumps in a directory once and exits, or lists the dumps
//! a run would pick up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dumplink::{
	scanner, CrashReporter, FileWatermarkStore, InitOptions, ProcessContext, ReporterConfig,
	WatermarkStore,
};
use dumplink_core::{CleanupPolicy, CrashDump, ScanPolicy};

mod extras;

use extras::parse_extras;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum LogFormat {
	Pretty,
	#[default]
	Compact,
	Json,
}

/// dumplink - crash-dump uploader
#[derive(Parser, Debug)]
#[command(name = "dumplink", version, about, long_about = None)]
struct Args {
	/// Path to a configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Log output format
	#[arg(long, env = "DUMPLINK_LOG_FORMAT", value_enum, default_value_t, global = true)]
	log_format: LogFormat,

	/// Application identity used to scope the stored watermark
	#[arg(long, global = true)]
	app_id: Option<String>,

	/// Directory holding the watermark files (overrides config)
	#[arg(long, global = true)]
	state_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Upload the dumps in a directory and exit
	Upload {
		/// Dump directory
		#[arg(long)]
		dir: PathBuf,

		/// Ingestion API key
		#[arg(long, env = "DUMPLINK_API_KEY", hide_env_values = true)]
		api_key: String,

		/// Application version reported with each dump
		#[arg(long)]
		app_version: Option<String>,

		/// Extra metadata (repeatable: --extra KEY=VALUE)
		#[arg(long = "extra", value_name = "KEY=VALUE")]
		extras: Vec<String>,

		/// Collection endpoint (overrides config)
		#[arg(long)]
		endpoint: Option<String>,

		/// Upload every dump, ignoring the stored watermark
		#[arg(long)]
		all: bool,

		/// Keep dumps whose upload failed
		#[arg(long)]
		retain_failed: bool,

		/// Print the run summary as JSON
		#[arg(long)]
		json: bool,
	},
	/// List the dumps the next run would upload
	Scan {
		/// Dump directory
		#[arg(long)]
		dir: PathBuf,

		/// List every dump, ignoring the stored watermark
		#[arg(long)]
		all: bool,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(args.log_format);

	let mut config =
		ReporterConfig::load(args.config.as_deref()).context("failed to load configuration")?;
	if let Some(state_dir) = args.state_dir {
		config.state_dir = state_dir;
	}
	let app_id = args.app_id.unwrap_or_else(|| "dumplink-cli".to_string());
	debug!(?config, app_id = %app_id, "configuration loaded");

	match args.command {
		Command::Upload {
			dir,
			api_key,
			app_version,
			extras,
			endpoint,
			all,
			retain_failed,
			json,
		} => {
			if let Some(endpoint) = endpoint {
				config.endpoint = endpoint;
			}
			if all {
				config.scan_policy = ScanPolicy::All;
			}
			if retain_failed {
				config.cleanup_policy = CleanupPolicy::RetainFailed;
			}

			let options = InitOptions {
				dump_dir: dir,
				api_key: Some(api_key),
				app_version,
				extras: parse_extras(&extras)?,
			};
			run_upload(config, app_id, options, json).await
		}
		Command::Scan { dir, all } => {
			let store = FileWatermarkStore::for_app(&config.state_dir, &config.namespace, &app_id);
			let watermark = store
				.get()
				.await
				.with_context(|| format!("failed to read watermark from {}", store.path().display()))?;
			let policy = if all { ScanPolicy::All } else { config.scan_policy };

			let dumps = pending_dumps(&dir, policy, watermark).await?;

			println!("watermark: {watermark}");
			for dump in &dumps {
				println!("{}\t{}\t{}", dump.modified_ms, dump.size, dump.path.display());
			}
			info!(count = dumps.len(), "scan complete");
			Ok(())
		}
	}
}

/// Lists what the next run would upload without touching the directory.
async fn pending_dumps(dir: &Path, policy: ScanPolicy, watermark: i64) -> Result<Vec<CrashDump>> {
	if !dir.is_dir() {
		bail!("dump directory {} does not exist", dir.display());
	}
	scanner::scan(dir, policy, watermark)
		.await
		.with_context(|| format!("failed to scan {}", dir.display()))
}

async fn run_upload(
	config: ReporterConfig,
	app_id: String,
	options: InitOptions,
	json: bool,
) -> Result<()> {
	let context = ProcessContext::new().with_identity(app_id);

	let reporter = CrashReporter::builder()
		.config(config)
		.build()
		.context("failed to start crash reporter")?;
	reporter
		.try_init_crash_reporting(Arc::new(context), options)
		.context("failed to queue upload run")?;

	let flushing = reporter.clone();
	tokio::task::spawn_blocking(move || flushing.flush())
		.await
		.context("flush task failed")??;
	let shutdown = reporter.clone();
	tokio::task::spawn_blocking(move || shutdown.shutdown())
		.await
		.context("shutdown task failed")?;

	let Some(summary) = reporter.last_summary() else {
		bail!("upload run did not complete");
	};

	if json {
		let out = serde_json::json!({
			"discovered": summary.discovered,
			"uploaded": summary.uploaded,
			"failed": summary.failed,
			"deleted": summary.deleted,
			"watermark": summary.watermark,
			"aborted": summary.aborted,
		});
		println!("{}", serde_json::to_string_pretty(&out)?);
	} else {
		println!(
			"discovered {}, uploaded {}, failed {}, deleted {}; watermark {}",
			summary.discovered, summary.uploaded, summary.failed, summary.deleted, summary.watermark
		);
	}

	if summary.aborted {
		bail!("dump directory could not be scanned");
	}
	if summary.failed > 0 {
		std::process::exit(2);
	}
	Ok(())
}

fn init_tracing(format: LogFormat) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dumplink=info"));

	match format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().pretty().with_writer(std::io::stderr))
				.init();
		}
	}
}
