// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tally_config::{load_config, load_config_with_file, LoggingConfig};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::{render_config, run_query, run_record, QueryArgs, RecordArgs};

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Inspect and append to the audit trail", long_about = None)]
struct Args {
	/// Path to a TOML configuration file (default: /etc/tally/tally.toml)
	#[arg(short, long, global = true, env = "TALLY_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List a user's audit events, newest first
	Query(QueryArgs),
	/// Append one event to the audit log
	Record(RecordArgs),
	/// Show the resolved configuration
	Config,
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => load_config_with_file(path)?,
		None => load_config()?,
	};
	init_tracing(&config.logging);
	debug!(?args, "parsed arguments");

	match args.command {
		Command::Query(query) => {
			let mut stdout = std::io::stdout().lock();
			let count = run_query(&query, &config.audit, &mut stdout).await?;
			debug!(count, "query finished");
		}
		Command::Record(record) => run_record(&record, &config.audit).await?,
		Command::Config => print!("{}", render_config(&config)?),
		Command::Version => println!("tally {}", env!("CARGO_PKG_VERSION")),
	}

	Ok(())
}

/// Diagnostics go to stderr so command output stays machine-readable.
fn init_tracing(logging: &LoggingConfig) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}
