use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Root CLI for herd.
#[derive(Parser, Debug)]
#[command(name = "herd")]
#[command(about = "Suite orchestration for browser and mobile UI tests")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a collection, suite, feature, or single case.
	Run(RunArgs),
	/// List connected device ids.
	Devices,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	/// Path to a collection, suite, `.feature`, or case file.
	#[arg(value_name = "TARGET")]
	pub target: PathBuf,

	/// Platform to run on (android, chrome, firefox).
	#[arg(short, long, value_name = "PLATFORM")]
	pub platform: Option<String>,

	/// Tag expression forwarded to the scenario runner for `.feature`
	/// targets.
	#[arg(long, value_name = "TAGS")]
	pub tags: Option<String>,
}
