use clap::Parser;
use colored::Colorize;
use herd_cli::{cli::Cli, commands, logging};

fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli) {
		report_error(&err);
		std::process::exit(1);
	}
}

fn report_error(err: &herd::HerdError) {
	eprintln!("{} {err}", "error:".red().bold());
	let mut source = std::error::Error::source(err);
	while let Some(cause) = source {
		eprintln!("  {} {cause}", "caused by:".dimmed());
		source = cause.source();
	}
}
