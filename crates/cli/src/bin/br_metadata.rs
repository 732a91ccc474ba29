#![forbid(unsafe_code)]

use br_cli::{CommonArgs, logging};
use br_engine::{BatchReport, run_metadata_batch};
use clap::Parser;
use std::process::ExitCode;

/// Creates, updates and deletes metadata values from a CSV file
/// (`metadata_value_id,item_id,metadata_field_id,text_value`), writing a rollback
/// CSV before every change.
#[derive(Parser, Debug)]
#[command(name = "br_metadata", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let cli = match br_cli::parse::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    logging::init(cli.common.verbose);
    br_cli::run("br_metadata", || run(&cli))
}

fn run(cli: &Cli) -> anyhow::Result<BatchReport> {
    let paths = cli.common.paths();
    paths.check_input()?;
    let mut store = cli.common.open_store()?;
    let actor = cli.common.actor(&store)?;
    Ok(run_metadata_batch(&mut store, &paths, &actor)?)
}
