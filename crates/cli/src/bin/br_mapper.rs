#![forbid(unsafe_code)]

use br_cli::{CommonArgs, logging};
use br_engine::{BatchReport, MembershipMode, run_membership_batch};
use clap::Parser;
use std::process::ExitCode;

/// Maps, moves or unmaps items to collections from a CSV file
/// (`item_handle,collection_handle`), writing each item's previous owning
/// collection to a rollback CSV first.
#[derive(Parser, Debug)]
#[command(name = "br_mapper", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Add each item to the collection as a mapped (non-owning) member
    #[arg(short = 'm', long = "map")]
    map: bool,

    /// Make the collection the owning collection of each item
    #[arg(short = 'M', long = "move")]
    move_items: bool,

    /// Remove each item's mapping to the collection
    #[arg(short = 'u', long = "unmap")]
    unmap: bool,
}

fn main() -> ExitCode {
    let cli = match br_cli::parse::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    logging::init(cli.common.verbose);
    br_cli::run("br_mapper", || run(&cli))
}

fn run(cli: &Cli) -> anyhow::Result<BatchReport> {
    let mode = MembershipMode::from_flags(cli.map, cli.move_items, cli.unmap)?;
    let paths = cli.common.paths();
    paths.check_input()?;
    let mut store = cli.common.open_store()?;
    let actor = cli.common.actor(&store)?;
    Ok(run_membership_batch(&mut store, &paths, &actor, mode)?)
}
