use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use milbench::cli::SubCommandExtend;
use milbench::config::{Opts, SubCommand};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Prepare(cmd) => cmd.run(&opts).await,
        SubCommand::Import(cmd) => cmd.run(&opts).await,
        SubCommand::Search(cmd) => cmd.run(&opts).await,
    }
}
