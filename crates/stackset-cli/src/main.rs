use anyhow::Result;
use clap::Parser;

mod aws;
mod cli;
mod compare;
mod config;
mod error;
mod identity;
mod lister;
mod logging;
mod poller;
mod provider;
mod stackset;
mod tags;
mod template;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = cli::RootCmd::parse();
    logging::init(cmd.log_level);
    cli::run(cmd).await
}
