mod app;
mod catalog;
mod cli;
mod codec;
mod config;
mod error;
mod filter;
mod logging;
mod mode;
mod progress;
mod status;
mod storage;
mod tracker;
mod ui;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
