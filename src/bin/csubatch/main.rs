use structopt::StructOpt;

use csubatch::utils;
use csubatch::utils::logging::GlobalLoggingContext;
use csubatch::utils::prelude::*;

mod cli;
mod commands;

fn main() -> Result<()> {
    // panic setup should be done early
    utils::panic::setup();

    let opt = cli::Opt::from_args();

    // logging reads its own table, so configuration goes first
    utils::app_config::setup()?;
    opt.load_config()?;
    let _guard = match utils::logging::setup() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Invalid logging config, logging to the terminal: {}", e);
            GlobalLoggingContext::fallback()?
        }
    };

    trace!("Start cli execution");

    opt.execute()
}
