use std::path::PathBuf;

use structopt::StructOpt;

use csubatch::utils::prelude::*;

use crate::commands::{self, Cmd};

/// Batch job scheduler with FCFS, SJF and priority policies
#[derive(StructOpt)]
#[structopt(name = "csubatch")]
pub struct Opt {
    /// Set a custom config file
    #[structopt(short, long, parse(from_os_str), value_name = "FILE")]
    config: Option<PathBuf>,

    /// Apply a preset from the `presets` table of the config
    #[structopt(short, long, value_name = "NAME")]
    preset: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    Config(commands::Config),
    Shell(commands::Shell),
    Perf(commands::Perf),
}

impl Opt {
    /// Layer the config file and then the preset over the defaults
    pub fn load_config(&self) -> Result<()> {
        let mut config = config_mut();
        if let Some(path) = &self.config {
            config.use_file(path)?;
        }
        if let Some(preset) = &self.preset {
            config.use_preset(preset)?;
        }
        Ok(())
    }

    pub fn execute(self) -> Result<()> {
        match self.cmd {
            Command::Config(cmd) => cmd.run(),
            Command::Shell(cmd) => cmd.run(),
            Command::Perf(cmd) => cmd.run(),
        }
    }
}
