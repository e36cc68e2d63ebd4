use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use structopt::StructOpt;

use csubatch::command::{self, parse_cpu_time, HELP};
use csubatch::config::AppConfigExt;
use csubatch::output;
use csubatch::sink::{ConsoleSink, NullSink};
use csubatch::types::DEFAULT_PRIORITY;
use csubatch::utils::prelude::*;
use csubatch::{Job, SchedulingPolicy, Session};

/// Should be implemented by individual subcommand
pub trait Cmd {
    fn run(self) -> Result<()>;
}

/// Show the effective configuration
#[derive(StructOpt)]
pub struct Config {}

impl Cmd for Config {
    fn run(self) -> Result<()> {
        let config: serde_yaml::Value = config().fetch()?;
        print!("{}", serde_yaml::to_string(&config)?);

        Ok(())
    }
}

/// Interactive shell reading commands from stdin
#[derive(StructOpt)]
pub struct Shell {}

impl Cmd for Shell {
    fn run(self) -> Result<()> {
        let (session_cfg, batch_log) = {
            let config = config();
            (config.session()?, config.batch_log()?)
        };
        let batch_log_path = batch_log.directory.join(&batch_log.file);
        let session = Session::start(session_cfg, Arc::new(ConsoleSink), Arc::new(batch_log.sink()))?;

        let shell = Interpreter {
            session,
            batch_log_path,
        };
        shell.repl(io::stdin().lock())
    }
}

struct Interpreter {
    session: Session,
    batch_log_path: PathBuf,
}

impl Interpreter {
    fn repl(&self, input: impl BufRead) -> Result<()> {
        println!("Welcome to csubatch, type `help` to find more about the commands.");
        prompt()?;

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                prompt()?;
                continue;
            }

            match command::Command::parse(&line) {
                Ok(command::Command::Exit) => break,
                Ok(cmd) => {
                    if let Err(e) = self.execute(cmd) {
                        println!("Error: {}", e);
                    }
                }
                Err(e) => println!("{}", e),
            }
            prompt()?;
        }

        let metrics = self.session.stop();
        println!("{}", metrics);
        Ok(())
    }

    fn execute(&self, cmd: command::Command) -> Result<()> {
        use command::Command::*;

        match cmd {
            Run {
                name,
                cpu_time,
                priority,
            } => {
                self.session.submit(Job::new(name.as_str(), priority, cpu_time))?;
                println!("Job {} was submitted.", name);
                self.print_queue_summary();
            }
            List => {
                self.print_queue_summary();
                let pending = self.session.list();
                if !pending.is_empty() {
                    println!("{}", csubatch::JobInfo::HEADER);
                    println!("{}", pending.iter().join("\n"));
                }
            }
            PolicyChange(policy) => {
                self.session.set_policy(policy);
                println!(
                    "Scheduling policy is switched to {}, effective from the next round.",
                    policy
                );
            }
            BatchJob { cpu_time } => {
                self.session
                    .submit_batch_job(Job::new("batch_job", DEFAULT_PRIORITY, cpu_time))?;
                println!(
                    "Batch job submitted, results go to {}",
                    self.batch_log_path.display()
                );
            }
            Test(params) => {
                println!("Running benchmark {}, please wait...", params.name);
                let report = self.session.run_perf_test(&params)?;
                println!("{}", report);
            }
            Help => println!("{}", HELP),
            Exit => {}
        }
        Ok(())
    }

    fn print_queue_summary(&self) {
        let pending = self.session.list();
        let scheduled = self.session.list_scheduled();
        let expected_wait: Duration = pending
            .iter()
            .chain(scheduled.iter())
            .map(|job| job.execution_duration)
            .sum();

        println!(
            "Total number of jobs in the queue: {}",
            pending.len() + scheduled.len()
        );
        println!(
            "Expected waiting time: {:.2} seconds",
            expected_wait.as_secs_f64()
        );
        println!("Scheduling Policy: {}.", self.session.policy());
    }
}

fn prompt() -> Result<()> {
    print!("> [? for menu]: ");
    io::stdout().flush()?;
    Ok(())
}

/// Run a reproducible performance benchmark
#[derive(StructOpt)]
pub struct Perf {
    /// Benchmark name, also names the saved report files
    #[structopt(long)]
    name: Option<String>,

    /// Scheduling policy: FCFS, SJF or PRIORITY
    #[structopt(long)]
    policy: Option<SchedulingPolicy>,

    /// Number of jobs to generate
    #[structopt(long)]
    jobs: Option<usize>,

    /// Priorities are drawn from 1 to this value
    #[structopt(long)]
    priority_levels: Option<u32>,

    /// Minimum CPU time in seconds
    #[structopt(long, parse(try_from_str = parse_cpu_time))]
    min_cpu: Option<Duration>,

    /// Maximum CPU time in seconds
    #[structopt(long, parse(try_from_str = parse_cpu_time))]
    max_cpu: Option<Duration>,

    /// Seed for job generation, a random one is picked if absent
    #[structopt(long)]
    seed: Option<String>,

    /// Save the JSON report and the CSV job trace into the output directory
    #[structopt(long)]
    save: bool,

    /// Print the report as JSON
    #[structopt(long)]
    json: bool,
}

impl Cmd for Perf {
    fn run(self) -> Result<()> {
        let (session_cfg, mut params, output_dir) = {
            let config = config();
            (config.session()?, config.perf_defaults()?, config.output_dir()?)
        };

        if let Some(name) = self.name {
            params.name = name;
        }
        if let Some(policy) = self.policy {
            params.policy = policy;
        }
        if let Some(jobs) = self.jobs {
            params.job_count = jobs;
        }
        if let Some(levels) = self.priority_levels {
            params.priority_levels = levels;
        }
        if let Some(min) = self.min_cpu {
            params.min_cpu_time = min;
        }
        if let Some(max) = self.max_cpu {
            params.max_cpu_time = max;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        params.validate()?;

        debug!(?params, "starting benchmark");
        let session = Session::start(session_cfg, Arc::new(ConsoleSink), Arc::new(NullSink))?;
        let report = session.run_perf_test(&params);
        session.stop();
        let report = report?;

        if self.json {
            output::render_report(io::stdout().lock(), &report)?;
        } else {
            println!("{}", report);
            println!("Seed: {}", report.seed);
        }

        if self.save {
            let (json, csv) = output::save_report(&output_dir, &report)?;
            println!("Report saved to {} and {}", json.display(), csv.display());
        }

        Ok(())
    }
}
