//! Parsing of the interactive shell commands. Malformed input is rejected
//! here, before any job is created.

use std::time::Duration;

use crate::perf::PerfTestParams;
use crate::policy::SchedulingPolicy;
use crate::utils::prelude::*;

pub const HELP: &str = "\
run <job> <time> <pri>: submit a job named <job>,
                        execution time is <time> seconds,
                        priority is <pri>.
list: display the job status.
policy_change <policy>: switch the scheduling policy to FCFS, SJF or PRIORITY.
batch_job <time>: submit a micro-benchmark job of <time> seconds,
                  results go to the batch log file.
test <benchmark> <policy> <num_of_jobs> <priority_levels>
     <min_CPU_time> <max_CPU_time>: run a performance evaluation.
help: print this message.
quit: exit, printing the performance of the completed jobs.";

const RUN_USAGE: &str = "Usage: run <job> <time> <pri>";
const POLICY_USAGE: &str = "Usage: policy_change <policy>";
const BATCH_USAGE: &str = "Usage: batch_job <time>";
const TEST_USAGE: &str = "Usage: test <benchmark> <policy> <num_of_jobs> <priority_levels> <min_CPU_time> <max_CPU_time>";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run {
        name: String,
        cpu_time: Duration,
        priority: i32,
    },
    List,
    PolicyChange(SchedulingPolicy),
    BatchJob {
        cpu_time: Duration,
    },
    Test(PerfTestParams),
    Help,
    Exit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let (cmd, rest) = match args.split_first() {
            Some((cmd, rest)) => (cmd.to_ascii_lowercase(), rest),
            None => return Err(invalid("empty command, type `help` for a list of commands")),
        };

        match (cmd.as_str(), rest) {
            ("run", [name, time, priority]) => Ok(Command::Run {
                name: (*name).to_owned(),
                cpu_time: parse_cpu_time(time).map_err(|e| usage(e, RUN_USAGE))?,
                priority: priority
                    .parse()
                    .map_err(|_| invalid(format!("priority must be an integer, got `{}`\n{}", priority, RUN_USAGE)))?,
            }),
            ("run", _) => Err(invalid(RUN_USAGE)),

            ("list", []) => Ok(Command::List),

            ("policy_change", [policy]) => Ok(Command::PolicyChange(policy.parse()?)),
            ("policy_change", _) => Err(invalid(POLICY_USAGE)),
            // shortcuts: `fcfs`, `sjf`, `priority`
            (policy @ ("fcfs" | "sjf" | "priority"), []) => Ok(Command::PolicyChange(policy.parse()?)),

            ("batch_job", [time]) => Ok(Command::BatchJob {
                cpu_time: parse_cpu_time(time).map_err(|e| usage(e, BATCH_USAGE))?,
            }),
            ("batch_job", _) => Err(invalid(BATCH_USAGE)),

            ("test", [name, policy, jobs, levels, min, max]) => {
                let params = PerfTestParams {
                    name: (*name).to_owned(),
                    policy: policy.parse()?,
                    job_count: jobs
                        .parse()
                        .map_err(|_| invalid(format!("number of jobs must be a non-negative integer\n{}", TEST_USAGE)))?,
                    priority_levels: levels
                        .parse()
                        .map_err(|_| invalid(format!("priority levels must be a positive integer\n{}", TEST_USAGE)))?,
                    min_cpu_time: parse_cpu_time(min).map_err(|e| usage(e, TEST_USAGE))?,
                    max_cpu_time: parse_cpu_time(max).map_err(|e| usage(e, TEST_USAGE))?,
                    seed: None,
                };
                params.validate()?;
                Ok(Command::Test(params))
            }
            ("test", _) => Err(invalid(TEST_USAGE)),

            ("help", _) => Ok(Command::Help),
            ("exit" | "quit", _) => Ok(Command::Exit),

            (other, _) => Err(invalid(format!(
                "unknown command `{}`, type `help` for a list of commands",
                other
            ))),
        }
    }
}

/// CPU time in seconds, fractions allowed: `2`, `0.5`
pub fn parse_cpu_time(s: &str) -> Result<Duration> {
    s.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| invalid(format!("CPU time must be a non-negative number of seconds, got `{}`", s)))
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidCommand(msg.into())
}

fn usage(e: Error, usage: &str) -> Error {
    invalid(format!("{}\n{}", e, usage))
}
