use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::policy::SchedulingPolicy;
use crate::types::{serialize_millis, Job, Timestamp};
use crate::utils::prelude::*;

/// A job that went through the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub name: String,
    pub priority: i32,
    #[serde(rename = "execution_ms", serialize_with = "serialize_millis")]
    pub execution_duration: Duration,
    pub arrival: Timestamp,
    pub started: Timestamp,
    pub finished: Timestamp,
    /// benchmark run the job was generated for
    #[serde(skip)]
    pub perf_run: Option<u64>,
}

impl JobRecord {
    /// `None` unless the job carries both lifecycle timestamps
    pub fn from_job(job: &Job) -> Option<Self> {
        Some(JobRecord {
            name: job.name().to_owned(),
            priority: job.priority(),
            execution_duration: job.execution_duration(),
            arrival: job.arrival(),
            started: job.started()?,
            finished: job.finished()?,
            perf_run: job.perf_run(),
        })
    }

    /// start of execution minus arrival, in ms
    pub fn response_ms(&self) -> f64 {
        millis(self.started - self.arrival)
    }

    /// completion minus arrival, in ms
    pub fn turnaround_ms(&self) -> f64 {
        millis(self.finished - self.arrival)
    }

    /// turnaround minus the burst, in ms
    pub fn wait_ms(&self) -> f64 {
        self.turnaround_ms() - self.execution_duration.as_secs_f64() * 1000.0
    }
}

fn millis(d: chrono::Duration) -> f64 {
    d.num_microseconds()
        .map(|us| us as f64 / 1000.0)
        .unwrap_or_else(|| d.num_milliseconds() as f64)
}

/// Aggregated metrics over completed jobs. Times are in milliseconds,
/// throughput in jobs per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub completed: usize,
    pub avg_response_ms: f64,
    pub max_response_ms: f64,
    pub avg_wait_ms: f64,
    pub avg_turnaround_ms: f64,
    pub throughput: f64,
}

impl MetricsSnapshot {
    pub fn from_records(records: &[JobRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let response: Vec<f64> = records.iter().map(JobRecord::response_ms).collect();
        let wait: Vec<f64> = records.iter().map(JobRecord::wait_ms).collect();
        let turnaround: Vec<f64> = records.iter().map(JobRecord::turnaround_ms).collect();

        let completed = records.len();
        let first_arrival = records.iter().map(|r| r.arrival).min();
        let last_finish = records.iter().map(|r| r.finished).max();
        let elapsed_secs = match (first_arrival, last_finish) {
            (Some(first), Some(last)) => millis(last - first) / 1000.0,
            _ => 0.0,
        };
        let throughput = if elapsed_secs > 0.0 {
            completed as f64 / elapsed_secs
        } else {
            completed as f64
        };

        MetricsSnapshot {
            completed,
            avg_response_ms: Statistics::mean(response.iter()),
            max_response_ms: Statistics::max(response.iter()),
            avg_wait_ms: Statistics::mean(wait.iter()),
            avg_turnaround_ms: Statistics::mean(turnaround.iter()),
            throughput: round2(throughput),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total number of jobs completed: {}", self.completed)?;
        writeln!(f, "Average turnaround time:        {:.2} ms", self.avg_turnaround_ms)?;
        writeln!(f, "Average response time:          {:.2} ms", self.avg_response_ms)?;
        writeln!(f, "Maximum response time:          {:.2} ms", self.max_response_ms)?;
        writeln!(f, "Average waiting time:           {:.2} ms", self.avg_wait_ms)?;
        write!(f, "Throughput:                     {:.2} jobs/sec", self.throughput)
    }
}

#[derive(Debug, Default)]
struct EvalState {
    records: Vec<JobRecord>,
    cancelled: bool,
}

/// Collects completed jobs from the dispatcher and derives metrics from them
#[derive(Debug, Default)]
pub struct PerformanceEvaluator {
    state: Mutex<EvalState>,
    recorded: Condvar,
}

impl PerformanceEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a completed job. Jobs that never ran are ignored.
    pub fn record(&self, job: &Job) {
        let record = match (job.is_completed(), JobRecord::from_job(job)) {
            (true, Some(record)) => record,
            _ => {
                warn!(job = %job, "ignoring a job that has not completed");
                return;
            }
        };

        let mut state = self.state.lock();
        state.records.push(record);
        self.recorded.notify_all();
    }

    /// Records in completion order
    pub fn records(&self) -> Vec<JobRecord> {
        self.state.lock().records.clone()
    }

    pub fn completed_count(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_records(&self.state.lock().records)
    }

    /// Records of benchmark run `run`, in completion order
    pub fn run_records(&self, run: u64) -> Vec<JobRecord> {
        let state = self.state.lock();
        state
            .records
            .iter()
            .filter(|r| r.perf_run == Some(run))
            .cloned()
            .collect()
    }

    /// Block until at least `n` jobs are recorded. Returns `false` if the
    /// evaluator was cancelled first.
    pub fn wait_for_completed(&self, n: usize) -> bool {
        self.wait_until(|records| records.len() >= n)
    }

    /// Like `wait_for_completed`, counting only the jobs of benchmark run `run`
    pub fn wait_for_run(&self, run: u64, n: usize) -> bool {
        self.wait_until(|records| records.iter().filter(|r| r.perf_run == Some(run)).count() >= n)
    }

    fn wait_until(&self, mut done: impl FnMut(&[JobRecord]) -> bool) -> bool {
        let mut state = self.state.lock();
        while !done(&state.records) {
            if state.cancelled {
                return false;
            }
            self.recorded.wait(&mut state);
        }
        true
    }

    /// Wake every `wait_for_completed` caller for good
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        self.recorded.notify_all();
    }
}

/// Priorities are `i32`, so generated ones stop at `i32::MAX`
pub const MAX_PRIORITY_LEVELS: u32 = i32::MAX as u32;

/// What to generate for a benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfTestParams {
    pub name: String,
    pub policy: SchedulingPolicy,
    pub job_count: usize,
    pub priority_levels: u32,
    #[serde(rename = "min_cpu_ms", with = "duration_ms")]
    pub min_cpu_time: Duration,
    #[serde(rename = "max_cpu_ms", with = "duration_ms")]
    pub max_cpu_time: Duration,
    /// seed for the job generator, a random one is picked when absent
    #[serde(default)]
    pub seed: Option<String>,
}

impl PerfTestParams {
    pub fn validate(&self) -> Result<()> {
        if self.priority_levels < 1 {
            return Err(Error::InvalidPerfParams("priority levels must be at least 1".into()));
        }
        if self.priority_levels > MAX_PRIORITY_LEVELS {
            return Err(Error::InvalidPerfParams(format!(
                "priority levels must be at most {}",
                MAX_PRIORITY_LEVELS
            )));
        }
        if self.min_cpu_time > self.max_cpu_time {
            return Err(Error::InvalidPerfParams(format!(
                "min CPU time ({} ms) is above max CPU time ({} ms)",
                self.min_cpu_time.as_millis(),
                self.max_cpu_time.as_millis()
            )));
        }
        Ok(())
    }

    /// Generate the benchmark jobs, all arriving now. Expects validated params.
    pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Job> {
        let levels = self.priority_levels.clamp(1, MAX_PRIORITY_LEVELS) as i32;
        let priorities = Uniform::new_inclusive(1, levels);
        let min_ms = self.min_cpu_time.as_millis() as u64;
        let max_ms = (self.max_cpu_time.as_millis() as u64).max(min_ms);
        let durations = Uniform::new_inclusive(min_ms, max_ms);

        (1..=self.job_count)
            .map(|i| {
                let priority = priorities.sample(rng);
                let duration = Duration::from_millis(durations.sample(rng));
                Job::new(format!("{}_{}", self.name, i), priority, duration)
            })
            .collect()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Outcome of `run_perf_test`
#[derive(Debug, Clone, Serialize)]
pub struct PerfReport {
    pub params: PerfTestParams,
    /// the seed the jobs were generated with
    pub seed: String,
    pub metrics: MetricsSnapshot,
    pub jobs: Vec<JobRecord>,
}

impl fmt::Display for PerfReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Performance metrics for {} ({}, {} jobs, priorities 1-{}, CPU {}-{} ms)",
            self.params.name,
            self.params.policy,
            self.params.job_count,
            self.params.priority_levels,
            self.params.min_cpu_time.as_millis(),
            self.params.max_cpu_time.as_millis(),
        )?;
        write!(f, "{}", self.metrics)
    }
}
