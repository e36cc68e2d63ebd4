use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::dispatcher::DispatchMode;

/// A point in wall-clock time
pub type Timestamp = DateTime<Local>;

/// Priority given to jobs that do not ask for one. Lower values run first.
pub const DEFAULT_PRIORITY: i32 = 1;

/// A job submitted to the system.
///
/// The name, priority and duration never change after creation. The lifecycle
/// fields are only written by the dispatcher, which owns the job at that point.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    name: String,
    priority: i32,
    execution_duration: Duration,
    arrival: Timestamp,
    started: Option<Timestamp>,
    finished: Option<Timestamp>,
    completed: bool,
    /// overrides the dispatcher's mode for this job only
    mode: Option<DispatchMode>,
    perf_run: Option<u64>,
}

impl Job {
    /// Creates a job that arrives now.
    pub fn new(name: impl Into<String>, priority: i32, execution_duration: Duration) -> Self {
        Self::with_arrival(name, priority, execution_duration, Local::now())
    }

    pub fn with_arrival(
        name: impl Into<String>,
        priority: i32,
        execution_duration: Duration,
        arrival: Timestamp,
    ) -> Self {
        Job {
            name: name.into(),
            priority,
            execution_duration,
            arrival,
            started: None,
            finished: None,
            completed: false,
            mode: None,
            perf_run: None,
        }
    }

    /// A pre-completed job. The dispatcher stops when it dequeues one.
    pub fn sentinel() -> Self {
        let now = Local::now();
        Job {
            name: "<sentinel>".into(),
            priority: DEFAULT_PRIORITY,
            execution_duration: Duration::ZERO,
            arrival: now,
            started: Some(now),
            finished: Some(now),
            completed: true,
            mode: None,
            perf_run: None,
        }
    }

    /// Run this job in `mode`, whatever the dispatcher is set to
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Tag the job as part of benchmark run `run`. It runs silently.
    pub fn for_perf_run(mut self, run: u64) -> Self {
        self.perf_run = Some(run);
        self.with_mode(DispatchMode::Perf)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn execution_duration(&self) -> Duration {
        self.execution_duration
    }

    pub fn arrival(&self) -> Timestamp {
        self.arrival
    }

    pub fn started(&self) -> Option<Timestamp> {
        self.started
    }

    pub fn finished(&self) -> Option<Timestamp> {
        self.finished
    }

    pub fn mode(&self) -> Option<DispatchMode> {
        self.mode
    }

    pub fn perf_run(&self) -> Option<u64> {
        self.perf_run
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn mark_started(&mut self, at: Timestamp) {
        self.started = Some(at);
    }

    /// Records the completion time and sets the completed flag.
    pub fn mark_completed(&mut self, at: Timestamp) {
        // a job is never finished before it started
        let at = match self.started {
            Some(started) if started > at => started,
            _ => at,
        };
        self.finished = Some(at);
        self.completed = true;
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            name: self.name.clone(),
            execution_duration: self.execution_duration,
            priority: self.priority,
            arrival: self.arrival,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Job({}, prio {}, {} ms)",
            self.name,
            self.priority,
            self.execution_duration.as_millis()
        )
    }
}

/// A pending job as shown by `list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub name: String,
    #[serde(rename = "execution_ms", serialize_with = "serialize_millis")]
    pub execution_duration: Duration,
    pub priority: i32,
    pub arrival: Timestamp,
}

impl JobInfo {
    pub const HEADER: &'static str = "Name                 CPU_Time  Pri  Arrival_time  Progress";
}

impl fmt::Display for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:>7.2}s  {:>3}  {}      waiting",
            self.name,
            self.execution_duration.as_secs_f64(),
            self.priority,
            self.arrival.format("%H:%M:%S")
        )
    }
}

pub(crate) fn serialize_millis<S>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn new_job_has_no_lifecycle_timestamps() {
        let job = Job::new("J1", 3, Duration::from_millis(2000));
        assert_eq!(job.name(), "J1");
        assert_eq!(job.priority(), 3);
        assert_eq!(job.execution_duration(), Duration::from_millis(2000));
        assert!(job.started().is_none());
        assert!(job.finished().is_none());
        assert!(!job.is_completed());
    }

    #[test]
    fn completion_never_precedes_start() {
        let mut job = Job::new("J1", 1, Duration::from_millis(10));
        let start = Local::now();
        job.mark_started(start);
        job.mark_completed(start - ChronoDuration::milliseconds(5));

        assert!(job.is_completed());
        assert_eq!(job.finished(), Some(start));
    }

    #[test]
    fn perf_run_jobs_are_silent() {
        let job = Job::new("b_1", 1, Duration::from_millis(1)).for_perf_run(7);
        assert_eq!(job.perf_run(), Some(7));
        assert_eq!(job.mode(), Some(DispatchMode::Perf));
        assert_eq!(Job::new("plain", 1, Duration::from_millis(1)).mode(), None);
    }

    #[test]
    fn sentinel_is_pre_completed() {
        assert!(Job::sentinel().is_completed());
    }

    #[test]
    fn info_row_shows_seconds() {
        let job = Job::new("report", 2, Duration::from_millis(1500));
        let row = job.info().to_string();
        assert!(row.starts_with("report"));
        assert!(row.contains("1.50s"));
    }
}
