use std::sync::Arc;

use approx::assert_relative_eq;
use std::thread;
use std::time::Duration;

use csubatch::sink::{MemorySink, NullSink};
use csubatch::{Error, Job, JobQueue, PerfTestParams, SchedulingPolicy, Session, SessionConfig};

fn session(policy: SchedulingPolicy, window_ms: u64) -> (Session, Arc<MemorySink>) {
    let console = Arc::new(MemorySink::new());
    let config = SessionConfig {
        queue_capacity: 10,
        collection_window_ms: window_ms,
        shutdown_timeout_ms: 2000,
        policy,
    };
    let session = Session::start(config, console.clone(), Arc::new(NullSink)).unwrap();
    (session, console)
}

fn completion_order(session: &Session) -> Vec<String> {
    session.evaluator().records().into_iter().map(|r| r.name).collect()
}

#[test]
fn sjf_runs_shortest_first() {
    let (session, console) = session(SchedulingPolicy::Sjf, 200);
    session.submit(Job::new("J1", 1, Duration::from_millis(60))).unwrap();
    session.submit(Job::new("J2", 1, Duration::from_millis(20))).unwrap();
    session.submit(Job::new("J3", 1, Duration::from_millis(40))).unwrap();

    assert!(session.evaluator().wait_for_completed(3));
    assert_eq!(completion_order(&session), vec!["J2", "J3", "J1"]);

    let lines = console.lines();
    assert!(lines.contains(&"Dispatcher: executing job: J2".to_string()));
    assert_eq!(session.stop().completed, 3);
}

#[test]
fn priority_runs_lowest_value_first() {
    let (session, _) = session(SchedulingPolicy::Priority, 200);
    session.submit(Job::new("J1", 3, Duration::from_millis(10))).unwrap();
    session.submit(Job::new("J2", 1, Duration::from_millis(10))).unwrap();
    session.submit(Job::new("J3", 2, Duration::from_millis(10))).unwrap();

    assert!(session.evaluator().wait_for_completed(3));
    assert_eq!(completion_order(&session), vec!["J2", "J3", "J1"]);
}

#[test]
fn fcfs_keeps_arrival_order() {
    let (session, _) = session(SchedulingPolicy::Fcfs, 200);
    for (name, ms) in &[("J1", 30), ("J2", 10), ("J3", 20)] {
        session.submit(Job::new(*name, 1, Duration::from_millis(*ms))).unwrap();
    }

    assert!(session.evaluator().wait_for_completed(3));
    assert_eq!(completion_order(&session), vec!["J1", "J2", "J3"]);
}

#[test]
fn perf_test_reports_metrics() {
    let (session, console) = session(SchedulingPolicy::Fcfs, 20);
    let params = PerfTestParams {
        name: "scenario_c".into(),
        policy: SchedulingPolicy::Fcfs,
        job_count: 5,
        priority_levels: 3,
        min_cpu_time: Duration::from_millis(50),
        max_cpu_time: Duration::from_millis(50),
        seed: Some("scenario_c".into()),
    };

    let report = session.run_perf_test(&params).unwrap();
    assert_eq!(report.seed, "scenario_c");
    assert_eq!(report.metrics.completed, 5);
    assert_eq!(report.jobs.len(), 5);

    // completed jobs over the span from the first arrival to the last finish
    let first_arrival = report.jobs.iter().map(|r| r.arrival).min().unwrap();
    let last_finish = report.jobs.iter().map(|r| r.finished).max().unwrap();
    let span_secs = (last_finish - first_arrival).num_microseconds().unwrap() as f64 / 1e6;
    // five 50 ms jobs take at least 250 ms
    assert!(span_secs >= 0.25);
    assert_relative_eq!(report.metrics.throughput, 5.0 / span_secs, epsilon = 0.006);
    assert!(report.metrics.avg_turnaround_ms >= report.metrics.avg_wait_ms);
    assert!(report.metrics.max_response_ms >= report.metrics.avg_response_ms);

    // jobs run one at a time, so each starts after the previous one finished
    for pair in report.jobs.windows(2) {
        assert!(pair[1].started >= pair[0].finished);
        assert!(pair[1].response_ms() >= pair[0].response_ms());
    }

    // benchmark jobs are not echoed to the console
    assert!(console.lines().is_empty());
    assert_eq!(session.mode(), csubatch::DispatchMode::Interactive);
}

#[test]
fn concurrent_submitters_lose_nothing() {
    let config = SessionConfig {
        queue_capacity: 4,
        collection_window_ms: 5,
        shutdown_timeout_ms: 2000,
        policy: SchedulingPolicy::Fcfs,
    };
    let session = Arc::new(Session::start(config, Arc::new(NullSink), Arc::new(NullSink)).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let session = session.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    session
                        .submit(Job::new(format!("t{}_{}", t, i), 1, Duration::from_millis(1)))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(session.evaluator().wait_for_completed(20));
    let mut names = completion_order(&session);
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 20);
    assert_eq!(session.stop().completed, 20);
}

#[test]
fn full_queue_blocks_until_stopped() {
    let queue = Arc::new(JobQueue::new("incoming", 2));
    queue.enqueue(Job::new("a", 1, Duration::from_millis(1))).unwrap();
    queue.enqueue(Job::new("b", 1, Duration::from_millis(1))).unwrap();

    let producer = {
        let queue = queue.clone();
        thread::spawn(move || queue.enqueue(Job::new("c", 1, Duration::from_millis(1))))
    };
    thread::sleep(Duration::from_millis(50));
    assert_eq!(queue.size(), 2);

    queue.close();
    assert!(matches!(producer.join().unwrap(), Err(Error::QueueClosed)));
    assert_eq!(queue.size(), 2);
}

#[test]
fn submit_after_stop_is_refused() {
    let (session, _) = session(SchedulingPolicy::Fcfs, 10);
    session.stop();
    assert!(session.is_stopped());
    assert!(matches!(
        session.submit(Job::new("late", 1, Duration::from_millis(1))),
        Err(Error::Stopped)
    ));
    // stopping twice is harmless
    assert_eq!(session.stop().completed, 0);
}
