use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::types::{Job, JobInfo};
use crate::utils::prelude::*;

/// Default bound of a [`JobQueue`]
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    closed: bool,
}

/// A bounded FIFO of jobs shared between threads.
///
/// `enqueue` blocks while the queue is full and `dequeue` blocks while it is
/// empty. Both give up with [`Error::QueueClosed`] once the queue is closed.
#[derive(Debug)]
pub struct JobQueue {
    name: &'static str,
    capacity: usize,
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl JobQueue {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        JobQueue {
            name,
            capacity,
            state: Mutex::new(QueueState {
                jobs: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append at the tail, waiting for space if the queue is full
    pub fn enqueue(&self, job: Job) -> Result<()> {
        let mut state = self.state.lock();
        while state.jobs.len() >= self.capacity && !state.closed {
            trace!(queue = self.name, job = %job, "queue full, waiting for space");
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(Error::QueueClosed);
        }

        state.jobs.push_back(job);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head, waiting for a job if the queue is empty
    pub fn dequeue(&self) -> Result<Job> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Error::QueueClosed);
            }
            if let Some(job) = state.jobs.pop_front() {
                self.not_full.notify_one();
                return Ok(job);
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Remove and return every queued job without blocking
    pub fn drain_all(&self) -> Vec<Job> {
        let mut state = self.state.lock();
        let jobs: Vec<_> = state.jobs.drain(..).collect();
        if !jobs.is_empty() {
            self.not_full.notify_all();
        }
        jobs
    }

    pub fn size(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Snapshot of the queued jobs, head first
    pub fn list(&self) -> Vec<JobInfo> {
        self.state.lock().jobs.iter().map(Job::info).collect()
    }

    /// Close the queue and wake every waiter. Jobs still queued stay there
    /// but can no longer be dequeued.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            debug!(queue = self.name, pending = state.jobs.len(), "closing queue");
        }
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
