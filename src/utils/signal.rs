//! A one-shot flag that threads can block on.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Raised once, never lowered. Waiters wake as soon as it is raised.
#[derive(Debug, Default)]
pub struct Signal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.cond.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        *self.raised.lock()
    }

    /// Wait up to `timeout` for the signal. Returns whether it was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Wait until `deadline` for the signal. Returns whether it was raised.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut raised = self.raised.lock();
        while !*raised {
            if self.cond.wait_until(&mut raised, deadline).timed_out() {
                break;
            }
        }
        *raised
    }
}

/// Raises the wrapped signal when dropped, including during unwinding.
pub struct RaiseOnDrop(pub std::sync::Arc<Signal>);

impl Drop for RaiseOnDrop {
    fn drop(&mut self) {
        self.0.raise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn times_out_when_not_raised() {
        let signal = Signal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn wakes_waiter_early() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = signal.clone();
            thread::spawn(move || signal.wait_timeout(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.raise();
        assert!(waiter.join().unwrap());
        assert!(signal.is_raised());
    }

    #[test]
    fn raise_on_drop_survives_panics() {
        let signal = Arc::new(Signal::new());
        let guard = RaiseOnDrop(signal.clone());
        let res = thread::spawn(move || {
            let _guard = guard;
            panic!("boom");
        })
        .join();
        assert!(res.is_err());
        assert!(signal.is_raised());
    }
}
