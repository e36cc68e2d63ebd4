use crate::policy::JobOrdering;
use crate::types::Job;

/// First come, first served: arrival order is already the queue order
#[derive(Debug)]
pub struct Fcfs;

impl JobOrdering for Fcfs {
    fn order(&self, _round: &mut [Job]) {}
}
