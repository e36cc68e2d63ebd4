use std::fmt::Debug;
use std::str::FromStr;

use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::types::Job;
use crate::utils::prelude::*;

mod fcfs;
mod priority;
mod sjf;

pub use fcfs::Fcfs;
pub use priority::Priority;
pub use sjf::Sjf;

/// Orders the jobs collected in one scheduling round, in place
pub trait JobOrdering: Debug + Send + Sync {
    fn order(&self, round: &mut [Job]);
}

/// The policy used to order each scheduling round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display(style = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SchedulingPolicy {
    Fcfs,
    Sjf,
    Priority,
}

/// Indexed by `SchedulingPolicy as usize`
static ORDERINGS: [&(dyn JobOrdering + 'static); 3] = [&Fcfs, &Sjf, &Priority];

impl SchedulingPolicy {
    pub const ALL: [SchedulingPolicy; 3] = [SchedulingPolicy::Fcfs, SchedulingPolicy::Sjf, SchedulingPolicy::Priority];

    pub fn ordering(self) -> &'static dyn JobOrdering {
        ORDERINGS[self as usize]
    }

    /// Reorder a round according to this policy
    pub fn order(self, round: &mut [Job]) {
        self.ordering().order(round)
    }
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        SchedulingPolicy::Fcfs
    }
}

impl FromStr for SchedulingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FCFS" => Ok(SchedulingPolicy::Fcfs),
            "SJF" => Ok(SchedulingPolicy::Sjf),
            "PRIORITY" => Ok(SchedulingPolicy::Priority),
            _ => Err(Error::UnsupportedPolicy(s.to_owned())),
        }
    }
}
