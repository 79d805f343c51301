use serde::{Deserialize, Serialize};

use crate::constants::MAX_ATTEMPTS;

/// What to do with a job whose latest scan came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDecision {
    /// Put the job back on the queue with its updated attempt count
    Requeue,
    /// The attempt budget is spent; record a permanent failure
    GiveUp,
}

/// Bounded retry policy: a job gets `max_attempts` scans in total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide based on the number of attempts that have failed so far
    pub fn decide(&self, failed_attempts: u32) -> RetryDecision {
        if failed_attempts < self.max_attempts {
            RetryDecision::Requeue
        } else {
            RetryDecision::GiveUp
        }
    }
}
