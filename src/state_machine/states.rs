use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{JobEvent, RetryDecision, RetryPolicy};

/// Lifecycle states of one repository scan job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the queue
    Pending,
    /// Held by a worker while the scan engine runs
    InFlight,
    /// Result written to the aggregator
    Succeeded,
    /// Retry budget exhausted, key recorded in the failure list
    PermanentlyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: JobState, event: &'static str },
}

impl JobState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PermanentlyFailed)
    }

    /// Check if this is an active state (a worker owns the job)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    /// Apply an event, consulting the retry policy on failures
    pub fn transition(
        self,
        event: JobEvent,
        policy: &RetryPolicy,
    ) -> Result<JobState, StateMachineError> {
        match (self, event) {
            (Self::Pending, JobEvent::Claim) => Ok(Self::InFlight),
            (Self::InFlight, JobEvent::Succeed) => Ok(Self::Succeeded),
            (Self::InFlight, JobEvent::Fail { failed_attempts }) => {
                match policy.decide(failed_attempts) {
                    RetryDecision::Requeue => Ok(Self::Pending),
                    RetryDecision::GiveUp => Ok(Self::PermanentlyFailed),
                }
            }
            (from, event) => Err(StateMachineError::InvalidTransition {
                from,
                event: event.event_type(),
            }),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::PermanentlyFailed => write!(f, "permanently_failed"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_flight" => Ok(Self::InFlight),
            "succeeded" => Ok(Self::Succeeded),
            "permanently_failed" => Ok(Self::PermanentlyFailed),
            _ => Err(format!("Invalid job state: {s}")),
        }
    }
}
