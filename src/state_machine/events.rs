use serde::{Deserialize, Serialize};

/// Events that drive a job through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum JobEvent {
    /// A worker took the job off the queue
    Claim,
    /// The scan produced a non-empty result
    Succeed,
    /// The scan produced the empty sentinel; carries the updated failure count
    Fail { failed_attempts: u32 },
}

impl JobEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Succeed => "succeed",
            Self::Fail { .. } => "fail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(JobEvent::Fail { failed_attempts: 2 }).unwrap();
        assert_eq!(json["type"], "fail");
        assert_eq!(json["data"]["failed_attempts"], 2);
        assert_eq!(JobEvent::Claim.event_type(), "claim");
    }
}
