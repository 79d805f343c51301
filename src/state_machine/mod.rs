// State machine module for the per-repository scan lifecycle
//
// A job moves Pending -> InFlight -> {Succeeded | PermanentlyFailed | Pending}.
// The retry policy decides which branch an empty scan result takes.

pub mod events;
pub mod retry;
pub mod states;

// Re-export main types for convenient access
pub use events::JobEvent;
pub use retry::{RetryDecision, RetryPolicy};
pub use states::{JobState, StateMachineError};
