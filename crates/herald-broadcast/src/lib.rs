//! herald-broadcast: the confirmed-broadcast core.
//!
//! Three cooperating pieces, each owning its part of the flow:
//!
//! ```text
//! Scheduler (minute tick, fixed UTC offset)
//!     ↓ exact "HH:MM" match
//! ConfirmationGate::request_confirmation()
//!     ↓ approve reaction on the prompt (no timeout)
//! BroadcastHandle::submit()
//!     ↓ single worker, bounded queue
//! BroadcastExecutor::run_broadcast()  — fan-out + status post
//! ```
//!
//! End-to-end state machine:
//!
//! ```text
//! Idle --(schedule match)--> AwaitingConfirmation
//! AwaitingConfirmation --(matching approve reaction)--> Broadcasting --> Idle
//! AwaitingConfirmation --(new schedule match / other reaction)--> AwaitingConfirmation
//! ```
//!
//! "Idle" is simply "no pending confirmation recorded"; the pending state
//! has a single owner (the gate) and both of its mutators — the scheduler
//! tick and the reaction callback — go through that owner's lock.

pub mod confirm;
pub mod executor;
pub mod scheduler;

pub use confirm::{ConfirmationGate, GateSettings, run_reaction_router};
pub use executor::{BroadcastBusy, BroadcastExecutor, BroadcastHandle, ExecutorSettings};
pub use scheduler::Scheduler;

#[cfg(test)]
pub(crate) mod testing;
