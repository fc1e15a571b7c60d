//! triage-core: task ranking engine for the Triage scheduler.
//!
//! Tasks are scored by priority tier and deadline proximity, ordered through
//! a binary max-heap, and exposed by a [`Scheduler`] that rebuilds its
//! ranking whenever tasks or time change.

pub mod clock;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod score;
pub mod shared;
pub mod task;
pub mod time;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, SchedulerError};
pub use queue::UrgencyQueue;
pub use scheduler::{RankedEntry, Scheduler, TaskStats};
pub use score::{days_to_due, score, urgency_cmp};
pub use shared::SharedScheduler;
pub use task::{Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
