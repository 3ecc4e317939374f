pub mod autopilot;
pub mod requeue_due;
pub mod schedule_content;

pub use autopilot::{autopilot_tick, TickStats};
pub use requeue_due::requeue_due_entries;
pub use schedule_content::{idempotency_key, publish_now, schedule_content, ScheduleError};
