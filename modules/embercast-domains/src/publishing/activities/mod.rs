pub mod execute_publish;
pub mod rollback;

pub use execute_publish::{execute_publish, PublishOutcome};
pub use rollback::{rollback_attempt, rollback_duplicates, RollbackError, RollbackItem};
