pub mod run_cycle;

pub use run_cycle::{enqueue_momentum_tasks, run_momentum_cycle, MomentumStats};
