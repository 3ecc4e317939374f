pub mod action_queue_entry;
pub mod correlation_edge;
pub mod momentum_snapshot;
pub mod topic_cluster;

pub use action_queue_entry::ActionQueueEntry;
pub use correlation_edge::CorrelationEdge;
pub use momentum_snapshot::MomentumSnapshot;
pub use topic_cluster::TopicCluster;
