//! Domain logic for embercast: momentum scoring, scheduling, and publish
//! reliability. Each domain splits `models/` (sqlx persistence) from
//! `activities/` (orchestration), with pure logic beside them.

pub mod content;
pub mod momentum;
pub mod publishing;
pub mod scheduling;
pub mod shared;

#[cfg(feature = "test-utils")]
pub mod fixtures;
#[cfg(feature = "test-utils")]
pub mod testutil;
