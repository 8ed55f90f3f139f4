//! Demand/supply matching engine for a ride-hailing service.
//!
//! The crate pairs pending ride requests with available drivers on a
//! periodic tick, prices trips, and tracks group meetups through to the
//! moment every participant has arrived. State lives in an in-memory
//! relational store with all-or-nothing transactions; notifications go out
//! through a pluggable dispatcher after each commit.
//!
//! Entry points:
//!
//! - [`engine::MatchEngine`]: every operation, plus [`engine::MatchEngine::tick`]
//! - [`scheduler::spawn_ticker`]: runs the tick on an interval
//! - [`store::MemoryStore`]: the shipped storage backend

pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod matching;
pub mod model;
pub mod notify;
pub mod pricing;
pub mod proximity;
pub mod scheduler;
pub mod store;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
