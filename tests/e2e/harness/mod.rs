//! E2E test harness for scribe.
//!
//! Not every builder and assertion is used by the current scenarios.

#![allow(dead_code)]

pub mod assertions;
pub mod clock;
pub mod scenario;
pub mod steps;
pub mod workspace;

// Re-export commonly used types
pub use assertions::{Assertion, EventMatch};
pub use scenario::Scenario;
