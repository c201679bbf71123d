//! Judge execution engine: submission client, polling, per-test verdicts
//! and weighted batch evaluation against a Judge0-compatible service.

pub mod client;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod metrics;
pub mod poller;
pub mod runner;

#[cfg(test)]
mod test_support;

pub use client::{JudgeClient, SubmissionApi};
pub use error::ExecutionError;
pub use evaluator::OutputPolicy;
pub use executor::Executor;
