//! OSA Harness
//!
//! Generates synthetic but structurally valid workflow submissions and
//! drives them through the ingestion endpoint, sequentially or
//! concurrently, with induced agent failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use osa_harness::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::default()
//!     .with_endpoint("http://127.0.0.1:3000/api/opal/osa-workflow")
//!     .with_token("dev-token")
//!     .with_concurrency(50);
//!
//! let report = Simulator::new(config)?.run_concurrent().await;
//! println!("{}", report.generate_text());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod generator;
pub mod report;
pub mod simulator;
pub mod submitter;

pub use config::{default_profiles, AgentProfile, SimulatorConfig, DEFAULT_ENDPOINT};
pub use generator::{FailurePlan, PayloadGenerator};
pub use report::{ConcurrentReport, ScenarioResult, SubmissionRecord, SweepReport};
pub use simulator::{standard_scenarios, Scenario, Simulator};
pub use submitter::{
    submit_and_classify, HttpSubmitter, SubmissionOutcome, SubmitResponse, Submitter,
    TransportError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
