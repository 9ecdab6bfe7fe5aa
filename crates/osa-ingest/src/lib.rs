//! OSA Ingest - Workflow ingestion endpoint
//!
//! Receives batched agent results on `POST /api/opal/osa-workflow`,
//! authenticates the caller, aggregates the batch into a workflow run and
//! hands it to the workflow store.
//!
//! # Example
//!
//! ```rust,ignore
//! use osa_core::InMemoryWorkflowStore;
//! use osa_ingest::{routes, IngestConfig, IngestService};
//! use std::sync::Arc;
//!
//! let config = IngestConfig::load("osa-ingest.toml".as_ref())?;
//! let service = Arc::new(IngestService::from_config(
//!     &config,
//!     Arc::new(InMemoryWorkflowStore::new()),
//! ));
//!
//! warp::serve(routes::api(service, config.max_body_bytes))
//!     .run(config.bind)
//!     .await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod service;
pub mod submission;

// Re-exports for convenience
pub use auth::{AuthPolicy, Authenticator, Caller, StaticTokens, TokenValidator};
pub use config::{AuthConfig, ConfigError, IngestConfig, LoggingConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::{ErrorBody, IngestError};
pub use logging::init_tracing;
pub use service::{Accepted, AcceptedBody, IngestService, Phase, StatusSnapshot, SERVICE_NAME};
pub use submission::WorkflowSubmission;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
