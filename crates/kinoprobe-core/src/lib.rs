//! # kinoprobe-core
//!
//! Conformance-probe library for a KinoPub-style video catalog API.
//! It drives the service's real HTTP surface (OAuth2 device flow, catalog
//! dictionaries, listings, playback links, collections, bookmarks, watching
//! state, history, devices, and the unofficial `api2/*` endpoints), checks
//! every response against the empirically known shapes, and persists
//! redacted snapshots of each exchange.
//!
//! # Example
//!
//! ```rust,no_run
//! use kinoprobe_core::runner::{RunConfig, run};
//!
//! #[tokio::main]
//! async fn main() -> kinoprobe_core::Result<()> {
//!     let config = RunConfig {
//!         token: Some("access-token".to_string()),
//!         ..RunConfig::default()
//!     };
//!     let report = run(&config).await?;
//!     std::process::exit(report.exit_code);
//! }
//! ```

pub mod auth;
pub mod client;
pub mod context;
pub mod error;
pub mod outcome;
pub mod probes;
pub mod redact;
pub mod runner;
pub mod shape;
pub mod snapshot;
pub mod token;

pub use auth::{DeviceAuthenticator, DeviceCode, PollOutcome, TokenGrant};
pub use client::{ApiClient, ApiRequest, ClientConfig, DEFAULT_BASE_URL, HttpResponse};
pub use context::{MediaFileRef, RunContext};
pub use error::{ProbeError, Result};
pub use outcome::{RunSummary, TestOutcome, TestStatus};
pub use runner::{RunConfig, RunReport, run};
pub use snapshot::SnapshotWriter;
pub use token::{TokenPayload, TokenSource};
