//! # Folio Workspace
//!
//! Wires the lineage store, the editor synchronization core and the quality
//! checks into a [`DocumentSession`], plus environment configuration and
//! tracing setup for the `folio` binary.

pub mod config;
pub mod session;
pub mod telemetry;

pub use config::FolioConfig;
pub use session::{DocumentSession, SessionError, SessionResult};
pub use telemetry::init_tracing;
