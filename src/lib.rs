//! Appwarden: a foreground-application usage governor.
//!
//! This crate watches which application is currently visible, accumulates
//! active usage time per listed package, and enforces a time limit by
//! killing the application and imposing a temporary ban once the limit is
//! reached.

pub mod blocklist;
pub mod config;
pub mod coordinator;
pub mod enforce;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod record;

pub use blocklist::Blocklist;
pub use config::Config;
pub use coordinator::Coordinator;
pub use enforce::{Enforcer, TermuxEnforcer};
pub use error::{Result, WardenError};
pub use probe::{DumpsysProbe, ForegroundProbe};
pub use record::{SharedRecord, UsageRecord};
