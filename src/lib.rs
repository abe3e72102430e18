//! Student performance analysis engine.
//!
//! Load a student table, detect which of the two supported layouts it uses,
//! then recompute KPIs and chart tables for any combination of filters.

pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod session;

pub use config::EngineConfig;
pub use error::EngineError;
pub use report::{Overview, Report};
pub use session::Session;
