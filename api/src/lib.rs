//! WebAudit API Module
//!
//! HTTP surface over the orchestrator and the run history: trigger audits,
//! list past runs and view the newest report.

pub mod handlers;
pub mod models;
pub mod server;

pub use handlers::*;
pub use models::*;
pub use server::*;
