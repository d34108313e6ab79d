//! Probe providers
//!
//! Concrete implementations of the three audit axes.

pub mod instrumentation;
pub mod lighthouse;
pub mod pa11y;

pub use instrumentation::InstrumentationProbe;
pub use lighthouse::LighthouseProbe;
pub use pa11y::Pa11yProbe;
