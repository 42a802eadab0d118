//! Core infrastructure: shared foundation used across the whole crate.
//!
//! - **error**: binary-level error enum.
//! - **settings**: runtime settings loading (log level, debug flag).

pub mod error;
pub mod settings;
