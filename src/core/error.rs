//! Application-wide error types.
//!
//! These cover process startup only. Broker config failures never surface
//! here as raw errors; they are reported through [`crate::broker::LoadResult`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("settings error: {0}")]
    Settings(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("load error: {0}")]
    Load(String),
}
