//! imgcap core library
//!
//! Configuration discovery, the shared error type and the model enumeration
//! used by every imgcap crate.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{CaptionConfig, EnvFallback, EnvSearch};
pub use error::{CaptionError, CaptionResult, LogLevel};
pub use models::CaptionModel;
