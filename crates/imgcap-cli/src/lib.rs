//! Helpers shared by the imgcap command-line host.

use anyhow::Context;
use imgcap_core::{CaptionError, LogLevel};
use imgcap_processing::ImageTensor;
use serde::Serialize;
use std::path::Path;

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout only
/// carries the caption.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Decode an image file into the tensor layout the caption node expects.
pub fn load_tensor(path: &Path) -> anyhow::Result<ImageTensor> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Failed to detect image format of {}", path.display()))?
        .decode()
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(ImageTensor::from_image(&img))
}

/// JSON body printed on stdout when `--json` is set and captioning fails
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub code: String,
    /// False when the failure happened before the request left the process
    pub request_sent: bool,
}

impl From<&CaptionError> for ErrorReport {
    fn from(err: &CaptionError) -> Self {
        Self {
            error: err.to_string(),
            code: err.error_code().to_string(),
            request_sent: !err.is_local(),
        }
    }
}

/// Log a caption failure at the level its kind calls for
pub fn log_error(error: &CaptionError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code = code, "Caption failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code = code, "Caption failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, code = code, "Caption failed");
        }
    }
}
