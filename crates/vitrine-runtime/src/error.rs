use thiserror::Error;

use crate::fetch::FetchError;

/// Why a render attempt did not produce a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("bundle '{id}' has no storage path, upload id, or file list")]
    NoSourceOfTruth { id: String },
    #[error("no HTML entry point found in bundle '{id}'")]
    NoEntryPointFound { id: String },
    #[error("entry fetch failed: {0}")]
    FetchFailed(String),
    #[error("entry fetch returned HTTP {status}")]
    Http { status: u16 },
    #[error("storage listing for '{base_path}' is unavailable")]
    ListingUnavailable { base_path: String },
    #[error("gave up after {attempts} fetch cycles: {last}")]
    MaxRetriesExceeded {
        attempts: usize,
        last: Box<RenderError>,
    },
}

impl RenderError {
    /// True for failures that usually mean stale download URLs.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RenderError::FetchFailed(_) | RenderError::ListingUnavailable { .. } => true,
            RenderError::Http { status } => matches!(status, 403 | 404),
            RenderError::NoSourceOfTruth { .. }
            | RenderError::NoEntryPointFound { .. }
            | RenderError::MaxRetriesExceeded { .. } => false,
        }
    }

    /// Fixed text shown on the render surface.
    pub fn user_message(&self) -> String {
        match self {
            RenderError::NoSourceOfTruth { .. } => {
                "This preview has no files to load.".to_string()
            }
            RenderError::NoEntryPointFound { .. } => {
                "No entry point found: the bundle contains no HTML file.".to_string()
            }
            RenderError::FetchFailed(_) => "The preview could not be loaded.".to_string(),
            RenderError::Http { status } => {
                format!("The preview could not be loaded (HTTP {status}).")
            }
            RenderError::ListingUnavailable { .. } => {
                "The preview files could not be listed.".to_string()
            }
            RenderError::MaxRetriesExceeded { .. } => {
                "The preview could not be loaded after several attempts.".to_string()
            }
        }
    }
}

impl From<FetchError> for RenderError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Network(message) => RenderError::FetchFailed(message),
            FetchError::Status(status) => RenderError::Http { status },
        }
    }
}
