//! Render orchestration for Vitrine previews.
//!
//! [`RenderController`] ties storage enumeration, entry resolution, document
//! fetching, and reference rewriting into one retrying state machine per
//! render target, and writes the result (or a fixed error document) to a
//! [`vitrine_render::RenderSurface`].

mod attempt;
mod config;
mod controller;
mod error;
mod fetch;
mod gate;

pub use attempt::{RenderAttempt, RenderState};
pub use config::{
    load_preview_config, PreviewConfig, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_FETCH_CYCLES,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_SANDBOX_PROFILE, DEFAULT_UPLOAD_PREFIX,
};
pub use controller::{RenderController, RenderOutcome, RenderReport};
pub use error::RenderError;
pub use fetch::{
    DocumentFetcher, FetchError, HttpDocumentFetcher, HttpFetcherConfig, MemoryDocumentFetcher,
};
