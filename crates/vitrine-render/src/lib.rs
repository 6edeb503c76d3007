//! Document assembly and sandboxed materialization for Vitrine previews.
//!
//! Rewrites bundle-relative references in an entry document, wraps the result
//! in a revocable object URL, and assigns it to an isolated frame under a fixed
//! sandbox capability set. Also serves those object URLs over HTTP.

mod blob;
mod error_document;
mod frame;
mod host;
mod policy;
mod renderer;
mod rewrite;
mod surface;

pub use blob::{Blob, BlobStore, ObjectUrl, HTML_CONTENT_TYPE};
pub use error_document::{escape_html, render_error_document, ERROR_LOG_HINT};
pub use frame::{frame_markup, FrameState, MemoryFrame, SandboxFrame};
pub use host::{build_preview_host_router, PreviewHostState, BLOB_ROUTE_PREFIX};
pub use policy::{
    SandboxCapability, SandboxPolicy, SandboxPolicyError, FORBIDDEN_SANDBOX_TOKENS,
};
pub use renderer::SandboxRenderer;
pub use rewrite::{is_absolute_reference, rewrite_html, rewrite_html_with_report, RewriteReport};
pub use surface::RenderSurface;
