use std::sync::{Mutex, PoisonError};

use crate::blob::{Blob, BlobStore, ObjectUrl};
use crate::error_document::render_error_document;
use crate::frame::SandboxFrame;
use crate::policy::SandboxPolicy;
use crate::surface::RenderSurface;

/// Materializes documents into a sandboxed frame through revocable object URLs.
///
/// Owns the object URL currently assigned to its frame and revokes it as soon
/// as it is superseded or the renderer is disposed.
#[derive(Debug)]
pub struct SandboxRenderer<F: SandboxFrame> {
    frame: F,
    blobs: BlobStore,
    policy: SandboxPolicy,
    current: Mutex<Option<ObjectUrl>>,
}

impl<F: SandboxFrame> SandboxRenderer<F> {
    pub fn new(frame: F, blobs: BlobStore, policy: SandboxPolicy) -> Self {
        Self {
            frame,
            blobs,
            policy,
            current: Mutex::new(None),
        }
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }

    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    pub fn current_object_url(&self) -> Option<ObjectUrl> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wraps `html` in a blob and points the frame at it.
    pub fn render(&self, html: &str) -> ObjectUrl {
        let url = self.blobs.create_object_url(Blob::html(html));
        self.frame.assign_source(&url, &self.policy);
        self.replace_current(Some(url.clone()));
        tracing::debug!(object_url = %url.href, bytes = html.len(), "rendered document into frame");
        url
    }

    fn replace_current(&self, next: Option<ObjectUrl>) {
        let previous = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next)
        };
        if let Some(previous) = previous {
            self.blobs.revoke(&previous);
        }
    }
}

impl<F: SandboxFrame> RenderSurface for SandboxRenderer<F> {
    fn set_content(&self, html: &str) {
        self.render(html);
    }

    fn set_error(&self, message: &str) {
        self.frame
            .write_inline(&render_error_document(message), &self.policy);
        self.replace_current(None);
    }

    fn dispose(&self) {
        self.replace_current(None);
        self.frame.clear();
    }
}
