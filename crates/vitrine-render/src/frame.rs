//! Sandboxed frame primitive and its in-process implementation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::blob::ObjectUrl;
use crate::error_document::escape_html;
use crate::policy::SandboxPolicy;

/// The host environment's isolated frame.
pub trait SandboxFrame: Send + Sync {
    /// Navigates the frame to `src` with `policy` applied.
    fn assign_source(&self, src: &ObjectUrl, policy: &SandboxPolicy);

    /// Writes `html` straight into the frame without navigating.
    fn write_inline(&self, html: &str, policy: &SandboxPolicy);

    /// Returns the frame to a blank document.
    fn clear(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Blank,
    Source {
        url: ObjectUrl,
        sandbox: String,
    },
    Inline {
        html: String,
        sandbox: String,
    },
}

#[derive(Debug, Default)]
struct MemoryFrameState {
    current: FrameState,
    history: Vec<FrameState>,
}

/// Frame that records its state in memory; served by the preview host router.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrame {
    state: Arc<Mutex<MemoryFrameState>>,
}

impl MemoryFrame {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryFrameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, next: FrameState) {
        let mut state = self.lock();
        state.history.push(next.clone());
        state.current = next;
    }

    pub fn current(&self) -> FrameState {
        self.lock().current.clone()
    }

    /// Every state the frame has been put in, oldest first.
    pub fn history(&self) -> Vec<FrameState> {
        self.lock().history.clone()
    }
}

impl SandboxFrame for MemoryFrame {
    fn assign_source(&self, src: &ObjectUrl, policy: &SandboxPolicy) {
        self.record(FrameState::Source {
            url: src.clone(),
            sandbox: policy.attribute_value(),
        });
    }

    fn write_inline(&self, html: &str, policy: &SandboxPolicy) {
        self.record(FrameState::Inline {
            html: html.to_string(),
            sandbox: policy.attribute_value(),
        });
    }

    fn clear(&self) {
        self.record(FrameState::Blank);
    }
}

/// Host-page markup for a frame in `state`. `blob_route` is the path prefix
/// under which object URLs are served (for example `/blobs`).
pub fn frame_markup(state: &FrameState, blob_route: &str, policy: &SandboxPolicy) -> String {
    let blob_route = blob_route.trim_end_matches('/');
    match state {
        FrameState::Blank => format!(
            r#"<iframe class="vitrine-frame" sandbox="{}" src="about:blank"></iframe>"#,
            policy.attribute_value()
        ),
        FrameState::Source { url, sandbox } => format!(
            r#"<iframe class="vitrine-frame" sandbox="{}" src="{}/{}"></iframe>"#,
            escape_html(sandbox),
            blob_route,
            escape_html(&url.id)
        ),
        FrameState::Inline { html, sandbox } => format!(
            r#"<iframe class="vitrine-frame" sandbox="{}" srcdoc="{}"></iframe>"#,
            escape_html(sandbox),
            escape_html(html)
        ),
    }
}
