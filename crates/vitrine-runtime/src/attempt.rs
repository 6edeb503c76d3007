use vitrine_render::RewriteReport;

use crate::error::RenderError;

/// Controller state for one render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Enumerating,
    Resolving,
    Fetching,
    Rewriting,
    Rendered,
    Failed,
}

impl RenderState {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderState::Idle => "idle",
            RenderState::Enumerating => "enumerating",
            RenderState::Resolving => "resolving",
            RenderState::Fetching => "fetching",
            RenderState::Rewriting => "rewriting",
            RenderState::Rendered => "rendered",
            RenderState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RenderState::Rendered | RenderState::Failed)
    }
}

/// Bookkeeping for a single `render` call. Never shared between calls.
#[derive(Debug)]
pub struct RenderAttempt {
    pub generation: u64,
    /// Retries performed so far; the initial cycle is not a retry.
    pub retry_count: usize,
    /// Enumerate-and-fetch cycles started, the initial one included.
    pub fetch_cycles: usize,
    pub last_error: Option<RenderError>,
    /// Storage base path to enumerate, when the bundle has one.
    pub base_path: Option<String>,
    pub rewrite: Option<RewriteReport>,
    state: RenderState,
    transitions: Vec<RenderState>,
}

impl RenderAttempt {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            retry_count: 0,
            fetch_cycles: 0,
            last_error: None,
            base_path: None,
            rewrite: None,
            state: RenderState::Idle,
            transitions: vec![RenderState::Idle],
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn transitions(&self) -> &[RenderState] {
        &self.transitions
    }

    pub fn transition(&mut self, next: RenderState) {
        tracing::debug!(
            generation = self.generation,
            from = self.state.as_str(),
            to = next.as_str(),
            fetch_cycle = self.fetch_cycles,
            "render state transition"
        );
        self.state = next;
        self.transitions.push(next);
    }
}
