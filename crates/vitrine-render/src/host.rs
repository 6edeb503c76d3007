//! HTTP host that serves object URLs and frame markup for preview targets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::blob::BlobStore;
use crate::frame::{frame_markup, MemoryFrame};
use crate::policy::SandboxPolicy;
use crate::renderer::SandboxRenderer;

pub const BLOB_ROUTE_PREFIX: &str = "/blobs";
const BLOB_ENDPOINT: &str = "/blobs/{id}";
const FRAME_ENDPOINT: &str = "/frames/{target}";

/// Blob registry, sandbox policy, and per-target frames behind the host router.
#[derive(Debug, Clone)]
pub struct PreviewHostState {
    blobs: BlobStore,
    policy: SandboxPolicy,
    frames: Arc<Mutex<HashMap<String, MemoryFrame>>>,
}

impl PreviewHostState {
    pub fn new(blobs: BlobStore, policy: SandboxPolicy) -> Self {
        Self {
            blobs,
            policy,
            frames: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn frames(&self) -> MutexGuard<'_, HashMap<String, MemoryFrame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    /// Returns the frame for `target`, creating it on first use.
    pub fn frame(&self, target: &str) -> MemoryFrame {
        self.frames()
            .entry(target.to_string())
            .or_default()
            .clone()
    }

    /// A renderer bound to `target`'s frame and this host's blob registry.
    pub fn renderer(&self, target: &str) -> SandboxRenderer<MemoryFrame> {
        SandboxRenderer::new(self.frame(target), self.blobs.clone(), self.policy.clone())
    }

    pub fn remove_frame(&self, target: &str) -> bool {
        self.frames().remove(target).is_some()
    }
}

pub fn build_preview_host_router(state: PreviewHostState) -> Router {
    Router::new()
        .route(BLOB_ENDPOINT, get(handle_blob))
        .route(FRAME_ENDPOINT, get(handle_frame))
        .with_state(Arc::new(state))
}

async fn handle_blob(
    State(state): State<Arc<PreviewHostState>>,
    Path(id): Path<String>,
) -> Response {
    let Some(blob) = state.blobs.get(&id) else {
        return not_found("blob_not_found", format!("object url '{id}' is not live"));
    };
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, blob.content_type),
            (CONTENT_SECURITY_POLICY, state.policy.csp_header_value()),
            (X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            (CACHE_CONTROL, "no-store".to_string()),
        ],
        blob.body,
    )
        .into_response()
}

async fn handle_frame(
    State(state): State<Arc<PreviewHostState>>,
    Path(target): Path<String>,
) -> Response {
    let frame = state.frames().get(&target).cloned();
    let Some(frame) = frame else {
        return not_found("frame_not_found", format!("unknown render target '{target}'"));
    };
    Html(frame_markup(&frame.current(), BLOB_ROUTE_PREFIX, &state.policy)).into_response()
}

fn not_found(code: &str, message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}
