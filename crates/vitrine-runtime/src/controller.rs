//! Retry/refresh state machine for one render target.
//!
//! A render walks `Enumerating -> Resolving -> Fetching -> Rewriting ->
//! Rendered`. Expiry-shaped failures send the attempt back to `Enumerating`,
//! where a fresh listing mints every URL again; anything else, or an
//! exhausted cycle budget, ends in `Failed` with an error document on the
//! surface. A newer `render` on the same controller supersedes the older one,
//! which then stops without touching the surface.

use std::ops::ControlFlow;
use std::sync::Arc;

use vitrine_core::{
    normalize_path, parent_dir, resolve_entry, BundleDescriptor, BundleManifest, BundleSource,
    EntryResolution, FileMap,
};
use vitrine_render::{rewrite_html_with_report, RenderSurface, RewriteReport};
use vitrine_storage::{build_file_map, storage_path_from_download_url, StorageLister};

use crate::attempt::{RenderAttempt, RenderState};
use crate::config::PreviewConfig;
use crate::error::RenderError;
use crate::fetch::DocumentFetcher;
use crate::gate::SurfaceGate;


/// How a `render` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The rewritten entry document is on the surface.
    Rendered { entry: EntryResolution },
    /// The fixed error document for `error` is on the surface.
    Failed { error: RenderError },
    /// A newer render took over; this attempt left the surface alone.
    Superseded,
}

/// What one `render` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub bundle_id: String,
    pub generation: u64,
    pub outcome: RenderOutcome,
    pub fetch_cycles: usize,
    pub retry_count: usize,
    pub transitions: Vec<RenderState>,
    pub rewrite: Option<RewriteReport>,
}

impl RenderReport {
    pub fn final_state(&self) -> RenderState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(RenderState::Idle)
    }

    pub fn error(&self) -> Option<&RenderError> {
        match &self.outcome {
            RenderOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}

enum Step {
    Enumerate,
    Resolve {
        map: Arc<FileMap>,
    },
    Fetch {
        map: Arc<FileMap>,
        entry: EntryResolution,
    },
    Rewrite {
        map: Arc<FileMap>,
        entry: EntryResolution,
        document: String,
    },
}

impl Step {
    fn state(&self) -> RenderState {
        match self {
            Step::Enumerate => RenderState::Enumerating,
            Step::Resolve { .. } => RenderState::Resolving,
            Step::Fetch { .. } => RenderState::Fetching,
            Step::Rewrite { .. } => RenderState::Rewriting,
        }
    }
}

/// Drives renders of bundles into a single surface.
pub struct RenderController {
    target: String,
    storage: Arc<dyn StorageLister>,
    fetcher: Arc<dyn DocumentFetcher>,
    gate: SurfaceGate,
    config: PreviewConfig,
}

impl RenderController {
    pub fn new(
        target: impl Into<String>,
        storage: Arc<dyn StorageLister>,
        fetcher: Arc<dyn DocumentFetcher>,
        surface: Arc<dyn RenderSurface>,
        config: PreviewConfig,
    ) -> Self {
        Self {
            target: target.into(),
            storage,
            fetcher,
            gate: SurfaceGate::new(surface),
            config,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn current_generation(&self) -> u64 {
        self.gate.current()
    }

    /// Renders `descriptor`, superseding any render still in flight.
    ///
    /// Never fails: errors end up on the surface and in the report.
    #[tracing::instrument(
        name = "vitrine.runtime.render",
        skip(self, descriptor),
        fields(render_target = %self.target, bundle_id = %descriptor.id)
    )]
    pub async fn render(&self, descriptor: &BundleDescriptor) -> RenderReport {
        let generation = self.gate.begin();
        let mut attempt = RenderAttempt::new(generation);
        let outcome = self.drive(descriptor, &mut attempt).await;
        match &outcome {
            RenderOutcome::Rendered { entry } => tracing::debug!(
                generation,
                entry = %entry.entry,
                entry_source = entry.source.as_str(),
                fetch_cycles = attempt.fetch_cycles,
                "bundle rendered"
            ),
            RenderOutcome::Failed { error } => tracing::warn!(
                generation,
                fetch_cycles = attempt.fetch_cycles,
                error = %error,
                "bundle render failed"
            ),
            RenderOutcome::Superseded => {
                tracing::debug!(generation, "render attempt superseded")
            }
        }

        RenderReport {
            bundle_id: descriptor.id.clone(),
            generation,
            outcome,
            fetch_cycles: attempt.fetch_cycles,
            retry_count: attempt.retry_count,
            transitions: attempt.transitions().to_vec(),
            rewrite: attempt.rewrite.take(),
        }
    }

    /// Supersedes any in-flight render and releases the surface.
    pub fn dispose(&self) {
        let generation = self.gate.begin();
        self.gate.commit(generation, |surface| surface.dispose());
    }

    async fn drive(
        &self,
        descriptor: &BundleDescriptor,
        attempt: &mut RenderAttempt,
    ) -> RenderOutcome {
        match descriptor.source(&self.config.upload_prefix) {
            Ok(BundleSource::Storage { base_path }) => attempt.base_path = Some(base_path),
            Ok(BundleSource::Snapshot) => {}
            Err(_) => {
                return self.fail(
                    attempt,
                    RenderError::NoSourceOfTruth {
                        id: descriptor.id.clone(),
                    },
                )
            }
        }

        attempt.fetch_cycles = 1;
        let mut step = Step::Enumerate;
        attempt.transition(step.state());

        loop {
            if !self.gate.is_current(attempt.generation) {
                return RenderOutcome::Superseded;
            }

            step = match step {
                Step::Enumerate => {
                    let enumerated = self.enumerate(descriptor, attempt).await;
                    match enumerated {
                        Ok(map) => Step::Resolve { map },
                        Err(error) => match self.recover(attempt, error, None).await {
                            ControlFlow::Continue(()) => Step::Enumerate,
                            ControlFlow::Break(outcome) => return outcome,
                        },
                    }
                }
                Step::Resolve { map } => {
                    let manifest = self.read_manifest(&map).await;
                    match resolve_entry(descriptor, &map, manifest.as_ref()) {
                        Some(entry) => Step::Fetch { map, entry },
                        None => {
                            return self.fail(
                                attempt,
                                RenderError::NoEntryPointFound {
                                    id: descriptor.id.clone(),
                                },
                            )
                        }
                    }
                }
                Step::Fetch { map, entry } => {
                    let fetched = self.fetcher.fetch_text(&entry.url).await;
                    match fetched {
                        Ok(document) => Step::Rewrite {
                            map,
                            entry,
                            document,
                        },
                        Err(error) => {
                            match self.recover(attempt, error.into(), Some(&entry)).await {
                                ControlFlow::Continue(()) => Step::Enumerate,
                                ControlFlow::Break(outcome) => return outcome,
                            }
                        }
                    }
                }
                Step::Rewrite {
                    map,
                    entry,
                    document,
                } => {
                    let (html, report) = rewrite_html_with_report(&document, &map);
                    if !report.unresolved.is_empty() {
                        tracing::debug!(
                            unresolved = ?report.unresolved,
                            "references left unchanged by rewrite"
                        );
                    }
                    if !self
                        .gate
                        .commit(attempt.generation, |surface| surface.set_content(&html))
                    {
                        return RenderOutcome::Superseded;
                    }
                    attempt.rewrite = Some(report);
                    attempt.transition(RenderState::Rendered);
                    return RenderOutcome::Rendered { entry };
                }
            };
            attempt.transition(step.state());
        }
    }

    async fn enumerate(
        &self,
        descriptor: &BundleDescriptor,
        attempt: &RenderAttempt,
    ) -> Result<Arc<FileMap>, RenderError> {
        let Some(base_path) = attempt.base_path.clone() else {
            return Ok(Arc::new(FileMap::from_snapshot(&descriptor.files)));
        };

        let build = build_file_map(self.storage.as_ref(), &base_path).await;
        if !build.is_complete() {
            tracing::warn!(
                base_path = %base_path,
                root_listed = build.root_listed,
                incomplete_prefixes = ?build.incomplete_prefixes,
                skipped_items = build.skipped_items.len(),
                "storage enumeration incomplete"
            );
        }
        if build.map.is_empty() {
            if descriptor.has_snapshot() {
                tracing::debug!(base_path = %base_path, "storage listing empty; using upload snapshot");
                return Ok(Arc::new(FileMap::from_snapshot(&descriptor.files)));
            }
            if !build.root_listed {
                return Err(RenderError::ListingUnavailable { base_path });
            }
        }

        Ok(Arc::new(build.map))
    }

    /// Best effort: a missing, unreadable, or malformed manifest is ignored.
    async fn read_manifest(&self, map: &FileMap) -> Option<BundleManifest> {
        let url = map.get_exact(&normalize_path(&self.config.manifest_file_name))?;
        match self.fetcher.fetch_text(url).await {
            Ok(raw) => match BundleManifest::parse(&raw) {
                Ok(manifest) => Some(manifest),
                Err(error) => {
                    tracing::warn!(error = %error, "ignoring malformed bundle manifest");
                    None
                }
            },
            Err(error) => {
                tracing::warn!(error = %error, "bundle manifest unavailable; continuing without it");
                None
            }
        }
    }

    /// Decides whether `error` earns another enumerate-and-fetch cycle.
    async fn recover(
        &self,
        attempt: &mut RenderAttempt,
        error: RenderError,
        entry: Option<&EntryResolution>,
    ) -> ControlFlow<RenderOutcome> {
        if !self.gate.is_current(attempt.generation) {
            return ControlFlow::Break(RenderOutcome::Superseded);
        }
        if !error.is_recoverable() {
            return ControlFlow::Break(self.fail(attempt, error));
        }
        if attempt.fetch_cycles >= self.config.max_fetch_cycles() {
            let attempts = attempt.fetch_cycles;
            return ControlFlow::Break(self.fail(
                attempt,
                RenderError::MaxRetriesExceeded {
                    attempts,
                    last: Box::new(error),
                },
            ));
        }

        attempt.retry_count += 1;
        let delay = self.config.retry_delay(attempt.retry_count);
        tracing::warn!(
            generation = attempt.generation,
            retry = attempt.retry_count,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "recoverable render failure; refreshing download urls"
        );
        attempt.last_error = Some(error);

        if !self
            .gate
            .sleep_unless_superseded(attempt.generation, delay)
            .await
        {
            return ControlFlow::Break(RenderOutcome::Superseded);
        }

        if attempt.base_path.is_none() {
            if let Some(base_path) = entry.and_then(refresh_base_path) {
                tracing::debug!(base_path = %base_path, "narrowed snapshot refresh to storage directory");
                attempt.base_path = Some(base_path);
            }
        }
        attempt.fetch_cycles += 1;
        ControlFlow::Continue(())
    }

    fn fail(&self, attempt: &mut RenderAttempt, error: RenderError) -> RenderOutcome {
        let message = error.user_message();
        if !self
            .gate
            .commit(attempt.generation, |surface| surface.set_error(&message))
        {
            return RenderOutcome::Superseded;
        }
        attempt.last_error = Some(error.clone());
        attempt.transition(RenderState::Failed);
        RenderOutcome::Failed { error }
    }
}

/// Storage directory holding a snapshot bundle, recovered from its entry's
/// download URL.
fn refresh_base_path(entry: &EntryResolution) -> Option<String> {
    let storage_path = storage_path_from_download_url(&entry.url)?;
    let suffix = format!("/{}", entry.entry);
    let base_path = match storage_path.strip_suffix(suffix.as_str()) {
        Some(base_path) => base_path.to_string(),
        None => parent_dir(&storage_path).to_string(),
    };
    (!base_path.is_empty()).then_some(base_path)
}
