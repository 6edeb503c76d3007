//! Generation gate that keeps superseded attempts away from the surface.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use vitrine_render::RenderSurface;

/// Owns the render surface and the generation of the newest attempt.
///
/// Surface writes happen while the generation lock is held, so an attempt that
/// observed itself as current cannot interleave its write with a newer
/// `begin`.
pub(crate) struct SurfaceGate {
    surface: Arc<dyn RenderSurface>,
    generation: Mutex<u64>,
    notify: watch::Sender<u64>,
}

impl SurfaceGate {
    pub(crate) fn new(surface: Arc<dyn RenderSurface>) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            surface,
            generation: Mutex::new(0),
            notify,
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new generation, superseding every earlier one.
    pub(crate) fn begin(&self) -> u64 {
        let mut generation = self.lock();
        *generation += 1;
        self.notify.send_replace(*generation);
        *generation
    }

    pub(crate) fn current(&self) -> u64 {
        *self.lock()
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Runs `write` against the surface only if `generation` is still current.
    pub(crate) fn commit<F>(&self, generation: u64, write: F) -> bool
    where
        F: FnOnce(&dyn RenderSurface),
    {
        let current = self.lock();
        if *current != generation {
            return false;
        }
        write(self.surface.as_ref());
        true
    }

    /// Sleeps for `delay`, waking early if `generation` is superseded.
    /// Returns whether `generation` is still current afterwards.
    pub(crate) async fn sleep_unless_superseded(&self, generation: u64, delay: Duration) -> bool {
        let mut receiver = self.notify.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = async {
                let _ = receiver.wait_for(|latest| *latest != generation).await;
            } => {}
        }
        self.is_current(generation)
    }
}
