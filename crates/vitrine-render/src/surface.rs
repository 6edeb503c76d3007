/// Minimal capability interface the controller renders into.
///
/// Implementations own whatever isolation primitive backs the surface; the
/// resolution and rewriting logic only ever sees these three operations.
pub trait RenderSurface: Send + Sync {
    /// Replaces the surface content with a rendered bundle document.
    fn set_content(&self, html: &str);

    /// Replaces the surface content with the fixed error document.
    fn set_error(&self, message: &str);

    /// Releases everything held by the surface.
    fn dispose(&self);
}
