use crate::models::error::RenderError;

/// Event sink for render session notifications.
///
/// Called synchronously from the thread running the session, in session
/// order. Both methods default to doing nothing.
pub trait RenderObserver: Send + Sync {
    /// Called once the test tone has been synthesized, before it is uploaded.
    fn on_source_synthesized(&self, _samples: &[i16]) {}

    /// Called for each error the best-effort policy steps over.
    fn on_diagnostic(&self, _error: &RenderError) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl RenderObserver for SilentObserver {}
