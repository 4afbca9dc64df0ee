//! The script-execution surface seam.
//!
//! A surface is any rendering context that can evaluate script. The bridge
//! drives surfaces through [`ScriptSurface`] and receives their messages
//! through a [`MessageSink`] the surface's host wires into its message
//! callback. Tests substitute in-memory surfaces; the `wry` feature
//! provides a real WebView backend.

use tokio::sync::mpsc;

/// Identifies one bound surface within the manager.
pub type SurfaceId = u64;

/// The shared, document-less surface created at startup.
pub const SHARED_SURFACE_ID: SurfaceId = 0;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SurfaceError(pub String);

impl From<SurfaceError> for glossa_common::BridgeError {
    fn from(err: SurfaceError) -> Self {
        glossa_common::BridgeError::Surface(err.0)
    }
}

/// A rendering context that can evaluate script expressions.
///
/// Submission is fire-and-forget; results come back asynchronously as
/// messages on the surface's sink.
pub trait ScriptSurface: Send {
    fn evaluate(&mut self, script: &str) -> Result<(), SurfaceError>;
}

/// A raw message string tagged with the surface it came from.
#[derive(Debug)]
pub(crate) struct Inbound {
    pub surface_id: SurfaceId,
    pub raw: String,
}

/// Posts raw surface messages into the manager loop.
///
/// Cloneable and callable from any thread; the surface host calls
/// [`MessageSink::post`] with each message string the surface emits.
#[derive(Debug, Clone)]
pub struct MessageSink {
    surface_id: SurfaceId,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl MessageSink {
    pub(crate) fn new(surface_id: SurfaceId, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { surface_id, tx }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// Deliver one raw message. Messages posted after the manager is gone
    /// are dropped.
    pub fn post(&self, raw: impl Into<String>) {
        let inbound = Inbound {
            surface_id: self.surface_id,
            raw: raw.into(),
        };
        if self.tx.send(inbound).is_err() {
            tracing::debug!(surface_id = self.surface_id, "bridge gone, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_tags_messages_with_its_surface() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = MessageSink::new(7, tx);
        sink.post("hello");

        let inbound = rx.try_recv().unwrap();
        assert_eq!(inbound.surface_id, 7);
        assert_eq!(inbound.raw, "hello");
    }

    #[test]
    fn post_after_manager_drop_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = MessageSink::new(1, tx);
        drop(rx);
        sink.post("late");
    }
}
