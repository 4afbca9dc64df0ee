//! Per-document attachment: factories, sessions, and language negotiation.

use tokio::sync::oneshot;

use glossa_common::{BridgeError, DocumentKey, DocumentMetadata};

use crate::manager::{BridgeCommand, BridgeHandle};
use crate::surface::{MessageSink, ScriptSurface, SurfaceId};

/// Outcome of the language-change negotiation hook.
///
/// Empty language fields keep the values derived from the document;
/// `proceed = false` vetoes the attachment entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageDecision {
    pub target_lang: String,
    pub source_lang: String,
    pub proceed: bool,
}

impl Default for LanguageDecision {
    fn default() -> Self {
        Self {
            target_lang: String::new(),
            source_lang: String::new(),
            proceed: true,
        }
    }
}

impl LanguageDecision {
    /// Accept the document's own language pair.
    pub fn accept() -> Self {
        Self::default()
    }

    /// Refuse the attachment; no settings update is issued.
    pub fn veto() -> Self {
        Self {
            proceed: false,
            ..Self::default()
        }
    }

    pub fn with_target_lang(mut self, lang: impl Into<String>) -> Self {
        self.target_lang = lang.into();
        self
    }

    pub fn with_source_lang(mut self, lang: impl Into<String>) -> Self {
        self.source_lang = lang.into();
        self
    }
}

/// Consulted when a document's language differs from the last negotiated
/// one. May veto the attachment or override the language pair.
pub type LanguageNegotiator = dyn Fn(&DocumentMetadata) -> LanguageDecision + Send + Sync;

/// Observes the settlement of a negotiation-initiated settings update.
pub type LanguageChangedHook = dyn Fn(Result<String, BridgeError>) + Send + Sync;

/// Deferred constructor for a document-bound session.
///
/// Attachment is decided before the caller's rendering pipeline has built
/// the document's surface; the factory carries the composite document key
/// until [`SessionFactory::bind`] is handed the surface.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    handle: BridgeHandle,
    document_key: DocumentKey,
}

impl SessionFactory {
    pub(crate) fn new(handle: BridgeHandle, document_key: DocumentKey) -> Self {
        Self {
            handle,
            document_key,
        }
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.document_key
    }

    /// Bind a freshly created surface, registering it with the manager.
    pub async fn bind(self, surface: Box<dyn ScriptSurface>) -> Result<DocumentSession, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(BridgeCommand::Bind {
                document_key: self.document_key.clone(),
                surface,
                reply: tx,
            })
            .await?;
        let surface_id = rx.await.map_err(|_| BridgeError::Closed)?;
        Ok(DocumentSession {
            surface_id,
            document_key: self.document_key,
            sink: self.handle.sink(surface_id),
            handle: self.handle,
        })
    }
}

/// A live binding between one rendering surface and one document.
///
/// Dropping the session detaches the surface from the manager; there is no
/// explicit teardown call.
#[derive(Debug)]
pub struct DocumentSession {
    surface_id: SurfaceId,
    document_key: DocumentKey,
    sink: MessageSink,
    handle: BridgeHandle,
}

impl DocumentSession {
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.document_key
    }

    /// The sink the surface host wires into its message callback.
    pub fn sink(&self) -> MessageSink {
        self.sink.clone()
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        self.handle.detach(self.surface_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_decision_proceeds_without_overrides() {
        let decision = LanguageDecision::default();
        assert!(decision.proceed);
        assert!(decision.target_lang.is_empty());
        assert!(decision.source_lang.is_empty());
    }

    #[test]
    fn veto_does_not_proceed() {
        assert!(!LanguageDecision::veto().proceed);
    }

    #[test]
    fn builder_overrides_language_pair() {
        let decision = LanguageDecision::accept()
            .with_target_lang("fr")
            .with_source_lang("en");
        assert!(decision.proceed);
        assert_eq!(decision.target_lang, "fr");
        assert_eq!(decision.source_lang, "en");
    }
}
