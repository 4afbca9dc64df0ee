//! Passphrase acquisition seam.

use async_trait::async_trait;

/// Why the vendor service is asking for a passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseReason {
    /// No stored passphrase matched the license.
    NotFound,
    /// A passphrase was supplied but rejected.
    Invalid,
}

/// One passphrase request from the vendor service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassphraseRequest {
    /// Hint text carried by the license, shown to the user.
    pub hint: String,
    pub reason: PassphraseReason,
}

/// Supplies user secrets when the vendor service asks for them.
///
/// Implemented by the host application (typically over a dialog).
/// Returning `None` abandons the operation.
#[async_trait]
pub trait PassphraseProvider: Send + Sync {
    async fn request_passphrase(&self, request: PassphraseRequest) -> Option<String>;
}
