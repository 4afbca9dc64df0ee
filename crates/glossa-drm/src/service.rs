//! The license service adapter over the vendor seam.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use glossa_common::DrmError;

use crate::passphrase::PassphraseProvider;

/// Extension of license documents this service can fulfill.
pub const LICENSE_EXTENSION: &str = "lcpl";

/// A fulfilled license: the locally materialized publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfilledLicense {
    pub local_path: PathBuf,
}

/// License state attached to an opened publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseInfo {
    pub profile: String,
}

/// The vendor DRM service seam.
///
/// Both operations may call back into the passphrase provider any number
/// of times (retry on invalid input is the vendor's policy).
#[async_trait]
pub trait LicenseProvider: Send + Sync {
    async fn import_license(
        &self,
        license_file: &Path,
        passphrase: &dyn PassphraseProvider,
    ) -> Result<FulfilledLicense, DrmError>;

    async fn open_license(
        &self,
        publication: &Path,
        passphrase: &dyn PassphraseProvider,
    ) -> Result<LicenseInfo, DrmError>;
}

/// Fulfills license documents and loads protected publications.
pub struct LicenseService<P> {
    provider: P,
    passphrase: Arc<dyn PassphraseProvider>,
}

impl<P: LicenseProvider> LicenseService<P> {
    pub fn new(provider: P, passphrase: Arc<dyn PassphraseProvider>) -> Self {
        Self {
            provider,
            passphrase,
        }
    }

    /// Whether `file` is a license document this service handles.
    pub fn can_fulfill(&self, file: &Path) -> bool {
        file.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(LICENSE_EXTENSION))
            .unwrap_or(false)
    }

    /// Exchange a license document for a locally materialized publication.
    pub async fn fulfill(
        &self,
        license_file: &Path,
        cancel: &CancellationToken,
    ) -> Result<FulfilledLicense, DrmError> {
        if !self.can_fulfill(license_file) {
            return Err(DrmError::Unsupported(license_file.display().to_string()));
        }
        debug!(file = %license_file.display(), "fulfilling license");
        tokio::select! {
            _ = cancel.cancelled() => Err(DrmError::Cancelled),
            result = self.provider.import_license(license_file, self.passphrase.as_ref()) => result,
        }
    }

    /// Open the license inside a protected publication.
    pub async fn load_publication(
        &self,
        publication: &Path,
        cancel: &CancellationToken,
    ) -> Result<LicenseInfo, DrmError> {
        debug!(file = %publication.display(), "opening license");
        tokio::select! {
            _ = cancel.cancelled() => Err(DrmError::Cancelled),
            result = self.provider.open_license(publication, self.passphrase.as_ref()) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passphrase::{PassphraseReason, PassphraseRequest};
    use std::time::Duration;

    /// Provider that hands back a fixed secret, or declines.
    struct StaticPassphrase(Option<String>);

    #[async_trait]
    impl PassphraseProvider for StaticPassphrase {
        async fn request_passphrase(&self, _request: PassphraseRequest) -> Option<String> {
            self.0.clone()
        }
    }

    /// Vendor stub that unlocks with one expected passphrase.
    struct MockVendor {
        expected_passphrase: String,
        delay: Duration,
    }

    impl MockVendor {
        fn new(expected_passphrase: &str) -> Self {
            Self {
                expected_passphrase: expected_passphrase.into(),
                delay: Duration::ZERO,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        async fn unlock(&self, passphrase: &dyn PassphraseProvider) -> Result<(), DrmError> {
            tokio::time::sleep(self.delay).await;
            let request = PassphraseRequest {
                hint: "your library card number".into(),
                reason: PassphraseReason::NotFound,
            };
            match passphrase.request_passphrase(request).await {
                None => Err(DrmError::Cancelled),
                Some(secret) if secret == self.expected_passphrase => Ok(()),
                Some(_) => Err(DrmError::Vendor("invalid passphrase".into())),
            }
        }
    }

    #[async_trait]
    impl LicenseProvider for MockVendor {
        async fn import_license(
            &self,
            license_file: &Path,
            passphrase: &dyn PassphraseProvider,
        ) -> Result<FulfilledLicense, DrmError> {
            self.unlock(passphrase).await?;
            Ok(FulfilledLicense {
                local_path: license_file.with_extension("epub"),
            })
        }

        async fn open_license(
            &self,
            _publication: &Path,
            passphrase: &dyn PassphraseProvider,
        ) -> Result<LicenseInfo, DrmError> {
            self.unlock(passphrase).await?;
            Ok(LicenseInfo {
                profile: "1.0".into(),
            })
        }
    }

    fn service(vendor: MockVendor, secret: Option<&str>) -> LicenseService<MockVendor> {
        LicenseService::new(
            vendor,
            Arc::new(StaticPassphrase(secret.map(str::to_string))),
        )
    }

    #[test]
    fn can_fulfill_matches_extension_case_insensitively() {
        let svc = service(MockVendor::new("x"), None);
        assert!(svc.can_fulfill(Path::new("book.lcpl")));
        assert!(svc.can_fulfill(Path::new("book.LCPL")));
        assert!(!svc.can_fulfill(Path::new("book.epub")));
        assert!(!svc.can_fulfill(Path::new("book")));
    }

    #[tokio::test]
    async fn fulfill_rejects_unsupported_files() {
        let svc = service(MockVendor::new("x"), Some("x"));
        let err = svc
            .fulfill(Path::new("book.epub"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DrmError::Unsupported(path) if path == "book.epub"));
    }

    #[tokio::test]
    async fn fulfill_materializes_publication() {
        let svc = service(MockVendor::new("s3cret"), Some("s3cret"));
        let fulfilled = svc
            .fulfill(Path::new("book.lcpl"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fulfilled.local_path, PathBuf::from("book.epub"));
    }

    #[tokio::test]
    async fn load_publication_returns_license_info() {
        let svc = service(MockVendor::new("s3cret"), Some("s3cret"));
        let info = svc
            .load_publication(Path::new("book.epub"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(info.profile, "1.0");
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_slow_vendor() {
        let vendor = MockVendor::new("s3cret").slow(Duration::from_secs(30));
        let svc = service(vendor, Some("s3cret"));
        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            async move { svc.fulfill(Path::new("book.lcpl"), &cancel).await }
        };
        let task = tokio::spawn(task);
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn declined_passphrase_cancels_the_operation() {
        let svc = service(MockVendor::new("s3cret"), None);
        let err = svc
            .fulfill(Path::new("book.lcpl"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn wrong_passphrase_surfaces_vendor_error() {
        let svc = service(MockVendor::new("s3cret"), Some("wrong"));
        let err = svc
            .fulfill(Path::new("book.lcpl"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DrmError::Vendor(msg) if msg == "invalid passphrase"));
    }
}
