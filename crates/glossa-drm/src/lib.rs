//! DRM license fulfillment adapter.
//!
//! Wraps a vendor DRM service behind [`LicenseProvider`], exposing
//! asynchronous, cancellable fulfill / load-publication operations and
//! routing the vendor's passphrase requests to a [`PassphraseProvider`]
//! supplied by the host application. The cryptography itself is the
//! vendor's business; this crate only adapts its surface.

pub mod passphrase;
pub mod service;

pub use passphrase::{PassphraseProvider, PassphraseReason, PassphraseRequest};
pub use service::{FulfilledLicense, LicenseInfo, LicenseProvider, LicenseService, LICENSE_EXTENSION};
