//! Bridge between a reader application and its embedded language-learning
//! overlay.
//!
//! The overlay's logic lives in an opaque bundled script running inside a
//! hidden script-execution surface. This crate provides:
//! - One manager task owning the surface, session token, and language state
//! - Typed outbound commands with a centralized escaping encoder
//! - Callback correlation for asynchronous overlay replies
//! - Per-document attachment with language-change negotiation
//!
//! The `wry` feature adds a WebView-backed surface; everything else is
//! backend-agnostic and drives any [`surface::ScriptSurface`].

pub mod callbacks;
pub mod command;
pub mod escape;
pub mod manager;
pub mod protocol;
pub mod session;
pub mod state;
pub mod surface;

#[cfg(feature = "wry")]
pub mod wry_surface;

pub use manager::{BridgeConfig, BridgeHandle, BridgeManager};
pub use session::{DocumentSession, LanguageDecision, SessionFactory};
pub use surface::{MessageSink, ScriptSurface, SurfaceError, SurfaceId};
