//! WebView-backed script surface.
//!
//! Loads the bundled overlay page into a `wry` WebView, injects the
//! overlay script together with a bootstrap shim that exposes the
//! message-posting entry point, and forwards every posted message into the
//! bridge's [`MessageSink`].

use std::path::Path;

use wry::raw_window_handle;
use wry::{WebView, WebViewBuilder};

use crate::surface::{MessageSink, ScriptSurface, SurfaceError};

/// File name of the bundled overlay page.
pub const OVERLAY_PAGE: &str = "poly-core.html";
/// File name of the bundled overlay script.
pub const OVERLAY_SCRIPT: &str = "poly-core.js";

/// JavaScript shim giving the overlay script its message-posting entry
/// point. Injected ahead of the overlay script itself.
pub const CHANNEL_BOOTSTRAP: &str = r#"
(function() {
    window.glossa = window.glossa || {};
    window.glossa.post = function(channel, body) {
        window.ipc.postMessage(JSON.stringify({ channel: channel, body: body }));
    };
})();
"#;

/// The two bundled overlay resources, resolved and loaded up front.
///
/// Their presence is a packaging invariant; resolution fails once at
/// startup rather than surfacing later as silent overlay breakage.
#[derive(Debug, Clone)]
pub struct OverlayAssets {
    page_url: String,
    script: String,
}

impl OverlayAssets {
    pub fn load(assets_dir: &Path) -> Result<Self, SurfaceError> {
        let page = assets_dir.join(OVERLAY_PAGE);
        if !page.is_file() {
            return Err(SurfaceError(format!(
                "missing overlay page: {}",
                page.display()
            )));
        }
        let script_path = assets_dir.join(OVERLAY_SCRIPT);
        let script = std::fs::read_to_string(&script_path).map_err(|err| {
            SurfaceError(format!(
                "missing overlay script {}: {err}",
                script_path.display()
            ))
        })?;
        Ok(Self {
            page_url: format!("file://{}", page.display()),
            script,
        })
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }
}

/// A `wry` WebView driving one overlay instance.
pub struct WrySurface {
    webview: WebView,
}

impl WrySurface {
    /// Build a WebView as a child of `window`, wire its IPC into `sink`,
    /// and load the overlay.
    pub fn attach<W: raw_window_handle::HasWindowHandle>(
        window: &W,
        assets: &OverlayAssets,
        sink: MessageSink,
    ) -> Result<Self, SurfaceError> {
        let bootstrap = format!("{CHANNEL_BOOTSTRAP}\n{}", assets.script);
        let webview = WebViewBuilder::new()
            .with_initialization_script(&bootstrap)
            .with_url(&assets.page_url)
            .with_focused(false)
            .with_ipc_handler(move |request| {
                sink.post(request.body().to_string());
            })
            .build_as_child(window)
            .map_err(|err| SurfaceError(err.to_string()))?;
        Ok(Self { webview })
    }

    /// Hide or show the WebView. The shared overlay surface stays hidden
    /// for its whole life.
    pub fn set_visible(&self, visible: bool) -> Result<(), SurfaceError> {
        self.webview
            .set_visible(visible)
            .map_err(|err| SurfaceError(err.to_string()))
    }

    pub fn inner(&self) -> &WebView {
        &self.webview
    }
}

impl ScriptSurface for WrySurface {
    fn evaluate(&mut self, script: &str) -> Result<(), SurfaceError> {
        self.webview
            .evaluate_script(script)
            .map_err(|err| SurfaceError(err.to_string()))
    }
}
