//! Drives the bridge against a scripted in-process surface, playing the
//! overlay's side of the protocol by hand. Run with:
//!
//! ```sh
//! cargo run -p glossa-bridge --example headless
//! ```

use std::sync::mpsc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use glossa_bridge::{BridgeConfig, BridgeManager, ScriptSurface, SurfaceError};
use glossa_common::DocumentMetadata;

/// Records every evaluated script so the demo can answer it.
struct ScriptedSurface {
    tx: mpsc::Sender<String>,
}

impl ScriptSurface for ScriptedSurface {
    fn evaluate(&mut self, script: &str) -> Result<(), SurfaceError> {
        tracing::info!(%script, "overlay call");
        let _ = self.tx.send(script.to_string());
        Ok(())
    }
}

fn envelope(body: &str) -> String {
    serde_json::json!({ "channel": "lingVisSDK", "body": body }).to_string()
}

fn callback_id_of(script: &str) -> String {
    script.split('\'').nth(1).unwrap_or_default().to_string()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("glossa_bridge=debug".parse().expect("valid directive"))
                .add_directive("headless=info".parse().expect("valid directive")),
        )
        .init();

    let (script_tx, script_rx) = mpsc::channel();
    let (handle, shared_sink) = BridgeManager::spawn(
        BridgeConfig::new("demo-reader"),
        Box::new(ScriptedSurface { tx: script_tx }),
    );

    // The overlay comes up; session start runs and a token is issued.
    shared_sink.post(envelope("ready:"));
    let start = script_rx.recv().expect("session start");
    tracing::info!(%start, "overlay received session start");
    shared_sink.post(envelope("token:|demo-token|"));

    // Fetch settings, answering on the overlay's behalf.
    let fetch = tokio::spawn({
        let handle = handle.clone();
        async move { handle.fetch_settings().await }
    });
    let script = script_rx.recv().expect("settings fetch");
    let cb = callback_id_of(&script);
    shared_sink.post(envelope(&format!("callback:{cb}|{{\"l2\":\"fr\"}}|")));
    let settings = fetch.await.expect("join").expect("settings");
    tracing::info!(%settings, "settings fetched");

    // Attach a document; negotiation issues a settings update first.
    let meta = DocumentMetadata::new("Bel-Ami")
        .with_identifier("urn:isbn:9782070402687")
        .with_language("fr-FR");
    let factory = handle
        .attachment_negotiated(&meta)
        .await
        .expect("bridge alive")
        .expect("not vetoed");
    let script = script_rx.recv().expect("negotiation update");
    let cb = callback_id_of(&script);
    shared_sink.post(envelope(&format!("callback:{cb}|ok|")));
    tracing::info!(document_key = %factory.document_key(), "attachment ready");

    tokio::time::sleep(Duration::from_millis(50)).await;
}
