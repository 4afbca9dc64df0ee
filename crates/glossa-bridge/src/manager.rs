//! Bridge session manager.
//!
//! `BridgeManager::spawn` starts one long-lived task owning every piece of
//! shared state: the session token, the negotiated language, the pending
//! callback table, and all bound surfaces. Dependents hold a cloneable
//! [`BridgeHandle`]; commands and surface messages flow into the task over
//! channels, so all state access happens on one cooperative context and
//! needs no locks.
//!
//! Overlapping settings updates are serialized: at most one is in flight,
//! later requests queue FIFO behind it.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use glossa_common::{new_callback_id, BridgeError, DocumentKey, DocumentMetadata};

use crate::callbacks::{CallbackRegistry, CallbackReply};
use crate::command::Command;
use crate::protocol::ScriptMessage;
use crate::session::{LanguageChangedHook, LanguageDecision, LanguageNegotiator, SessionFactory};
use crate::state::SessionState;
use crate::surface::{Inbound, MessageSink, ScriptSurface, SurfaceError, SurfaceId, SHARED_SURFACE_ID};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Configuration for spawning the bridge manager.
pub struct BridgeConfig {
    app_id: String,
    response_timeout: Duration,
    sweep_interval: Duration,
    negotiator: Option<Arc<LanguageNegotiator>>,
    language_changed: Option<Arc<LanguageChangedHook>>,
}

impl BridgeConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            response_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5),
            negotiator: None,
            language_changed: None,
        }
    }

    /// How long an unanswered command may stay pending before it resolves
    /// to [`BridgeError::Timeout`].
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Hook consulted before attaching a document whose language differs
    /// from the last negotiated one.
    pub fn with_negotiator(
        mut self,
        negotiator: impl Fn(&DocumentMetadata) -> LanguageDecision + Send + Sync + 'static,
    ) -> Self {
        self.negotiator = Some(Arc::new(negotiator));
        self
    }

    /// Hook observing the settlement of negotiation-initiated updates.
    pub fn with_language_changed(
        mut self,
        hook: impl Fn(Result<String, BridgeError>) + Send + Sync + 'static,
    ) -> Self {
        self.language_changed = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("app_id", &self.app_id)
            .field("response_timeout", &self.response_timeout)
            .field("sweep_interval", &self.sweep_interval)
            .field("negotiator", &self.negotiator.is_some())
            .field("language_changed", &self.language_changed.is_some())
            .finish()
    }
}

/// Commands sent from handles into the manager task.
pub(crate) enum BridgeCommand {
    SignIn {
        email: String,
        password: String,
        new_account: bool,
        reply: oneshot::Sender<Result<String, BridgeError>>,
    },
    FetchSettings {
        reply: oneshot::Sender<Result<String, BridgeError>>,
    },
    UpdateSettings {
        target_lang: String,
        source_lang: String,
        level: String,
        internal: bool,
        reply: Option<oneshot::Sender<Result<String, BridgeError>>>,
    },
    Attach {
        meta: DocumentMetadata,
        reply: oneshot::Sender<Option<DocumentKey>>,
    },
    Bind {
        document_key: DocumentKey,
        surface: Box<dyn ScriptSurface>,
        reply: oneshot::Sender<SurfaceId>,
    },
    Detach {
        surface_id: SurfaceId,
    },
}

/// Handle for interacting with the bridge manager.
///
/// All methods are non-blocking; completion arrives once the overlay
/// answers (or the pending entry is evicted).
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    command_tx: mpsc::Sender<BridgeCommand>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
}

impl BridgeHandle {
    /// Sign in with credentials, optionally creating a new account.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        new_account: bool,
    ) -> Result<(), BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::SignIn {
            email: email.to_string(),
            password: password.to_string(),
            new_account,
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| BridgeError::Closed)??;
        Ok(())
    }

    /// Fetch the user's overlay settings as the raw blob the overlay
    /// reports.
    pub async fn fetch_settings(&self) -> Result<String, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::FetchSettings { reply: tx }).await?;
        rx.await.map_err(|_| BridgeError::Closed)?
    }

    /// Update target/source language and level. Empty fields leave the
    /// corresponding setting unchanged. Updates are serialized; an update
    /// issued while another is in flight waits its turn.
    pub async fn update_settings(
        &self,
        target_lang: &str,
        source_lang: &str,
        level: &str,
    ) -> Result<String, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::UpdateSettings {
            target_lang: target_lang.to_string(),
            source_lang: source_lang.to_string(),
            level: level.to_string(),
            internal: false,
            reply: Some(tx),
        })
        .await?;
        rx.await.map_err(|_| BridgeError::Closed)?
    }

    /// Produce a factory for attaching `meta`'s document once its surface
    /// exists. No negotiation is performed.
    pub fn attachment(&self, meta: &DocumentMetadata) -> SessionFactory {
        SessionFactory::new(self.clone(), meta.document_key())
    }

    /// Like [`BridgeHandle::attachment`], but first negotiates a language
    /// change when the document's primary language differs from the last
    /// negotiated one. Returns `None` when the negotiation hook vetoes the
    /// attachment. The negotiated settings update settles asynchronously,
    /// after this call returns.
    pub async fn attachment_negotiated(
        &self,
        meta: &DocumentMetadata,
    ) -> Result<Option<SessionFactory>, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeCommand::Attach {
            meta: meta.clone(),
            reply: tx,
        })
        .await?;
        let key = rx.await.map_err(|_| BridgeError::Closed)?;
        Ok(key.map(|key| SessionFactory::new(self.clone(), key)))
    }

    pub(crate) async fn send(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| BridgeError::Closed)
    }

    pub(crate) fn sink(&self, surface_id: SurfaceId) -> MessageSink {
        MessageSink::new(surface_id, self.inbound_tx.clone())
    }

    pub(crate) fn detach(&self, surface_id: SurfaceId) {
        // Best effort; the manager may already be gone.
        let _ = self
            .command_tx
            .try_send(BridgeCommand::Detach { surface_id });
    }
}

/// Spawns the manager task.
pub struct BridgeManager;

impl BridgeManager {
    /// Start the manager with its shared, document-less surface.
    ///
    /// Returns the handle and the sink the shared surface's host must wire
    /// into its message callback. The task runs until every handle and
    /// session is dropped.
    pub fn spawn(
        config: BridgeConfig,
        shared_surface: Box<dyn ScriptSurface>,
    ) -> (BridgeHandle, MessageSink) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let handle = BridgeHandle {
            command_tx,
            inbound_tx,
        };
        let shared_sink = handle.sink(SHARED_SURFACE_ID);

        let mut surfaces = HashMap::new();
        surfaces.insert(
            SHARED_SURFACE_ID,
            SurfaceBinding {
                surface: shared_surface,
                document_key: DocumentKey::shared(),
            },
        );

        let bridge_loop = BridgeLoop {
            config,
            state: SessionState::new(),
            callbacks: CallbackRegistry::new(),
            surfaces,
            pending_starts: Vec::new(),
            in_flight_update: None,
            queued_updates: VecDeque::new(),
            next_surface_id: SHARED_SURFACE_ID + 1,
        };
        tokio::spawn(bridge_loop.run(command_rx, inbound_rx));

        (handle, shared_sink)
    }
}

struct SurfaceBinding {
    surface: Box<dyn ScriptSurface>,
    document_key: DocumentKey,
}

struct InFlightUpdate {
    callback_id: String,
    target_lang: String,
    internal: bool,
    reply: Option<oneshot::Sender<Result<String, BridgeError>>>,
    issued_at: Instant,
}

struct UpdateRequest {
    target_lang: String,
    source_lang: String,
    level: String,
    internal: bool,
    reply: Option<oneshot::Sender<Result<String, BridgeError>>>,
}

struct BridgeLoop {
    config: BridgeConfig,
    state: SessionState,
    callbacks: CallbackRegistry,
    surfaces: HashMap<SurfaceId, SurfaceBinding>,
    /// Surfaces whose `ready:` arrived while start was gated.
    pending_starts: Vec<SurfaceId>,
    in_flight_update: Option<InFlightUpdate>,
    queued_updates: VecDeque<UpdateRequest>,
    next_surface_id: SurfaceId,
}

impl BridgeLoop {
    async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<BridgeCommand>,
        mut inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    ) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        loop {
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                inbound = inbound_rx.recv() => match inbound {
                    Some(inbound) => self.handle_inbound(inbound),
                    None => break,
                },
                _ = sweep.tick() => self.sweep(),
            }
        }
        debug!("bridge manager stopped");
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    fn handle_command(&mut self, command: BridgeCommand) {
        match command {
            BridgeCommand::SignIn {
                email,
                password,
                new_account,
                reply,
            } => {
                let command = Command::SignIn {
                    token: String::new(),
                    email,
                    password,
                    app_id: self.config.app_id.clone(),
                    document_key: String::new(),
                    new_account: Some(new_account),
                };
                self.issue_with_callback(command, reply);
            }
            BridgeCommand::FetchSettings { reply } => {
                self.issue_with_callback(Command::FetchSettings, reply);
            }
            BridgeCommand::UpdateSettings {
                target_lang,
                source_lang,
                level,
                internal,
                reply,
            } => {
                self.enqueue_update(UpdateRequest {
                    target_lang,
                    source_lang,
                    level,
                    internal,
                    reply,
                });
            }
            BridgeCommand::Attach { meta, reply } => self.handle_attach(meta, reply),
            BridgeCommand::Bind {
                document_key,
                surface,
                reply,
            } => {
                let surface_id = self.next_surface_id;
                self.next_surface_id += 1;
                self.surfaces.insert(
                    surface_id,
                    SurfaceBinding {
                        surface,
                        document_key: document_key.clone(),
                    },
                );
                debug!(surface_id, document_key = %document_key, "surface bound");
                let _ = reply.send(surface_id);
            }
            BridgeCommand::Detach { surface_id } => {
                if self.surfaces.remove(&surface_id).is_some() {
                    debug!(surface_id, "surface detached");
                }
                self.pending_starts.retain(|id| *id != surface_id);
            }
        }
    }

    /// Register a one-shot continuation and submit a command on the shared
    /// surface. Submission failure resolves the continuation immediately.
    fn issue_with_callback(
        &mut self,
        command: Command,
        reply: oneshot::Sender<Result<String, BridgeError>>,
    ) {
        let callback_id = self.callbacks.register(reply);
        let script = command.encode(&callback_id);
        if let Err(err) = self.evaluate_on(SHARED_SURFACE_ID, &script) {
            warn!(error = %err, "command submission failed");
            if let Some(tx) = self.callbacks.withdraw(&callback_id) {
                let _ = tx.send(Err(err.into()));
            }
        }
    }

    fn handle_attach(&mut self, meta: DocumentMetadata, reply: oneshot::Sender<Option<DocumentKey>>) {
        let document_key = meta.document_key();
        let lang = meta.primary_subtag().to_string();
        if !lang.is_empty() && lang != self.state.current_lang {
            let decision = match &self.config.negotiator {
                Some(negotiator) => negotiator(&meta),
                None => LanguageDecision::default(),
            };
            if !decision.proceed {
                debug!(document_key = %document_key, "attachment vetoed by negotiator");
                let _ = reply.send(None);
                return;
            }
            let target_lang = if decision.target_lang.is_empty() {
                lang
            } else {
                decision.target_lang
            };
            self.enqueue_update(UpdateRequest {
                target_lang,
                source_lang: decision.source_lang,
                level: String::new(),
                internal: true,
                reply: None,
            });
        }
        let _ = reply.send(Some(document_key));
    }

    // ------------------------------------------------------------------
    // Settings updates (serialized, FIFO)
    // ------------------------------------------------------------------

    fn enqueue_update(&mut self, request: UpdateRequest) {
        if self.in_flight_update.is_some() {
            debug!(queued = self.queued_updates.len() + 1, "settings update queued");
            self.queued_updates.push_back(request);
        } else {
            self.issue_update(request);
        }
    }

    fn issue_update(&mut self, request: UpdateRequest) {
        let UpdateRequest {
            target_lang,
            source_lang,
            level,
            internal,
            reply,
        } = request;
        let callback_id = new_callback_id();
        let script = Command::UpdateSettings {
            target_lang: target_lang.clone(),
            source_lang,
            level,
        }
        .encode(&callback_id);

        if !target_lang.is_empty() {
            self.state.updating = true;
        }
        if internal {
            self.state.updating_internal = true;
        }
        self.in_flight_update = Some(InFlightUpdate {
            callback_id,
            target_lang,
            internal,
            reply,
            issued_at: Instant::now(),
        });

        if let Err(err) = self.evaluate_on(SHARED_SURFACE_ID, &script) {
            warn!(error = %err, "settings update submission failed");
            self.settle_update(Err(err.into()));
        }
    }

    /// Resolve the in-flight update: clear progress flags, memoize the
    /// language on success, notify the caller or the language-changed hook,
    /// and re-drive anything the update was gating.
    fn settle_update(&mut self, outcome: Result<String, BridgeError>) {
        let Some(update) = self.in_flight_update.take() else {
            return;
        };
        self.state.updating = false;
        if update.internal {
            self.state.updating_internal = false;
        }
        if outcome.is_ok() && !update.target_lang.is_empty() {
            self.state.current_lang = update.target_lang;
        }
        match update.reply {
            Some(reply) => {
                let _ = reply.send(outcome);
            }
            None => {
                if let Some(hook) = &self.config.language_changed {
                    hook(outcome);
                }
            }
        }
        self.try_pending_starts();
        if self.in_flight_update.is_none() {
            if let Some(next) = self.queued_updates.pop_front() {
                self.issue_update(next);
            }
        }
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    fn handle_inbound(&mut self, inbound: Inbound) {
        let Some(message) = ScriptMessage::parse(&inbound.raw) else {
            debug!(surface_id = inbound.surface_id, "unrecognized surface message dropped");
            return;
        };
        match message {
            ScriptMessage::Ready => self.handle_ready(inbound.surface_id),
            ScriptMessage::Token {
                callback_id,
                token,
                error,
            } => {
                self.state.store_token(token.clone());
                if !callback_id.is_empty() {
                    self.dispatch_callback(&callback_id, CallbackReply {
                        result: token,
                        error,
                    });
                }
                self.try_pending_starts();
            }
            ScriptMessage::Callback {
                callback_id,
                result,
                error,
            } => {
                self.dispatch_callback(&callback_id, CallbackReply { result, error });
            }
        }
    }

    fn dispatch_callback(&mut self, callback_id: &str, reply: CallbackReply) {
        let matches_update = self
            .in_flight_update
            .as_ref()
            .is_some_and(|update| update.callback_id == callback_id);
        if matches_update {
            self.settle_update(reply.into_result());
        } else if !self.callbacks.fire(callback_id, reply) {
            debug!(callback_id = %callback_id, "unmatched callback reply dropped");
        }
    }

    // ------------------------------------------------------------------
    // Session start
    // ------------------------------------------------------------------

    fn handle_ready(&mut self, surface_id: SurfaceId) {
        if self.state.ready_for_start() {
            self.issue_start(surface_id);
        } else if !self.pending_starts.contains(&surface_id) {
            debug!(surface_id, "session start parked until ready");
            self.pending_starts.push(surface_id);
        }
    }

    /// Issue the sign-in for one surface. A surface with an empty document
    /// key is the shared binding; its start marks the token stale so the
    /// next attachment forces reacquisition.
    fn issue_start(&mut self, surface_id: SurfaceId) {
        let Some(binding) = self.surfaces.get(&surface_id) else {
            debug!(surface_id, "start for unbound surface dropped");
            return;
        };
        let document_key = binding.document_key.clone();
        if document_key.is_empty() {
            self.state.invalidate_token();
        }
        let script = Command::SignIn {
            token: self.state.token.clone(),
            email: String::new(),
            password: String::new(),
            app_id: self.config.app_id.clone(),
            document_key: document_key.as_str().to_string(),
            new_account: None,
        }
        .encode("");
        debug!(surface_id, document_key = %document_key, "session start");
        if let Err(err) = self.evaluate_on(surface_id, &script) {
            warn!(surface_id, error = %err, "session start submission failed");
        }
    }

    /// Re-drive parked starts after a readiness predicate flipped.
    fn try_pending_starts(&mut self) {
        if self.pending_starts.is_empty() || !self.state.ready_for_start() {
            return;
        }
        let parked = std::mem::take(&mut self.pending_starts);
        for surface_id in parked {
            if self.state.ready_for_start() {
                self.issue_start(surface_id);
            } else {
                self.pending_starts.push(surface_id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    fn evaluate_on(&mut self, surface_id: SurfaceId, script: &str) -> Result<(), SurfaceError> {
        match self.surfaces.get_mut(&surface_id) {
            Some(binding) => binding.surface.evaluate(script),
            None => Err(SurfaceError(format!("no surface {surface_id}"))),
        }
    }

    fn sweep(&mut self) {
        let evicted = self.callbacks.evict_expired(self.config.response_timeout);
        if evicted > 0 {
            warn!(count = evicted, "expired pending callbacks evicted");
        }
        let update_expired = self
            .in_flight_update
            .as_ref()
            .is_some_and(|update| update.issued_at.elapsed() > self.config.response_timeout);
        if update_expired {
            warn!("settings update timed out");
            self.settle_update(Err(BridgeError::Timeout));
        }
    }
}
