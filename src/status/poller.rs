//! Periodic health polling bound to the authenticated session

use futures::future::join_all;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::probe::{default_probes, HealthIndicator, Probe, ProbeOutcome};
use crate::auth::{AuthGateway, SessionState};
use crate::render::SharedDocument;

/// Readiness gate: probes never run before the layout they write into exists
#[derive(Debug, Clone)]
pub struct LayoutGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for LayoutGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// A gate that is already open, for callers without a layout
    pub fn open() -> Self {
        let gate = Self::new();
        gate.mark_ready();
        gate
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait_ready(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for cannot fail while we hold it
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

pub struct StatusPoller {
    gateway: Arc<AuthGateway>,
    document: Option<SharedDocument>,
    probes: Vec<Probe>,
    interval: Duration,
    gate: LayoutGate,
    board: RwLock<HashMap<String, HealthIndicator>>,
}

impl StatusPoller {
    pub fn new(gateway: Arc<AuthGateway>, interval: Duration, gate: LayoutGate) -> Self {
        Self {
            gateway,
            document: None,
            probes: default_probes(),
            interval,
            gate,
            board: RwLock::new(HashMap::new()),
        }
    }

    /// Also write indicator text and class into this document
    pub fn with_document(mut self, document: SharedDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_probes(mut self, probes: Vec<Probe>) -> Self {
        self.probes = probes;
        self
    }

    pub fn gate(&self) -> &LayoutGate {
        &self.gate
    }

    /// Latest indicator state, in probe order
    pub fn indicators(&self) -> Vec<HealthIndicator> {
        let board = self.board.read();
        self.probes
            .iter()
            .filter_map(|p| board.get(p.element_id).cloned())
            .collect()
    }

    pub fn indicator(&self, element_id: &str) -> Option<HealthIndicator> {
        self.board.read().get(element_id).cloned()
    }

    /// Run every probe once.
    ///
    /// Probes start in declared order and complete in any order; each one
    /// handles its own failure. Skipped while the layout gate is closed.
    pub async fn tick(&self) -> bool {
        if !self.gate.is_ready() {
            debug!("Layout not ready, skipping status tick");
            return false;
        }
        join_all(self.probes.iter().map(|probe| self.run_probe(probe))).await;
        true
    }

    async fn run_probe(&self, probe: &Probe) {
        let outcome = self.fetch(probe).await;
        if let ProbeOutcome::Errored(reason) = &outcome {
            warn!(probe = probe.label, %reason, "Status probe errored");
        }
        let indicator = probe.evaluate(&outcome);
        self.apply(indicator);
    }

    async fn fetch(&self, probe: &Probe) -> ProbeOutcome {
        let response = match self.gateway.auth_fetch(Method::GET, probe.url).await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::Errored(e.to_string()),
        };
        if !response.status().is_success() {
            return ProbeOutcome::Answered {
                success: false,
                body: Value::Null,
            };
        }

        match response.json::<Value>().await {
            Ok(body) => ProbeOutcome::Answered {
                success: true,
                body,
            },
            Err(e) => ProbeOutcome::Errored(e.to_string()),
        }
    }

    fn apply(&self, indicator: HealthIndicator) {
        if let Some(document) = &self.document {
            let mut doc = document.lock();
            if let Some(node) = doc.by_id(&indicator.element_id) {
                doc.set_text(node, indicator.text.clone());
                doc.set_attr(node, "class", indicator.class.clone());
            }
        }
        self.board
            .write()
            .insert(indicator.element_id.clone(), indicator);
    }

    /// Poll while the session is authenticated.
    ///
    /// Each time the session becomes authenticated (boot or login) polling
    /// starts with an immediate tick once the layout gate is open; it stops as
    /// soon as the session drops, including after a 401 seen mid-poll.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let mut session = self.gateway.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                if session
                    .wait_for(|state| state.is_authenticated())
                    .await
                    .is_err()
                {
                    return;
                }
                self.gate.wait_ready().await;
                info!(interval = ?self.interval, "Status polling started");
                self.poll_while_authenticated(&mut session).await;
                info!("Status polling stopped");
            }
        });
        PollerHandle { handle }
    }

    async fn poll_while_authenticated(&self, session: &mut watch::Receiver<SessionState>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !session.borrow_and_update().is_authenticated() {
                return;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = session.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Handle to a spawned poller
pub struct PollerHandle {
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
