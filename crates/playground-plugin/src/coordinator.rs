//! Asynchronous load coordination.
//!
//! The coordinator launches one task per plugin that needs loading and
//! collects their outcomes over a channel. Tasks never touch plugin state;
//! the owner of the [`PluginStateStore`] applies each completion through
//! [`LoadCoordinator::apply`], one at a time. A batch is settled when the
//! in-flight count returns to zero.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::PluginError;
use crate::handle::PluginHandle;
use crate::loader::RemoteLoader;
use crate::state::{LoadDelta, PluginStateStore};

/// Result of one load task.
#[derive(Debug)]
pub struct LoadCompletion {
    pub key: String,
    pub outcome: Result<PluginHandle, PluginError>,
    pub elapsed: Duration,
}

impl LoadCompletion {
    fn into_delta(self) -> (String, LoadDelta, Duration) {
        let delta = match self.outcome {
            Ok(handle) => LoadDelta::Loaded(handle),
            Err(e) => LoadDelta::Failed(e.to_string()),
        };
        (self.key, delta, self.elapsed)
    }
}

/// What a reconcile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Keys whose loads were started by this pass.
    pub launched: Vec<String>,
    /// Loads in flight after this pass, including earlier ones.
    pub in_flight: usize,
}

impl Reconciliation {
    /// Nothing is loading, so the caller may proceed immediately.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }
}

/// Outcome of applying a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// The in-flight count reached zero.
    Settled,
    Pending { in_flight: usize },
}

pub struct LoadCoordinator {
    loader: Arc<dyn RemoteLoader>,
    load_timeout: Duration,
    in_flight: usize,
    tx: mpsc::UnboundedSender<LoadCompletion>,
    rx: mpsc::UnboundedReceiver<LoadCompletion>,
}

impl std::fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("load_timeout", &self.load_timeout)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl LoadCoordinator {
    pub fn new(loader: Arc<dyn RemoteLoader>, load_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            loader,
            load_timeout,
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start a load for every enabled plugin that is not loaded or loading.
    ///
    /// Must be called from within a tokio runtime. Outcomes arrive later
    /// through [`next_completion`](Self::next_completion), never inline.
    pub fn reconcile(&mut self, store: &mut PluginStateStore) -> Reconciliation {
        let mut launched = Vec::new();

        for key in store.needs_load() {
            let descriptor = match store.begin_load(&key) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(plugin = %key, error = %e, "could not start plugin load");
                    continue;
                }
            };

            self.in_flight += 1;
            let loader = Arc::clone(&self.loader);
            let tx = self.tx.clone();
            let timeout = self.load_timeout;
            let task_key = key.clone();

            tokio::spawn(async move {
                let started = Instant::now();
                let mut load = tokio::spawn(async move { loader.load(&descriptor).await });
                let outcome = match tokio::time::timeout(timeout, &mut load).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_error)) => Err(PluginError::LoadAborted {
                        plugin: task_key.clone(),
                        reason: join_error.to_string(),
                    }),
                    Err(_) => {
                        load.abort();
                        Err(PluginError::Timeout(task_key.clone()))
                    }
                };
                // The receiver lives as long as the coordinator; a send error
                // only means it was dropped and nobody is waiting.
                let _ = tx.send(LoadCompletion {
                    key: task_key,
                    outcome,
                    elapsed: started.elapsed(),
                });
            });

            tracing::debug!(plugin = %key, in_flight = self.in_flight, "plugin load launched");
            launched.push(key);
        }

        Reconciliation {
            launched,
            in_flight: self.in_flight,
        }
    }

    /// Wait for the next completion, or `None` if nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<LoadCompletion> {
        if self.in_flight == 0 {
            return None;
        }
        self.rx.recv().await
    }

    /// Apply one completion to the store and report whether the batch settled.
    pub fn apply(&mut self, store: &mut PluginStateStore, completion: LoadCompletion) -> Settle {
        self.in_flight = self.in_flight.saturating_sub(1);
        let (key, delta, elapsed) = completion.into_delta();
        let elapsed_ms = elapsed.as_millis() as u64;

        match &delta {
            LoadDelta::Loaded(handle) => {
                tracing::info!(plugin = %key, size = handle.size(), elapsed_ms, "plugin loaded");
            }
            LoadDelta::Failed(reason) => {
                tracing::warn!(plugin = %key, reason = %reason, elapsed_ms, "plugin load failed");
            }
        }

        if let Err(e) = store.apply(&key, delta) {
            tracing::warn!(plugin = %key, error = %e, "dropping load result");
        }

        if self.in_flight == 0 {
            tracing::info!("plugin loads settled");
            Settle::Settled
        } else {
            Settle::Pending {
                in_flight: self.in_flight,
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
