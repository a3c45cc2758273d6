//! Wiring of both sync directions with a shared shutdown.

use std::sync::Arc;
use std::time::Duration;

use calscope_resolver::ScopeIntent;
use calscope_settings::SyncSettings;
use calscope_store::ScopeStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::inbound::inbound_task;
use crate::outbound::{WrittenParams, outbound_task};
use crate::query::QueryCodec;
use crate::router::Router;

/// Synchronizer configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period before a batch is written.
    pub debounce: Duration,
    /// Upper bound for [`SyncHandle::shutdown`].
    pub shutdown_timeout: Duration,
    /// Parameter names and delimiter.
    pub codec: QueryCodec,
}

impl SyncConfig {
    /// Build from sync settings.
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            debounce: settings.debounce(),
            shutdown_timeout: Duration::from_millis(settings.shutdown_timeout_ms),
            codec: QueryCodec::from_settings(settings),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

/// Entry point of the URL Query Synchronizer.
pub struct UrlSynchronizer;

impl UrlSynchronizer {
    /// Start the outbound and inbound tasks.
    ///
    /// Inbound intents go to `intents`, normally the
    /// [`IntentRunner`](calscope_resolver::IntentRunner) channel.
    pub fn spawn(
        store: Arc<ScopeStore>,
        router: Arc<dyn Router>,
        intents: mpsc::Sender<ScopeIntent>,
        config: SyncConfig,
    ) -> SyncHandle {
        let cancel = CancellationToken::new();
        let written = Arc::new(WrittenParams::new());

        let outbound = tokio::spawn(outbound_task(
            &store,
            Arc::clone(&router),
            config.codec.clone(),
            config.debounce,
            Arc::clone(&written),
            cancel.clone(),
        ));
        let inbound = tokio::spawn(inbound_task(
            store,
            router.as_ref(),
            config.codec,
            Arc::clone(&written),
            intents,
            cancel.clone(),
        ));

        SyncHandle {
            cancel,
            written,
            tasks: vec![outbound, inbound],
            shutdown_timeout: config.shutdown_timeout,
        }
    }
}

/// Running synchronizer.
pub struct SyncHandle {
    cancel: CancellationToken,
    written: Arc<WrittenParams>,
    tasks: Vec<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl SyncHandle {
    /// Clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Values the outbound side has written so far.
    pub fn written(&self) -> &WrittenParams {
        &self.written
    }

    /// Whether both tasks are still running.
    pub fn is_running(&self) -> bool {
        self.tasks.iter().all(|task| !task.is_finished())
    }

    /// Cancel both directions and wait for them.
    ///
    /// Returns `false` if the tasks did not stop within the timeout; they are
    /// aborted in that case.
    pub async fn shutdown(self) -> bool {
        self.cancel.cancel();
        info!(
            task_count = self.tasks.len(),
            timeout_ms = self.shutdown_timeout.as_millis(),
            "stopping url sync"
        );

        let aborts: Vec<_> = self.tasks.iter().map(JoinHandle::abort_handle).collect();
        let drain = futures::future::join_all(self.tasks);
        if tokio::time::timeout(self.shutdown_timeout, drain).await.is_err() {
            warn!("url sync shutdown timed out after {:?}", self.shutdown_timeout);
            for abort in aborts {
                abort.abort();
            }
            return false;
        }
        true
    }
}
