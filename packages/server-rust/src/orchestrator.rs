//! Wiring and lifecycle for the whole station server.
//!
//! Modeled on the teacher's `ServiceRegistry` + `ManagedService`
//! lifecycle idiom (`init`/`shutdown` in registration/reverse order),
//! simplified to the two fixed actors this service names — no general
//! plugin registry, since there is no multi-service clustering here for
//! one to support.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;

use wx_core::{LamportClock, Record, WorkItem};

use crate::error::FatalListenerError;
use crate::network::config::NetworkConfig;
use crate::network::connection_service::{self, Socket};
use crate::producer::ProducerRegistry;
use crate::service::queue::RequestQueue;
use crate::service::response_service::ResponseService;
use crate::storage::{persist, RecordStore};

/// The three entry points `ConnectionService` calls once it has parsed
/// a request: each performs the Lamport clock merge and enqueues the
/// resulting [`WorkItem`].
#[derive(Clone)]
pub struct EnqueueHandle {
    clock: Arc<LamportClock>,
    queue: Arc<RequestQueue<Socket>>,
}

impl EnqueueHandle {
    #[must_use]
    pub fn new(clock: Arc<LamportClock>, queue: Arc<RequestQueue<Socket>>) -> Self {
        Self { clock, queue }
    }

    /// Merges `lamport` and enqueues a validated push.
    pub fn enqueue_push(&self, producer_id: String, record: Record, lamport: u64, socket: Socket) {
        self.clock.merge(lamport);
        self.queue.enqueue(WorkItem::Push {
            producer_id,
            record,
            lamport,
            socket,
        });
    }

    /// Merges `lamport` and enqueues a fetch.
    pub fn enqueue_fetch(&self, id: String, lamport: u64, socket: Socket) {
        self.clock.merge(lamport);
        self.queue.enqueue(WorkItem::Fetch { id, lamport, socket });
    }

    /// Merges `lamport` and enqueues a rejection. `lamport` is `0` when
    /// the header itself could not be parsed.
    pub fn enqueue_reject(&self, reason: String, status: u16, lamport: u64, socket: Socket) {
        self.clock.merge(lamport);
        self.queue.enqueue(WorkItem::Reject {
            reason,
            status,
            lamport,
            socket,
        });
    }
}

/// Owns every piece of shared state and the two background actors.
pub struct Orchestrator {
    config: NetworkConfig,
    cache_path: PathBuf,
    clock: Arc<LamportClock>,
    store: Arc<RecordStore>,
    registry: Arc<ProducerRegistry>,
    queue: Arc<RequestQueue<Socket>>,
    running: Arc<AtomicBool>,
    connection_task: Option<JoinHandle<Result<(), FatalListenerError>>>,
    response_task: Option<JoinHandle<()>>,
    bound_addr: Option<std::net::SocketAddr>,
}

impl Orchestrator {
    /// Builds the orchestrator, loading any records already on disk at
    /// `cache_path` into the store.
    #[must_use]
    pub fn new(config: NetworkConfig, cache_path: PathBuf) -> Self {
        let loaded = persist::load_from_file(&cache_path);
        let store = Arc::new(RecordStore::from_loaded(loaded.into_values().collect()));

        Self {
            config,
            cache_path,
            clock: Arc::new(LamportClock::new()),
            store,
            registry: Arc::new(ProducerRegistry::new()),
            queue: Arc::new(RequestQueue::new()),
            running: Arc::new(AtomicBool::new(false)),
            connection_task: None,
            response_task: None,
            bound_addr: None,
        }
    }

    /// The address the listening socket bound to, available once
    /// [`Self::start`] has returned successfully. Useful for tests that
    /// start the server on an OS-assigned port (`port: 0`).
    #[must_use]
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.bound_addr
    }

    /// Polls until `running` is cleared, whether by [`Self::stop`] or by
    /// the connection service hitting a fatal accept error. Lets the CLI
    /// select between a shutdown signal and an unexpected service
    /// failure instead of only ever waiting on the former.
    pub async fn wait_until_stopped(&self) {
        while self.is_running() {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    /// An enqueue handle for wiring into a connection front-end.
    #[must_use]
    pub fn enqueue_handle(&self) -> EnqueueHandle {
        EnqueueHandle::new(self.clock.clone(), self.queue.clone())
    }

    /// Spawns the connection front-end and response worker, waiting
    /// briefly for the listening socket to bind before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the listening socket fails to bind within
    /// the startup grace period.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.running.store(true, Ordering::Release);

        let response_service = Arc::new(ResponseService::new(
            self.clock.clone(),
            self.store.clone(),
            self.registry.clone(),
            self.queue.clone(),
            self.cache_path.clone(),
            self.config.max_idle_seconds,
            self.config.idle_backoff,
        ));
        let response_running = self.running.clone();
        self.response_task = Some(tokio::spawn(async move {
            response_service.run(response_running).await;
        }));

        let listener = connection_service::bind(&self.config.host, self.config.port)
            .await
            .context("failed to bind connection listener")?;
        self.bound_addr = listener.local_addr().ok();

        let select_timeout = self.config.select_timeout;
        let enqueue = self.enqueue_handle();
        let connection_running = self.running.clone();
        self.connection_task = Some(tokio::spawn(async move {
            connection_service::accept_loop(listener, select_timeout, connection_running, enqueue).await
        }));

        // Give the listener a moment to settle before reporting
        // readiness, matching the startup grace period the spec
        // describes; the bind itself has already succeeded above.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tracing::info!(host = %self.config.host, port = self.config.port, "server ready");

        Ok(())
    }

    /// Clears `running`, awaits both actors, and performs a final sync.
    ///
    /// # Errors
    ///
    /// Returns an error if a spawned task panicked, or if the connection
    /// service had already stopped due to a fatal listener error — the
    /// final sync still runs first so no pending writes are lost.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.running.store(false, Ordering::Release);

        let mut listener_error = None;
        if let Some(task) = self.connection_task.take() {
            if let Err(err) = task.await.context("connection service task panicked")? {
                listener_error = Some(err);
            }
        }
        if let Some(task) = self.response_task.take() {
            task.await.context("response service task panicked")?;
        }

        if self.store.has_pending_writes() {
            let pending = self.store.drain_pending_writes();
            if let Err(err) = persist::sync_to_file(&self.cache_path, &pending) {
                tracing::warn!(error = %err, "final cache sync on shutdown failed");
                self.store.restore_pending_writes(pending);
            }
        }

        if let Some(err) = listener_error {
            tracing::error!(error = %err, "reporting fatal listener error from stop()");
            return Err(err).context("connection service stopped due to a fatal listener error");
        }

        Ok(())
    }

    /// `true` while the server is accepting/serving requests.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}
