//! The single response worker: expiry sweep, file sync, dequeue, dispatch.
//!
//! There is exactly one of these per [`crate::orchestrator::Orchestrator`],
//! so every mutation of `RecordStore`/`ProducerRegistry` it makes is
//! already serialized — no lock is needed beyond what those types hold
//! internally.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use wx_core::{encode_response, LamportClock, Record, WorkItem};

use crate::network::connection_service::{respond_and_close, Socket};
use crate::producer::ProducerRegistry;
use crate::service::queue::RequestQueue;
use crate::storage::{persist, RecordStore};

/// Tracks whether the cache file existed at boot, to decide 200 vs 201
/// on the first successful `PUSH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFileStatus {
    /// The file already existed when the server started.
    Exists,
    /// The file was just created empty; the next successful `PUSH`
    /// transitions this to [`Self::Exists`] and returns 201.
    Created,
    /// The file could not be created at boot; pushes return 500 until
    /// a later reinitialization succeeds.
    CreateFailed,
}

impl CacheFileStatus {
    /// Determines the boot-time status for `path`, creating an empty
    /// cache file if none exists.
    #[must_use]
    pub fn at_boot(path: &std::path::Path) -> Self {
        match persist::ensure_file_exists(path) {
            Ok(true) => CacheFileStatus::Created,
            Ok(false) => CacheFileStatus::Exists,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to create cache file at boot");
                CacheFileStatus::CreateFailed
            }
        }
    }
}

/// The single-worker response loop described in the teacher's
/// background-worker idiom, specialized to the two fixed dispatch
/// variants this service needs rather than a general task trait.
pub struct ResponseService {
    clock: Arc<LamportClock>,
    store: Arc<RecordStore>,
    registry: Arc<ProducerRegistry>,
    queue: Arc<RequestQueue<Socket>>,
    cache_path: PathBuf,
    cache_status: Mutex<CacheFileStatus>,
    max_idle_seconds: u64,
    idle_backoff: std::time::Duration,
}

impl ResponseService {
    /// Creates the worker, establishing the cache-file state at boot.
    #[must_use]
    pub fn new(
        clock: Arc<LamportClock>,
        store: Arc<RecordStore>,
        registry: Arc<ProducerRegistry>,
        queue: Arc<RequestQueue<Socket>>,
        cache_path: PathBuf,
        max_idle_seconds: u64,
        idle_backoff: std::time::Duration,
    ) -> Self {
        let cache_status = Mutex::new(CacheFileStatus::at_boot(&cache_path));
        Self {
            clock,
            store,
            registry,
            queue,
            cache_path,
            cache_status,
            max_idle_seconds,
            idle_backoff,
        }
    }

    /// Runs the worker loop until `running` is cleared.
    pub async fn run(&self, running: Arc<AtomicBool>) {
        while running.load(Ordering::Acquire) {
            self.sweep_expired();
            self.flush_pending_writes();

            let Some(item) = self.queue.poll() else {
                tokio::time::sleep(self.idle_backoff).await;
                continue;
            };

            self.dispatch(item).await;
        }
    }

    /// Runs a single iteration: expiry sweep, background flush, and at
    /// most one dispatch. Returns `true` if an item was dispatched.
    /// Exposed for tests that want to drive the worker without the
    /// `running`-flag loop and idle-backoff sleep.
    pub async fn run_once(&self) -> bool {
        self.sweep_expired();
        self.flush_pending_writes();
        match self.queue.poll() {
            Some(item) => {
                self.dispatch(item).await;
                true
            }
            None => false,
        }
    }

    /// Flushes any writes accumulated since the last sweep, e.g. from a
    /// final drain performed outside the worker loop (see `stop()`).
    pub fn flush_now(&self) {
        self.flush_pending_writes();
    }

    fn sweep_expired(&self) {
        for (_producer_id, record_id) in self.registry.expire(self.max_idle_seconds) {
            self.store.remove(&record_id);
        }
    }

    /// Drains and persists pending writes. Returns `true` if there was
    /// nothing to do or the sync succeeded; `false` on `FileSyncError`
    /// (the drained writes are restored for the next attempt).
    fn flush_pending_writes(&self) -> bool {
        if !self.store.has_pending_writes() {
            return true;
        }
        let pending = self.store.drain_pending_writes();
        match persist::sync_to_file(&self.cache_path, &pending) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "cache file sync failed; will retry next sweep");
                self.store.restore_pending_writes(pending);
                false
            }
        }
    }

    async fn dispatch(&self, item: WorkItem<Socket>) {
        match item {
            WorkItem::Push {
                producer_id,
                record,
                socket,
                ..
            } => self.dispatch_push(producer_id, record, socket).await,
            WorkItem::Fetch { id, socket, .. } => self.dispatch_fetch(&id, socket).await,
            WorkItem::Reject {
                reason,
                status,
                socket,
                ..
            } => self.dispatch_reject(status, &reason, socket).await,
        }
    }

    async fn dispatch_push(&self, producer_id: String, record: Record, socket: Socket) {
        let record_id = record.id().to_string();
        self.registry.observe(&producer_id, &record_id, self.clock.now());
        self.store.put(record);

        let (status, mut msg) = {
            let mut cache_status = self.cache_status.lock();
            match *cache_status {
                CacheFileStatus::CreateFailed => (500, "cache file unavailable".to_string()),
                CacheFileStatus::Created => {
                    *cache_status = CacheFileStatus::Exists;
                    (201, "created".to_string())
                }
                CacheFileStatus::Exists => (200, "ok".to_string()),
            }
        };

        // Attempt to persist this push immediately so a sync failure can
        // be reported on the very response it affects, per the
        // advisory-message policy: the in-memory accept already
        // succeeded, so the status stays 200/201, not 500.
        if status != 500 && !self.flush_pending_writes() {
            msg.push_str(" (File sync failed)");
        }

        let lamport = self.clock.tick();
        let response = encode_response(status, &msg, lamport, None);
        respond_and_close(socket, &response).await;
    }

    async fn dispatch_fetch(&self, id: &str, socket: Socket) {
        let lamport = self.clock.tick();
        let response = match self.store.get(id) {
            Some(record) => encode_response(200, "ok", lamport, Some(record.body())),
            None => encode_response(404, "no record found", lamport, None),
        };
        respond_and_close(socket, &response).await;
    }

    async fn dispatch_reject(&self, status: u16, reason: &str, socket: Socket) {
        let lamport = self.clock.tick();
        let response = encode_response(status, reason, lamport, None);
        respond_and_close(socket, &response).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn service(path: PathBuf) -> ResponseService {
        ResponseService::new(
            Arc::new(LamportClock::new()),
            Arc::new(RecordStore::new()),
            Arc::new(ProducerRegistry::new()),
            Arc::new(RequestQueue::new()),
            path,
            30,
            std::time::Duration::from_millis(1),
        )
    }

    #[test]
    fn cache_file_status_created_for_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        assert_eq!(CacheFileStatus::at_boot(&path), CacheFileStatus::Created);
        assert!(path.exists());
    }

    #[test]
    fn cache_file_status_exists_for_present_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "[]").unwrap();
        assert_eq!(CacheFileStatus::at_boot(&path), CacheFileStatus::Exists);
    }

    #[tokio::test]
    async fn run_once_returns_false_on_empty_queue() {
        let dir = tempdir().unwrap();
        let svc = service(dir.path().join("cache.json"));
        assert!(!svc.run_once().await);
    }

    async fn loopback_pair() -> (Socket, tokio::net::TcpStream) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn first_push_creates_file_and_subsequent_pushes_do_not() {
        use tokio::io::AsyncReadExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let svc = service(path.clone());
        assert_eq!(*svc.cache_status.lock(), CacheFileStatus::Created);

        let (server_socket, mut client) = loopback_pair().await;
        svc.dispatch_push(
            "A".to_string(),
            Record::from_json(json!({"id": "A"})).unwrap(),
            server_socket,
        )
        .await;
        assert_eq!(*svc.cache_status.lock(), CacheFileStatus::Exists);

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(body["statusCode"], 201);

        let (server_socket2, mut client2) = loopback_pair().await;
        svc.dispatch_push(
            "A".to_string(),
            Record::from_json(json!({"id": "A", "v": 2})).unwrap(),
            server_socket2,
        )
        .await;
        let mut buf2 = Vec::new();
        client2.read_to_end(&mut buf2).await.unwrap();
        let body2: serde_json::Value = serde_json::from_slice(&buf2).unwrap();
        assert_eq!(body2["statusCode"], 200);
    }

    #[tokio::test]
    async fn fetch_hit_returns_200_with_weather_data() {
        let dir = tempdir().unwrap();
        let svc = service(dir.path().join("cache.json"));
        svc.store.put(Record::from_json(json!({"id": "A", "air_temp": 9.4})).unwrap());

        let (server_socket, mut client) = loopback_pair().await;
        svc.dispatch_fetch("A", server_socket).await;

        use tokio::io::AsyncReadExt;
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["weatherData"]["air_temp"], 9.4);
    }

    #[tokio::test]
    async fn fetch_miss_returns_404() {
        let dir = tempdir().unwrap();
        let svc = service(dir.path().join("cache.json"));

        let (server_socket, mut client) = loopback_pair().await;
        svc.dispatch_fetch("missing", server_socket).await;

        use tokio::io::AsyncReadExt;
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(body["statusCode"], 404);
        assert!(body.get("weatherData").is_none());
    }

    #[tokio::test]
    async fn reject_echoes_carried_status_and_reason() {
        let dir = tempdir().unwrap();
        let svc = service(dir.path().join("cache.json"));

        let (server_socket, mut client) = loopback_pair().await;
        svc.dispatch_reject(400, "unknown or missing verb", server_socket).await;

        use tokio::io::AsyncReadExt;
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["msg"], "unknown or missing verb");
    }

    #[tokio::test]
    async fn expiry_removes_tracker_and_record() {
        let dir = tempdir().unwrap();
        let svc = service(dir.path().join("cache.json"));
        svc.store.put(Record::from_json(json!({"id": "A"})).unwrap());
        svc.registry.observe("A", "A", 1);

        // max_idle_seconds=0 means any nonzero idle time counts as expired.
        std::thread::sleep(std::time::Duration::from_millis(5));
        svc.registry.expire(0).into_iter().for_each(|(_, record_id)| {
            svc.store.remove(&record_id);
        });

        assert!(svc.store.get("A").is_none());
    }
}
