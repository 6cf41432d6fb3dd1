//! Non-blocking accept/read front-end.
//!
//! Binds one `tokio::net::TcpListener` and spawns one lightweight task
//! per accepted connection. Each task reads until EOF, parses exactly
//! one request (connection-per-request), and hands the parsed
//! [`wx_core::WorkItem`] to the [`crate::orchestrator::EnqueueHandle`].
//! The accept loop itself never blocks past `select_timeout`, so
//! `stop()` is honored within one tick — the async analogue of the
//! spec'd selector loop's `running`-flag check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wx_core::{parse_request, ParsedRequest, Record, WorkItem};

use crate::error::FatalListenerError;
use crate::orchestrator::EnqueueHandle;

/// The per-connection socket type carried by [`WorkItem`] in this crate.
pub type Socket = TcpStream;

/// Binds the listening socket. Split out from [`accept_loop`] so the
/// Orchestrator can surface a fatal bind failure synchronously from
/// `start()`, rather than only discovering it inside a spawned task.
///
/// # Errors
///
/// Returns [`FatalListenerError`] if the socket cannot be bound.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, FatalListenerError> {
    let listener = TcpListener::bind((host, port)).await.map_err(FatalListenerError)?;
    tracing::info!(host, port, "connection service listening");
    Ok(listener)
}

/// Runs the accept loop on an already-bound `listener` until `running`
/// is cleared or the listener itself fails.
///
/// Per-connection I/O errors (inside [`handle_connection`]) only close
/// that one connection. An error from `accept()` itself means the
/// listening socket is no longer usable (e.g. file-descriptor
/// exhaustion) — there is no peer to drop, so it is fatal: the loop
/// clears `running` (stopping the response worker too) and returns the
/// error for the Orchestrator to report.
///
/// # Errors
///
/// Returns [`FatalListenerError`] if `listener.accept()` fails.
pub async fn accept_loop(
    listener: TcpListener,
    select_timeout: std::time::Duration,
    running: Arc<AtomicBool>,
    enqueue: EnqueueHandle,
) -> Result<(), FatalListenerError> {
    while running.load(Ordering::Acquire) {
        match tokio::time::timeout(select_timeout, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                tracing::debug!(%peer, "accepted connection");
                let enqueue = enqueue.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, &enqueue).await {
                        tracing::debug!(error = %err, "connection closed with error");
                    }
                });
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "accept failed; listener is no longer usable");
                running.store(false, Ordering::Release);
                return Err(FatalListenerError(err));
            }
            Err(_timeout) => {
                // No connection within select_timeout; loop back to re-check `running`.
            }
        }
    }
    Ok(())
}

async fn handle_connection(
    mut stream: TcpStream,
    enqueue: &EnqueueHandle,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..read]);
    }

    let text = String::from_utf8_lossy(&buf);
    match parse_request(&text) {
        ParsedRequest::Push {
            producer_id,
            lamport,
            body,
        } => match Record::from_json(body) {
            Ok(record) => enqueue.enqueue_push(producer_id, record, lamport, stream),
            Err(_) => enqueue.enqueue_reject(
                "record is missing a non-empty `id` field".to_string(),
                400,
                lamport,
                stream,
            ),
        },
        ParsedRequest::Fetch { target_id, lamport } => {
            enqueue.enqueue_fetch(target_id, lamport, stream);
        }
        ParsedRequest::Reject { status, reason } => {
            enqueue.enqueue_reject(reason, status, 0, stream);
        }
    }

    Ok(())
}

/// Writes `bytes` to `socket` and shuts down the write half, swallowing
/// errors from a peer that has already disconnected.
pub(crate) async fn respond_and_close(mut socket: Socket, bytes: &[u8]) {
    if let Err(err) = socket.write_all(bytes).await {
        tracing::debug!(error = %err, "failed to write response to disconnected peer");
        return;
    }
    let _ = socket.shutdown().await;
}
