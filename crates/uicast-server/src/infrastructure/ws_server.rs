//! WebSocket server: accept loop and per-viewer session tasks.
//!
//! This module is responsible for:
//!
//! 1. Accepting TCP connections on an already-bound listener.
//! 2. Upgrading each connection to a WebSocket session.
//! 3. Naming the viewer (allocating its id) and handing the tick thread a
//!    `Connect` event carrying the writer end of a fresh frame slot.
//! 4. Running two tasks per session:
//!    - **Writer**: takes bootstrap assets and frames out of the slot and
//!      sends them as binary messages.
//!    - **Reader**: parses JSON text messages into events and pushes them
//!      onto the intake.
//! 5. Pushing `Disconnect` when either task ends.
//!
//! Nothing here waits on the tick thread.  A viewer that reads slowly only
//! ever has one frame pending (the slot overwrites), and a failed write ends
//! that viewer's session without touching any other.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use uicast_core::protocol::parse_viewer_message;
use uicast_core::{frame_slot, InboundEvent, IntakeSender, ViewerId, ViewerIdAllocator};

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// What every session needs to reach the tick thread.
#[derive(Debug, Clone)]
pub struct ViewerHub {
    intake: IntakeSender,
    ids: Arc<ViewerIdAllocator>,
}

impl ViewerHub {
    /// `ids` must be the allocator the tick loop's registry was built with.
    pub fn new(intake: IntakeSender, ids: Arc<ViewerIdAllocator>) -> Self {
        Self { intake, ids }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Accepts viewers on `listener` until `running` is cleared.
///
/// Accept errors are logged and the loop carries on; binding (the only
/// fatal step) has already happened in the caller.
pub async fn run_server(listener: TcpListener, hub: ViewerHub, running: Arc<AtomicBool>) {
    match listener.local_addr() {
        Ok(addr) => info!("accepting viewers on ws://{addr}"),
        Err(e) => warn!("listener address unavailable: {e}"),
    }

    loop {
        if !running.load(Ordering::SeqCst) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let hub = hub.clone();
                tokio::spawn(async move {
                    handle_viewer_session(stream, peer_addr, hub).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within ACCEPT_POLL; re-check the flag.
            }
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_viewer_session(raw_stream: TcpStream, peer_addr: SocketAddr, hub: ViewerHub) {
    match run_session(raw_stream, peer_addr, hub).await {
        Ok(viewer) => info!("viewer {viewer} ({peer_addr}) session closed"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs one viewer's session to completion and returns its id.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails; the viewer is never
/// registered in that case.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    hub: ViewerHub,
) -> anyhow::Result<ViewerId> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let viewer = hub.ids.allocate();
    let (outbound, mut slot) = frame_slot();
    hub.intake.push(InboundEvent::Connect {
        viewer,
        address: peer_addr.to_string(),
        outbound,
    });
    info!("viewer {viewer} connected from {peer_addr}");

    let (mut ws_tx, ws_rx) = ws_stream.split();

    // ── Writer: slot → WebSocket ──────────────────────────────────────────────
    let mut writer_task = tokio::spawn(async move {
        while let Some(message) = slot.next().await {
            if let Err(e) = ws_tx.send(WsMessage::Binary(message.bytes().to_vec())).await {
                debug!("viewer {viewer}: send failed: {e}");
                return;
            }
        }
        // The tick thread dropped the slot: the viewer was unregistered.
        if let Err(e) = ws_tx.close().await {
            debug!("viewer {viewer}: close failed: {e}");
        }
    });

    // ── Reader: WebSocket → intake ────────────────────────────────────────────
    let intake = hub.intake.clone();
    let mut reader_task = tokio::spawn(read_viewer_messages(ws_rx, viewer, intake));

    tokio::select! {
        _ = &mut writer_task => {
            debug!("viewer {viewer}: writer task ended");
            reader_task.abort();
        }
        _ = &mut reader_task => {
            debug!("viewer {viewer}: reader task ended");
            writer_task.abort();
        }
    }

    hub.intake.push(InboundEvent::Disconnect { viewer });
    Ok(viewer)
}

/// Parses every text message from the viewer and pushes the resulting
/// event.  Returns when the viewer closes the connection or errors.
async fn read_viewer_messages<S>(mut ws_rx: S, viewer: ViewerId, intake: IntakeSender)
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    while let Some(next) = ws_rx.next().await {
        let message = match next {
            Ok(message) => message,
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                debug!("viewer {viewer}: WebSocket closed");
                return;
            }
            Err(e) => {
                warn!("viewer {viewer}: WebSocket error: {e}");
                return;
            }
        };

        match message {
            WsMessage::Text(text) => match parse_viewer_message(&text) {
                Ok(parsed) => {
                    debug!("viewer {viewer}: {}", parsed.type_name());
                    intake.push(parsed.into_event(viewer));
                }
                Err(e) => {
                    // One bad message does not end the session.
                    warn!("viewer {viewer}: malformed message dropped: {e}");
                }
            },
            WsMessage::Binary(data) => {
                warn!(
                    "viewer {viewer}: unexpected binary message ({} bytes) ignored",
                    data.len()
                );
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            WsMessage::Close(_) => {
                debug!("viewer {viewer}: Close frame received");
                return;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
