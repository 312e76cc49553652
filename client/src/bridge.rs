//! Realtime event bridge: an explicitly owned handle around one push-channel
//! connection. Inbound frames are validated against the [`ServerEvent`]
//! schema and forwarded on a bounded channel; outbound [`ClientEvent`]s are
//! queued to a background transport loop. The bridge does not retry a lost
//! connection itself; the polling reconciler covers missed events, and
//! callers can check [`RealtimeBridge::is_connected`] to decide to redial.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use shared::protocol::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

pub struct RealtimeBridge {
    out_tx: Option<mpsc::UnboundedSender<ClientEvent>>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeBridge {
    /// Dial the push channel and spawn the transport loop. Returns the
    /// bridge handle plus the stream of validated inbound events.
    pub async fn connect(ws_url: &str) -> Result<(Self, mpsc::Receiver<ServerEvent>)> {
        let (socket, _) = tokio_tungstenite::connect_async(ws_url).await?;
        let (mut sink, mut stream) = socket.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));

        let flag = connected.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = out_rx.recv() => match outbound {
                        Some(event) => {
                            let frame = match serde_json::to_string(&event) {
                                Ok(json) => json,
                                Err(err) => {
                                    warn!(%err, "skipping unserializable client event");
                                    continue;
                                }
                            };
                            if sink.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        // Handle dropped: flush a close frame and stop.
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    inbound = stream.next() => match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerEvent>(text.as_str()) {
                                Ok(event) => {
                                    if event_tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    warn!(%err, raw = %text, "dropping event outside the wire schema");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                            debug!("push channel closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                    },
                }
            }
            flag.store(false, Ordering::Relaxed);
        });

        Ok((
            Self {
                out_tx: Some(out_tx),
                connected,
                task: Some(task),
            },
            event_rx,
        ))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Queue an event for the server. Fails only once the transport loop
    /// has shut down.
    pub fn emit(&self, event: ClientEvent) -> Result<()> {
        self.out_tx
            .as_ref()
            .and_then(|tx| tx.send(event).ok())
            .ok_or_else(|| ClientError::Transport("push channel is down".to_string()))
    }

    pub fn join_room(&self, room_id: &str, is_spectator: bool) -> Result<()> {
        self.emit(ClientEvent::JoinRoom {
            room_id: room_id.to_string(),
            is_spectator,
        })
    }

    pub fn leave_room(&self, room_id: &str) -> Result<()> {
        self.emit(ClientEvent::LeaveRoom {
            room_id: room_id.to_string(),
        })
    }

    /// Graceful teardown: drops the outbound queue so the transport loop
    /// drains whatever is still pending, flushes a close frame, and exits.
    /// Waits for the loop up to a grace period, then aborts it.
    pub async fn disconnect(mut self) {
        self.out_tx = None;
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(DISCONNECT_GRACE, &mut task)
                .await
                .is_err()
            {
                debug!("transport loop outlived the disconnect grace period");
                task.abort();
            }
        }
        self.connected.store(false, Ordering::Relaxed);
    }
}

impl Drop for RealtimeBridge {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Relaxed);
        // Abrupt teardown path; the server observes the stream end.
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
