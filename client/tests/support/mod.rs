//! In-process mock backend for driving the client core through real HTTP
//! and websocket traffic: a tiny authoritative room server with the REST
//! envelope and push events the client expects.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::sleep;

use shared::model::{ChatMessage, Participant, Room, RoomStatus, RoomVisibility, User};
use shared::protocol::{ClientEvent, ServerEvent};

const COUNTDOWN_FROM: u32 = 2;
const COUNTDOWN_STEP: Duration = Duration::from_millis(150);

pub struct RoomEntry {
    pub room: Room,
    pub messages: Vec<ChatMessage>,
}

pub struct Backend {
    pub rooms: DashMap<String, RoomEntry>,
    pub events: broadcast::Sender<ServerEvent>,
    next_position: AtomicU32,
    departures: DashMap<String, u32>,
}

impl Backend {
    fn broadcast(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub backend: Arc<Backend>,
}

impl MockServer {
    pub async fn start() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let (events, _) = broadcast::channel(256);
        let backend = Arc::new(Backend {
            rooms: DashMap::new(),
            events,
            next_position: AtomicU32::new(0),
            departures: DashMap::new(),
        });

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/rooms/:id", get(get_room))
            .route("/api/rooms/:id/start", post(start_race))
            .route("/api/rooms/:id/end", post(end_race))
            .route("/api/rooms/:id/progress", post(ack))
            .route("/api/rooms/:id/finish", post(finish))
            .route("/api/rooms/:id/messages", get(get_messages).post(post_message))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(axum::serve(listener, app).into_future());

        Self { addr, backend }
    }

    pub fn config(&self, poll_interval: Duration) -> client::ClientConfig {
        client::ClientConfig {
            api_base: format!("http://{}/api", self.addr),
            ws_url: format!("ws://{}/ws", self.addr),
            poll_interval,
        }
    }

    pub fn seed_room(&self, id: &str, text: &str, time_limit: u32, users: &[User]) {
        let room = Room {
            id: id.to_string(),
            name: format!("{id} room"),
            room_type: RoomVisibility::Public,
            text: text.to_string(),
            time_limit,
            status: RoomStatus::Waiting,
            creator: users[0].clone(),
            participants: users.iter().cloned().map(Participant::new).collect(),
            spectators: vec![],
            password: None,
            time_left: None,
        };
        self.backend.rooms.insert(
            id.to_string(),
            RoomEntry {
                room,
                messages: vec![],
            },
        );
    }

    /// Flip room state server-side without any push event, as if the client
    /// missed the broadcast.
    pub fn silently_set_status(&self, id: &str, status: RoomStatus) {
        if let Some(mut entry) = self.backend.rooms.get_mut(id) {
            if status == RoomStatus::InProgress {
                entry.room.time_left = Some(entry.room.time_limit);
            }
            entry.room.status = status;
        }
    }

    pub fn delete_room(&self, id: &str) {
        self.backend.rooms.remove(id);
    }

    /// How many `leave_room` frames the push channel has seen for a room.
    pub fn departures(&self, id: &str) -> u32 {
        self.backend.departures.get(id).map(|n| *n).unwrap_or(0)
    }
}

pub fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        name: format!("typist-{id}"),
        avatar: None,
    }
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: None,
        data: Some(data),
    })
}

fn ok_empty() -> Json<Envelope<()>> {
    Json(Envelope {
        success: true,
        message: None,
        data: None,
    })
}

fn reject(message: &str) -> Json<Envelope<()>> {
    Json(Envelope {
        success: false,
        message: Some(message.to_string()),
        data: None,
    })
}

async fn get_room(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match backend.rooms.get(&id) {
        Some(entry) => ok(entry.room.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_race(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Some(mut entry) = backend.rooms.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if entry.room.status != RoomStatus::Waiting {
        return reject("race already started").into_response();
    }
    entry.room.status = RoomStatus::Countdown;
    drop(entry);

    tokio::spawn(drive_countdown(backend.clone(), id));
    ok_empty().into_response()
}

async fn drive_countdown(backend: Arc<Backend>, id: String) {
    backend.broadcast(ServerEvent::CountdownStarted {
        count: COUNTDOWN_FROM,
    });
    for count in (0..COUNTDOWN_FROM).rev() {
        sleep(COUNTDOWN_STEP).await;
        backend.broadcast(ServerEvent::CountdownUpdate { count });
    }
    if let Some(mut entry) = backend.rooms.get_mut(&id) {
        entry.room.status = RoomStatus::InProgress;
        entry.room.time_left = Some(entry.room.time_limit);
    }
    backend.broadcast(ServerEvent::CompetitionStarted);
}

async fn end_race(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Some(mut entry) = backend.rooms.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    entry.room.status = RoomStatus::Completed;
    entry.room.time_left = Some(0);
    drop(entry);
    backend.broadcast(ServerEvent::CompetitionEnded);
    ok_empty().into_response()
}

async fn ack() -> Json<Envelope<()>> {
    ok_empty()
}

/// Ranks are handed out strictly in the order finish requests arrive.
async fn finish(State(backend): State<Arc<Backend>>) -> Json<Envelope<serde_json::Value>> {
    let position = backend.next_position.fetch_add(1, Ordering::SeqCst) + 1;
    ok(json!({ "position": position }))
}

async fn get_messages(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match backend.rooms.get(&id) {
        Some(entry) => ok(entry.messages.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Acks without echoing a stored message, which pushes the client onto its
/// optimistic local-append path.
async fn post_message() -> Json<Envelope<()>> {
    ok_empty()
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(backend): State<Arc<Backend>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, backend))
}

async fn handle_socket(socket: WebSocket, backend: Arc<Backend>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = backend.events.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(json) = serde_json::to_string(&event) else { continue };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(event) = serde_json::from_str::<ClientEvent>(&text) {
                        handle_client_event(&backend, event);
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }
}

fn handle_client_event(backend: &Arc<Backend>, event: ClientEvent) {
    match event {
        ClientEvent::UpdateProgress {
            room_id,
            user_id,
            progress,
            wpm,
            accuracy,
        } => {
            if let Some(mut entry) = backend.rooms.get_mut(&room_id) {
                if let Some(p) = entry
                    .room
                    .participants
                    .iter_mut()
                    .find(|p| p.user.id == user_id)
                {
                    p.progress = progress;
                    p.wpm = wpm;
                    p.accuracy = accuracy;
                }
            }
            backend.broadcast(ServerEvent::ParticipantProgress {
                user_id,
                progress,
                wpm,
                accuracy,
                position: None,
                finish_time: None,
            });
        }
        ClientEvent::ParticipantFinished {
            room_id,
            user_id,
            finish_time,
        } => {
            let mut snapshot = None;
            if let Some(mut entry) = backend.rooms.get_mut(&room_id) {
                if let Some(p) = entry
                    .room
                    .participants
                    .iter_mut()
                    .find(|p| p.user.id == user_id)
                {
                    p.progress = 100;
                    p.finish_time = Some(finish_time);
                    snapshot = Some((p.wpm, p.accuracy));
                }
            }
            if let Some((wpm, accuracy)) = snapshot {
                backend.broadcast(ServerEvent::ParticipantProgress {
                    user_id,
                    progress: 100,
                    wpm,
                    accuracy,
                    position: None,
                    finish_time: Some(finish_time),
                });
            }
        }
        ClientEvent::LeaveRoom { room_id } => {
            *backend.departures.entry(room_id).or_insert(0) += 1;
        }
        // Join/chat/start intents need no mock-side behavior; the REST
        // handlers drive those flows.
        _ => {}
    }
}
