//! Race coordinator: orchestrates one room session end to end. It owns the
//! store, the push bridge, the polling reconciler and the race timer, feeds
//! typing input through the progress math, and walks the room through
//! waiting, countdown, in-progress and completed.
//!
//! Everything runs on one task; "concurrency" here is the interleaving of
//! push events, poll results, timer ticks and user commands over a single
//! `select` loop, with last-writer-wins merges in the store.

use std::time::Duration;

use shared::clock::now_ms;
use shared::fsm::{next_status, RaceInput};
use shared::model::{ChatMessage, Participant, RoomStatus, User};
use shared::protocol::{ClientEvent, ServerEvent};
use shared::wpm;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiClient, ProgressReport};
use crate::bridge::RealtimeBridge;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::reconciler::Reconciler;
use crate::store::{RoomPatch, RoomStore, RoomView};
use crate::timer::Ticker;

/// What the local user is to this room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Creator,
    Participant,
    Spectator,
}

/// Actions the presentation layer can issue.
#[derive(Clone, Debug)]
pub enum Command {
    /// Creator only; valid while the room is waiting.
    StartRace,
    /// Creator only; valid while the race runs.
    EndRace,
    /// The full typed text so far.
    Input(String),
    SendChat(String),
    Leave,
}

/// Out-of-band notifications for the presentation layer. Everything else
/// is observed through the store subscription.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// The local participant crossed 100%; rank as the server assigned it.
    Finished { finish_time: u32, position: u32 },
    /// The race is over; results can be shown.
    RaceOver,
    /// The server rejected an action, or an action failed in a way worth
    /// telling the user about.
    Error(String),
    /// The room is gone; the user should be routed back to the room list.
    RoomClosed,
}

/// Handle to a joined room. Dropping it (or issuing [`Command::Leave`])
/// tears down the bridge, the reconciler and any running timers.
pub struct RoomSession {
    store: RoomStore,
    role: Role,
    commands: mpsc::UnboundedSender<Command>,
    notices: mpsc::Receiver<Notice>,
    task: JoinHandle<()>,
}

impl RoomSession {
    /// Fetch the room, join it over the push channel, and spawn the
    /// coordinator loop. Fails fast if the room does not exist or the
    /// push channel cannot be reached.
    pub async fn join(
        cfg: &ClientConfig,
        room_id: &str,
        user: User,
        spectate: bool,
    ) -> Result<Self> {
        let api = ApiClient::new(cfg.api_base.clone());
        let room = api.fetch_room(room_id).await?;

        let role = if spectate {
            Role::Spectator
        } else if room.is_creator(&user.id) {
            Role::Creator
        } else {
            Role::Participant
        };
        info!(room_id, user = %user.name, ?role, "joining room");

        let store = RoomStore::new();
        let in_progress = room.status == RoomStatus::InProgress;
        let resumed_time_left = room.time_left.unwrap_or(room.time_limit);
        store.apply(RoomPatch::snapshot(room));

        // Chat backlog; a failure here is not worth blocking the join.
        match api.fetch_messages(room_id).await {
            Ok(messages) => {
                store.apply(RoomPatch {
                    messages,
                    ..RoomPatch::default()
                });
            }
            Err(err) => debug!(room_id, %err, "failed to load chat backlog"),
        }

        let (bridge, events) = RealtimeBridge::connect(&cfg.ws_url).await?;
        bridge.join_room(room_id, spectate)?;

        let (fatal_tx, fatal_rx) = mpsc::channel(1);
        let reconciler = Reconciler::spawn(
            api.clone(),
            store.clone(),
            room_id.to_string(),
            cfg.poll_interval,
            fatal_tx,
        );

        let (commands, cmd_rx) = mpsc::unbounded_channel();
        let (notice_tx, notices) = mpsc::channel(64);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        let mut coordinator = Coordinator {
            api,
            bridge,
            store: store.clone(),
            room_id: room_id.to_string(),
            user,
            role,
            typed: String::new(),
            time_left: None,
            finished: false,
            race_ticker: None,
            tick_tx,
            notices: notice_tx,
            _reconciler: reconciler,
        };
        if in_progress {
            // Joined mid-race: seed the local timer from the snapshot.
            coordinator.start_race_timer(resumed_time_left);
        }

        let store_rx = store.subscribe();
        let task = tokio::spawn(run(coordinator, cmd_rx, events, fatal_rx, tick_rx, store_rx));

        Ok(Self {
            store,
            role,
            commands,
            notices,
            task,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<RoomView> {
        self.store.subscribe()
    }

    pub fn start_race(&self) {
        let _ = self.commands.send(Command::StartRace);
    }

    pub fn end_race(&self) {
        let _ = self.commands.send(Command::EndRace);
    }

    /// Feed the full typed text; progress, WPM and accuracy are recomputed
    /// and reported on both transports.
    pub fn input(&self, typed: impl Into<String>) {
        let _ = self.commands.send(Command::Input(typed.into()));
    }

    pub fn send_chat(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::SendChat(text.into()));
    }

    pub fn leave(&self) {
        let _ = self.commands.send(Command::Leave);
    }

    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Coordinator {
    api: ApiClient,
    bridge: RealtimeBridge,
    store: RoomStore,
    room_id: String,
    user: User,
    role: Role,
    typed: String,
    time_left: Option<u32>,
    finished: bool,
    race_ticker: Option<Ticker>,
    tick_tx: mpsc::UnboundedSender<()>,
    notices: mpsc::Sender<Notice>,
    _reconciler: Reconciler,
}

async fn run(
    mut co: Coordinator,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::Receiver<ServerEvent>,
    mut fatal_rx: mpsc::Receiver<ClientError>,
    mut tick_rx: mpsc::UnboundedReceiver<()>,
    mut store_rx: watch::Receiver<RoomView>,
) {
    loop {
        tokio::select! {
            command = cmd_rx.recv() => match command {
                Some(Command::Leave) | None => break,
                Some(command) => co.handle_command(command).await,
            },
            Some(event) = events.recv() => co.handle_event(event).await,
            Some(err) = fatal_rx.recv() => {
                warn!(room_id = %co.room_id, %err, "room is gone");
                co.notify(Notice::RoomClosed).await;
                break;
            }
            Some(()) = tick_rx.recv() => co.on_race_tick().await,
            changed = store_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = store_rx.borrow_and_update().clone();
                co.sync_from_store(&view).await;
            }
        }
    }

    // Queue the goodbye, then let the transport loop drain it before the
    // task goes away. Reconciler and race ticker abort on drop.
    let Coordinator {
        bridge, room_id, ..
    } = co;
    let _ = bridge.leave_room(&room_id);
    bridge.disconnect().await;
    info!(%room_id, "left room");
}

impl Coordinator {
    async fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice).await;
    }

    fn view(&self) -> RoomView {
        self.store.view()
    }

    fn start_race_timer(&mut self, seconds: u32) {
        self.time_left = Some(seconds);
        self.store.apply(RoomPatch::time_left(Some(seconds)));
        let tick_tx = self.tick_tx.clone();
        self.race_ticker = Some(Ticker::every(Duration::from_secs(1), move || {
            let _ = tick_tx.send(());
        }));
    }

    fn stop_race_timer(&mut self) {
        self.race_ticker = None;
        self.time_left = None;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartRace => self.start_race().await,
            Command::EndRace => self.end_race().await,
            Command::Input(text) => self.handle_input(text).await,
            Command::SendChat(text) => self.send_chat(text).await,
            // Leave never reaches here; the run loop breaks on it.
            Command::Leave => {}
        }
    }

    async fn start_race(&mut self) {
        if self.role != Role::Creator {
            return;
        }
        if self.view().status() != Some(RoomStatus::Waiting) {
            self.notify(Notice::Error("race already started".to_string()))
                .await;
            return;
        }
        let _ = self.bridge.emit(ClientEvent::StartRace {
            room_id: self.room_id.clone(),
        });
        match self.api.start_race(&self.room_id).await {
            Ok(()) => info!(room_id = %self.room_id, "race start requested"),
            Err(ClientError::Rejected(message)) => self.notify(Notice::Error(message)).await,
            Err(err) if err.is_transient() => debug!(%err, "start request failed"),
            Err(err) => self.notify(Notice::Error(err.to_string())).await,
        }
    }

    async fn end_race(&mut self) {
        if self.role != Role::Creator || self.view().status() != Some(RoomStatus::InProgress) {
            return;
        }
        match self.api.end_race(&self.room_id).await {
            Ok(()) => self.complete_race(true).await,
            Err(ClientError::Rejected(message)) => self.notify(Notice::Error(message)).await,
            Err(err) => debug!(%err, "end request failed"),
        }
    }

    async fn handle_input(&mut self, text: String) {
        if self.role == Role::Spectator || self.finished {
            return;
        }
        let view = self.view();
        let Some(room) = view.room else { return };
        if room.status != RoomStatus::InProgress {
            return;
        }

        self.typed = text;
        let time_left = self.time_left.unwrap_or(room.time_limit);
        let elapsed = room.time_limit.saturating_sub(time_left);
        let stats = wpm::evaluate(&self.typed, &room.text, elapsed as f64);

        // Optimistic local update; server echoes reconcile it later.
        let mut me = room
            .participant(&self.user.id)
            .cloned()
            .unwrap_or_else(|| Participant::new(self.user.clone()));
        me.progress = stats.progress;
        me.wpm = stats.wpm;
        me.accuracy = stats.accuracy;
        self.store.apply(RoomPatch::participant(me));

        let _ = self.bridge.emit(ClientEvent::UpdateProgress {
            room_id: self.room_id.clone(),
            user_id: self.user.id.clone(),
            progress: stats.progress,
            wpm: stats.wpm,
            accuracy: stats.accuracy,
        });
        let report = ProgressReport {
            progress: stats.progress,
            wpm: stats.wpm,
            accuracy: stats.accuracy,
            completed: stats.progress == 100,
        };
        if let Err(err) = self.api.report_progress(&self.room_id, &report).await {
            debug!(%err, "progress report failed");
        }

        if stats.progress == 100 {
            self.claim_finish(elapsed).await;
        }
    }

    /// The local participant filled the passage: claim completion and take
    /// whatever rank the server hands back, in its acceptance order.
    async fn claim_finish(&mut self, finish_time: u32) {
        self.finished = true;
        match self.api.finish(&self.room_id, finish_time).await {
            Ok(position) => {
                let view = self.view();
                let mut me = view
                    .room
                    .as_ref()
                    .and_then(|r| r.participant(&self.user.id))
                    .cloned()
                    .unwrap_or_else(|| Participant::new(self.user.clone()));
                me.progress = 100;
                me.finish_time = Some(finish_time);
                me.position = Some(position);
                self.store.apply(RoomPatch::participant(me));

                let _ = self.bridge.emit(ClientEvent::ParticipantFinished {
                    room_id: self.room_id.clone(),
                    user_id: self.user.id.clone(),
                    finish_time,
                });
                info!(room_id = %self.room_id, position, "finished race");
                self.notify(Notice::Finished {
                    finish_time,
                    position,
                })
                .await;
            }
            Err(ClientError::Rejected(message)) => self.notify(Notice::Error(message)).await,
            Err(err) => {
                // Allow the claim to be retried on the next input.
                self.finished = false;
                debug!(%err, "finish claim failed");
            }
        }
    }

    async fn send_chat(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        match self.api.send_message(&self.room_id, &text).await {
            Ok(stored) => {
                let message = stored.unwrap_or_else(|| ChatMessage {
                    id: format!("msg-{}", Uuid::new_v4()),
                    user: self.user.clone(),
                    text: text.clone(),
                    timestamp: now_ms(),
                });
                self.store.apply(RoomPatch::message(message));
                let _ = self.bridge.emit(ClientEvent::SendMessage {
                    room_id: self.room_id.clone(),
                    message: text,
                });
            }
            Err(err) => {
                self.notify(Notice::Error("failed to send message".to_string()))
                    .await;
                debug!(%err, "chat send failed");
            }
        }
    }

    async fn handle_event(&mut self, event: ServerEvent) {
        // Completed is terminal: late lifecycle pushes cannot reopen the
        // room. Chat and progress echoes still land in the store.
        let terminal = self.view().status() == Some(RoomStatus::Completed);
        match event {
            _ if terminal && !matches!(event, ServerEvent::NewMessage { .. }) => {}
            ServerEvent::CountdownStarted { count } => {
                let status = self
                    .view()
                    .status()
                    .and_then(|s| next_status(s, &RaceInput::CountdownStarted));
                self.store.apply(RoomPatch {
                    status,
                    countdown: Some(Some(count)),
                    ..RoomPatch::default()
                });
                self.typed.clear();
                self.finished = false;
            }
            ServerEvent::CountdownUpdate { count } => {
                self.store.apply(RoomPatch::countdown(Some(count)));
            }
            ServerEvent::CompetitionStarted => self.begin_race().await,
            ServerEvent::CompetitionEnded => self.complete_race(true).await,
            ServerEvent::ParticipantProgress {
                user_id,
                progress,
                wpm,
                accuracy,
                position,
                finish_time,
            } => {
                let view = self.view();
                let Some(existing) = view
                    .room
                    .as_ref()
                    .and_then(|r| r.participant(&user_id))
                    .cloned()
                else {
                    debug!(%user_id, "progress for unknown participant");
                    return;
                };
                let mut updated = existing;
                updated.progress = progress;
                updated.wpm = wpm;
                updated.accuracy = accuracy;
                updated.position = position;
                updated.finish_time = finish_time;
                self.store.apply(RoomPatch::participant(updated));
            }
            ServerEvent::NewMessage { message } => {
                self.store.apply(RoomPatch::message(message));
            }
        }
    }

    async fn begin_race(&mut self) {
        let view = self.view();
        let Some(room) = view.room else { return };
        self.store.apply(RoomPatch {
            status: Some(RoomStatus::InProgress),
            countdown: Some(None),
            ..RoomPatch::default()
        });
        self.typed.clear();
        self.finished = false;
        self.start_race_timer(room.time_limit);
        info!(room_id = %self.room_id, "race started");
    }

    async fn complete_race(&mut self, notify: bool) {
        let already_over = self.view().status() == Some(RoomStatus::Completed);
        self.stop_race_timer();
        self.store.apply(RoomPatch {
            status: Some(RoomStatus::Completed),
            countdown: Some(None),
            time_left: Some(Some(0)),
            ..RoomPatch::default()
        });
        if notify && !already_over {
            info!(room_id = %self.room_id, "race over");
            self.notify(Notice::RaceOver).await;
        }
    }

    async fn on_race_tick(&mut self) {
        let Some(remaining) = self.time_left else {
            return;
        };
        let remaining = remaining.saturating_sub(1);
        self.time_left = Some(remaining);
        self.store.apply(RoomPatch::time_left(Some(remaining)));
        if remaining > 0 {
            return;
        }

        // Time is up. The creator asks the server to end the race; everyone
        // else completes locally and lets the server confirm.
        self.race_ticker = None;
        if self.role == Role::Creator {
            match self.api.end_race(&self.room_id).await {
                Ok(()) => self.complete_race(true).await,
                Err(ClientError::Rejected(message)) => {
                    self.complete_race(true).await;
                    self.notify(Notice::Error(message)).await;
                }
                Err(err) => {
                    debug!(%err, "end-of-time request failed");
                    self.complete_race(true).await;
                }
            }
        } else {
            self.complete_race(true).await;
        }
    }

    /// Self-correction against the authoritative snapshots the reconciler
    /// merges in: if a missed push left the local timers out of step with
    /// the room status, re-derive them here.
    async fn sync_from_store(&mut self, view: &RoomView) {
        match view.status() {
            Some(RoomStatus::InProgress) if self.race_ticker.is_none() => {
                let Some(room) = view.room.as_ref() else {
                    return;
                };
                info!(room_id = %self.room_id, "poll reconciliation: race is running");
                let seconds = room.time_left.unwrap_or(room.time_limit);
                self.start_race_timer(seconds);
            }
            Some(RoomStatus::Completed) if self.race_ticker.is_some() => {
                self.complete_race(true).await;
            }
            // Accepted last-writer-wins inconsistency: a stale snapshot can
            // move the status backwards; keep the timers coherent with it.
            Some(RoomStatus::Waiting) | Some(RoomStatus::Countdown)
                if self.race_ticker.is_some() =>
            {
                self.stop_race_timer();
                self.store.apply(RoomPatch::time_left(None));
            }
            _ => {}
        }
    }
}
