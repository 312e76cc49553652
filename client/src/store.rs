//! Canonical in-memory view of the active room. Two writers feed it — the
//! push-channel bridge and the polling reconciler — with no ordering
//! metadata between them, so every merge is last-writer-wins per field.
//! The backend stays the source of truth; this store is a cache.

use std::sync::Arc;

use shared::model::{ChatMessage, Participant, Room, RoomStatus};
use tokio::sync::watch;

/// Everything a presentation layer needs to render one room session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoomView {
    pub room: Option<Room>,
    /// Append-only chat log, deduplicated by message id.
    pub messages: Vec<ChatMessage>,
    /// Live countdown value; `None` outside the countdown phase.
    pub countdown: Option<u32>,
    /// Remaining race seconds once the race is running.
    pub time_left: Option<u32>,
}

impl RoomView {
    pub fn status(&self) -> Option<RoomStatus> {
        self.room.as_ref().map(|r| r.status)
    }
}

/// Structural patch applied to the store. Unset fields leave the view
/// untouched; a full `snapshot` replaces the room wholesale (which is how
/// a stale poll can legitimately win over a fresher push update).
#[derive(Clone, Debug, Default)]
pub struct RoomPatch {
    pub snapshot: Option<Room>,
    pub status: Option<RoomStatus>,
    /// Replaced by matching user id; unknown participants are appended.
    pub participants: Vec<Participant>,
    /// Appended unless a message with the same id is already present.
    pub messages: Vec<ChatMessage>,
    pub countdown: Option<Option<u32>>,
    pub time_left: Option<Option<u32>>,
}

impl RoomPatch {
    pub fn snapshot(room: Room) -> Self {
        Self {
            snapshot: Some(room),
            ..Self::default()
        }
    }

    pub fn status(status: RoomStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn participant(participant: Participant) -> Self {
        Self {
            participants: vec![participant],
            ..Self::default()
        }
    }

    pub fn message(message: ChatMessage) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }

    pub fn countdown(count: Option<u32>) -> Self {
        Self {
            countdown: Some(count),
            ..Self::default()
        }
    }

    pub fn time_left(seconds: Option<u32>) -> Self {
        Self {
            time_left: Some(seconds),
            ..Self::default()
        }
    }
}

/// Shared handle to the room view. Cloning the store clones the handle;
/// subscribers observe changes through a [`watch`] channel and unsubscribe
/// by dropping their receiver.
#[derive(Clone)]
pub struct RoomStore {
    tx: Arc<watch::Sender<RoomView>>,
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RoomView::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<RoomView> {
        self.tx.subscribe()
    }

    pub fn view(&self) -> RoomView {
        self.tx.borrow().clone()
    }

    /// Merge a patch into the view. Returns whether anything changed;
    /// subscribers are only notified when it did, so applying a no-op
    /// patch is observable as a no-op.
    pub fn apply(&self, patch: RoomPatch) -> bool {
        self.tx.send_if_modified(|view| {
            let mut changed = false;

            if let Some(room) = patch.snapshot {
                if view.room.as_ref() != Some(&room) {
                    view.room = Some(room);
                    changed = true;
                }
            }

            if let Some(status) = patch.status {
                if let Some(room) = view.room.as_mut() {
                    if room.status != status {
                        room.status = status;
                        changed = true;
                    }
                }
            }

            for incoming in patch.participants {
                let Some(room) = view.room.as_mut() else {
                    break;
                };
                match room
                    .participants
                    .iter_mut()
                    .find(|p| p.user.id == incoming.user.id)
                {
                    Some(existing) => {
                        if *existing != incoming {
                            *existing = incoming;
                            changed = true;
                        }
                    }
                    None => {
                        room.participants.push(incoming);
                        changed = true;
                    }
                }
            }

            for message in patch.messages {
                if !view.messages.iter().any(|m| m.id == message.id) {
                    view.messages.push(message);
                    changed = true;
                }
            }

            if let Some(countdown) = patch.countdown {
                if view.countdown != countdown {
                    view.countdown = countdown;
                    changed = true;
                }
            }

            if let Some(time_left) = patch.time_left {
                if view.time_left != time_left {
                    view.time_left = time_left;
                    changed = true;
                }
            }

            changed
        })
    }
}
