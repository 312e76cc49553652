use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    Waiting,
    Countdown,
    InProgress,
    Completed,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomVisibility {
    Public,
    Private,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user: User,
    pub progress: u8,
    pub wpm: u32,
    pub accuracy: u32,
    pub position: Option<u32>,
    pub finish_time: Option<u32>,
}

impl Participant {
    pub fn new(user: User) -> Self {
        Self {
            user,
            progress: 0,
            wpm: 0,
            accuracy: 100,
            position: None,
            finish_time: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress >= 100
    }
}

/// Snapshot of one race room as the backend reports it.
///
/// Participants are kept in join order; `time_left` is only populated on
/// snapshots taken while the race is running, so a client that fetched the
/// room mid-race can seed its local timer from it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub room_type: RoomVisibility,
    pub text: String,
    pub time_limit: u32,
    pub status: RoomStatus,
    pub creator: User,
    pub participants: Vec<Participant>,
    pub spectators: Vec<User>,
    /// Private rooms gate joins behind this; the backend omits it from
    /// snapshots sent to non-members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
}

impl Room {
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user.id == user_id)
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator.id == user_id
    }

    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user: User,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}
