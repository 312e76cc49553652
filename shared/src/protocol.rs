//! Push-channel wire protocol: a closed set of tagged events, validated by
//! serde at the boundary. Payload fields use the backend's camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::model::ChatMessage;

/// Events the client emits to the server.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
        is_spectator: bool,
    },
    LeaveRoom {
        room_id: String,
    },
    StartRace {
        room_id: String,
    },
    UpdateProgress {
        room_id: String,
        user_id: String,
        progress: u8,
        wpm: u32,
        accuracy: u32,
    },
    ParticipantFinished {
        room_id: String,
        user_id: String,
        finish_time: u32,
    },
    SendMessage {
        room_id: String,
        message: String,
    },
}

/// Events the server pushes to the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub enum ServerEvent {
    CountdownStarted {
        count: u32,
    },
    CountdownUpdate {
        count: u32,
    },
    CompetitionStarted,
    CompetitionEnded,
    ParticipantProgress {
        user_id: String,
        progress: u8,
        wpm: u32,
        accuracy: u32,
        position: Option<u32>,
        finish_time: Option<u32>,
    },
    NewMessage {
        message: ChatMessage,
    },
}
