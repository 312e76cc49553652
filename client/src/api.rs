//! Request/response side of the backend boundary. Every response arrives in
//! a `{success, message, data}` envelope; a `success: false` body becomes
//! [`ClientError::Rejected`] and a 404 becomes [`ClientError::RoomNotFound`].

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::model::{ChatMessage, Room};

use crate::error::{ClientError, Result};

// No `#[serde(default)]` on the options: serde already treats a missing
// field as `None`, and the attribute would put a `Default` bound on `T`.
#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    message: Option<String>,
    data: Option<T>,
}

/// Per-update progress report, mirrored on both transports.
#[derive(Serialize, Clone, Copy, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub progress: u8,
    pub wpm: u32,
    pub accuracy: u32,
    pub completed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishBody {
    finish_time: u32,
}

#[derive(Deserialize)]
struct FinishData {
    position: u32,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    text: &'a str,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<Option<T>> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::RoomNotFound);
        }
        let envelope: Envelope<T> = response.json().await?;
        if envelope.success {
            Ok(envelope.data)
        } else {
            Err(ClientError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            ))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>> {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::decode(request.send().await?).await
    }

    fn require<T>(data: Option<T>) -> Result<T> {
        data.ok_or_else(|| ClientError::Protocol("response envelope missing data".to_string()))
    }

    /// `GET /rooms/{id}` — authoritative room snapshot.
    pub async fn fetch_room(&self, room_id: &str) -> Result<Room> {
        Self::require(self.get(&format!("/rooms/{room_id}")).await?)
    }

    /// `POST /rooms/{id}/progress` — report local typing progress.
    pub async fn report_progress(&self, room_id: &str, report: &ProgressReport) -> Result<()> {
        self.post::<_, serde_json::Value>(&format!("/rooms/{room_id}/progress"), Some(report))
            .await?;
        Ok(())
    }

    /// `POST /rooms/{id}/finish` — claim completion; the server answers with
    /// the assigned rank, in whatever order it accepted the finish requests.
    pub async fn finish(&self, room_id: &str, finish_time: u32) -> Result<u32> {
        let data: Option<FinishData> = self
            .post(
                &format!("/rooms/{room_id}/finish"),
                Some(&FinishBody { finish_time }),
            )
            .await?;
        Ok(Self::require(data)?.position)
    }

    /// `POST /rooms/{id}/start` — creator only.
    pub async fn start_race(&self, room_id: &str) -> Result<()> {
        self.post::<(), serde_json::Value>(&format!("/rooms/{room_id}/start"), None)
            .await?;
        Ok(())
    }

    /// `POST /rooms/{id}/end` — creator only.
    pub async fn end_race(&self, room_id: &str) -> Result<()> {
        self.post::<(), serde_json::Value>(&format!("/rooms/{room_id}/end"), None)
            .await?;
        Ok(())
    }

    /// `GET /rooms/{id}/messages` — chat backlog.
    pub async fn fetch_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(self
            .get(&format!("/rooms/{room_id}/messages"))
            .await?
            .unwrap_or_default())
    }

    /// `POST /rooms/{id}/messages` — send chat; the server may echo the
    /// stored message back.
    pub async fn send_message(&self, room_id: &str, text: &str) -> Result<Option<ChatMessage>> {
        self.post(
            &format!("/rooms/{room_id}/messages"),
            Some(&MessageBody { text }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `Room` derives no `Default`; the envelope must still decode when the
    // backend omits `message` and `data`.
    #[test]
    fn envelope_tolerates_missing_fields() {
        let envelope: Envelope<Room> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(envelope.success);
        assert!(envelope.message.is_none());
        assert!(envelope.data.is_none());
    }

    #[test]
    fn envelope_decodes_a_rejection() {
        let envelope: Envelope<FinishData> =
            serde_json::from_str(r#"{"success":false,"message":"race not running"}"#).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("race not running"));
    }
}
