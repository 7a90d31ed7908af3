//! Telegram Bot API client: long polling, replies, chat lookup and photo
//! download.
//!
//! Request URLs embed the bot token, so transport errors are stripped of
//! their URL before they can reach a log line.

use std::time::Duration;

use fieldlog_core::StagedPhoto;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use crate::SyncError;

const API_BASE: &str = "https://api.telegram.org";
/// Extra time on top of the long-poll timeout before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub poll_timeout_secs: u64,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// Available sizes of a photo, smallest first.
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

impl Message {
    /// The largest rendition of the attached photo, if any.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo
            .as_deref()?
            .iter()
            .max_by_key(|p| (p.width as u64 * p.height as u64, p.file_size.unwrap_or(0)))
    }
}

/// Client for one bot.
pub struct TelegramClient {
    client: reqwest::Client,
    config: TelegramConfig,
}

fn redact(e: reqwest::Error) -> SyncError {
    SyncError::Http(e.without_url())
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.config.bot_token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, SyncError> {
        let mut request = self.client.post(self.method_url(method)).json(&params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let resp = request.send().await.map_err(redact)?;
        let status = resp.status();
        let body: ApiResponse<T> = resp.json().await.map_err(redact)?;
        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(SyncError::Telegram(format!(
                "{method} failed ({status}): {}",
                description.unwrap_or_else(|| "no description".into())
            ))),
        }
    }

    /// Long-poll for message updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, SyncError> {
        self.fetch_updates(offset, self.config.poll_timeout_secs).await
    }

    /// Id of the newest pending update, without waiting for new ones.
    ///
    /// Does not confirm anything; the next [`get_updates`](Self::get_updates)
    /// call with a later offset does.
    pub async fn latest_update_id(&self) -> Result<Option<i64>, SyncError> {
        let updates = self.fetch_updates(-1, 0).await?;
        Ok(updates.iter().map(|u| u.update_id).max())
    }

    async fn fetch_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, SyncError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout,
                "allowed_updates": ["message"],
            }),
            Some(Duration::from_secs(timeout) + POLL_GRACE),
        )
        .await
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), SyncError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                json!({ "chat_id": chat_id, "text": text }),
                None,
            )
            .await?;
        info!(chat_id, "message sent");
        Ok(())
    }

    pub async fn get_chat(&self, chat_id: i64) -> Result<Chat, SyncError> {
        self.call("getChat", json!({ "chat_id": chat_id }), None)
            .await
    }

    /// Download a file by id into a staged temporary file.
    pub async fn download_photo(
        &self,
        file_id: &str,
        message_id: i64,
    ) -> Result<StagedPhoto, SyncError> {
        let file: File = self
            .call("getFile", json!({ "file_id": file_id }), None)
            .await?;
        let path = file
            .file_path
            .ok_or_else(|| SyncError::Telegram("getFile returned no file_path".into()))?;
        let url = format!("{API_BASE}/file/bot{}/{path}", self.config.bot_token);
        let resp = self.client.get(url).send().await.map_err(redact)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Server {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let bytes = resp.bytes().await.map_err(redact)?;
        let photo = StagedPhoto::from_bytes(&bytes, message_id)?;
        debug!(message_id, size = photo.size(), "photo downloaded");
        Ok(photo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPDATES: &str = r#"{
        "ok": true,
        "result": [
            {
                "update_id": 501,
                "message": {
                    "message_id": 812,
                    "from": {"id": 42, "is_bot": false, "first_name": "Ivan", "username": "ivan_p"},
                    "chat": {"id": -1003849809374, "title": "Field team", "type": "supergroup"},
                    "date": 1771481100,
                    "text": "TT-551\nZAO, Lenina 5"
                }
            },
            {
                "update_id": 502,
                "message": {
                    "message_id": 813,
                    "from": {"id": 43, "is_bot": false, "first_name": "Olga"},
                    "chat": {"id": -1003849809374, "title": "Field team", "type": "supergroup"},
                    "date": 1771481160,
                    "photo": [
                        {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 67, "file_size": 1200},
                        {"file_id": "large", "file_unique_id": "l", "width": 1280, "height": 960, "file_size": 98000},
                        {"file_id": "medium", "file_unique_id": "m", "width": 320, "height": 240, "file_size": 14000}
                    ],
                    "caption": "TT-551\nZAO, Lenina 5"
                }
            },
            {"update_id": 503, "edited_message": {"message_id": 1}}
        ]
    }"#;

    #[test]
    fn parses_updates() {
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(UPDATES).unwrap();
        assert!(resp.ok);
        let updates = resp.result.unwrap();
        assert_eq!(updates.len(), 3);

        let text = updates[0].message.as_ref().unwrap();
        assert_eq!(text.text.as_deref(), Some("TT-551\nZAO, Lenina 5"));
        assert_eq!(text.chat.title.as_deref(), Some("Field team"));
        assert_eq!(text.chat.kind, "supergroup");
        let from = text.from.as_ref().unwrap();
        assert_eq!(from.id, 42);
        assert_eq!(from.username.as_deref(), Some("ivan_p"));

        let photo = updates[1].message.as_ref().unwrap();
        assert!(photo.text.is_none());
        assert_eq!(photo.largest_photo().unwrap().file_id, "large");

        assert!(updates[2].message.is_none());
    }

    #[test]
    fn error_response() {
        let resp: ApiResponse<Chat> = serde_json::from_str(
            r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#,
        )
        .unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[test]
    fn no_photo_no_largest() {
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(UPDATES).unwrap();
        let updates = resp.result.unwrap();
        assert!(updates[0].message.as_ref().unwrap().largest_photo().is_none());
    }

    #[test]
    fn method_url_embeds_token() {
        let client = TelegramClient::new(
            reqwest::Client::new(),
            TelegramConfig {
                bot_token: "123:abc".into(),
                poll_timeout_secs: 30,
            },
        );
        assert_eq!(
            client.method_url("getUpdates"),
            "https://api.telegram.org/bot123:abc/getUpdates"
        );
    }
}
