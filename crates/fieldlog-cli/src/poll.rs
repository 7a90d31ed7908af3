//! Telegram long-polling: startup chat check, update loop, and conversion of
//! platform messages into [`IncomingReport`]s.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fieldlog_core::{
    IncomingReport, NO_CAPTION, ReportBody, ReportOrigin, display_name, parse_caption,
};
use fieldlog_sync::TelegramClient;
use fieldlog_sync::telegram::Message;
use tracing::{debug, error, info, warn};

use crate::pipeline::Pipeline;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Resolve each configured chat id. Returns the accessible ones with their
/// titles; inaccessible ids are logged and left out.
pub async fn verify_chats(telegram: &TelegramClient, chat_ids: &[i64]) -> HashMap<i64, String> {
    let mut chats = HashMap::new();
    for &chat_id in chat_ids {
        match telegram.get_chat(chat_id).await {
            Ok(chat) => {
                let title = chat
                    .title
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| format!("Чат {chat_id}"));
                info!(chat_id, title = %title, kind = %chat.kind, "chat accessible");
                chats.insert(chat_id, title);
            }
            Err(e) => error!(chat_id, error = %e, "chat not accessible; skipping"),
        }
    }
    chats
}

/// What a message carries, before any photo is fetched.
#[derive(Debug, PartialEq, Eq)]
enum Payload<'a> {
    Text(&'a str),
    Photo {
        caption: Option<&'a str>,
        file_id: Option<&'a str>,
    },
}

fn payload(msg: &Message) -> Option<Payload<'_>> {
    if msg.photo.is_some() {
        return Some(Payload::Photo {
            caption: msg.caption.as_deref(),
            file_id: msg.largest_photo().map(|p| p.file_id.as_str()),
        });
    }
    msg.text.as_deref().map(Payload::Text)
}

fn origin(msg: &Message, chat_title: &str) -> ReportOrigin {
    let (sender_id, sender_name) = match &msg.from {
        Some(user) => (
            user.id,
            display_name(
                Some(user.first_name.as_str()),
                user.last_name.as_deref(),
                user.username.as_deref(),
                user.id,
            ),
        ),
        None => (0, display_name(None, None, None, 0)),
    };
    ReportOrigin {
        chat_id: msg.chat.id,
        chat_title: chat_title.to_string(),
        message_id: msg.message_id,
        sender_id,
        sender_name,
    }
}

/// Turn a message into a report, downloading the largest photo rendition.
///
/// `None` for messages that are neither text nor photo. The photo is only
/// fetched when the caption carries both required lines; a report that will
/// be rejected, or whose download fails, comes back without it.
pub async fn to_report(
    telegram: &TelegramClient,
    msg: &Message,
    chat_title: &str,
) -> Option<IncomingReport> {
    let origin = origin(msg, chat_title);
    let body = match payload(msg)? {
        Payload::Text(text) => ReportBody::Text(text.to_string()),
        Payload::Photo { caption, file_id } => {
            let photo = match file_id.filter(|_| caption_complete(caption)) {
                Some(file_id) => match telegram.download_photo(file_id, msg.message_id).await {
                    Ok(photo) => Some(photo),
                    Err(e) => {
                        error!(message_id = msg.message_id, error = %e, "photo download failed");
                        None
                    }
                },
                None => None,
            };
            ReportBody::Photo {
                caption: caption.map(String::from),
                photo,
            }
        }
    };
    Some(IncomingReport { origin, body })
}

/// Whether a photo caption has both an identifier and an address line.
fn caption_complete(caption: Option<&str>) -> bool {
    let (identifier, address) = parse_caption(caption.unwrap_or(NO_CAPTION));
    !identifier.is_empty() && !address.is_empty()
}

/// First offset to poll from: just past the newest update pending at startup.
fn start_offset(latest: Option<i64>) -> i64 {
    latest.map_or(0, |id| id + 1)
}

/// Offset that confirms `update_id` and everything before it.
fn advance(offset: i64, update_id: i64) -> i64 {
    offset.max(update_id + 1)
}

/// Long-polling loop feeding the pipeline, one task per message.
pub struct Poller {
    telegram: Arc<TelegramClient>,
    pipeline: Arc<Pipeline>,
    chats: HashMap<i64, String>,
}

impl Poller {
    pub fn new(
        telegram: Arc<TelegramClient>,
        pipeline: Arc<Pipeline>,
        chats: HashMap<i64, String>,
    ) -> Self {
        Self {
            telegram,
            pipeline,
            chats,
        }
    }

    /// Runs until the process is stopped; transport errors are retried.
    pub async fn run(&self) {
        let mut offset = self.skip_backlog().await;
        info!(chats = self.chats.len(), offset, "polling started");
        loop {
            let updates = match self.telegram.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed; retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };
            for update in updates {
                offset = advance(offset, update.update_id);
                match update.message {
                    Some(msg) => self.dispatch(msg),
                    None => debug!(update_id = update.update_id, "non-message update ignored"),
                }
            }
        }
    }

    /// Messages queued while the process was down are not reports to record
    /// now; start past them.
    async fn skip_backlog(&self) -> i64 {
        loop {
            match self.telegram.latest_update_id().await {
                Ok(latest) => {
                    if let Some(id) = latest {
                        info!(last_update_id = id, "skipping updates queued before startup");
                    }
                    return start_offset(latest);
                }
                Err(e) => {
                    warn!(error = %e, "could not read pending updates; retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    fn dispatch(&self, msg: Message) {
        let Some(title) = self.chats.get(&msg.chat.id).cloned() else {
            debug!(chat_id = msg.chat.id, "message from unmonitored chat ignored");
            return;
        };
        let telegram = self.telegram.clone();
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            match to_report(&telegram, &msg, &title).await {
                Some(report) => {
                    pipeline.handle(report).await;
                }
                None => debug!(message_id = msg.message_id, "unsupported message kind ignored"),
            }
        });
    }
}
