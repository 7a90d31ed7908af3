//! Per-message ingestion: parse, classify, check for duplicates, archive the
//! photo, build the row, append it, reply.
//!
//! Every failure is handled here at message granularity; nothing escapes to
//! the polling loop.

use std::sync::Arc;

use async_trait::async_trait;
use fieldlog_core::{Clock, DistrictVocabulary, IncomingReport, LedgerRow, parse_report, reply};
use fieldlog_store::{DuplicateDetector, LedgerWriter, PhotoArchiver, StoreError};
use tracing::{error, info, warn};

/// Outbound channel for replies to reporters.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, text: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl Notifier for fieldlog_sync::TelegramClient {
    async fn notify(&self, user_id: i64, text: &str) -> anyhow::Result<()> {
        self.send_message(user_id, text).await?;
        Ok(())
    }
}

/// What became of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Caption lacked a required line; nothing written.
    Rejected,
    /// Row appended at `position`.
    Recorded { position: usize, duplicate: bool },
    /// The ledger write failed; the report is lost.
    Dropped,
}

pub struct Pipeline {
    vocabulary: DistrictVocabulary,
    detector: Arc<dyn DuplicateDetector>,
    archiver: PhotoArchiver,
    writer: LedgerWriter,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        vocabulary: DistrictVocabulary,
        detector: Arc<dyn DuplicateDetector>,
        archiver: PhotoArchiver,
        writer: LedgerWriter,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            vocabulary,
            detector,
            archiver,
            writer,
            notifier,
            clock,
        }
    }

    pub async fn handle(&self, mut report: IncomingReport) -> Outcome {
        let origin = report.origin.clone();
        info!(
            chat = %origin.chat_title,
            sender = %origin.sender_name,
            message_id = origin.message_id,
            photo = report.is_photo(),
            caption = %preview(report.caption()),
            "report received"
        );

        let fields = match parse_report(report.caption(), &self.vocabulary) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(message_id = origin.message_id, error = %e, "report rejected");
                self.reply(origin.sender_id, &reply::missing_fields(report.is_photo()))
                    .await;
                return Outcome::Rejected;
            }
        };

        let duplicate = self
            .detector
            .is_duplicate(&fields.identifier, &fields.address)
            .await;

        let photo_link = match report.take_photo() {
            Some(photo) => self.archiver.archive(photo, origin.message_id).await,
            None => {
                if report.is_photo() {
                    warn!(message_id = origin.message_id, "photo unavailable; recording without it");
                }
                String::new()
            }
        };

        let row = LedgerRow::build(&fields, &origin, &photo_link, duplicate, self.clock.now());
        let position = match self.writer.append(row, duplicate).await {
            Ok(position) => position,
            Err(StoreError::Unformatted { position, .. }) => {
                warn!(position, "row recorded without formatting");
                position
            }
            Err(e) => {
                error!(
                    message_id = origin.message_id,
                    sender = origin.sender_id,
                    error = %e,
                    "report dropped: ledger write failed"
                );
                return Outcome::Dropped;
            }
        };

        self.detector
            .remember(&fields.identifier, &fields.address)
            .await;
        let text = reply::acknowledgment(&fields, &photo_link, duplicate, &origin.chat_title);
        self.reply(origin.sender_id, &text).await;
        Outcome::Recorded {
            position,
            duplicate,
        }
    }

    async fn reply(&self, user_id: i64, text: &str) {
        if let Err(e) = self.notifier.notify(user_id, text).await {
            error!(user_id, error = %e, "reply not delivered");
        }
    }
}

/// First 100 characters of a caption, for log lines.
fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}
