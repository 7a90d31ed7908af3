//! The 18-column ledger row and its construction from a parsed report.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::caption::ParsedFields;
use crate::clock::{ledger_date, ledger_time};
use crate::report::ReportOrigin;

/// Status written to both status columns of a duplicate report.
pub const DUPLICATE_MARKER: &str = "Возврат";

/// Literal labels of the header row.
pub const HEADER_LABELS: [&str; LedgerRow::WIDTH] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
];

/// Ledger columns in sheet order (A through R).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Review,
    DateOpened,
    TimeOpened,
    DateClosed,
    TimeClosed,
    Duration,
    Identifier,
    District,
    Address,
    Status,
    CloseReason,
    DeleteFlag,
    Comment,
    ChatId,
    MessageId,
    PhotoLink,
    SenderId,
    OriginalStatus,
}

impl Column {
    /// Columns holding checkbox controls, reset on every new row.
    pub const CHECKBOXES: [Column; 2] = [Column::Review, Column::DeleteFlag];

    /// Columns highlighted when a row is a duplicate.
    pub const DUPLICATE_ALERT: [Column; 2] = [Column::District, Column::SenderId];

    /// Zero-based column index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column letter in A1 notation.
    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }
}

/// Value of an unchecked checkbox cell.
pub const UNCHECKED: &str = "FALSE";

/// One accepted report, laid out as a ledger row.
///
/// Close-out fields (`date_closed` through `comment`) start empty and are
/// filled in by hand on the sheet later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub review: String,
    pub date_opened: String,
    pub time_opened: String,
    pub date_closed: String,
    pub time_closed: String,
    pub duration: String,
    pub identifier: String,
    pub district: String,
    pub address: String,
    pub status: String,
    pub close_reason: String,
    pub delete_flag: String,
    pub comment: String,
    pub chat_id: String,
    pub message_id: String,
    pub photo_link: String,
    pub sender_id: String,
    pub original_status: String,
}

impl LedgerRow {
    pub const WIDTH: usize = 18;

    /// Assemble the row for a newly accepted report. Pure.
    pub fn build(
        fields: &ParsedFields,
        origin: &ReportOrigin,
        photo_link: &str,
        duplicate: bool,
        now: DateTime<FixedOffset>,
    ) -> Self {
        let status = if duplicate {
            DUPLICATE_MARKER.to_string()
        } else {
            String::new()
        };
        Self {
            // Written as values too, so the anchor cell is filled even when
            // the checkbox formatting never lands.
            review: UNCHECKED.to_string(),
            date_opened: ledger_date(&now),
            time_opened: ledger_time(&now),
            identifier: fields.identifier.clone(),
            district: fields.district.clone(),
            address: fields.address.clone(),
            original_status: status.clone(),
            status,
            chat_id: origin.chat_id.to_string(),
            message_id: origin.message_id.to_string(),
            photo_link: photo_link.to_string(),
            sender_id: origin.sender_id.to_string(),
            delete_flag: UNCHECKED.to_string(),
            ..Self::default()
        }
    }

    /// Whether the row carries the duplicate marker.
    pub fn is_duplicate(&self) -> bool {
        self.status == DUPLICATE_MARKER
    }

    /// Cell values in column order.
    pub fn cells(&self) -> [&str; Self::WIDTH] {
        [
            &self.review,
            &self.date_opened,
            &self.time_opened,
            &self.date_closed,
            &self.time_closed,
            &self.duration,
            &self.identifier,
            &self.district,
            &self.address,
            &self.status,
            &self.close_reason,
            &self.delete_flag,
            &self.comment,
            &self.chat_id,
            &self.message_id,
            &self.photo_link,
            &self.sender_id,
            &self.original_status,
        ]
    }

    pub fn get(&self, column: Column) -> &str {
        self.cells()[column.index()]
    }
}
