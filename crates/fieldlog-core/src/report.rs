//! Inbound report as delivered by the chat platform.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::caption::NO_CAPTION;

/// Where a report came from and who sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOrigin {
    pub chat_id: i64,
    /// Group title, or `Чат <id>` when the platform gives none.
    pub chat_title: String,
    pub message_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
}

/// Message content the pipeline knows how to handle.
#[derive(Debug)]
pub enum ReportBody {
    Text(String),
    Photo {
        caption: Option<String>,
        /// `None` when the download failed; the report is still recorded.
        photo: Option<StagedPhoto>,
    },
}

/// One inbound report. Lives only for the duration of its handler.
#[derive(Debug)]
pub struct IncomingReport {
    pub origin: ReportOrigin,
    pub body: ReportBody,
}

impl IncomingReport {
    /// Caption text, with the sentinel standing in for a missing photo caption.
    pub fn caption(&self) -> &str {
        match &self.body {
            ReportBody::Text(text) => text,
            ReportBody::Photo { caption, .. } => caption.as_deref().unwrap_or(NO_CAPTION),
        }
    }

    pub fn is_photo(&self) -> bool {
        matches!(self.body, ReportBody::Photo { .. })
    }

    /// Take the staged photo out of the report, leaving `None` behind.
    pub fn take_photo(&mut self) -> Option<StagedPhoto> {
        match &mut self.body {
            ReportBody::Photo { photo, .. } => photo.take(),
            ReportBody::Text(_) => None,
        }
    }
}

/// Photo bytes staged in a temporary file.
///
/// The file is removed when the value is dropped, whether or not the upload
/// that consumed it succeeded.
#[derive(Debug)]
pub struct StagedPhoto {
    file: NamedTempFile,
    size: u64,
}

impl StagedPhoto {
    /// Stage `bytes` in a fresh temporary file tagged with the message id.
    pub fn from_bytes(bytes: &[u8], message_id: i64) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("photo_{message_id}_"))
            .suffix(".jpg")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            file,
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Human-readable sender label: full name, first name, `@handle`, or `User_<id>`.
pub fn display_name(
    first_name: Option<&str>,
    last_name: Option<&str>,
    username: Option<&str>,
    id: i64,
) -> String {
    fn non_empty(s: Option<&str>) -> Option<&str> {
        s.filter(|s| !s.is_empty())
    }
    match (non_empty(first_name), non_empty(last_name), non_empty(username)) {
        (Some(first), Some(last), _) => format!("{first} {last}"),
        (Some(first), None, _) => first.to_string(),
        (None, _, Some(handle)) => format!("@{handle}"),
        (None, _, None) => format!("User_{id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> ReportOrigin {
        ReportOrigin {
            chat_id: 100,
            chat_title: "Field team".into(),
            message_id: 7,
            sender_id: 42,
            sender_name: "Ivan".into(),
        }
    }

    #[test]
    fn display_name_variants() {
        assert_eq!(display_name(Some("Ivan"), Some("Petrov"), Some("ip"), 1), "Ivan Petrov");
        assert_eq!(display_name(Some("Ivan"), None, Some("ip"), 1), "Ivan");
        assert_eq!(display_name(None, Some("Petrov"), Some("ip"), 1), "@ip");
        assert_eq!(display_name(Some(""), None, None, 99), "User_99");
    }

    #[test]
    fn photo_without_caption_uses_sentinel() {
        let report = IncomingReport {
            origin: origin(),
            body: ReportBody::Photo {
                caption: None,
                photo: None,
            },
        };
        assert_eq!(report.caption(), NO_CAPTION);
        assert!(report.is_photo());
    }

    #[test]
    fn staged_photo_is_removed_on_drop() {
        let photo = StagedPhoto::from_bytes(b"\xff\xd8\xff", 7).unwrap();
        let path = photo.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(photo.size(), 3);
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("photo_7_"));
        drop(photo);
        assert!(!path.exists());
    }

    #[test]
    fn take_photo_leaves_none() {
        let mut report = IncomingReport {
            origin: origin(),
            body: ReportBody::Photo {
                caption: Some("TT-1\nArbat 1".into()),
                photo: Some(StagedPhoto::from_bytes(b"jpg", 7).unwrap()),
            },
        };
        assert!(report.take_photo().is_some());
        assert!(report.take_photo().is_none());
    }
}
