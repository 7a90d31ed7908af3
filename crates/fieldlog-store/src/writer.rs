//! Serialized appends to the ledger.
//!
//! Finding the next free row is a read followed by a write, so two appends
//! running at once could both pick the same row. All appends therefore go
//! through one writer task fed by a channel; handlers hold a cheap
//! [`LedgerWriter`] handle and await their own row number.

use std::sync::Arc;

use fieldlog_core::{Column, HEADER_LABELS, LedgerRow};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{CellFormat, LedgerBackend, StoreError};

struct AppendJob {
    row: LedgerRow,
    duplicate: bool,
    reply: oneshot::Sender<Result<usize, StoreError>>,
}

/// Handle to the single ledger writer task.
#[derive(Clone)]
pub struct LedgerWriter {
    tx: mpsc::Sender<AppendJob>,
}

impl LedgerWriter {
    /// Start the writer task. It runs until every handle is dropped.
    pub fn spawn(ledger: Arc<dyn LedgerBackend>, queue_depth: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<AppendJob>(queue_depth.max(1));
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let result = append_row(ledger.as_ref(), &job.row, job.duplicate).await;
                // The handler may have gone away; the row is written either way.
                let _ = job.reply.send(result);
            }
            info!("ledger writer stopped");
        });
        (Self { tx }, handle)
    }

    /// Append `row` and return the 1-based position it was written to.
    pub async fn append(&self, row: LedgerRow, duplicate: bool) -> Result<usize, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AppendJob {
                row,
                duplicate,
                reply,
            })
            .await
            .map_err(|_| StoreError::WriterClosed)?;
        rx.await.map_err(|_| StoreError::WriterClosed)?
    }
}

/// Formatting applied to a freshly written row.
pub fn row_formats(position: usize, duplicate: bool) -> Vec<CellFormat> {
    let mut directives: Vec<CellFormat> = Column::CHECKBOXES
        .iter()
        .map(|&column| CellFormat::Checkbox {
            row: position,
            column,
        })
        .collect();
    if duplicate {
        directives.extend(Column::DUPLICATE_ALERT.iter().map(|&column| {
            CellFormat::AlertText {
                row: position,
                column,
            }
        }));
    }
    directives
}

/// Append one row without serialization. Call only from the writer task.
///
/// The row goes right after the last non-empty anchor cell. Row 1 belongs to
/// the header: on a sheet with an empty anchor column the header is written
/// first and the row lands at 2. A failure after the row is written leaves
/// the row in place unformatted; nothing is rolled back.
pub async fn append_row(
    ledger: &dyn LedgerBackend,
    row: &LedgerRow,
    duplicate: bool,
) -> Result<usize, StoreError> {
    let anchor_len = ledger.anchor_len().await?;
    if anchor_len == 0
        && let Err(e) = ensure_header(ledger).await
    {
        warn!(error = %e, "ledger header missing and could not be written");
    }
    let position = anchor_len.max(1) + 1;
    if let Err(e) = ledger.write_row(position, &row.cells()).await {
        error!(position, error = %e, "ledger row write failed");
        return Err(e);
    }
    if let Err(e) = ledger
        .format_cells(&row_formats(position, duplicate))
        .await
    {
        error!(position, error = %e, "ledger row formatting failed");
        return Err(StoreError::Unformatted {
            position,
            source: Box::new(e),
        });
    }
    info!(
        position,
        sender = %row.sender_id,
        duplicate,
        "report recorded"
    );
    Ok(position)
}

/// Write the A-R header labels if row 1 is empty. Returns whether it wrote.
pub async fn ensure_header(ledger: &dyn LedgerBackend) -> Result<bool, StoreError> {
    if !ledger.header().await?.is_empty() {
        return Ok(false);
    }
    ledger.write_row(1, &HEADER_LABELS).await?;
    info!("ledger header written");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryLedger;
    use fieldlog_core::UNCHECKED;

    fn row(identifier: &str, sender: &str) -> LedgerRow {
        LedgerRow {
            identifier: identifier.into(),
            address: "Arbat 1".into(),
            sender_id: sender.into(),
            ..LedgerRow::default()
        }
    }

    #[tokio::test]
    async fn sequential_appends_follow_last_row() {
        let ledger = Arc::new(MemoryLedger::with_reports(&[("1", "a"), ("2", "b")]));
        let (writer, _task) = LedgerWriter::spawn(ledger.clone(), 8);
        for (i, id) in ["10", "11", "12"].iter().enumerate() {
            let position = writer.append(row(id, "42"), false).await.unwrap();
            assert_eq!(position, 4 + i);
            assert_eq!(ledger.row(position).unwrap()[Column::Identifier.index()], *id);
        }
    }

    #[tokio::test]
    async fn checkboxes_reset_on_each_row() {
        let ledger = Arc::new(MemoryLedger::with_reports(&[]));
        let (writer, _task) = LedgerWriter::spawn(ledger.clone(), 8);
        writer.append(row("10", "42"), false).await.unwrap();
        writer.append(row("11", "42"), false).await.unwrap();

        let formats = ledger.formats();
        assert_eq!(
            formats,
            vec![
                CellFormat::Checkbox { row: 2, column: Column::Review },
                CellFormat::Checkbox { row: 2, column: Column::DeleteFlag },
                CellFormat::Checkbox { row: 3, column: Column::Review },
                CellFormat::Checkbox { row: 3, column: Column::DeleteFlag },
            ]
        );
        let written = ledger.row(3).unwrap();
        assert_eq!(written[Column::Review.index()], "FALSE");
        assert_eq!(written[Column::DeleteFlag.index()], "FALSE");
    }

    #[tokio::test]
    async fn duplicate_rows_get_alert_formatting() {
        let ledger = Arc::new(MemoryLedger::with_reports(&[]));
        let (writer, _task) = LedgerWriter::spawn(ledger.clone(), 8);
        writer.append(row("10", "42"), true).await.unwrap();

        let alerts: Vec<Column> = ledger
            .formats()
            .into_iter()
            .filter(|f| matches!(f, CellFormat::AlertText { .. }))
            .map(|f| f.column())
            .collect();
        assert_eq!(alerts, vec![Column::District, Column::SenderId]);
    }

    #[test]
    fn non_duplicate_rows_get_no_alert() {
        assert!(
            row_formats(5, false)
                .iter()
                .all(|f| matches!(f, CellFormat::Checkbox { row: 5, .. }))
        );
        assert_eq!(row_formats(5, true).len(), 4);
    }

    #[tokio::test]
    async fn concurrent_appends_get_distinct_rows() {
        let ledger = Arc::new(MemoryLedger::with_reports(&[]));
        let (writer, _task) = LedgerWriter::spawn(ledger.clone(), 2);
        let mut handles = Vec::new();
        for i in 0..20 {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                writer.append(row(&i.to_string(), "42"), false).await.unwrap()
            }));
        }
        let mut positions = Vec::new();
        for h in handles {
            positions.push(h.await.unwrap());
        }
        positions.sort_unstable();
        assert_eq!(positions, (2..22).collect::<Vec<_>>());
        assert_eq!(ledger.rows().len(), 21);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let ledger = Arc::new(MemoryLedger::with_reports(&[]));
        ledger.fail_writes(true);
        let (writer, _task) = LedgerWriter::spawn(ledger.clone(), 8);
        assert!(writer.append(row("10", "42"), false).await.is_err());
        assert_eq!(ledger.rows().len(), 1);
    }

    #[tokio::test]
    async fn unformatted_row_keeps_its_anchor() {
        let ledger = Arc::new(MemoryLedger::with_reports(&[]));
        let failing = FailFormat(ledger.clone());
        let built = LedgerRow {
            review: UNCHECKED.into(),
            delete_flag: UNCHECKED.into(),
            ..row("11", "42")
        };
        let err = append_row(&failing, &built, false).await.unwrap_err();
        assert!(matches!(err, StoreError::Unformatted { position: 2, .. }));
        assert_eq!(ledger.row(2).unwrap()[Column::Review.index()], UNCHECKED);

        // The anchor cell came with the values, so the next row goes below.
        let position = append_row(ledger.as_ref(), &row("12", "42"), false).await.unwrap();
        assert_eq!(position, 3);
        assert_eq!(ledger.row(2).unwrap()[Column::Identifier.index()], "11");
    }

    #[tokio::test]
    async fn cleared_rows_are_reused() {
        let ledger = Arc::new(MemoryLedger::with_reports(&[("1", "a")]));
        let (writer, _task) = LedgerWriter::spawn(ledger.clone(), 8);
        assert_eq!(writer.append(row("10", "42"), false).await.unwrap(), 3);

        // Row 3 is blanked by hand on the sheet.
        ledger.write_row(3, &[""; LedgerRow::WIDTH]).await.unwrap();
        assert_eq!(ledger.anchor_len().await.unwrap(), 2);

        assert_eq!(writer.append(row("11", "42"), false).await.unwrap(), 3);
        assert_eq!(ledger.row(3).unwrap()[Column::Identifier.index()], "11");
    }

    #[tokio::test]
    async fn empty_sheet_gets_header_before_first_row() {
        let ledger = Arc::new(MemoryLedger::new());
        let (writer, _task) = LedgerWriter::spawn(ledger.clone(), 8);
        assert_eq!(writer.append(row("10", "42"), false).await.unwrap(), 2);
        assert_eq!(ledger.row(1).unwrap()[0], "A");
        assert_eq!(ledger.row(2).unwrap()[Column::Identifier.index()], "10");
    }

    #[tokio::test]
    async fn row_one_stays_free_when_header_cannot_be_written() {
        let ledger = Arc::new(MemoryLedger::new());
        let header_refused = NoHeader(ledger.clone());
        let position = append_row(&header_refused, &row("10", "42"), false).await.unwrap();
        assert_eq!(position, 2);
        assert!(ledger.row(1).is_none_or(|r| r.iter().all(String::is_empty)));

        // The detector skips row 1 only, so the report is still found.
        let detector = crate::LedgerScan::new(ledger.clone());
        assert!(crate::DuplicateDetector::is_duplicate(&detector, "10", "Arbat 1").await);
    }

    /// Refuses writes to row 1.
    struct NoHeader(Arc<MemoryLedger>);

    #[async_trait::async_trait]
    impl LedgerBackend for NoHeader {
        async fn anchor_len(&self) -> Result<usize, StoreError> {
            self.0.anchor_len().await
        }
        async fn key_columns(&self) -> Result<Vec<Vec<String>>, StoreError> {
            self.0.key_columns().await
        }
        async fn header(&self) -> Result<Vec<String>, StoreError> {
            self.0.header().await
        }
        async fn write_row(&self, position: usize, cells: &[&str]) -> Result<(), StoreError> {
            if position == 1 {
                return Err(StoreError::Other("header range protected".into()));
            }
            self.0.write_row(position, cells).await
        }
        async fn format_cells(&self, directives: &[CellFormat]) -> Result<(), StoreError> {
            self.0.format_cells(directives).await
        }
    }

    struct FailFormat(Arc<MemoryLedger>);

    #[async_trait::async_trait]
    impl LedgerBackend for FailFormat {
        async fn anchor_len(&self) -> Result<usize, StoreError> {
            self.0.anchor_len().await
        }
        async fn key_columns(&self) -> Result<Vec<Vec<String>>, StoreError> {
            self.0.key_columns().await
        }
        async fn header(&self) -> Result<Vec<String>, StoreError> {
            self.0.header().await
        }
        async fn write_row(&self, position: usize, cells: &[&str]) -> Result<(), StoreError> {
            self.0.write_row(position, cells).await
        }
        async fn format_cells(&self, _: &[CellFormat]) -> Result<(), StoreError> {
            Err(StoreError::Other("batch update rejected".into()))
        }
    }

    #[tokio::test]
    async fn closed_writer() {
        let ledger = Arc::new(MemoryLedger::new());
        let (writer, task) = LedgerWriter::spawn(ledger, 1);
        task.abort();
        let _ = task.await;
        assert!(matches!(
            writer.append(row("1", "1"), false).await,
            Err(StoreError::WriterClosed)
        ));
    }

    #[tokio::test]
    async fn header_written_once() {
        let ledger = MemoryLedger::new();
        assert!(ensure_header(&ledger).await.unwrap());
        assert!(!ensure_header(&ledger).await.unwrap());
        assert_eq!(ledger.row(1).unwrap().len(), LedgerRow::WIDTH);
        assert_eq!(ledger.row(1).unwrap()[17], "R");
    }
}
