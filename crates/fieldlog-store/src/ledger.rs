//! The ledger seam and an in-memory ledger.
//!
//! Rows are addressed by 1-based sheet position; row 1 is the header.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fieldlog_core::{Column, LedgerRow, UNCHECKED};

use crate::StoreError;

/// A cell-level formatting directive for a freshly written row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    /// Turn the cell into an unchecked checkbox.
    Checkbox { row: usize, column: Column },
    /// Bold red text, flagging a duplicate.
    AlertText { row: usize, column: Column },
}

impl CellFormat {
    pub fn row(&self) -> usize {
        match self {
            Self::Checkbox { row, .. } | Self::AlertText { row, .. } => *row,
        }
    }

    pub fn column(&self) -> Column {
        match self {
            Self::Checkbox { column, .. } | Self::AlertText { column, .. } => *column,
        }
    }
}

/// Tabular store holding one [`LedgerRow`] per accepted report.
///
/// Implementations carry no locking of their own: callers that append must
/// go through [`LedgerWriter`](crate::LedgerWriter).
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Index of the last non-empty cell in the anchor column (A), header
    /// included. `0` for an empty sheet.
    async fn anchor_len(&self) -> Result<usize, StoreError>;

    /// Columns G through I (identifier, district, address) of every row,
    /// header included. Trailing empty cells of a row may be omitted.
    async fn key_columns(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// Cells of row 1.
    async fn header(&self) -> Result<Vec<String>, StoreError>;

    /// Overwrite row `position` with `cells`, starting at column A.
    async fn write_row(&self, position: usize, cells: &[&str]) -> Result<(), StoreError>;

    /// Apply formatting directives in one batch.
    async fn format_cells(&self, directives: &[CellFormat]) -> Result<(), StoreError>;
}

// ── In-memory ledger ──

#[derive(Default)]
struct MemoryState {
    rows: Vec<Vec<String>>,
    formats: Vec<CellFormat>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Ledger held in memory, with the read/trim behaviour of a spreadsheet
/// values API and switchable failures.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing rows (row 1 first).
    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        let ledger = Self::default();
        ledger.state().rows = rows;
        ledger
    }

    /// A ledger with a header and one data row per `(identifier, address)`.
    pub fn with_reports(reports: &[(&str, &str)]) -> Self {
        let mut rows = vec![fieldlog_core::HEADER_LABELS.map(String::from).to_vec()];
        for (identifier, address) in reports {
            let row = LedgerRow {
                review: UNCHECKED.into(),
                identifier: identifier.to_string(),
                address: address.to_string(),
                delete_flag: UNCHECKED.into(),
                ..LedgerRow::default()
            };
            rows.push(row.cells().map(String::from).to_vec());
        }
        Self::with_rows(rows)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Snapshot of all rows.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.state().rows.clone()
    }

    /// Cells of the 1-based row `position`, if present.
    pub fn row(&self, position: usize) -> Option<Vec<String>> {
        position
            .checked_sub(1)
            .and_then(|i| self.state().rows.get(i).cloned())
    }

    /// Every formatting directive applied so far, in order.
    pub fn formats(&self) -> Vec<CellFormat> {
        self.state().formats.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_read(state: &MemoryState) -> Result<(), StoreError> {
        if state.fail_reads {
            return Err(StoreError::Other("ledger read refused".into()));
        }
        Ok(())
    }

    fn check_write(state: &MemoryState) -> Result<(), StoreError> {
        if state.fail_writes {
            return Err(StoreError::Other("ledger write refused".into()));
        }
        Ok(())
    }
}

fn trim_trailing_empty(cells: &[String]) -> Vec<String> {
    let end = cells
        .iter()
        .rposition(|c| !c.is_empty())
        .map_or(0, |i| i + 1);
    cells[..end].to_vec()
}

#[async_trait]
impl LedgerBackend for MemoryLedger {
    async fn anchor_len(&self) -> Result<usize, StoreError> {
        let state = self.state();
        Self::check_read(&state)?;
        Ok(state
            .rows
            .iter()
            .rposition(|row| row.first().is_some_and(|c| !c.is_empty()))
            .map_or(0, |i| i + 1))
    }

    async fn key_columns(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let state = self.state();
        Self::check_read(&state)?;
        let start = Column::Identifier.index();
        let end = Column::Address.index() + 1;
        let mut out: Vec<Vec<String>> = state
            .rows
            .iter()
            .map(|row| {
                let slice = row.get(start..end.min(row.len())).unwrap_or(&[]);
                trim_trailing_empty(slice)
            })
            .collect();
        while out.last().is_some_and(Vec::is_empty) {
            out.pop();
        }
        Ok(out)
    }

    async fn header(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state();
        Self::check_read(&state)?;
        Ok(state
            .rows
            .first()
            .map(|row| trim_trailing_empty(row))
            .unwrap_or_default())
    }

    async fn write_row(&self, position: usize, cells: &[&str]) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check_write(&state)?;
        if position == 0 {
            return Err(StoreError::Other("row positions start at 1".into()));
        }
        if state.rows.len() < position {
            state.rows.resize(position, Vec::new());
        }
        let row = &mut state.rows[position - 1];
        if row.len() < cells.len() {
            row.resize(cells.len(), String::new());
        }
        for (slot, cell) in row.iter_mut().zip(cells) {
            *slot = cell.to_string();
        }
        Ok(())
    }

    async fn format_cells(&self, directives: &[CellFormat]) -> Result<(), StoreError> {
        let mut state = self.state();
        Self::check_write(&state)?;
        for directive in directives {
            if let CellFormat::Checkbox { row, column } = *directive
                && let Some(cells) = row.checked_sub(1).and_then(|i| state.rows.get_mut(i))
            {
                if cells.len() <= column.index() {
                    cells.resize(column.index() + 1, String::new());
                }
                cells[column.index()] = UNCHECKED.into();
            }
            state.formats.push(*directive);
        }
        Ok(())
    }
}
