//! Storage seams: the append-only ledger, the photo content store, duplicate
//! detection over the ledger, and the serialized writer in front of it.

mod error;
pub use error::StoreError;

pub mod archive;
pub mod detect;
pub mod ledger;
pub mod writer;

pub use archive::{ContentStore, MemoryContentStore, PhotoArchiver, StoredObject};
pub use detect::{DuplicateDetector, KeyIndex, LedgerKey, LedgerScan};
pub use ledger::{CellFormat, LedgerBackend, MemoryLedger};
pub use writer::{LedgerWriter, append_row, ensure_header};
