pub mod caption;
pub mod clock;
pub mod credentials;
pub mod district;
pub mod reply;
pub mod report;
pub mod row;

pub use caption::{CaptionError, NO_CAPTION, ParsedFields, parse_caption, parse_report};
pub use clock::{Clock, FixedClock, MOSCOW_OFFSET, SystemClock};
pub use credentials::{CredentialsError, ServiceAccountKey, clean_payload};
pub use district::{District, DistrictVocabulary};
pub use report::{IncomingReport, ReportBody, ReportOrigin, StagedPhoto, display_name};
pub use row::{Column, DUPLICATE_MARKER, HEADER_LABELS, LedgerRow, UNCHECKED};
