//! Network layer: Google service-account auth, Sheets-backed ledger,
//! Drive-backed photo store and the Telegram Bot API client.

#[cfg(feature = "http")]
mod error;
#[cfg(feature = "http")]
pub use error::SyncError;

#[cfg(feature = "http")]
pub mod auth;
#[cfg(feature = "http")]
pub mod drive;
#[cfg(feature = "http")]
pub mod sheets;
#[cfg(feature = "http")]
pub mod telegram;

#[cfg(feature = "http")]
pub use auth::ServiceAccountAuth;
#[cfg(feature = "http")]
pub use drive::DriveStore;
#[cfg(feature = "http")]
pub use sheets::{SheetsConfig, SheetsLedger};
#[cfg(feature = "http")]
pub use telegram::{TelegramClient, TelegramConfig};
