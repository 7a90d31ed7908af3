//! Process configuration, read once at startup from flags or environment.

use std::path::PathBuf;

use clap::Parser;
use fieldlog_core::{CredentialsError, ServiceAccountKey};
use fieldlog_sync::{SheetsConfig, TelegramConfig};

#[derive(Debug, Parser)]
#[command(
    name = "fieldlog",
    version,
    about = "Records field reports posted in monitored Telegram groups into a Google Sheets ledger"
)]
pub struct Settings {
    /// Telegram bot token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    #[arg(long, env = "SPREADSHEET_ID")]
    pub spreadsheet_id: String,

    /// Title of the ledger sheet within the spreadsheet.
    #[arg(long, env = "SHEET_NAME")]
    pub sheet_name: String,

    /// Drive folder under which day folders of photos are created.
    #[arg(long, env = "DRIVE_ROOT_FOLDER_ID")]
    pub drive_root_folder_id: String,

    /// Comma-separated ids of the chats to monitor.
    #[arg(
        long,
        env = "CHAT_IDS",
        value_delimiter = ',',
        value_parser = parse_chat_id,
        allow_negative_numbers = true,
        required = true
    )]
    pub chat_ids: Vec<i64>,

    /// Service-account key JSON, given inline. Takes precedence over the file.
    #[arg(long, env = "SERVICE_ACCOUNT_JSON", hide_env_values = true)]
    pub service_account_json: Option<String>,

    #[arg(long, env = "CREDENTIALS_FILE", default_value = "credentials.json")]
    pub credentials_file: PathBuf,

    /// Port of the liveness endpoint.
    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Detect duplicates with an in-memory index instead of scanning the sheet.
    #[arg(long, env = "DUPLICATE_INDEX")]
    pub duplicate_index: bool,

    #[arg(long, env = "POLL_TIMEOUT_SECS", default_value_t = 30)]
    pub poll_timeout_secs: u64,

    /// Appends waiting for the ledger writer before handlers block.
    #[arg(long, env = "WRITE_QUEUE_DEPTH", default_value_t = 64)]
    pub write_queue_depth: usize,
}

fn parse_chat_id(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse()
        .map_err(|e| format!("invalid chat id {raw:?}: {e}"))
}

impl Settings {
    /// The service-account key, from the inline payload or the key file.
    pub fn service_account_key(&self) -> Result<ServiceAccountKey, CredentialsError> {
        match &self.service_account_json {
            Some(payload) => ServiceAccountKey::from_payload(payload),
            None => ServiceAccountKey::from_file(&self.credentials_file),
        }
    }

    pub fn sheets_config(&self) -> SheetsConfig {
        SheetsConfig {
            spreadsheet_id: self.spreadsheet_id.clone(),
            sheet_name: self.sheet_name.clone(),
        }
    }

    pub fn telegram_config(&self) -> TelegramConfig {
        TelegramConfig {
            bot_token: self.bot_token.clone(),
            poll_timeout_secs: self.poll_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 10] = [
        "fieldlog",
        "--bot-token",
        "123:abc",
        "--spreadsheet-id",
        "sheet-1",
        "--sheet-name",
        "ТТ-02.26",
        "--drive-root-folder-id",
        "root-1",
        "--chat-ids=-1003849809374, -1003741393561",
    ];

    #[test]
    fn parses_required_flags_with_defaults() {
        let settings = Settings::try_parse_from(REQUIRED).unwrap();
        assert_eq!(settings.chat_ids, vec![-1003849809374, -1003741393561]);
        assert_eq!(settings.port, 10000);
        assert_eq!(settings.poll_timeout_secs, 30);
        assert!(!settings.duplicate_index);
        assert_eq!(settings.credentials_file, PathBuf::from("credentials.json"));
        assert_eq!(settings.sheets_config().sheet_name, "ТТ-02.26");
        assert_eq!(settings.telegram_config().bot_token, "123:abc");
    }

    #[test]
    fn missing_required_value_is_an_error() {
        let args: Vec<&str> = REQUIRED[..9].to_vec();
        assert!(Settings::try_parse_from(args).is_err());
    }

    #[test]
    fn bad_chat_id_is_an_error() {
        let mut args = REQUIRED.to_vec();
        args[9] = "--chat-ids=-100,abc";
        assert!(Settings::try_parse_from(args).is_err());
    }

    #[test]
    fn inline_payload_takes_precedence() {
        let mut args = REQUIRED.to_vec();
        args.extend([
            "--service-account-json",
            r#"{"client_email":"bot@x","private_key":"pem"}"#,
            "--credentials-file",
            "/nonexistent.json",
        ]);
        let settings = Settings::try_parse_from(args).unwrap();
        assert_eq!(settings.service_account_key().unwrap().client_email, "bot@x");
    }

    #[test]
    fn missing_credentials_file_is_an_error() {
        let mut args = REQUIRED.to_vec();
        args.extend(["--credentials-file", "/nonexistent.json"]);
        let settings = Settings::try_parse_from(args).unwrap();
        assert!(settings.service_account_key().is_err());
    }
}
