mod config;
mod logging;
mod ping;
mod pipeline;
mod poll;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use fieldlog_core::{Clock, DistrictVocabulary, SystemClock};
use fieldlog_store::{
    DuplicateDetector, KeyIndex, LedgerBackend, LedgerScan, LedgerWriter, PhotoArchiver,
    ensure_header,
};
use fieldlog_sync::auth::{DRIVE_SCOPE, SHEETS_SCOPE};
use fieldlog_sync::{DriveStore, ServiceAccountAuth, SheetsLedger, TelegramClient};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::poll::Poller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    let _guard = logging::init(&settings.log_dir)?;
    info!("fieldlog v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(settings).await {
        error!("fatal: {e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let key = settings
        .service_account_key()
        .context("loading service-account credentials")?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("building HTTP client")?;
    let auth = Arc::new(
        ServiceAccountAuth::new(client.clone(), &key, &[SHEETS_SCOPE, DRIVE_SCOPE])
            .context("loading service-account private key")?,
    );
    info!(account = auth.client_email(), "credentials loaded");

    let ledger: Arc<dyn LedgerBackend> = Arc::new(SheetsLedger::new(
        client.clone(),
        auth.clone(),
        settings.sheets_config(),
    ));
    match ensure_header(ledger.as_ref()).await {
        Ok(true) => info!("ledger header written"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "could not check ledger header"),
    }

    let detector: Arc<dyn DuplicateDetector> = if settings.duplicate_index {
        match KeyIndex::load(ledger.as_ref()).await {
            Ok(index) => Arc::new(index),
            Err(e) => {
                warn!(error = %e, "duplicate index unavailable; scanning the ledger instead");
                Arc::new(LedgerScan::new(ledger.clone()))
            }
        }
    } else {
        Arc::new(LedgerScan::new(ledger.clone()))
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::default());
    let archiver = PhotoArchiver::new(
        Arc::new(DriveStore::new(client.clone(), auth.clone())),
        settings.drive_root_folder_id.clone(),
        clock.clone(),
    );
    let (writer, writer_task) = LedgerWriter::spawn(ledger, settings.write_queue_depth);

    let telegram = Arc::new(TelegramClient::new(client, settings.telegram_config()));
    let chats = poll::verify_chats(&telegram, &settings.chat_ids).await;
    if chats.is_empty() {
        bail!("none of the configured chats is accessible");
    }

    let pipeline = Arc::new(Pipeline::new(
        DistrictVocabulary::default(),
        detector,
        archiver,
        writer,
        telegram.clone(),
        clock.clone(),
    ));
    let poller = Poller::new(telegram, pipeline, chats);

    tokio::select! {
        () = poller.run() => {}
        result = ping::serve(settings.port, clock) => {
            result.context("liveness endpoint")?;
        }
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    writer_task.abort();
    Ok(())
}
