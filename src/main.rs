//! ADS-B snapshot importer

use adsb_importer::{
    archive::ArchiveClient, config::AppConfig, database::Database, errors::ImporterError,
    importer::Importer, timestamps::snapshot_ids,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ImporterError> {
    #[cfg(feature = "dotenv")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration file first, environment variables override
    let config = AppConfig::load()?;
    config.validate()?;

    let archive = ArchiveClient::new(&config.archive)?;
    let db = Database::from_url(&config.database.url).await?;
    if config.database.run_migrations {
        if let Err(e) = db.migrate().await {
            db.close().await;
            return Err(e);
        }
    }

    let ids = snapshot_ids(config.import.limit);
    info!(
        "Importing {} snapshots from {}",
        ids.len(),
        config.archive.base_url
    );

    let mut importer = Importer::new(archive, db);

    tokio::select! {
        _ = importer.run(&ids) => {}
        _ = signal::ctrl_c() => {
            // The open snapshot transaction, if any, is rolled back
            info!("Received shutdown signal");
        }
    }

    importer.into_sink().close().await;

    Ok(())
}
