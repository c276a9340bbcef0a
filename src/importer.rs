//! Snapshot import loop

use tracing::{debug, error, info};

use crate::{
    archive::SnapshotSource, database::SnapshotSink, errors::ImporterError,
    timestamps::SnapshotId,
};

/// Result of importing a single snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Archive had no data for the snapshot
    Skipped,
    /// Snapshot was stored
    Imported {
        /// Number of aircraft in the snapshot document
        aircraft: usize,
        /// Number of rows written, aircraft without position excluded
        rows: u64,
    },
}

/// Counters over a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub processed: usize,
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub rows_written: u64,
}

/// Sequential snapshot importer
///
/// Every snapshot is fetched, normalized and committed before the next one
/// is started. Failures are logged and never stop the run.
pub struct Importer<S, K> {
    source: S,
    sink: K,
}

impl<S, K> Importer<S, K>
where
    S: SnapshotSource,
    K: SnapshotSink,
{
    pub fn new(source: S, sink: K) -> Self {
        Self { source, sink }
    }

    /// Import all `ids` in order
    pub async fn run(&mut self, ids: &[SnapshotId]) -> ImportSummary {
        let total = ids.len();
        let mut summary = ImportSummary::default();

        for (i, id) in ids.iter().enumerate() {
            summary.processed += 1;
            match self.import_snapshot(id).await {
                Ok(ImportOutcome::Imported { aircraft, rows }) => {
                    info!("[{}/{}] Imported {} ({} aircraft)", i + 1, total, id, aircraft);
                    summary.imported += 1;
                    summary.rows_written += rows;
                }
                Ok(ImportOutcome::Skipped) => {
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!("[{}/{}] {}: {}", i + 1, total, id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Import finished: {} snapshots, {} imported, {} skipped, {} failed, {} rows written",
            summary.processed,
            summary.imported,
            summary.skipped,
            summary.failed,
            summary.rows_written
        );
        summary
    }

    /// Fetch, normalize and store one snapshot
    pub async fn import_snapshot(
        &mut self,
        id: &SnapshotId,
    ) -> Result<ImportOutcome, ImporterError> {
        let Some(snapshot) = self.source.fetch(id).await? else {
            return Ok(ImportOutcome::Skipped);
        };

        let aircraft = snapshot.aircraft.len();
        let records = snapshot.into_records()?;
        debug!("{}: {} of {} aircraft have a position", id, records.len(), aircraft);

        let rows = self.sink.store(id, &records).await?;
        Ok(ImportOutcome::Imported { aircraft, rows })
    }

    /// Give back the sink, e.g. to close it
    pub fn into_sink(self) -> K {
        self.sink
    }
}
