//! PostGIS storage for aircraft positions

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::{errors::ImporterError, models::NormalizedRecord, timestamps::SnapshotId};

/// Destination of normalized snapshot records
#[async_trait]
pub trait SnapshotSink {
    /// Persist all records of one snapshot as a single unit of work.
    ///
    /// Returns the number of rows written.
    async fn store(
        &mut self,
        id: &SnapshotId,
        records: &[NormalizedRecord],
    ) -> Result<u64, ImporterError>;
}

/// Handle to the target database
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `url`.
    ///
    /// Records are written one snapshot at a time, so a single connection is
    /// enough.
    pub async fn from_url(url: &str) -> Result<Self, ImporterError> {
        info!("Connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the `adsb` table and PostGIS extension if missing
    pub async fn migrate(&self) -> Result<(), ImporterError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Close all connections
    pub async fn close(self) {
        self.pool.close().await;
        info!("Database connection closed");
    }

    /// Insert one position row.
    ///
    /// There is no uniqueness constraint, importing the same snapshot twice
    /// stores its rows twice.
    async fn insert_record(
        tx: &mut Transaction<'_, Postgres>,
        record: &NormalizedRecord,
    ) -> Result<(), ImporterError> {
        sqlx::query(
            "INSERT INTO public.adsb (
                timestamp, hex, flight, registration, aircraft_type,
                altitude, ground_speed, nav_heading, track, geom, raw
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, ST_SetSRID(ST_MakePoint($10, $11), 4326), $12
            )",
        )
        .bind(record.timestamp)
        .bind(&record.hex)
        .bind(&record.flight)
        .bind(&record.registration)
        .bind(&record.aircraft_type)
        .bind(record.altitude)
        .bind(record.ground_speed)
        .bind(record.nav_heading)
        .bind(record.track)
        .bind(record.longitude)
        .bind(record.latitude)
        .bind(Json(&record.raw))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SnapshotSink for Database {
    async fn store(
        &mut self,
        id: &SnapshotId,
        records: &[NormalizedRecord],
    ) -> Result<u64, ImporterError> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            Self::insert_record(&mut tx, record).await?;
        }

        // An uncommitted transaction is rolled back when dropped
        tx.commit().await?;
        debug!("Committed {} rows for {}", records.len(), id);

        Ok(records.len() as u64)
    }
}
