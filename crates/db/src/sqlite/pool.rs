//! SQLite-Pool fuer den Record Store
//!
//! Datei-Datenbanken laufen standardmaessig im WAL-Modus. Gleichzeitige
//! Voice-Beitritte schreiben parallel, deshalb wartet jede Verbindung bei
//! gesperrter Datenbank bis zu [`BUSY_TIMEOUT`] statt sofort zu scheitern.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;
use crate::repository::DatabaseConfig;

pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteDb {
    pub(crate) pool: SqlitePool,
}

fn basis_optionen(url: &str) -> Result<SqliteConnectOptions, DbError> {
    Ok(SqliteConnectOptions::from_str(url)?
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT))
}

impl SqliteDb {
    /// Oeffnet die Datenbank laut Konfiguration und migriert sie
    pub async fn oeffnen(config: &DatabaseConfig) -> Result<Self, DbError> {
        let journal = match config.sqlite_wal {
            true => SqliteJournalMode::Wal,
            false => SqliteJournalMode::Delete,
        };
        let optionen = basis_optionen(&config.url)?
            .create_if_missing(true)
            .journal_mode(journal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_verbindungen.max(1))
            .connect_with(optionen)
            .await?;

        tracing::info!(
            url = %config.url,
            wal = config.sqlite_wal,
            max_verbindungen = config.max_verbindungen,
            "Record Store geoeffnet"
        );
        Self::migriert(pool).await
    }

    /// In-Memory-Datenbank fuer Tests
    ///
    /// Jede Pool-Verbindung haette ihre eigene In-Memory-DB, deshalb genau
    /// eine, die nie abgebaut wird.
    pub async fn in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(basis_optionen("sqlite::memory:")?)
            .await?;
        Self::migriert(pool).await
    }

    async fn migriert(pool: SqlitePool) -> Result<Self, DbError> {
        let db = Self { pool };
        db.migrationen_ausfuehren().await?;
        Ok(db)
    }

    pub async fn migrationen_ausfuehren(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::debug!("Migrationen angewendet");
        Ok(())
    }

    /// Ein `SELECT 1` gegen den Pool (Health-Check)
    pub async fn ist_erreichbar(&self) -> bool {
        if self.pool.is_closed() {
            return false;
        }
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Schliesst alle Verbindungen; danach schlagen alle Abfragen fehl
    pub async fn schliessen(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_mit_fremdschluesseln() {
        let db = SqliteDb::in_memory().await.unwrap();
        let aktiv: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(aktiv, 1);
    }

    #[tokio::test]
    async fn erreichbar_bis_zum_schliessen() {
        let db = SqliteDb::in_memory().await.unwrap();
        assert!(db.ist_erreichbar().await);

        db.schliessen().await;
        assert!(!db.ist_erreichbar().await);
    }

    #[tokio::test]
    async fn datei_datenbank_im_wal_modus() {
        let verzeichnis = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", verzeichnis.path().join("t.db").display()),
            max_verbindungen: 2,
            sqlite_wal: true,
        };
        let db = SqliteDb::oeffnen(&config).await.unwrap();
        let modus: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(modus.to_lowercase(), "wal");
    }
}
