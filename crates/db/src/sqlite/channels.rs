//! SQLite-Implementierung des ChannelRepository

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use treffpunkt_core::ChannelId;

use crate::error::DbError;
use crate::models::{KanalRecord, KanalTyp, NeuerKanal};
use crate::repository::{ChannelRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{bool_spalte, id_spalte, optionale_id_spalte, zeit_spalte};

const SPALTEN: &str = "id, name, description, channel_type, is_private, created_by, created_at";

impl ChannelRepository for SqliteDb {
    async fn kanal_erstellen(&self, data: NeuerKanal<'_>) -> DbResult<KanalRecord> {
        let id = ChannelId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO channels (id, name, description, channel_type, is_private, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.inner().to_string())
        .bind(data.name)
        .bind(data.description)
        .bind(data.channel_type.als_str())
        .bind(data.is_private as i64)
        .bind(data.created_by.map(|u| u.inner().to_string()))
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(KanalRecord {
            id,
            name: data.name.to_string(),
            description: data.description.map(str::to_string),
            channel_type: data.channel_type,
            is_private: data.is_private,
            created_by: data.created_by,
            created_at: now,
        })
    }

    async fn kanal_laden(&self, id: ChannelId) -> DbResult<Option<KanalRecord>> {
        let row = sqlx::query(&format!("SELECT {SPALTEN} FROM channels WHERE id = ?"))
            .bind(id.inner().to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_kanal(&r)).transpose()
    }

    async fn kanaele_auflisten(&self) -> DbResult<Vec<KanalRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SPALTEN} FROM channels ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_kanal).collect()
    }

    async fn kanal_anzahl(&self) -> DbResult<i64> {
        let anzahl: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM channels")
            .fetch_one(&self.pool)
            .await?;
        Ok(anzahl)
    }

    async fn kanal_loeschen(&self, id: ChannelId) -> DbResult<bool> {
        let affected = sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(id.inner().to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}

fn row_to_kanal(row: &SqliteRow) -> DbResult<KanalRecord> {
    let typ_str: String = row.try_get("channel_type")?;
    let channel_type = typ_str.parse::<KanalTyp>().map_err(DbError::UngueltigeDaten)?;

    Ok(KanalRecord {
        id: id_spalte(row, "id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        channel_type,
        is_private: bool_spalte(row, "is_private")?,
        created_by: optionale_id_spalte(row, "created_by")?,
        created_at: zeit_spalte(row, "created_at")?,
    })
}
