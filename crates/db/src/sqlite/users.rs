//! SQLite-Implementierung des UserRepository

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use treffpunkt_core::{Rolle, UserId};

use crate::error::DbError;
use crate::models::{BenutzerRecord, NeuerBenutzer};
use crate::repository::{DbResult, UserRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{bool_spalte, id_spalte, optionale_zeit_spalte, zeit_spalte};

const SPALTEN: &str =
    "id, username, email, password_hash, avatar, role, is_online, last_seen, created_at";

impl UserRepository for SqliteDb {
    async fn benutzer_erstellen(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord> {
        let id = UserId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, is_online, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(id.inner().to_string())
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role.als_str())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DbError::Eindeutigkeit(
                format!("Benutzername '{}' bereits vergeben", data.username),
            ),
            andere => DbError::Sqlx(andere),
        })?;

        Ok(BenutzerRecord {
            id,
            username: data.username.to_string(),
            email: data.email.map(str::to_string),
            password_hash: data.password_hash.to_string(),
            avatar: None,
            role: data.role,
            is_online: false,
            last_seen: None,
            created_at: now,
        })
    }

    async fn benutzer_laden(&self, id: UserId) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query(&format!("SELECT {SPALTEN} FROM users WHERE id = ?"))
            .bind(id.inner().to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }

    async fn benutzer_nach_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query(&format!("SELECT {SPALTEN} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }

    async fn presence_setzen(&self, id: UserId, online: bool) -> DbResult<()> {
        let affected = sqlx::query("UPDATE users SET is_online = ?, last_seen = ? WHERE id = ?")
            .bind(online as i64)
            .bind(Utc::now().to_rfc3339())
            .bind(id.inner().to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Benutzer {id}")));
        }
        Ok(())
    }

    async fn online_benutzer(&self) -> DbResult<Vec<BenutzerRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SPALTEN} FROM users WHERE is_online = 1 ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_benutzer).collect()
    }

    async fn alle_offline_setzen(&self) -> DbResult<u64> {
        let affected = sqlx::query("UPDATE users SET is_online = 0, last_seen = ? WHERE is_online = 1")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }
}

fn row_to_benutzer(row: &SqliteRow) -> DbResult<BenutzerRecord> {
    let rolle_str: String = row.try_get("role")?;
    let role = rolle_str.parse::<Rolle>().map_err(DbError::UngueltigeDaten)?;

    Ok(BenutzerRecord {
        id: id_spalte(row, "id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        avatar: row.try_get("avatar")?,
        role,
        is_online: bool_spalte(row, "is_online")?,
        last_seen: optionale_zeit_spalte(row, "last_seen")?,
        created_at: zeit_spalte(row, "created_at")?,
    })
}
