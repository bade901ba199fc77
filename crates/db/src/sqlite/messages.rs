//! SQLite-Implementierung des MessageRepository

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use treffpunkt_core::{ChannelId, MessageId, UserId};

use crate::models::{NachrichtRecord, NeueNachricht, ReaktionRecord};
use crate::repository::{DbResult, MessageRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{id_spalte, optionale_zeit_spalte, zeit_spalte};

const SPALTEN: &str = "id, channel_id, user_id, username, avatar, content, created_at, edited_at";

impl SqliteDb {
    async fn reaktionen_laden(&self, message_id: MessageId) -> DbResult<Vec<ReaktionRecord>> {
        let rows = sqlx::query(
            "SELECT user_id, emoji FROM message_reactions
             WHERE message_id = ? ORDER BY rowid",
        )
        .bind(message_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(ReaktionRecord {
                    user_id: id_spalte(r, "user_id")?,
                    emoji: r.try_get("emoji")?,
                })
            })
            .collect()
    }

    async fn mit_reaktionen(&self, row: &SqliteRow) -> DbResult<NachrichtRecord> {
        let mut nachricht = row_to_nachricht(row)?;
        nachricht.reactions = self.reaktionen_laden(nachricht.id).await?;
        Ok(nachricht)
    }
}

impl MessageRepository for SqliteDb {
    async fn nachricht_erstellen(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let id = MessageId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO messages (id, channel_id, user_id, username, avatar, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.inner().to_string())
        .bind(data.channel_id.inner().to_string())
        .bind(data.user_id.inner().to_string())
        .bind(data.username)
        .bind(data.avatar)
        .bind(data.content)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(NachrichtRecord {
            id,
            channel_id: data.channel_id,
            user_id: data.user_id,
            username: data.username.to_string(),
            avatar: data.avatar.map(str::to_string),
            content: data.content.to_string(),
            reactions: Vec::new(),
            created_at: now,
            edited_at: None,
        })
    }

    async fn nachricht_laden(&self, id: MessageId) -> DbResult<Option<NachrichtRecord>> {
        let row = sqlx::query(&format!("SELECT {SPALTEN} FROM messages WHERE id = ?"))
            .bind(id.inner().to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(self.mit_reaktionen(&r).await?)),
            None => Ok(None),
        }
    }

    async fn nachricht_loeschen(&self, id: MessageId) -> DbResult<bool> {
        let affected = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id.inner().to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn nachrichten_auflisten(
        &self,
        channel_id: ChannelId,
        limit: i64,
    ) -> DbResult<Vec<NachrichtRecord>> {
        // rowid entspricht der Einfuegereihenfolge; neueste zuerst holen, dann umdrehen
        let rows = sqlx::query(&format!(
            "SELECT {SPALTEN} FROM messages WHERE channel_id = ?
             ORDER BY rowid DESC LIMIT ?"
        ))
        .bind(channel_id.inner().to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut nachrichten = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            nachrichten.push(self.mit_reaktionen(row).await?);
        }
        Ok(nachrichten)
    }

    async fn reaktion_umschalten(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let entfernt = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = ? AND user_id = ? AND emoji = ?",
        )
        .bind(message_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .bind(emoji)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if entfernt == 0 {
            sqlx::query(
                "INSERT INTO message_reactions (message_id, user_id, emoji, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(message_id.inner().to_string())
            .bind(user_id.inner().to_string())
            .bind(emoji)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(entfernt == 0)
    }
}

fn row_to_nachricht(row: &SqliteRow) -> DbResult<NachrichtRecord> {
    Ok(NachrichtRecord {
        id: id_spalte(row, "id")?,
        channel_id: id_spalte(row, "channel_id")?,
        user_id: id_spalte(row, "user_id")?,
        username: row.try_get("username")?,
        avatar: row.try_get("avatar")?,
        content: row.try_get("content")?,
        reactions: Vec::new(),
        created_at: zeit_spalte(row, "created_at")?,
        edited_at: optionale_zeit_spalte(row, "edited_at")?,
    })
}
