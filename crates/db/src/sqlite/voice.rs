//! SQLite-Implementierung des VoiceParticipantRepository

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use treffpunkt_core::{ChannelId, UserId};

use crate::error::DbError;
use crate::models::{NeuerVoiceTeilnehmer, VoiceTeilnehmerRecord};
use crate::repository::{DbResult, VoiceParticipantRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{bool_spalte, id_spalte, zeit_spalte};

const SPALTEN: &str = "channel_id, user_id, username, avatar, is_muted, joined_at";

impl VoiceParticipantRepository for SqliteDb {
    async fn teilnehmer_einfuegen(
        &self,
        data: NeuerVoiceTeilnehmer<'_>,
    ) -> DbResult<(VoiceTeilnehmerRecord, bool)> {
        // UNIQUE(channel_id, user_id) macht einen doppelten Beitritt zum No-op
        let eingefuegt = sqlx::query(
            "INSERT INTO voice_participants (channel_id, user_id, username, avatar, is_muted, joined_at)
             VALUES (?, ?, ?, ?, 0, ?)
             ON CONFLICT (channel_id, user_id) DO NOTHING",
        )
        .bind(data.channel_id.inner().to_string())
        .bind(data.user_id.inner().to_string())
        .bind(data.username)
        .bind(data.avatar)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;

        let record = self
            .teilnehmer_laden(data.channel_id, data.user_id)
            .await?
            .ok_or_else(|| DbError::intern("Voice-Teilnehmer nach Insert nicht gefunden"))?;

        Ok((record, eingefuegt))
    }

    async fn teilnehmer_laden(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> DbResult<Option<VoiceTeilnehmerRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SPALTEN} FROM voice_participants WHERE channel_id = ? AND user_id = ?"
        ))
        .bind(channel_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_teilnehmer(&r)).transpose()
    }

    async fn teilnehmer_entfernen(&self, channel_id: ChannelId, user_id: UserId) -> DbResult<bool> {
        let affected =
            sqlx::query("DELETE FROM voice_participants WHERE channel_id = ? AND user_id = ?")
                .bind(channel_id.inner().to_string())
                .bind(user_id.inner().to_string())
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected > 0)
    }

    async fn teilnehmer_auflisten(
        &self,
        channel_id: ChannelId,
    ) -> DbResult<Vec<VoiceTeilnehmerRecord>> {
        // rowid waechst monoton: Beitrittsreihenfolge auch bei gleichem joined_at
        let rows = sqlx::query(&format!(
            "SELECT {SPALTEN} FROM voice_participants WHERE channel_id = ? ORDER BY rowid"
        ))
        .bind(channel_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_teilnehmer).collect()
    }

    async fn teilnehmer_stumm_setzen(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        muted: bool,
    ) -> DbResult<bool> {
        let affected = sqlx::query(
            "UPDATE voice_participants SET is_muted = ? WHERE channel_id = ? AND user_id = ?",
        )
        .bind(muted as i64)
        .bind(channel_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn teilnehmer_alle_entfernen(&self) -> DbResult<u64> {
        let affected = sqlx::query("DELETE FROM voice_participants")
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }
}

fn row_to_teilnehmer(row: &SqliteRow) -> DbResult<VoiceTeilnehmerRecord> {
    Ok(VoiceTeilnehmerRecord {
        channel_id: id_spalte(row, "channel_id")?,
        user_id: id_spalte(row, "user_id")?,
        username: row.try_get("username")?,
        avatar: row.try_get("avatar")?,
        is_muted: bool_spalte(row, "is_muted")?,
        joined_at: zeit_spalte(row, "joined_at")?,
    })
}
