//! ChatService – Nachrichten senden, loeschen, Reaktionen, Verlauf

use std::sync::Arc;

use treffpunkt_core::{ChannelId, MessageId, Rolle, UserId};
use treffpunkt_db::{
    ChannelRepository, KanalTyp, MessageRepository, NachrichtRecord, NeueNachricht,
    UserRepository,
};

use crate::{
    error::{ChatError, ChatResult},
    types::{HistoryAnfrage, MAX_EMOJI_LAENGE, MAX_NACHRICHT_LAENGE},
};

/// Verwaltet Text-Nachrichten in Kanaelen
pub struct ChatService<R> {
    repo: Arc<R>,
}

impl<R> ChatService<R>
where
    R: UserRepository + ChannelRepository + MessageRepository,
{
    pub fn neu(repo: Arc<R>) -> Arc<Self> {
        Arc::new(Self { repo })
    }

    async fn text_kanal_pruefen(&self, channel_id: ChannelId) -> ChatResult<()> {
        match self.repo.kanal_laden(channel_id).await? {
            Some(k) if k.channel_type == KanalTyp::Text => Ok(()),
            Some(_) => Err(ChatError::UngueltigeEingabe(format!(
                "Kanal {channel_id} ist kein Text-Kanal"
            ))),
            None => Err(ChatError::KanalNichtGefunden(channel_id.to_string())),
        }
    }

    /// Nachricht in einem Text-Kanal senden
    ///
    /// Benutzername und Avatar werden zum Sendezeitpunkt in die Nachricht
    /// kopiert.
    pub async fn nachricht_senden(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        content: &str,
    ) -> ChatResult<NachrichtRecord> {
        if content.trim().is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Nachrichteninhalt darf nicht leer sein".into(),
            ));
        }
        let laenge = content.chars().count();
        if laenge > MAX_NACHRICHT_LAENGE {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Nachricht zu lang: {laenge} Zeichen (Maximum: {MAX_NACHRICHT_LAENGE})"
            )));
        }

        self.text_kanal_pruefen(channel_id).await?;

        let autor = self
            .repo
            .benutzer_laden(user_id)
            .await?
            .ok_or_else(|| ChatError::BenutzerNichtGefunden(user_id.to_string()))?;

        let nachricht = self
            .repo
            .nachricht_erstellen(NeueNachricht {
                channel_id,
                user_id,
                username: &autor.username,
                avatar: autor.avatar.as_deref(),
                content,
            })
            .await?;

        tracing::debug!(
            message_id = %nachricht.id,
            channel_id = %channel_id,
            user_id = %user_id,
            "Nachricht gespeichert"
        );
        Ok(nachricht)
    }

    /// Loescht eine Nachricht (Verfasser oder Admin/Moderator)
    ///
    /// Gibt die geloeschte Nachricht zurueck.
    pub async fn nachricht_loeschen(
        &self,
        message_id: MessageId,
        user_id: UserId,
        rolle: Rolle,
    ) -> ChatResult<NachrichtRecord> {
        let nachricht = self
            .repo
            .nachricht_laden(message_id)
            .await?
            .ok_or_else(|| ChatError::NachrichtNichtGefunden(message_id.to_string()))?;

        if nachricht.user_id != user_id && !rolle.darf_moderieren() {
            return Err(ChatError::KeineBerechtigung(
                "Nur der Verfasser oder ein Moderator kann die Nachricht loeschen".into(),
            ));
        }

        if !self.repo.nachricht_loeschen(message_id).await? {
            // Zwischenzeitlich von jemand anderem geloescht
            return Err(ChatError::NachrichtNichtGefunden(message_id.to_string()));
        }

        tracing::info!(
            message_id = %message_id,
            user_id = %user_id,
            rolle = %rolle,
            "Nachricht geloescht"
        );
        Ok(nachricht)
    }

    /// Schaltet eine Reaktion um; `true` wenn sie danach gesetzt ist
    pub async fn reaktion_umschalten(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> ChatResult<bool> {
        let emoji = emoji.trim();
        if emoji.is_empty() || emoji.chars().count() > MAX_EMOJI_LAENGE {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Emoji muss 1 bis {MAX_EMOJI_LAENGE} Zeichen lang sein"
            )));
        }

        if self.repo.nachricht_laden(message_id).await?.is_none() {
            return Err(ChatError::NachrichtNichtGefunden(message_id.to_string()));
        }

        Ok(self
            .repo
            .reaktion_umschalten(message_id, user_id, emoji)
            .await?)
    }

    /// Verlauf eines Kanals in chronologischer Reihenfolge
    pub async fn history_laden(&self, anfrage: HistoryAnfrage) -> ChatResult<Vec<NachrichtRecord>> {
        if self.repo.kanal_laden(anfrage.channel_id).await?.is_none() {
            return Err(ChatError::KanalNichtGefunden(anfrage.channel_id.to_string()));
        }
        Ok(self
            .repo
            .nachrichten_auflisten(anfrage.channel_id, anfrage.effektives_limit())
            .await?)
    }
}
