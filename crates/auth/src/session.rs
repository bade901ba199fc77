//! Session-Tokens
//!
//! Sessions werden im Speicher gehalten (HashMap mit TTL). Ein optionaler
//! Hintergrund-Task raeumt abgelaufene Eintraege auf.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::RngCore;
use tokio::sync::RwLock;
use treffpunkt_core::UserId;

use crate::error::{AuthError, AuthResult};

/// Standard-Lebensdauer: 30 Tage
pub const STANDARD_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const CLEANUP_INTERVALL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
pub struct Session {
    /// URL-sicheres Base64, 32 Zufallsbytes
    pub token: String,
    pub user_id: UserId,
    pub erstellt_am: DateTime<Utc>,
    pub laeuft_ab_am: DateTime<Utc>,
}

impl Session {
    pub fn ist_gueltig(&self) -> bool {
        Utc::now() < self.laeuft_ab_am
    }
}

/// In-Memory Session-Store mit TTL
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn neu() -> Arc<Self> {
        Self::mit_ttl(STANDARD_TTL)
    }

    pub fn mit_ttl(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
        })
    }

    /// Startet den periodischen Cleanup-Task
    pub fn cleanup_starten(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut intervall = tokio::time::interval(CLEANUP_INTERVALL);
            loop {
                intervall.tick().await;
                let entfernt = store.cleanup_abgelaufene().await;
                if entfernt > 0 {
                    tracing::debug!(anzahl = entfernt, "Abgelaufene Sessions bereinigt");
                }
            }
        })
    }

    pub async fn erstellen(&self, user_id: UserId) -> Session {
        let jetzt = Utc::now();
        let session = Session {
            token: token_generieren(),
            user_id,
            erstellt_am: jetzt,
            laeuft_ab_am: jetzt + self.ttl,
        };

        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        tracing::debug!(user_id = %user_id, "Neue Session erstellt");
        session
    }

    pub async fn validieren(&self, token: &str) -> AuthResult<Session> {
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            None => Err(AuthError::SessionUngueltig),
            Some(session) if !session.ist_gueltig() => Err(AuthError::SessionAbgelaufen),
            Some(session) => Ok(session.clone()),
        }
    }

    /// Entfernt eine Session; `true` wenn sie existierte
    pub async fn invalidieren(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn cleanup_abgelaufene(&self) -> usize {
        let jetzt = Utc::now();
        let mut sessions = self.sessions.write().await;
        let vorher = sessions.len();
        sessions.retain(|_, s| s.laeuft_ab_am > jetzt);
        vorher - sessions.len()
    }

    pub async fn anzahl_aktive(&self) -> usize {
        let jetzt = Utc::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.laeuft_ab_am > jetzt)
            .count()
    }
}

fn token_generieren() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn erstellen_und_validieren() {
        let store = SessionStore::neu();
        let user_id = UserId::new();

        let session = store.erstellen(user_id).await;
        assert!(session.ist_gueltig());

        let validiert = store.validieren(&session.token).await.unwrap();
        assert_eq!(validiert.user_id, user_id);
    }

    #[tokio::test]
    async fn unbekanntes_token() {
        let store = SessionStore::neu();
        assert!(matches!(
            store.validieren("kein_gueltiger_token").await,
            Err(AuthError::SessionUngueltig)
        ));
    }

    #[tokio::test]
    async fn abgelaufene_session() {
        let store = SessionStore::mit_ttl(Duration::ZERO);
        let session = store.erstellen(UserId::new()).await;

        assert!(matches!(
            store.validieren(&session.token).await,
            Err(AuthError::SessionAbgelaufen)
        ));
        assert_eq!(store.cleanup_abgelaufene().await, 1);
        assert_eq!(store.anzahl_aktive().await, 0);
    }

    #[tokio::test]
    async fn invalidieren() {
        let store = SessionStore::neu();
        let session = store.erstellen(UserId::new()).await;

        assert!(store.invalidieren(&session.token).await);
        assert!(!store.invalidieren(&session.token).await);
        assert!(store.validieren(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn tokens_sind_eindeutig() {
        let store = SessionStore::neu();
        let user_id = UserId::new();
        let a = store.erstellen(user_id).await;
        let b = store.erstellen(user_id).await;
        assert_ne!(a.token, b.token);
    }
}
