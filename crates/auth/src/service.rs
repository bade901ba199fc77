//! Auth-Service fuer Treffpunkt
//!
//! Registrierung, Login und Logout auf Basis des `UserRepository` und des
//! `SessionStore`. Implementiert [`IdentityProvider`] fuer die Signalisierung.

use std::sync::Arc;

use treffpunkt_core::{Rolle, UserId};
use treffpunkt_db::{BenutzerRecord, DbError, NeuerBenutzer, UserRepository};

use crate::{
    error::{AuthError, AuthResult},
    identity::{Identitaet, IdentityProvider},
    password::{passwort_hashen, passwort_verifizieren},
    session::{Session, SessionStore},
};

const MIN_PASSWORT_LAENGE: usize = 6;
const MAX_BENUTZERNAME_LAENGE: usize = 32;

pub struct AuthService<U: UserRepository> {
    user_repo: Arc<U>,
    session_store: Arc<SessionStore>,
}

impl<U: UserRepository> AuthService<U> {
    pub fn neu(user_repo: Arc<U>, session_store: Arc<SessionStore>) -> Self {
        Self {
            user_repo,
            session_store,
        }
    }

    /// Registriert einen neuen Benutzer
    pub async fn registrieren(
        &self,
        username: &str,
        email: Option<&str>,
        passwort: &str,
        rolle: Rolle,
    ) -> AuthResult<BenutzerRecord> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_BENUTZERNAME_LAENGE {
            return Err(AuthError::UngueltigeEingabe(format!(
                "Benutzername muss 1 bis {MAX_BENUTZERNAME_LAENGE} Zeichen lang sein"
            )));
        }
        if passwort.chars().count() < MIN_PASSWORT_LAENGE {
            return Err(AuthError::UngueltigeEingabe(format!(
                "Passwort muss mindestens {MIN_PASSWORT_LAENGE} Zeichen lang sein"
            )));
        }

        if self.user_repo.benutzer_nach_name(username).await?.is_some() {
            return Err(AuthError::BenutzernameVergeben(username.to_string()));
        }

        let passwort_hash = passwort_hashen(passwort)?;

        let benutzer = self
            .user_repo
            .benutzer_erstellen(NeuerBenutzer {
                username,
                email,
                password_hash: &passwort_hash,
                role: rolle,
            })
            .await
            .map_err(|e| match e {
                // Gleichzeitige Registrierung mit demselben Namen
                DbError::Eindeutigkeit(_) => AuthError::BenutzernameVergeben(username.to_string()),
                andere => AuthError::Datenbank(andere),
            })?;

        tracing::info!(
            user_id = %benutzer.id,
            username = %benutzer.username,
            rolle = %benutzer.role,
            "Neuer Benutzer registriert"
        );

        Ok(benutzer)
    }

    /// Meldet einen Benutzer an und erstellt eine neue Session
    pub async fn anmelden(
        &self,
        username: &str,
        passwort: &str,
    ) -> AuthResult<(BenutzerRecord, Session)> {
        let benutzer = self
            .user_repo
            .benutzer_nach_name(username)
            .await?
            .ok_or(AuthError::UngueltigeAnmeldedaten)?;

        if !passwort_verifizieren(passwort, &benutzer.password_hash)? {
            tracing::warn!(username = %username, "Fehlgeschlagener Login-Versuch");
            return Err(AuthError::UngueltigeAnmeldedaten);
        }

        let session = self.session_store.erstellen(benutzer.id).await;

        tracing::info!(
            user_id = %benutzer.id,
            username = %benutzer.username,
            "Benutzer angemeldet"
        );

        Ok((benutzer, session))
    }

    /// Invalidiert die Session
    pub async fn abmelden(&self, session_token: &str) -> AuthResult<()> {
        if !self.session_store.invalidieren(session_token).await {
            return Err(AuthError::SessionUngueltig);
        }
        tracing::debug!("Session invalidiert (Abmeldung)");
        Ok(())
    }

    /// Validiert ein Session-Token und laedt den zugehoerigen Benutzer
    pub async fn session_validieren(&self, token: &str) -> AuthResult<BenutzerRecord> {
        let session = self.session_store.validieren(token).await?;

        match self.user_repo.benutzer_laden(session.user_id).await? {
            Some(benutzer) => Ok(benutzer),
            None => {
                // Benutzer geloescht: Session ist wertlos
                self.session_store.invalidieren(token).await;
                Err(AuthError::BenutzerNichtGefunden(session.user_id.to_string()))
            }
        }
    }
}

impl<U: UserRepository> IdentityProvider for AuthService<U> {
    async fn token_pruefen(&self, token: &str) -> AuthResult<Identitaet> {
        let benutzer = self.session_validieren(token).await?;
        Ok(Identitaet {
            user_id: benutzer.id,
            username: benutzer.username,
            rolle: benutzer.role,
        })
    }

    async fn rolle_laden(&self, user_id: UserId) -> AuthResult<Option<Rolle>> {
        Ok(self
            .user_repo
            .benutzer_laden(user_id)
            .await?
            .map(|b| b.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treffpunkt_db::SqliteDb;

    async fn service() -> AuthService<SqliteDb> {
        let db = SqliteDb::in_memory().await.expect("In-Memory DB");
        AuthService::neu(Arc::new(db), SessionStore::neu())
    }

    #[tokio::test]
    async fn registrieren_und_anmelden() {
        let svc = service().await;
        let user = svc
            .registrieren("alice", Some("alice@example.org"), "geheim123", Rolle::User)
            .await
            .unwrap();

        let (angemeldet, session) = svc.anmelden("alice", "geheim123").await.unwrap();
        assert_eq!(angemeldet.id, user.id);

        let identitaet = svc.token_pruefen(&session.token).await.unwrap();
        assert_eq!(identitaet.user_id, user.id);
        assert_eq!(identitaet.rolle, Rolle::User);
    }

    #[tokio::test]
    async fn doppelter_benutzername() {
        let svc = service().await;
        svc.registrieren("bob", None, "geheim123", Rolle::User).await.unwrap();
        let err = svc
            .registrieren("bob", None, "anderes123", Rolle::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BenutzernameVergeben(_)));
    }

    #[tokio::test]
    async fn ungueltige_eingaben() {
        let svc = service().await;
        assert!(matches!(
            svc.registrieren("  ", None, "geheim123", Rolle::User).await,
            Err(AuthError::UngueltigeEingabe(_))
        ));
        assert!(matches!(
            svc.registrieren("carol", None, "kurz", Rolle::User).await,
            Err(AuthError::UngueltigeEingabe(_))
        ));
    }

    #[tokio::test]
    async fn falsches_passwort() {
        let svc = service().await;
        svc.registrieren("dave", None, "richtig123", Rolle::User).await.unwrap();
        assert!(matches!(
            svc.anmelden("dave", "falsch123").await,
            Err(AuthError::UngueltigeAnmeldedaten)
        ));
        assert!(matches!(
            svc.anmelden("niemand", "egal1234").await,
            Err(AuthError::UngueltigeAnmeldedaten)
        ));
    }

    #[tokio::test]
    async fn abmelden_macht_token_ungueltig() {
        let svc = service().await;
        svc.registrieren("erin", None, "geheim123", Rolle::User).await.unwrap();
        let (_, session) = svc.anmelden("erin", "geheim123").await.unwrap();

        svc.abmelden(&session.token).await.unwrap();
        let err = svc.token_pruefen(&session.token).await.unwrap_err();
        assert!(err.ist_token_fehler());
        assert!(svc.abmelden(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn rolle_laden() {
        let svc = service().await;
        let moderator = svc
            .registrieren("mod", None, "geheim123", Rolle::Moderator)
            .await
            .unwrap();

        assert_eq!(
            svc.rolle_laden(moderator.id).await.unwrap(),
            Some(Rolle::Moderator)
        );
        assert_eq!(svc.rolle_laden(UserId::new()).await.unwrap(), None);
    }
}
