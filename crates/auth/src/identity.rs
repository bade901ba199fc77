//! Schnittstelle zum Identity Provider
//!
//! Die Signalisierung kennt nur diesen Trait: Token pruefen beim
//! `authenticate` und Rollen nachschlagen fuer Moderationsaktionen.

use treffpunkt_core::{Rolle, UserId};

use crate::error::AuthResult;

/// Vom Identity Provider bestaetigte Identitaet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identitaet {
    pub user_id: UserId,
    pub username: String,
    pub rolle: Rolle,
}

#[allow(async_fn_in_trait)]
pub trait IdentityProvider: Send + Sync {
    /// Prueft ein Session-Token
    ///
    /// Unbekannte oder abgelaufene Tokens liefern `SessionUngueltig` bzw.
    /// `SessionAbgelaufen`.
    async fn token_pruefen(&self, token: &str) -> AuthResult<Identitaet>;

    /// Aktuelle Rolle eines Benutzers, `None` wenn er nicht existiert
    async fn rolle_laden(&self, user_id: UserId) -> AuthResult<Option<Rolle>>;
}
