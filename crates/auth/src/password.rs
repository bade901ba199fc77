//! Passwort-Hashing mit Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::AuthError;

/// Argon2id mit 19 MiB, 2 Iterationen, 1 Thread
fn argon2_instanz() -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(19 * 1024, 2, 1, None)
        .map_err(|e| AuthError::PasswortHashing(format!("Argon2-Parameter ungueltig: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hasht ein Passwort mit zufaelligem Salt und gibt den PHC-String zurueck
pub fn passwort_hashen(passwort: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2_instanz()?
        .hash_password(passwort.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswortHashing(e.to_string()))
}

/// Verifiziert ein Passwort gegen einen gespeicherten PHC-Hash
pub fn passwort_verifizieren(passwort: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::PasswortHashing(format!("Ungueltiges Hash-Format: {e}")))?;

    match argon2_instanz()?.verify_password(passwort.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswortHashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashen_und_verifizieren() {
        let hash = passwort_hashen("sicheres_passwort_123!").expect("Hashing fehlgeschlagen");
        assert!(hash.starts_with("$argon2id$"));
        assert!(passwort_verifizieren("sicheres_passwort_123!", &hash).unwrap());
        assert!(!passwort_verifizieren("falsch", &hash).unwrap());
    }

    #[test]
    fn salt_macht_hashes_verschieden() {
        let a = passwort_hashen("gleich").unwrap();
        let b = passwort_hashen("gleich").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn kaputter_hash_ist_fehler() {
        assert!(passwort_verifizieren("passwort", "kein_gueltiger_hash").is_err());
    }
}
