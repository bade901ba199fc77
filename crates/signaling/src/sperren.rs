//! Schluessel-basierte async Sperren
//!
//! Serialisiert Check-then-Write-Sequenzen pro Schluessel, z.B. pro
//! (Kanal, Benutzer)-Paar, ohne unabhaengige Schluessel zu blockieren.
//! Eintraege werden entfernt sobald niemand mehr auf sie wartet.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct SchluesselSperren<K: Eq + Hash + Clone> {
    sperren: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> SchluesselSperren<K> {
    pub fn neu() -> Self {
        Self {
            sperren: DashMap::new(),
        }
    }

    /// Wartet auf die Sperre fuer `schluessel`
    pub async fn sperren(&self, schluessel: K) -> SchluesselGuard<'_, K> {
        let mutex = Arc::clone(
            self.sperren
                .entry(schluessel.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = Arc::clone(&mutex).lock_owned().await;
        SchluesselGuard {
            guard: Some(guard),
            mutex,
            schluessel,
            sperren: &self.sperren,
        }
    }

    /// Anzahl der aktuell belegten oder angefragten Schluessel
    pub fn anzahl(&self) -> usize {
        self.sperren.len()
    }
}

impl<K: Eq + Hash + Clone> Default for SchluesselSperren<K> {
    fn default() -> Self {
        Self::neu()
    }
}

pub struct SchluesselGuard<'a, K: Eq + Hash + Clone> {
    guard: Option<OwnedMutexGuard<()>>,
    mutex: Arc<Mutex<()>>,
    schluessel: K,
    sperren: &'a DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> Drop for SchluesselGuard<'_, K> {
    fn drop(&mut self) {
        self.guard.take();
        // 2 = Map-Eintrag + dieser Guard; jeder Wartende haelt eine weitere Referenz
        let mutex = &self.mutex;
        self.sperren.remove_if(&self.schluessel, |_, m| {
            Arc::ptr_eq(m, mutex) && Arc::strong_count(m) == 2
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn eintrag_wird_nach_freigabe_entfernt() {
        let sperren = SchluesselSperren::neu();
        {
            let _g = sperren.sperren(1u32).await;
            assert_eq!(sperren.anzahl(), 1);
        }
        assert_eq!(sperren.anzahl(), 0);
    }

    #[tokio::test]
    async fn verschiedene_schluessel_blockieren_nicht() {
        let sperren = SchluesselSperren::neu();
        let _a = sperren.sperren("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), sperren.sperren("b")).await;
        assert!(b.is_ok(), "Anderer Schluessel darf nicht blockieren");
    }

    #[tokio::test]
    async fn gleicher_schluessel_wird_serialisiert() {
        let sperren = Arc::new(SchluesselSperren::neu());
        let zaehler = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let erste = sperren.sperren(7u32).await;

        let s = Arc::clone(&sperren);
        let z = Arc::clone(&zaehler);
        let wartender = tokio::spawn(async move {
            let _g = s.sperren(7u32).await;
            z.lock().push("zweiter");
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        zaehler.lock().push("erster");
        drop(erste);

        wartender.await.unwrap();
        assert_eq!(*zaehler.lock(), vec!["erster", "zweiter"]);
        assert_eq!(sperren.anzahl(), 0);
    }
}
