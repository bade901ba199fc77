//! Oeffentliche Typen und Grenzen des Chat-Service

use treffpunkt_core::ChannelId;

/// Maximale Nachrichtenlaenge in Zeichen
pub const MAX_NACHRICHT_LAENGE: usize = 4096;

pub const MAX_EMOJI_LAENGE: usize = 32;

pub const STANDARD_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Anfrage fuer den Nachrichtenverlauf eines Kanals
#[derive(Debug, Clone)]
pub struct HistoryAnfrage {
    pub channel_id: ChannelId,
    /// Default 50, wird auf 1..=100 begrenzt
    pub limit: Option<i64>,
}

impl HistoryAnfrage {
    pub fn effektives_limit(&self) -> i64 {
        self.limit
            .unwrap_or(STANDARD_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}
