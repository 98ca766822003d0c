// ============================================================================
// Timer de rafraîchissement
// ============================================================================
// Période fixe (60s par défaut), réarmée à chaque changement de filtres
// ou de page. Le timer ne tourne pas tout seul : l'event loop l'interroge
// avec poll(now)
//
// CONCEPT RUST : Instant injecté
// - Toutes les méthodes prennent `now` en paramètre
// - Les tests avancent le temps sans sleep
// ============================================================================

use std::time::{Duration, Instant};

use tracing::trace;

use crate::models::{Asset, SortMode};

/// Période de rafraîchissement par défaut
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Ce qui réarme le timer quand il change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerKey {
    pub sort: Option<SortMode>,
    pub base: Option<Asset>,
    pub counter: Option<Asset>,
    pub page: usize,
}

#[derive(Debug, Clone)]
pub struct PollingTimer {
    period: Duration,
    armed_at: Instant,
    key: Option<TimerKey>,
    paused: bool,
    update_index: u64,
}

impl PollingTimer {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            armed_at: now,
            key: None,
            paused: false,
            update_index: 0,
        }
    }

    /// Réarme le timer si la clé a changé
    ///
    /// Retourne true si le timer a été réarmé
    pub fn sync(&mut self, key: TimerKey, now: Instant) -> bool {
        if self.key.as_ref() == Some(&key) {
            return false;
        }
        trace!(?key, "Polling timer rearmed");
        self.key = Some(key);
        self.armed_at = now;
        true
    }

    /// Suspend ou reprend le timer (reprendre réarme)
    pub fn set_paused(&mut self, paused: bool, now: Instant) {
        if self.paused && !paused {
            self.armed_at = now;
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Retourne le nouvel update_index si une période s'est écoulée
    ///
    /// Plusieurs périodes manquées ne produisent qu'un seul tick
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        if self.paused || now.saturating_duration_since(self.armed_at) < self.period {
            return None;
        }

        self.armed_at = now;
        self.update_index += 1;
        Some(self.update_index)
    }

    /// Temps restant avant le prochain tick
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if self.paused {
            return None;
        }
        Some(self.period.saturating_sub(now.saturating_duration_since(self.armed_at)))
    }

    pub fn update_index(&self) -> u64 {
        self.update_index
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for PollingTimer {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL, Instant::now())
    }
}
