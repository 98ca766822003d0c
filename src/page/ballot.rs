// ============================================================================
// Bulletin de vote (paires sélectionnées)
// ============================================================================
// Les paires que l'utilisateur prépare avant de voter, persistées sous la
// clé "selected pairs" (tableau JSON de PairStats)
//
// Chaque mutation est écrite immédiatement : le stockage reste la source
// de vérité entre deux sessions
// ============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::models::PairStats;
use crate::storage::Storage;

/// Clé de stockage du bulletin
pub const SELECTED_PAIRS_KEY: &str = "selected pairs";

/// Ensemble ordonné de paires, unique par market_key
pub struct Ballot {
    storage: Arc<dyn Storage>,
    pairs: Vec<PairStats>,
}

impl Ballot {
    /// Charge le bulletin depuis le stockage
    ///
    /// Absent ou corrompu : bulletin vide (jamais fatal)
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let pairs = read_pairs(storage.as_ref());
        debug!(pairs = pairs.len(), "Ballot loaded");
        Self { storage, pairs }
    }

    /// Ajoute la paire si absente, la retire sinon
    ///
    /// Retourne true si la paire est maintenant dans le bulletin.
    /// L'état en mémoire est mis à jour même si la persistance échoue
    pub fn toggle(&mut self, pair: &PairStats) -> Result<bool> {
        let selected = match self
            .pairs
            .iter()
            .position(|p| p.market_key == pair.market_key)
        {
            Some(index) => {
                self.pairs.remove(index);
                false
            }
            None => {
                self.pairs.push(pair.clone());
                true
            }
        };

        info!(market_key = %pair.market_key, selected, total = self.pairs.len(), "Ballot toggled");
        self.persist()?;
        Ok(selected)
    }

    /// Vide le bulletin (après une soumission réussie)
    pub fn clear(&mut self) -> Result<()> {
        self.pairs.clear();
        self.storage
            .remove(SELECTED_PAIRS_KEY)
            .context("Échec de la suppression du bulletin")
    }

    /// Relit le bulletin depuis le stockage
    ///
    /// Une soumission partielle peut laisser des paires sélectionnées
    pub fn reload(&mut self) {
        self.pairs = read_pairs(self.storage.as_ref());
        debug!(pairs = self.pairs.len(), "Ballot reloaded");
    }

    pub fn contains(&self, market_key: &str) -> bool {
        self.pairs.iter().any(|p| p.market_key == market_key)
    }

    pub fn pairs(&self) -> &[PairStats] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.pairs).context("Échec de la sérialisation du bulletin")?;
        self.storage
            .set(SELECTED_PAIRS_KEY, &raw)
            .context("Échec de l'écriture du bulletin")
    }
}

fn read_pairs(storage: &dyn Storage) -> Vec<PairStats> {
    match storage.get(SELECTED_PAIRS_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Corrupted ballot in storage, starting empty");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(error = ?e, "Failed to read ballot from storage");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn pair(market_key: &str) -> PairStats {
        PairStats {
            market_key: market_key.to_string(),
            asset1_code: "AQUA".to_string(),
            asset2_code: "XLM".to_string(),
            ..PairStats::default()
        }
    }

    #[test]
    fn test_toggle_twice_restores_storage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut ballot = Ballot::load(storage.clone());

        ballot.toggle(&pair("GA")).unwrap();
        let before = storage.get(SELECTED_PAIRS_KEY).unwrap();

        assert!(ballot.toggle(&pair("GB")).unwrap());
        assert!(ballot.contains("GB"));
        assert!(!ballot.toggle(&pair("GB")).unwrap());
        assert!(!ballot.contains("GB"));

        assert_eq!(storage.get(SELECTED_PAIRS_KEY).unwrap(), before);
        assert_eq!(ballot.len(), 1);
    }

    #[test]
    fn test_ballot_survives_reload() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut ballot = Ballot::load(storage.clone());
        ballot.toggle(&pair("GA")).unwrap();
        ballot.toggle(&pair("GB")).unwrap();

        let reloaded = Ballot::load(storage);
        let keys: Vec<&str> = reloaded.pairs().iter().map(|p| p.market_key.as_str()).collect();
        assert_eq!(keys, vec!["GA", "GB"]);
    }

    #[test]
    fn test_corrupted_storage_starts_empty() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set(SELECTED_PAIRS_KEY, "not json").unwrap();

        let ballot = Ballot::load(storage);
        assert!(ballot.is_empty());
    }

    #[test]
    fn test_clear_then_reload_picks_up_leftovers() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut ballot = Ballot::load(storage.clone());
        ballot.toggle(&pair("GA")).unwrap();

        ballot.clear().unwrap();
        assert!(ballot.is_empty());
        assert_eq!(storage.get(SELECTED_PAIRS_KEY).unwrap(), None);

        // Une soumission partielle réécrit les paires restantes
        storage
            .set(SELECTED_PAIRS_KEY, &serde_json::to_string(&vec![pair("GC")]).unwrap())
            .unwrap();
        ballot.reload();
        assert!(ballot.contains("GC"));
    }
}
