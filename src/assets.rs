// ============================================================================
// Store des assets connus
// ============================================================================
// Mémorise les assets rencontrés dans les paires, pour que le reste de
// l'application puisse résoudre leur nom d'affichage
//
// Le cache est invalidé toutes les 24h (clé "update assets timestamp")
// ============================================================================

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::models::AssetSimple;
use crate::storage::Storage;

/// Clé de stockage de la date de dernière invalidation (epoch millis)
pub const UPDATE_ASSETS_TIMESTAMP_KEY: &str = "update assets timestamp";

/// Clé de stockage des assets connus
pub const ASSETS_KEY: &str = "assets info";

/// Durée de validité du cache d'assets
pub fn update_period() -> Duration {
    Duration::hours(24)
}

/// Store partagé des assets connus
///
/// CONCEPT RUST : Arc<dyn Storage> + Mutex
/// - Le store est partagé (Arc) entre le contrôleur et l'UI
/// - Le Mutex protège l'ensemble des assets
pub struct AssetStore {
    storage: Arc<dyn Storage>,
    known: Mutex<BTreeSet<AssetSimple>>,
}

impl AssetStore {
    /// Charge le store depuis le stockage (vide si absent ou corrompu)
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let known = match storage.get(ASSETS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Corrupted assets cache, starting empty");
                BTreeSet::new()
            }),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!(error = ?e, "Failed to read assets cache");
                BTreeSet::new()
            }
        };

        Self {
            storage,
            known: Mutex::new(known),
        }
    }

    /// Invalide le cache s'il a plus de 24h (ou si la date est absente)
    ///
    /// Retourne true si le cache a été vidé
    pub fn refresh_if_stale(&self, now: DateTime<Utc>) -> Result<bool> {
        let stamp = self
            .storage
            .get(UPDATE_ASSETS_TIMESTAMP_KEY)?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        let stale = match stamp {
            Some(stamp) => now - stamp > update_period(),
            None => true,
        };

        if stale {
            info!(?stamp, "Assets cache expired, clearing");
            self.clear()?;
            self.storage
                .set(UPDATE_ASSETS_TIMESTAMP_KEY, &now.timestamp_millis().to_string())
                .context("Échec de l'écriture de la date du cache d'assets")?;
        }

        Ok(stale)
    }

    /// Ajoute les assets inconnus au store
    ///
    /// Fire-and-forget : une erreur de persistance est loggée, pas propagée.
    /// Retourne le nombre d'assets ajoutés
    pub fn process_new_assets(&self, assets: &[AssetSimple]) -> usize {
        let snapshot = {
            let mut known = match self.known.lock() {
                Ok(known) => known,
                Err(_) => {
                    warn!("Assets store lock poisoned");
                    return 0;
                }
            };

            let before = known.len();
            known.extend(assets.iter().cloned());
            let added = known.len() - before;

            if added == 0 {
                return 0;
            }
            debug!(added, total = known.len(), "New assets registered");
            (added, known.clone())
        };

        let (added, known) = snapshot;
        if let Err(e) = self.persist(&known) {
            warn!(error = ?e, "Failed to persist assets cache");
        }
        added
    }

    /// Vérifie si l'asset est connu
    pub fn contains(&self, asset: &AssetSimple) -> bool {
        self.known
            .lock()
            .map(|known| known.contains(asset))
            .unwrap_or(false)
    }

    /// Nombre d'assets connus
    pub fn len(&self) -> usize {
        self.known.lock().map(|known| known.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vide le store et le cache persistant
    pub fn clear(&self) -> Result<()> {
        self.known
            .lock()
            .map_err(|_| anyhow!("Store d'assets verrouillé"))?
            .clear();
        self.storage.remove(ASSETS_KEY)
    }

    fn persist(&self, known: &BTreeSet<AssetSimple>) -> Result<()> {
        let raw = serde_json::to_string(known).context("Échec de la sérialisation des assets")?;
        self.storage.set(ASSETS_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<dyn Storage>, AssetStore) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = AssetStore::load(storage.clone());
        (storage, store)
    }

    #[test]
    fn test_process_new_assets_dedup() {
        let (_, store) = store();
        let aqua = AssetSimple::new("AQUA", Some("GISSUER"));
        let xlm = AssetSimple::new("XLM", None);

        assert_eq!(store.process_new_assets(&[aqua.clone(), xlm.clone(), aqua.clone()]), 2);
        assert_eq!(store.process_new_assets(&[xlm]), 0);
        assert!(store.contains(&aqua));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_assets_survive_reload() {
        let (storage, store) = store();
        store.process_new_assets(&[AssetSimple::new("AQUA", Some("GISSUER"))]);

        let reloaded = AssetStore::load(storage);
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_stale_cache_is_cleared() {
        let (storage, store) = store();
        let now = Utc::now();
        store.process_new_assets(&[AssetSimple::new("AQUA", Some("GISSUER"))]);

        // Pas de date : le cache est considéré comme expiré
        assert!(store.refresh_if_stale(now).unwrap());
        assert!(store.is_empty());

        store.process_new_assets(&[AssetSimple::new("AQUA", Some("GISSUER"))]);
        assert!(!store.refresh_if_stale(now + Duration::hours(23)).unwrap());
        assert_eq!(store.len(), 1);

        assert!(store.refresh_if_stale(now + Duration::hours(25)).unwrap());
        assert!(store.is_empty());

        let stamp = storage.get(UPDATE_ASSETS_TIMESTAMP_KEY).unwrap().unwrap();
        assert_eq!(stamp, (now + Duration::hours(25)).timestamp_millis().to_string());
    }
}
