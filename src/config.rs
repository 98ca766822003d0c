// ============================================================================
// Configuration
// ============================================================================
// Fichier JSON optionnel : <config_dir>/aquavote/config.json
// Chaque champ a une valeur par défaut, le fichier peut être partiel
//
// Surcharges par variables d'environnement :
// - AQUAVOTE_ACCOUNT : compte Stellar connecté
// - AQUAVOTE_API_URL : URL commune des deux trackers
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::aqua::{DEFAULT_MARKET_KEYS_URL, DEFAULT_VOTING_URL};
use crate::api::horizon::DEFAULT_HORIZON_URL;
use crate::models::is_valid_account_id;
use crate::page::PAGE_SIZE;

pub const ACCOUNT_ENV: &str = "AQUAVOTE_ACCOUNT";
pub const API_URL_ENV: &str = "AQUAVOTE_API_URL";

/// Asset utilisé pour voter (format Horizon "CODE:ISSUER")
pub const DEFAULT_VOTE_ASSET: &str = "AQUA:GBNZILSTVQZ4R7IKQDGHYGY2QXL5QOFJYQMXPKWRRM5PAV7Y4M67AQUA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub market_keys_url: String,
    pub voting_url: String,
    pub horizon_url: String,
    pub page_size: usize,
    /// Secondes entre deux rafraîchissements de la liste
    pub update_interval_secs: u64,
    /// Secondes entre deux lectures des claimable balances
    pub claimable_poll_secs: u64,
    pub vote_asset: String,
    pub account_id: Option<String>,
    /// Répertoire des données (stockage, logs), sinon le dossier utilisateur
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            market_keys_url: DEFAULT_MARKET_KEYS_URL.to_string(),
            voting_url: DEFAULT_VOTING_URL.to_string(),
            horizon_url: DEFAULT_HORIZON_URL.to_string(),
            page_size: PAGE_SIZE,
            update_interval_secs: 60,
            claimable_poll_secs: 30,
            vote_asset: DEFAULT_VOTE_ASSET.to_string(),
            account_id: None,
            data_dir: None,
        }
    }
}

impl Settings {
    /// Emplacement par défaut du fichier de configuration
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aquavote")
            .join("config.json")
    }

    /// Charge la configuration : fichier (s'il existe) puis environnement
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Lit le fichier JSON, valeurs par défaut s'il est absent
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read(path).with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        let settings = serde_json::from_slice(&data)
            .with_context(|| format!("Configuration invalide : {}", path.display()))?;
        info!(path = %path.display(), "Config loaded");
        Ok(settings)
    }

    /// Applique les surcharges d'environnement
    ///
    /// CONCEPT RUST : closure en paramètre
    /// - Les tests passent leur propre lecteur au lieu de modifier l'env
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(account) = var(ACCOUNT_ENV).filter(|v| !v.trim().is_empty()) {
            self.account_id = Some(account.trim().to_string());
        }
        if let Some(url) = var(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            let url = url.trim().trim_end_matches('/').to_string();
            self.market_keys_url = url.clone();
            self.voting_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(account) = &self.account_id {
            if !is_valid_account_id(account) {
                bail!("Compte Stellar invalide : {}", account);
            }
        }
        if self.page_size == 0 {
            bail!("page_size doit être supérieur à 0");
        }
        if self.update_interval_secs == 0 || self.claimable_poll_secs == 0 {
            bail!("Les intervalles de rafraîchissement doivent être supérieurs à 0");
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn claimable_poll_interval(&self) -> Duration {
        Duration::from_secs(self.claimable_poll_secs)
    }

    /// Répertoire des données de l'application
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("aquavote")
        })
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir().join("storage.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "GBNZILSTVQZ4R7IKQDGHYGY2QXL5QOFJYQMXPKWRRM5PAV7Y4M67AQUA";

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("aquavote-no-such-config.json");
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.update_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file() {
        let dir = std::env::temp_dir().join(format!("aquavote-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"page_size": 10, "data_dir": "/tmp/aquavote"}"#).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.voting_url, DEFAULT_VOTING_URL);
        assert_eq!(settings.storage_path(), PathBuf::from("/tmp/aquavote/storage.json"));

        std::fs::write(&path, "{oops").unwrap();
        assert!(Settings::from_file(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(|key| match key {
            ACCOUNT_ENV => Some(ACCOUNT.to_string()),
            API_URL_ENV => Some("http://localhost:8000/api/".to_string()),
            _ => None,
        });

        assert_eq!(settings.account_id.as_deref(), Some(ACCOUNT));
        assert_eq!(settings.market_keys_url, "http://localhost:8000/api");
        assert_eq!(settings.voting_url, "http://localhost:8000/api");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_account_rejected() {
        let settings = Settings {
            account_id: Some("not-an-account".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
