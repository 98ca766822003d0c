// ============================================================================
// Stockage local clé/valeur
// ============================================================================
// Équivalent du localStorage d'un navigateur : des chaînes rangées par clé,
// lues et écrites de manière synchrone
//
// CONCEPTS RUST :
// 1. Trait : interface commune (fichier JSON ou mémoire)
// 2. Mutex : mutabilité intérieure, le trait prend &self
// 3. Écriture atomique : fichier temporaire puis rename
// ============================================================================

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

/// Stockage clé/valeur synchrone
///
/// CONCEPT RUST : Send + Sync
/// - Le stockage est partagé via Arc entre le bulletin et le store d'assets
pub trait Storage: Send + Sync {
    /// Lit une valeur (None si la clé est absente)
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Écrit une valeur (remplace l'ancienne)
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Supprime une clé (sans erreur si absente)
    fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// Stockage en mémoire (tests, sessions éphémères)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| anyhow!("Stockage mémoire verrouillé"))?;
        Ok(items.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow!("Stockage mémoire verrouillé"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow!("Stockage mémoire verrouillé"))?;
        items.remove(key);
        Ok(())
    }
}

// ============================================================================
// FileStorage
// ============================================================================

/// Stockage persistant dans un fichier JSON {clé: valeur}
///
/// Le fichier est réécrit en entier à chaque modification
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Ouvre (ou crée) le stockage à l'emplacement donné
    ///
    /// Un fichier illisible est ignoré : on repart d'un stockage vide
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Échec de la création de {}", parent.display()))?;
        }

        let items = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupted storage file, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Échec de la lecture de {}", path.display()))
            }
        };

        debug!(path = %path.display(), keys = items.len(), "Storage opened");

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Emplacement par défaut : <data_dir>/aquavote/storage.json
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aquavote")
            .join("storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(items).context("Échec de la sérialisation du stockage")?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, content)
            .with_context(|| format!("Échec de l'écriture de {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Échec du remplacement de {}", self.path.display()))?;

        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|_| anyhow!("Stockage fichier verrouillé"))?;
        Ok(items.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow!("Stockage fichier verrouillé"))?;
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|_| anyhow!("Stockage fichier verrouillé"))?;
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("aquavote-test-{}-{}", std::process::id(), name))
            .join("storage.json")
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));

        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_storage_persists() {
        let path = temp_path("persist");
        let _ = fs::remove_file(&path);

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("selected pairs", "[]").unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("selected pairs").unwrap().as_deref(), Some("[]"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_storage_corrupted_starts_empty() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{pas du json").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("anything").unwrap(), None);

        let _ = fs::remove_file(&path);
    }
}
