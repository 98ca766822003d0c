// ============================================================================
// Module : api
// ============================================================================
// Ce module contient les clients HTTP :
// - AquaClient : trackers de market keys et de votes (listes de paires)
// - HorizonClient : claimable balances d'un compte Stellar
// ============================================================================

pub mod aqua;    // Client des trackers AQUA
pub mod horizon; // Client Horizon (claimable balances)

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Asset, PairStats, PairsPage, SortMode, TotalStats};

// Re-export des clients
pub use aqua::AquaClient;
pub use horizon::HorizonClient;

/// Réponse paginée des trackers : {count, next, previous, results}
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Sources des listes de paires
///
/// CONCEPT RUST : #[async_trait] + Send + Sync
/// - Méthodes async dans un trait utilisable en objet (dyn PairsApi)
/// - Le contrôleur ne connaît que ce trait, les tests injectent un faux
#[async_trait]
pub trait PairsApi: Send + Sync {
    /// Liste triée (popular / topVoted), paginée
    async fn get_pairs_list(&self, sort: SortMode, page_size: usize, page: usize) -> Result<PairsPage>;

    /// Paires contenant base (et counter si fourni), paginées
    async fn get_filtered_pairs_list(
        &self,
        base: &Asset,
        counter: Option<&Asset>,
        page_size: usize,
        page: usize,
    ) -> Result<PairsPage>;

    /// Paires correspondant aux market keys données (votes de l'utilisateur)
    async fn get_user_pairs_list(&self, keys: &[String]) -> Result<Vec<PairStats>>;

    /// Totaux des votes de toutes les paires
    async fn get_total_voting_stats(&self) -> Result<TotalStats>;

    /// Rafraîchit les votes des paires affichées
    async fn update_votes_for_market_keys(&self, pairs: &[PairStats]) -> Result<Vec<PairStats>>;
}
