// ============================================================================
// API Client : trackers AQUA
// ============================================================================
// Deux services REST paginés ({count, next, previous, results}) :
// - market keys tracker : les paires (assets + compte market key)
// - voting tracker : les snapshots de votes par market key
//
// Une paire affichée = jointure market key + snapshot sur market_key
// ============================================================================

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};

use crate::api::{ListResponse, PairsApi};
use crate::models::{Asset, MarketKey, MarketVotes, PairStats, PairsPage, SortMode, TotalStats};

/// URL par défaut du tracker de market keys
pub const DEFAULT_MARKET_KEYS_URL: &str = "https://marketkeys-tracker.aqua.network/api";

/// URL par défaut du tracker de votes
pub const DEFAULT_VOTING_URL: &str = "https://voting-tracker.aqua.network/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Client HTTP des trackers AQUA
///
/// CONCEPT RUST : reqwest::Client réutilisé
/// - Le client garde un pool de connexions, on le crée une seule fois
/// - Clone est peu coûteux (Arc interne)
#[derive(Debug, Clone)]
pub struct AquaClient {
    client: reqwest::Client,
    market_keys_url: String,
    voting_url: String,
}

impl AquaClient {
    pub fn new(market_keys_url: &str, voting_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("aquavote/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            market_keys_url: market_keys_url.trim_end_matches('/').to_string(),
            voting_url: voting_url.trim_end_matches('/').to_string(),
        })
    }

    fn market_keys_endpoint(&self, path: &str) -> Result<Url> {
        endpoint(&self.market_keys_url, path)
    }

    fn voting_endpoint(&self, path: &str) -> Result<Url> {
        endpoint(&self.voting_url, path)
    }

    /// GET + vérification du statut + parsing JSON
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "Sending HTTP request");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Échec de la requête HTTP vers {}", url.path()))?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Tracker returned error status");
            bail!("Le tracker a retourné une erreur : HTTP {} ({})", status, url.path());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Échec du parsing JSON de {}", url.path()))
    }

    /// Market keys par account id
    async fn market_keys_by_ids(&self, ids: &[String]) -> Result<Vec<MarketKey>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = self.market_keys_endpoint("market-keys/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &ids.len().to_string());
            for id in ids {
                query.append_pair("account_id", id);
            }
        }

        let response: ListResponse<MarketKey> = self.get_json(url).await?;
        Ok(response.results)
    }

    /// Snapshots de votes par market key
    async fn votes_by_keys(&self, keys: &[String]) -> Result<Vec<MarketVotes>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = self.voting_endpoint("voting-snapshot/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &keys.len().to_string());
            for key in keys {
                query.append_pair("market_key", key);
            }
        }

        let response: ListResponse<MarketVotes> = self.get_json(url).await?;
        Ok(response.results)
    }
}

#[async_trait]
impl PairsApi for AquaClient {
    #[instrument(skip(self))]
    async fn get_pairs_list(&self, sort: SortMode, page_size: usize, page: usize) -> Result<PairsPage> {
        let path = match sort {
            SortMode::Popular => "voting-snapshot/top-volume/",
            SortMode::TopVoted => "voting-snapshot/top-voted/",
            SortMode::YourVotes => bail!("Le tri \"yourVotes\" n'est pas paginé"),
        };

        let mut url = self.voting_endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("limit", &page_size.to_string())
            .append_pair("page", &page.to_string());

        let snapshot: ListResponse<MarketVotes> = self.get_json(url).await?;
        let keys: Vec<String> = snapshot.results.iter().map(|v| v.market_key.clone()).collect();
        let market_keys = self.market_keys_by_ids(&keys).await?;

        let pairs = join_by_votes(&snapshot.results, market_keys);
        info!(pairs = pairs.len(), count = snapshot.count, "Pairs list fetched");
        Ok(PairsPage {
            pairs,
            count: snapshot.count,
        })
    }

    #[instrument(skip(self, base, counter), fields(base = %base.to_url_param()))]
    async fn get_filtered_pairs_list(
        &self,
        base: &Asset,
        counter: Option<&Asset>,
        page_size: usize,
        page: usize,
    ) -> Result<PairsPage> {
        let mut url = self.market_keys_endpoint("market-keys/search/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("asset", &base.to_url_param());
            if let Some(counter) = counter {
                query.append_pair("asset", &counter.to_url_param());
            }
            query
                .append_pair("limit", &page_size.to_string())
                .append_pair("page", &page.to_string());
        }

        let found: ListResponse<MarketKey> = self.get_json(url).await?;
        let keys: Vec<String> = found.results.iter().map(|k| k.account_id.clone()).collect();
        let votes = self.votes_by_keys(&keys).await?;

        let pairs = join_by_keys(found.results, &votes);
        info!(pairs = pairs.len(), count = found.count, "Filtered pairs fetched");
        Ok(PairsPage {
            pairs,
            count: found.count,
        })
    }

    #[instrument(skip(self, keys), fields(keys = keys.len()))]
    async fn get_user_pairs_list(&self, keys: &[String]) -> Result<Vec<PairStats>> {
        let market_keys = self.market_keys_by_ids(keys).await?;
        let found: Vec<String> = market_keys.iter().map(|k| k.account_id.clone()).collect();
        let votes = self.votes_by_keys(&found).await?;

        let pairs = join_by_keys(market_keys, &votes);
        info!(pairs = pairs.len(), "User pairs fetched");
        Ok(pairs)
    }

    #[instrument(skip(self))]
    async fn get_total_voting_stats(&self) -> Result<TotalStats> {
        let url = self.voting_endpoint("voting-snapshot/stats/")?;
        self.get_json(url).await
    }

    #[instrument(skip(self, pairs), fields(pairs = pairs.len()))]
    async fn update_votes_for_market_keys(&self, pairs: &[PairStats]) -> Result<Vec<PairStats>> {
        let keys: Vec<String> = pairs.iter().map(|p| p.market_key.clone()).collect();
        let votes = self.votes_by_keys(&keys).await?;
        Ok(revalue(pairs, &votes))
    }
}

// ============================================================================
// Jointures
// ============================================================================

fn endpoint(base: &str, path: &str) -> Result<Url> {
    Url::parse(&format!("{}/{}", base, path)).with_context(|| format!("URL invalide : {}/{}", base, path))
}

/// Jointure dans l'ordre des snapshots (listes triées par le voting tracker)
///
/// Un snapshot sans market key connue est ignoré
fn join_by_votes(votes: &[MarketVotes], market_keys: Vec<MarketKey>) -> Vec<PairStats> {
    let mut by_id: HashMap<String, MarketKey> = market_keys
        .into_iter()
        .map(|key| (key.account_id.clone(), key))
        .collect();

    votes
        .iter()
        .filter_map(|vote| {
            let key = by_id.remove(&vote.market_key)?;
            Some(PairStats::join(key, Some(vote)))
        })
        .collect()
}

/// Jointure dans l'ordre des market keys (recherche, votes utilisateur)
///
/// Une paire sans snapshot garde des votes vides
fn join_by_keys(market_keys: Vec<MarketKey>, votes: &[MarketVotes]) -> Vec<PairStats> {
    let by_key: HashMap<&str, &MarketVotes> = votes.iter().map(|v| (v.market_key.as_str(), v)).collect();

    market_keys
        .into_iter()
        .map(|key| {
            let vote = by_key.get(key.account_id.as_str()).copied();
            PairStats::join(key, vote)
        })
        .collect()
}

/// Applique les snapshots frais aux paires affichées, ordre conservé
fn revalue(pairs: &[PairStats], votes: &[MarketVotes]) -> Vec<PairStats> {
    let by_key: HashMap<&str, &MarketVotes> = votes.iter().map(|v| (v.market_key.as_str(), v)).collect();

    pairs
        .iter()
        .map(|pair| {
            let mut pair = pair.clone();
            if let Some(vote) = by_key.get(pair.market_key.as_str()) {
                pair.apply_votes(vote);
            }
            pair
        })
        .collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================
