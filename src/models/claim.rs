// ============================================================================
// Claimable balances (votes verrouillés)
// ============================================================================
// Un vote = un claimable balance Stellar avec deux claimants :
// - le votant, qui pourra récupérer ses tokens après une date (claim back)
// - la market key de la paire, qui ne peut jamais le réclamer
//
// Horizon retourne les prédicats en JSON, on ne parse que ce dont on a besoin
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{parse_timestamp, PairStats};

/// Un claimable balance tel que retourné par Horizon
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimableBalance {
    pub id: String,
    /// Asset au format Horizon : "native" ou "CODE:ISSUER"
    pub asset: String,
    pub amount: String,
    pub sponsor: Option<String>,
    pub last_modified_time: Option<String>,
    pub claimants: Vec<Claimant>,
}

/// Un destinataire possible d'un claimable balance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Claimant {
    pub destination: String,
    pub predicate: serde_json::Value,
}

impl Claimant {
    /// Date à partir de laquelle le claimant peut réclamer
    ///
    /// Prédicat attendu : {"not": {"abs_before": "..."}} (ou abs_before_epoch)
    pub fn claimable_after(&self) -> Option<DateTime<Utc>> {
        let inner = self.predicate.get("not")?;

        if let Some(epoch) = inner.get("abs_before_epoch").and_then(|v| v.as_str()) {
            let seconds = epoch.parse::<i64>().ok()?;
            return DateTime::from_timestamp(seconds, 0);
        }

        inner
            .get("abs_before")
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp)
    }
}

impl ClaimableBalance {
    /// Vérifie si le compte fait partie des claimants
    pub fn has_claimant(&self, account_id: &str) -> bool {
        self.claimants.iter().any(|c| c.destination == account_id)
    }

    /// Claimant correspondant au compte
    pub fn claimant(&self, account_id: &str) -> Option<&Claimant> {
        self.claimants.iter().find(|c| c.destination == account_id)
    }

    /// Montant en nombre flottant
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.parse::<f64>().ok()
    }
}

/// État des claimable balances d'un compte, publié par le poller Horizon
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClaimableState {
    pub account_id: String,
    /// true une fois le premier chargement complet terminé
    pub loaded: bool,
    pub balances: Vec<ClaimableBalance>,
}

impl ClaimableState {
    /// État initial (pas encore chargé) pour un compte
    pub fn pending(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            ..Self::default()
        }
    }

    /// Market keys pour lesquelles le compte a voté
    pub fn market_keys(&self) -> Vec<String> {
        keys_similar_to_market_keys(&self.balances, &self.account_id)
    }
}

/// Une ligne de la liste "claim back" d'une paire
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimBackEntry {
    pub id: String,
    pub amount: String,
    pub last_modified_time: Option<DateTime<Utc>>,
    /// Date à partir de laquelle le vote peut être récupéré
    pub claim_back_date: Option<DateTime<Utc>>,
    pub is_downvote: bool,
}

impl ClaimBackEntry {
    /// Vérifie si le vote peut être récupéré maintenant
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.claim_back_date {
            Some(date) => date <= now,
            None => true,
        }
    }
}

/// Liste des votes d'un compte pour une paire, du plus récent au plus ancien
///
/// CONCEPT RUST : Iterator chaining
/// - filter : garde les balances du bon asset, où le compte et la paire
///   sont claimants
/// - map : construit les ClaimBackEntry
pub fn pair_votes(
    balances: &[ClaimableBalance],
    pair: &PairStats,
    account_id: &str,
    vote_asset: &str,
) -> Vec<ClaimBackEntry> {
    let downvote_key = pair.downvote_account_id.as_deref();

    let mut entries: Vec<ClaimBackEntry> = balances
        .iter()
        .filter(|balance| balance.asset == vote_asset)
        .filter_map(|balance| {
            let owner = balance.claimant(account_id)?;
            let is_upvote = balance.has_claimant(&pair.market_key);
            let is_downvote = downvote_key.map_or(false, |key| balance.has_claimant(key));

            if !is_upvote && !is_downvote {
                return None;
            }

            Some(ClaimBackEntry {
                id: balance.id.clone(),
                amount: balance.amount.clone(),
                last_modified_time: balance
                    .last_modified_time
                    .as_deref()
                    .and_then(parse_timestamp),
                claim_back_date: owner.claimable_after(),
                is_downvote: is_downvote && !is_upvote,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.last_modified_time.cmp(&a.last_modified_time));
    entries
}

/// Market keys pour lesquelles le compte a voté
///
/// Ce sont les autres claimants des claimable balances du compte,
/// dédoublonnés en gardant l'ordre d'apparition
pub fn keys_similar_to_market_keys(balances: &[ClaimableBalance], account_id: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();

    for balance in balances.iter().filter(|b| b.has_claimant(account_id)) {
        for claimant in &balance.claimants {
            if claimant.destination != account_id && !keys.contains(&claimant.destination) {
                keys.push(claimant.destination.clone());
            }
        }
    }

    keys
}
