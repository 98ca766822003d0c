// ============================================================================
// Structure : PairStats
// ============================================================================
// Une paire de trading votable : la "market key" (compte qui représente la
// paire sur la blockchain) jointe à son snapshot de votes
//
// CONCEPTS RUST :
// 1. #[serde(default)] : champs absents du JSON -> valeur par défaut
// 2. Option<String> pour les décimaux : l'API envoie "1234.5678" en texte,
//    on parse à la demande pour ne pas perdre de précision au stockage
// 3. Composition : PairStats = MarketKey + MarketVotes
// ============================================================================

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Asset, AssetSimple, DecodeError};

/// Pourcentage minimum des votes pour qu'une paire reçoive des rewards
pub const MIN_REWARDS_PERCENT: f64 = 1.0;

/// Market key : compte Stellar qui représente une paire votable
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketKey {
    pub account_id: String,
    pub asset1: String,
    pub asset1_code: String,
    pub asset1_issuer: String,
    pub asset2: String,
    pub asset2_code: String,
    pub asset2_issuer: String,
    pub created_at: Option<String>,
    pub id: Option<u64>,
    pub locked_at: Option<String>,
    pub downvote_account_id: Option<String>,
}

/// Snapshot des votes d'une market key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketVotes {
    pub market_key: String,
    pub rank: Option<u32>,
    pub timestamp: Option<String>,
    pub votes_value: Option<String>,
    pub voting_amount: Option<u64>,
    pub adjusted_votes_value: Option<String>,
    pub upvote_value: Option<String>,
    pub downvote_value: Option<String>,
}

/// Paire avec ses statistiques de votes
///
/// Sérialisée telle quelle dans le stockage local (bulletin de vote)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PairStats {
    /// Clé unique de la paire (account id de la market key)
    pub market_key: String,

    pub account_id: String,
    pub asset1: String,
    pub asset1_code: String,
    pub asset1_issuer: String,
    pub asset2: String,
    pub asset2_code: String,
    pub asset2_issuer: String,
    pub created_at: Option<String>,
    pub id: Option<u64>,
    pub locked_at: Option<String>,
    pub downvote_account_id: Option<String>,

    pub rank: Option<u32>,
    pub timestamp: Option<String>,
    pub votes_value: Option<String>,
    pub voting_amount: Option<u64>,
    pub adjusted_votes_value: Option<String>,
    pub upvote_value: Option<String>,
    pub downvote_value: Option<String>,
}

impl PairStats {
    /// Construit une paire depuis sa market key, sans votes
    pub fn from_market_key(key: MarketKey) -> Self {
        Self {
            market_key: key.account_id.clone(),
            account_id: key.account_id,
            asset1: key.asset1,
            asset1_code: key.asset1_code,
            asset1_issuer: key.asset1_issuer,
            asset2: key.asset2,
            asset2_code: key.asset2_code,
            asset2_issuer: key.asset2_issuer,
            created_at: key.created_at,
            id: key.id,
            locked_at: key.locked_at,
            downvote_account_id: key.downvote_account_id,
            ..Self::default()
        }
    }

    /// Joint une market key et son snapshot de votes
    pub fn join(key: MarketKey, votes: Option<&MarketVotes>) -> Self {
        let mut pair = Self::from_market_key(key);
        if let Some(votes) = votes {
            pair.apply_votes(votes);
        }
        pair
    }

    /// Remplace les agrégats de votes par ceux du snapshot
    ///
    /// CONCEPT RUST : &mut self
    /// - Les champs d'identité de la paire ne changent pas
    /// - Seuls les chiffres de votes sont remplacés
    pub fn apply_votes(&mut self, votes: &MarketVotes) {
        self.rank = votes.rank;
        self.timestamp = votes.timestamp.clone();
        self.votes_value = votes.votes_value.clone();
        self.voting_amount = votes.voting_amount;
        self.adjusted_votes_value = votes.adjusted_votes_value.clone();
        self.upvote_value = votes.upvote_value.clone();
        self.downvote_value = votes.downvote_value.clone();
    }

    /// Premier asset de la paire
    pub fn base_asset(&self) -> Result<Asset, DecodeError> {
        Asset::from_parts(&self.asset1_code, Some(&self.asset1_issuer))
    }

    /// Second asset de la paire
    pub fn counter_asset(&self) -> Result<Asset, DecodeError> {
        Asset::from_parts(&self.asset2_code, Some(&self.asset2_issuer))
    }

    /// Les deux assets sous forme simple {code, issuer}
    pub fn assets(&self) -> [AssetSimple; 2] {
        [
            AssetSimple::new(&self.asset1_code, Some(&self.asset1_issuer)),
            AssetSimple::new(&self.asset2_code, Some(&self.asset2_issuer)),
        ]
    }

    /// Label de la paire pour l'affichage (ex: "AQUA / XLM")
    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            display_code(&self.asset1_code),
            display_code(&self.asset2_code)
        )
    }

    /// Valeur des votes (AQUA)
    pub fn votes(&self) -> Option<f64> {
        parse_decimal(self.votes_value.as_deref())
    }

    /// Valeur des votes ajustée (boost)
    pub fn adjusted_votes(&self) -> Option<f64> {
        parse_decimal(self.adjusted_votes_value.as_deref())
    }

    /// Part des votes totaux, en pourcentage arrondi à 2 décimales
    ///
    /// Une valeur négative (downvotes majoritaires) compte pour 0
    pub fn vote_share(&self, total: &TotalStats) -> Option<f64> {
        percent_of(self.votes()?, total.votes_value_sum()?)
    }

    /// Part des votes ajustés totaux, en pourcentage
    pub fn boosted_share(&self, total: &TotalStats) -> Option<f64> {
        percent_of(self.adjusted_votes()?, total.adjusted_votes_value_sum()?)
    }

    /// Vérifie si les votes ajustés dépassent les votes bruts
    pub fn is_boosted(&self) -> bool {
        match (self.adjusted_votes(), self.votes()) {
            (Some(adjusted), Some(votes)) => adjusted > votes,
            _ => false,
        }
    }

    /// Vérifie si la paire reçoit des rewards (>= 1% des votes)
    pub fn is_rewards_on(&self, total: &TotalStats) -> bool {
        match (self.votes(), total.votes_value_sum()) {
            (Some(votes), Some(sum)) if sum > 0.0 => votes * 100.0 / sum >= MIN_REWARDS_PERCENT,
            _ => false,
        }
    }

    /// Date du snapshot de votes
    pub fn snapshot_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp.as_deref()?)
    }
}

/// Statistiques globales des votes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalStats {
    pub votes_value_sum: String,
    pub adjusted_votes_value_sum: String,
}

impl TotalStats {
    pub fn votes_value_sum(&self) -> Option<f64> {
        parse_decimal(Some(&self.votes_value_sum))
    }

    pub fn adjusted_votes_value_sum(&self) -> Option<f64> {
        parse_decimal(Some(&self.adjusted_votes_value_sum))
    }
}

/// Une page de résultats
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PairsPage {
    pub pairs: Vec<PairStats>,
    /// Nombre total d'éléments correspondants (toutes pages)
    pub count: usize,
}

/// Arrondit à n décimales
pub fn round_to_precision(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn percent_of(value: f64, total: f64) -> Option<f64> {
    if total <= 0.0 {
        return None;
    }
    if value < 0.0 {
        return Some(0.0);
    }
    Some(round_to_precision(value / total * 100.0, 2))
}

fn parse_decimal(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn display_code(code: &str) -> &str {
    if code.is_empty() || code == "native" {
        "XLM"
    } else {
        code
    }
}

/// Parse un timestamp de l'API (RFC 3339, ou sans fuseau = UTC)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_with_votes(votes: &str, adjusted: &str) -> PairStats {
        PairStats {
            market_key: "MK".to_string(),
            votes_value: Some(votes.to_string()),
            adjusted_votes_value: Some(adjusted.to_string()),
            ..PairStats::default()
        }
    }

    fn totals() -> TotalStats {
        TotalStats {
            votes_value_sum: "1000".to_string(),
            adjusted_votes_value_sum: "2000".to_string(),
        }
    }

    #[test]
    fn test_vote_share() {
        let pair = pair_with_votes("123.456", "500");
        assert_eq!(pair.vote_share(&totals()), Some(12.35));
        assert_eq!(pair.boosted_share(&totals()), Some(25.0));
        assert!(pair.is_boosted());
    }

    #[test]
    fn test_negative_votes_share_is_zero() {
        let pair = pair_with_votes("-10", "0");
        assert_eq!(pair.vote_share(&totals()), Some(0.0));
    }

    #[test]
    fn test_rewards_threshold() {
        assert!(pair_with_votes("10", "0").is_rewards_on(&totals()));
        assert!(!pair_with_votes("9.99", "0").is_rewards_on(&totals()));
        assert!(!pair_with_votes("10", "0").is_rewards_on(&TotalStats::default()));
    }

    #[test]
    fn test_join_keeps_identity() {
        let key = MarketKey {
            account_id: "GMARKET".to_string(),
            asset1_code: "AQUA".to_string(),
            asset2_code: "XLM".to_string(),
            ..MarketKey::default()
        };
        let votes = MarketVotes {
            market_key: "GMARKET".to_string(),
            votes_value: Some("42".to_string()),
            voting_amount: Some(7),
            ..MarketVotes::default()
        };

        let pair = PairStats::join(key, Some(&votes));
        assert_eq!(pair.market_key, "GMARKET");
        assert_eq!(pair.votes(), Some(42.0));
        assert_eq!(pair.voting_amount, Some(7));
        assert_eq!(pair.label(), "AQUA / XLM");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2022-01-15T10:00:00Z").is_some());
        assert!(parse_timestamp("2022-01-15T10:00:00.123456").is_some());
        assert!(parse_timestamp("hier").is_none());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{"market_key": "MK", "votes_value": "1.5", "unknown": true}"#;
        let pair: PairStats = serde_json::from_str(json).unwrap();
        assert_eq!(pair.market_key, "MK");
        assert_eq!(pair.votes(), Some(1.5));
        assert!(pair.timestamp.is_none());
    }
}
