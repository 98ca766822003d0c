// ============================================================================
// Module : models
// ============================================================================
// Structures de données du domaine : assets, paires, votes
// ============================================================================

pub mod asset; // Asset Stellar + codec des paramètres d'URL
pub mod claim; // Claimable balances (votes verrouillés)
pub mod pair;  // PairStats, MarketKey, MarketVotes, TotalStats
pub mod sort;  // SortMode (popular / topVoted / yourVotes)

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use aquavote::models::pair::PairStats;
// On peut faire : use aquavote::models::PairStats;
pub use asset::{is_valid_account_id, Asset, AssetSimple, DecodeError};
pub use claim::{ClaimBackEntry, ClaimableBalance, ClaimableState, Claimant};
pub use pair::{parse_timestamp, MarketKey, MarketVotes, PairStats, PairsPage, TotalStats};
pub use sort::SortMode;
