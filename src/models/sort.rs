// ============================================================================
// Enum : SortMode
// ============================================================================
// Mode de tri de la liste des paires (paramètre d'URL "sort")
//
// CONCEPT : Cycle d'états (comme les onglets de la page)
// - Popular → TopVoted → YourVotes → Popular
// ============================================================================

use serde::{Deserialize, Serialize};

/// Mode de tri de la liste des paires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    /// Paires les plus échangées
    #[serde(rename = "popular")]
    Popular,

    /// Paires avec le plus de votes
    #[serde(rename = "topVoted")]
    TopVoted,

    /// Paires pour lesquelles l'utilisateur a voté
    #[serde(rename = "yourVotes")]
    YourVotes,
}

impl SortMode {
    /// Tous les modes, dans l'ordre des onglets
    pub const ALL: [SortMode; 3] = [SortMode::Popular, SortMode::TopVoted, SortMode::YourVotes];

    /// Valeur du paramètre d'URL
    pub fn as_param(&self) -> &'static str {
        match self {
            SortMode::Popular => "popular",
            SortMode::TopVoted => "topVoted",
            SortMode::YourVotes => "yourVotes",
        }
    }

    /// Parse la valeur du paramètre d'URL
    ///
    /// Retourne None pour toute valeur hors de l'énumération
    pub fn from_param(value: &str) -> Option<Self> {
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.as_param() == value)
    }

    /// Label pour l'affichage (onglets)
    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Popular => "Popular",
            SortMode::TopVoted => "Top Voted",
            SortMode::YourVotes => "Your Votes",
        }
    }

    /// Mode suivant (cycle)
    pub fn next(&self) -> Self {
        match self {
            SortMode::Popular => SortMode::TopVoted,
            SortMode::TopVoted => SortMode::YourVotes,
            SortMode::YourVotes => SortMode::Popular,
        }
    }

    /// Mode précédent (cycle inverse)
    pub fn previous(&self) -> Self {
        match self {
            SortMode::Popular => SortMode::YourVotes,
            SortMode::TopVoted => SortMode::Popular,
            SortMode::YourVotes => SortMode::TopVoted,
        }
    }
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Popular
    }
}
