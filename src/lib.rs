// ============================================================================
// AquaVote - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;     // Trackers AQUA et Horizon
pub mod app;     // État de l'application TUI
pub mod assets;  // Cache local des assets rencontrés
pub mod chain;   // Polling des claimable balances
pub mod config;  // Configuration (fichier + environnement)
pub mod models;  // Structures de données
pub mod page;    // Contrôleur de la page de vote
pub mod storage; // Stockage clé/valeur persistant
pub mod ui;      // Interface utilisateur
