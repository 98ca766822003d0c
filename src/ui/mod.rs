// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod events;    // Gestion des événements clavier
pub mod dashboard; // Page de vote : onglets, table des paires
pub mod ballot;    // Bulletin de vote
pub mod claims;    // Votes verrouillés d'une paire

// Re-exports pour simplifier les imports
pub use events::{Event, EventHandler};
pub use dashboard::render;
