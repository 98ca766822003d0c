// ============================================================================
// Module : page
// ============================================================================
// La page de vote, découpée en :
// codec d'URL ⇄ contrôleur ⇄ requêtes ⇄ bulletin local
// ============================================================================

pub mod ballot;     // Paires sélectionnées (stockage local)
pub mod controller; // Réconciliation URL / page / listes
pub mod fetch;      // Requêtes étiquetées et exécution
pub mod query;      // Query string sort / base / counter
pub mod timer;      // Rafraîchissement périodique

pub use ballot::Ballot;
pub use controller::{Effect, PageContext, PageController, PageMode, PageNotice, Session, PAGE_SIZE};
pub use fetch::{execute, FetchOutcome, FetchPayload, FetchRequest, FetchTicket, RequestId};
pub use query::{FilterState, QueryParams};
pub use timer::PollingTimer;
