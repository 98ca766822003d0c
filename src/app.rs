// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Composition : App possède le PageController et traduit ses Effect
//    en écrans, messages et commandes pour le worker
//
// PATTERN : Cette structure suit le pattern "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// ============================================================================

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::models::claim::pair_votes;
use crate::models::{Asset, ClaimBackEntry, ClaimableState, PairStats, SortMode};
use crate::page::{Effect, FetchOutcome, FetchTicket, PageController, Session};

// ============================================================================
// Enum : Screen
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul écran actif à la fois
// - Le compilateur force à gérer tous les cas (exhaustivité)
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : onglets de tri + table des paires
    Dashboard,

    /// Mode saisie (asset ou compte)
    /// CONCEPT : Modal input mode (Vim-like)
    /// - Enter valide, ESC annule
    InputMode,

    /// Bulletin de vote (formulaire de vote)
    Ballot,

    /// Votes verrouillés de la paire sélectionnée
    ClaimBack,
}

/// Ce que la saisie en cours va modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    Base,
    Counter,
    Account,
}

impl InputTarget {
    fn prompt(&self) -> &'static str {
        match self {
            InputTarget::Base => "Base asset (native or CODE:ISSUER): ",
            InputTarget::Counter => "Counter asset (native or CODE:ISSUER): ",
            InputTarget::Account => "Stellar account (G...): ",
        }
    }
}

/// Commandes pour le worker thread
///
/// CONCEPT : Command pattern avec channels
/// - L'App décide, le worker exécute (requêtes HTTP, polling Horizon)
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Exécuter une requête de liste et renvoyer le FetchOutcome
    Fetch(FetchTicket),

    /// Démarrer le polling des claimable balances du compte
    WatchClaimables { account_id: String },

    /// Arrêter le polling en cours
    StopClaimables,
}

/// Votes verrouillés d'une paire (écran ClaimBack)
#[derive(Debug, Clone)]
pub struct ClaimBackView {
    pub pair: PairStats,
    pub entries: Vec<ClaimBackEntry>,
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    running: bool,

    /// Contrôleur de la page de vote (filtres, listes, bulletin)
    pub page: PageController,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Index de la paire sélectionnée dans la table
    pub selected_index: usize,

    /// Index de la paire sélectionnée dans le bulletin
    pub ballot_index: usize,

    /// Two-step quit : première pression de 'q' = confirmation demandée
    pub confirm_quit: bool,

    /// Buffer de saisie pour le mode Input
    pub input_buffer: String,

    /// Prompt affiché en mode Input
    pub input_prompt: String,

    input_target: Option<InputTarget>,

    /// Message de statut (erreurs de chargement, infos)
    pub status_message: Option<String>,

    /// URL courante de la page ("sort=popular", "base=native", ...)
    pub location: String,

    /// Historique des URLs (touche retour)
    history: Vec<String>,

    /// Dernier état des claimable balances du compte connecté
    pub claimables: Option<ClaimableState>,

    pub claim_back: Option<ClaimBackView>,

    /// Asset des votes, format Horizon "CODE:ISSUER"
    vote_asset: String,
}

impl App {
    /// Crée l'application autour du contrôleur de page
    pub fn new(page: PageController, vote_asset: &str) -> Self {
        Self {
            running: true,
            page,
            current_screen: Screen::Dashboard,
            selected_index: 0,
            ballot_index: 0,
            confirm_quit: false,
            input_buffer: String::new(),
            input_prompt: String::new(),
            input_target: None,
            status_message: None,
            location: String::new(),
            history: Vec::new(),
            claimables: None,
            claim_back: None,
            vote_asset: vote_asset.to_string(),
        }
    }

    /// Premier affichage de la page
    ///
    /// Démarre aussi le polling des claimable balances si un compte est connecté
    pub fn mount(&mut self, query: &str) -> Vec<AppCommand> {
        self.location = query.trim_start_matches('?').to_string();
        let effects = self.page.mount(query, Instant::now());
        let mut commands = self.handle_effects(effects);

        if let Some(account_id) = self.page.session().account_id() {
            commands.push(AppCommand::WatchClaimables {
                account_id: account_id.to_string(),
            });
        }
        commands
    }

    /// Applique les effets du contrôleur
    ///
    /// CONCEPT RUST : Pattern matching exhaustif
    /// - Chaque Effect a sa traduction côté terminal
    /// - Les requêtes deviennent des commandes pour le worker
    pub fn handle_effects(&mut self, effects: Vec<Effect>) -> Vec<AppCommand> {
        let mut commands = Vec::new();

        for effect in effects {
            match effect {
                Effect::ReplaceQuery(query) => {
                    debug!(%query, "Location replaced");
                    self.location = query;
                }
                Effect::PushQuery(query) => {
                    debug!(%query, "Location pushed");
                    let previous = std::mem::replace(&mut self.location, query);
                    self.history.push(previous);
                }
                Effect::Fetch(ticket) => commands.push(AppCommand::Fetch(ticket)),
                Effect::OpenLoginPrompt => self.start_input(InputTarget::Account),
                Effect::OpenVoteForm(pairs) => {
                    info!(pairs = pairs.len(), "Vote form opened");
                    self.ballot_index = 0;
                    self.current_screen = Screen::Ballot;
                }
                Effect::OpenCreatePair { base, counter } => {
                    let counter = counter.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string());
                    self.status_message = Some(format!(
                        "Creating {} / {} requires signing a transaction in a wallet",
                        base, counter
                    ));
                }
            }
        }

        // La table a pu changer de taille
        let max_index = self.page.pairs().map_or(0, |p| p.len().saturating_sub(1));
        self.selected_index = self.selected_index.min(max_index);

        commands
    }

    /// Quitte l'application
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Vérifie si l'application doit continuer
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Tick : appelé à chaque itération de la boucle
    ///
    /// Interroge le timer de rafraîchissement du contrôleur
    pub fn tick(&mut self) -> Vec<AppCommand> {
        let effects = self.page.poll(Instant::now());
        self.handle_effects(effects)
    }

    // ========================================================================
    // Résultats du worker
    // ========================================================================

    /// Résultat d'une requête
    pub fn on_fetch_outcome(&mut self, outcome: FetchOutcome) {
        self.page.on_fetch_outcome(outcome);
        if let Some(error) = self.page.take_error() {
            self.status_message = Some(format!("Loading failed: {}", error));
        }

        let max_index = self.page.pairs().map_or(0, |p| p.len().saturating_sub(1));
        self.selected_index = self.selected_index.min(max_index);
    }

    /// Nouvel état des claimable balances
    pub fn on_claimables(&mut self, state: ClaimableState) -> Vec<AppCommand> {
        let effects = self.page.on_claimable_update(&state, Instant::now());
        self.claimables = Some(state);
        self.handle_effects(effects)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigue vers le haut dans la table
    ///
    /// CONCEPT RUST : Saturating arithmetic
    /// - saturating_sub() ne descend pas en dessous de 0
    pub fn navigate_up(&mut self) {
        match self.current_screen {
            Screen::Ballot => self.ballot_index = self.ballot_index.saturating_sub(1),
            _ => self.selected_index = self.selected_index.saturating_sub(1),
        }
    }

    /// Navigue vers le bas dans la table
    pub fn navigate_down(&mut self) {
        match self.current_screen {
            Screen::Ballot => {
                let max_index = self.page.ballot().len().saturating_sub(1);
                self.ballot_index = (self.ballot_index + 1).min(max_index);
            }
            _ => {
                let max_index = self.page.pairs().map_or(0, |p| p.len().saturating_sub(1));
                self.selected_index = (self.selected_index + 1).min(max_index);
            }
        }
    }

    /// Paire sélectionnée dans la table
    pub fn selected_pair(&self) -> Option<&PairStats> {
        self.page.pairs()?.get(self.selected_index)
    }

    /// Onglet de tri suivant
    pub fn next_sort(&mut self) -> Vec<AppCommand> {
        let sort = self.page.sort().map_or(SortMode::Popular, |s| s.next());
        self.change_sort(sort)
    }

    /// Onglet de tri précédent
    pub fn previous_sort(&mut self) -> Vec<AppCommand> {
        let sort = self.page.sort().map_or(SortMode::Popular, |s| s.previous());
        self.change_sort(sort)
    }

    pub fn change_sort(&mut self, sort: SortMode) -> Vec<AppCommand> {
        self.selected_index = 0;
        let effects = self.page.change_sort(sort, Instant::now());
        self.handle_effects(effects)
    }

    pub fn next_page(&mut self) -> Vec<AppCommand> {
        let page = self.page.page() + 1;
        self.change_page(page)
    }

    pub fn previous_page(&mut self) -> Vec<AppCommand> {
        let page = self.page.page().saturating_sub(1);
        self.change_page(page)
    }

    fn change_page(&mut self, page: usize) -> Vec<AppCommand> {
        let effects = self.page.change_page(page, Instant::now());
        if !effects.is_empty() {
            self.selected_index = 0;
        }
        self.handle_effects(effects)
    }

    /// Retour à l'URL précédente (comme le bouton retour d'un navigateur)
    pub fn go_back(&mut self) -> Vec<AppCommand> {
        let Some(previous) = self.history.pop() else {
            return Vec::new();
        };

        info!(query = %previous, "Navigating back");
        self.location = previous.clone();
        self.selected_index = 0;
        let effects = self.page.navigate(&previous, Instant::now());
        self.handle_effects(effects)
    }

    /// Efface la recherche par asset et revient au tri par défaut
    pub fn clear_search(&mut self) -> Vec<AppCommand> {
        self.change_sort(SortMode::Popular)
    }

    // ========================================================================
    // Bulletin et votes
    // ========================================================================

    /// Ajoute ou retire la paire sélectionnée du bulletin
    pub fn toggle_selected(&mut self) {
        let Some(pair) = self.selected_pair().cloned() else {
            return;
        };

        match self.page.on_vote_click(&pair) {
            Ok(selected) => {
                debug!(pair = %pair.label(), selected, "Ballot updated");
            }
            Err(e) => {
                warn!(error = ?e, "Failed to persist ballot");
                self.status_message = Some(format!("Ballot not saved: {:#}", e));
            }
        }
    }

    /// Retire la paire sélectionnée du bulletin (écran Ballot)
    pub fn remove_from_ballot(&mut self) {
        let Some(pair) = self.page.ballot().pairs().get(self.ballot_index).cloned() else {
            return;
        };

        if let Err(e) = self.page.on_vote_click(&pair) {
            warn!(error = ?e, "Failed to persist ballot");
            self.status_message = Some(format!("Ballot not saved: {:#}", e));
        }

        let max_index = self.page.ballot().len().saturating_sub(1);
        self.ballot_index = self.ballot_index.min(max_index);
    }

    /// Ouvre le formulaire de vote (ou la connexion)
    pub fn start_vote(&mut self) -> Vec<AppCommand> {
        if self.page.ballot().is_empty() {
            self.status_message = Some("Select pairs with <space> first".to_string());
            return Vec::new();
        }
        let effects = self.page.start_vote();
        self.handle_effects(effects)
    }

    /// Ferme le formulaire de vote
    pub fn close_ballot(&mut self) {
        self.page.on_submission_finished();
        self.current_screen = Screen::Dashboard;
    }

    pub fn create_pair(&mut self) -> Vec<AppCommand> {
        let effects = self.page.create_pair();
        self.handle_effects(effects)
    }

    /// Ouvre la liste des votes verrouillés de la paire sélectionnée
    pub fn show_claim_back(&mut self) -> Vec<AppCommand> {
        let Some(account_id) = self.page.session().account_id().map(str::to_string) else {
            return self.handle_effects(vec![Effect::OpenLoginPrompt]);
        };
        let Some(pair) = self.selected_pair().cloned() else {
            return Vec::new();
        };

        let entries = match &self.claimables {
            Some(state) if state.loaded => pair_votes(&state.balances, &pair, &account_id, &self.vote_asset),
            _ => {
                self.status_message = Some("Claimable balances are still loading".to_string());
                return Vec::new();
            }
        };

        info!(pair = %pair.label(), entries = entries.len(), "Claim back view opened");
        self.claim_back = Some(ClaimBackView { pair, entries });
        self.current_screen = Screen::ClaimBack;
        Vec::new()
    }

    /// Nombre de votes récupérables maintenant (écran ClaimBack)
    pub fn claimable_now(&self) -> usize {
        let now = Utc::now();
        self.claim_back
            .as_ref()
            .map_or(0, |view| view.entries.iter().filter(|e| e.is_claimable(now)).count())
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Connecte le compte et démarre le polling de ses claimable balances
    pub fn login(&mut self, account_id: &str) -> Vec<AppCommand> {
        info!(account = %account_id, "User logged in");
        self.claimables = None;
        let effects = self.page.set_session(Session::logged(account_id), Instant::now());
        let mut commands = vec![
            AppCommand::StopClaimables,
            AppCommand::WatchClaimables {
                account_id: account_id.to_string(),
            },
        ];
        commands.extend(self.handle_effects(effects));
        commands
    }

    pub fn logout(&mut self) -> Vec<AppCommand> {
        info!("User logged out");
        self.claimables = None;
        self.claim_back = None;
        let effects = self.page.set_session(Session::anonymous(), Instant::now());
        let mut commands = vec![AppCommand::StopClaimables];
        commands.extend(self.handle_effects(effects));
        commands
    }

    pub fn is_logged(&self) -> bool {
        self.page.session().is_logged()
    }

    // ========================================================================
    // Écrans
    // ========================================================================

    pub fn show_dashboard(&mut self) {
        self.current_screen = Screen::Dashboard;
    }

    pub fn is_on_dashboard(&self) -> bool {
        self.current_screen == Screen::Dashboard
    }

    pub fn is_on_ballot(&self) -> bool {
        self.current_screen == Screen::Ballot
    }

    pub fn is_on_claim_back(&self) -> bool {
        self.current_screen == Screen::ClaimBack
    }

    /// Demande la confirmation de quitter
    ///
    /// CONCEPT : Two-step quit pattern
    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    // ========================================================================
    // Input Mode Management
    // ========================================================================

    /// Entre en mode input pour la cible donnée
    pub fn start_input(&mut self, target: InputTarget) {
        self.current_screen = Screen::InputMode;
        self.input_buffer.clear();
        self.input_prompt = target.prompt().to_string();
        self.input_target = Some(target);
    }

    /// Annule le mode input et retourne au dashboard
    pub fn cancel_input(&mut self) {
        self.current_screen = Screen::Dashboard;
        self.input_buffer.clear();
        self.input_prompt.clear();
        self.input_target = None;
    }

    /// Valide la saisie
    ///
    /// CONCEPT : Parse at the boundary
    /// - Le texte devient un Asset ou un compte validé
    /// - Une saisie invalide affiche un message, rien n'est modifié
    pub fn submit_input(&mut self) -> Vec<AppCommand> {
        let value = self.input_buffer.trim().to_string();
        let target = self.input_target.take();
        self.cancel_input();

        match target {
            Some(InputTarget::Base) => match parse_asset_input(&value) {
                Ok(asset) => {
                    self.selected_index = 0;
                    let effects = self.page.change_base(asset, Instant::now());
                    self.handle_effects(effects)
                }
                Err(message) => {
                    self.status_message = Some(message);
                    Vec::new()
                }
            },
            Some(InputTarget::Counter) => match parse_asset_input(&value) {
                Ok(asset) => {
                    self.selected_index = 0;
                    let effects = self.page.change_counter(asset, Instant::now());
                    self.handle_effects(effects)
                }
                Err(message) => {
                    self.status_message = Some(message);
                    Vec::new()
                }
            },
            Some(InputTarget::Account) if value.is_empty() => Vec::new(),
            Some(InputTarget::Account) => {
                if crate::models::is_valid_account_id(&value) {
                    self.login(&value)
                } else {
                    self.status_message = Some(format!("Invalid Stellar account: {}", value));
                    Vec::new()
                }
            }
            None => Vec::new(),
        }
    }

    /// Ajoute un caractère au buffer d'input
    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    /// Supprime le dernier caractère du buffer
    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.current_screen == Screen::InputMode
    }
}

/// Saisie d'un asset : vide = retirer le filtre
fn parse_asset_input(value: &str) -> Result<Option<Asset>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<Asset>()
        .map(Some)
        .map_err(|e| format!("Invalid asset: {}", e))
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::assets::AssetStore;
    use crate::models::PairsPage;
    use crate::page::{FetchPayload, FetchRequest, PageContext};
    use crate::storage::{MemoryStorage, Storage};

    const ACCOUNT: &str = "GBNZILSTVQZ4R7IKQDGHYGY2QXL5QOFJYQMXPKWRRM5PAV7Y4M67AQUA";

    fn app(session: Session) -> App {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let assets = Arc::new(AssetStore::load(storage.clone()));
        let page = PageController::new(PageContext::new(session, assets, storage), Instant::now());
        App::new(page, "AQUA:GISSUER")
    }

    fn fetches(commands: &[AppCommand]) -> Vec<FetchTicket> {
        commands
            .iter()
            .filter_map(|command| match command {
                AppCommand::Fetch(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .collect()
    }

    fn load_page(app: &mut App, commands: &[AppCommand], keys: &[&str]) {
        let ticket = fetches(commands)
            .into_iter()
            .find(|t| t.request != FetchRequest::TotalStats)
            .unwrap();
        app.on_fetch_outcome(FetchOutcome {
            id: ticket.id,
            result: Ok(FetchPayload::Page(PairsPage {
                pairs: keys
                    .iter()
                    .map(|key| PairStats {
                        market_key: key.to_string(),
                        ..PairStats::default()
                    })
                    .collect(),
                count: keys.len(),
            })),
        });
    }

    #[test]
    fn test_mount_sets_location() {
        let mut app = app(Session::anonymous());
        let commands = app.mount("");

        assert_eq!(app.location, "sort=popular");
        assert_eq!(fetches(&commands).len(), 2);
        assert!(app.is_running());
    }

    #[test]
    fn test_mount_logged_starts_claimables() {
        let mut app = app(Session::logged(ACCOUNT));
        let commands = app.mount("sort=popular");

        assert!(commands.contains(&AppCommand::WatchClaimables {
            account_id: ACCOUNT.to_string(),
        }));
    }

    #[test]
    fn test_sort_tabs_and_back() {
        let mut app = app(Session::anonymous());
        app.mount("sort=popular");

        app.next_sort();
        assert_eq!(app.location, "sort=topVoted");

        app.go_back();
        assert_eq!(app.location, "sort=popular");
        assert_eq!(app.page.sort(), Some(SortMode::Popular));
    }

    #[test]
    fn test_your_votes_logged_out_opens_account_input() {
        let mut app = app(Session::anonymous());
        app.mount("sort=topVoted");

        let commands = app.change_sort(SortMode::YourVotes);
        assert!(!fetches(&commands)
            .iter()
            .any(|t| matches!(t.request, FetchRequest::UserPairs { .. })));
        assert_eq!(app.location, "sort=popular");
        assert!(app.is_in_input_mode());

        for c in ACCOUNT.chars() {
            app.append_char(c);
        }
        let commands = app.submit_input();
        assert!(app.is_logged());
        assert!(commands.contains(&AppCommand::WatchClaimables {
            account_id: ACCOUNT.to_string(),
        }));
    }

    #[test]
    fn test_base_input() {
        let mut app = app(Session::anonymous());
        app.mount("sort=popular");

        app.start_input(InputTarget::Base);
        app.append_char('n');
        app.backspace();
        for c in "native".chars() {
            app.append_char(c);
        }
        let commands = app.submit_input();

        assert_eq!(app.location, "base=native");
        assert_eq!(fetches(&commands).len(), 1);

        app.start_input(InputTarget::Counter);
        for c in "bad:asset".chars() {
            app.append_char(c);
        }
        assert!(app.submit_input().is_empty());
        assert!(app.status_message.as_deref().unwrap().starts_with("Invalid asset"));
    }

    #[test]
    fn test_toggle_and_ballot_screen() {
        let mut app = app(Session::logged(ACCOUNT));
        let commands = app.mount("sort=popular");
        load_page(&mut app, &commands, &["GA", "GB"]);

        app.navigate_down();
        app.toggle_selected();
        assert!(app.page.ballot().contains("GB"));

        app.start_vote();
        assert!(app.is_on_ballot());

        app.remove_from_ballot();
        assert!(app.page.ballot().is_empty());

        app.close_ballot();
        assert!(app.is_on_dashboard());
    }

    #[test]
    fn test_claim_back_requires_claimables() {
        let mut app = app(Session::logged(ACCOUNT));
        let commands = app.mount("sort=popular");
        load_page(&mut app, &commands, &["GA"]);

        app.show_claim_back();
        assert!(app.is_on_dashboard());
        assert!(app.status_message.is_some());

        app.on_claimables(ClaimableState {
            account_id: ACCOUNT.to_string(),
            loaded: true,
            balances: Vec::new(),
        });
        app.show_claim_back();
        assert!(app.is_on_claim_back());
        assert_eq!(app.claimable_now(), 0);
    }

    #[test]
    fn test_logout_stops_claimables() {
        let mut app = app(Session::logged(ACCOUNT));
        app.mount("sort=yourVotes");

        let commands = app.logout();
        assert_eq!(commands[0], AppCommand::StopClaimables);
        assert_eq!(app.location, "sort=popular");
    }

    #[test]
    fn test_quit_two_steps() {
        let mut app = app(Session::anonymous());
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());
        app.quit();
        assert!(!app.is_running());
    }
}
