// ============================================================================
// Contrôleur de la page de vote
// ============================================================================
// Réconcilie l'URL (sort / base / counter), la page courante, le timer de
// rafraîchissement et les listes chargées
//
// CONCEPTS :
// 1. State machine mono-propriétaire : toutes les méthodes prennent &mut self
// 2. Effets décrits, pas exécutés : chaque méthode retourne des Effect que
//    le front-end applique (URL, requêtes, modales)
// 3. Request id : un résultat périmé est ignoré au lieu d'écraser la liste
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::assets::AssetStore;
use crate::models::{Asset, AssetSimple, ClaimableState, PairStats, SortMode, TotalStats};
use crate::page::ballot::Ballot;
use crate::page::fetch::{FetchOutcome, FetchPayload, FetchRequest, FetchSlot, FetchTicket, RequestId};
use crate::page::query::{self, FilterState, QueryParams};
use crate::page::timer::{PollingTimer, TimerKey, DEFAULT_UPDATE_INTERVAL};
use crate::storage::Storage;

/// Nombre de paires par page
pub const PAGE_SIZE: usize = 20;

// ============================================================================
// Types publics
// ============================================================================

/// Mode de la page, dérivé des filtres
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageMode {
    /// Ni tri ni asset : rien à charger
    Idle,

    /// Liste paginée triée (popular / topVoted)
    SortedList(SortMode),

    /// Paires votées par l'utilisateur (attend les claimable balances)
    YourVotes,

    /// Recherche par asset(s)
    Filtered { base: Asset, counter: Option<Asset> },
}

/// Action que le front-end doit exécuter
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Remplace l'URL courante (normalisation)
    ReplaceQuery(String),

    /// Nouvelle entrée d'historique (action utilisateur)
    PushQuery(String),

    /// Requête à exécuter puis renvoyer via on_fetch_outcome
    Fetch(FetchTicket),

    OpenLoginPrompt,

    /// Formulaire de vote avec le bulletin courant
    OpenVoteForm(Vec<PairStats>),

    OpenCreatePair { base: Asset, counter: Option<Asset> },
}

/// Session utilisateur
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub account_id: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn logged(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
        }
    }

    pub fn is_logged(&self) -> bool {
        self.account_id.is_some()
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }
}

/// Collaborateurs du contrôleur
///
/// CONCEPT RUST : Injection de dépendances
/// - Pas de singleton global : tout est passé à la construction
pub struct PageContext {
    pub session: Session,
    pub assets: Arc<AssetStore>,
    pub storage: Arc<dyn Storage>,
    pub page_size: usize,
    pub update_interval: Duration,
}

impl PageContext {
    pub fn new(session: Session, assets: Arc<AssetStore>, storage: Arc<dyn Storage>) -> Self {
        Self {
            session,
            assets,
            storage,
            page_size: PAGE_SIZE,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

/// Message affiché au-dessus de la table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageNotice {
    SearchResults,
    NoPairsFound,

    /// La paire recherchée n'existe pas encore
    CreatePair { base: Asset, counter: Asset },
}

impl PageNotice {
    pub fn message(&self) -> &'static str {
        match self {
            PageNotice::SearchResults => "Search results",
            PageNotice::NoPairsFound => "No pairs found",
            PageNotice::CreatePair { .. } => "Be the first to vote for rewards on this pair!",
        }
    }
}

// ============================================================================
// PageController
// ============================================================================

pub struct PageController {
    session: Session,
    assets: Arc<AssetStore>,
    ballot: Ballot,
    page_size: usize,

    query: QueryParams,
    filter: FilterState,
    page: usize,

    pairs: Option<Vec<PairStats>>,
    count: usize,
    pairs_loading: bool,
    change_page_loading: bool,
    total_stats: Option<TotalStats>,
    last_error: Option<String>,

    claimables_loaded: bool,
    market_keys: Vec<String>,

    timer: PollingTimer,
    next_request: u64,
    latest_list: Option<RequestId>,
    latest_stats: Option<RequestId>,
}

impl PageController {
    pub fn new(ctx: PageContext, now: Instant) -> Self {
        let ballot = Ballot::load(ctx.storage.clone());

        Self {
            session: ctx.session,
            assets: ctx.assets,
            ballot,
            page_size: ctx.page_size.max(1),
            query: QueryParams::new(),
            filter: FilterState::default(),
            page: 1,
            pairs: None,
            count: 0,
            pairs_loading: false,
            change_page_loading: false,
            total_stats: None,
            last_error: None,
            claimables_loaded: false,
            market_keys: Vec::new(),
            timer: PollingTimer::new(ctx.update_interval, now),
            next_request: 0,
            latest_list: None,
            latest_stats: None,
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Premier affichage : totaux des votes + URL initiale
    pub fn mount(&mut self, query: &str, now: Instant) -> Vec<Effect> {
        info!(query, "Voting page mounted");
        let mut effects = vec![Effect::Fetch(self.issue(FetchRequest::TotalStats))];
        effects.extend(self.navigate(query, now));
        effects
    }

    /// L'URL a changé (historique, lien externe)
    pub fn navigate(&mut self, query: &str, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.apply_query(QueryParams::parse(query), &mut effects, now);
        effects
    }

    /// Choisit un tri : efface les filtres d'assets, retour en page 1
    pub fn change_sort(&mut self, sort: SortMode, now: Instant) -> Vec<Effect> {
        info!(sort = sort.as_param(), "Sort changed");
        let params = query::with_sort(&self.query, sort);
        self.user_query(params, now)
    }

    /// Choisit (ou retire) l'asset de base
    pub fn change_base(&mut self, asset: Option<Asset>, now: Instant) -> Vec<Effect> {
        info!(base = ?asset.as_ref().map(Asset::to_url_param), "Base asset changed");
        let params = query::with_base(&self.query, asset.as_ref());
        self.user_query(params, now)
    }

    /// Choisit (ou retire) l'asset counter
    pub fn change_counter(&mut self, asset: Option<Asset>, now: Instant) -> Vec<Effect> {
        info!(counter = ?asset.as_ref().map(Asset::to_url_param), "Counter asset changed");
        let params = query::with_counter(&self.query, asset.as_ref());
        self.user_query(params, now)
    }

    /// Change de page dans le mode courant
    ///
    /// Sans effet pour "your votes" (liste non paginée) et hors bornes
    pub fn change_page(&mut self, page: usize, now: Instant) -> Vec<Effect> {
        let mode = self.mode();
        if matches!(mode, PageMode::YourVotes | PageMode::Idle)
            || page == 0
            || page > self.page_count()
            || page == self.page
        {
            debug!(page, ?mode, "Page change ignored");
            return Vec::new();
        }

        info!(from = self.page, to = page, "Page changed");
        self.page = page;
        self.change_page_loading = true;

        let mut effects = Vec::new();
        self.reconcile(&mut effects, now);
        effects
    }

    fn user_query(&mut self, params: QueryParams, now: Instant) -> Vec<Effect> {
        self.page = 1;
        let mut effects = vec![Effect::PushQuery(params.to_query_string())];
        self.apply_query(params, &mut effects, now);
        effects
    }

    fn apply_query(&mut self, params: QueryParams, effects: &mut Vec<Effect>, now: Instant) {
        let (mut stable, mut filter) = query::normalize_to_fixpoint(&params);

        // "your votes" sans compte : connexion demandée, retour à "popular"
        if filter.sort == Some(SortMode::YourVotes) && !self.session.is_logged() {
            info!("Your votes requested while logged out, asking for login");
            effects.push(Effect::OpenLoginPrompt);
            stable = query::with_sort(&stable, SortMode::Popular);
            filter = FilterState {
                sort: Some(SortMode::Popular),
                ..FilterState::default()
            };
        }

        if stable != params {
            debug!(from = %params.to_query_string(), to = %stable.to_query_string(), "Query normalized");
            effects.push(Effect::ReplaceQuery(stable.to_query_string()));
        }

        // Tout changement de sort, base ou counter repart de la page 1
        if filter != self.filter {
            self.page = 1;
        }
        self.query = stable;
        self.filter = filter;

        self.reconcile(effects, now);
    }

    /// Recharge la liste si (sort, base, counter, page) a changé
    ///
    /// Le timer utilise la même clé : il est réarmé au même moment
    fn reconcile(&mut self, effects: &mut Vec<Effect>, now: Instant) {
        if self.timer.sync(self.view_key(), now) {
            if let Some(ticket) = self.fetch_list() {
                effects.push(Effect::Fetch(ticket));
            }
        }
        self.update_timer_pause(now);
    }

    fn fetch_list(&mut self) -> Option<FetchTicket> {
        let request = match self.mode() {
            PageMode::Idle => None,
            PageMode::SortedList(sort) => Some(FetchRequest::Pairs {
                sort,
                page_size: self.page_size,
                page: self.page,
            }),
            PageMode::Filtered { base, counter } => Some(FetchRequest::FilteredPairs {
                base,
                counter,
                page_size: self.page_size,
                page: self.page,
            }),
            PageMode::YourVotes => {
                // Le loader reste affiché jusqu'aux claimable balances
                self.pairs_loading = true;
                self.claimables_ready().then(|| FetchRequest::UserPairs {
                    keys: self.market_keys.clone(),
                })
            }
        };

        match request {
            Some(request) => {
                self.pairs_loading = true;
                Some(self.issue(request))
            }
            None => {
                // Les réponses en vol ne correspondent plus à la vue
                self.latest_list = None;
                None
            }
        }
    }

    fn issue(&mut self, request: FetchRequest) -> FetchTicket {
        self.next_request += 1;
        let id = RequestId(self.next_request);

        match request.slot() {
            FetchSlot::List => self.latest_list = Some(id),
            FetchSlot::Stats => self.latest_stats = Some(id),
        }

        debug!(%id, slot = ?request.slot(), page = self.page, "Fetch issued");
        FetchTicket { id, request }
    }

    fn view_key(&self) -> TimerKey {
        TimerKey {
            sort: self.filter.sort,
            base: self.filter.base.clone(),
            counter: self.filter.counter.clone(),
            page: self.page,
        }
    }

    fn claimables_ready(&self) -> bool {
        self.session.is_logged() && self.claimables_loaded
    }

    fn update_timer_pause(&mut self, now: Instant) {
        let waiting = self.mode() == PageMode::YourVotes && !self.claimables_ready();
        self.timer.set_paused(waiting, now);
    }

    // ========================================================================
    // Événements externes
    // ========================================================================

    /// Connexion / déconnexion
    ///
    /// Se déconnecter sur "your votes" force le retour à "popular"
    pub fn set_session(&mut self, session: Session, now: Instant) -> Vec<Effect> {
        if session == self.session {
            return Vec::new();
        }

        info!(logged = session.is_logged(), "Session changed");
        if session.account_id() != self.session.account_id() {
            self.claimables_loaded = false;
            self.market_keys.clear();
        }
        self.session = session;

        if self.filter.sort == Some(SortMode::YourVotes) && !self.session.is_logged() {
            return self.change_sort(SortMode::Popular, now);
        }

        self.update_timer_pause(now);
        Vec::new()
    }

    /// Nouvel état des claimable balances du compte connecté
    pub fn on_claimable_update(&mut self, state: &ClaimableState, now: Instant) -> Vec<Effect> {
        if self.session.account_id() != Some(state.account_id.as_str()) {
            debug!(account = %state.account_id, "Claimable update for another account ignored");
            return Vec::new();
        }

        let became_loaded = state.loaded && !self.claimables_loaded;
        self.claimables_loaded = state.loaded;
        self.market_keys = state.market_keys();
        self.update_timer_pause(now);

        let mut effects = Vec::new();
        if became_loaded && self.mode() == PageMode::YourVotes {
            info!(keys = self.market_keys.len(), "Claimable balances loaded, fetching user pairs");
            if let Some(ticket) = self.fetch_list() {
                effects.push(Effect::Fetch(ticket));
            }
        }
        effects
    }

    /// Interroge le timer de rafraîchissement
    ///
    /// topVoted : liste complète rechargée. Sinon : votes des paires
    /// affichées rafraîchis
    pub fn poll(&mut self, now: Instant) -> Vec<Effect> {
        let Some(update_index) = self.timer.poll(now) else {
            return Vec::new();
        };

        if self.pairs_loading || self.change_page_loading {
            debug!(update_index, "Refresh skipped, list fetch in flight");
            return Vec::new();
        }

        let request = match self.filter.sort {
            Some(SortMode::TopVoted) => FetchRequest::Pairs {
                sort: SortMode::TopVoted,
                page_size: self.page_size,
                page: self.page,
            },
            _ => match &self.pairs {
                Some(pairs) if !pairs.is_empty() => FetchRequest::Revalue { pairs: pairs.clone() },
                _ => return Vec::new(),
            },
        };

        debug!(update_index, "Periodic refresh");
        vec![Effect::Fetch(self.issue(request))]
    }

    /// Applique le résultat d'une requête
    ///
    /// Retourne false si le résultat est périmé (ignoré)
    pub fn on_fetch_outcome(&mut self, outcome: FetchOutcome) -> bool {
        let slot = if Some(outcome.id) == self.latest_list {
            self.latest_list = None;
            FetchSlot::List
        } else if Some(outcome.id) == self.latest_stats {
            self.latest_stats = None;
            FetchSlot::Stats
        } else {
            debug!(id = %outcome.id, "Stale fetch outcome discarded");
            return false;
        };

        match outcome.result {
            Ok(payload) => self.apply_payload(payload),
            Err(e) => {
                warn!(id = %outcome.id, ?slot, error = ?e, "Fetch failed");
                self.last_error = Some(format!("{:#}", e));

                if slot == FetchSlot::List {
                    self.finish_loading();
                    if self.pairs.is_none() {
                        self.pairs = Some(Vec::new());
                    }
                }
            }
        }
        true
    }

    fn apply_payload(&mut self, payload: FetchPayload) {
        match payload {
            FetchPayload::Page(page) => {
                debug!(pairs = page.pairs.len(), count = page.count, "Pairs page loaded");
                self.count = page.count;
                self.set_pairs(page.pairs);
                self.finish_loading();
            }
            FetchPayload::UserPairs(pairs) => {
                debug!(pairs = pairs.len(), "User pairs loaded");
                self.count = pairs.len();
                self.set_pairs(pairs);
                self.finish_loading();
            }
            FetchPayload::Revalued(pairs) => {
                debug!(pairs = pairs.len(), "Votes refreshed");
                self.pairs = Some(pairs);
            }
            FetchPayload::TotalStats(stats) => {
                debug!(votes = %stats.votes_value_sum, "Total voting stats loaded");
                self.total_stats = Some(stats);
            }
        }
    }

    fn set_pairs(&mut self, pairs: Vec<PairStats>) {
        let assets: Vec<AssetSimple> = pairs.iter().flat_map(|pair| pair.assets()).collect();
        self.assets.process_new_assets(&assets);
        self.pairs = Some(pairs);
    }

    fn finish_loading(&mut self) {
        self.pairs_loading = false;
        self.change_page_loading = false;
    }

    // ========================================================================
    // Bulletin de vote
    // ========================================================================

    /// Ajoute ou retire la paire du bulletin
    pub fn on_vote_click(&mut self, pair: &PairStats) -> Result<bool> {
        self.ballot.toggle(pair)
    }

    /// Ouvre le formulaire de vote (ou la connexion)
    pub fn start_vote(&self) -> Vec<Effect> {
        if self.session.is_logged() {
            vec![Effect::OpenVoteForm(self.ballot.pairs().to_vec())]
        } else {
            vec![Effect::OpenLoginPrompt]
        }
    }

    /// Ouvre la création de la paire recherchée (ou la connexion)
    pub fn create_pair(&self) -> Vec<Effect> {
        if !self.session.is_logged() {
            return vec![Effect::OpenLoginPrompt];
        }

        match &self.filter.base {
            Some(base) => vec![Effect::OpenCreatePair {
                base: base.clone(),
                counter: self.filter.counter.clone(),
            }],
            None => Vec::new(),
        }
    }

    /// Vide le bulletin après une soumission réussie
    pub fn clear_ballot(&mut self) -> Result<()> {
        info!(pairs = self.ballot.len(), "Clearing ballot");
        self.ballot.clear()
    }

    /// Fin du formulaire de vote : relit le bulletin
    pub fn on_submission_finished(&mut self) {
        self.ballot.reload();
    }

    // ========================================================================
    // Lecture de l'état
    // ========================================================================

    pub fn mode(&self) -> PageMode {
        match (self.filter.sort, &self.filter.base) {
            (Some(SortMode::YourVotes), _) => PageMode::YourVotes,
            (Some(sort), _) => PageMode::SortedList(sort),
            (None, Some(base)) => PageMode::Filtered {
                base: base.clone(),
                counter: self.filter.counter.clone(),
            },
            (None, None) => PageMode::Idle,
        }
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> Option<SortMode> {
        self.filter.sort
    }

    /// URL courante (normalisée)
    pub fn query(&self) -> String {
        self.query.to_query_string()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// None tant que la première liste n'est pas chargée
    pub fn pairs(&self) -> Option<&[PairStats]> {
        self.pairs.as_deref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_loading(&self) -> bool {
        self.pairs_loading
    }

    pub fn is_changing_page(&self) -> bool {
        self.change_page_loading
    }

    pub fn total_stats(&self) -> Option<&TotalStats> {
        self.total_stats.as_ref()
    }

    pub fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn claimables_loaded(&self) -> bool {
        self.claimables_loaded
    }

    pub fn update_index(&self) -> u64 {
        self.timer.update_index()
    }

    /// Temps restant avant le prochain rafraîchissement
    pub fn next_refresh_in(&self, now: Instant) -> Option<Duration> {
        self.timer.remaining(now)
    }

    /// Dernière erreur de chargement (consommée par l'appelant)
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// Date du snapshot de votes (première paire qui en a un)
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.pairs.as_ref()?.iter().find_map(PairStats::snapshot_time)
    }

    pub fn show_pagination(&self) -> bool {
        self.pairs.is_some()
            && (!self.pairs_loading || self.change_page_loading)
            && self.filter.sort != Some(SortMode::YourVotes)
    }

    /// Nombre de pages (au moins 1)
    pub fn page_count(&self) -> usize {
        self.count.div_ceil(self.page_size).max(1)
    }

    pub fn empty_state_message(&self) -> Option<PageNotice> {
        let pairs = self.pairs.as_ref()?;

        if let (Some(base), Some(counter)) = (&self.filter.base, &self.filter.counter) {
            if pairs.is_empty() {
                return Some(PageNotice::CreatePair {
                    base: base.clone(),
                    counter: counter.clone(),
                });
            }
        }

        if !self.pairs_loading && self.filter.base.is_some() && self.filter.counter.is_none() {
            return Some(if pairs.is_empty() {
                PageNotice::NoPairsFound
            } else {
                PageNotice::SearchResults
            });
        }

        if self.filter.sort == Some(SortMode::YourVotes) && pairs.is_empty() {
            return Some(PageNotice::NoPairsFound);
        }

        None
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClaimableBalance, Claimant, PairsPage};
    use crate::storage::MemoryStorage;
    use anyhow::anyhow;

    const ACCOUNT: &str = "GACCOUNT";
    const ISSUER: &str = "GBNZILSTVQZ4R7IKQDGHYGY2QXL5QOFJYQMXPKWRRM5PAV7Y4M67AQUA";

    fn controller(session: Session) -> (PageController, Arc<AssetStore>, Instant) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let assets = Arc::new(AssetStore::load(storage.clone()));
        let now = Instant::now();
        let ctx = PageContext::new(session, assets.clone(), storage);
        (PageController::new(ctx, now), assets, now)
    }

    fn pair(market_key: &str) -> PairStats {
        PairStats {
            market_key: market_key.to_string(),
            asset1_code: "AQUA".to_string(),
            asset1_issuer: ISSUER.to_string(),
            asset2_code: "XLM".to_string(),
            timestamp: Some("2024-03-01T12:00:00Z".to_string()),
            votes_value: Some("1000".to_string()),
            ..PairStats::default()
        }
    }

    fn tickets(effects: &[Effect]) -> Vec<FetchTicket> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Fetch(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .collect()
    }

    fn list_ticket(effects: &[Effect]) -> Option<FetchTicket> {
        tickets(effects)
            .into_iter()
            .find(|ticket| ticket.request.slot() == FetchSlot::List)
    }

    fn page_outcome(id: RequestId, keys: &[&str], count: usize) -> FetchOutcome {
        FetchOutcome {
            id,
            result: Ok(FetchPayload::Page(PairsPage {
                pairs: keys.iter().map(|key| pair(key)).collect(),
                count,
            })),
        }
    }

    #[test]
    fn test_mount_normalizes_and_fetches() {
        let (mut page, _, now) = controller(Session::anonymous());
        let effects = page.mount("", now);

        assert!(effects.contains(&Effect::ReplaceQuery("sort=popular".to_string())));

        let requests: Vec<FetchRequest> = tickets(&effects).into_iter().map(|t| t.request).collect();
        assert!(requests.contains(&FetchRequest::TotalStats));
        assert!(requests.contains(&FetchRequest::Pairs {
            sort: SortMode::Popular,
            page_size: PAGE_SIZE,
            page: 1,
        }));
        assert!(page.is_loading());
        assert_eq!(page.pairs(), None);
    }

    #[test]
    fn test_sort_change_resets_page() {
        let (mut page, _, now) = controller(Session::anonymous());
        let effects = page.mount("sort=popular", now);
        let ticket = list_ticket(&effects).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA"], 100));

        let effects = page.change_page(3, now);
        assert_eq!(
            list_ticket(&effects).unwrap().request,
            FetchRequest::Pairs {
                sort: SortMode::Popular,
                page_size: PAGE_SIZE,
                page: 3,
            }
        );
        assert!(page.is_changing_page());

        let effects = page.change_sort(SortMode::TopVoted, now);
        assert_eq!(page.page(), 1);
        assert!(effects.contains(&Effect::PushQuery("sort=topVoted".to_string())));
        assert_eq!(
            list_ticket(&effects).unwrap().request,
            FetchRequest::Pairs {
                sort: SortMode::TopVoted,
                page_size: PAGE_SIZE,
                page: 1,
            }
        );
    }

    #[test]
    fn test_your_votes_logged_out_prompts_login() {
        let (mut page, _, now) = controller(Session::anonymous());
        let effects = page.mount("sort=yourVotes", now);

        assert!(effects.contains(&Effect::OpenLoginPrompt));
        assert!(effects.contains(&Effect::ReplaceQuery("sort=popular".to_string())));
        assert_eq!(page.sort(), Some(SortMode::Popular));
        assert_eq!(page.query(), "sort=popular");

        // Pas de requête "your votes" : la liste chargée est "popular"
        let requests: Vec<FetchRequest> = tickets(&effects).into_iter().map(|t| t.request).collect();
        assert!(!requests.iter().any(|r| matches!(r, FetchRequest::UserPairs { .. })));
        assert_eq!(
            list_ticket(&effects).unwrap().request,
            FetchRequest::Pairs {
                sort: SortMode::Popular,
                page_size: PAGE_SIZE,
                page: 1,
            }
        );
    }

    #[test]
    fn test_your_votes_tab_logged_out_stays_on_popular() {
        let (mut page, _, now) = controller(Session::anonymous());
        let ticket = list_ticket(&page.mount("sort=topVoted", now)).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA"], 1));

        let effects = page.change_sort(SortMode::YourVotes, now);
        assert!(effects.contains(&Effect::PushQuery("sort=yourVotes".to_string())));
        assert!(effects.contains(&Effect::OpenLoginPrompt));
        assert!(effects.contains(&Effect::ReplaceQuery("sort=popular".to_string())));
        assert_eq!(page.mode(), PageMode::SortedList(SortMode::Popular));
        assert!(list_ticket(&effects).is_some());
    }

    #[test]
    fn test_navigate_to_other_filter_resets_page() {
        let (mut page, _, now) = controller(Session::anonymous());
        let ticket = list_ticket(&page.mount("base=native", now)).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA"], 100));

        assert!(list_ticket(&page.change_page(3, now)).is_some());
        assert_eq!(page.page(), 3);

        let effects = page.navigate("sort=topVoted", now);
        assert_eq!(page.page(), 1);
        assert_eq!(
            list_ticket(&effects).unwrap().request,
            FetchRequest::Pairs {
                sort: SortMode::TopVoted,
                page_size: PAGE_SIZE,
                page: 1,
            }
        );

        // Même filtre : la page est conservée
        let ticket = list_ticket(&effects).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA"], 100));
        page.change_page(2, now);
        assert!(page.navigate("sort=topVoted", now).is_empty());
        assert_eq!(page.page(), 2);
    }

    #[test]
    fn test_logout_on_your_votes_forces_popular() {
        let (mut page, _, now) = controller(Session::logged(ACCOUNT));
        page.mount("sort=yourVotes", now);

        let effects = page.set_session(Session::anonymous(), now);
        assert!(effects.contains(&Effect::PushQuery("sort=popular".to_string())));
        assert_eq!(page.sort(), Some(SortMode::Popular));
        assert!(list_ticket(&effects).is_some());
    }

    #[test]
    fn test_your_votes_waits_for_claimables() {
        let (mut page, _, now) = controller(Session::logged(ACCOUNT));
        let effects = page.mount("sort=yourVotes", now);
        assert!(list_ticket(&effects).is_none());
        assert_eq!(page.next_refresh_in(now), None);

        let state = ClaimableState {
            account_id: ACCOUNT.to_string(),
            loaded: true,
            balances: vec![ClaimableBalance {
                id: "b1".to_string(),
                claimants: vec![
                    Claimant {
                        destination: ACCOUNT.to_string(),
                        ..Claimant::default()
                    },
                    Claimant {
                        destination: "GMARKET".to_string(),
                        ..Claimant::default()
                    },
                ],
                ..ClaimableBalance::default()
            }],
        };

        let effects = page.on_claimable_update(&state, now);
        let ticket = list_ticket(&effects).unwrap();
        assert_eq!(
            ticket.request,
            FetchRequest::UserPairs {
                keys: vec!["GMARKET".to_string()],
            }
        );

        // Mise à jour suivante : déjà chargé, pas de nouvelle requête
        assert!(page.on_claimable_update(&state, now).is_empty());

        page.on_fetch_outcome(FetchOutcome {
            id: ticket.id,
            result: Ok(FetchPayload::UserPairs(vec![pair("GMARKET")])),
        });
        assert_eq!(page.count(), 1);
        assert!(!page.show_pagination());
        assert!(page.change_page(2, now).is_empty());
    }

    #[test]
    fn test_stale_outcome_is_discarded() {
        let (mut page, _, now) = controller(Session::anonymous());
        let first = list_ticket(&page.mount("sort=popular", now)).unwrap();
        let second = list_ticket(&page.change_sort(SortMode::TopVoted, now)).unwrap();

        assert!(!page.on_fetch_outcome(page_outcome(first.id, &["GOLD"], 1)));
        assert_eq!(page.pairs(), None);

        assert!(page.on_fetch_outcome(page_outcome(second.id, &["GNEW"], 1)));
        assert_eq!(page.pairs().unwrap()[0].market_key, "GNEW");
        assert!(!page.is_loading());
    }

    #[test]
    fn test_timer_refetches_top_voted() {
        let (mut page, _, now) = controller(Session::anonymous());
        let ticket = list_ticket(&page.mount("sort=topVoted", now)).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA"], 1));

        assert!(page.poll(now + Duration::from_secs(30)).is_empty());

        let effects = page.poll(now + Duration::from_secs(60));
        assert_eq!(
            list_ticket(&effects).unwrap().request,
            FetchRequest::Pairs {
                sort: SortMode::TopVoted,
                page_size: PAGE_SIZE,
                page: 1,
            }
        );
        assert_eq!(page.update_index(), 1);
    }

    #[test]
    fn test_timer_revalues_popular() {
        let (mut page, _, now) = controller(Session::anonymous());
        let ticket = list_ticket(&page.mount("sort=popular", now)).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA", "GB"], 2));

        let effects = page.poll(now + Duration::from_secs(60));
        let ticket = list_ticket(&effects).unwrap();
        match &ticket.request {
            FetchRequest::Revalue { pairs } => assert_eq!(pairs.len(), 2),
            other => panic!("unexpected request {:?}", other),
        }

        let mut refreshed = pair("GA");
        refreshed.votes_value = Some("2000".to_string());
        page.on_fetch_outcome(FetchOutcome {
            id: ticket.id,
            result: Ok(FetchPayload::Revalued(vec![refreshed])),
        });
        assert_eq!(page.pairs().unwrap()[0].votes(), Some(2000.0));
        assert_eq!(page.count(), 2);
    }

    #[test]
    fn test_loaded_pairs_register_assets() {
        let (mut page, assets, now) = controller(Session::anonymous());
        let ticket = list_ticket(&page.mount("sort=popular", now)).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA", "GB"], 2));

        assert_eq!(assets.len(), 2);
        assert!(assets.contains(&AssetSimple::new("AQUA", Some(ISSUER))));
    }

    #[test]
    fn test_fetch_error_clears_loading() {
        let (mut page, _, now) = controller(Session::anonymous());
        let ticket = list_ticket(&page.mount("sort=popular", now)).unwrap();

        assert!(page.on_fetch_outcome(FetchOutcome {
            id: ticket.id,
            result: Err(anyhow!("connexion refusée")),
        }));
        assert!(!page.is_loading());
        assert_eq!(page.pairs(), Some(&[][..]));
        assert!(page.take_error().unwrap().contains("connexion refusée"));
        assert_eq!(page.take_error(), None);
    }

    #[test]
    fn test_filtered_search() {
        let (mut page, _, now) = controller(Session::logged(ACCOUNT));
        page.mount("sort=popular", now);

        let effects = page.change_base(Some(Asset::Native), now);
        assert!(effects.contains(&Effect::PushQuery("base=native".to_string())));
        let ticket = list_ticket(&effects).unwrap();
        assert_eq!(
            ticket.request,
            FetchRequest::FilteredPairs {
                base: Asset::Native,
                counter: None,
                page_size: PAGE_SIZE,
                page: 1,
            }
        );
        page.on_fetch_outcome(page_outcome(ticket.id, &["GA"], 1));
        assert_eq!(page.empty_state_message(), Some(PageNotice::SearchResults));

        let aqua = Asset::credit("AQUA", ISSUER).unwrap();
        let effects = page.change_counter(Some(aqua.clone()), now);
        let ticket = list_ticket(&effects).unwrap();
        page.on_fetch_outcome(page_outcome(ticket.id, &[], 0));

        assert_eq!(
            page.empty_state_message(),
            Some(PageNotice::CreatePair {
                base: Asset::Native,
                counter: aqua.clone(),
            })
        );
        assert_eq!(
            page.create_pair(),
            vec![Effect::OpenCreatePair {
                base: Asset::Native,
                counter: Some(aqua),
            }]
        );
    }

    #[test]
    fn test_vote_click_and_start_vote() {
        let (mut page, _, now) = controller(Session::anonymous());
        page.mount("sort=popular", now);

        assert!(page.on_vote_click(&pair("GA")).unwrap());
        assert_eq!(page.start_vote(), vec![Effect::OpenLoginPrompt]);

        page.set_session(Session::logged(ACCOUNT), now);
        assert_eq!(page.start_vote(), vec![Effect::OpenVoteForm(vec![pair("GA")])]);

        assert!(!page.on_vote_click(&pair("GA")).unwrap());
        assert!(page.ballot().is_empty());
    }

    #[test]
    fn test_clear_ballot_after_submission() {
        let (mut page, _, now) = controller(Session::logged(ACCOUNT));
        page.mount("sort=popular", now);

        page.on_vote_click(&pair("GA")).unwrap();
        page.on_vote_click(&pair("GB")).unwrap();
        assert_eq!(page.ballot().len(), 2);

        page.clear_ballot().unwrap();
        page.on_submission_finished();
        assert!(page.ballot().is_empty());
        assert!(!page.ballot().contains("GA"));
    }

    #[test]
    fn test_view_helpers() {
        let (mut page, _, now) = controller(Session::anonymous());
        let ticket = list_ticket(&page.mount("sort=popular", now)).unwrap();
        assert!(!page.show_pagination());

        page.on_fetch_outcome(page_outcome(ticket.id, &["GA"], 41));
        assert_eq!(page.page_count(), 3);
        assert!(page.show_pagination());
        assert_eq!(page.last_updated(), crate::models::parse_timestamp("2024-03-01T12:00:00Z"));
        assert_eq!(page.empty_state_message(), None);
    }
}
