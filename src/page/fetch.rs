// ============================================================================
// Requêtes de listes
// ============================================================================
// Le contrôleur ne fait jamais d'I/O : il décrit les requêtes (FetchTicket),
// le front-end les exécute sur le runtime tokio et renvoie un FetchOutcome
//
// CONCEPT : Request id
// - Chaque requête porte un id monotone
// - Un résultat dont l'id n'est plus le dernier émis pour son slot est ignoré
// ============================================================================

use std::fmt;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::api::PairsApi;
use crate::models::{Asset, PairStats, PairsPage, SortMode, TotalStats};

/// Identifiant monotone d'une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Slot d'une requête : la liste affichée ou les totaux
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSlot {
    List,
    Stats,
}

/// Description d'un appel à PairsApi
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    Pairs {
        sort: SortMode,
        page_size: usize,
        page: usize,
    },
    FilteredPairs {
        base: Asset,
        counter: Option<Asset>,
        page_size: usize,
        page: usize,
    },
    UserPairs {
        keys: Vec<String>,
    },
    Revalue {
        pairs: Vec<PairStats>,
    },
    TotalStats,
}

impl FetchRequest {
    pub fn slot(&self) -> FetchSlot {
        match self {
            FetchRequest::TotalStats => FetchSlot::Stats,
            _ => FetchSlot::List,
        }
    }
}

/// Requête étiquetée, prête à être exécutée
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub id: RequestId,
    pub request: FetchRequest,
}

/// Données retournées par une requête
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    /// Page complète (liste triée ou filtrée) : remplace pairs et count
    Page(PairsPage),

    /// Paires de l'utilisateur : count = nombre de paires
    UserPairs(Vec<PairStats>),

    /// Votes rafraîchis : remplace pairs, count inchangé
    Revalued(Vec<PairStats>),

    TotalStats(TotalStats),
}

/// Résultat d'une requête, renvoyé au contrôleur
#[derive(Debug)]
pub struct FetchOutcome {
    pub id: RequestId,
    pub result: Result<FetchPayload>,
}

/// Exécute une requête avec le client donné
///
/// Ne retourne jamais d'erreur directement : elle est portée par l'outcome
#[instrument(skip(api, ticket), fields(id = %ticket.id))]
pub async fn execute(api: &dyn PairsApi, ticket: FetchTicket) -> FetchOutcome {
    let FetchTicket { id, request } = ticket;
    debug!(?request, "Executing fetch");

    let result = match request {
        FetchRequest::Pairs { sort, page_size, page } => api
            .get_pairs_list(sort, page_size, page)
            .await
            .map(FetchPayload::Page),
        FetchRequest::FilteredPairs {
            base,
            counter,
            page_size,
            page,
        } => api
            .get_filtered_pairs_list(&base, counter.as_ref(), page_size, page)
            .await
            .map(FetchPayload::Page),
        FetchRequest::UserPairs { keys } => api
            .get_user_pairs_list(&keys)
            .await
            .map(FetchPayload::UserPairs),
        FetchRequest::Revalue { pairs } => api
            .update_votes_for_market_keys(&pairs)
            .await
            .map(FetchPayload::Revalued),
        FetchRequest::TotalStats => api
            .get_total_voting_stats()
            .await
            .map(FetchPayload::TotalStats),
    };

    FetchOutcome { id, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Faux client : enregistre les appels, échoue sur la recherche
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn pair(key: &str) -> PairStats {
        PairStats {
            market_key: key.to_string(),
            ..PairStats::default()
        }
    }

    #[async_trait]
    impl PairsApi for FakeApi {
        async fn get_pairs_list(&self, sort: SortMode, page_size: usize, page: usize) -> Result<PairsPage> {
            self.record(format!("pairs {} {} {}", sort.as_param(), page_size, page));
            Ok(PairsPage {
                pairs: vec![pair("GA")],
                count: 41,
            })
        }

        async fn get_filtered_pairs_list(
            &self,
            base: &Asset,
            _counter: Option<&Asset>,
            _page_size: usize,
            _page: usize,
        ) -> Result<PairsPage> {
            self.record(format!("search {}", base.to_url_param()));
            anyhow::bail!("tracker indisponible")
        }

        async fn get_user_pairs_list(&self, keys: &[String]) -> Result<Vec<PairStats>> {
            self.record(format!("user {}", keys.join(",")));
            Ok(keys.iter().map(|k| pair(k)).collect())
        }

        async fn get_total_voting_stats(&self) -> Result<TotalStats> {
            self.record("stats".to_string());
            Ok(TotalStats::default())
        }

        async fn update_votes_for_market_keys(&self, pairs: &[PairStats]) -> Result<Vec<PairStats>> {
            self.record(format!("revalue {}", pairs.len()));
            Ok(pairs.to_vec())
        }
    }

    #[tokio::test]
    async fn test_execute_maps_payloads() {
        let api = FakeApi::default();

        let outcome = execute(
            &api,
            FetchTicket {
                id: RequestId(1),
                request: FetchRequest::Pairs {
                    sort: SortMode::TopVoted,
                    page_size: 20,
                    page: 3,
                },
            },
        )
        .await;
        assert_eq!(outcome.id, RequestId(1));
        assert!(matches!(outcome.result, Ok(FetchPayload::Page(ref page)) if page.count == 41));

        let outcome = execute(
            &api,
            FetchTicket {
                id: RequestId(2),
                request: FetchRequest::UserPairs {
                    keys: vec!["GA".to_string(), "GB".to_string()],
                },
            },
        )
        .await;
        assert!(matches!(outcome.result, Ok(FetchPayload::UserPairs(ref pairs)) if pairs.len() == 2));

        let calls = api.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["pairs topVoted 20 3", "user GA,GB"]);
    }

    #[tokio::test]
    async fn test_execute_carries_errors() {
        let api = FakeApi::default();
        let outcome = execute(
            &api,
            FetchTicket {
                id: RequestId(7),
                request: FetchRequest::FilteredPairs {
                    base: Asset::Native,
                    counter: None,
                    page_size: 20,
                    page: 1,
                },
            },
        )
        .await;

        assert_eq!(outcome.id, RequestId(7));
        assert!(outcome.result.is_err());
        assert_eq!(FetchRequest::TotalStats.slot(), FetchSlot::Stats);
    }
}
