// ============================================================================
// Codec de la query string (sort / base / counter)
// ============================================================================
// L'URL est la source de vérité des filtres de la page. Ce module :
// 1. parse la query string en paramètres ordonnés (comme URLSearchParams)
// 2. normalise les combinaisons invalides (une réécriture par passe)
// 3. produit un FilterState typé une fois l'URL stable
//
// CONCEPT : Point fixe
// - normalize() fait au plus une réécriture par passe
// - On rejoue jusqu'à ce que l'URL ne change plus
// ============================================================================

use reqwest::Url;
use tracing::{debug, warn};

use crate::models::{Asset, SortMode};

pub const SORT_PARAM: &str = "sort";
pub const BASE_PARAM: &str = "base";
pub const COUNTER_PARAM: &str = "counter";

/// Nombre maximum de passes de normalisation
///
/// Le pire cas observé converge en 5 passes, la marge couvre les entrées
/// inattendues
pub const MAX_NORMALIZATION_PASSES: usize = 8;

/// Paramètres de query string ordonnés, clés répétables
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse une query string ("?sort=popular" ou "sort=popular")
    ///
    /// Le décodage (percent-encoding, '+') passe par reqwest::Url
    pub fn parse(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        if query.is_empty() {
            return Self::default();
        }

        let mut url = match Url::parse("http://localhost/") {
            Ok(url) => url,
            Err(_) => return Self::default(),
        };
        url.set_query(Some(query));

        Self {
            pairs: url
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
        }
    }

    /// Vérifie si la clé est présente
    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Première valeur de la clé
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remplace la valeur de la clé (à la place de la première occurrence)
    pub fn set(&mut self, key: &str, value: &str) {
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.pairs[index].1 = value.to_string();
                let mut seen = false;
                self.pairs.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.append(key, value),
        }
    }

    /// Ajoute une paire clé/valeur à la fin
    pub fn append(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Supprime toutes les occurrences de la clé
    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Sérialise en query string, sans '?'
    ///
    /// Les ':' restent lisibles ("base=AQUA:G...")
    pub fn to_query_string(&self) -> String {
        let mut url = match Url::parse("http://localhost/") {
            Ok(url) => url,
            Err(_) => return String::new(),
        };

        {
            let mut serializer = url.query_pairs_mut();
            for (key, value) in &self.pairs {
                serializer.append_pair(key, value);
            }
        }

        url.query().unwrap_or_default().replace("%3A", ":")
    }
}

// ============================================================================
// FilterState : état typé des filtres
// ============================================================================

/// Filtres de la page, une fois l'URL normalisée
///
/// Invariant : sort et base ne sont jamais définis en même temps,
/// counter n'est défini que si base l'est
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub sort: Option<SortMode>,
    pub base: Option<Asset>,
    pub counter: Option<Asset>,
}

/// Résultat d'une passe de normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// L'URL doit être réécrite (puis normalisée à nouveau)
    Rewrite(QueryParams),

    /// L'URL est stable
    Settled(FilterState),
}

/// Une passe de normalisation
///
/// CONCEPT RUST : Early return
/// - Chaque règle qui modifie l'URL retourne immédiatement Rewrite
/// - Seule une URL qui passe toutes les règles produit Settled
pub fn normalize(params: &QueryParams) -> Normalization {
    let has_sort = params.has(SORT_PARAM);
    let has_base = params.has(BASE_PARAM);
    let has_counter = params.has(COUNTER_PARAM);

    // 1. Aucun filtre : tri par défaut
    if !has_sort && !has_base && !has_counter {
        let mut next = params.clone();
        next.append(SORT_PARAM, SortMode::Popular.as_param());
        return Normalization::Rewrite(next);
    }

    // 2. Le tri l'emporte sur les filtres d'assets
    if has_sort && (has_base || has_counter) {
        let mut next = params.clone();
        next.delete(BASE_PARAM);
        next.delete(COUNTER_PARAM);
        return Normalization::Rewrite(next);
    }

    // 3. counter sans base : counter devient base
    if has_counter && !has_base {
        let mut next = params.clone();
        let counter = params.get(COUNTER_PARAM).unwrap_or_default().to_string();
        next.append(BASE_PARAM, &counter);
        next.delete(COUNTER_PARAM);
        return Normalization::Rewrite(next);
    }

    // 4. base == counter : on retire counter
    if let (Some(base), Some(counter)) = (params.get(BASE_PARAM), params.get(COUNTER_PARAM)) {
        if !base.is_empty() && base == counter {
            let mut next = params.clone();
            next.delete(COUNTER_PARAM);
            return Normalization::Rewrite(next);
        }
    }

    // 5. Tri inconnu : on le retire
    let sort = match params.get(SORT_PARAM) {
        Some(value) => match SortMode::from_param(value) {
            Some(sort) => Some(sort),
            None => {
                let mut next = params.clone();
                next.delete(SORT_PARAM);
                return Normalization::Rewrite(next);
            }
        },
        None => None,
    };

    // 6. Décodage des assets, un paramètre invalide est retiré
    let base = match decode_param(params, BASE_PARAM) {
        Ok(asset) => asset,
        Err(next) => return Normalization::Rewrite(next),
    };
    let counter = match decode_param(params, COUNTER_PARAM) {
        Ok(asset) => asset,
        Err(next) => return Normalization::Rewrite(next),
    };

    // Deux écritures du même asset ("native" et "XLM") : on retire counter
    if base.is_some() && base == counter {
        let mut next = params.clone();
        next.delete(COUNTER_PARAM);
        return Normalization::Rewrite(next);
    }

    Normalization::Settled(FilterState { sort, base, counter })
}

/// Décode un paramètre d'asset
///
/// Err(params sans le paramètre) si le décodage échoue
fn decode_param(params: &QueryParams, key: &str) -> Result<Option<Asset>, QueryParams> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };

    match Asset::from_url_param(raw) {
        Ok(asset) => Ok(Some(asset)),
        Err(e) => {
            debug!(param = key, value = raw, error = %e, "Invalid asset parameter, stripping");
            let mut next = params.clone();
            next.delete(key);
            Err(next)
        }
    }
}

/// Normalise jusqu'au point fixe
///
/// Retourne l'URL stable et les filtres correspondants
pub fn normalize_to_fixpoint(params: &QueryParams) -> (QueryParams, FilterState) {
    let mut current = params.clone();

    for _ in 0..MAX_NORMALIZATION_PASSES {
        match normalize(&current) {
            Normalization::Settled(filter) => return (current, filter),
            Normalization::Rewrite(next) => current = next,
        }
    }

    warn!(query = %params.to_query_string(), "Query normalization did not converge, using default sort");
    let mut fallback = QueryParams::new();
    fallback.append(SORT_PARAM, SortMode::Popular.as_param());
    (
        fallback,
        FilterState {
            sort: Some(SortMode::Popular),
            ..FilterState::default()
        },
    )
}

// ============================================================================
// Actions utilisateur : nouvelles URLs
// ============================================================================

/// Choisir un tri efface les filtres d'assets
pub fn with_sort(params: &QueryParams, sort: SortMode) -> QueryParams {
    let mut next = params.clone();
    next.set(SORT_PARAM, sort.as_param());
    next.delete(BASE_PARAM);
    next.delete(COUNTER_PARAM);
    next
}

/// Choisir (ou retirer) l'asset de base efface le tri
pub fn with_base(params: &QueryParams, asset: Option<&Asset>) -> QueryParams {
    with_asset(params, BASE_PARAM, asset)
}

/// Choisir (ou retirer) l'asset counter efface le tri
pub fn with_counter(params: &QueryParams, asset: Option<&Asset>) -> QueryParams {
    with_asset(params, COUNTER_PARAM, asset)
}

fn with_asset(params: &QueryParams, key: &str, asset: Option<&Asset>) -> QueryParams {
    let mut next = params.clone();
    next.delete(SORT_PARAM);
    match asset {
        Some(asset) => next.set(key, &asset.to_url_param()),
        None => next.delete(key),
    }
    next
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "GBNZILSTVQZ4R7IKQDGHYGY2QXL5QOFJYQMXPKWRRM5PAV7Y4M67AQUA";

    fn aqua() -> Asset {
        Asset::credit("AQUA", ISSUER).unwrap()
    }

    fn settle(query: &str) -> (String, FilterState) {
        let (params, filter) = normalize_to_fixpoint(&QueryParams::parse(query));
        (params.to_query_string(), filter)
    }

    #[test]
    fn test_parse_and_serialize() {
        let params = QueryParams::parse(&format!("?base=AQUA%3A{}&counter=native", ISSUER));
        assert_eq!(params.get(BASE_PARAM), Some(format!("AQUA:{}", ISSUER).as_str()));
        assert_eq!(params.get(COUNTER_PARAM), Some("native"));
        assert_eq!(
            params.to_query_string(),
            format!("base=AQUA:{}&counter=native", ISSUER)
        );
    }

    #[test]
    fn test_set_replaces_first_occurrence() {
        let mut params = QueryParams::parse("sort=a&x=1&sort=b");
        params.set(SORT_PARAM, "popular");
        assert_eq!(params.to_query_string(), "sort=popular&x=1");
    }

    #[test]
    fn test_empty_defaults_to_popular() {
        let (query, filter) = settle("");
        assert_eq!(query, "sort=popular");
        assert_eq!(filter.sort, Some(SortMode::Popular));
    }

    #[test]
    fn test_sort_wins_over_assets() {
        let (query, filter) = settle(&format!("sort=topVoted&base=AQUA:{}", ISSUER));
        assert_eq!(query, "sort=topVoted");
        assert_eq!(filter.sort, Some(SortMode::TopVoted));
        assert_eq!(filter.base, None);
    }

    #[test]
    fn test_counter_promoted_to_base() {
        let (query, filter) = settle("counter=native");
        assert_eq!(query, "base=native");
        assert_eq!(filter.base, Some(Asset::Native));
        assert_eq!(filter.counter, None);
    }

    #[test]
    fn test_identical_assets_drop_counter() {
        let params = QueryParams::parse("base=USD:ISSUER&counter=USD:ISSUER");
        match normalize(&params) {
            Normalization::Rewrite(next) => {
                assert_eq!(next.to_query_string(), "base=USD:ISSUER");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_same_asset_spelled_differently_drops_counter() {
        let (query, filter) = settle("base=native&counter=XLM");
        assert_eq!(query, "base=native");
        assert_eq!(filter.base, Some(Asset::Native));
        assert_eq!(filter.counter, None);
    }

    #[test]
    fn test_unknown_sort_is_dropped() {
        let (query, filter) = settle("sort=newest");
        assert_eq!(query, "sort=popular");
        assert_eq!(filter.sort, Some(SortMode::Popular));
    }

    #[test]
    fn test_invalid_asset_is_stripped() {
        let (query, filter) = settle(&format!("base=AQUA:{}&counter=bad", ISSUER));
        assert_eq!(query, format!("base=AQUA:{}", ISSUER));
        assert_eq!(filter.base, Some(aqua()));
        assert_eq!(filter.counter, None);
    }

    #[test]
    fn test_filtered_state() {
        let (_, filter) = settle(&format!("base=AQUA:{}&counter=native", ISSUER));
        assert_eq!(
            filter,
            FilterState {
                sort: None,
                base: Some(aqua()),
                counter: Some(Asset::Native),
            }
        );
    }

    #[test]
    fn test_fixpoint_is_idempotent() {
        let inputs = [
            "",
            "sort=popular",
            "sort=yourVotes&counter=native",
            "sort=bogus&base=native",
            "counter=bad",
            "counter=native&sort=x",
            "base=native&counter=native",
            "base=native&counter=XLM",
            "base=USD:ISSUER&counter=USD:ISSUER",
            "foo=bar",
        ];

        for input in inputs {
            let (stable, filter) = normalize_to_fixpoint(&QueryParams::parse(input));
            assert_eq!(
                normalize(&stable),
                Normalization::Settled(filter),
                "not stable for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_user_actions() {
        let params = QueryParams::parse(&format!("base=AQUA:{}&counter=native", ISSUER));
        assert_eq!(with_sort(&params, SortMode::TopVoted).to_query_string(), "sort=topVoted");

        let params = QueryParams::parse("sort=popular");
        let next = with_base(&params, Some(&Asset::Native));
        assert_eq!(next.to_query_string(), "base=native");

        let next = with_counter(&next, Some(&aqua()));
        assert_eq!(next.to_query_string(), format!("base=native&counter=AQUA:{}", ISSUER));

        let next = with_base(&next, None);
        assert_eq!(next.to_query_string(), format!("counter=AQUA:{}", ISSUER));
    }
}
