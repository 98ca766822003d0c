// ============================================================================
// API Client : Horizon (réseau Stellar)
// ============================================================================
// Récupère les claimable balances dont un compte est claimant.
// Les votes AQUA sont des claimable balances : c'est la seule source
// pour savoir pour quelles paires l'utilisateur a voté
// ============================================================================

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::models::ClaimableBalance;

/// Serveur Horizon public par défaut
pub const DEFAULT_HORIZON_URL: &str = "https://horizon.stellar.org";

/// Taille de page maximale acceptée par Horizon
const PAGE_LIMIT: usize = 200;

/// Garde-fou sur le nombre de pages parcourues
const MAX_PAGES: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Format HAL d'Horizon : {_embedded: {records: [...]}, _links: {next: {href}}}
#[derive(Debug, Deserialize)]
struct HorizonPage<T> {
    #[serde(rename = "_embedded")]
    embedded: Embedded<T>,
    #[serde(rename = "_links", default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Embedded<T> {
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Links {
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Clone)]
pub struct HorizonClient {
    client: reqwest::Client,
    base_url: String,
}

impl HorizonClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("aquavote/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Échec de la création du client HTTP Horizon")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn first_page_url(&self, account_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/claimable_balances", self.base_url))
            .with_context(|| format!("URL Horizon invalide : {}", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("claimant", account_id)
            .append_pair("limit", &PAGE_LIMIT.to_string())
            .append_pair("order", "asc");
        Ok(url)
    }

    /// Toutes les claimable balances du compte, toutes pages confondues
    #[instrument(skip(self))]
    pub async fn claimable_balances(&self, account_id: &str) -> Result<Vec<ClaimableBalance>> {
        let mut url = self.first_page_url(account_id)?;
        let mut balances = Vec::new();

        for page in 1..=MAX_PAGES {
            debug!(page, url = %url, "Fetching claimable balances page");
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .context("Échec de la requête HTTP vers Horizon")?;

            let status = response.status();
            if !status.is_success() {
                error!(status = %status, "Horizon returned error status");
                bail!("Horizon a retourné une erreur : HTTP {}", status);
            }

            let body: HorizonPage<ClaimableBalance> = response
                .json()
                .await
                .context("Échec du parsing JSON de la réponse Horizon")?;

            let received = body.embedded.records.len();
            balances.extend(body.embedded.records);

            let next = body.links.and_then(|links| links.next).map(|link| link.href);
            match next {
                Some(href) if received == PAGE_LIMIT => {
                    url = Url::parse(&href).context("Lien de pagination Horizon invalide")?;
                }
                _ => {
                    info!(balances = balances.len(), pages = page, "Claimable balances fetched");
                    return Ok(balances);
                }
            }
        }

        warn!(balances = balances.len(), "Claimable balances truncated after max pages");
        Ok(balances)
    }
}
