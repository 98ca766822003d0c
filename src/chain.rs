// ============================================================================
// Flux des claimable balances
// ============================================================================
// Interroge Horizon périodiquement pour le compte connecté et publie
// l'état courant dans un canal watch
//
// CONCEPTS RUST :
// 1. tokio::sync::watch : un seul état courant, les lecteurs voient la
//    dernière valeur (pas d'historique)
// 2. JoinHandle::abort : arrêt du polling quand le compte change
// 3. Trait ClaimableSource : Horizon en production, un faux en test
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::HorizonClient;
use crate::models::{ClaimableBalance, ClaimableState};

/// Intervalle de polling par défaut
pub const DEFAULT_CLAIMABLE_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Source des claimable balances d'un compte
#[async_trait]
pub trait ClaimableSource: Send + Sync {
    async fn claimable_balances(&self, account_id: &str) -> Result<Vec<ClaimableBalance>>;
}

#[async_trait]
impl ClaimableSource for HorizonClient {
    async fn claimable_balances(&self, account_id: &str) -> Result<Vec<ClaimableBalance>> {
        HorizonClient::claimable_balances(self, account_id).await
    }
}

/// Polling en cours pour un compte
///
/// Le polling s'arrête quand le flux est stoppé ou droppé
pub struct ClaimableBalancesStream {
    account_id: String,
    receiver: watch::Receiver<ClaimableState>,
    task: JoinHandle<()>,
}

impl ClaimableBalancesStream {
    /// Démarre le polling sur le runtime donné
    pub fn start(
        runtime: &Handle,
        source: Arc<dyn ClaimableSource>,
        account_id: &str,
        interval: Duration,
    ) -> Self {
        info!(account = %account_id, ?interval, "Starting claimable balances stream");
        let (sender, receiver) = watch::channel(ClaimableState::pending(account_id));
        let task = runtime.spawn(poll_claimables(source, account_id.to_string(), interval, sender));

        Self {
            account_id: account_id.to_string(),
            receiver,
            task,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Nouveau lecteur
    ///
    /// Si un état a déjà été publié, le premier changed() retourne aussitôt
    pub fn subscribe(&self) -> watch::Receiver<ClaimableState> {
        self.receiver.clone()
    }

    /// Dernier état publié
    pub fn current(&self) -> ClaimableState {
        self.receiver.borrow().clone()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ClaimableBalancesStream {
    fn drop(&mut self) {
        debug!(account = %self.account_id, "Stopping claimable balances stream");
        self.task.abort();
    }
}

/// Boucle de polling
///
/// Une erreur réseau est loggée, l'état précédent est conservé
async fn poll_claimables(
    source: Arc<dyn ClaimableSource>,
    account_id: String,
    interval: Duration,
    sender: watch::Sender<ClaimableState>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match source.claimable_balances(&account_id).await {
            Ok(balances) => {
                let state = ClaimableState {
                    account_id: account_id.clone(),
                    loaded: true,
                    balances,
                };

                let changed = sender.send_if_modified(|current| {
                    if *current == state {
                        return false;
                    }
                    *current = state;
                    true
                });
                if changed {
                    debug!(account = %account_id, "Claimable balances updated");
                }
            }
            Err(e) => {
                warn!(account = %account_id, error = ?e, "Failed to fetch claimable balances");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ClaimableSource for FakeSource {
        async fn claimable_balances(&self, _account_id: &str) -> Result<Vec<ClaimableBalance>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                anyhow::bail!("horizon indisponible");
            }
            Ok(vec![ClaimableBalance {
                id: "b1".to_string(),
                ..ClaimableBalance::default()
            }])
        }
    }

    #[tokio::test]
    async fn test_stream_publishes_loaded_state() {
        let source = Arc::new(FakeSource {
            calls: AtomicUsize::new(0),
        });
        let stream = ClaimableBalancesStream::start(
            &Handle::current(),
            source.clone(),
            "GACCOUNT",
            Duration::from_millis(10),
        );
        assert!(!stream.current().loaded);

        let mut receiver = stream.subscribe();
        tokio::time::timeout(Duration::from_secs(5), receiver.changed())
            .await
            .unwrap()
            .unwrap();

        let state = receiver.borrow_and_update().clone();
        assert!(state.loaded);
        assert_eq!(state.account_id, "GACCOUNT");
        assert_eq!(state.balances.len(), 1);

        // Erreur au premier appel : l'état n'a été publié qu'après
        assert!(source.calls.load(Ordering::SeqCst) >= 2);

        stream.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            while receiver.changed().await.is_ok() {}
        })
        .await
        .unwrap();
    }
}
