//! Account provisioning for local development networks.
//!
//! Setup tooling asks for "at least N accounts" from several places at once.
//! [`SingleFlight`] makes those callers share one provisioning run, and the
//! provisioner remembers a successful run so later calls return immediately.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::RpcResult;

/// Runs at most one instance of an operation at a time.
///
/// Callers arriving while a run is in flight await that run and receive a
/// clone of its output. Once it settles the slot is cleared and the next
/// caller starts a fresh run.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Option<(u64, Shared<BoxFuture<'static, T>>)>>,
    generation: AtomicU64,
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight run, or start one with `start`.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (id, flight) = {
            let mut slot = self.slot.lock().await;
            match slot.as_ref() {
                Some((id, flight)) => {
                    debug!("Joining in-flight run {}", id);
                    (*id, flight.clone())
                }
                None => {
                    let id = self.generation.fetch_add(1, Ordering::SeqCst);
                    let flight = start().boxed().shared();
                    *slot = Some((id, flight.clone()));
                    (id, flight)
                }
            }
        };

        let output = flight.await;

        let mut slot = self.slot.lock().await;
        if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
            *slot = None;
        }
        output
    }
}

/// Creates accounts on the upstream network.
#[async_trait]
pub trait AccountCreator: Send + Sync {
    /// Accounts that already exist, in creation order.
    async fn existing_accounts(&self) -> RpcResult<Vec<String>>;

    /// Create the account at `index` and return its id.
    async fn create_account(&self, index: usize) -> RpcResult<String>;
}

/// Ensures a minimum number of accounts exist.
pub struct AccountProvisioner {
    creator: Arc<dyn AccountCreator>,
    gate: SingleFlight<RpcResult<Vec<String>>>,
    validated: AtomicBool,
}

impl AccountProvisioner {
    pub fn new(creator: Arc<dyn AccountCreator>) -> Self {
        Self {
            creator,
            gate: SingleFlight::new(),
            validated: AtomicBool::new(false),
        }
    }

    pub fn is_validated(&self) -> bool {
        self.validated.load(Ordering::SeqCst)
    }

    /// Make sure at least `count` accounts exist.
    ///
    /// Concurrent callers share one provisioning run; the `count` of the
    /// caller that started it wins. After the first success every call
    /// returns without touching the network.
    pub async fn ensure_accounts(&self, count: usize) -> RpcResult<()> {
        if self.is_validated() {
            return Ok(());
        }

        let creator = self.creator.clone();
        let accounts = self
            .gate
            .run(move || async move { provision(creator, count).await })
            .await?;

        debug!("{} accounts available", accounts.len());
        self.validated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

async fn provision(creator: Arc<dyn AccountCreator>, count: usize) -> RpcResult<Vec<String>> {
    let mut accounts = creator.existing_accounts().await?;
    for index in accounts.len()..count {
        let id = creator.create_account(index).await?;
        info!("Created account {} ({}/{})", id, index + 1, count);
        accounts.push(id);
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use futures::future::join_all;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingCreator {
        existing: Vec<String>,
        lookups: AtomicUsize,
        created: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl AccountCreator for CountingCreator {
        async fn existing_accounts(&self) -> RpcResult<Vec<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(self.existing.clone())
        }

        async fn create_account(&self, index: usize) -> RpcResult<String> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RpcError::upstream("faucet unavailable"));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("test{}.near", index))
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let creator = Arc::new(CountingCreator::default());
        let provisioner = AccountProvisioner::new(creator.clone());

        let results = join_all((0..8).map(|_| provisioner.ensure_accounts(3))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(creator.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(creator.created.load(Ordering::SeqCst), 3);
        assert!(provisioner.is_validated());

        // Validated: no further upstream work.
        provisioner.ensure_accounts(10).await.unwrap();
        assert_eq!(creator.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_existing_accounts_are_not_recreated() {
        let creator = Arc::new(CountingCreator {
            existing: vec!["a.near".to_string(), "b.near".to_string()],
            ..Default::default()
        });
        let provisioner = AccountProvisioner::new(creator.clone());

        provisioner.ensure_accounts(3).await.unwrap();
        assert_eq!(creator.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_retried_later() {
        let creator = Arc::new(CountingCreator::default());
        creator.fail.store(true, Ordering::SeqCst);
        let provisioner = AccountProvisioner::new(creator.clone());

        let results = join_all((0..4).map(|_| provisioner.ensure_accounts(1))).await;
        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(creator.lookups.load(Ordering::SeqCst), 1);
        assert!(!provisioner.is_validated());

        creator.fail.store(false, Ordering::SeqCst);
        provisioner.ensure_accounts(1).await.unwrap();
        assert_eq!(creator.lookups.load(Ordering::SeqCst), 2);
        assert!(provisioner.is_validated());
    }

    #[tokio::test]
    async fn test_independent_gates_do_not_interfere() {
        let a = SingleFlight::<u32>::new();
        let b = SingleFlight::<u32>::new();
        let (x, y) = tokio::join!(a.run(|| async { 1 }), b.run(|| async { 2 }));
        assert_eq!((x, y), (1, 2));
    }
}
