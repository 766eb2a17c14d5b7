use core::{future::Future, hash::Hash};
use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Strategy for admitting a job into the running set.
///
/// `admit` resolves to a ticket once capacity is available, or to `None` if
/// `token` is cancelled first. Dropping the ticket returns the capacity, so
/// it is released on every exit path of the worker that holds it, unwinding
/// included.
pub(crate) trait Admission<J>: Send + Sync {
    type Ticket: Send + 'static;

    fn admit(
        &self,
        job: &J,
        token: &CancellationToken,
    ) -> impl Future<Output = Option<Self::Ticket>> + Send;
}

async fn acquire(
    permits: &Arc<Semaphore>,
    token: &CancellationToken,
) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        biased;
        () = token.cancelled() => None,
        permit = Arc::clone(permits).acquire_owned() => permit.ok(),
    }
}

/// Builds a pool of `limit` tickets. Tokio caps a semaphore at
/// [`Semaphore::MAX_PERMITS`]; larger limits are clamped to it.
fn pool_of(limit: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(limit.min(Semaphore::MAX_PERMITS)))
}

/// A single pool of `limit` tickets shared by every job.
pub(crate) struct Global {
    permits: Arc<Semaphore>,
}

impl Global {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            permits: pool_of(limit),
        }
    }
}

impl<J> Admission<J> for Global {
    type Ticket = OwnedSemaphorePermit;

    fn admit(
        &self,
        _job: &J,
        token: &CancellationToken,
    ) -> impl Future<Output = Option<OwnedSemaphorePermit>> + Send {
        acquire(&self.permits, token)
    }
}

/// A global ticket paired with a ticket from the job's key pool.
///
/// Fields drop in declaration order: the key ticket is returned before the
/// global one.
pub(crate) struct KeyedTicket {
    _key: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Global pool plus one lazily created pool of `per_key_limit` tickets per
/// distinct key.
///
/// Jobs take the global ticket first and then their key ticket. A job whose
/// key pool is saturated therefore holds a global ticket while it waits, and
/// jobs behind it wait too, whatever their key.
pub(crate) struct Keyed<K, KF> {
    global: Arc<Semaphore>,
    per_key_limit: usize,
    pools: Mutex<HashMap<K, Arc<Semaphore>>>,
    key_fn: KF,
}

impl<K, KF> Keyed<K, KF>
where
    K: Eq + Hash,
{
    pub(crate) fn new(limit: usize, per_key_limit: usize, key_fn: KF) -> Self {
        Self {
            global: pool_of(limit),
            per_key_limit,
            pools: Mutex::new(HashMap::new()),
            key_fn,
        }
    }

    fn pool(&self, key: K) -> Arc<Semaphore> {
        let mut pools = self.pools.lock();
        let pool = pools
            .entry(key)
            .or_insert_with(|| pool_of(self.per_key_limit));
        Arc::clone(pool)
    }

    #[cfg(test)]
    pub(crate) fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }
}

impl<J, K, KF> Admission<J> for Keyed<K, KF>
where
    K: Eq + Hash + Send,
    KF: Fn(&J) -> K + Send + Sync,
{
    type Ticket = KeyedTicket;

    fn admit(
        &self,
        job: &J,
        token: &CancellationToken,
    ) -> impl Future<Output = Option<KeyedTicket>> + Send {
        let pool = self.pool((self.key_fn)(job));
        async move {
            let global = acquire(&self.global, token).await?;
            // On cancellation `global` is dropped here, returning its ticket.
            let key = acquire(&pool, token).await?;
            Some(KeyedTicket {
                _key: key,
                _global: global,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn global_blocks_at_the_limit() {
        let admission = Global::new(2);
        let token = CancellationToken::new();

        let first = Admission::<()>::admit(&admission, &(), &token).await;
        let second = Admission::<()>::admit(&admission, &(), &token).await;
        assert!(first.is_some() && second.is_some());
        assert_eq!(admission.permits.available_permits(), 0);

        drop(first);
        assert_eq!(admission.permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn unbounded_limits_are_clamped() {
        let global = Global::new(usize::MAX);
        assert_eq!(global.permits.available_permits(), Semaphore::MAX_PERMITS);

        let keyed = Keyed::new(usize::MAX, usize::MAX, |job: &char| *job);
        let token = CancellationToken::new();
        let ticket = keyed.admit(&'a', &token).await;
        assert!(ticket.is_some());
        assert_eq!(keyed.global.available_permits(), Semaphore::MAX_PERMITS - 1);
        assert_eq!(keyed.pool('a').available_permits(), Semaphore::MAX_PERMITS - 1);
    }

    #[tokio::test]
    async fn cancellation_unblocks_a_waiting_admit() {
        let admission = Global::new(1);
        let token = CancellationToken::new();
        let _held = Admission::<()>::admit(&admission, &(), &token).await;

        token.cancel();
        assert!(Admission::<()>::admit(&admission, &(), &token).await.is_none());
    }

    #[tokio::test]
    async fn keyed_pools_are_created_per_key() {
        let admission = Keyed::new(8, 1, |job: &(char, u32)| job.0);
        let token = CancellationToken::new();

        let a1 = admission.admit(&('a', 1), &token).await;
        let b1 = admission.admit(&('b', 1), &token).await;
        assert!(a1.is_some() && b1.is_some());
        assert_eq!(admission.pool_count(), 2);
        assert_eq!(admission.global.available_permits(), 6);
    }

    #[tokio::test]
    async fn keyed_cancel_while_waiting_on_key_returns_global_ticket() {
        let admission = Keyed::new(4, 1, |job: &char| *job);
        let token = CancellationToken::new();
        let _held = admission.admit(&'a', &token).await;
        assert_eq!(admission.global.available_permits(), 3);

        let waiting = admission.admit(&'a', &token);
        let canceller = token.clone();
        let (ticket, ()) = tokio::join!(waiting, async move {
            tokio::task::yield_now().await;
            canceller.cancel();
        });

        assert!(ticket.is_none());
        assert_eq!(admission.global.available_permits(), 3);
    }

    #[tokio::test]
    async fn keyed_ticket_releases_both_pools() {
        let admission = Keyed::new(2, 1, |job: &char| *job);
        let token = CancellationToken::new();

        let ticket = admission.admit(&'a', &token).await;
        assert_eq!(admission.global.available_permits(), 1);
        assert_eq!(admission.pool('a').available_permits(), 0);

        drop(ticket);
        assert_eq!(admission.global.available_permits(), 2);
        assert_eq!(admission.pool('a').available_permits(), 1);
    }
}
