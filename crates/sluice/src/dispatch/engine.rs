use core::{future::Future, marker::PhantomData};
use std::sync::Arc;

use futures::{FutureExt, StreamExt, stream::FuturesUnordered};
use tokio_util::sync::CancellationToken;

use super::{admission::Admission, failure::FirstFailure, source::JobSource};
use crate::{
    error::{DispatchResult, Error},
    runtime::SpawnProvider,
};

/// The shared fail-fast driver, parameterized by the runtime it spawns on.
pub(crate) struct Engine<S>(PhantomData<S>);

impl<S: SpawnProvider> Engine<S> {
    /// Dispatches every job from `source` through `admission`, running `work`
    /// once per admitted job.
    ///
    /// Jobs are pulled and admitted strictly in source order by this loop
    /// alone; only `work` runs concurrently. The loop stops when the source is
    /// exhausted, admission is refused, or the dispatch token is cancelled,
    /// then waits for every spawned worker.
    ///
    /// Returns the first recorded task failure, else [`Error::Cancelled`] if
    /// the caller's `scope` was cancelled, else `Ok(())`.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables, unused_assignments))]
    pub(crate) async fn drive<J, Src, Adm, W, Fut, E>(
        scope: &CancellationToken,
        mut source: Src,
        admission: Adm,
        work: Arc<W>,
    ) -> DispatchResult<(), E>
    where
        J: Send + 'static,
        Src: JobSource<J>,
        Adm: Admission<J>,
        W: Fn(CancellationToken, J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        let token = scope.child_token();
        let failure = Arc::new(FirstFailure::new());
        let mut in_flight = FuturesUnordered::new();
        let mut dispatched = 0_usize;

        while !token.is_cancelled() {
            let Some(job) = source.next_job(&token).await else {
                break;
            };
            let Some(ticket) = admission.admit(&job, &token).await else {
                break;
            };

            // Reap finished workers so an open-ended source doesn't pile up
            // handles.
            while let Some(Some(())) = in_flight.next().now_or_never() {}

            in_flight.push(S::spawn(run_worker(
                token.clone(),
                Arc::clone(&failure),
                Arc::clone(&work),
                job,
                ticket,
            )));
            dispatched += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            dispatched,
            cancelled = token.is_cancelled(),
            "Dispatch loop finished, draining workers"
        );

        while in_flight.next().await.is_some() {}

        if let Some(err) = failure.take() {
            return Err(Error::Task(err));
        }
        if token.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Dispatch cancelled by caller after {dispatched} jobs");
            return Err(Error::Cancelled);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Dispatch completed {dispatched} jobs");
        Ok(())
    }
}

async fn run_worker<J, T, W, Fut, E>(
    token: CancellationToken,
    failure: Arc<FirstFailure<E>>,
    work: Arc<W>,
    job: J,
    ticket: T,
) where
    W: Fn(CancellationToken, J) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let _ticket = ticket;

    // Admitted but not yet started: skip if someone already failed.
    if token.is_cancelled() {
        return;
    }

    if let Err(err) = work(token.clone(), job).await {
        if failure.record(err) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Task failed, cancelling remaining dispatch");
            token.cancel();
        }
    }
}
