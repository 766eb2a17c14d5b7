use core::{future::Future, hash::Hash};
use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{
    admission::{Global, Keyed},
    engine::Engine,
    source::{Materialized, StreamBatches},
};
use crate::{
    config::DispatchConfig,
    error::{DispatchResult, Error},
    runtime::SpawnProvider,
    sequence::Sequence,
};

/// Extension trait for dispatching the items of a [`Sequence`] as concurrent
/// tasks.
///
/// Each method is generic over a [`SpawnProvider`] `S` that decides which
/// runtime the tasks are spawned on. The runtime convenience traits (for
/// example `SequenceDispatchTokioExt`) fix `S` for you.
///
/// All methods share the same contract:
///
/// - The sequence is materialized up front and dispatched in sequence order.
/// - At most `limit` tasks run at once; dispatch waits for capacity.
/// - Every task receives a child of `scope`. It is cancelled when `scope` is
///   cancelled or when any task fails, and tasks may watch it to stop early.
/// - The first task failure is returned; any other failure is dropped. Tasks
///   admitted but not yet started when that happens are skipped; running
///   tasks are waited for.
/// - If `scope` is cancelled and no task failed, [`Error::Cancelled`] is
///   returned once every running task has finished.
/// - An empty sequence returns `Ok` without dispatching anything.
///
/// Materializing pulls the whole sequence on the calling thread. A sequence
/// built with [`Sequence::from_receiver`] or [`Sequence::from_stream`] blocks
/// a runtime worker while it waits; dispatch an async stream with
/// [`StreamDispatchExt`] instead.
///
/// # Errors
///
/// [`Error::InvalidConfig`] if a limit or batch size is zero,
/// [`Error::Task`] for the first task failure, [`Error::Cancelled`] if the
/// caller cancelled `scope`.
pub trait SequenceDispatchExt<T> {
    /// Runs `task` once per item with at most `limit` running at once.
    fn dispatch<S, F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;

    /// Like [`dispatch`](Self::dispatch), collecting each task's value at its
    /// item's position. The returned `Vec` is always in sequence order; on
    /// failure no values are returned.
    fn dispatch_ordered<S, F, Fut, R, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<Vec<R>, E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static;

    /// Runs `task` once per item with at most `limit` running in total and at
    /// most `per_key_limit` running for any one `key_fn(item)`.
    ///
    /// Each item takes a global ticket, then a ticket for its key. Items are
    /// admitted in order, so an item waiting on a saturated key also holds up
    /// the items behind it.
    fn dispatch_by_key<S, K, KF, F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        per_key_limit: usize,
        key_fn: KF,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        K: Eq + Hash + Send + 'static,
        KF: Fn(&T) -> K + Send + Sync + 'static,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;

    /// Groups items into batches of `batch_size` and runs `task` once per
    /// batch with at most `limit` batches running at once.
    fn dispatch_batches<S, F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;
}

impl<T: Send + 'static> SequenceDispatchExt<T> for Sequence<T> {
    fn dispatch<S, F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        run_global::<S, T, F, Fut, E>(self, scope, limit, task)
    }

    fn dispatch_ordered<S, F, Fut, R, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<Vec<R>, E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        run_ordered::<S, T, F, Fut, R, E>(self, scope, limit, task)
    }

    fn dispatch_by_key<S, K, KF, F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        per_key_limit: usize,
        key_fn: KF,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        K: Eq + Hash + Send + 'static,
        KF: Fn(&T) -> K + Send + Sync + 'static,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        run_keyed::<S, T, K, KF, F, Fut, E>(self, scope, limit, per_key_limit, key_fn, task)
    }

    fn dispatch_batches<S, F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        run_batched::<S, T, F, Fut, E>(self, scope, batch_size, limit, task)
    }
}

/// Extension trait for dispatching an open-ended async stream in batches.
///
/// Unlike [`SequenceDispatchExt::dispatch_batches`], nothing is materialized:
/// items are pulled one at a time and a batch is spawned the moment it holds
/// `batch_size` items, or when the stream ends with a partial batch pending.
/// A slow producer therefore never delays batches that are already full.
///
/// Admission, cancellation, and failure follow the [`SequenceDispatchExt`]
/// contract, except that a cancelled `scope` is reported even when the stream
/// turns out to be empty. Cancellation also interrupts a pending pull from the
/// stream; the partially filled batch is dropped.
pub trait StreamDispatchExt: Stream {
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if `batch_size` or `limit` is zero,
    /// [`Error::Task`] for the first task failure, [`Error::Cancelled`] if
    /// the caller cancelled `scope`.
    fn dispatch_batches_streaming<S, F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, Vec<Self::Item>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;
}

impl<St> StreamDispatchExt for St
where
    St: Stream + Send + 'static,
    St::Item: Send + 'static,
{
    fn dispatch_batches_streaming<S, F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        S: SpawnProvider,
        F: Fn(CancellationToken, Vec<St::Item>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        run_streaming::<S, St, F, Fut, E>(self, scope, batch_size, limit, task)
    }
}

#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip_all, fields(limit = limit))
)]
async fn run_global<S, T, F, Fut, E>(
    sequence: Sequence<T>,
    scope: &CancellationToken,
    limit: usize,
    task: F,
) -> DispatchResult<(), E>
where
    S: SpawnProvider,
    T: Send + 'static,
    F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    DispatchConfig::with_limit(limit).validate()?;

    let items = sequence.to_vec();
    if items.is_empty() {
        return Ok(());
    }

    Engine::<S>::drive(
        scope,
        Materialized::new(items),
        Global::new(limit),
        Arc::new(task),
    )
    .await
}

#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip_all, fields(limit = limit))
)]
async fn run_ordered<S, T, F, Fut, R, E>(
    sequence: Sequence<T>,
    scope: &CancellationToken,
    limit: usize,
    task: F,
) -> DispatchResult<Vec<R>, E>
where
    S: SpawnProvider,
    T: Send + 'static,
    F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    DispatchConfig::with_limit(limit).validate()?;

    let items = sequence.to_vec();
    if items.is_empty() {
        return Ok(Vec::new());
    }

    // One slot per item, written by index so completion order doesn't matter.
    let slots: Arc<Mutex<Vec<Option<R>>>> = Arc::new(Mutex::new(
        core::iter::repeat_with(|| None).take(items.len()).collect(),
    ));
    let writer = Arc::clone(&slots);
    let work = move |token: CancellationToken, (index, item): (usize, T)| {
        let pending = task(token, item);
        let slots = Arc::clone(&writer);
        async move {
            let value = pending.await?;
            slots.lock()[index] = Some(value);
            Ok::<(), E>(())
        }
    };

    Engine::<S>::drive(
        scope,
        Materialized::new(items.into_iter().enumerate().collect()),
        Global::new(limit),
        Arc::new(work),
    )
    .await?;

    let values = core::mem::take(&mut *slots.lock());
    // Every slot is filled when no task failed and nothing was cancelled.
    values.into_iter().collect::<Option<Vec<R>>>().ok_or(Error::Cancelled)
}

#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip_all,
        fields(limit = limit, per_key_limit = per_key_limit)
    )
)]
async fn run_keyed<S, T, K, KF, F, Fut, E>(
    sequence: Sequence<T>,
    scope: &CancellationToken,
    limit: usize,
    per_key_limit: usize,
    key_fn: KF,
    task: F,
) -> DispatchResult<(), E>
where
    S: SpawnProvider,
    T: Send + 'static,
    K: Eq + Hash + Send + 'static,
    KF: Fn(&T) -> K + Send + Sync + 'static,
    F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    DispatchConfig::with_key_limits(limit, per_key_limit).validate_keyed()?;

    let items = sequence.to_vec();
    if items.is_empty() {
        return Ok(());
    }

    Engine::<S>::drive(
        scope,
        Materialized::new(items),
        Keyed::new(limit, per_key_limit, key_fn),
        Arc::new(task),
    )
    .await
}

#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip_all,
        fields(batch_size = batch_size, limit = limit)
    )
)]
async fn run_batched<S, T, F, Fut, E>(
    sequence: Sequence<T>,
    scope: &CancellationToken,
    batch_size: usize,
    limit: usize,
    task: F,
) -> DispatchResult<(), E>
where
    S: SpawnProvider,
    T: Send + 'static,
    F: Fn(CancellationToken, Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    DispatchConfig::with_batches(batch_size, limit).validate_batched()?;

    let batches = sequence.chunk(batch_size).to_vec();
    if batches.is_empty() {
        return Ok(());
    }

    Engine::<S>::drive(
        scope,
        Materialized::new(batches),
        Global::new(limit),
        Arc::new(task),
    )
    .await
}

#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "debug",
        skip_all,
        fields(batch_size = batch_size, limit = limit)
    )
)]
async fn run_streaming<S, St, F, Fut, E>(
    stream: St,
    scope: &CancellationToken,
    batch_size: usize,
    limit: usize,
    task: F,
) -> DispatchResult<(), E>
where
    S: SpawnProvider,
    St: Stream + Send + 'static,
    St::Item: Send + 'static,
    F: Fn(CancellationToken, Vec<St::Item>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    DispatchConfig::with_batches(batch_size, limit).validate_batched()?;

    Engine::<S>::drive(
        scope,
        StreamBatches::new(stream, batch_size),
        Global::new(limit),
        Arc::new(task),
    )
    .await
}
