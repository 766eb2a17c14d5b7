use core::{future::Future, hash::Hash};

use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::{
    dispatch::{SequenceDispatchExt, StreamDispatchExt},
    error::DispatchResult,
    runtime::TokioSpawn,
    sequence::Sequence,
};

/// Extension trait for dispatching a [`Sequence`] on the
/// [`tokio`](https://docs.rs/tokio) async runtime.
///
/// This trait provides convenience methods that use [`TokioSpawn`] as the
/// spawn provider, so you can call `.run(...)` without naming the provider.
/// See [`SequenceDispatchExt`] for the shared admission, cancellation, and
/// failure contract.
pub trait SequenceDispatchTokioExt<T> {
    /// Runs `task` once per item with at most `limit` running at once.
    ///
    /// # Errors
    ///
    /// See [`SequenceDispatchExt::dispatch`].
    fn run<F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;

    /// Runs `task` once per item and returns the values in sequence order.
    ///
    /// # Errors
    ///
    /// See [`SequenceDispatchExt::dispatch_ordered`].
    fn run_ordered<F, Fut, R, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<Vec<R>, E>> + Send
    where
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static;

    /// Runs `task` once per item under a global and a per-key limit.
    ///
    /// # Errors
    ///
    /// See [`SequenceDispatchExt::dispatch_by_key`].
    fn run_by_key<K, KF, F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        per_key_limit: usize,
        key_fn: KF,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        K: Eq + Hash + Send + 'static,
        KF: Fn(&T) -> K + Send + Sync + 'static,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;

    /// Runs `task` once per batch of `batch_size` items.
    ///
    /// # Errors
    ///
    /// See [`SequenceDispatchExt::dispatch_batches`].
    fn run_batches<F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        F: Fn(CancellationToken, Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;
}

impl<T: Send + 'static> SequenceDispatchTokioExt<T> for Sequence<T> {
    fn run<F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        SequenceDispatchExt::dispatch::<TokioSpawn, F, Fut, E>(self, scope, limit, task)
    }

    fn run_ordered<F, Fut, R, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<Vec<R>, E>> + Send
    where
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        SequenceDispatchExt::dispatch_ordered::<TokioSpawn, F, Fut, R, E>(
            self, scope, limit, task,
        )
    }

    fn run_by_key<K, KF, F, Fut, E>(
        self,
        scope: &CancellationToken,
        limit: usize,
        per_key_limit: usize,
        key_fn: KF,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        K: Eq + Hash + Send + 'static,
        KF: Fn(&T) -> K + Send + Sync + 'static,
        F: Fn(CancellationToken, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        SequenceDispatchExt::dispatch_by_key::<TokioSpawn, K, KF, F, Fut, E>(
            self,
            scope,
            limit,
            per_key_limit,
            key_fn,
            task,
        )
    }

    fn run_batches<F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        F: Fn(CancellationToken, Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        SequenceDispatchExt::dispatch_batches::<TokioSpawn, F, Fut, E>(
            self, scope, batch_size, limit, task,
        )
    }
}

/// Extension trait for dispatching an async stream in batches on the
/// [`tokio`](https://docs.rs/tokio) async runtime, using [`TokioSpawn`].
pub trait StreamDispatchTokioExt: Stream {
    /// Spawns a batch as soon as it fills, without waiting for the stream to
    /// end.
    ///
    /// # Errors
    ///
    /// See [`StreamDispatchExt::dispatch_batches_streaming`].
    fn run_batches_streaming<F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        F: Fn(CancellationToken, Vec<Self::Item>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static;
}

impl<St> StreamDispatchTokioExt for St
where
    St: Stream + Send + 'static,
    St::Item: Send + 'static,
{
    fn run_batches_streaming<F, Fut, E>(
        self,
        scope: &CancellationToken,
        batch_size: usize,
        limit: usize,
        task: F,
    ) -> impl Future<Output = DispatchResult<(), E>> + Send
    where
        F: Fn(CancellationToken, Vec<St::Item>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        StreamDispatchExt::dispatch_batches_streaming::<TokioSpawn, F, Fut, E>(
            self, scope, batch_size, limit, task,
        )
    }
}
