use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, ready},
};

use tokio::task::JoinHandle;

use crate::runtime::SpawnProvider;

/// An implementation of [`SpawnProvider`] using [`tokio::spawn`].
///
/// This is the default provider for use in async applications built on Tokio.
///
/// # Panics
///
/// Spawning panics when called outside a Tokio runtime.
pub struct TokioSpawn;
impl SpawnProvider for TokioSpawn {
    type Handle = TokioHandle;

    fn spawn<F>(future: F) -> TokioHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        TokioHandle(tokio::spawn(future))
    }
}

/// Join handle for a worker spawned by [`TokioSpawn`].
///
/// A panic inside the worker is resumed on whoever awaits the handle. A worker
/// cancelled by runtime shutdown counts as finished.
pub struct TokioHandle(JoinHandle<()>);

impl Future for TokioHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match ready!(Pin::new(&mut self.0).poll(cx)) {
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Ok(()) | Err(_) => Poll::Ready(()),
        }
    }
}
