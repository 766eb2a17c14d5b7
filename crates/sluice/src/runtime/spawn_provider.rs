use core::future::Future;

/// A trait that abstracts over how a worker future is spawned onto an async
/// runtime.
///
/// This allows the dispatch engine to be generic over runtimes like `Tokio`
/// or `Smol`. Every task runs as its own spawned future so a slow source or a
/// blocked admission never stalls work that is already running.
pub trait SpawnProvider {
    /// Resolves once the spawned future has finished. We require `Send` so the
    /// dispatch future itself can move across threads.
    type Handle: Future<Output = ()> + Send + 'static;

    fn spawn<F>(future: F) -> Self::Handle
    where
        F: Future<Output = ()> + Send + 'static;
}
