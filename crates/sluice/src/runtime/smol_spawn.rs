use core::future::Future;

use smol::Task;

use crate::runtime::SpawnProvider;

/// An implementation of [`SpawnProvider`] using Smol's global executor.
///
/// This is the default provider for use in async applications built on Smol.
/// A panic inside a worker propagates to whoever awaits its [`Task`].
pub struct SmolSpawn;
impl SpawnProvider for SmolSpawn {
    type Handle = Task<()>;

    fn spawn<F>(future: F) -> Task<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        smol::spawn(future)
    }
}
