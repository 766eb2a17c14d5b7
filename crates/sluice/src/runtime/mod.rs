mod spawn_provider;
#[cfg(feature = "async-smol")]
mod smol_dispatch;
#[cfg(feature = "async-smol")]
mod smol_spawn;
#[cfg(feature = "async-tokio")]
mod tokio_dispatch;
#[cfg(feature = "async-tokio")]
mod tokio_spawn;

#[cfg_attr(docsrs, doc(cfg(feature = "async-smol")))]
#[cfg(feature = "async-smol")]
pub use smol_dispatch::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-smol")))]
#[cfg(feature = "async-smol")]
pub use smol_spawn::*;
pub use spawn_provider::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use tokio_dispatch::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use tokio_spawn::*;
