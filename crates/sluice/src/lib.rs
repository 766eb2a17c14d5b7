#![cfg_attr(docsrs, feature(doc_cfg))]
//! Lazy, pull-based sequences and a bounded-concurrency dispatch engine.
//!
//! A [`Sequence`] describes a pipeline without running it. Each call to
//! [`Sequence::cursor`] opens an independent [`Cursor`] that pulls items
//! through every stage on demand. Sequences are handed to the dispatch engine
//! (see [`SequenceDispatchExt`] and the runtime convenience traits) which runs
//! one task per item, per key, or per batch under a concurrency limit, stops
//! on the first failure, and honours a caller-supplied
//! [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! ```
//! # #[cfg(feature = "async-tokio")]
//! # {
//! use sluice::{Sequence, SequenceDispatchTokioExt};
//! use tokio_util::sync::CancellationToken;
//!
//! # let rt = tokio::runtime::Builder::new_multi_thread().build().unwrap();
//! # rt.block_on(async {
//! let scope = CancellationToken::new();
//! let squares = Sequence::from_vec((1..=5).collect())
//!     .filter(|n: &u32| n % 2 == 1)
//!     .run_ordered(&scope, 2, |_scope, n| async move { Ok::<_, ()>(n * n) })
//!     .await
//!     .unwrap();
//! assert_eq!(squares, vec![1, 9, 25]);
//! # });
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod runtime;
mod sequence;

pub use crate::config::*;
pub use crate::dispatch::*;
pub use crate::error::*;
pub use crate::runtime::*;
pub use crate::sequence::*;
