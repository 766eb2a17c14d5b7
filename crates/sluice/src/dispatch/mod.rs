//! Bounded-concurrency dispatch.
//!
//! Every entry point reduces to the same driver loop in `engine`: pull the
//! next job from a `JobSource`, obtain a ticket from an `Admission`, spawn a
//! worker that holds the ticket until it finishes. The first failing worker
//! cancels the shared token, which stops the loop and lets queued workers
//! bail out before running their task. The loop always waits for every
//! spawned worker before returning.

mod admission;
mod engine;
mod ext;
mod failure;
mod source;

pub use ext::*;
