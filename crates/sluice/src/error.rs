//! Error types for the dispatch engine.
//!
//! A dispatch call surfaces at most one error:
//! - `Task`: the first task failure to win the capture race. Later or
//!   concurrent failures are discarded.
//! - `Cancelled`: the caller's cancellation scope fired and no task failed.
//! - `InvalidConfig`: a limit or batch size was zero. Reported before anything
//!   is pulled from the source.

/// Result of a dispatch call whose tasks fail with `E`.
pub type DispatchResult<T, E> = core::result::Result<T, Error<E>>;

/// Unified error type for the dispatch engine, generic over the task error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E> {
    /// A task returned an error. Only the first captured failure is kept.
    #[error("task failed: {0}")]
    Task(E),

    /// The caller's cancellation scope was cancelled before any task failed.
    #[error("dispatch cancelled")]
    Cancelled,

    /// A limit or batch size was zero.
    #[error("invalid {field}: {value} (must be at least 1)")]
    InvalidConfig { field: &'static str, value: usize },
}

impl<E> Error<E> {
    /// Returns the task error if this is a [`Error::Task`].
    pub fn into_task(self) -> Option<E> {
        match self {
            Self::Task(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the dispatch stopped because the caller cancelled.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Maps the task error, leaving the other variants untouched.
    pub fn map_task<F, E2>(self, f: F) -> Error<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Task(e) => Error::Task(f(e)),
            Self::Cancelled => Error::Cancelled,
            Self::InvalidConfig { field, value } => Error::InvalidConfig { field, value },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_each_variant() {
        let task: Error<&str> = Error::Task("boom");
        assert_eq!(task.to_string(), "task failed: boom");
        assert_eq!(Error::<&str>::Cancelled.to_string(), "dispatch cancelled");

        let config: Error<&str> = Error::InvalidConfig {
            field: "limit",
            value: 0,
        };
        assert_eq!(config.to_string(), "invalid limit: 0 (must be at least 1)");
    }

    #[test]
    fn map_task_only_touches_task_errors() {
        let mapped = Error::Task(3).map_task(|n| n * 2);
        assert_eq!(mapped, Error::Task(6));
        assert!(Error::<i32>::Cancelled.map_task(|n| n * 2).is_cancelled());
        assert_eq!(Error::Task("x").into_task(), Some("x"));
        assert_eq!(Error::<&str>::Cancelled.into_task(), None);
    }
}
