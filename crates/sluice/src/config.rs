//! Dispatch limits and their validation.
//!
//! Every dispatch entry point funnels its numeric arguments through
//! [`DispatchConfig::validate`] so a zero limit is reported as
//! [`Error::InvalidConfig`] before the source is touched.

use crate::error::{DispatchResult, Error};

/// Default number of tasks allowed in flight at once.
pub const DEFAULT_LIMIT: usize = 8;

/// Default number of tasks allowed in flight for a single key.
pub const DEFAULT_PER_KEY_LIMIT: usize = 1;

/// Default number of items grouped into one batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Concurrency and batching limits for a dispatch call.
///
/// Fields that an entry point does not use are ignored during validation, so
/// a plain [`run`](crate::SequenceDispatchTokioExt::run) never rejects a zero
/// `batch_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DispatchConfig {
    /// Maximum number of tasks (or batches) running concurrently.
    pub limit: usize,
    /// Maximum number of tasks running concurrently for one key.
    pub per_key_limit: usize,
    /// Number of items per batch.
    pub batch_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            per_key_limit: DEFAULT_PER_KEY_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl DispatchConfig {
    /// Config for a global-limit dispatch.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Config for a per-key dispatch.
    pub fn with_key_limits(limit: usize, per_key_limit: usize) -> Self {
        Self {
            limit,
            per_key_limit,
            ..Self::default()
        }
    }

    /// Config for a batch dispatch.
    pub fn with_batches(batch_size: usize, limit: usize) -> Self {
        Self {
            limit,
            batch_size,
            ..Self::default()
        }
    }

    /// Checks that `limit` is at least 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the offending field.
    pub fn validate<E>(&self) -> DispatchResult<(), E> {
        at_least_one("limit", self.limit)
    }

    /// Checks `limit` and `per_key_limit`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate_keyed<E>(&self) -> DispatchResult<(), E> {
        at_least_one("limit", self.limit)?;
        at_least_one("per_key_limit", self.per_key_limit)
    }

    /// Checks `batch_size` and `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate_batched<E>(&self) -> DispatchResult<(), E> {
        at_least_one("batch_size", self.batch_size)?;
        at_least_one("limit", self.limit)
    }
}

fn at_least_one<E>(field: &'static str, value: usize) -> DispatchResult<(), E> {
    if value == 0 {
        return Err(Error::InvalidConfig { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DispatchConfig::default();
        assert!(config.validate::<()>().is_ok());
        assert!(config.validate_keyed::<()>().is_ok());
        assert!(config.validate_batched::<()>().is_ok());
    }

    #[test]
    fn rejects_zero_limits() {
        assert_eq!(
            DispatchConfig::with_limit(0).validate::<()>(),
            Err(Error::InvalidConfig {
                field: "limit",
                value: 0
            })
        );
        assert_eq!(
            DispatchConfig::with_key_limits(4, 0).validate_keyed::<()>(),
            Err(Error::InvalidConfig {
                field: "per_key_limit",
                value: 0
            })
        );
        assert_eq!(
            DispatchConfig::with_batches(0, 4).validate_batched::<()>(),
            Err(Error::InvalidConfig {
                field: "batch_size",
                value: 0
            })
        );
    }

    #[test]
    fn unused_fields_are_not_checked() {
        let config = DispatchConfig {
            limit: 2,
            per_key_limit: 0,
            batch_size: 0,
        };
        assert!(config.validate::<()>().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_partial_config() {
        let config: DispatchConfig = serde_json::from_str(r#"{"limit": 16}"#).unwrap();
        assert_eq!(config.limit, 16);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }
}
