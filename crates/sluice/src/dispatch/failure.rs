use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};

/// Single-assignment slot for the first task failure.
///
/// The compare-and-set on `claimed` decides the winner; only the winner ever
/// writes `slot`, so a later failure can never overwrite the first.
pub(crate) struct FirstFailure<E> {
    claimed: AtomicBool,
    slot: Mutex<Option<E>>,
}

impl<E> FirstFailure<E> {
    pub(crate) const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
            slot: Mutex::new(None),
        }
    }

    /// Records `err` if no failure has been recorded yet. Returns `true` for
    /// the caller that won.
    pub(crate) fn record(&self, err: E) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        *self.slot.lock() = Some(err);
        true
    }

    pub(crate) fn take(&self) -> Option<E> {
        self.slot.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread::scope};

    use super::*;

    #[test]
    fn first_record_wins() {
        let failure = FirstFailure::new();
        assert!(failure.record("first"));
        assert!(!failure.record("second"));
        assert_eq!(failure.take(), Some("first"));
        assert_eq!(failure.take(), None);
    }

    #[test]
    fn exactly_one_winner_under_contention() {
        const THREADS: usize = 16;

        let failure = Arc::new(FirstFailure::new());
        let winners: usize = scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let failure = Arc::clone(&failure);
                    s.spawn(move || usize::from(failure.record(i)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(winners, 1);
        assert!(failure.take().is_some_and(|i| i < THREADS));
    }
}
