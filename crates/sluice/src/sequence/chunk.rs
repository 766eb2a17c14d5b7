use super::{BoxCursor, Cursor};

/// Upper bound on the capacity reserved up front for one batch.
pub(crate) const MAX_BATCH_PREALLOC: usize = 1024;

/// Groups upstream items into batches of at most `size`.
///
/// Every batch holds between 1 and `size` items; only the last one may be
/// short. Once upstream is exhausted no further batch is produced, so an
/// empty upstream yields no batches at all.
pub struct Chunks<T> {
    upstream: BoxCursor<T>,
    size: usize,
    done: bool,
}

impl<T> Chunks<T> {
    pub(crate) fn new(upstream: BoxCursor<T>, size: usize) -> Self {
        debug_assert!(size > 0, "chunk size must be at least 1");
        Self {
            upstream,
            size,
            done: false,
        }
    }
}

impl<T> Cursor for Chunks<T> {
    type Item = Vec<T>;

    fn pull(&mut self) -> Option<Vec<T>> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.size.min(MAX_BATCH_PREALLOC));
        while batch.len() < self.size {
            match self.upstream.pull() {
                Some(item) => batch.push(item),
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() { None } else { Some(batch) }
    }
}

#[cfg(test)]
mod tests {
    use crate::Sequence;

    fn sizes(batches: &[Vec<u32>]) -> Vec<usize> {
        batches.iter().map(Vec::len).collect()
    }

    #[test]
    fn ten_items_in_threes() {
        let batches = Sequence::from_vec((1..=10).collect()).chunk(3).to_vec();
        assert_eq!(sizes(&batches), vec![3, 3, 3, 1]);
        assert_eq!(batches[0], vec![1, 2, 3]);
        assert_eq!(batches[3], vec![10]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_batch() {
        let batches = Sequence::from_vec((1..=6).collect()).chunk(3).to_vec();
        assert_eq!(sizes(&batches), vec![3, 3]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let batches = Sequence::<u32>::empty().chunk(3).to_vec();
        assert!(batches.is_empty());
    }

    #[test]
    fn size_larger_than_input() {
        let batches = Sequence::from_vec(vec![1, 2]).chunk(10).to_vec();
        assert_eq!(batches, vec![vec![1, 2]]);
    }

    #[test]
    fn size_one() {
        let batches = Sequence::from_vec(vec![1, 2, 3]).chunk(1).to_vec();
        assert_eq!(batches, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn chains_after_filter() {
        let batches = Sequence::from_vec((1..=10).collect())
            .filter(|n: &u32| n % 2 == 0)
            .chunk(2)
            .to_vec();
        assert_eq!(batches, vec![vec![2, 4], vec![6, 8], vec![10]]);
    }

    #[test]
    fn does_not_pull_past_exhaustion() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        drop(tx);

        let mut cursor = Sequence::from_receiver(rx).chunk(5).cursor();
        assert_eq!(cursor.next(), Some(vec![1, 2]));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn huge_size_yields_one_batch() {
        let batches = Sequence::from_vec(vec![1, 2, 3]).chunk(usize::MAX).to_vec();
        assert_eq!(batches, vec![vec![1, 2, 3]]);
    }

    #[test]
    #[should_panic(expected = "chunk size must be at least 1")]
    fn zero_size_panics() {
        let _ = Sequence::from_vec(vec![1]).chunk(0);
    }
}
