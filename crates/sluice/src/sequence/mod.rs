//! Lazy, pull-based sequences.
//!
//! A [`Sequence`] is a recipe for opening cursors. Building one never pulls an
//! item; stages like [`Sequence::map`] or [`Sequence::chunk`] only wrap the
//! recipe. Items flow when a cursor is opened with [`Sequence::cursor`] and
//! pulled, one at a time, through every stage.
//!
//! Sequences over fixed collections can be traversed any number of times.
//! Sequences over a stream ([`Sequence::from_stream`]) are single-use: the
//! first cursor consumes the stream.

mod chunk;
mod cursor;
mod source;
mod stages;

use core::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;

pub use chunk::*;
pub use cursor::*;
pub use source::*;
pub use stages::*;

type Open<T> = Arc<dyn Fn() -> BoxCursor<T> + Send + Sync>;

/// A lazy, ordered, possibly infinite sequence of `T`.
///
/// Cloning a `Sequence` is cheap and shares the underlying recipe.
pub struct Sequence<T> {
    open: Open<T>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            open: Arc::clone(&self.open),
        }
    }
}

impl<T> core::fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sequence").finish_non_exhaustive()
    }
}

impl<T: 'static> Sequence<T> {
    /// Builds a sequence from a cursor factory. `open` runs once per
    /// [`Sequence::cursor`] call.
    pub fn from_fn<F, C>(open: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Cursor<Item = T> + 'static,
    {
        Self {
            open: Arc::new(move || Box::new(open()) as BoxCursor<T>),
        }
    }

    /// A sequence with no items.
    pub fn empty() -> Self {
        Self::from_fn(|| IterCursor(core::iter::empty()))
    }

    /// Opens a new, independent cursor.
    pub fn cursor(&self) -> Fused<T> {
        Fused::new((self.open)())
    }

    /// Alias for [`Sequence::cursor`], for use with iterator adapters.
    pub fn iter(&self) -> Fused<T> {
        self.cursor()
    }

    /// Pulls every item into a `Vec`.
    ///
    /// Never returns for an infinite sequence, and blocks on asynchronous
    /// sources until they close.
    pub fn to_vec(&self) -> Vec<T> {
        self.cursor().collect()
    }

    /// Number of items. Consumes a full traversal.
    pub fn count(&self) -> usize {
        self.cursor().count()
    }

    /// The first item, pulling nothing beyond it.
    pub fn first(&self) -> Option<T> {
        self.cursor().pull()
    }

    /// Returns `true` as soon as an item matches.
    pub fn any<P>(&self, predicate: P) -> bool
    where
        P: FnMut(T) -> bool,
    {
        self.cursor().any(predicate)
    }

    /// Returns `false` as soon as an item fails to match.
    pub fn all<P>(&self, predicate: P) -> bool
    where
        P: FnMut(T) -> bool,
    {
        self.cursor().all(predicate)
    }

    /// Sums `selector(item)` over every item.
    pub fn sum_by<N, F>(&self, selector: F) -> N
    where
        N: core::iter::Sum<N>,
        F: FnMut(T) -> N,
    {
        self.cursor().map(selector).sum()
    }

    pub fn map<R, F>(self, f: F) -> Sequence<R>
    where
        R: 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Sequence::from_fn(move || Map {
            upstream: (self.open)(),
            f: Arc::clone(&f),
        })
    }

    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Self::from_fn(move || Filter {
            upstream: (self.open)(),
            predicate: Arc::clone(&predicate),
        })
    }

    /// Calls `f` on each item as it is pulled.
    pub fn inspect<F>(self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::from_fn(move || Inspect {
            upstream: (self.open)(),
            f: Arc::clone(&f),
        })
    }

    pub fn take(self, n: usize) -> Self {
        Self::from_fn(move || Take {
            upstream: (self.open)(),
            remaining: n,
        })
    }

    pub fn skip(self, n: usize) -> Self {
        Self::from_fn(move || Skip {
            upstream: (self.open)(),
            pending: n,
        })
    }

    pub fn take_while<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Self::from_fn(move || TakeWhile {
            upstream: (self.open)(),
            predicate: Arc::clone(&predicate),
            done: false,
        })
    }

    pub fn skip_while<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Self::from_fn(move || SkipWhile {
            upstream: (self.open)(),
            predicate: Arc::clone(&predicate),
            skipping: true,
        })
    }

    /// Maps each item to an iterable and yields its items in order.
    pub fn flat_map<U, F>(self, f: F) -> Sequence<U::Item>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
        U: IntoIterator + 'static,
        U::IntoIter: Send + 'static,
        U::Item: 'static,
    {
        let f = Arc::new(f);
        Sequence::from_fn(move || FlatMap::<T, F, U> {
            upstream: (self.open)(),
            f: Arc::clone(&f),
            current: None,
            _produces: PhantomData,
        })
    }

    /// Groups items into batches of `size`; see [`Chunks`].
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn chunk(self, size: usize) -> Sequence<Vec<T>> {
        assert!(size > 0, "chunk size must be at least 1");
        Sequence::from_fn(move || Chunks::new((self.open)(), size))
    }
}

impl<T> Sequence<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A sequence over a fixed collection. Each cursor walks it from the
    /// start; items are cloned out.
    pub fn from_vec(items: Vec<T>) -> Self {
        let items: Arc<[T]> = items.into();
        Self::from_fn(move || SliceCursor::new(Arc::clone(&items)))
    }
}

impl<T> FromIterator<T> for Sequence<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// A sequence fed by a channel. Pulling blocks the calling thread until an
    /// item arrives; the sequence ends once every sender is dropped.
    pub fn from_receiver(rx: crossbeam_channel::Receiver<T>) -> Self {
        Self::from_fn(move || ReceiverCursor::new(rx.clone()))
    }

    /// A single-use sequence fed by an async stream. Pulling blocks the
    /// calling thread on the stream.
    ///
    /// Do not drive this from inside an async runtime worker; use
    /// [`StreamDispatchExt`](crate::StreamDispatchExt) to consume streams
    /// from async code.
    pub fn from_stream<St>(stream: St) -> Self
    where
        St: Stream<Item = T> + Unpin + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(stream)));
        Self::from_fn(move || StreamCursor::claim(&slot))
    }
}

impl<T: 'static> IntoIterator for &Sequence<T> {
    type Item = T;
    type IntoIter = Fused<T>;

    fn into_iter(self) -> Fused<T> {
        self.cursor()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn numbers(n: u32) -> Sequence<u32> {
        Sequence::from_vec((1..=n).collect())
    }

    #[test]
    fn nothing_is_pulled_until_a_cursor_is_driven() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let seq = numbers(5).inspect(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(pulled.load(Ordering::Relaxed), 0);

        let mut cursor = seq.cursor();
        assert_eq!(cursor.pull(), Some(1));
        assert_eq!(pulled.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cursors_iterate_independently() {
        let seq = numbers(4).skip(1).take(2);
        let mut a = seq.cursor();
        let mut b = seq.cursor();

        assert_eq!(a.pull(), Some(2));
        assert_eq!(a.pull(), Some(3));
        assert_eq!(b.pull(), Some(2));
        assert_eq!(a.pull(), None);
        assert_eq!(b.pull(), Some(3));
        assert_eq!(b.pull(), None);
    }

    #[test]
    fn composes_stages() {
        let out = numbers(10)
            .filter(|n| n % 2 == 0)
            .map(|n| n * 10)
            .skip(1)
            .take(3)
            .to_vec();
        assert_eq!(out, vec![40, 60, 80]);
    }

    #[test]
    fn map_changes_type() {
        let out = numbers(3).map(|n| format!("#{n}")).to_vec();
        assert_eq!(out, vec!["#1", "#2", "#3"]);
    }

    #[test]
    fn take_stops_pulling_at_the_limit() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let out = numbers(100)
            .inspect(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .take(3)
            .to_vec();
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(pulled.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn take_and_skip_edges() {
        assert!(numbers(3).take(0).to_vec().is_empty());
        assert!(numbers(3).skip(5).to_vec().is_empty());
        assert_eq!(numbers(3).skip(0).to_vec(), vec![1, 2, 3]);
        assert_eq!(numbers(3).take(10).to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn take_while_stops_for_good() {
        let seq = Sequence::from_vec(vec![1, 2, 5, 1, 2]).take_while(|n| *n < 3);
        assert_eq!(seq.to_vec(), vec![1, 2]);
    }

    #[test]
    fn skip_while_only_skips_the_prefix() {
        let seq = Sequence::from_vec(vec![1, 2, 5, 1, 2]).skip_while(|n| *n < 3);
        assert_eq!(seq.to_vec(), vec![5, 1, 2]);
    }

    #[test]
    fn flat_map_flattens_in_order() {
        let out = numbers(3).flat_map(|n| vec![n; n as usize]).to_vec();
        assert_eq!(out, vec![1, 2, 2, 3, 3, 3]);

        let skips_empty = numbers(3)
            .flat_map(|n| if n == 2 { vec![] } else { vec![n] })
            .to_vec();
        assert_eq!(skips_empty, vec![1, 3]);
    }

    #[test]
    fn terminals() {
        assert_eq!(numbers(7).count(), 7);
        assert_eq!(numbers(7).first(), Some(1));
        assert_eq!(Sequence::<u32>::empty().first(), None);
        assert!(numbers(7).any(|n| n == 7));
        assert!(!numbers(7).any(|n| n == 8));
        assert!(numbers(7).all(|n| n > 0));
        assert_eq!(numbers(4).sum_by(u64::from), 10);
        assert_eq!(Sequence::<u32>::empty().sum_by(|n| n), 0);
        assert!(Sequence::<u32>::empty().all(|_| false));
    }

    #[test]
    fn collects_from_iterators() {
        let seq: Sequence<char> = "abc".chars().collect();
        assert_eq!(seq.to_vec(), vec!['a', 'b', 'c']);

        let mut seen = Vec::new();
        for c in &seq {
            seen.push(c);
        }
        assert_eq!(seen, vec!['a', 'b', 'c']);
    }

    #[test]
    fn receiver_sequence_blocks_until_close() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let producer = std::thread::spawn(move || {
            for i in 1..=4 {
                tx.send(i).unwrap();
            }
        });

        let out = Sequence::from_receiver(rx).map(|n| n * 2).to_vec();
        producer.join().unwrap();
        assert_eq!(out, vec![2, 4, 6, 8]);
    }

    #[test]
    fn stream_sequence_is_single_use() {
        let seq = Sequence::from_stream(futures::stream::iter(vec![1, 2, 3]));
        assert_eq!(seq.to_vec(), vec![1, 2, 3]);
        assert!(seq.to_vec().is_empty());
    }
}
