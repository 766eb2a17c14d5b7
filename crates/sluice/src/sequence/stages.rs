//! Per-item stages.
//!
//! Each stage owns its upstream cursor and whatever counters it needs. The
//! stage closure is shared through an `Arc` so every cursor opened from the
//! same [`Sequence`](crate::Sequence) runs the same function without sharing
//! any iteration state.

use core::marker::PhantomData;
use std::sync::Arc;

use super::{BoxCursor, Cursor};

pub struct Map<T, F> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) f: Arc<F>,
}

impl<T, R, F> Cursor for Map<T, F>
where
    F: Fn(T) -> R + Send + Sync,
{
    type Item = R;

    fn pull(&mut self) -> Option<R> {
        self.upstream.pull().map(|item| (self.f)(item))
    }
}

pub struct Filter<T, P> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) predicate: Arc<P>,
}

impl<T, P> Cursor for Filter<T, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        loop {
            let item = self.upstream.pull()?;
            if (self.predicate)(&item) {
                return Some(item);
            }
        }
    }
}

pub struct Inspect<T, F> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) f: Arc<F>,
}

impl<T, F> Cursor for Inspect<T, F>
where
    F: Fn(&T) + Send + Sync,
{
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        let item = self.upstream.pull()?;
        (self.f)(&item);
        Some(item)
    }
}

pub struct Take<T> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) remaining: usize,
}

impl<T> Cursor for Take<T> {
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        // Never pull past the limit; upstream may be a blocking source.
        if self.remaining == 0 {
            return None;
        }
        let item = self.upstream.pull()?;
        self.remaining -= 1;
        Some(item)
    }
}

pub struct Skip<T> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) pending: usize,
}

impl<T> Cursor for Skip<T> {
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        while self.pending > 0 {
            self.upstream.pull()?;
            self.pending -= 1;
        }
        self.upstream.pull()
    }
}

pub struct TakeWhile<T, P> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) predicate: Arc<P>,
    pub(crate) done: bool,
}

impl<T, P> Cursor for TakeWhile<T, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        let item = self.upstream.pull()?;
        if (self.predicate)(&item) {
            Some(item)
        } else {
            self.done = true;
            None
        }
    }
}

pub struct SkipWhile<T, P> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) predicate: Arc<P>,
    pub(crate) skipping: bool,
}

impl<T, P> Cursor for SkipWhile<T, P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        loop {
            let item = self.upstream.pull()?;
            if !self.skipping {
                return Some(item);
            }
            if !(self.predicate)(&item) {
                self.skipping = false;
                return Some(item);
            }
        }
    }
}

pub struct FlatMap<T, F, U: IntoIterator> {
    pub(crate) upstream: BoxCursor<T>,
    pub(crate) f: Arc<F>,
    pub(crate) current: Option<U::IntoIter>,
    pub(crate) _produces: PhantomData<fn() -> U>,
}

impl<T, F, U> Cursor for FlatMap<T, F, U>
where
    F: Fn(T) -> U + Send + Sync,
    U: IntoIterator,
    U::IntoIter: Send,
{
    type Item = U::Item;

    fn pull(&mut self) -> Option<U::Item> {
        loop {
            if let Some(item) = self.current.as_mut().and_then(Iterator::next) {
                return Some(item);
            }
            let next = self.upstream.pull()?;
            self.current = Some((self.f)(next).into_iter());
        }
    }
}
