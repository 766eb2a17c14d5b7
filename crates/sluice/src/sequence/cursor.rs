/// A pull handle over a sequence.
///
/// Each call to [`Cursor::pull`] yields the next item or `None` once the
/// sequence is exhausted. A cursor is driven by exactly one reader; it is
/// `Send` so that reader may live on another thread, but it is never shared.
///
/// Implementations are not required to keep returning `None` after the first
/// `None`. Cursors handed out by [`Sequence::cursor`](crate::Sequence::cursor)
/// are wrapped in [`Fused`], which does guarantee it.
pub trait Cursor: Send {
    type Item;

    fn pull(&mut self) -> Option<Self::Item>;
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn pull(&mut self) -> Option<Self::Item> {
        (**self).pull()
    }
}

/// A type-erased cursor.
pub type BoxCursor<T> = Box<dyn Cursor<Item = T>>;

/// A cursor that stays exhausted.
///
/// Once the upstream cursor returns `None` it is dropped, so no stage below it
/// is polled again. `Fused` also implements [`Iterator`] so a sequence can be
/// consumed with ordinary `for` loops and iterator adapters.
pub struct Fused<T> {
    inner: Option<BoxCursor<T>>,
}

impl<T> Fused<T> {
    pub(crate) fn new(inner: BoxCursor<T>) -> Self {
        Self { inner: Some(inner) }
    }

    /// Returns `true` once the cursor has reported exhaustion.
    pub const fn is_exhausted(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T> Cursor for Fused<T> {
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        let item = self.inner.as_mut()?.pull();
        if item.is_none() {
            self.inner = None;
        }
        item
    }
}

impl<T> Iterator for Fused<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pull()
    }
}

impl<T> core::iter::FusedIterator for Fused<T> {}

/// Adapts any `Send` iterator into a [`Cursor`].
pub struct IterCursor<I>(pub I);

impl<I> Cursor for IterCursor<I>
where
    I: Iterator + Send,
{
    type Item = I::Item;

    fn pull(&mut self) -> Option<I::Item> {
        self.0.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields `0..limit` and then, misbehaving, starts over.
    struct Resurrecting {
        next: u32,
        limit: u32,
    }

    impl Cursor for Resurrecting {
        type Item = u32;

        fn pull(&mut self) -> Option<u32> {
            if self.next == self.limit {
                self.next = 0;
                return None;
            }
            self.next += 1;
            Some(self.next - 1)
        }
    }

    #[test]
    fn fused_never_resurrects() {
        let mut cursor = Fused::new(Box::new(Resurrecting { next: 0, limit: 2 }));
        assert_eq!(cursor.pull(), Some(0));
        assert_eq!(cursor.pull(), Some(1));
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.pull(), None);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.pull(), None);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn iter_cursor_forwards_items() {
        let mut cursor = IterCursor([1, 2].into_iter());
        assert_eq!(cursor.pull(), Some(1));
        assert_eq!(cursor.pull(), Some(2));
        assert_eq!(cursor.pull(), None);
    }
}
