use std::sync::Arc;

use futures::{Stream, executor::BlockingStream};
use parking_lot::Mutex;

use super::Cursor;

/// Walks a shared, fixed collection by index.
pub struct SliceCursor<T> {
    items: Arc<[T]>,
    index: usize,
}

impl<T> SliceCursor<T> {
    pub(crate) const fn new(items: Arc<[T]>) -> Self {
        Self { items, index: 0 }
    }
}

impl<T> Cursor for SliceCursor<T>
where
    T: Clone + Send + Sync,
{
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        let item = self.items.get(self.index)?.clone();
        self.index += 1;
        Some(item)
    }
}

/// Blocks on a crossbeam channel until an item arrives or every sender has
/// been dropped.
///
/// Cursors opened from the same sequence share the receiver, so items are
/// split between them rather than duplicated.
pub struct ReceiverCursor<T> {
    rx: crossbeam_channel::Receiver<T>,
}

impl<T> ReceiverCursor<T> {
    pub(crate) const fn new(rx: crossbeam_channel::Receiver<T>) -> Self {
        Self { rx }
    }
}

impl<T: Send> Cursor for ReceiverCursor<T> {
    type Item = T;

    fn pull(&mut self) -> Option<T> {
        self.rx.recv().ok()
    }
}

/// A stream that can be claimed by exactly one cursor.
pub(crate) type StreamSlot<St> = Arc<Mutex<Option<St>>>;

/// Blocks the calling thread on an async stream.
///
/// The first cursor opened takes the stream; any later cursor finds the slot
/// empty and is exhausted immediately.
pub struct StreamCursor<St>
where
    St: Stream + Unpin,
{
    inner: Option<BlockingStream<St>>,
}

impl<St> StreamCursor<St>
where
    St: Stream + Unpin,
{
    pub(crate) fn claim(slot: &StreamSlot<St>) -> Self {
        Self {
            inner: slot.lock().take().map(futures::executor::block_on_stream),
        }
    }
}

impl<St> Cursor for StreamCursor<St>
where
    St: Stream + Unpin + Send,
{
    type Item = St::Item;

    fn pull(&mut self) -> Option<St::Item> {
        self.inner.as_mut()?.next()
    }
}
