use crossbeam_channel::{self as channel, Receiver, Sender, TrySendError};

/// A bounded multi-producer multi-consumer FIFO ring buffer. Pushing into a
/// full queue hands the rejected item back, so callers could decide how to
/// apply backpressure.
pub struct BoundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue which holds at most `capacity` items. The capacity is
    /// clamped to at least one.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity.max(1));
        BoundedQueue { tx, rx }
    }

    /// Appends `item` to the back of the queue, or returns it if the queue is
    /// full.
    #[inline]
    pub fn push(&self, item: T) -> ::std::result::Result<(), T> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => Err(item),
        }
    }

    /// Takes the item at the front of the queue without blocking.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fifo() {
        let queue = BoundedQueue::new(3);
        assert_eq!(queue.capacity(), 3);
        assert!(queue.is_empty());

        for i in 0..3 {
            assert!(queue.push(i).is_ok());
        }

        assert_eq!(queue.push(3), Err(3));
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop(), Some(0));
        assert!(queue.push(3).is_ok());
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn zero_capacity() {
        let queue = BoundedQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.push(1).is_ok());
        assert_eq!(queue.push(2), Err(2));
    }
}
