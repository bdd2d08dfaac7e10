//! Bounded multi-producer/multi-consumer conduit between pollers and workers.
//!
//! Pushing onto a full queue waits (backpressure); popping from an empty one
//! waits. Both waits can be abandoned through a `CancellationToken`. After
//! [`BoundedQueue::close`], pushes fail but buffered items remain poppable.

use async_channel::{Receiver, Sender, TryRecvError};
use metrics::gauge;
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug)]
pub struct BoundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

// Manual impl: cloning only clones channel handles, `T` need not be `Clone`.
impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> BoundedQueue<T> {
    /// A capacity of 0 is bumped to 1; callers validate config beforehand.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = async_channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Enqueue, waiting while full. Gives up as soon as `cancel` fires.
    pub async fn push(&self, item: T, cancel: &CancellationToken) -> Result<(), QueueError> {
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            sent = self.tx.send(item) => sent.map_err(|_| QueueError::Closed),
        };
        gauge!("tracker_queue_depth").set(self.len() as f64);
        res
    }

    /// Dequeue, waiting while empty. `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        let item = self.rx.recv().await.ok();
        gauge!("tracker_queue_depth").set(self.len() as f64);
        item
    }

    /// Non-blocking dequeue of an already-buffered item.
    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Take everything currently buffered.
    pub fn drain(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(item) = self.try_pop() {
            out.push(item);
        }
        out
    }

    /// Stop accepting items. Returns false if it was already closed.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
