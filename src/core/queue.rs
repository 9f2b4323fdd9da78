//! # Queues / 队列
//!
//! The hand-off points of the scheduling pipeline. All waiting happens inside
//! `put`/`get`/`admit`, so no activity ever polls.
//!
//! 调度流水线的交接点。所有等待都发生在 `put`/`get`/`admit` 内部，任何活动都不会轮询。
//!
//! - [`BoundedQueue`] backs `pending` and `done`: a bounded multi-producer,
//!   multi-consumer FIFO built on a `tokio::sync::mpsc` channel.
//! - [`RunningGate`] backs `running`: a semaphore that caps how many items may
//!   be admitted at once, plus a registry of the admitted items so they can be
//!   counted and signalled.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};

/// A bounded FIFO queue with suspending `put` and `get`.
///
/// Closing the queue drops its sender: `get` keeps returning queued items and
/// then `None`, and `put` fails.
///
/// 带有可挂起 `put` 与 `get` 的有界先进先出队列。关闭后，`get` 会先返回剩余元素，
/// 然后返回 `None`；`put` 会失败。
#[derive(Debug)]
pub struct BoundedQueue<T> {
    name: &'static str,
    capacity: usize,
    len: AtomicUsize,
    tx: Mutex<Option<mpsc::Sender<T>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<T>>,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items. A capacity of zero is
    /// accepted for empty regressions; such a queue still has one slot.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            name,
            capacity,
            len: AtomicUsize::new(0),
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sender(&self) -> MutexGuard<'_, Option<mpsc::Sender<T>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    /// Appends an item, suspending while the queue is full.
    /// Gives the item back if the queue is closed.
    pub async fn put(&self, item: T) -> Result<(), T> {
        let Some(tx) = self.sender().clone() else {
            return Err(item);
        };
        // Reserving first keeps a cancelled `put` from leaving `len` counted.
        let Ok(permit) = tx.reserve().await else {
            return Err(item);
        };
        // Count before sending so a concurrent `get` never drives `len` below zero.
        self.len.fetch_add(1, Ordering::AcqRel);
        permit.send(item);
        Ok(())
    }

    /// Appends an item without waiting.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        let Some(tx) = self.sender().clone() else {
            return Err(item);
        };
        self.len.fetch_add(1, Ordering::AcqRel);
        tx.try_send(item).map_err(|error| {
            self.len.fetch_sub(1, Ordering::AcqRel);
            match error {
                mpsc::error::TrySendError::Full(item) | mpsc::error::TrySendError::Closed(item) => {
                    item
                }
            }
        })
    }

    /// Takes the oldest item, suspending while the queue is empty.
    /// Returns `None` once the queue is closed and drained.
    pub async fn get(&self) -> Option<T> {
        let item = self.rx.lock().await.recv().await;
        if item.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        item
    }

    /// Stops accepting items. Items already queued stay available to `get`.
    pub fn close(&self) {
        self.sender().take();
    }
}

/// Admission control for the running stage.
///
/// `admit` suspends while `limit` items are admitted; the returned
/// [`RunningSlot`] keeps the item registered until it is passed back to
/// [`release`](RunningGate::release) (or dropped).
///
/// 运行阶段的准入控制。当已准入 `limit` 个元素时 `admit` 会挂起；
/// 返回的 [`RunningSlot`] 在交还给 `release`（或被丢弃）之前一直保持登记。
#[derive(Debug)]
pub struct RunningGate<T> {
    limit: usize,
    permits: Arc<Semaphore>,
    active: Arc<Mutex<BTreeMap<u64, T>>>,
    peak: AtomicUsize,
}

/// Proof of admission into the running stage.
#[derive(Debug)]
pub struct RunningSlot<T> {
    key: u64,
    active: Arc<Mutex<BTreeMap<u64, T>>>,
    _permit: OwnedSemaphorePermit,
}

impl<T> RunningSlot<T> {
    pub fn key(&self) -> u64 {
        self.key
    }
}

impl<T> Drop for RunningSlot<T> {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl<T: Clone> RunningGate<T> {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            permits: Arc::new(Semaphore::new(limit)),
            active: Arc::new(Mutex::new(BTreeMap::new())),
            peak: AtomicUsize::new(0),
        }
    }

    fn active(&self) -> MutexGuard<'_, BTreeMap<u64, T>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of items currently admitted.
    pub fn len(&self) -> usize {
        self.active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest number of items ever admitted at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Admits `item` under `key`, suspending while the gate is full.
    /// Returns `None` if the gate was closed.
    pub async fn admit(&self, key: u64, item: T) -> Option<RunningSlot<T>> {
        let permit = Arc::clone(&self.permits).acquire_owned().await.ok()?;
        let occupancy = {
            let mut active = self.active();
            active.insert(key, item);
            active.len()
        };
        self.peak.fetch_max(occupancy, Ordering::AcqRel);
        Some(RunningSlot {
            key,
            active: Arc::clone(&self.active),
            _permit: permit,
        })
    }

    /// Unregisters the item and frees its slot for the next admission.
    pub fn release(&self, slot: RunningSlot<T>) {
        drop(slot);
    }

    /// A copy of the currently admitted items, in key order.
    pub fn snapshot(&self) -> Vec<T> {
        self.active().values().cloned().collect()
    }

    /// Wakes every pending `admit` with `None` and refuses new admissions.
    pub fn close(&self) {
        self.permits.close();
    }
}
