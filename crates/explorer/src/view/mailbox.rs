//! Single-slot coalescing mailbox.
//!
//! Producers never block: posting replaces whatever value the consumer has
//! not taken yet, so the consumer only ever sees the most recent one.
//! Superseded values are dropped and counted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posted {
    /// The slot was empty.
    Queued,
    /// An unconsumed value was replaced.
    Replaced,
    /// The mailbox is closed; the value was dropped.
    Closed,
}

pub struct Mailbox<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    notify: Notify,
}

struct Slot<T> {
    value: Option<T>,
    closed: bool,
    superseded: u64,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    value: None,
                    closed: false,
                    superseded: 0,
                }),
                notify: Notify::new(),
            }),
        }
    }

    pub fn post(&self, value: T) -> Posted {
        let posted = {
            let mut slot = self.lock();
            if slot.closed {
                return Posted::Closed;
            }
            match slot.value.replace(value) {
                Some(_) => {
                    slot.superseded += 1;
                    Posted::Replaced
                }
                None => Posted::Queued,
            }
        };
        self.shared.notify.notify_one();
        posted
    }

    /// Takes the pending value without waiting.
    pub fn take(&self) -> Option<T> {
        self.lock().value.take()
    }

    /// Waits for the latest value. Returns `None` once the mailbox is closed.
    ///
    /// Cancel safe: a value is only removed from the slot in the same poll
    /// that returns it.
    pub async fn recv(&self) -> Option<T> {
        loop {
            {
                let mut slot = self.lock();
                if let Some(value) = slot.value.take() {
                    return Some(value);
                }
                if slot.closed {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Closes the mailbox, dropping any pending value.
    pub fn close(&self) {
        {
            let mut slot = self.lock();
            slot.closed = true;
            slot.value = None;
        }
        self.shared.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of values replaced before the consumer took them.
    pub fn superseded(&self) -> u64 {
        self.lock().superseded
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
