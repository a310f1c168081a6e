//! # Work Queue
//!
//! A FIFO queue with work-stealing pop semantics: each enqueued item is
//! delivered to exactly one concurrent popper. Built from a mutex-guarded
//! deque plus a `Notify`, the minimal shape of the "blocking list" the
//! broker contract calls for.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

#[derive(Default, Debug)]
pub struct WorkQueue {
    items: Mutex<VecDeque<String>>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: String) {
        self.items.lock().unwrap().push_back(item);
        self.notify.notify_one();
    }

    /// Blocks until an item is available, then pops and returns exactly one.
    pub async fn pop(&self) -> String {
        loop {
            if let Some(item) = self.items.lock().unwrap().pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
