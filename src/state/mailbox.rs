//! Per-session outbound mailbox.
//!
//! A bounded FIFO of formatted lines. The room enqueues during broadcast
//! fan-out; the session's dispatcher is the sole consumer. Enqueue is
//! non-blocking, so a stalled consumer can never hold up a broadcast.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::Notify;

/// Policy applied when an enqueue finds the mailbox full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Evict the recipient's oldest pending line to make room.
    DropOldest,
    /// Close the recipient's session rather than delay anyone else.
    Disconnect,
}

/// Outcome of a non-blocking enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Enqueued within capacity.
    Queued,
    /// Enqueued after evicting the oldest pending line.
    DroppedOldest,
    /// Mailbox is full and the policy forbids eviction.
    Full,
    /// Mailbox was closed; the line was discarded.
    Closed,
}

struct Queue {
    lines: VecDeque<Arc<str>>,
    closed: bool,
    dropped: u64,
}

struct Inner {
    queue: Mutex<Queue>,
    ready: Notify,
    close_notify: Notify,
    capacity: usize,
}

/// Bounded outbound queue for one session. Cheap to clone; clones share
/// the same queue.
#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<Inner>,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(Queue {
                    lines: VecDeque::new(),
                    closed: false,
                    dropped: 0,
                }),
                ready: Notify::new(),
                close_notify: Notify::new(),
                capacity,
            }),
        }
    }

    /// Attempt to enqueue a line. Never blocks and never awaits.
    pub fn push(&self, line: Arc<str>, policy: OverflowPolicy) -> PushOutcome {
        let mut outcome = PushOutcome::Queued;
        {
            let mut queue = self.inner.queue.lock();
            if queue.closed {
                return PushOutcome::Closed;
            }
            if queue.lines.len() >= self.inner.capacity {
                match policy {
                    OverflowPolicy::DropOldest => {
                        queue.lines.pop_front();
                        queue.dropped += 1;
                        outcome = PushOutcome::DroppedOldest;
                    }
                    OverflowPolicy::Disconnect => return PushOutcome::Full,
                }
            }
            queue.lines.push_back(line);
        }
        self.inner.ready.notify_one();
        outcome
    }

    /// Receive the next line, suspending while the mailbox is empty.
    ///
    /// Returns `None` once the mailbox is closed and fully drained.
    pub async fn recv(&self) -> Option<Arc<str>> {
        loop {
            let notified = self.inner.ready.notified();
            tokio::pin!(notified);
            // Arm before checking the queue so a push between the check and
            // the await is not lost.
            notified.as_mut().enable();
            {
                let mut queue = self.inner.queue.lock();
                if let Some(line) = queue.lines.pop_front() {
                    return Some(line);
                }
                if queue.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the mailbox. Pending lines remain receivable; further pushes
    /// are discarded. Idempotent.
    pub fn close(&self) {
        self.inner.queue.lock().closed = true;
        self.inner.ready.notify_one();
        self.inner.close_notify.notify_waiters();
    }

    /// Resolve once the mailbox is closed. Lets the dispatcher abandon a
    /// stalled transport write when the session is torn down from the
    /// room side.
    pub async fn closed(&self) {
        loop {
            let notified = self.inner.close_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.queue.lock().closed {
                return;
            }
            notified.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.queue.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines evicted so far under the drop-oldest policy.
    pub fn dropped(&self) -> u64 {
        self.inner.queue.lock().dropped
    }
}
