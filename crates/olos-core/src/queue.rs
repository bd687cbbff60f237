//! Priority message queues
//!
//! Two of these connect the protocol engine to the rest of the application:
//! the outbound queue carries wire commands to the controller, the inbound
//! queue carries events back to observers. Messages are delivered highest
//! priority first; messages of equal priority keep their insertion order.
//!
//! A queue is a cheap cloneable handle. Every clone addresses the same
//! underlying storage, so producers and consumers on different threads each
//! hold their own clone.

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Delivery priority of a queued message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Delivered after everything else
    Low,
    /// Regular commands and status traffic
    Mid,
    /// Realtime control and connectivity changes
    High,
}

/// What a queued message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Status request sent to the controller
    Status,
    /// Regular line-based command
    Normal,
    /// Single-byte realtime command (pause, resume, stop)
    RealTime,
    /// Command belonging to a tool change sequence
    ToolChange,
    /// Connectivity change of the serial link
    Connection,
    /// Parsed status report from the controller
    MachineStatus,
    /// Any other line received from the controller
    SerialCommand,
    /// Progress of a streaming job
    JobExecution,
}

/// A message waiting in a queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage<P> {
    /// Message kind
    pub kind: MessageKind,
    /// Delivery priority
    pub priority: Priority,
    /// Message content
    pub payload: P,
}

struct Entry<P> {
    priority: Priority,
    seq: u64,
    message: QueuedMessage<P>,
}

impl<P> PartialEq for Entry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<P> Eq for Entry<P> {}

impl<P> PartialOrd for Entry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Entry<P> {
    // Max-heap: higher priority wins, then the older sequence number.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState<P> {
    heap: BinaryHeap<Entry<P>>,
    next_seq: u64,
}

struct Shared<P> {
    state: Mutex<QueueState<P>>,
    available: Condvar,
}

/// Thread-safe priority queue with FIFO ordering inside a priority level
pub struct MessageQueue<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for MessageQueue<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P> Default for MessageQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for MessageQueue<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl<P> MessageQueue<P> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    heap: BinaryHeap::new(),
                    next_seq: 0,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Enqueue a message and wake one waiting consumer
    pub fn put(&self, kind: MessageKind, priority: Priority, payload: P) {
        let mut state = self.shared.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Entry {
            priority,
            seq,
            message: QueuedMessage {
                kind,
                priority,
                payload,
            },
        });
        drop(state);
        self.shared.available.notify_one();
    }

    /// Dequeue the next message, blocking until one is available
    pub fn get(&self) -> QueuedMessage<P> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(entry) = state.heap.pop() {
                return entry.message;
            }
            self.shared.available.wait(&mut state);
        }
    }

    /// Dequeue the next message if one is waiting
    pub fn try_get(&self) -> Option<QueuedMessage<P>> {
        self.shared.state.lock().heap.pop().map(|entry| entry.message)
    }

    /// Dequeue the next message, waiting at most `timeout`
    pub fn get_timeout(&self, timeout: Duration) -> Option<QueuedMessage<P>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if let Some(entry) = state.heap.pop() {
                return Some(entry.message);
            }
            if self
                .shared
                .available
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.heap.pop().map(|entry| entry.message);
            }
        }
    }

    /// Check whether the queue holds no messages
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().heap.is_empty()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.shared.state.lock().heap.len()
    }

    /// Remove every queued message, returning them in delivery order
    pub fn drain(&self) -> Vec<QueuedMessage<P>> {
        let mut state = self.shared.state.lock();
        let mut drained = Vec::with_capacity(state.heap.len());
        while let Some(entry) = state.heap.pop() {
            drained.push(entry.message);
        }
        drained
    }
}
