//! In-memory FIFO regeneration queue.
//!
//! # Responsibilities
//! - Drop messages whose deduplication id was seen inside the dedup window
//! - Throttle sends with a token bucket, reporting `RequestThrottled`
//! - Deliver accepted messages to the worker over a bounded channel
//!
//! # Design Decisions
//! - A duplicate is accepted and silently dropped, as FIFO queues do
//! - A full channel is reported as throttling, not as a failure

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::backend::{QueueError, QueueMessage, RegenerationQueue};
use crate::config::RegenerationConfig;

const THROTTLED_CODE: &str = "RequestThrottled";

/// Entries kept before expired deduplication ids are purged.
const DEDUP_PURGE_THRESHOLD: usize = 1024;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct MemoryQueue {
    dedup_window: Duration,
    seen: DashMap<String, Instant>,
    limiter: Mutex<TokenBucket>,
    tx: mpsc::Sender<QueueMessage>,
}

impl MemoryQueue {
    /// Create the queue and the receiving end for the worker.
    pub fn new(config: &RegenerationConfig) -> (Self, mpsc::Receiver<QueueMessage>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let queue = Self {
            dedup_window: Duration::from_secs(config.dedup_window_secs),
            seen: DashMap::new(),
            limiter: Mutex::new(TokenBucket::new(
                f64::from(config.burst),
                f64::from(config.send_rate_per_sec),
            )),
            tx,
        };
        (queue, rx)
    }

    /// Record `dedup_id`; false when it was already seen inside the window.
    fn first_sighting(&self, dedup_id: &str, now: Instant) -> bool {
        if self.seen.len() > DEDUP_PURGE_THRESHOLD {
            let window = self.dedup_window;
            self.seen.retain(|_, seen_at| now.duration_since(*seen_at) < window);
        }

        match self.seen.entry(dedup_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.dedup_window {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }
}

#[async_trait]
impl RegenerationQueue for MemoryQueue {
    async fn send(&self, message: QueueMessage) -> Result<(), QueueError> {
        let acquired = self
            .limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_acquire();
        if !acquired {
            return Err(QueueError::from_code(THROTTLED_CODE, "send rate exceeded"));
        }

        if !self.first_sighting(&message.deduplication_id, Instant::now()) {
            tracing::debug!(dedup_id = %message.deduplication_id, "Duplicate regeneration message dropped");
            return Ok(());
        }

        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(message)) => {
                // Let a later stale hit retry it
                self.seen.remove(&message.deduplication_id);
                Err(QueueError::from_code(THROTTLED_CODE, "queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(QueueError::Other("regeneration queue closed".to_string()))
            }
        }
    }
}
