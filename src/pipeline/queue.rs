//! Task queue seam with at-least-once delivery.
//!
//! `consume` hands out a delivery and keeps the task in flight until it is
//! acked; a delivery whose visibility timeout lapses without an ack
//! becomes consumable again. Consumers must therefore tolerate duplicate
//! delivery, which the worker does by checking profile state before work.

use crate::pipeline::Task;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: u64,
    pub task: Task,
}

pub trait TaskQueue: Send + Sync {
    fn publish(&self, task: Task);

    /// Next visible task, if any. Non-blocking.
    fn consume(&self) -> Option<Delivery>;

    /// Acknowledge a delivery, removing it permanently. Unknown ids are
    /// ignored (the delivery may already have been redelivered and acked).
    fn ack(&self, delivery_id: u64);

    /// Tasks not yet terminally acked: visible plus in flight.
    fn outstanding(&self) -> usize;
}

struct QueueInner {
    ready: VecDeque<Task>,
    in_flight: HashMap<u64, (Task, Instant)>,
}

/// In-memory reference queue. Redelivery is driven lazily: expired
/// in-flight entries move back to the ready list on the next `consume`.
pub struct MemoryQueue {
    inner: Mutex<QueueInner>,
    visibility_timeout: Duration,
    next_delivery: AtomicU64,
}

impl MemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                ready: VecDeque::new(),
                in_flight: HashMap::new(),
            }),
            visibility_timeout,
            next_delivery: AtomicU64::new(1),
        }
    }

    fn reap_expired(inner: &mut QueueInner) {
        let now = Instant::now();
        let expired: Vec<u64> = inner
            .in_flight
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(&id, _)| id)
            .collect();
        for id in expired {
            if let Some((task, _)) = inner.in_flight.remove(&id) {
                inner.ready.push_back(task);
            }
        }
    }
}

impl TaskQueue for MemoryQueue {
    fn publish(&self, task: Task) {
        self.inner.lock().ready.push_back(task);
    }

    fn consume(&self) -> Option<Delivery> {
        let mut inner = self.inner.lock();
        Self::reap_expired(&mut inner);

        let task = inner.ready.pop_front()?;
        let id = self.next_delivery.fetch_add(1, Ordering::Relaxed);
        inner
            .in_flight
            .insert(id, (task.clone(), Instant::now() + self.visibility_timeout));
        Some(Delivery { id, task })
    }

    fn ack(&self, delivery_id: u64) {
        self.inner.lock().in_flight.remove(&delivery_id);
    }

    fn outstanding(&self) -> usize {
        let inner = self.inner.lock();
        inner.ready.len() + inner.in_flight.len()
    }
}
