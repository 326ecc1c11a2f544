//! Deterministic cooperative timer queue.
//!
//! Tasks are ordered by `(due, sequence)`: ties fire in scheduling order.
//! A cancelled task never fires again; its heap entry is discarded lazily
//! when it reaches the top. The queue never reads a clock: callers ask for
//! the next deadline and pop whatever is due at the time they supply.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::domain::TimestampMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

#[derive(Debug, Clone, Copy)]
struct Task<K> {
    kind: K,
    every_ms: Option<i64>,
    seq: u64,
}

/// A task that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired<K> {
    pub id: TaskId,
    pub kind: K,
    pub due: TimestampMs,
}

#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    heap: BinaryHeap<Reverse<(TimestampMs, u64, TaskId)>>,
    tasks: BTreeMap<TaskId, Task<K>>,
    next_seq: u64,
    next_id: u64,
}

impl<K: Copy> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            tasks: BTreeMap::new(),
            next_seq: 0,
            next_id: 0,
        }
    }

    /// Fire once at `due`.
    pub fn schedule_once(&mut self, due: TimestampMs, kind: K) -> TaskId {
        self.insert(due, kind, None)
    }

    /// Fire at `first_due` and then every `every_ms` until cancelled.
    pub fn schedule_repeating(&mut self, first_due: TimestampMs, every_ms: i64, kind: K) -> TaskId {
        self.insert(first_due, kind, Some(every_ms.max(1)))
    }

    /// Returns whether the task was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest due time among live tasks.
    pub fn next_deadline(&mut self) -> Option<TimestampMs> {
        self.discard_stale();
        self.heap.peek().map(|Reverse((due, _, _))| *due)
    }

    /// Pop the earliest task due at or before `now`. Repeating tasks are
    /// re-armed one interval after the time they were due.
    pub fn pop_due(&mut self, now: TimestampMs) -> Option<Fired<K>> {
        self.discard_stale();
        let Reverse((due, _, id)) = *self.heap.peek()?;
        if due > now {
            return None;
        }
        self.heap.pop();

        let task = self.tasks.get(&id).copied()?;
        match task.every_ms {
            Some(every) => {
                let seq = self.bump_seq();
                if let Some(live) = self.tasks.get_mut(&id) {
                    live.seq = seq;
                }
                self.heap.push(Reverse((due + every, seq, id)));
            }
            None => {
                self.tasks.remove(&id);
            }
        }
        Some(Fired {
            id,
            kind: task.kind,
            due,
        })
    }

    fn insert(&mut self, due: TimestampMs, kind: K, every_ms: Option<i64>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let seq = self.bump_seq();
        self.tasks.insert(id, Task { kind, every_ms, seq });
        self.heap.push(Reverse((due, seq, id)));
        id
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Drop heap entries whose task was cancelled or re-armed.
    fn discard_stale(&mut self) {
        while let Some(Reverse((_, seq, id))) = self.heap.peek() {
            match self.tasks.get(id) {
                Some(task) if task.seq == *seq => break,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}

impl<K: Copy> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
