//! Urgency queue — array-backed binary max-heap over task score.
//!
//! Node `i` has children `2i + 1` and `2i + 2`; its parent is `(i - 1) / 2`.
//! The queue is pinned to one `now` for its whole life and recomputes scores
//! on every comparison. It is meant to be rebuilt, not kept around: once
//! wall-clock time moves on, build a new one.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::score::urgency_cmp;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct UrgencyQueue {
    heap: Vec<Task>,
    now: DateTime<Utc>,
}

impl UrgencyQueue {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            heap: Vec::new(),
            now,
        }
    }

    /// Build a queue from `tasks`, one enqueue at a time.
    pub fn from_tasks<I>(tasks: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = Task>,
    {
        let tasks = tasks.into_iter();
        let mut q = Self {
            heap: Vec::with_capacity(tasks.size_hint().0),
            now,
        };
        for t in tasks {
            q.enqueue(t);
        }
        q
    }

    /// The instant every score in this queue is computed against.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Most urgent task without removing it.
    pub fn peek(&self) -> Option<&Task> {
        self.heap.first()
    }

    pub fn enqueue(&mut self, task: Task) {
        self.heap.push(task);
        self.sift_up(self.heap.len() - 1);
    }

    /// Remove and return the most urgent task. `None` once empty, every time.
    pub fn dequeue(&mut self) -> Option<Task> {
        if self.heap.is_empty() {
            return None;
        }
        let root = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(root)
    }

    /// All tasks, most urgent first. The heap itself is left untouched.
    pub fn snapshot_ordered(&self) -> Vec<Task> {
        let mut out = self.heap.clone();
        out.sort_by(|a, b| urgency_cmp(b, a, self.now));
        out
    }

    /// Drain the queue in urgency order.
    pub fn into_sorted_vec(mut self) -> Vec<Task> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(t) = self.dequeue() {
            out.push(t);
        }
        out
    }

    fn outranks(&self, i: usize, j: usize) -> bool {
        urgency_cmp(&self.heap[i], &self.heap[j], self.now) == Ordering::Greater
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.outranks(i, parent) {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut largest = i;

            if left < len && self.outranks(left, largest) {
                largest = left;
            }
            if right < len && self.outranks(right, largest) {
                largest = right;
            }
            if largest == i {
                break;
            }
            self.heap.swap(i, largest);
            i = largest;
        }
    }

    #[cfg(test)]
    fn is_heap(&self) -> bool {
        (1..self.heap.len()).all(|i| !self.outranks(i, (i - 1) / 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::score;
    use crate::task::{Priority, TaskId, TaskStatus};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn task(id: u64, priority: Priority, due_in_minutes: i64) -> Task {
        Task {
            id: TaskId(id),
            title: format!("task {id}"),
            description: None,
            priority,
            due_date: now() + Duration::minutes(due_in_minutes),
            status: TaskStatus::Pending,
            created_at: now(),
            estimated_time: 30,
            dependencies: BTreeSet::new(),
        }
    }

    #[test]
    fn dequeue_on_empty_is_none_forever() {
        let mut q = UrgencyQueue::new(now());
        for _ in 0..3 {
            assert!(q.dequeue().is_none());
        }
        assert_eq!(q.len(), 0);

        q.enqueue(task(1, Priority::Low, 60));
        assert!(q.dequeue().is_some());
        assert!(q.dequeue().is_none());
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn dequeues_most_urgent_first() {
        let mut q = UrgencyQueue::new(now());
        q.enqueue(task(1, Priority::Low, 60));
        q.enqueue(task(2, Priority::High, 60 * 24 * 30));
        q.enqueue(task(3, Priority::Medium, 60 * 24 * 2));
        q.enqueue(task(4, Priority::High, 60 * 24 * 3));

        let order: Vec<u64> = std::iter::from_fn(|| q.dequeue()).map(|t| t.id.0).collect();
        assert_eq!(order, vec![4, 2, 3, 1]);
    }

    #[test]
    fn snapshot_does_not_consume() {
        let q = UrgencyQueue::from_tasks(
            vec![task(1, Priority::Low, 10), task(2, Priority::High, 10)],
            now(),
        );
        let snap = q.snapshot_ordered();
        assert_eq!(snap.iter().map(|t| t.id.0).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.peek().map(|t| t.id.0), Some(2));
    }

    #[test]
    fn ties_come_out_in_creation_order() {
        let q = UrgencyQueue::from_tasks(
            (1..=6).rev().map(|i| task(i, Priority::Medium, 600)),
            now(),
        );
        let ids: Vec<u64> = q.into_sorted_vec().into_iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    fn arb_task() -> impl Strategy<Value = (Priority, i64)> {
        (
            prop_oneof![Just(Priority::High), Just(Priority::Medium), Just(Priority::Low)],
            -50_000i64..500_000,
        )
    }

    proptest! {
        #[test]
        fn dequeue_yields_non_increasing_scores(
            specs in proptest::collection::vec(arb_task(), 0..64),
        ) {
            let mut q = UrgencyQueue::new(now());
            for (i, (p, due)) in specs.iter().enumerate() {
                q.enqueue(task(i as u64, *p, *due));
                prop_assert!(q.is_heap());
            }

            let mut last = f64::INFINITY;
            let mut seen = 0;
            while let Some(t) = q.dequeue() {
                let s = score(&t, now());
                prop_assert!(s <= last);
                last = s;
                seen += 1;
                prop_assert!(q.is_heap());
            }
            prop_assert_eq!(seen, specs.len());
            prop_assert!(q.dequeue().is_none());
        }

        #[test]
        fn snapshot_is_ordered_and_lossless(specs in proptest::collection::vec(arb_task(), 0..64)) {
            let tasks: Vec<Task> = specs
                .iter()
                .enumerate()
                .map(|(i, (p, due))| task(i as u64, *p, *due))
                .collect();
            let q = UrgencyQueue::from_tasks(tasks.clone(), now());
            let snap = q.snapshot_ordered();

            for pair in snap.windows(2) {
                prop_assert!(score(&pair[0], now()) >= score(&pair[1], now()));
            }

            let mut got: Vec<TaskId> = snap.iter().map(|t| t.id).collect();
            let mut want: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
            got.sort();
            want.sort();
            prop_assert_eq!(got, want);
            prop_assert_eq!(q.len(), tasks.len());
        }

        #[test]
        fn snapshot_matches_drain_order(specs in proptest::collection::vec(arb_task(), 0..64)) {
            let q = UrgencyQueue::from_tasks(
                specs.iter().enumerate().map(|(i, (p, due))| task(i as u64, *p, *due)),
                now(),
            );
            let snap: Vec<TaskId> = q.snapshot_ordered().into_iter().map(|t| t.id).collect();
            let drained: Vec<TaskId> = q.into_sorted_vec().into_iter().map(|t| t.id).collect();
            prop_assert_eq!(snap, drained);
        }
    }
}
