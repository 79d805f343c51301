//! # Job Queue
//!
//! Lock-free multi-producer/multi-consumer queue of pending jobs plus a
//! counter of outstanding work. A job is outstanding from the moment it is
//! seeded until a worker reports it terminal, so the counter covers both
//! queued and in-flight jobs. `outstanding() == 0` means nothing can ever be
//! requeued again.

use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::Job;

#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: SegQueue<Job>,
    outstanding: AtomicUsize,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed new work
    pub fn enqueue(&self, job: Job) {
        // Count before publishing so a consumer never sees a job it can't account for
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.jobs.push(job);
    }

    /// Put an already-counted job back after a failed attempt
    pub fn requeue(&self, job: Job) {
        self.jobs.push(job);
    }

    /// Non-blocking take; `None` when the queue is momentarily empty
    pub fn try_dequeue(&self) -> Option<Job> {
        self.jobs.pop()
    }

    /// A dequeued job reached a terminal state
    pub fn complete(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Jobs queued or in flight
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn is_drained(&self) -> bool {
        self.outstanding() == 0
    }

    /// Jobs currently waiting in the queue
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl FromIterator<Job> for JobQueue {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        let queue = Self::new();
        for job in iter {
            queue.enqueue(job);
        }
        queue
    }
}
