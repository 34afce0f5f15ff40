//! Deduplicating work queues with drain detection
//!
//! [`WorkQueue`] is shared by the page [`Frontier`] and the [`ResourceQueue`].
//! A key enters the queue's seen set exactly once, at enqueue time, under the
//! same lock that pushes the task, so no two workers can ever receive the same
//! URL. An outstanding-work counter covers both queued and in-flight tasks;
//! when it reaches zero on a sealed queue, every waiting worker is released.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// A page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
}

/// A static resource to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTask {
    pub url: Url,
    pub local_path: PathBuf,
}

/// Result of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    AlreadySeen,
    TooDeep,
    LimitReached,
    Closed,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    seen: HashSet<String>,
    accepted: usize,
    outstanding: usize,
    /// No more work can appear once outstanding reaches zero
    sealed: bool,
    /// Hard stop: enqueue rejected, dequeue returns None
    closed: bool,
}

/// Blocking, deduplicating queue with an outstanding-work counter
#[derive(Debug)]
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    limit: Option<usize>,
}

impl<T> WorkQueue<T> {
    /// Creates a queue accepting at most `limit` tasks over its lifetime
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                seen: HashSet::new(),
                accepted: 0,
                outstanding: 0,
                sealed: false,
                closed: false,
            }),
            notify: Notify::new(),
            limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks keys as already handled without scheduling them
    ///
    /// Used to seed a resumed crawl; seeded keys do not count against the limit.
    pub fn seed_seen<I>(&self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.lock().seen.extend(keys);
    }

    /// Pushes `item` unless `key` was seen, the limit is reached, or the queue is closed
    pub fn push(&self, key: &str, item: T) -> Admission {
        let mut inner = self.lock();
        if inner.closed {
            return Admission::Closed;
        }
        if inner.seen.contains(key) {
            return Admission::AlreadySeen;
        }
        if self.limit.is_some_and(|limit| inner.accepted >= limit) {
            return Admission::LimitReached;
        }

        inner.seen.insert(key.to_string());
        inner.accepted += 1;
        inner.outstanding += 1;
        inner.items.push_back(item);
        drop(inner);

        self.notify.notify_waiters();
        Admission::Accepted
    }

    /// Waits for the next task
    ///
    /// Returns `None` once the queue is closed, or once it is sealed and all
    /// outstanding work has been marked done.
    pub async fn dequeue(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(item) = inner.items.pop_front() {
                    return Some(item);
                }
                if inner.sealed && inner.outstanding == 0 {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Records that one dequeued task is finished
    pub fn mark_done(&self) {
        let mut inner = self.lock();
        inner.outstanding = inner.outstanding.saturating_sub(1);
        let drained = inner.outstanding == 0;
        drop(inner);

        if drained {
            self.notify.notify_waiters();
        }
    }

    /// Returns a guard that calls [`WorkQueue::mark_done`] when dropped
    pub fn done_guard(&self) -> DoneGuard<'_, T> {
        DoneGuard { queue: self }
    }

    /// Declares that no producer outside the queue's own workers remains
    pub fn seal(&self) {
        self.lock().sealed = true;
        self.notify.notify_waiters();
    }

    /// Stops the queue: pending tasks are dropped from the outstanding count
    /// and every waiter is released
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        let dropped = inner.items.len();
        inner.items.clear();
        inner.outstanding = inner.outstanding.saturating_sub(dropped);
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Waits until outstanding work reaches zero or the queue is closed
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let inner = self.lock();
                if inner.closed || inner.outstanding == 0 {
                    return;
                }
            }

            notified.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn is_seen(&self, key: &str) -> bool {
        self.lock().seen.contains(key)
    }

    /// Tasks accepted since creation
    pub fn accepted(&self) -> usize {
        self.lock().accepted
    }

    /// Queued plus in-flight tasks
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Tasks waiting for a worker
    pub fn pending(&self) -> usize {
        self.lock().items.len()
    }
}

/// Marks a task done exactly once, on every exit path
#[derive(Debug)]
pub struct DoneGuard<'a, T> {
    queue: &'a WorkQueue<T>,
}

impl<T> Drop for DoneGuard<'_, T> {
    fn drop(&mut self) {
        self.queue.mark_done();
    }
}

/// The page scheduler
///
/// Sealed from creation: the crawl workers are its only producers, so the
/// crawl is finished once every accepted page is done.
#[derive(Debug)]
pub struct Frontier {
    queue: WorkQueue<CrawlTask>,
    max_depth: u32,
}

impl Frontier {
    pub fn new(max_depth: u32, max_files: usize) -> Self {
        let queue = WorkQueue::new(Some(max_files));
        queue.seal();
        Self { queue, max_depth }
    }

    /// Schedules a normalized page URL at `depth`
    pub fn enqueue(&self, url: Url, depth: u32) -> Admission {
        if depth > self.max_depth {
            return Admission::TooDeep;
        }
        let key = url.as_str().to_string();
        self.queue.push(&key, CrawlTask { url, depth })
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

impl std::ops::Deref for Frontier {
    type Target = WorkQueue<CrawlTask>;

    fn deref(&self) -> &Self::Target {
        &self.queue
    }
}

/// The static resource scheduler
///
/// Unbounded and depth-free. Sealed by the coordinator once the crawl
/// workers, its only producers, have stopped.
#[derive(Debug)]
pub struct ResourceQueue {
    queue: WorkQueue<ResourceTask>,
}

impl Default for ResourceQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceQueue {
    pub fn new() -> Self {
        Self {
            queue: WorkQueue::new(None),
        }
    }

    pub fn enqueue(&self, url: Url, local_path: PathBuf) -> Admission {
        let key = url.as_str().to_string();
        self.queue.push(&key, ResourceTask { url, local_path })
    }
}

impl std::ops::Deref for ResourceQueue {
    type Target = WorkQueue<ResourceTask>;

    fn deref(&self) -> &Self::Target {
        &self.queue
    }
}
