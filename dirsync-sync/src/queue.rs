//! Ordered task queue.
//!
//! Each queue holds the pending tasks of one (object kind, action) pair,
//! ordered ascending by DN length so that forward iteration visits parents
//! before children and backward iteration visits children before parents.
//! The order is established at insertion time; draining needs no sort.

use dirsync_types::Dn;
use serde::{Serialize, Serializer};

/// Anything that can be queued: a task is identified by the DN it targets.
pub trait Task {
    /// The DN used as ordering key.
    fn dn(&self) -> &Dn;
}

/// Opaque reference to a pushed task, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Entry<T> {
    handle: TaskHandle,
    task: T,
}

/// A DN-length ordered collection of tasks.
#[derive(Debug, Clone)]
pub struct TaskQueue<T> {
    entries: Vec<Entry<T>>,
    next_handle: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 0,
        }
    }
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates tasks in forward order. Use `.rev()` for backward order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter().map(|e| &e.task)
    }

    /// Visits every task in forward order, stopping at the first error.
    pub fn try_for_each<E>(&self, mut f: impl FnMut(&T) -> Result<(), E>) -> Result<(), E> {
        for task in self.iter() {
            f(task)?;
        }
        Ok(())
    }

    /// Visits every task in backward order, stopping at the first error.
    pub fn try_for_each_rev<E>(&self, mut f: impl FnMut(&T) -> Result<(), E>) -> Result<(), E> {
        for task in self.iter().rev() {
            f(task)?;
        }
        Ok(())
    }

    /// Removes a task by handle. Returns `None` if it is not (or no longer) queued.
    pub fn remove(&mut self, handle: TaskHandle) -> Option<T> {
        let idx = self.entries.iter().position(|e| e.handle == handle)?;
        Some(self.entries.remove(idx).task)
    }

    /// Returns true if the handle refers to a queued task.
    pub fn contains(&self, handle: TaskHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }
}

impl<T: Task> TaskQueue<T> {
    /// Inserts a task before the first queued task whose DN is at least as
    /// long. A task pushed after an equal-length one therefore lands in
    /// front of it.
    pub fn push(&mut self, task: T) -> TaskHandle {
        let len = task.dn().len();
        let idx = self
            .entries
            .iter()
            .position(|e| e.task.dn().len() >= len)
            .unwrap_or(self.entries.len());

        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.insert(idx, Entry { handle, task });
        handle
    }

    /// DNs of all queued tasks in forward order.
    pub fn dns(&self) -> Vec<&Dn> {
        self.iter().map(Task::dn).collect()
    }
}

impl<T: Serialize> Serialize for TaskQueue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
