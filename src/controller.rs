//! Task queue and cooperative scheduler that drives the indexer from host
//! notifications; bootstrap/rebuild orchestration.

#![cfg(feature = "tantivy-engine")]

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::event::Event;
use crate::host::HostAdapter;
use crate::index_store::Indexer;

/// One unit of work the scheduler can dequeue and run to completion.
#[derive(Debug, Clone)]
pub enum Task {
    IndexEvents(Vec<Event>),
    DeleteEvents(Vec<u32>),
    Rebuild,
    ClearFailedLookups,
}

/// FIFO task queue, guarded by a mutex only because `push_task` may be
/// called from outside the scheduler thread in a real host; all dequeuing
/// and execution happens on a single thread.
struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    fn new() -> Self {
        Self { tasks: Mutex::new(VecDeque::new()) }
    }

    fn push(&self, task: Task) {
        self.tasks.lock().unwrap().push_back(task);
    }

    fn pop(&self) -> Option<Task> {
        self.tasks.lock().unwrap().pop_front()
    }

    fn is_empty(&self) -> bool {
        self.tasks.lock().unwrap().is_empty()
    }
}

/// Pagination state for an in-progress `Rebuild`, so a long rebuild can
/// voluntarily split work across idle ticks rather than block the
/// scheduler.
struct RebuildCursor {
    offset: usize,
}

/// Drives `Indexer` from a FIFO task queue. `step()` dequeues exactly one
/// task and runs it to completion; this is the "advance one step" entry
/// point tests drive directly.
pub struct Controller<H: HostAdapter> {
    indexer: Indexer,
    host: H,
    queue: TaskQueue,
    rebuild_cursor: Option<RebuildCursor>,
    page_size: usize,
}

impl<H: HostAdapter> Controller<H> {
    /// Bootstrap: opens the index, and if it's unhealthy, immediately
    /// enqueues a `Rebuild`.
    pub fn bootstrap(indexer: Indexer, host: H, page_size: usize) -> Self {
        let queue = TaskQueue::new();
        if !indexer.check_index() {
            queue.push(Task::Rebuild);
        }
        Self { indexer, host, queue, rebuild_cursor: None, page_size }
    }

    #[must_use]
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    #[must_use]
    pub fn indexer_mut(&mut self) -> &mut Indexer {
        &mut self.indexer
    }

    /// Appends a task; never blocks.
    pub fn push_task(&self, task: Task) {
        self.queue.push(task);
    }

    #[must_use]
    pub fn has_pending_tasks(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Dequeues exactly one task, executes it synchronously, and returns
    /// `true` iff more tasks remain.
    pub fn step(&mut self) -> bool {
        if let Some(task) = self.queue.pop() {
            self.run_task(task);
        }
        self.has_pending_tasks()
    }

    /// Drives `step()` until the queue drains — the directly-driven
    /// equivalent of arming the idle source on a host run loop.
    pub fn run_to_quiescence(&mut self) {
        while self.step() {}
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::IndexEvents(events) => {
                for event in &events {
                    self.indexer.index_event(event);
                }
                if let Err(err) = self.indexer.commit() {
                    tracing::warn!(error = %err, "commit failed after IndexEvents task");
                }
            }
            Task::DeleteEvents(ids) => {
                for id in ids {
                    self.indexer.delete_event(id);
                }
                if let Err(err) = self.indexer.commit() {
                    tracing::warn!(error = %err, "commit failed after DeleteEvents task");
                }
            }
            Task::Rebuild => self.run_rebuild_page(),
            Task::ClearFailedLookups => self.indexer.clear_failed_lookups(),
        }
    }

    /// Rebuild task: on the first invocation, drops the index; then
    /// paginates the host's events ascending by timestamp, enqueueing
    /// `IndexEvents` batches until exhaustion, re-enqueueing itself in
    /// bounded pages.
    fn run_rebuild_page(&mut self) {
        if self.rebuild_cursor.is_none() {
            if let Err(err) = self.indexer.drop_index() {
                tracing::warn!(error = %err, "drop_index failed during rebuild");
                return;
            }
            self.rebuild_cursor = Some(RebuildCursor { offset: 0 });
        }

        let Some(cursor) = &mut self.rebuild_cursor else { return };
        let page = self.host.events_page(cursor.offset, self.page_size);
        if page.is_empty() {
            self.rebuild_cursor = None;
            return;
        }

        cursor.offset += page.len();
        self.queue.push(Task::IndexEvents(page));
        self.queue.push(Task::Rebuild);
    }
}
