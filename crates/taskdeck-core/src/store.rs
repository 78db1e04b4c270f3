use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::storage::KvStore;
use crate::task::Task;

const TASKS_KEY: &str = "tasks";

type Subscriber = Box<dyn Fn(&[Task])>;

/// Owns the task list. Every mutation computes the full new list, mirrors it
/// through the storage adapter, then notifies subscribers. Rejected
/// operations (empty title, unknown id) touch neither storage nor
/// subscribers.
pub struct TaskStore {
    tasks: Vec<Task>,
    kv: KvStore,
    subscribers: Vec<Subscriber>,
}

impl TaskStore {
    #[tracing::instrument(skip(kv))]
    pub fn open(kv: KvStore) -> Self {
        let tasks: Vec<Task> = kv.load_or(TASKS_KEY, vec![]);
        info!(count = tasks.len(), "loaded task list");
        Self {
            tasks,
            kv,
            subscribers: vec![],
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Registers a callback invoked with the new list after every
    /// successful mutation.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: Fn(&[Task]) + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// Prepends a new task and returns its id. A title that is empty after
    /// trimming is silently rejected.
    #[tracing::instrument(skip(self, title, now))]
    pub fn add_task(&mut self, title: &str, now: DateTime<Utc>) -> Option<i64> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            debug!("title empty after trim; ignoring add");
            return None;
        }

        let id = self.next_id(now);
        self.tasks.insert(0, Task::new(trimmed.to_string(), id));
        self.persist_and_notify();

        debug!(id, count = self.tasks.len(), "task added");
        Some(id)
    }

    /// Flips the completion flag of the matching task. Returns whether a
    /// task matched.
    #[tracing::instrument(skip(self))]
    pub fn toggle_completed(&mut self, id: i64) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle on unknown id; ignoring");
            return false;
        };

        task.completed = !task.completed;
        self.persist_and_notify();
        true
    }

    /// Removes the matching task. Returns whether a task matched.
    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: i64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!(id, "delete on unknown id; ignoring");
            return false;
        }

        self.persist_and_notify();
        true
    }

    /// One-shot bootstrap: inserts the backdated welcome task into an empty
    /// store. Returns whether anything was inserted.
    #[tracing::instrument(skip(self, now))]
    pub fn seed_if_empty(&mut self, now: DateTime<Utc>) -> bool {
        if !self.tasks.is_empty() {
            return false;
        }

        info!("seeding empty store with welcome task");
        self.tasks.push(Task::welcome(now));
        self.persist_and_notify();
        true
    }

    /// Ids stay millisecond timestamps, clamped so that two creations within
    /// one clock tick still get distinct, increasing ids.
    fn next_id(&self, now: DateTime<Utc>) -> i64 {
        let millis = now.timestamp_millis();
        match self.tasks.iter().map(|t| t.id).max() {
            Some(max) if max >= millis => max + 1,
            _ => millis,
        }
    }

    fn persist_and_notify(&mut self) {
        self.kv.save(TASKS_KEY, &self.tasks);
        for subscriber in &self.subscribers {
            subscriber(&self.tasks);
        }
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
