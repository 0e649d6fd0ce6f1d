// Queue coordinator: ordered task list plus auto-start of pending work

use super::core::{BoundedLog, EncodeTask, Preset, TaskError, TaskEvent, TaskStatus};
use super::runner::TaskRunner;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Count of tasks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub paused: usize,
    pub completed: usize,
    pub stopped: usize,
    pub error: usize,
}

impl QueueStats {
    /// Tasks holding a process slot
    pub fn running(&self) -> usize {
        self.processing + self.paused
    }
}

/// Owns the tasks and the runner, and reacts to runner events.
///
/// Events are handled on whichever thread calls [`EncodeQueue::pump`]; the
/// task list is never touched from the runner's threads.
pub struct EncodeQueue {
    tasks: Vec<Arc<EncodeTask>>,
    runner: TaskRunner,
    events: Receiver<TaskEvent>,
    log: BoundedLog,
}

impl EncodeQueue {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, limit: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tasks: Vec::new(),
            runner: TaskRunner::new(ffmpeg_path, limit, tx),
            events: rx,
            log: BoundedLog::default(),
        }
    }

    /// Build around an existing runner and the receiving end of its channel
    pub fn with_runner(runner: TaskRunner, events: Receiver<TaskEvent>) -> Self {
        Self {
            tasks: Vec::new(),
            runner,
            events,
            log: BoundedLog::default(),
        }
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Append a task for `input`, snapshotting `preset`
    pub fn enqueue(
        &mut self,
        input: impl Into<PathBuf>,
        preset: &Preset,
        custom_output_dir: Option<PathBuf>,
    ) -> Uuid {
        let task = Arc::new(EncodeTask::new(input.into(), preset, custom_output_dir));
        self.add(task)
    }

    pub fn add(&mut self, task: Arc<EncodeTask>) -> Uuid {
        let id = task.id();
        debug!("queued {} ({})", task.input().display(), id);
        self.tasks.push(task);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&Arc<EncodeTask>> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    fn find(&self, id: Uuid) -> Result<&Arc<EncodeTask>, TaskError> {
        self.get(id).ok_or(TaskError::NotFound(id))
    }

    pub fn tasks(&self) -> &[Arc<EncodeTask>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.runner.limit()
    }

    pub fn set_limit(&self, limit: usize) -> usize {
        self.runner.set_limit(limit)
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.tasks.len(),
            ..Default::default()
        };
        for task in &self.tasks {
            match task.status() {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Processing => stats.processing += 1,
                TaskStatus::Paused => stats.paused += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Stopped => stats.stopped += 1,
                TaskStatus::Error => stats.error += 1,
            }
        }
        stats
    }

    fn processing_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Processing)
            .count()
    }

    pub fn start(&self, id: Uuid) -> Result<(), TaskError> {
        let task = self.find(id)?;
        self.runner.start(task)
    }

    /// Start pending tasks in order until the limit is reached.
    /// Returns how many were started.
    pub fn start_all_pending(&self) -> usize {
        let mut started = 0;
        for task in &self.tasks {
            if self.processing_count() >= self.runner.limit() {
                break;
            }
            if task.status() != TaskStatus::Pending {
                continue;
            }
            match self.runner.start(task) {
                Ok(()) => started += 1,
                Err(e) => warn!("could not start {}: {}", task.input().display(), e),
            }
        }
        started
    }

    pub fn pause(&self, id: Uuid) -> Result<(), TaskError> {
        self.runner.pause(self.find(id)?)
    }

    pub fn resume(&self, id: Uuid) -> Result<(), TaskError> {
        self.runner.resume(self.find(id)?)
    }

    pub fn stop(&self, id: Uuid) -> Result<(), TaskError> {
        self.runner.stop(self.find(id)?);
        Ok(())
    }

    pub fn stop_all(&self) {
        for task in &self.tasks {
            if task.status().is_active() {
                self.runner.stop(task);
            }
        }
    }

    /// Stop the task if needed and drop it from the queue
    pub fn remove(&mut self, id: Uuid) -> Result<(), TaskError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id() == id)
            .ok_or(TaskError::NotFound(id))?;
        let task = self.tasks.remove(index);
        self.runner.remove(&task);
        Ok(())
    }

    /// Drop every Completed task. Returns how many were removed.
    pub fn remove_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.status() != TaskStatus::Completed);
        before - self.tasks.len()
    }

    /// Stop everything, then remove everything
    pub fn clear(&mut self) {
        self.stop_all();
        for task in self.tasks.drain(..) {
            self.runner.remove(&task);
        }
    }

    /// Return a Stopped or Error task to Pending
    pub fn reset(&self, id: Uuid) -> Result<(), TaskError> {
        self.find(id)?.reset()
    }

    /// Drain every task's staged progress. Returns true if any task changed.
    pub fn refresh(&self) -> bool {
        self.tasks
            .iter()
            .fold(false, |changed, task| task.drain() | changed)
    }

    /// True when nothing is pending and nothing holds a process
    pub fn is_finished(&self) -> bool {
        self.tasks
            .iter()
            .all(|t| !matches!(t.status(), TaskStatus::Pending) && !t.status().is_active())
    }

    /// Output of all tasks, prefixed with the input file name
    pub fn log(&self) -> &str {
        self.log.as_str()
    }

    /// Handle every event already queued, without blocking
    pub fn pump(&mut self) -> Vec<TaskEvent> {
        let mut handled = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            self.handle(&event);
            handled.push(event);
        }
        handled
    }

    /// Wait up to `timeout` for the first event, then handle everything queued
    pub fn pump_timeout(&mut self, timeout: Duration) -> Vec<TaskEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                self.handle(&event);
                let mut handled = vec![event];
                handled.extend(self.pump());
                handled
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Vec::new(),
        }
    }

    fn handle(&mut self, event: &TaskEvent) {
        match event {
            TaskEvent::OutputReceived { task_id, line } => {
                let name = self
                    .get(*task_id)
                    .and_then(|t| t.input().file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| task_id.to_string());
                self.log.push_line(&format!("[{}] {}", name, line));
            }
            TaskEvent::StatusChanged { task_id, status } => {
                debug!("task {} -> {}", task_id, status);
                // A stop is a request to halt, so only finished work frees a slot
                if matches!(status, TaskStatus::Completed | TaskStatus::Error) {
                    self.start_next();
                }
            }
            TaskEvent::ProgressUpdated { .. } => {}
        }
    }

    fn start_next(&self) {
        for task in &self.tasks {
            if self.processing_count() >= self.runner.limit() {
                return;
            }
            if task.status() != TaskStatus::Pending {
                continue;
            }
            match self.runner.start(task) {
                Ok(()) => {
                    info!("auto-started {}", task.input().display());
                }
                Err(e) => warn!("auto-start of {} failed: {}", task.input().display(), e),
            }
        }
    }
}

impl Drop for EncodeQueue {
    fn drop(&mut self) {
        for task in &self.tasks {
            if task.status().is_active() {
                self.runner.remove(task);
            }
        }
    }
}
