use super::preset::Preset;
use super::progress::{ProgressSample, format_size_kb};
use super::types::{TaskError, TaskStatus};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// Characters kept in an output log before it is trimmed
pub const LOG_CAPACITY: usize = 50_000;
/// Characters kept after trimming
pub const LOG_KEEP: usize = 25_000;

/// Append-only text log that keeps only the newest output once it grows
/// past `capacity` characters.
#[derive(Debug, Clone)]
pub struct BoundedLog {
    text: String,
    capacity: usize,
    keep: usize,
}

impl Default for BoundedLog {
    fn default() -> Self {
        Self::new(LOG_CAPACITY, LOG_KEEP)
    }
}

impl BoundedLog {
    pub fn new(capacity: usize, keep: usize) -> Self {
        Self {
            text: String::new(),
            capacity,
            keep: keep.min(capacity),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');

        if self.text.len() > self.capacity {
            let mut cut = self.text.len() - self.keep;
            while !self.text.is_char_boundary(cut) {
                cut += 1;
            }
            self.text.drain(..cut);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// Externally visible progress. Only `drain()` writes these fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskProgress {
    pub status: TaskStatus,
    pub frame: u64,
    pub fps: f64,
    pub quality: f64,
    pub size_kb: f64,
    pub size_text: String,
    pub time_s: f64,
    pub bitrate_kbps: f64,
    pub speed: f64,
}

/// Staging area written by the reader threads
#[derive(Debug, Default)]
struct ProgressBuffer {
    pending_status: Option<TaskStatus>,
    sample: ProgressSample,
    has_data: bool,
}

impl ProgressBuffer {
    fn stage(&mut self, sample: &ProgressSample) {
        let s = &mut self.sample;
        s.frame = sample.frame.or(s.frame);
        s.fps = sample.fps.or(s.fps);
        s.quality = sample.quality.or(s.quality);
        s.size_kb = sample.size_kb.or(s.size_kb);
        s.time_s = sample.time_s.or(s.time_s);
        s.bitrate_kbps = sample.bitrate_kbps.or(s.bitrate_kbps);
        s.speed = sample.speed.or(s.speed);
        self.has_data = true;
    }
}

#[derive(Debug, Default)]
pub(crate) struct TaskState {
    pub(crate) status: TaskStatus,
    progress: TaskProgress,
    buffer: ProgressBuffer,
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) command_line: String,
    pub(crate) total_duration_s: Option<f64>,
    pub(crate) start_time: Option<DateTime<Local>>,
    pub(crate) end_time: Option<DateTime<Local>>,
    pub(crate) error_messages: Vec<String>,
    pub(crate) log: BoundedLog,
    pub(crate) child: Option<Child>,
}

impl TaskState {
    /// Move to `next`, staging the status for the next drain
    pub(crate) fn transition(&mut self, next: TaskStatus) -> Result<(), TaskError> {
        if !self.status.can_transition_to(next) {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.buffer.pending_status = Some(next);
        if next.is_terminal() {
            self.mark_ended();
        }
        Ok(())
    }

    pub(crate) fn mark_ended(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Local::now());
        }
    }

    pub(crate) fn stage_progress(&mut self, sample: &ProgressSample) {
        self.buffer.stage(sample);
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.log.push_line(&message);
        self.error_messages.push(message);
    }

    pub(crate) fn clear_progress(&mut self) {
        let status = self.progress.status;
        self.progress = TaskProgress {
            status,
            ..TaskProgress::default()
        };
        self.buffer.sample = ProgressSample::default();
        self.buffer.has_data = false;
        self.total_duration_s = None;
        self.error_messages.clear();
        self.log.clear();
        self.start_time = None;
        self.end_time = None;
    }
}

/// One encode job: an input file, a frozen preset and its run state.
///
/// Tasks are shared as `Arc<EncodeTask>` between the queue, the runner and
/// the runner's reader threads. Everything mutable sits behind one mutex.
#[derive(Debug)]
pub struct EncodeTask {
    id: Uuid,
    input: PathBuf,
    output_dir: Option<PathBuf>,
    preset: Arc<Preset>,
    state: Mutex<TaskState>,
}

impl EncodeTask {
    /// Create a pending task. The preset is copied, so later edits to the
    /// caller's preset do not reach this task.
    pub fn new(input: PathBuf, preset: &Preset, output_dir: Option<PathBuf>) -> Self {
        Self::with_snapshot(input, Arc::new(preset.clone()), output_dir)
    }

    pub fn with_snapshot(input: PathBuf, preset: Arc<Preset>, output_dir: Option<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            output_dir,
            preset,
            state: Mutex::new(TaskState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Live status, updated the moment a transition happens
    pub fn status(&self) -> TaskStatus {
        self.lock().status
    }

    /// Progress as of the last `drain()`
    pub fn progress(&self) -> TaskProgress {
        self.lock().progress.clone()
    }

    /// Apply staged status and progress to the visible fields.
    ///
    /// Returns `false` when nothing was staged since the previous call.
    pub fn drain(&self) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut changed = false;

        if let Some(status) = state.buffer.pending_status.take() {
            state.progress.status = status;
            changed = true;
        }

        if state.buffer.has_data {
            let staged = std::mem::take(&mut state.buffer.sample);
            let p = &mut state.progress;
            if let Some(v) = staged.frame {
                p.frame = v;
            }
            if let Some(v) = staged.fps {
                p.fps = v;
            }
            if let Some(v) = staged.quality {
                p.quality = v;
            }
            if let Some(v) = staged.size_kb {
                p.size_kb = v;
                p.size_text = format_size_kb(v);
            }
            if let Some(v) = staged.time_s {
                p.time_s = v;
            }
            if let Some(v) = staged.bitrate_kbps {
                p.bitrate_kbps = v;
            }
            if let Some(v) = staged.speed {
                p.speed = v;
            }
            state.buffer.has_data = false;
            changed = true;
        }

        changed
    }

    pub fn has_pending_data(&self) -> bool {
        self.lock().buffer.has_data
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.lock().output_path.clone()
    }

    pub fn command_line(&self) -> String {
        self.lock().command_line.clone()
    }

    pub fn total_duration(&self) -> Option<f64> {
        self.lock().total_duration_s
    }

    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.lock().start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Local>> {
        self.lock().end_time
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.lock().error_messages.clone()
    }

    /// Most recent recorded error line
    pub fn last_error(&self) -> Option<String> {
        self.lock().error_messages.last().cloned()
    }

    pub fn log(&self) -> String {
        self.lock().log.as_str().to_string()
    }

    /// Percentage of the input encoded so far, from the visible fields
    pub fn progress_percentage(&self) -> f64 {
        let state = self.lock();
        progress_percentage(state.progress.time_s, state.total_duration_s)
    }

    /// Remaining time extrapolated from wall-clock time since start
    pub fn estimated_remaining(&self) -> Duration {
        let state = self.lock();
        let Some(start) = state.start_time else {
            return Duration::ZERO;
        };
        let until = state.end_time.unwrap_or_else(Local::now);
        let elapsed = (until - start).to_std().unwrap_or_default();
        let pct = progress_percentage(state.progress.time_s, state.total_duration_s);
        estimate_remaining(elapsed, pct)
    }

    /// Explicit reset of a Stopped or Error task back to Pending
    pub fn reset(&self) -> Result<(), TaskError> {
        let mut state = self.lock();
        if !matches!(state.status, TaskStatus::Stopped | TaskStatus::Error) {
            return Err(TaskError::InvalidTransition {
                from: state.status,
                to: TaskStatus::Pending,
            });
        }
        state.status = TaskStatus::Pending;
        state.buffer.pending_status = Some(TaskStatus::Pending);
        state.output_path = None;
        state.child = None;
        state.clear_progress();
        Ok(())
    }
}

/// current / total * 100, or 0 when the total is unknown
pub fn progress_percentage(current_s: f64, total_s: Option<f64>) -> f64 {
    match total_s {
        Some(total) if total > 0.0 => current_s / total * 100.0,
        _ => 0.0,
    }
}

/// elapsed / fraction - elapsed, never negative; zero without progress
pub fn estimate_remaining(elapsed: Duration, percentage: f64) -> Duration {
    if percentage <= 0.0 {
        return Duration::ZERO;
    }
    let elapsed_s = elapsed.as_secs_f64();
    let remaining = elapsed_s / (percentage / 100.0) - elapsed_s;
    if remaining.is_finite() && remaining > 0.0 {
        Duration::from_secs_f64(remaining)
    } else {
        Duration::ZERO
    }
}
