// Per-task ffmpeg process supervision

use super::control::{ProcessControl, platform_control};
use super::core::{
    EncodeTask, ProgressParser, TaskError, TaskEvent, TaskStatus, compile, split_command_line,
};
use chrono::Local;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MIN_CONCURRENT: usize = 1;
pub const MAX_CONCURRENT: usize = 10;

/// How often the waiter thread checks whether ffmpeg has exited
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Substrings (case-insensitive) that mark an output line as an error
const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "invalid",
    "cannot",
    "failed",
    "not supported",
    "require",
    "must be",
    "could not",
    "is experimental",
    "if you want to use it",
    "nothing was written",
];

pub fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_CONCURRENT, MAX_CONCURRENT)
}

/// Spawns and supervises one ffmpeg process per task.
///
/// Each started task gets a reader thread for stdout, one for stderr and a
/// waiter thread. All of them report through the shared event channel.
pub struct TaskRunner {
    ffmpeg_path: PathBuf,
    limit: AtomicUsize,
    control: Box<dyn ProcessControl>,
    events: Sender<TaskEvent>,
}

impl TaskRunner {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, limit: usize, events: Sender<TaskEvent>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            limit: AtomicUsize::new(clamp_limit(limit)),
            control: platform_control(),
            events,
        }
    }

    /// Replace the suspend/resume implementation
    pub fn with_control(mut self, control: Box<dyn ProcessControl>) -> Self {
        self.control = control;
        self
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::SeqCst)
    }

    /// Set the concurrency limit, clamped to 1..=10. Returns the stored value.
    pub fn set_limit(&self, limit: usize) -> usize {
        let limit = clamp_limit(limit);
        self.limit.store(limit, Ordering::SeqCst);
        limit
    }

    fn notify(&self, task: &EncodeTask, status: TaskStatus) {
        let _ = self.events.send(TaskEvent::StatusChanged {
            task_id: task.id(),
            status,
        });
    }

    /// Start a pending task.
    ///
    /// A missing input or a spawn failure moves the task to Error (with a
    /// message in its error list) and is also returned to the caller.
    pub fn start(&self, task: &Arc<EncodeTask>) -> Result<(), TaskError> {
        let mut state = task.lock();
        if state.status != TaskStatus::Pending {
            return Err(TaskError::InvalidTransition {
                from: state.status,
                to: TaskStatus::Processing,
            });
        }

        state.clear_progress();
        state.start_time = Some(Local::now());

        if !task.input().is_file() {
            let err = TaskError::InputMissing(task.input().to_path_buf());
            state.record_error(err.to_string());
            state.transition(TaskStatus::Error)?;
            self.notify(task, TaskStatus::Error);
            warn!("{}", err);
            return Err(err);
        }

        if state.output_path.is_none() {
            state.output_path = Some(
                task.preset()
                    .derive_output_path(task.input(), task.output_dir()),
            );
        }
        let output = state.output_path.clone().unwrap_or_default();

        let command_line = compile(task.preset(), task.input(), &output);
        state.command_line = command_line.clone();
        let args = split_command_line(&command_line);
        debug!("spawning {} {}", self.ffmpeg_path.display(), command_line);

        let spawned = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                state.record_error(spawn_diagnostic(&e, &self.ffmpeg_path, &command_line));
                state.transition(TaskStatus::Error)?;
                self.notify(task, TaskStatus::Error);
                warn!("failed to spawn {}: {}", self.ffmpeg_path.display(), e);
                return Err(TaskError::Spawn(e));
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        info!(
            "started {} -> {} (pid {})",
            task.input().display(),
            output.display(),
            child.id()
        );
        state.child = Some(child);
        state.transition(TaskStatus::Processing)?;
        self.notify(task, TaskStatus::Processing);
        drop(state);

        let mut readers = Vec::new();
        if let Some(out) = stdout {
            readers.push(spawn_reader(Arc::clone(task), out, self.events.clone()));
        }
        if let Some(err) = stderr {
            readers.push(spawn_reader(Arc::clone(task), err, self.events.clone()));
        }

        let task = Arc::clone(task);
        let events = self.events.clone();
        thread::spawn(move || wait_for_exit(task, readers, events));

        Ok(())
    }

    /// Suspend a processing task. OS failures go to the task log only.
    pub fn pause(&self, task: &EncodeTask) -> Result<(), TaskError> {
        self.toggle_suspend(task, TaskStatus::Processing, TaskStatus::Paused)
    }

    /// Continue a paused task. OS failures go to the task log only.
    pub fn resume(&self, task: &EncodeTask) -> Result<(), TaskError> {
        self.toggle_suspend(task, TaskStatus::Paused, TaskStatus::Processing)
    }

    fn toggle_suspend(
        &self,
        task: &EncodeTask,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<(), TaskError> {
        let mut state = task.lock();
        if state.status != from {
            return Err(TaskError::InvalidTransition {
                from: state.status,
                to,
            });
        }
        let Some(pid) = state.child.as_ref().map(|c| c.id()) else {
            return Ok(());
        };

        let result = if to == TaskStatus::Paused {
            self.control.suspend(pid)
        } else {
            self.control.resume(pid)
        };

        match result {
            Ok(()) => {
                state.transition(to)?;
                self.notify(task, to);
            }
            Err(e) => {
                let verb = if to == TaskStatus::Paused {
                    "pause"
                } else {
                    "resume"
                };
                state.log.push_line(&format!("[error] {} failed: {}", verb, e));
                warn!("{} of pid {} failed: {}", verb, pid, e);
            }
        }
        Ok(())
    }

    /// Kill the process if one is running and mark the task Stopped.
    /// Tasks that already finished are left alone.
    pub fn stop(&self, task: &EncodeTask) {
        let mut state = task.lock();
        if let Some(child) = state.child.as_mut() {
            if let Err(e) = child.kill() {
                debug!("kill pid {}: {}", child.id(), e);
            }
        }
        if state.transition(TaskStatus::Stopped).is_ok() {
            info!("stopped {}", task.input().display());
            self.notify(task, TaskStatus::Stopped);
        }
    }

    /// Stop the task if it is running and release its process handle
    pub fn remove(&self, task: &EncodeTask) {
        if task.status().is_active() {
            self.stop(task);
        }
        let mut state = task.lock();
        if let Some(mut child) = state.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn spawn_reader<R>(
    task: Arc<EncodeTask>,
    stream: R,
    events: Sender<TaskEvent>,
) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for_each_line(stream, |line| handle_line(&task, line, &events));
    })
}

/// Call `on_line` for every non-empty line, splitting on `\n` and on the
/// bare `\r` ffmpeg uses to redraw its status line.
pub fn for_each_line<R: Read>(stream: R, mut on_line: impl FnMut(&str)) {
    let mut reader = BufReader::new(stream);
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let buf = match reader.fill_buf() {
            Ok([]) => break,
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        let consumed = buf.len();
        for &byte in buf {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    on_line(&String::from_utf8_lossy(&pending));
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
        reader.consume(consumed);
    }

    if !pending.is_empty() {
        on_line(&String::from_utf8_lossy(&pending));
    }
}

fn handle_line(task: &EncodeTask, line: &str, events: &Sender<TaskEvent>) {
    let mut state = task.lock();
    state.log.push_line(line);
    let _ = events.send(TaskEvent::OutputReceived {
        task_id: task.id(),
        line: line.to_string(),
    });

    if is_error_line(line) {
        state.error_messages.push(line.to_string());
    }

    if state.total_duration_s.is_none() {
        if let Some(duration) = ProgressParser::parse_duration(line) {
            state.total_duration_s = Some(duration);
        }
    }

    if ProgressParser::is_progress_line(line) {
        let sample = ProgressParser::parse_progress(line);
        if !sample.is_empty() {
            state.stage_progress(&sample);
            let _ = events.send(TaskEvent::ProgressUpdated { task_id: task.id() });
        }
    }
}

fn wait_for_exit(
    task: Arc<EncodeTask>,
    readers: Vec<thread::JoinHandle<()>>,
    events: Sender<TaskEvent>,
) {
    let code = loop {
        {
            let mut state = task.lock();
            let Some(child) = state.child.as_mut() else {
                // removed; the handle was already reaped
                return;
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    state.child = None;
                    break status.code();
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("waiting on ffmpeg failed: {}", e);
                    state.child = None;
                    break None;
                }
            }
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    };

    // Let the readers deliver the tail of the output before the final status
    for reader in readers {
        let _ = reader.join();
    }

    on_exit(&task, code, &events);
}

fn on_exit(task: &EncodeTask, code: Option<i32>, events: &Sender<TaskEvent>) {
    let mut state = task.lock();
    state.mark_ended();

    if !state.status.is_active() {
        // stopped while the process was shutting down
        return;
    }

    let output = state.output_path.clone();
    let status = if code == Some(0) {
        if let Some(output) = &output {
            if let Err(e) = copy_timestamps(task.input(), output, task.preset()) {
                state.log.push_line(&format!("[warn] could not copy timestamps: {}", e));
                warn!("timestamp copy for {} failed: {}", output.display(), e);
            }
        }
        TaskStatus::Completed
    } else {
        let reason = match code {
            Some(c) => format!("ffmpeg exited with code {}", c),
            None => "ffmpeg was terminated by a signal".to_string(),
        };
        state.record_error(reason);
        if let Some(output) = &output {
            if output.exists() {
                if let Err(e) = fs::remove_file(output) {
                    warn!("failed to remove partial output {}: {}", output.display(), e);
                } else {
                    debug!("removed partial output {}", output.display());
                }
            }
        }
        TaskStatus::Error
    };

    if state.transition(status).is_ok() {
        info!("{} finished: {}", task.input().display(), status);
        let _ = events.send(TaskEvent::StatusChanged {
            task_id: task.id(),
            status,
        });
    }
}

/// Copy the timestamps the preset asks for from `input` to `output`
fn copy_timestamps(
    input: &Path,
    output: &Path,
    preset: &super::core::Preset,
) -> std::io::Result<()> {
    let flags = &preset.output;
    if !(flags.preserve_creation_time || flags.preserve_modified_time || flags.preserve_access_time)
    {
        return Ok(());
    }
    if !input.exists() || !output.exists() {
        return Ok(());
    }

    let meta = fs::metadata(input)?;
    let mut times = fs::FileTimes::new();
    if flags.preserve_modified_time {
        times = times.set_modified(meta.modified()?);
    }
    if flags.preserve_access_time {
        times = times.set_accessed(meta.accessed()?);
    }
    if flags.preserve_creation_time {
        times = with_created(times, &meta)?;
    }

    let file = fs::OpenOptions::new().write(true).open(output)?;
    file.set_times(times)
}

#[cfg(windows)]
fn with_created(times: fs::FileTimes, meta: &fs::Metadata) -> std::io::Result<fs::FileTimes> {
    use std::os::windows::fs::FileTimesExt;
    Ok(times.set_created(meta.created()?))
}

// Creation time cannot be set here
#[cfg(not(windows))]
fn with_created(times: fs::FileTimes, _meta: &fs::Metadata) -> std::io::Result<fs::FileTimes> {
    Ok(times)
}

/// Multi-line explanation for a failed spawn
pub fn spawn_diagnostic(err: &std::io::Error, ffmpeg: &Path, command_line: &str) -> String {
    let code = err
        .raw_os_error()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "Failed to start ffmpeg process\n\
         Error code: {code}\n\
         Error: {err}\n\
         ffmpeg path: {path}\n\
         Command: {path} {command_line}\n\
         Possible causes:\n\
         1. ffmpeg is not installed or the configured path is wrong\n\
         2. the file is not executable or lacks permissions\n\
         3. a required shared library is missing\n\
         Fixes:\n\
         1. run `ffqueue check-ffmpeg`\n\
         2. set tools.ffmpeg_path in the config file",
        path = ffmpeg.display(),
    )
}
