// Runner lifecycle against fake ffmpeg scripts

use ffqueue::engine::{EncodeTask, Preset, TaskError, TaskEvent, TaskRunner, TaskStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::helpers::*;

const TIMEOUT: Duration = Duration::from_secs(10);

fn task_for(input: PathBuf, out_dir: &TempDir) -> Arc<EncodeTask> {
    let mut preset = Preset::default();
    preset.output.container = "mp4".to_string();
    Arc::new(EncodeTask::new(
        input,
        &preset,
        Some(out_dir.path().to_path_buf()),
    ))
}

#[test]
fn test_missing_input_fails_before_spawn() {
    let (tx, rx) = mpsc::channel();
    let runner = TaskRunner::new("/definitely/not/ffmpeg", 1, tx);
    let out = TempDir::new().unwrap();
    let task = task_for(PathBuf::from("/definitely/not/here.mp4"), &out);

    let err = runner.start(&task).unwrap_err();
    assert!(matches!(err, TaskError::InputMissing(_)));
    assert_eq!(task.status(), TaskStatus::Error);
    assert!(task.last_error().unwrap().contains("input file not found"));
    assert!(task.command_line().is_empty());

    assert_eq!(
        rx.try_recv().unwrap(),
        TaskEvent::StatusChanged {
            task_id: task.id(),
            status: TaskStatus::Error
        }
    );
}

#[test]
fn test_spawn_failure_gives_diagnostic() {
    let dir = TempDir::new().unwrap();
    let input = make_inputs(dir.path(), 1).remove(0);
    let (tx, _rx) = mpsc::channel();
    let runner = TaskRunner::new(dir.path().join("no-such-ffmpeg"), 1, tx);
    let task = task_for(input, &dir);

    let err = runner.start(&task).unwrap_err();
    assert!(matches!(err, TaskError::Spawn(_)));
    assert_eq!(task.status(), TaskStatus::Error);

    assert_eq!(task.error_messages().len(), 1);
    let diagnostic = task.last_error().unwrap();
    assert!(diagnostic.starts_with("Failed to start ffmpeg process"));
    assert!(diagnostic.contains("Error: "));
    assert!(diagnostic.contains("no-such-ffmpeg"));
    assert!(diagnostic.lines().any(|l| l.starts_with("Command:")));
    assert!(diagnostic.contains("set tools.ffmpeg_path"));
    assert!(task.log().contains("Possible causes:"));
}

#[test]
fn test_start_requires_pending() {
    let dir = TempDir::new().unwrap();
    let input = make_inputs(dir.path(), 1).remove(0);
    let (tx, _rx) = mpsc::channel();
    let runner = TaskRunner::new("/nope", 1, tx);
    let task = task_for(input, &dir);
    assert!(task.reset().is_err());

    runner.stop(&task);
    assert_eq!(task.status(), TaskStatus::Stopped);
    assert!(matches!(
        runner.start(&task),
        Err(TaskError::InvalidTransition { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_successful_run_reports_progress() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let ffmpeg = succeeding_ffmpeg(dir.path());
    let input = make_inputs(dir.path(), 1).remove(0);
    let (tx, rx) = mpsc::channel();
    let runner = TaskRunner::new(ffmpeg, 1, tx);
    let task = task_for(input, &out);

    runner.start(&task).unwrap();
    let events = collect_until_terminal(&rx, &task, TIMEOUT);

    assert_eq!(task.status(), TaskStatus::Completed);
    assert!(matches!(
        events.first(),
        Some(TaskEvent::StatusChanged {
            status: TaskStatus::Processing,
            ..
        })
    ));
    assert!(events.iter().any(|e| matches!(e, TaskEvent::ProgressUpdated { .. })));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, TaskEvent::OutputReceived { line, .. } if line.contains("Duration:")))
    );

    let output = task.output_path().unwrap();
    assert_eq!(output, out.path().join("in0_output.mp4"));
    assert!(output.exists());

    assert_eq!(task.total_duration(), Some(10.0));
    assert!(task.drain());
    let progress = task.progress();
    assert_eq!(progress.status, TaskStatus::Completed);
    assert_eq!(progress.frame, 240);
    assert_eq!(progress.size_kb, 2048.0);
    assert_eq!(progress.size_text, "2 MB");
    assert_eq!(progress.speed, 2.0);
    assert_eq!(task.progress_percentage(), 100.0);
    assert!(!task.drain());

    assert!(task.start_time().is_some());
    assert!(task.end_time().is_some());
    assert!(task.error_messages().is_empty());
    assert!(task.log().contains("frame=  120"));
}

#[cfg(unix)]
#[test]
fn test_success_copies_input_timestamps() {
    use std::fs::{File, FileTimes};
    use std::time::SystemTime;

    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = make_inputs(dir.path(), 1).remove(0);
    let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    let accessed = old + Duration::from_secs(3_600);
    File::options()
        .write(true)
        .open(&input)
        .unwrap()
        .set_times(FileTimes::new().set_modified(old).set_accessed(accessed))
        .unwrap();

    let mut preset = Preset::default();
    preset.output.container = "mp4".to_string();
    preset.output.preserve_modified_time = true;
    preset.output.preserve_access_time = true;
    preset.output.preserve_creation_time = true;
    let task = Arc::new(EncodeTask::new(
        input.clone(),
        &preset,
        Some(out.path().to_path_buf()),
    ));

    let (tx, rx) = mpsc::channel();
    let runner = TaskRunner::new(succeeding_ffmpeg(dir.path()), 1, tx);
    runner.start(&task).unwrap();
    collect_until_terminal(&rx, &task, TIMEOUT);
    assert_eq!(task.status(), TaskStatus::Completed);

    let output = task.output_path().unwrap();
    let meta = std::fs::metadata(&output).unwrap();
    assert_eq!(meta.modified().unwrap(), old);
    assert_eq!(meta.accessed().unwrap(), accessed);
    assert!(!task.log().contains("could not copy timestamps"));
}

#[cfg(unix)]
#[test]
fn test_timestamps_untouched_without_flags() {
    use std::fs::{File, FileTimes};
    use std::time::SystemTime;

    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = make_inputs(dir.path(), 1).remove(0);
    let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    File::options()
        .write(true)
        .open(&input)
        .unwrap()
        .set_times(FileTimes::new().set_modified(old))
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = TaskRunner::new(succeeding_ffmpeg(dir.path()), 1, tx);
    let task = task_for(input, &out);
    runner.start(&task).unwrap();
    collect_until_terminal(&rx, &task, TIMEOUT);

    let modified = std::fs::metadata(task.output_path().unwrap())
        .unwrap()
        .modified()
        .unwrap();
    assert_ne!(modified, old);
}

#[cfg(unix)]
#[test]
fn test_failed_run_deletes_output() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let ffmpeg = failing_ffmpeg(dir.path());
    let input = make_inputs(dir.path(), 1).remove(0);
    let (tx, rx) = mpsc::channel();
    let runner = TaskRunner::new(ffmpeg, 1, tx);
    let task = task_for(input, &out);

    runner.start(&task).unwrap();
    collect_until_terminal(&rx, &task, TIMEOUT);

    assert_eq!(task.status(), TaskStatus::Error);
    assert!(!out.path().join("in0_output.mp4").exists());
    let errors = task.error_messages();
    assert!(errors.iter().any(|e| e.contains("Error while opening encoder")));
    assert_eq!(task.last_error().as_deref(), Some("ffmpeg exited with code 1"));
}

#[cfg(unix)]
#[test]
fn test_stop_wins_over_exit() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let ffmpeg = slow_ffmpeg(dir.path(), 5);
    let input = make_inputs(dir.path(), 1).remove(0);
    let (tx, rx) = mpsc::channel();
    let runner = TaskRunner::new(ffmpeg, 1, tx);
    let task = task_for(input, &out);

    runner.start(&task).unwrap();
    assert_eq!(task.status(), TaskStatus::Processing);
    runner.stop(&task);
    assert_eq!(task.status(), TaskStatus::Stopped);

    // The waiter still reaps the killed process; the status must not change
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(task.status(), TaskStatus::Stopped);

    let statuses: Vec<TaskStatus> = rx
        .try_iter()
        .filter_map(|e| match e {
            TaskEvent::StatusChanged { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![TaskStatus::Processing, TaskStatus::Stopped]);

    // A second stop is a no-op
    runner.stop(&task);
    assert_eq!(task.status(), TaskStatus::Stopped);
}

#[cfg(unix)]
#[test]
fn test_pause_and_resume() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let ffmpeg = slow_ffmpeg(dir.path(), 5);
    let input = make_inputs(dir.path(), 1).remove(0);
    let (tx, _rx) = mpsc::channel();
    let runner = TaskRunner::new(ffmpeg, 1, tx);
    let task = task_for(input, &out);

    assert!(runner.pause(&task).is_err());

    runner.start(&task).unwrap();
    runner.pause(&task).unwrap();
    assert_eq!(task.status(), TaskStatus::Paused);
    assert!(runner.pause(&task).is_err());

    runner.resume(&task).unwrap();
    assert_eq!(task.status(), TaskStatus::Processing);

    runner.remove(&task);
    assert_eq!(task.status(), TaskStatus::Stopped);
}

#[cfg(unix)]
#[test]
fn test_pause_failure_is_logged_not_raised() {
    use ffqueue::engine::control::UnsupportedControl;

    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let ffmpeg = slow_ffmpeg(dir.path(), 5);
    let input = make_inputs(dir.path(), 1).remove(0);
    let (tx, _rx) = mpsc::channel();
    let runner = TaskRunner::new(ffmpeg, 1, tx).with_control(Box::new(UnsupportedControl));
    let task = task_for(input, &out);

    runner.start(&task).unwrap();
    runner.pause(&task).unwrap();
    assert_eq!(task.status(), TaskStatus::Processing);
    assert!(task.log().contains("[error] pause failed"));

    runner.stop(&task);
}

#[cfg(unix)]
#[test]
fn test_reset_after_error_allows_rerun() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = make_inputs(dir.path(), 1).remove(0);
    let task = task_for(input, &out);

    let (tx, rx) = mpsc::channel();
    let failing = TaskRunner::new(failing_ffmpeg(dir.path()), 1, tx);
    failing.start(&task).unwrap();
    collect_until_terminal(&rx, &task, TIMEOUT);
    assert_eq!(task.status(), TaskStatus::Error);

    task.reset().unwrap();
    assert_eq!(task.status(), TaskStatus::Pending);
    assert!(task.error_messages().is_empty());
    assert!(task.output_path().is_none());

    let (tx, rx) = mpsc::channel();
    let succeeding = TaskRunner::new(succeeding_ffmpeg(dir.path()), 1, tx);
    succeeding.start(&task).unwrap();
    collect_until_terminal(&rx, &task, TIMEOUT);
    assert_eq!(task.status(), TaskStatus::Completed);
    assert!(task.error_messages().is_empty());
}
