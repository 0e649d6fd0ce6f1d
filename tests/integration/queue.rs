// Queue coordinator: concurrency limit, auto-start, bulk operations

use ffqueue::engine::{EncodeQueue, Preset, TaskEvent, TaskStatus};
use std::time::Duration;
use tempfile::TempDir;

use crate::common::helpers::*;

const TIMEOUT: Duration = Duration::from_secs(20);

fn mp4() -> Preset {
    let mut preset = Preset::default();
    preset.output.container = "mp4".to_string();
    preset
}

#[cfg(unix)]
#[test]
fn test_limit_two_with_five_tasks() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let ffmpeg = fake_ffmpeg(dir.path(), "ffmpeg-short", ": > \"$OUT\"\nexec sleep 0.3");
    let mut queue = EncodeQueue::new(ffmpeg, 2);
    for input in make_inputs(dir.path(), 5) {
        queue.enqueue(input, &mp4(), Some(out.path().to_path_buf()));
    }

    assert_eq!(queue.start_all_pending(), 2);
    let stats = queue.stats();
    assert_eq!((stats.processing, stats.pending), (2, 3));

    // The first terminal event pulls in the third task
    let mut third_started = false;
    let deadline = std::time::Instant::now() + TIMEOUT;
    while !third_started && std::time::Instant::now() < deadline {
        for event in queue.pump_timeout(Duration::from_millis(50)) {
            if let TaskEvent::StatusChanged { status, .. } = event {
                if status == TaskStatus::Completed {
                    third_started = queue.stats().pending < 3;
                }
            }
        }
        assert!(queue.stats().processing <= 2);
    }
    assert!(third_started);

    let peak = drive_queue(&mut queue, TIMEOUT);
    assert!(peak <= 2);

    let stats = queue.stats();
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.running(), 0);
    assert!(queue.is_finished());
    for i in 0..5 {
        assert!(out.path().join(format!("in{}_output.mp4", i)).exists());
    }

    assert_eq!(queue.remove_completed(), 5);
    assert!(queue.is_empty());
}

#[cfg(unix)]
#[test]
fn test_failures_do_not_stall_the_queue() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut queue = EncodeQueue::new(failing_ffmpeg(dir.path()), 1);
    let ids: Vec<_> = make_inputs(dir.path(), 3)
        .into_iter()
        .map(|input| queue.enqueue(input, &mp4(), Some(out.path().to_path_buf())))
        .collect();
    // A missing input becomes an error on start and is skipped over
    queue.enqueue("/nope/missing.mp4", &mp4(), None);

    queue.start_all_pending();
    drive_queue(&mut queue, TIMEOUT);

    let stats = queue.stats();
    assert_eq!(stats.error, 4);
    assert!(queue.is_finished());

    let log = queue.log();
    assert!(log.contains("[in0.mp4] Error while opening encoder"));

    queue.reset(ids[1]).unwrap();
    assert_eq!(queue.stats().pending, 1);
    assert!(!queue.is_finished());
}

#[cfg(unix)]
#[test]
fn test_stop_all_and_clear() {
    let dir = TempDir::new().unwrap();
    let mut queue = EncodeQueue::new(slow_ffmpeg(dir.path(), 5), 3);
    for input in make_inputs(dir.path(), 4) {
        queue.enqueue(input, &mp4(), Some(dir.path().join("out")));
    }

    assert_eq!(queue.start_all_pending(), 3);
    queue.stop_all();
    let stats = queue.stats();
    assert_eq!(stats.stopped, 3);
    assert_eq!(stats.pending, 1);

    // Stopping halts the queue; the remaining pending task is left alone
    queue.pump_timeout(Duration::from_millis(300));
    queue.pump();
    let stats = queue.stats();
    assert_eq!(stats.processing, 0);
    assert_eq!(stats.pending, 1);
    assert!(!queue.is_finished());

    queue.clear();
    assert!(queue.is_empty());
}

#[test]
fn test_limit_changes_apply_to_next_start() {
    let mut queue = EncodeQueue::new("ffmpeg", 1);
    assert_eq!(queue.limit(), 1);
    queue.set_limit(4);
    assert_eq!(queue.limit(), 4);

    let id = queue.enqueue("/nope/a.mp4", &mp4(), None);
    assert!(queue.start(id).is_err());
    assert_eq!(queue.get(id).unwrap().status(), TaskStatus::Error);
    assert_eq!(queue.pump().len(), 1);
}

#[test]
fn test_enqueue_snapshots_preset() {
    let mut queue = EncodeQueue::new("ffmpeg", 1);
    let mut preset = mp4();
    let id = queue.enqueue("/nope/a.mp4", &preset, None);
    preset.output.container = "mkv".to_string();
    assert_eq!(queue.get(id).unwrap().preset().output.container, "mp4");
}
