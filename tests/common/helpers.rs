#![allow(dead_code)]

use ffqueue::engine::{EncodeQueue, EncodeTask, Preset, TaskEvent, TaskStatus};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

pub const INPUT: &str = "/media/in/movie.mkv";
pub const OUTPUT: &str = "/media/out/movie.mp4";

/// Compile `preset` against the fixed test input/output pair
pub fn compile_default_paths(preset: &Preset) -> String {
    ffqueue::engine::compile(preset, Path::new(INPUT), Path::new(OUTPUT))
}

/// Preset with an mp4 container and nothing else set
pub fn mp4_preset() -> Preset {
    let mut preset = Preset::default();
    preset.output.container = "mp4".to_string();
    preset
}

/// Stderr banner and status lines a real ffmpeg would print for a 10s input
pub const FAKE_BANNER: &str = r#"printf '  Duration: 00:00:10.00, start: 0.000000, bitrate: 1000 kb/s\n' >&2
printf 'frame=  120 fps= 60.0 q=28.0 size=    1024KiB time=00:00:05.00 bitrate=1677.7kbits/s speed=2.00x\r' >&2
printf 'frame=  240 fps= 60.0 q=28.0 size=    2048KiB time=00:00:10.00 bitrate=1677.7kbits/s speed=2.00x\n' >&2
"#;

/// Write an executable shell script that stands in for ffmpeg.
///
/// `$OUT` holds the last argument (the output path) when `body` runs.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!("#!/bin/sh\nfor a in \"$@\"; do OUT=\"$a\"; done\n{}\n", body);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake ffmpeg that prints progress, creates the output and exits 0
#[cfg(unix)]
pub fn succeeding_ffmpeg(dir: &Path) -> PathBuf {
    fake_ffmpeg(
        dir,
        "ffmpeg-ok",
        &format!("{}: > \"$OUT\"\nexit 0", FAKE_BANNER),
    )
}

/// Fake ffmpeg that writes a partial output, reports an error and exits 1
#[cfg(unix)]
pub fn failing_ffmpeg(dir: &Path) -> PathBuf {
    fake_ffmpeg(
        dir,
        "ffmpeg-fail",
        "printf 'partial' > \"$OUT\"\necho 'Error while opening encoder for output stream #0:0' >&2\nexit 1",
    )
}

/// Fake ffmpeg that runs for `seconds` (exec keeps a single pid for signals)
#[cfg(unix)]
pub fn slow_ffmpeg(dir: &Path, seconds: u32) -> PathBuf {
    fake_ffmpeg(
        dir,
        &format!("ffmpeg-sleep-{}", seconds),
        &format!("{}exec sleep {}", FAKE_BANNER, seconds),
    )
}

/// Create `count` small input files named `in<N>.mp4`
pub fn make_inputs(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("in{}.mp4", i));
            fs::write(&path, b"not really video").unwrap();
            path
        })
        .collect()
}

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    cond()
}

/// Wait for a task to reach `status`
pub fn wait_for_status(task: &EncodeTask, status: TaskStatus, timeout: Duration) -> bool {
    wait_until(timeout, || task.status() == status)
}

/// Collect events until a terminal StatusChanged for `task` arrives
pub fn collect_until_terminal(
    rx: &Receiver<TaskEvent>,
    task: &EncodeTask,
    timeout: Duration,
) -> Vec<TaskEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(event) => {
                let done = matches!(
                    &event,
                    TaskEvent::StatusChanged { task_id, status }
                        if *task_id == task.id() && status.is_terminal()
                );
                events.push(event);
                if done {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    events
}

/// Pump the queue until every task is done, tracking the peak number of
/// Processing tasks seen after each batch of events
pub fn drive_queue(queue: &mut EncodeQueue, timeout: Duration) -> usize {
    let deadline = Instant::now() + timeout;
    let mut peak = queue.stats().processing;
    while !queue.is_finished() && Instant::now() < deadline {
        queue.pump_timeout(Duration::from_millis(50));
        peak = peak.max(queue.stats().processing);
    }
    queue.pump();
    peak
}
