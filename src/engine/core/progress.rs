// Parsing of ffmpeg's human-readable stderr progress

use super::timecode::clock_to_seconds;
use regex::Regex;
use std::sync::LazyLock;

static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"frame=\s*(\d+)\s+fps=\s*([\d.]+)\s+q=([\d.-]+)\s+size=\s*(\d+)([kKMG]i?B)\s+time=(\d{2}):(\d{2}):(\d{2}\.\d{2})\s+bitrate=\s*([\d.]+)kbits/s\s+speed=\s*([\d.eE+\-]+)x",
    )
    .expect("valid progress regex")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d{2}):(\d{2}):(\d{2}\.\d{2})").expect("valid duration regex")
});

static FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"frame=\s*(\d+)").expect("valid frame regex"));
static FPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fps=\s*([\d.]+)").expect("valid fps regex"));
static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d{2}):(\d{2}):(\d{2}\.\d{2})").expect("valid time regex")
});
static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"size=\s*(\d+)([kKMG]i?B)").expect("valid size regex"));
static BITRATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bitrate=\s*([\d.]+)kbits/s").expect("valid bitrate regex"));
static SPEED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"speed=\s*([\d.eE+\-]+)x").expect("valid speed regex"));

/// Fields recovered from one progress line. `None` means "not on this line".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSample {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub quality: Option<f64>,
    pub size_kb: Option<f64>,
    pub time_s: Option<f64>,
    pub bitrate_kbps: Option<f64>,
    pub speed: Option<f64>,
}

impl ProgressSample {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Stateless parser for the `frame= ... speed=` status lines and the
/// `Duration:` banner line ffmpeg writes to stderr.
pub struct ProgressParser;

impl ProgressParser {
    /// True when the line looks like a status update worth parsing
    pub fn is_progress_line(line: &str) -> bool {
        line.contains("frame=") && line.contains("time=")
    }

    /// Parse a status line.
    ///
    /// Tries the full seven-field pattern first; if that does not match,
    /// each field is looked up on its own and missing ones stay `None`.
    pub fn parse_progress(line: &str) -> ProgressSample {
        if let Some(caps) = PROGRESS_LINE.captures(line) {
            let size = caps[4].parse::<u64>().ok();
            return ProgressSample {
                frame: caps[1].parse().ok(),
                fps: caps[2].parse().ok(),
                quality: caps[3].parse().ok(),
                size_kb: size.map(|v| size_to_kb(v, &caps[5])),
                time_s: clock_to_seconds(&caps[6], &caps[7], &caps[8]),
                bitrate_kbps: caps[9].parse().ok(),
                speed: caps[10].parse().ok(),
            };
        }

        let mut sample = ProgressSample::default();
        if let Some(c) = FRAME.captures(line) {
            sample.frame = c[1].parse().ok();
        }
        if let Some(c) = FPS.captures(line) {
            sample.fps = c[1].parse().ok();
        }
        if let Some(c) = TIME.captures(line) {
            sample.time_s = clock_to_seconds(&c[1], &c[2], &c[3]);
        }
        if let Some(c) = SIZE.captures(line) {
            sample.size_kb = c[1].parse::<u64>().ok().map(|v| size_to_kb(v, &c[2]));
        }
        if let Some(c) = BITRATE.captures(line) {
            sample.bitrate_kbps = c[1].parse().ok();
        }
        if let Some(c) = SPEED.captures(line) {
            sample.speed = c[1].parse().ok();
        }
        sample
    }

    /// Total input duration in seconds from a `Duration: HH:MM:SS.ff` line
    pub fn parse_duration(line: &str) -> Option<f64> {
        let caps = DURATION.captures(line)?;
        clock_to_seconds(&caps[1], &caps[2], &caps[3])
    }
}

/// Normalize a size to KB.
///
/// `KB` and `KiB` are both taken as-is, binary units scale by 1024 and
/// decimal `MB`/`GB` by 1000. Unknown units pass the value through.
pub fn size_to_kb(value: u64, unit: &str) -> f64 {
    let value = value as f64;
    match unit.to_ascii_uppercase().as_str() {
        "KB" | "KIB" => value,
        "MIB" => value * 1024.0,
        "GIB" => value * 1024.0 * 1024.0,
        "MB" => value * 1000.0,
        "GB" => value * 1000.0 * 1000.0,
        _ => value,
    }
}

/// Human readable size for a KB count
pub fn format_size_kb(kb: f64) -> String {
    if kb >= 1024.0 * 1024.0 {
        format!("{:.2} GB", kb / (1024.0 * 1024.0))
    } else if kb >= 1024.0 {
        format!("{:.0} MB", kb / 1024.0)
    } else {
        format!("{:.0} KB", kb)
    }
}
