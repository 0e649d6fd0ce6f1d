// Input probing using ffprobe

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::process::Command;

use super::core::{format_size_kb, format_timecode, parse_ffprobe_duration};

/// Human-readable summary of a media file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub file_name: String,
    /// "hh:mm:ss.ff", empty when unknown
    pub duration: String,
    pub video_codec: String,
    pub audio_codec: String,
    /// "1920x1080"
    pub resolution: String,
    /// "29.97 fps"
    pub frame_rate: String,
    /// "4500 kb/s"
    pub bit_rate: String,
    /// "1.23 GB" / "700 MB" / "512 KB"
    pub file_size: String,
}

/// Raw JSON from `ffprobe -show_format -show_streams`
pub fn probe_raw(ffprobe: &Path, input_path: &Path) -> Result<String> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(input_path)
        .output()
        .with_context(|| format!("Failed to execute {}", ffprobe.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            input_path.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Probe a file and summarize it
pub fn probe_media_info(ffprobe: &Path, input_path: &Path) -> Result<MediaInfo> {
    let json = probe_raw(ffprobe, input_path)?;
    let mut info = parse_media_info(&json)?;
    if info.file_name.is_empty() {
        info.file_name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    Ok(info)
}

/// Build a [`MediaInfo`] from ffprobe JSON. Missing fields stay empty.
pub fn parse_media_info(json: &str) -> Result<MediaInfo> {
    let root: Value = serde_json::from_str(json).context("Failed to parse ffprobe JSON")?;
    let format = &root["format"];
    let streams = root["streams"].as_array().map(Vec::as_slice).unwrap_or(&[]);

    let first_of = |kind: &str| {
        streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some(kind))
    };

    let mut info = MediaInfo {
        file_name: format["filename"]
            .as_str()
            .map(|f| {
                Path::new(f)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| f.to_string())
            })
            .unwrap_or_default(),
        ..Default::default()
    };

    if let Some(seconds) = format["duration"]
        .as_str()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
    {
        info.duration = format_timecode(std::time::Duration::from_secs_f64(seconds));
    }

    if let Some(bits) = format["bit_rate"]
        .as_str()
        .and_then(|b| b.parse::<u64>().ok())
    {
        info.bit_rate = format!("{} kb/s", bits / 1000);
    }

    if let Some(bytes) = format["size"].as_str().and_then(|s| s.parse::<u64>().ok()) {
        info.file_size = format_size_kb(bytes as f64 / 1024.0);
    }

    if let Some(video) = first_of("video") {
        info.video_codec = video["codec_name"].as_str().unwrap_or_default().to_string();
        if let (Some(w), Some(h)) = (video["width"].as_u64(), video["height"].as_u64()) {
            info.resolution = format!("{}x{}", w, h);
        }
        // r_frame_rate first, avg_frame_rate as fallback
        let fps = video["r_frame_rate"]
            .as_str()
            .and_then(parse_fraction)
            .or_else(|| video["avg_frame_rate"].as_str().and_then(parse_fraction));
        if let Some(fps) = fps {
            info.frame_rate = format!("{:.2} fps", fps);
        }
    }

    if let Some(audio) = first_of("audio") {
        info.audio_codec = audio["codec_name"].as_str().unwrap_or_default().to_string();
    }

    Ok(info)
}

/// Duration in seconds, via the lightweight `-show_entries` query
pub fn probe_duration(ffprobe: &Path, input_path: &Path) -> Result<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input_path)
        .output()
        .with_context(|| format!("Failed to execute {}", ffprobe.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            input_path.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return parse_ffprobe_duration(trimmed);
    }
    trimmed
        .parse::<f64>()
        .with_context(|| format!("Failed to parse duration {:?}", trimmed))
}

/// Parse a fraction string like "30000/1001" to f64
fn parse_fraction(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let numerator: f64 = num.parse().ok()?;
    let denominator: f64 = den.parse().ok()?;

    if denominator == 0.0 {
        return None;
    }

    Some(numerator / denominator)
}
