use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "webm", "mov", "avi", "flv", "m4v", "wmv", "ts", "m2ts", "mts", "mpg", "mpeg",
    "3gp", "ogv", "vob",
];

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "aac", "m4a", "ogg", "opus", "wma", "ac3", "dts",
];

fn has_extension(path: &Path, list: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| list.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

/// Anything ffmpeg is likely to accept as an input
pub fn is_media_file(path: &Path) -> bool {
    is_video_file(path) || is_audio_file(path)
}

/// Walk `root` recursively and call `on_file` for each media file found.
/// A plain file path is reported as-is when it is a media file.
pub fn scan_streaming<F>(root: &Path, mut on_file: F) -> Result<()>
where
    F: FnMut(PathBuf),
{
    if root.is_file() {
        if is_media_file(root) {
            on_file(root.to_path_buf());
        }
        return Ok(());
    }

    if !root.exists() {
        anyhow::bail!("{} does not exist", root.display());
    }

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && is_media_file(path) {
            on_file(path.to_path_buf());
        }
    }

    Ok(())
}

/// Collect media files under `root`, in file-name order per directory
pub fn scan(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    scan_streaming(root, |path| files.push(path))?;
    Ok(files)
}
