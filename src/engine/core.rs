mod command;
mod ffmpeg_info;
mod preset;
mod progress;
mod scan;
mod task;
mod timecode;
mod types;

pub use command::{
    OUTPUT_FILE_TOKEN, compile, filter_path, split_command_line, substitute_wildcards,
    video_filter_chain, with_rate_suffix,
};
pub use ffmpeg_info::{ffmpeg_version, ffprobe_version, parse_ffprobe_duration};
pub use preset::{
    AudioSettings, BlendingSettings, ClipMethod, ClipSettings, ColorSettings, CustomParams,
    DecodeSettings, FilterSettings, InterpolationSettings, MetadataSettings, Mirror,
    OutputSettings, Preset, QualitySettings, Rotation, StreamSettings, SubtitleSettings,
    UpscaleSettings, VideoSettings,
};
pub use progress::{ProgressParser, ProgressSample, format_size_kb, size_to_kb};
pub use scan::{is_audio_file, is_media_file, is_video_file, scan, scan_streaming};
pub use task::{
    BoundedLog, EncodeTask, LOG_CAPACITY, LOG_KEEP, TaskProgress, estimate_remaining,
    progress_percentage,
};
pub use timecode::{clock_to_seconds, format_timecode, parse_timecode};
pub use types::{TaskError, TaskEvent, TaskStatus};
