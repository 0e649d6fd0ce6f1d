use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Complete description of one encode job.
///
/// Every field is optional: an empty string, `false`, zero or an empty list
/// means "not set" and the corresponding arguments are left out of the
/// compiled command line. Fields are grouped by concern so a serialized
/// preset reads top-down in the same order the command is assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub output: OutputSettings,
    pub decode: DecodeSettings,
    pub video: VideoSettings,
    pub interpolation: InterpolationSettings,
    pub blending: BlendingSettings,
    pub upscale: UpscaleSettings,
    pub quality: QualitySettings,
    pub color: ColorSettings,
    pub filters: FilterSettings,
    pub audio: AudioSettings,
    pub subtitle: SubtitleSettings,
    pub clip: ClipSettings,
    pub streams: StreamSettings,
    pub custom: CustomParams,
    pub metadata: MetadataSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Muxer passed to `-f`; also picks the output file extension
    pub container: String,
    pub file_extension: String,
    pub auto_naming: bool,
    pub auto_naming_option: i32,
    pub prefix: String,
    pub replacement: String,
    pub suffix: String,
    pub preserve_creation_time: bool,
    pub preserve_modified_time: bool,
    pub preserve_access_time: bool,
    /// Leave the output path off the command line (null muxers, tee outputs)
    pub omit_output_file: bool,
    #[serde(default = "default_true")]
    pub overwrite: bool,
    pub copy_timestamps: bool,
    pub fast_start: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            container: String::new(),
            file_extension: String::new(),
            auto_naming: false,
            auto_naming_option: 0,
            prefix: String::new(),
            replacement: String::new(),
            suffix: String::new(),
            preserve_creation_time: false,
            preserve_modified_time: false,
            preserve_access_time: false,
            omit_output_file: false,
            overwrite: default_true(),
            copy_timestamps: false,
            fast_start: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeSettings {
    pub decoder: String,
    pub threads: String,
    pub pixel_format: String,
    pub hwaccel: String,
    pub hwaccel_device: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub encoder_category: String,
    pub encoder: String,
    pub preset: String,
    pub profile: String,
    pub tune: String,
    pub gpu: String,
    pub threads: String,
    /// Named size such as `1280x720`, used only without width/height
    pub resolution: String,
    pub width: String,
    pub height: String,
    pub crop: String,
    pub frame_rate: String,
    pub frame_rate_max_change: String,
    pub pixel_format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationSettings {
    pub target_fps: String,
    pub mode: String,
    pub me_mode: String,
    pub me_algorithm: String,
    pub mc_mode: String,
    pub variable_block_size: bool,
    pub block_size: String,
    pub search_range: String,
    pub scene_change_threshold: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendingSettings {
    pub target_fps: String,
    pub mode: String,
    pub ratio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleSettings {
    pub width: String,
    pub height: String,
    pub upsampler: String,
    pub downsampler: String,
    pub antiringing: String,
    /// Shader files loaded into a single libplacebo instance, in order
    pub shaders: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub rate_control: String,
    pub param_name: String,
    pub param_value: String,
    pub bitrate: String,
    pub min_bitrate: String,
    pub max_bitrate: String,
    pub buffer_size: String,
    pub advanced: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    pub filter_selection: String,
    pub matrix: String,
    pub primaries: String,
    pub transfer: String,
    pub range: String,
    pub tonemap: String,
    pub processing_mode: String,
    pub brightness: String,
    pub contrast: String,
    pub saturation: String,
    pub gamma: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Raw filter appended last to the `-vf` chain
    pub custom: String,
    pub deinterlace: String,
    pub denoise: String,
    pub denoise_params: [String; 4],
    pub sharpen: String,
    pub sharpen_luma_width: String,
    pub sharpen_luma_height: String,
    pub sharpen_strength: String,
    pub rotation: Rotation,
    pub mirror: Mirror,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Rotate180,
    CounterClockwise90,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mirror {
    #[default]
    None,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub encoder_category: String,
    pub encoder: String,
    pub bitrate: String,
    pub quality_name: String,
    pub quality_value: String,
    pub sample_rate: String,
    pub channels: String,
    pub channel_layout: String,
    pub filter: String,
    pub volume: String,
    /// Integrated loudness target for `loudnorm`
    pub normalization: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleSettings {
    pub encoder: String,
    pub filter: String,
    pub burn_mode: String,
}

/// Where `-ss` lands relative to `-i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipMethod {
    /// `-ss`/`-to` before the input: fast, keyframe accurate
    #[default]
    Coarse,
    /// `-ss` after the input: decodes from the start, frame accurate
    Precise,
    /// Seek to `start - lookback` before the input
    PreciseFastSeek,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSettings {
    pub start: String,
    pub end: String,
    pub duration: String,
    pub method: ClipMethod,
    /// Lookback subtracted from `start` with [`ClipMethod::PreciseFastSeek`]
    pub pre_decode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub discard_video: bool,
    pub discard_audio: bool,
    pub discard_subtitle: bool,
    pub discard_data: bool,
    pub discard_attachment: bool,
    pub keep_other_video_streams: bool,
    pub video_stream_params: Vec<String>,
    pub auto_mux_srt: bool,
    pub auto_mux_ass: bool,
    pub auto_mux_ssa: bool,
    pub subtitle_to_mov_text: bool,
    pub metadata_option: i32,
    pub chapter_option: i32,
    pub attachment_option: i32,
    pub video_stream_index: String,
    pub audio_stream_index: String,
    pub subtitle_stream_index: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomParams {
    pub filter_complex: String,
    /// Appended before the output path; wildcards apply
    pub additional: String,
    pub video: String,
    pub audio: String,
    /// Placed right after the fixed leading flags; wildcards apply
    pub leading: String,
    /// Replaces the whole generated command when set
    pub full_command: String,
    pub pre_input: Vec<String>,
    pub post_output: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub title: String,
    pub author: String,
    pub comment: String,
}

impl Preset {
    /// Get the presets directory path
    pub fn presets_dir() -> io::Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine config directory",
            )
        })?;
        Ok(base.join("ffqueue").join("presets"))
    }

    /// Output path for `input`: `<dir>/<stem>_output<.ext>`.
    ///
    /// `dir` is `output_dir` or the input's own directory. The extension is
    /// the explicit output extension, else the container name, else the
    /// input's extension.
    pub fn derive_output_path(&self, input: &Path, output_dir: Option<&Path>) -> PathBuf {
        let dir = output_dir
            .map(Path::to_path_buf)
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let out = &self.output;
        let ext = if !out.file_extension.is_empty() {
            format!(".{}", out.file_extension.trim_start_matches('.'))
        } else if !out.container.is_empty() {
            format!(".{}", out.container)
        } else {
            input
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default()
        };

        dir.join(format!("{}_output{}", stem, ext))
    }

    fn file_for(presets_dir: &Path, name: &str) -> PathBuf {
        presets_dir.join(format!("{}.json", name))
    }

    /// Save preset as `<name>.json` in `presets_dir`
    pub fn save(&self, presets_dir: &Path, name: &str) -> io::Result<()> {
        std::fs::create_dir_all(presets_dir)?;
        self.save_to_path(&Self::file_for(presets_dir, name))
    }

    pub fn save_to_path(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load a named preset from `presets_dir`
    pub fn load(presets_dir: &Path, name: &str) -> io::Result<Self> {
        Self::load_from_path(&Self::file_for(presets_dir, name))
    }

    pub fn load_from_path(path: &Path) -> io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let preset = serde_json::from_str(&json)?;
        Ok(preset)
    }

    /// Names of the saved presets, sorted
    pub fn list_saved(presets_dir: &Path) -> io::Result<Vec<String>> {
        if !presets_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(presets_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();

        Ok(names)
    }

    /// Delete a saved preset. Missing files are not an error.
    pub fn delete(presets_dir: &Path, name: &str) -> io::Result<()> {
        match std::fs::remove_file(Self::file_for(presets_dir, name)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
