// Preset -> ffmpeg command line compiler

use super::preset::{ClipMethod, Mirror, Preset, Rotation};
use super::timecode::{format_timecode, parse_timecode};
use std::path::Path;
use tracing::warn;

/// Placeholder for the output path inside a fully custom command line
pub const OUTPUT_FILE_TOKEN: &str = "<OutputFile>";

/// Sidecar subtitle extensions probed for auto-mux, in mux order
const SIDECAR_SUBTITLES: &[&str] = &["srt", "ass", "ssa"];

/// Compile a preset into the argument string handed to ffmpeg.
///
/// The result is a single space-joined string in which paths and filter
/// chains are double-quoted; use [`split_command_line`] to turn it into an
/// argv. The only filesystem access is the existence check for sidecar
/// subtitles when one of the auto-mux flags is set.
pub fn compile(preset: &Preset, input_path: &Path, output: &Path) -> String {
    let input = input_path.to_string_lossy();
    let output = output.to_string_lossy();

    if !preset.custom.full_command.is_empty() {
        return substitute_wildcards(&preset.custom.full_command, &input)
            .replace(OUTPUT_FILE_TOKEN, &output);
    }

    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into()];

    push_wildcard(&mut args, &preset.custom.leading, &input);
    push_raw(&mut args, &preset.custom.pre_input);

    let decode = &preset.decode;
    if !decode.hwaccel.is_empty() {
        args.push(format!("-hwaccel {}", decode.hwaccel));
        push_opt(&mut args, "-hwaccel_device", &decode.hwaccel_device);
    }
    push_opt(&mut args, "-c:v", &decode.decoder);
    push_opt(&mut args, "-threads", &decode.threads);
    push_opt(&mut args, "-pix_fmt", &decode.pixel_format);

    push_seek_before_input(&mut args, preset);

    args.push(format!("-i \"{}\"", input));

    let clip = &preset.clip;
    if clip.method == ClipMethod::Precise {
        push_opt(&mut args, "-ss", &clip.start);
    }

    push_sidecar_subtitles(&mut args, preset, input_path);
    push_stream_maps(&mut args, preset);

    let video = &preset.video;
    if !video.encoder.is_empty() {
        args.push(format!("-c:v {}", video.encoder));
        push_opt(&mut args, "-preset", &video.preset);
        push_opt(&mut args, "-profile:v", &video.profile);
        push_opt(&mut args, "-tune", &video.tune);
        push_opt(&mut args, "-gpu", &video.gpu);
        push_opt(&mut args, "-threads", &video.threads);
    }

    let quality = &preset.quality;
    if !quality.param_name.is_empty() && !quality.param_value.is_empty() {
        args.push(format!(
            "{} {}",
            dashed(&quality.param_name),
            quality.param_value
        ));
    }
    push_bitrate(&mut args, "-b:v", &quality.bitrate);
    push_bitrate(&mut args, "-minrate", &quality.min_bitrate);
    push_bitrate(&mut args, "-maxrate", &quality.max_bitrate);
    push_bitrate(&mut args, "-bufsize", &quality.buffer_size);
    push_raw(&mut args, &quality.advanced);
    push_opt(&mut args, "-pix_fmt", &video.pixel_format);
    push_wildcard(&mut args, &preset.custom.video, &input);

    let chain = video_filter_chain(preset);
    if !chain.is_empty() {
        args.push(format!("-vf \"{}\"", chain.join(",")));
    }

    if !preset.custom.filter_complex.is_empty() {
        args.push(format!("-filter_complex \"{}\"", preset.custom.filter_complex));
    }

    if preset.interpolation.target_fps.is_empty() && preset.blending.target_fps.is_empty() {
        push_opt(&mut args, "-r", &video.frame_rate);
    }
    push_opt(&mut args, "-vsync", &video.frame_rate_max_change);

    push_audio(&mut args, preset, &input);
    push_subtitles(&mut args, preset, &input, !chain.is_empty());

    push_opt(&mut args, "-to", &clip.end);
    push_opt(&mut args, "-t", &clip.duration);

    let streams = &preset.streams;
    for (enabled, flag) in [
        (streams.discard_video, "-vn"),
        (streams.discard_audio, "-an"),
        (streams.discard_subtitle, "-sn"),
        (streams.discard_data, "-dn"),
        (streams.discard_attachment, "-map -0:t"),
    ] {
        if enabled {
            args.push(flag.to_string());
        }
    }

    let out = &preset.output;
    push_opt(&mut args, "-f", &out.container);
    if out.copy_timestamps {
        args.push("-copyts".into());
    }
    if out.fast_start {
        args.push("-movflags +faststart".into());
    }

    let meta = &preset.metadata;
    for (key, value) in [
        ("title", &meta.title),
        ("author", &meta.author),
        ("comment", &meta.comment),
    ] {
        if !value.is_empty() {
            args.push(format!("-metadata {}=\"{}\"", key, value));
        }
    }

    push_wildcard(&mut args, &preset.custom.additional, &input);
    push_raw(&mut args, &preset.custom.post_output);

    if out.overwrite {
        args.push("-y".into());
    }
    if !out.omit_output_file {
        args.push(format!("\"{}\"", output));
    }

    args.join(" ")
}

fn push_opt(args: &mut Vec<String>, flag: &str, value: &str) {
    if !value.is_empty() {
        args.push(format!("{} {}", flag, value));
    }
}

fn push_raw(args: &mut Vec<String>, values: &[String]) {
    args.extend(values.iter().filter(|v| !v.is_empty()).cloned());
}

fn push_wildcard(args: &mut Vec<String>, template: &str, input: &str) {
    let value = substitute_wildcards(template, input);
    if !value.is_empty() {
        args.push(value);
    }
}

fn push_bitrate(args: &mut Vec<String>, flag: &str, value: &str) {
    if !value.is_empty() {
        args.push(format!("{} {}", flag, with_rate_suffix(value)));
    }
}

/// `crf` and `-crf` both become `-crf`
fn dashed(name: &str) -> String {
    if name.starts_with('-') {
        name.to_string()
    } else {
        format!("-{}", name)
    }
}

fn push_seek_before_input(args: &mut Vec<String>, preset: &Preset) {
    let clip = &preset.clip;
    match clip.method {
        ClipMethod::Coarse => {
            push_opt(args, "-ss", &clip.start);
            push_opt(args, "-to", &clip.end);
        }
        ClipMethod::Precise => {}
        ClipMethod::PreciseFastSeek => {
            if clip.start.is_empty() {
                return;
            }
            if clip.pre_decode.is_empty() {
                push_opt(args, "-ss", &clip.start);
                return;
            }
            match (parse_timecode(&clip.start), parse_timecode(&clip.pre_decode)) {
                (Some(start), Some(lookback)) => {
                    let seek = start.saturating_sub(lookback);
                    args.push(format!("-ss {}", format_timecode(seek)));
                }
                _ => push_opt(args, "-ss", &clip.start),
            }
        }
    }
}

fn push_sidecar_subtitles(args: &mut Vec<String>, preset: &Preset, input: &Path) {
    let streams = &preset.streams;
    let wanted = [streams.auto_mux_srt, streams.auto_mux_ass, streams.auto_mux_ssa];

    let found: Vec<String> = SIDECAR_SUBTITLES
        .iter()
        .zip(wanted)
        .filter(|(_, on)| *on)
        .map(|(ext, _)| input.with_extension(ext))
        .filter(|path| path.is_file())
        .map(|path| path.to_string_lossy().into_owned())
        .collect();

    for sub in &found {
        args.push(format!("-i \"{}\"", sub));
    }

    let codec = if streams.subtitle_to_mov_text {
        "mov_text"
    } else {
        "copy"
    };
    for i in 1..=found.len() {
        args.push(format!("-map {}:s? -c:s:{} {}", i, i - 1, codec));
    }
}

fn push_stream_maps(args: &mut Vec<String>, preset: &Preset) {
    let streams = &preset.streams;

    if streams.keep_other_video_streams && !preset.video.encoder.is_empty() {
        args.push("-map 0:v? -c:v copy".into());
        if !streams.video_stream_params.is_empty() {
            for idx in streams.video_stream_params.iter().filter(|i| !i.is_empty()) {
                args.push(format!("-map -0:v:{}?", idx));
            }
        } else if !streams.video_stream_index.is_empty() {
            args.push(format!("-map -0:v:{}?", streams.video_stream_index));
        } else {
            args.push("-map -0:v:0?".into());
        }
    }

    if !streams.video_stream_index.is_empty() && !streams.keep_other_video_streams {
        args.push(format!("-map 0:v:{}", streams.video_stream_index));
    }
    if !streams.audio_stream_index.is_empty() {
        args.push(format!("-map 0:a:{}", streams.audio_stream_index));
    }
    if !streams.subtitle_stream_index.is_empty() {
        args.push(format!("-map 0:s:{}", streams.subtitle_stream_index));
    }
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// Ordered `-vf` chain; empty when no video filter is configured
pub fn video_filter_chain(preset: &Preset) -> Vec<String> {
    let mut filters = Vec::new();

    if !preset.video.crop.is_empty() {
        filters.push(preset.video.crop.clone());
    }

    let interp = &preset.interpolation;
    if !interp.target_fps.is_empty() && !interp.mode.is_empty() {
        let mut f = format!("minterpolate=fps={}:mi_mode={}", interp.target_fps, interp.mode);
        if !interp.me_mode.is_empty() {
            f.push_str(&format!(":me_mode={}", interp.me_mode));
        }
        if !interp.me_algorithm.is_empty() {
            f.push_str(&format!(":me={}", interp.me_algorithm));
        }
        if !interp.mc_mode.is_empty() {
            f.push_str(&format!(":mc_mode={}", interp.mc_mode));
        }
        if interp.variable_block_size {
            f.push_str(":vsbmc=1");
        }
        if !interp.block_size.is_empty() {
            f.push_str(&format!(":mb_size={}", interp.block_size));
        }
        if !interp.search_range.is_empty() {
            f.push_str(&format!(":search_param={}", interp.search_range));
        }
        if !interp.scene_change_threshold.is_empty() {
            f.push_str(&format!(
                ":scd=fdiff:scd_threshold={}",
                interp.scene_change_threshold
            ));
        }
        filters.push(f);
    }

    let blend = &preset.blending;
    if !blend.target_fps.is_empty() && !blend.mode.is_empty() {
        filters.push(format!("tmix=frames={}", or_default(&blend.ratio, "2")));
        filters.push(format!("fps=fps={}", blend.target_fps));
    }

    push_scale_filter(&mut filters, preset);
    push_color_filters(&mut filters, preset);

    let fx = &preset.filters;
    match fx.denoise.as_str() {
        "" => {}
        "hqdn3d" => {
            let p = &fx.denoise_params;
            filters.push(format!(
                "hqdn3d={}:{}:{}:{}",
                or_default(&p[0], "4"),
                or_default(&p[1], "3"),
                or_default(&p[2], "6"),
                or_default(&p[3], "4.5")
            ));
        }
        "nlmeans" => {
            filters.push(format!(
                "nlmeans=s={}",
                or_default(&fx.denoise_params[0], "3.0")
            ));
        }
        raw => filters.push(raw.to_string()),
    }

    match fx.sharpen.as_str() {
        "" => {}
        "unsharp" => filters.push(format!(
            "unsharp={}:{}:{}:5:5:0.0",
            or_default(&fx.sharpen_luma_width, "5"),
            or_default(&fx.sharpen_luma_height, "5"),
            or_default(&fx.sharpen_strength, "1.0")
        )),
        "cas" => filters.push("cas=0.5".into()),
        raw => filters.push(raw.to_string()),
    }

    match fx.rotation {
        Rotation::None => {}
        Rotation::Clockwise90 => filters.push("transpose=1".into()),
        Rotation::Rotate180 => filters.push("transpose=2,transpose=2".into()),
        Rotation::CounterClockwise90 => filters.push("transpose=2".into()),
    }

    match fx.mirror {
        Mirror::None => {}
        Mirror::Horizontal => filters.push("hflip".into()),
        Mirror::Vertical => filters.push("vflip".into()),
    }

    if !fx.deinterlace.is_empty() {
        filters.push(format!("{}=mode=send_frame:parity=auto", fx.deinterlace));
    }
    if !fx.custom.is_empty() {
        filters.push(fx.custom.clone());
    }

    filters
}

fn push_scale_filter(filters: &mut Vec<String>, preset: &Preset) {
    let up = &preset.upscale;
    let video = &preset.video;

    if !up.width.is_empty() || !up.height.is_empty() {
        let w = or_default(&up.width, "-1");
        let h = or_default(&up.height, "-1");

        if !up.shaders.is_empty() {
            let mut f = format!("libplacebo=w={}:h={}", w, h);
            if !up.upsampler.is_empty() {
                f.push_str(&format!(":upscaler={}", up.upsampler));
            }
            if !up.downsampler.is_empty() {
                f.push_str(&format!(":downscaler={}", up.downsampler));
            }
            if !up.antiringing.is_empty() {
                f.push_str(&format!(":antiringing={}", up.antiringing));
            }
            for shader in up.shaders.iter().filter(|s| !s.is_empty()) {
                f.push_str(&format!(":custom_shader_path='{}'", filter_path(shader)));
            }
            filters.push(f);
        } else {
            let mut f = format!("scale={}:{}", w, h);
            if !up.upsampler.is_empty() {
                f.push_str(&format!(":flags={}", up.upsampler));
            }
            filters.push(f);
        }
    } else if !video.width.is_empty() || !video.height.is_empty() {
        filters.push(format!(
            "scale={}:{}",
            or_default(&video.width, "-1"),
            or_default(&video.height, "-1")
        ));
    } else if !video.resolution.is_empty() {
        filters.push(format!("scale={}", video.resolution));
    }
}

fn push_color_filters(filters: &mut Vec<String>, preset: &Preset) {
    let color = &preset.color;

    if !color.matrix.is_empty() {
        filters.push(format!("colormatrix={}", color.matrix));
    }
    if !color.primaries.is_empty() {
        filters.push(format!("setparams=color_primaries={}", color.primaries));
    }
    if !color.transfer.is_empty() {
        filters.push(format!("setparams=color_trc={}", color.transfer));
    }
    if !color.range.is_empty() {
        filters.push(format!("setparams=range={}", color.range));
    }
    if !color.tonemap.is_empty() {
        filters.push(format!(
            "zscale=t=linear:npl=100,tonemap={},zscale=t=bt709:m=bt709:r=tv",
            color.tonemap
        ));
    }

    let eq: Vec<String> = [
        ("brightness", &color.brightness),
        ("contrast", &color.contrast),
        ("saturation", &color.saturation),
        ("gamma", &color.gamma),
    ]
    .into_iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| format!("{}={}", k, v))
    .collect();

    if !eq.is_empty() {
        filters.push(format!("eq={}", eq.join(":")));
    }
}

fn push_audio(args: &mut Vec<String>, preset: &Preset, input: &str) {
    let audio = &preset.audio;

    if !audio.encoder.is_empty() {
        args.push(format!("-c:a {}", audio.encoder));
        push_bitrate(args, "-b:a", &audio.bitrate);
        if !audio.quality_name.is_empty() && !audio.quality_value.is_empty() {
            args.push(format!("{} {}", audio.quality_name, audio.quality_value));
        }
        push_opt(args, "-ar", &audio.sample_rate);
        push_opt(args, "-channel_layout", &audio.channel_layout);
        push_opt(args, "-ac", &audio.channels);
    }

    push_wildcard(args, &preset.custom.audio, input);

    let mut chain = Vec::new();
    if !audio.volume.is_empty() {
        chain.push(format!("volume={}", audio.volume));
    }
    if !audio.normalization.is_empty() {
        chain.push(format!(
            "loudnorm=I={}:TP=-1.5:LRA=11",
            audio.normalization
        ));
    }
    if !audio.filter.is_empty() {
        chain.push(audio.filter.clone());
    }
    if !chain.is_empty() {
        args.push(format!("-af \"{}\"", chain.join(",")));
    }
}

// Subtitle filters go out as their own -vf; ffmpeg keeps only the last one.
fn push_subtitles(args: &mut Vec<String>, preset: &Preset, input: &str, has_vf: bool) {
    let sub = &preset.subtitle;

    push_opt(args, "-c:s", &sub.encoder);

    let overrides = !sub.filter.is_empty() || !sub.burn_mode.is_empty();
    if overrides && has_vf {
        warn!("subtitle -vf replaces the video filter chain for {}", input);
    }

    if !sub.filter.is_empty() {
        args.push(format!("-vf \"{}\"", sub.filter));
    }
    if !sub.burn_mode.is_empty() {
        args.push(format!(
            "-vf \"subtitles='{}':{}\"",
            filter_path(input),
            sub.burn_mode
        ));
    }
}

/// Append `k` unless the rate already ends in `k`, `M` or `G` (any case)
pub fn with_rate_suffix(value: &str) -> String {
    let has_unit = value
        .chars()
        .last()
        .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'k' | 'm' | 'g'));
    if has_unit {
        value.to_string()
    } else {
        format!("{}k", value)
    }
}

/// Path as accepted inside a filter argument: forward slashes, no quotes
pub fn filter_path(path: &str) -> String {
    path.replace('\\', "/").replace('\'', "")
}

/// Replace the input-file wildcards in a free-text parameter.
///
/// Both `/` and `\` count as separators so that Windows-style paths resolve
/// the same way on every host. Unknown `<...>` tokens are left alone.
pub fn substitute_wildcards(template: &str, input: &str) -> String {
    if template.is_empty() {
        return String::new();
    }

    let split = input.rfind(|c| c == '/' || c == '\\');
    let (dir, name) = match split {
        Some(i) => (&input[..i], &input[i + 1..]),
        None => ("", input),
    };
    let stem = match name.rfind('.') {
        Some(i) => &name[..i],
        None => name,
    };
    let without_ext = match split {
        Some(i) if !dir.is_empty() => format!("{}{}{}", dir, &input[i..=i], stem),
        Some(i) => format!("{}{}", &input[i..=i], stem),
        None => stem.to_string(),
    };

    template
        .replace("<InputFilePath>", input)
        .replace("<InputFilePathWithOutExtension>", &without_ext)
        .replace("<InputFileName>", name)
        .replace("<InputFileNameWithOutExtension>", stem)
}

/// Split a compiled command line into argv.
///
/// Uses shell quoting rules; on unbalanced quotes falls back to plain
/// whitespace splitting so a broken custom parameter still reaches ffmpeg.
pub fn split_command_line(command: &str) -> Vec<String> {
    shlex::split(command).unwrap_or_else(|| {
        warn!("unbalanced quotes in command line, splitting on whitespace");
        command.split_whitespace().map(String::from).collect()
    })
}
