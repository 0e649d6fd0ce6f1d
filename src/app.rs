use crate::cli::{Cli, Commands, PresetAction, PresetArgs};
use anyhow::{Context, Result};
use ffqueue::config::Config;
use ffqueue::engine::{self, EncodeQueue, EncoderTable, Preset, TaskEvent, TaskStatus};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often running tasks are drained and printed
const REFRESH_INTERVAL: Duration = Duration::from_secs(1);
const PUMP_TIMEOUT: Duration = Duration::from_millis(200);

pub fn run(cli: Cli) {
    let config = Config::load().unwrap_or_else(|e| {
        warn!("{:#}; using built-in defaults", e);
        Config::default()
    });

    let result = match cli.command {
        Commands::Compile {
            input,
            preset,
            output,
        } => handle_compile(&config, &input, &preset, output),
        Commands::Run {
            inputs,
            preset,
            output_dir,
            jobs,
            quiet,
        } => handle_run(&config, &inputs, &preset, output_dir, jobs, quiet),
        Commands::Presets { action } => handle_presets(action),
        Commands::Encoders { name } => handle_encoders(name.as_deref()),
        Commands::Probe { file, json } => handle_probe(&config, &file, json),
        Commands::CheckFfmpeg => handle_check_ffmpeg(&config),
        Commands::InitConfig => handle_init_config(),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Preset from `--preset-file`, `--preset`, the config default, or built-in defaults
fn resolve_preset(config: &Config, args: &PresetArgs) -> Result<Preset> {
    let mut preset = if let Some(path) = &args.preset_file {
        Preset::load_from_path(path)
            .with_context(|| format!("Failed to load preset file {}", path.display()))?
    } else if let Some(name) = args.preset.as_ref().or(config.defaults.preset.as_ref()) {
        let dir = Preset::presets_dir().context("Could not determine presets directory")?;
        Preset::load(&dir, name).with_context(|| format!("Failed to load preset '{}'", name))?
    } else {
        Preset::default()
    };

    if config.defaults.preserve_timestamps {
        preset.output.preserve_creation_time = true;
        preset.output.preserve_modified_time = true;
        preset.output.preserve_access_time = true;
    }

    warn_unlisted_options(&preset);
    Ok(preset)
}

/// Warn about video options the encoder table does not list for the encoder
fn warn_unlisted_options(preset: &Preset) {
    let video = &preset.video;
    if video.encoder.is_empty() {
        return;
    }
    let Some(entry) = EncoderTable::builtin().find(&video.encoder) else {
        debug!("encoder {} is not in the built-in table", video.encoder);
        return;
    };

    let checks = [
        ("preset", &video.preset, entry.accepts_preset(&video.preset)),
        ("profile", &video.profile, entry.accepts_profile(&video.profile)),
        ("tune", &video.tune, entry.accepts_tune(&video.tune)),
        (
            "pixel format",
            &video.pixel_format,
            entry.accepts_pixel_format(&video.pixel_format),
        ),
    ];
    for (what, value, ok) in checks {
        if !ok {
            warn!("{} '{}' is not listed for {}", what, value, entry.name);
        }
    }
}

fn handle_compile(
    config: &Config,
    input: &Path,
    args: &PresetArgs,
    output: Option<PathBuf>,
) -> Result<bool> {
    let preset = resolve_preset(config, args)?;
    let output = output.unwrap_or_else(|| {
        preset.derive_output_path(input, config.defaults.output_dir.as_deref())
    });
    println!("{}", engine::compile(&preset, input, &output));
    Ok(true)
}

fn handle_run(
    config: &Config,
    inputs: &[PathBuf],
    args: &PresetArgs,
    output_dir: Option<PathBuf>,
    jobs: Option<usize>,
    quiet: bool,
) -> Result<bool> {
    let preset = resolve_preset(config, args)?;
    let output_dir = output_dir.or_else(|| config.defaults.output_dir.clone());
    let limit = jobs.unwrap_or_else(|| config.defaults.concurrency());

    let mut queue = EncodeQueue::new(&config.tools.ffmpeg_path, limit);
    for input in inputs {
        let files = engine::scan(input)
            .with_context(|| format!("Failed to scan {}", input.display()))?;
        for file in files {
            queue.enqueue(file, &preset, output_dir.clone());
        }
    }

    if queue.is_empty() {
        eprintln!("No media files found");
        return Ok(true);
    }
    println!(
        "Queued {} file(s), running up to {} at once",
        queue.len(),
        queue.limit()
    );

    queue.start_all_pending();
    let mut last_refresh = Instant::now();

    while !queue.is_finished() {
        for event in queue.pump_timeout(PUMP_TIMEOUT) {
            if let TaskEvent::StatusChanged { task_id, status } = event {
                if let Some(task) = queue.get(task_id) {
                    println!("{:<10} {}", status, display_name(task.input()));
                }
            }
        }

        if last_refresh.elapsed() >= REFRESH_INTERVAL {
            queue.refresh();
            last_refresh = Instant::now();
            if !quiet {
                print_progress(&queue);
            }
        }
    }

    // Collect the final events and progress
    queue.pump();
    queue.refresh();

    let stats = queue.stats();
    println!(
        "Done: {} completed, {} failed, {} stopped",
        stats.completed, stats.error, stats.stopped
    );
    for task in queue.tasks() {
        if task.status() == TaskStatus::Error {
            eprintln!("{}:", task.input().display());
            for line in task.error_messages() {
                eprintln!("    {}", line);
            }
        }
    }

    Ok(stats.error == 0)
}

fn print_progress(queue: &EncodeQueue) {
    for task in queue.tasks() {
        if task.status() != TaskStatus::Processing {
            continue;
        }
        let p = task.progress();
        let eta = engine::format_timecode(task.estimated_remaining());
        println!(
            "[{:5.1}%] {}  frame={} fps={:.1} size={} speed={:.2}x eta {}",
            task.progress_percentage(),
            display_name(task.input()),
            p.frame,
            p.fps,
            if p.size_text.is_empty() { "-" } else { p.size_text.as_str() },
            p.speed,
            eta
        );
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn handle_presets(action: PresetAction) -> Result<bool> {
    let dir = Preset::presets_dir().context("Could not determine presets directory")?;

    match action {
        PresetAction::List => {
            let names = Preset::list_saved(&dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            if names.is_empty() {
                println!("No saved presets in {}", dir.display());
            }
            for name in names {
                println!("{}", name);
            }
        }
        PresetAction::Show { name } => {
            let preset = Preset::load(&dir, &name)
                .with_context(|| format!("Failed to load preset '{}'", name))?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
        PresetAction::New { name, from, force } => {
            let existing = Preset::list_saved(&dir).unwrap_or_default();
            if !force && existing.contains(&name) {
                anyhow::bail!("preset '{}' already exists (use --force to replace it)", name);
            }
            let preset = match from {
                Some(path) => Preset::load_from_path(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => Preset::default(),
            };
            preset
                .save(&dir, &name)
                .with_context(|| format!("Failed to save preset '{}'", name))?;
            println!("Saved preset '{}' in {}", name, dir.display());
        }
        PresetAction::Delete { name } => {
            Preset::delete(&dir, &name)
                .with_context(|| format!("Failed to delete preset '{}'", name))?;
            println!("Deleted preset '{}'", name);
        }
    }
    Ok(true)
}

fn handle_encoders(name: Option<&str>) -> Result<bool> {
    let table = EncoderTable::builtin();

    let Some(name) = name else {
        for entry in table.entries() {
            println!("{}", entry.name);
        }
        return Ok(true);
    };

    let entry = table
        .find(name)
        .with_context(|| format!("Unknown encoder '{}'", name))?;
    let show = |label: &str, list: &[&str]| {
        if list.is_empty() {
            println!("{:<14} (any)", label);
        } else {
            println!("{:<14} {}", label, list.join(" "));
        }
    };
    println!("{}", entry.name);
    show("presets:", entry.presets);
    show("profiles:", entry.profiles);
    show("tunes:", entry.tunes);
    show("pixel formats:", entry.pixel_formats);
    Ok(true)
}

fn handle_probe(config: &Config, file: &Path, json: bool) -> Result<bool> {
    let ffprobe = &config.tools.ffprobe_path;
    if json {
        print!("{}", engine::probe::probe_raw(ffprobe, file)?);
        return Ok(true);
    }

    let info = engine::probe::probe_media_info(ffprobe, file)?;
    let rows = [
        ("File", &info.file_name),
        ("Duration", &info.duration),
        ("Video codec", &info.video_codec),
        ("Audio codec", &info.audio_codec),
        ("Resolution", &info.resolution),
        ("Frame rate", &info.frame_rate),
        ("Bit rate", &info.bit_rate),
        ("Size", &info.file_size),
    ];
    for (label, value) in rows {
        if !value.is_empty() {
            println!("{:<12} {}", label, value);
        }
    }
    Ok(true)
}

fn handle_check_ffmpeg(config: &Config) -> Result<bool> {
    let version = engine::ffmpeg_version(&config.tools.ffmpeg_path)?;
    println!("ffmpeg found: {}", version);
    let probe_version = engine::ffprobe_version(&config.tools.ffprobe_path)?;
    println!("ffprobe found: {}", probe_version);
    Ok(true)
}

fn handle_init_config() -> Result<bool> {
    let path = Config::config_path()?;
    if path.exists() {
        let cfg = Config::load_from(&path)?;
        println!("Config loaded successfully from {}", path.display());
        println!("{:#?}", cfg);
    } else {
        println!("Creating default config...");
        Config::ensure_default()?;
        println!("Default config saved to {}", path.display());
    }
    Ok(true)
}
