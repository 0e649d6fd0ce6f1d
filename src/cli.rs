use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffqueue")]
#[command(about = "Compile ffmpeg presets and run them as a concurrent encode queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level (spawned commands, event flow)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the ffmpeg arguments a preset produces for one input
    Compile {
        /// Input media file
        input: PathBuf,

        #[command(flatten)]
        preset: PresetArgs,

        /// Output file (derived from the preset when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode files or directories through the queue
    Run {
        /// Files or directories to encode (directories are scanned recursively)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        preset: PresetArgs,

        /// Directory for outputs (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Encodes to run at once, 1-10 (overrides config)
        #[arg(short = 'j', long)]
        jobs: Option<usize>,

        /// Don't print per-task progress lines
        #[arg(long)]
        quiet: bool,
    },

    /// Manage saved presets
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// List known encoders, or show the options one accepts
    Encoders {
        /// Encoder name, e.g. libx264
        name: Option<String>,
    },

    /// Show a media summary of a file using ffprobe
    Probe {
        /// Path to the media file
        file: PathBuf,

        /// Print ffprobe's raw JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Check if ffmpeg and ffprobe are installed
    CheckFfmpeg,

    /// Show config status and location, or create default config if missing
    InitConfig,
}

#[derive(clap::Args)]
pub struct PresetArgs {
    /// Saved preset name (from `presets list`)
    #[arg(short, long, conflicts_with = "preset_file")]
    pub preset: Option<String>,

    /// Preset JSON file
    #[arg(long, value_name = "FILE")]
    pub preset_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum PresetAction {
    /// List saved presets
    List,

    /// Print a saved preset as JSON
    Show { name: String },

    /// Save a new preset, copied from a JSON file or with default settings
    New {
        name: String,

        /// Initial settings
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Replace an existing preset with the same name
        #[arg(long)]
        force: bool,
    },

    /// Delete a saved preset
    Delete { name: String },
}

pub fn parse() -> Cli {
    Cli::parse()
}
