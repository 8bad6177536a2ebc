use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubesplit",
    about = "Tubesplit - Download, cut and split YouTube videos and playlists with yt-dlp",
    version,
    long_about = "A CLI tool for Termux/Android that downloads YouTube videos and playlists through yt-dlp, cuts time ranges, splits videos by chapter and converts audio to MP3 with ffmpeg, keeping the phone awake while it works."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a video or playlist
    Download {
        /// Video or playlist URL
        #[arg(value_name = "URL")]
        url: String,

        /// Quality: auto, 1080, 720, 360, audio (or menu index 0-4)
        #[arg(short = 'Q', long, default_value = "auto")]
        quality: String,

        /// Convert audio-only downloads to MP3
        #[arg(long)]
        mp3: bool,

        /// MP3 bitrate in kbps (320, 256, 192, 128, 96, 64, 32, 16)
        #[arg(long, value_name = "KBPS", requires = "mp3")]
        mp3_bitrate: Option<u32>,

        /// What to save: full, cut or chapters (or menu index 0-2)
        #[arg(short, long, default_value = "full")]
        mode: String,

        /// Cut start, HH:MM:SS or MM:SS (from the beginning if omitted)
        #[arg(long, value_name = "TIME")]
        start: Option<String>,

        /// Cut end, HH:MM:SS or MM:SS (to the end if omitted)
        #[arg(long, value_name = "TIME")]
        end: Option<String>,

        /// Chapters to keep in chapters mode, e.g. 1-3,5
        #[arg(long, value_name = "LIST")]
        chapters: Option<String>,

        /// Playlist entries to download, e.g. 1-5
        #[arg(long, value_name = "LIST")]
        items: Option<String>,

        /// Override the detected URL type
        #[arg(long, value_enum, value_name = "KIND")]
        treat_as: Option<TreatAs>,

        /// Download root (defaults to the config or the Android Download folder)
        #[arg(short, long, value_name = "DIR", env = "TUBESPLIT_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,

        /// Also write the report to a file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Show what a URL points at without downloading
    Info {
        /// Video or playlist URL
        #[arg(value_name = "URL")]
        url: String,

        /// Override the detected URL type
        #[arg(long, value_enum, value_name = "KIND")]
        treat_as: Option<TreatAs>,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Print the configuration file path
        #[arg(short, long)]
        path: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreatAs {
    /// A single video
    Item,
    /// A playlist
    Collection,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human readable summary
    Text,
    /// JSON array of per-item results
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}
