//! CLI argument parsing using clap

use crate::color::ColorMode;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// chromastrip - turn audio into a scrolling strip of color
///
/// Visualize the default input device live in the terminal, or render an
/// audio file into a video with the audio as soundtrack
#[derive(Parser, Debug)]
#[command(name = "chromastrip")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Configuration file (TOML)
    /// If not specified, ./chromastrip.toml and the user config dir are searched
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Visualize live audio input in the terminal
    Live {
        #[command(flatten)]
        render: RenderArgs,

        /// Capture queue capacity in blocks; oldest blocks are dropped when full
        #[arg(long)]
        queue_blocks: Option<usize>,

        /// Use a synthetic sine tone at this frequency instead of the input device
        #[arg(long, value_name = "HZ")]
        tone: Option<f32>,
    },

    /// Render an audio file into a video
    Render {
        /// Input audio file (wav, flac, mp3, ogg, aac, ...)
        input: PathBuf,

        /// Output video file, or a directory for the png encoder
        output: PathBuf,

        #[command(flatten)]
        render: RenderArgs,

        /// Video writer to use
        #[arg(long, value_enum, default_value_t = EncoderKind::Ffmpeg)]
        encoder: EncoderKind,

        /// Path to the ffmpeg executable
        #[arg(long)]
        ffmpeg: Option<PathBuf>,

        /// Video codec passed to ffmpeg
        #[arg(long)]
        video_codec: Option<String>,

        /// Audio codec passed to ffmpeg
        #[arg(long)]
        audio_codec: Option<String>,

        /// Do not multiplex the input audio into the video
        #[arg(long)]
        no_audio: bool,
    },

    /// Print a sample configuration file, or save the effective one
    Config {
        /// Save the effective configuration (file values over defaults) to this path
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

/// Options shared by the live and render commands
///
/// Unset options fall back to the config file, then to built-in defaults.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Sample rate in Hz (live: requested capture rate)
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Frame width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Width of each color block in pixels
    #[arg(long)]
    pub strip_width: Option<u32>,

    /// Color mapping: hue or packed
    #[arg(long)]
    pub mode: Option<ColorMode>,
}

/// Video writer backends
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    /// Pipe raw frames into an ffmpeg process
    Ffmpeg,
    /// Write one PNG per frame into a directory
    Png,
}

impl Args {
    /// Get the log level based on verbose/quiet flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::INFO,
                1 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }
}
