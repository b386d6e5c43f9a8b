//! chromastrip CLI

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chromastrip::audio::{CaptureSource, DeviceCapture, ToneCapture};
use chromastrip::config::{Args, Command, EncoderKind, FileConfig, RenderArgs};
use chromastrip::output::{FfmpegEncoder, PngSequenceEncoder, TerminalDisplay, VideoEncoder};
use chromastrip::pipeline::{LiveVisualizer, OfflineRenderer, StopReason};

fn main() -> Result<()> {
    let args = Args::parse();

    let mut file_config = match &args.config {
        Some(path) => FileConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FileConfig::load_default().unwrap_or_else(|e| {
            eprintln!("Ignoring config file: {}", e);
            FileConfig::default()
        }),
    };

    // Initialize logging
    init_logging(&args, &file_config)?;

    // Execute command
    match &args.command {
        Command::Live {
            render,
            queue_blocks,
            tone,
        } => cmd_live(&mut file_config, render, *queue_blocks, *tone),
        Command::Render {
            input,
            output,
            render,
            encoder,
            ffmpeg,
            video_codec,
            audio_codec,
            no_audio,
        } => {
            if let Some(path) = ffmpeg {
                file_config.ffmpeg_path = path.to_string_lossy().into_owned();
            }
            if let Some(codec) = video_codec {
                file_config.video_codec = codec.clone();
            }
            if let Some(codec) = audio_codec {
                file_config.audio_codec = codec.clone();
            }
            cmd_render(&mut file_config, render, input, output, *encoder, !*no_audio)
        }
        Command::Config { write } => cmd_config(&file_config, write.as_deref()),
    }
}

fn init_logging(args: &Args, file_config: &FileConfig) -> Result<()> {
    let log_file = args
        .log
        .clone()
        .or_else(|| (!file_config.log_file.is_empty()).then(|| PathBuf::from(&file_config.log_file)));

    // Flags win over the config file
    let level = if args.quiet || args.verbose > 0 {
        args.log_level().to_string()
    } else if matches!(args.command, Command::Live { .. }) && log_file.is_none() {
        // The live display owns the terminal
        "error".to_string()
    } else {
        file_config.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(log_file) = &log_file {
        let file = std::fs::File::create(log_file)
            .with_context(|| format!("creating log file {}", log_file.display()))?;
        subscriber.with_ansi(false).with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

/// Visualize live input in the terminal
fn cmd_live(
    file_config: &mut FileConfig,
    render: &RenderArgs,
    queue_blocks: Option<usize>,
    tone: Option<f32>,
) -> Result<()> {
    file_config.apply_args(render);
    if let Some(n) = queue_blocks {
        file_config.queue_blocks = n;
    }
    let config = file_config.to_render_config()?;

    let mut source: Box<dyn CaptureSource> = match tone {
        Some(freq) => Box::new(
            ToneCapture::new(freq, config.sample_rate())
                .block_frames(file_config.block_frames as usize),
        ),
        None => Box::new(DeviceCapture::new(
            Some(config.sample_rate()),
            file_config.block_frames,
        )),
    };

    // Setup Ctrl+C handler
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    let mut visualizer = LiveVisualizer::new(config, file_config.queue_blocks);
    let report = {
        let mut display = TerminalDisplay::new()?;
        visualizer.run(source.as_mut(), &mut display, stop)?
    };

    match &report.reason {
        StopReason::CaptureLost(message) => {
            anyhow::bail!("capture stopped: {}", message)
        }
        reason => {
            info!("Stopped ({:?})", reason);
            println!(
                "{} frames shown, {} capture blocks dropped",
                report.frames, report.blocks_dropped
            );
        }
    }

    Ok(())
}

/// Render an audio file into a video
fn cmd_render(
    file_config: &mut FileConfig,
    render: &RenderArgs,
    input: &Path,
    output: &Path,
    encoder_kind: EncoderKind,
    mux_audio: bool,
) -> Result<()> {
    file_config.apply_args(render);
    let config = file_config.to_render_config()?;

    let encoder: Box<dyn VideoEncoder> = match encoder_kind {
        EncoderKind::Ffmpeg => Box::new(
            FfmpegEncoder::new(file_config.ffmpeg_program())
                .video_codec(file_config.video_codec.clone())
                .audio_codec(file_config.audio_codec.clone()),
        ),
        EncoderKind::Png => Box::new(PngSequenceEncoder::new()),
    };

    let mut renderer = OfflineRenderer::new(config);
    let report = renderer.render_file(input, output, encoder.as_ref(), mux_audio)?;

    println!(
        "{} frames ({:.2}s @ {}fps) written to {}",
        report.frames,
        report.duration_secs,
        config.frame_rate(),
        report.output.display()
    );
    if report.silent {
        println!("Input was silent; every frame is a single color.");
    }
    if report.malformed_samples > 0 {
        println!(
            "{} samples could not be mapped and were drawn black.",
            report.malformed_samples
        );
    }

    Ok(())
}

/// Print a sample configuration file, or save the effective configuration
fn cmd_config(file_config: &FileConfig, write: Option<&Path>) -> Result<()> {
    match write {
        Some(path) => {
            file_config
                .save(path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Configuration written to {}", path.display());
        }
        None => print!("{}", FileConfig::sample_config()),
    }
    Ok(())
}
