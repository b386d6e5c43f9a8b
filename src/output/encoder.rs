//! Offline video writers
//!
//! Encoders pull frames by time from a [`FrameSource`]. They decide the call
//! order and may call from several threads.

use crate::config::Resolution;
use crate::error::{Result, StripError};
use crate::strip::{Frame, FrameSynthesizer};
use rayon::prelude::*;
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Time-keyed frame generation
pub trait FrameSource: Sync {
    fn frame_at(&self, t: f64) -> Frame;
}

impl FrameSource for FrameSynthesizer {
    fn frame_at(&self, t: f64) -> Frame {
        self.synthesize(t)
    }
}

/// What to encode
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub output: PathBuf,
    pub duration_secs: f64,
    pub frame_rate: u32,
    pub resolution: Resolution,
    /// Audio file to multiplex as the soundtrack
    pub audio_track: Option<PathBuf>,
}

impl EncodeJob {
    /// `ceil(duration * frame_rate)`
    pub fn frame_count(&self) -> u64 {
        (self.duration_secs.max(0.0) * self.frame_rate as f64).ceil() as u64
    }

    /// Sample time for frame `index`, the middle of its display interval
    ///
    /// `floor(frame_time(i) * frame_rate)` is exactly `i`, which a time on
    /// the interval boundary cannot guarantee after float rounding.
    pub fn frame_time(&self, index: u64) -> f64 {
        (index as f64 + 0.5) / self.frame_rate as f64
    }
}

/// A video writer
pub trait VideoEncoder {
    fn name(&self) -> &str;

    /// Encode every frame of the job; returns the number of frames written
    ///
    /// On failure no partial output is left behind.
    fn encode(&self, source: &dyn FrameSource, job: &EncodeJob) -> Result<u64>;
}

/// Remove a partially written output, logging rather than failing
fn remove_partial(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
    }
}

/// Modification time of an existing output, if any
fn output_stamp(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Streams raw RGB frames into an ffmpeg process
pub struct FfmpegEncoder {
    program: PathBuf,
    video_codec: String,
    audio_codec: String,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = codec.into();
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = codec.into();
        self
    }

    /// ffmpeg command line for a job
    pub fn command(&self, job: &EncodeJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(job.resolution.to_string())
            .arg("-r")
            .arg(job.frame_rate.to_string())
            .args(["-i", "-"]);

        if let Some(audio) = &job.audio_track {
            cmd.arg("-i")
                .arg(audio)
                .args(["-map", "0:v:0", "-map", "1:a:0"])
                .arg("-c:a")
                .arg(&self.audio_codec)
                .arg("-shortest");
        }

        // yuv420p needs even dimensions
        cmd.args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .arg("-c:v")
            .arg(&self.video_codec)
            .args(["-pix_fmt", "yuv420p"])
            .arg(&job.output);
        cmd
    }

    fn write_frames<W: Write>(
        &self,
        writer: W,
        source: &dyn FrameSource,
        job: &EncodeJob,
    ) -> std::io::Result<u64> {
        let mut writer = BufWriter::new(writer);
        let total = job.frame_count();
        let report_every = (job.frame_rate as u64 * 10).max(1);

        for index in 0..total {
            let frame = source.frame_at(job.frame_time(index));
            writer.write_all(frame.as_raw())?;
            if (index + 1) % report_every == 0 {
                debug!("Encoded {} / {} frames", index + 1, total);
            }
        }
        writer.flush()?;
        Ok(total)
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn encode(&self, source: &dyn FrameSource, job: &EncodeJob) -> Result<u64> {
        info!(
            "Writing {} ({} frames @ {}fps, {})",
            job.output.display(),
            job.frame_count(),
            job.frame_rate,
            job.resolution
        );

        let previous = output_stamp(&job.output);

        let mut child = self
            .command(job)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StripError::encoding(format!(
                    "failed to start '{}': {}",
                    self.program.display(),
                    e
                ))
            })?;

        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut log = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut log);
            }
            log
        });

        let written = match child.stdin.take() {
            Some(stdin) => self.write_frames(stdin, source, job),
            None => Err(std::io::Error::other("ffmpeg stdin unavailable")),
        };

        let status = child.wait();
        let log = stderr_reader.join().unwrap_or_default();

        match (written, status) {
            (Ok(frames), Ok(status)) if status.success() => {
                info!("Video written: {}", job.output.display());
                Ok(frames)
            }
            (written, status) => {
                // A file ffmpeg never opened is not ours to delete
                if previous.is_none() || output_stamp(&job.output) != previous {
                    remove_partial(&job.output);
                }
                let reason = match (written, status) {
                    (_, Ok(status)) if !status.success() => format!("ffmpeg {}", status),
                    (Err(e), _) => format!("writing frames: {}", e),
                    (_, Err(e)) => format!("waiting for ffmpeg: {}", e),
                    _ => "unknown failure".to_string(),
                };
                let log = log.trim();
                if log.is_empty() {
                    Err(StripError::encoding(reason))
                } else {
                    Err(StripError::encoding(format!("{}: {}", reason, log)))
                }
            }
        }
    }
}

/// Writes one PNG per frame into a directory
///
/// Frames are pulled in parallel and out of order. The soundtrack is not
/// written.
#[derive(Debug, Default)]
pub struct PngSequenceEncoder;

impl PngSequenceEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("frame_{:06}.png", index))
    }
}

impl VideoEncoder for PngSequenceEncoder {
    fn name(&self) -> &str {
        "png"
    }

    fn encode(&self, source: &dyn FrameSource, job: &EncodeJob) -> Result<u64> {
        let dir = &job.output;
        let created = !dir.exists();
        fs::create_dir_all(dir)
            .map_err(|e| StripError::encoding(format!("creating {}: {}", dir.display(), e)))?;

        if job.audio_track.is_some() {
            debug!("PNG sequence output has no soundtrack; audio track ignored");
        }

        let total = job.frame_count();
        info!("Writing {} PNG frames to {}", total, dir.display());

        let done = AtomicU64::new(0);
        let result = (0..total).into_par_iter().try_for_each(|index| {
            let frame = source.frame_at(job.frame_time(index));
            frame
                .save(Self::frame_path(dir, index))
                .map_err(|e| StripError::encoding(format!("frame {}: {}", index, e)))?;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if n % 1000 == 0 {
                debug!("Wrote {} / {} frames", n, total);
            }
            Ok(())
        });

        match result {
            Ok(()) => Ok(total),
            Err(e) => {
                if created {
                    remove_partial(dir);
                }
                Err(e)
            }
        }
    }
}
