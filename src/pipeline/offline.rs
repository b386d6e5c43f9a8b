//! Offline renderer - audio file in, strip video out

use crate::audio::{decode_file, DecodedAudio};
use crate::config::RenderConfig;
use crate::error::{Result, StripError};
use crate::output::{EncodeJob, VideoEncoder};
use crate::strip::{ColorTrack, FrameSynthesizer};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

/// Offline render stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Idle,
    Decoding,
    ColorConverting,
    Encoding,
    Done,
    Failed,
}

/// Summary of a finished render
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub output: PathBuf,
    pub frames: u64,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub malformed_samples: usize,
    pub silent: bool,
}

/// Drives decode, color conversion and encoding for one file
pub struct OfflineRenderer {
    config: RenderConfig,
    stage: RenderStage,
}

impl OfflineRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            stage: RenderStage::Idle,
        }
    }

    pub fn stage(&self) -> RenderStage {
        self.stage
    }

    /// Render `input` into `output`
    ///
    /// With `mux_audio` the input file is also passed to the encoder as the
    /// soundtrack. Any failure aborts the whole render; the encoder removes
    /// what it had written.
    pub fn render_file(
        &mut self,
        input: &Path,
        output: &Path,
        encoder: &dyn VideoEncoder,
        mux_audio: bool,
    ) -> Result<RenderReport> {
        let started = Instant::now();
        let result = check_output_dir(output).and_then(|()| {
            self.enter(RenderStage::Decoding);
            decode_file(input)
        });
        let audio = self.track_failure(result)?;

        let soundtrack = mux_audio.then(|| input.to_path_buf());
        let report = self.render_audio(audio, output, encoder, soundtrack)?;

        info!(
            "Rendered {} -> {} in {:.1}s",
            input.display(),
            output.display(),
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    /// Render already decoded audio
    pub fn render_audio(
        &mut self,
        audio: DecodedAudio,
        output: &Path,
        encoder: &dyn VideoEncoder,
        soundtrack: Option<PathBuf>,
    ) -> Result<RenderReport> {
        let result = self.config.with_sample_rate(audio.sample_rate);
        let config = self.track_failure(result)?;

        self.enter(RenderStage::ColorConverting);
        let track = ColorTrack::from_samples(&audio.samples, config.color_mode());
        let malformed = track.malformed();
        let synth = FrameSynthesizer::new(track, config);
        debug!(
            "{} colors, {} per frame, window {} blocks",
            synth.track().len(),
            config.samples_per_frame(),
            config.max_blocks()
        );

        self.enter(RenderStage::Encoding);
        let job = EncodeJob {
            output: output.to_path_buf(),
            duration_secs: audio.duration_secs(),
            frame_rate: config.frame_rate(),
            resolution: config.resolution(),
            audio_track: soundtrack,
        };
        info!("Encoding {} frames with {}", job.frame_count(), encoder.name());
        let result = encoder.encode(&synth, &job);
        let frames = self.track_failure(result)?;

        self.enter(RenderStage::Done);
        Ok(RenderReport {
            output: job.output,
            frames,
            duration_secs: job.duration_secs,
            sample_rate: config.sample_rate(),
            malformed_samples: malformed,
            silent: audio.silent,
        })
    }

    fn enter(&mut self, stage: RenderStage) {
        debug!("Render stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    fn track_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!("Render failed during {:?}: {}", self.stage, e);
            self.stage = RenderStage::Failed;
        }
        result
    }
}

/// The output's parent directory must exist before any work starts
fn check_output_dir(output: &Path) -> Result<()> {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(StripError::encoding(format!(
                "output directory {} does not exist",
                parent.display()
            )))
        }
        _ => Ok(()),
    }
}
