use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::{
    error::{AnalysisError, Result},
    types::KeyframeSet,
};

/// File name pattern of sampled frames; numbering preserves chronology.
pub const FRAME_PATTERN: &str = "frame-%04d.jpg";
const FRAME_PREFIX: &str = "frame-";

#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Duration in whole seconds; 0 when the container does not report one.
    async fn probe(&self, path: &Path) -> Result<u64>;
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Write a 16-bit PCM WAV of the audio track of `src` to `dst`.
    async fn extract_audio(&self, src: &Path, dst: &Path) -> Result<PathBuf>;

    /// Write one still per `interval_secs` into `out_dir`, returning them in order.
    async fn sample_frames(
        &self,
        src: &Path,
        out_dir: &Path,
        interval_secs: u32,
    ) -> Result<Vec<PathBuf>>;
}

/// `ffprobe`/`ffmpeg` executables.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl MediaProber for Ffmpeg {
    async fn probe(&self, path: &Path) -> Result<u64> {
        debug!(path = %path.display(), "running ffprobe");
        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await
            .map_err(|e| AnalysisError::Probe {
                media_path: path.to_path_buf(),
                reason: format!("failed to run {}: {}", self.ffprobe.display(), e),
            })?;

        if !output.status.success() {
            return Err(AnalysisError::Probe {
                media_path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_duration(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn extract_audio(&self, src: &Path, dst: &Path) -> Result<PathBuf> {
        debug!(src = %src.display(), dst = %dst.display(), "extracting audio");
        let output = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(src)
            .arg("-vn")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-f")
            .arg("wav")
            .arg(dst)
            .output()
            .await
            .map_err(|e| AnalysisError::Extraction {
                media_path: src.to_path_buf(),
                reason: format!("failed to run {}: {}", self.ffmpeg.display(), e),
            })?;

        if !output.status.success() {
            return Err(AnalysisError::Extraction {
                media_path: src.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        verify_waveform(dst).map_err(|reason| AnalysisError::Extraction {
            media_path: src.to_path_buf(),
            reason,
        })?;

        Ok(dst.to_path_buf())
    }

    async fn sample_frames(
        &self,
        src: &Path,
        out_dir: &Path,
        interval_secs: u32,
    ) -> Result<Vec<PathBuf>> {
        debug!(
            src = %src.display(),
            out_dir = %out_dir.display(),
            interval_secs,
            "sampling frames"
        );
        let output = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(src)
            .arg("-vf")
            .arg(format!("fps=1/{}", interval_secs))
            .arg("-q:v")
            .arg("2")
            .arg("-y")
            .arg(out_dir.join(FRAME_PATTERN))
            .output()
            .await
            .map_err(|e| AnalysisError::Sampling {
                media_path: src.to_path_buf(),
                reason: format!("failed to run {}: {}", self.ffmpeg.display(), e),
            })?;

        if !output.status.success() {
            return Err(AnalysisError::Sampling {
                media_path: src.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        list_frames(out_dir).await.map_err(|e| AnalysisError::Sampling {
            media_path: src.to_path_buf(),
            reason: format!("cannot list {}: {}", out_dir.display(), e),
        })
    }
}

/// Parse ffprobe's bare duration output, rounding to the nearest second.
///
/// Unknown (`N/A`, empty) or nonsensical values yield 0.
pub fn parse_duration(stdout: &str) -> u64 {
    match stdout.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => secs.round() as u64,
        _ => 0,
    }
}

/// Check that `path` is a 16-bit integer PCM WAV with one or two channels.
pub fn verify_waveform(path: &Path) -> std::result::Result<(), String> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| format!("{} is not a readable WAV file: {}", path.display(), e))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(format!(
            "expected 16-bit PCM, got {} bits ({:?})",
            spec.bits_per_sample, spec.sample_format
        ));
    }
    if !(1..=2).contains(&spec.channels) {
        return Err(format!("expected mono or stereo, got {} channels", spec.channels));
    }

    Ok(())
}

/// Frames in `dir`, in numeric (chronological) order.
pub async fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let is_frame = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(FRAME_PREFIX));
        if is_frame {
            frames.push(entry.path());
        }
    }
    frames.sort_by_cached_key(|path| (frame_number(path), path.clone()));
    Ok(frames)
}

/// Sequence number of a `frame-N.jpg` file; ffmpeg widens past four digits.
fn frame_number(path: &Path) -> Option<u64> {
    path.file_stem()?
        .to_str()?
        .strip_prefix(FRAME_PREFIX)?
        .parse()
        .ok()
}

/// Sample keyframes into a fresh `out_dir`.
pub async fn sample_keyframes(
    transcoder: &dyn Transcoder,
    src: &Path,
    out_dir: &Path,
    interval_secs: u32,
) -> Result<KeyframeSet> {
    if interval_secs == 0 {
        return Err(AnalysisError::validation(
            "keyframe interval must be a positive number of seconds",
        ));
    }

    fs::create_dir_all(out_dir)
        .await
        .map_err(|e| AnalysisError::Sampling {
            media_path: src.to_path_buf(),
            reason: format!("cannot create {}: {}", out_dir.display(), e),
        })?;

    let frames = transcoder.sample_frames(src, out_dir, interval_secs).await?;
    Ok(KeyframeSet { frames })
}
