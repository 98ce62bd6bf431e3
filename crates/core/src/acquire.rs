use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, info};

use crate::{
    error::{AnalysisError, Result},
    storage::download_path,
    types::AnalysisRequest,
};

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` into `destination`, returning the path actually written.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf>;
}

/// Downloads through the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf> {
        debug!(url, destination = %destination.display(), "running yt-dlp");
        let output = Command::new(&self.program)
            .arg(url)
            .arg("--no-playlist")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("-f")
            .arg("mp4/best")
            .arg("-o")
            .arg(destination)
            .output()
            .await
            .map_err(|e| AnalysisError::Acquisition {
                source_id: url.to_string(),
                reason: format!("failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(AnalysisError::Acquisition {
                source_id: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout_str = String::from_utf8_lossy(output.stdout.as_slice());
        let printed = stdout_str.trim();
        if printed.is_empty() {
            Ok(destination.to_path_buf())
        } else {
            Ok(PathBuf::from(printed))
        }
    }
}

/// Resolve a request into a local media file.
///
/// Uploads are used in place. URLs are fetched into `output_dir` under a name
/// derived from `tag`, and the download must leave a non-empty file behind.
pub async fn acquire(
    request: &AnalysisRequest,
    downloader: &dyn Downloader,
    output_dir: &Path,
    tag: &str,
) -> Result<PathBuf> {
    match request {
        AnalysisRequest::Upload(path) => {
            info!(path = %path.display(), "using uploaded file");
            Ok(path.clone())
        }
        AnalysisRequest::Url(url) => {
            fs::create_dir_all(output_dir)
                .await
                .map_err(|e| AnalysisError::Acquisition {
                    source_id: url.clone(),
                    reason: format!("cannot create {}: {}", output_dir.display(), e),
                })?;

            let destination = download_path(output_dir, tag);
            info!(url, destination = %destination.display(), "downloading video");
            let written = downloader.fetch(url, &destination).await?;

            match fs::metadata(&written).await {
                Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(written),
                _ => Err(AnalysisError::Acquisition {
                    source_id: url.clone(),
                    reason: format!("download produced no file at {}", written.display()),
                }),
            }
        }
    }
}
