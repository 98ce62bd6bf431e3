use std::{
    path::{Component, Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use uuid::Uuid;

/// Default directory for downloads, keyframes and reports.
pub fn default_output_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("hookscan")
}

/// Collision-resistant tag: epoch millis plus a short random suffix.
pub fn artifact_tag() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", millis, &suffix[..8])
}

/// Where a remote video is downloaded to
pub fn download_path(output_dir: &Path, tag: &str) -> PathBuf {
    output_dir.join(format!("youtube_{}.mp4", tag))
}

/// Waveform path derived from the media path: same base name, `.wav` extension.
///
/// A source that already is a `.wav` gets a `_audio` suffix so the temporary
/// waveform never aliases the source file.
pub fn audio_path(media_path: &Path) -> PathBuf {
    let candidate = media_path.with_extension("wav");
    if candidate != media_path {
        return candidate;
    }

    let stem = media_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    media_path.with_file_name(format!("{}_audio.wav", stem))
}

pub fn frames_dir(output_dir: &Path, tag: &str) -> PathBuf {
    output_dir.join(format!("frames_{}", tag))
}

pub fn report_path(output_dir: &Path, tag: &str) -> PathBuf {
    output_dir.join(format!("analysis_{}.xlsx", tag))
}

/// `path` relative to `base`, `/`-separated. Falls back to the full path when
/// `path` lives outside `base`.
pub fn relative_path(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::RootDir => Some(String::new()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
