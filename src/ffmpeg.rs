use crate::error::AppError;
use lazy_static::lazy_static;
use std::path::Path;
use std::process::Command;

lazy_static! {
    /// Probed once per process; the result never changes at runtime.
    static ref FFMPEG_AVAILABLE: bool = probe_ffmpeg();
}

fn probe_ffmpeg() -> bool {
    match Command::new("ffmpeg").arg("-version").output() {
        Ok(out) if out.status.success() => {
            log::info!("ffmpeg found; video thumbnails enabled");
            true
        }
        _ => {
            log::warn!("ffmpeg not found on PATH; video thumbnails degrade to a placeholder");
            false
        }
    }
}

pub fn backend_available() -> bool {
    *FFMPEG_AVAILABLE
}

/// Decode only the first frame of a video, returned as PNG bytes over a
/// pipe. PNG keeps the frame's pixel format tagged, so channel ordering is
/// the decoder's problem rather than ours.
pub fn first_frame_png(path: &Path) -> Result<Vec<u8>, AppError> {
    if !backend_available() {
        return Err(AppError::BackendUnavailable);
    }

    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
        .output()
        .map_err(|e| AppError::Decode {
            path: path.to_path_buf(),
            reason: format!("could not run ffmpeg: {}", e),
        })?;

    if !output.status.success() || output.stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Decode {
            path: path.to_path_buf(),
            reason: format!("ffmpeg could not read a frame: {}", stderr.trim()),
        });
    }

    Ok(output.stdout)
}
