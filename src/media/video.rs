//! Still frames from generated videos, decoded with the `ffmpeg` tools.

use crate::{
    error::{BedrockError, Result},
    media::codec::{encode_jpeg, load_image, JPEG_QUALITY},
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct ThumbnailExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for ThumbnailExtractor {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl ThumbnailExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// JPEG of the first frame at or after `timestamp_seconds` in the first
    /// video stream, or `None` when nothing decodes from there on.
    pub fn extract(
        &self,
        video_bytes: &[u8],
        timestamp_seconds: f64,
    ) -> Result<Option<Vec<u8>>> {
        let mut scratch = tempfile::Builder::new()
            .prefix("rgenmedia-")
            .suffix(".mp4")
            .tempfile()
            .map_err(|e| media_error("Failed to create scratch file", e))?;
        scratch
            .write_all(video_bytes)
            .and_then(|_| scratch.flush())
            .map_err(|e| media_error("Failed to write scratch file", e))?;

        let result = self.extract_from_path(scratch.path(), timestamp_seconds);

        // Removal is best-effort; a leftover temp file is harmless.
        if let Err(e) = scratch.close() {
            log::debug!("Could not remove scratch video: {}", e);
        }
        result
    }

    fn extract_from_path(&self, path: &Path, timestamp_seconds: f64) -> Result<Option<Vec<u8>>> {
        let info = self.stream_info(path)?;
        let Some(fps) = info.frame_rate else {
            log::debug!("No decodable video stream in {}", path.display());
            return Ok(None);
        };
        let seek = seek_position(timestamp_seconds, fps);
        if info.duration.is_some_and(|duration| seek >= duration) {
            log::debug!("{:.3}s is past the end of {}", seek, path.display());
            return Ok(None);
        }

        let output = Command::new(&self.ffmpeg)
            .arg("-loglevel")
            .arg("error")
            .arg("-ss")
            .arg(format!("{:.6}", seek))
            .arg("-i")
            .arg(path)
            .arg("-map")
            .arg("0:v:0")
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("png")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| media_error("Failed to run ffmpeg", e))?;

        if !output.status.success() {
            return Err(BedrockError::MediaError(format!(
                "ffmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        // Containers without a usable duration end up here when seeking past the last frame.
        if output.stdout.is_empty() {
            return Ok(None);
        }

        let frame = load_image(&output.stdout)?;
        encode_jpeg(&frame, JPEG_QUALITY).map(Some)
    }

    fn stream_info(&self, path: &Path) -> Result<StreamInfo> {
        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=avg_frame_rate:format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| media_error("Failed to run ffprobe", e))?;

        if !output.status.success() {
            return Err(BedrockError::MediaError(format!(
                "ffprobe could not read the video: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(StreamInfo::parse(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// What ffprobe reports about the first video stream and its container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamInfo {
    /// `None` when the file has no video stream.
    pub frame_rate: Option<f64>,
    pub duration: Option<f64>,
}

impl StreamInfo {
    /// Parses `key=value` lines as printed by `-of default=noprint_wrappers=1`.
    pub fn parse(raw: &str) -> Self {
        let mut info = Self::default();
        for line in raw.lines() {
            match line.trim().split_once('=') {
                Some(("avg_frame_rate", value)) => info.frame_rate = parse_frame_rate(value),
                Some(("duration", value)) => {
                    info.duration = value
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|d| d.is_finite() && *d > 0.0);
                }
                _ => {}
            }
        }
        info
    }
}

pub fn extract_thumbnail(video_bytes: &[u8], timestamp_seconds: f64) -> Result<Option<Vec<u8>>> {
    ThumbnailExtractor::default().extract(video_bytes, timestamp_seconds)
}

/// Parses ffprobe rates such as `24/1` or `30000/1001`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Start of the frame `floor(timestamp * fps)`, in seconds.
pub fn seek_position(timestamp_seconds: f64, fps: f64) -> f64 {
    let target_frame = (timestamp_seconds.max(0.0) * fps).floor();
    target_frame / fps
}

fn media_error(context: &str, e: std::io::Error) -> BedrockError {
    BedrockError::MediaError(format!("{}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools_available() -> bool {
        ["ffmpeg", "ffprobe"].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    /// Renders an ffmpeg lavfi source into a file with the given suffix.
    fn render(suffix: &str, args: &[&str]) -> Vec<u8> {
        let out = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        let status = Command::new("ffmpeg")
            .args(["-loglevel", "error", "-y"])
            .args(args)
            .arg(out.path())
            .stdin(Stdio::null())
            .status()
            .unwrap();
        assert!(status.success(), "ffmpeg could not render {}", suffix);
        std::fs::read(out.path()).unwrap()
    }

    fn one_second_clip() -> Vec<u8> {
        render(
            ".mp4",
            &[
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=1:size=64x48:rate=24",
                "-c:v",
                "mpeg4",
                "-pix_fmt",
                "yuv420p",
            ],
        )
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("24/1"), Some(24.0));
        assert_eq!(parse_frame_rate(" 25 \n"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("N/A"), None);
        assert_eq!(parse_frame_rate(""), None);
    }

    #[test]
    fn test_stream_info_parse() {
        let info = StreamInfo::parse("avg_frame_rate=24/1\nduration=1.000000\n");
        assert_eq!(info.frame_rate, Some(24.0));
        assert_eq!(info.duration, Some(1.0));

        let audio_only = StreamInfo::parse("duration=1.000000\n");
        assert_eq!(audio_only.frame_rate, None);

        let unknown_length = StreamInfo::parse("avg_frame_rate=30/1\nduration=N/A\n");
        assert_eq!(unknown_length.frame_rate, Some(30.0));
        assert_eq!(unknown_length.duration, None);
    }

    #[test]
    fn test_seek_position_snaps_to_frame_start() {
        assert_eq!(seek_position(0.0, 24.0), 0.0);
        assert_eq!(seek_position(1.0, 24.0), 1.0);
        assert_eq!(seek_position(0.05, 24.0), 1.0 / 24.0);
        assert_eq!(seek_position(-3.0, 24.0), 0.0);
    }

    #[test]
    fn test_missing_tools_are_reported() {
        let extractor = ThumbnailExtractor::with_binaries(
            "/nonexistent/ffmpeg-for-tests",
            "/nonexistent/ffprobe-for-tests",
        );
        let err = extractor
            .extract(b"\x00\x00\x00\x18ftypmp42", 0.0)
            .unwrap_err();
        assert!(err.to_string().contains("ffprobe"));
    }

    #[test]
    fn test_extract_frame_from_clip() {
        if !tools_available() {
            eprintln!("ffmpeg/ffprobe not installed, skipping");
            return;
        }
        let clip = one_second_clip();

        let jpeg = extract_thumbnail(&clip, 0.5).unwrap().unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let frame = load_image(&jpeg).unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));

        assert!(extract_thumbnail(&clip, 0.0).unwrap().is_some());
    }

    #[test]
    fn test_extract_past_end_is_none() {
        if !tools_available() {
            eprintln!("ffmpeg/ffprobe not installed, skipping");
            return;
        }
        let clip = one_second_clip();

        assert_eq!(extract_thumbnail(&clip, 5.0).unwrap(), None);
    }

    #[test]
    fn test_extract_without_video_stream_is_none() {
        if !tools_available() {
            eprintln!("ffmpeg/ffprobe not installed, skipping");
            return;
        }
        let audio = render(
            ".wav",
            &[
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=440:duration=1",
                "-c:a",
                "pcm_s16le",
            ],
        );

        assert_eq!(extract_thumbnail(&audio, 0.0).unwrap(), None);
    }
}
