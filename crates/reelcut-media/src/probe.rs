//! FFprobe media information.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use reelcut_models::{AudioTrack, VideoAsset};

use crate::command::{check_ffprobe, stderr_tail};
use crate::error::{MediaError, MediaResult};

/// Fallback frame rate when the container reports none.
const FALLBACK_FPS: f64 = 30.0;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Probe a video file.
///
/// Missing files, files FFprobe cannot parse and files without a video
/// stream all fail with [`MediaError::SourceUnreadable`].
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoAsset> {
    let path = path.as_ref();
    let probe = run_ffprobe(path).await?;
    video_asset_from_probe(path, &probe)
}

/// Probe an audio file (or the audio stream of any container).
pub async fn probe_audio(path: impl AsRef<Path>) -> MediaResult<AudioTrack> {
    let path = path.as_ref();
    let probe = run_ffprobe(path).await?;
    audio_track_from_probe(path, &probe)
}

async fn run_ffprobe(path: &Path) -> MediaResult<FfprobeOutput> {
    if !path.exists() {
        return Err(MediaError::source_unreadable(path, "file not found"));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::source_unreadable(
            path,
            format!(
                "ffprobe failed: {}",
                stderr_tail(&String::from_utf8_lossy(&output.stderr))
            ),
        ));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::source_unreadable(path, format!("unparseable ffprobe output: {}", e)))
}

fn video_asset_from_probe(path: &Path, probe: &FfprobeOutput) -> MediaResult<VideoAsset> {
    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::source_unreadable(path, "no video stream found"))?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let duration = container_duration(probe)
        .or_else(|| parse_seconds(video_stream.duration.as_deref()))
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(FALLBACK_FPS);

    let frame_count = video_stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration * fps).round().max(0.0) as u64);

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::source_unreadable(path, "video stream has no dimensions"));
    }

    Ok(VideoAsset {
        path: path.to_path_buf(),
        duration,
        fps,
        width,
        height,
        frame_count,
        has_audio,
    })
}

fn audio_track_from_probe(path: &Path, probe: &FfprobeOutput) -> MediaResult<AudioTrack> {
    let audio_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or_else(|| MediaError::source_unreadable(path, "no audio stream found"))?;

    let duration = parse_seconds(audio_stream.duration.as_deref())
        .or_else(|| container_duration(probe))
        .unwrap_or(0.0);

    Ok(AudioTrack::new(path, duration))
}

fn container_duration(probe: &FfprobeOutput) -> Option<f64> {
    probe
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FfprobeOutput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_video_asset_from_probe() {
        let probe = parse(
            r#"{
                "format": {"duration": "10.000000"},
                "streams": [
                    {"codec_type": "video", "width": 1920, "height": 1080,
                     "avg_frame_rate": "30/1", "r_frame_rate": "30/1", "nb_frames": "300"},
                    {"codec_type": "audio"}
                ]
            }"#,
        );
        let asset = video_asset_from_probe(Path::new("in.mp4"), &probe).unwrap();
        assert_eq!(asset.width, 1920);
        assert_eq!(asset.frame_count, 300);
        assert!(asset.has_audio);
        assert!((asset.duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_count_estimated_without_nb_frames() {
        let probe = parse(
            r#"{
                "format": {"duration": "4.0"},
                "streams": [{"codec_type": "video", "width": 64, "height": 64, "avg_frame_rate": "0/0", "r_frame_rate": "25/1"}]
            }"#,
        );
        let asset = video_asset_from_probe(Path::new("in.webm"), &probe).unwrap();
        assert!((asset.fps - 25.0).abs() < 1e-9);
        assert_eq!(asset.frame_count, 100);
        assert!(!asset.has_audio);
    }

    #[test]
    fn test_missing_streams_are_unreadable() {
        let probe = parse(r#"{"format": {"duration": "3.0"}, "streams": [{"codec_type": "audio"}]}"#);
        let err = video_asset_from_probe(Path::new("a.mp3"), &probe).unwrap_err();
        assert!(matches!(err, MediaError::SourceUnreadable { .. }));

        let audio = audio_track_from_probe(Path::new("a.mp3"), &probe).unwrap();
        assert!((audio.duration - 3.0).abs() < 1e-9);
        assert_eq!(audio.gain, 1.0);

        let probe = parse(r#"{"streams": [{"codec_type": "video", "width": 2, "height": 2}]}"#);
        assert!(audio_track_from_probe(Path::new("v.mp4"), &probe).is_err());
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_video("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::SourceUnreadable { .. }));
    }
}
