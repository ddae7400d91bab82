//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use reelcut_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::metric_names;

/// Lines of FFmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 12;

/// One `-i` input and the arguments placed before it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands.
///
/// Input-side helpers (`seek`, `duration`, `input_format`, `input_arg`)
/// apply to the most recently added input.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<FfmpegInput>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command with a single input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![FfmpegInput {
                args: Vec::new(),
                path: input.as_ref().to_path_buf(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add another input. Following input-side helpers apply to it.
    pub fn add_input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(FfmpegInput {
            args: Vec::new(),
            path: input.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an argument before the current input's `-i`.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(current) = self.inputs.last_mut() {
            current.args.push(arg.into());
        }
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek the current input (accurate when transcoding).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Limit how much of the current input is read.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Force the demuxer of the current input (e.g. `f32le`).
    pub fn input_format(self, format: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg(format)
    }

    /// Limit output duration.
    pub fn output_duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Select a stream for the output (`0:v:0`, `1:a:0`, ...).
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Apply the fixed video profile.
    pub fn video_encoding(self, encoding: &EncodingConfig) -> Self {
        self.output_args(encoding.video_args())
    }

    /// Apply the fixed audio profile.
    pub fn audio_encoding(self, encoding: &EncodingConfig) -> Self {
        self.output_args(encoding.audio_args())
    }

    /// Drop audio from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Drop video from the output.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Emit raw packed RGB frames.
    pub fn raw_rgb_output(self) -> Self {
        self.output_args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
    }

    /// Emit raw interleaved f32 PCM.
    pub fn raw_pcm_output(self, sample_rate: u32, channels: u16) -> Self {
        self.output_args([
            "-f".to_string(),
            "f32le".to_string(),
            "-acodec".to_string(),
            "pcm_f32le".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-ac".to_string(),
            channels.to_string(),
        ])
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Output path (or pipe target).
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// First input path.
    pub fn primary_input(&self) -> &Path {
        self.inputs
            .first()
            .map(|i| i.path.as_path())
            .unwrap_or_else(|| Path::new(""))
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-nostdin".to_string());

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with an optional timeout.
///
/// Children are killed if their handle is dropped, so an abandoned future
/// never leaves an orphaned encoder behind.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn command(&self, cmd: &FfmpegCommand) -> MediaResult<Command> {
        check_ffmpeg()?;
        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));
        metrics::counter!(metric_names::FFMPEG_INVOCATIONS_TOTAL).increment(1);

        let mut command = Command::new("ffmpeg");
        command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
        Ok(command)
    }

    /// Run an encode. Failures are reported as [`MediaError::EncodeFailure`]
    /// carrying the command's output path.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let mut child = self
            .command(cmd)?
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let status = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds, killing process", secs);
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(secs));
                }
            },
            None => child.wait().await?,
        };

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::encode_failure(
                cmd.output_path(),
                format!(
                    "ffmpeg exited with status {:?}: {}",
                    status.code(),
                    stderr_tail(&stderr)
                ),
            ))
        }
    }

    /// Run a decode and collect stdout. Failures are attributed to the
    /// primary input as [`MediaError::SourceUnreadable`].
    pub async fn capture(&self, cmd: &FfmpegCommand) -> MediaResult<Vec<u8>> {
        let mut command = self.command(cmd)?;
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let output_future = command.output();

        let output = match self.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), output_future)
                .await
                .map_err(|_| MediaError::Timeout(secs))??,
            None => output_future.await?,
        };

        if !output.status.success() {
            return Err(MediaError::source_unreadable(
                cmd.primary_input(),
                stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            ));
        }

        Ok(output.stdout)
    }

    /// Spawn a decode whose stdout is consumed incrementally.
    pub fn spawn_reader(&self, cmd: &FfmpegCommand) -> MediaResult<Child> {
        Ok(self
            .command(cmd)?
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?)
    }
}

/// Last few lines of FFmpeg's stderr.
pub(crate) fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .video_codec("libx264");

        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < i, "seek must precede the input");
        assert_eq!(args[ss + 1], "10.000");
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_input_args_follow_their_input() {
        let cmd = FfmpegCommand::new("video.mp4", "out.mp4")
            .add_input("mix.raw")
            .input_format("f32le")
            .map("0:v:0")
            .map("1:a:0");

        let args = cmd.build_args();
        let first_i = args.iter().position(|a| a == "video.mp4").unwrap();
        let f = args.iter().position(|a| a == "f32le").unwrap();
        let second_i = args.iter().position(|a| a == "mix.raw").unwrap();
        assert!(first_i < f && f < second_i);
        assert_eq!(cmd.primary_input(), Path::new("video.mp4"));
    }

    #[test]
    fn test_raw_outputs() {
        let args = FfmpegCommand::new("a.mp4", "pipe:1").raw_rgb_output().build_args();
        assert!(args.windows(2).any(|w| w[0] == "-pix_fmt" && w[1] == "rgb24"));

        let args = FfmpegCommand::new("a.mp3", "pipe:1")
            .raw_pcm_output(48_000, 2)
            .build_args();
        assert!(args.windows(2).any(|w| w[0] == "-ar" && w[1] == "48000"));
        assert!(args.windows(2).any(|w| w[0] == "-ac" && w[1] == "2"));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let long: String = (0..40).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&long);
        assert!(tail.starts_with("line 28"));
        assert!(tail.ends_with("line 39"));
    }
}
