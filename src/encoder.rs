//! External encoder process: argument construction and streaming frame input.
//!
//! Frames are PNG images written back to back into the encoder's stdin
//! (`image2pipe`). Writes complete only once the pipe has accepted every
//! byte, so a slow encoder throttles frame capture instead of frames
//! piling up in memory.

use crate::{Error, Result, Viewport};
use log::debug;
use serde::Deserialize;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

/// Encoder program and codec configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Encoder executable, looked up on `PATH` when not absolute
    pub program: PathBuf,
    pub video_codec: String,
    pub pixel_format: String,
    pub crf: u32,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Output container, also used as the file extension
    pub container: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            crf: 18,
            preset: "slow".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            container: "mp4".to_string(),
        }
    }
}

/// A fully resolved encoder command line
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub output: PathBuf,
    pub has_audio: bool,
}

impl EncoderInvocation {
    /// Build the command line for one render.
    ///
    /// `audio` must already be checked for existence; when present it is read
    /// as a second input and the output is cut to the shorter stream.
    pub fn new(
        settings: &EncoderSettings,
        frame_rate: u32,
        viewport: Viewport,
        audio: Option<&Path>,
        output: &Path,
    ) -> Self {
        let rate = frame_rate.to_string();
        let mut args: Vec<OsString> = Vec::with_capacity(32);
        let mut push = |arg: &str| args.push(OsString::from(arg));

        push("-y");
        push("-f");
        push("image2pipe");
        push("-framerate");
        push(&rate);
        push("-i");
        push("-");
        if let Some(audio) = audio {
            args.push(OsString::from("-i"));
            args.push(audio.as_os_str().to_os_string());
        }

        let crf = settings.crf.to_string();
        let scale = format!("scale={}:{}", viewport.width, viewport.height);
        let mut push = |arg: &str| args.push(OsString::from(arg));
        push("-c:v");
        push(&settings.video_codec);
        push("-pix_fmt");
        push(&settings.pixel_format);
        push("-crf");
        push(&crf);
        push("-preset");
        push(&settings.preset);
        if audio.is_some() {
            push("-c:a");
            push(&settings.audio_codec);
            push("-b:a");
            push(&settings.audio_bitrate);
            push("-shortest");
        }
        push("-vf");
        push(&scale);
        push("-r");
        push(&rate);
        args.push(output.as_os_str().to_os_string());

        Self {
            program: settings.program.clone(),
            args,
            output: output.to_path_buf(),
            has_audio: audio.is_some(),
        }
    }

    /// Arguments as lossy strings, for logging and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }
}

/// A running encoder owned by exactly one render unit
#[allow(async_fn_in_trait)]
pub trait EncoderProcess {
    /// Write one encoded frame; resolves once the input stream took every byte.
    async fn write_frame(&mut self, index: u64, frame: &[u8]) -> Result<()>;

    /// Signal end-of-input.
    async fn close_input(&mut self) -> Result<()>;

    /// Wait for the process to exit; a non-zero status is an error.
    async fn wait(self) -> Result<()>
    where
        Self: Sized;
}

/// Starts encoder processes
pub trait EncoderLauncher {
    type Process: EncoderProcess;

    fn launch(&self, invocation: &EncoderInvocation) -> Result<Self::Process>;
}

/// Launches the system `ffmpeg` (or whatever `EncoderSettings::program` names)
#[derive(Debug, Clone, Default)]
pub struct FfmpegLauncher {
    settings: EncoderSettings,
}

impl FfmpegLauncher {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }
}

impl EncoderLauncher for FfmpegLauncher {
    type Process = FfmpegProcess;

    fn launch(&self, invocation: &EncoderInvocation) -> Result<FfmpegProcess> {
        debug!(
            "spawning {} {}",
            invocation.program.display(),
            invocation.args_lossy().join(" ")
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    Error::EncoderSpawn(format!(
                        "{} was not found. Install ffmpeg and make sure it is on PATH",
                        invocation.program.display()
                    ))
                } else {
                    Error::EncoderSpawn(format!("{}: {}", invocation.program.display(), e))
                }
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::EncoderSpawn("failed to capture encoder stdin".into()))?;

        Ok(FfmpegProcess { child, stdin: Some(stdin) })
    }
}

/// Handle to a spawned encoder. Dropping it before `wait` kills the child.
pub struct FfmpegProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl EncoderProcess for FfmpegProcess {
    async fn write_frame(&mut self, index: u64, frame: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| Error::EncoderWrite {
            frame: index,
            source: std::io::Error::new(ErrorKind::BrokenPipe, "encoder input already closed"),
        })?;
        let Err(source) = stdin.write_all(frame).await else {
            return Ok(());
        };

        // A closed pipe usually means the encoder already quit; its exit
        // status says more than the broken pipe does.
        drop(self.stdin.take());
        match self.child.wait().await {
            Ok(status) if !status.success() => Err(Error::EncoderExit { code: status.code() }),
            _ => Err(Error::EncoderWrite { frame: index, source }),
        }
    }

    async fn close_input(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().await?;
            stdin.shutdown().await?;
        }
        Ok(())
    }

    async fn wait(mut self) -> Result<()> {
        // Make sure the encoder sees EOF even if close_input was skipped.
        drop(self.stdin.take());

        let status = self.child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::EncoderExit { code: status.code() })
        }
    }
}
