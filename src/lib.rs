//! Scenereel
//!
//! Renders animated HTML scenes into video files. Each scene is loaded into
//! an off-screen browser surface, its animation timeline is frozen and then
//! seeked frame by frame, and every captured PNG is streamed into an external
//! encoder (`ffmpeg`) that muxes the frames with an optional audio track.
//!
//! # Features
//!
//! - **CDP Backend** (default): headless Chrome via the DevTools protocol
//! - **Explicit configuration**: content/format tables and the frame rate are
//!   passed into the pipeline rather than read from globals
//! - **Swappable collaborators**: surfaces and encoders sit behind traits, so
//!   the frame loop can run against fakes in tests
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use scenereel::cdp::{CdpOptions, CdpProvider};
//! use scenereel::encoder::FfmpegLauncher;
//! use scenereel::RenderConfig;
//!
//! let config = RenderConfig::default().with_base_dir("scenes");
//! let units = config.plan(Some("en"), Some("1x1"))?;
//!
//! let provider = CdpProvider::new(CdpOptions::default());
//! let launcher = FfmpegLauncher::new(config.settings.encoder.clone());
//! let report = scenereel::run(&units, &config.settings, &provider, &launcher).await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, FilterKind, Result};

pub mod config;
pub use config::{ContentSource, OutputFormat, RenderConfig, RenderJob, RenderUnit};

pub mod timeline;
pub use timeline::{Frame, FrameSchedule};

pub mod encoder;
pub use encoder::{EncoderInvocation, EncoderLauncher, EncoderProcess, EncoderSettings};

pub mod surface;
pub use surface::{Surface, SurfaceProvider};

// Async facade over a surface living on its own thread
pub mod worker;
pub use worker::SurfaceHandle;

pub mod pipeline;
pub use pipeline::{render_one, run, RenderRequest, RunReport, UnitOutcome};

#[cfg(feature = "cdp")]
pub mod cdp;

use serde::Deserialize;

/// Frame rate used when nothing else is configured
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Scene duration used when a content source does not override it
pub const DEFAULT_DURATION_SECS: f64 = 15.0;

/// Pause between document load and the first frame
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Pixel dimensions of a rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions must be non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must have positive dimensions, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Settings shared by every render unit of a run
///
/// The defaults reproduce the production renders: 30 fps, 15 s scenes,
/// a one second settle delay, the `.hint` overlay hidden, and H.264/AAC
/// output in an MP4 container.
///
/// # Examples
///
/// ```
/// let settings = scenereel::RenderSettings::default();
/// assert_eq!(settings.frame_rate, 30);
/// assert_eq!(settings.hidden_selectors, vec![".hint".to_string()]);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Frames per second of the captured timeline and the encoded output
    pub frame_rate: u32,
    /// Duration applied to sources without their own override
    pub default_duration_secs: f64,
    /// Fixed wait after the document reaches network quiescence
    pub settle_delay_ms: u64,
    /// CSS selectors hidden before capture (hint overlays and the like)
    pub hidden_selectors: Vec<String>,
    /// Encoder configuration
    pub encoder: EncoderSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            default_duration_secs: DEFAULT_DURATION_SECS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            hidden_selectors: vec![".hint".to_string()],
            encoder: EncoderSettings::default(),
        }
    }
}

impl RenderSettings {
    pub fn settle_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settle_delay_ms)
    }
}
