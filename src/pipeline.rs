//! Render orchestration: one (scene × format) unit at a time.
//!
//! A unit opens a surface, loads and freezes the scene, launches the encoder
//! and then alternates seek → capture → write for every frame of the
//! schedule. Units run strictly one after another; a failed unit is reported
//! and the run moves on to the next one.

use crate::config::{self, RenderUnit};
use crate::encoder::{EncoderInvocation, EncoderLauncher, EncoderProcess};
use crate::surface::SurfaceProvider;
use crate::timeline::FrameSchedule;
use crate::worker::SurfaceHandle;
use crate::{Error, RenderSettings, Result, Viewport};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Progress is logged every this many frames
pub const PROGRESS_INTERVAL: u64 = 60;

/// True for the frames that get a progress line.
pub fn reports_progress(index: u64) -> bool {
    index % PROGRESS_INTERVAL == 0
}

/// Everything needed to render one scene into one output file
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Name used in log lines
    pub label: String,
    /// URL handed to the surface (`file://` for local scenes)
    pub document_url: String,
    pub viewport: Viewport,
    pub duration_secs: f64,
    /// Optional audio track; a path that does not exist is ignored
    pub audio: Option<PathBuf>,
    pub output: PathBuf,
}

impl RenderRequest {
    /// Build the request for a planned unit, resolving the document to a URL.
    pub fn for_unit(unit: &RenderUnit) -> Result<Self> {
        Ok(Self {
            label: unit.name(),
            document_url: document_url(&unit.job.document)?,
            viewport: unit.format.viewport(),
            duration_secs: unit.job.duration_secs,
            audio: unit.job.audio.clone(),
            output: unit.output.clone(),
        })
    }
}

/// Turn a document reference into a URL the surface can load.
///
/// URLs pass through unchanged; paths must exist and become `file://` URLs.
pub fn document_url(document: &str) -> Result<String> {
    if config::is_url(document) {
        return Ok(document.to_string());
    }

    let path = Path::new(document)
        .canonicalize()
        .map_err(|e| Error::LoadError(format!("{}: {}", document, e)))?;
    url::Url::from_file_path(&path)
        .map(String::from)
        .map_err(|_| Error::LoadError(format!("{} cannot be expressed as a file URL", path.display())))
}

/// Render one scene into one output file.
///
/// The surface is released on every exit path. On failure the encoder handle
/// is dropped, which terminates the child process; its output file may be
/// incomplete or missing.
pub async fn render_one<P, L>(
    provider: &P,
    launcher: &L,
    request: &RenderRequest,
    settings: &RenderSettings,
) -> Result<()>
where
    P: SurfaceProvider + Clone + Send + 'static,
    L: EncoderLauncher,
{
    let schedule = FrameSchedule::new(settings.frame_rate, request.duration_secs)?;
    request.viewport.validate()?;

    let audio = match &request.audio {
        Some(path) if path.exists() => Some(path.as_path()),
        Some(path) => {
            debug!("audio {} not found; rendering without audio", path.display());
            None
        }
        None => None,
    };

    info!(
        "=== {} ({}) {}s ===",
        request.label, request.viewport, request.duration_secs
    );

    let surface = SurfaceHandle::open(provider.clone(), request.viewport).await?;
    let streamed = stream_frames(&surface, launcher, request, settings, &schedule, audio).await;
    if let Err(e) = surface.close().await {
        warn!("Failed to release surface for {}: {}", request.label, e);
    }

    let process = streamed?;
    process.wait().await
}

async fn stream_frames<L>(
    surface: &SurfaceHandle,
    launcher: &L,
    request: &RenderRequest,
    settings: &RenderSettings,
    schedule: &FrameSchedule,
    audio: Option<&Path>,
) -> Result<L::Process>
where
    L: EncoderLauncher,
{
    surface.load(&request.document_url).await?;

    let settle = settings.settle_delay();
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }

    surface.freeze(&settings.hidden_selectors).await?;

    let invocation = EncoderInvocation::new(
        &settings.encoder,
        schedule.frame_rate(),
        request.viewport,
        audio,
        &request.output,
    );
    let total = schedule.total_frames();
    info!(
        "Capturing {} frames -> piping to encoder{}...",
        total,
        if invocation.has_audio { " (with audio)" } else { "" }
    );

    let mut process = launcher.launch(&invocation)?;
    for frame in schedule.frames() {
        surface.seek(frame.offset_ms).await?;
        let png = surface.capture().await?;
        process.write_frame(frame.index, &png).await?;

        if reports_progress(frame.index) {
            info!("  {}/{} ({:.1}s)", frame.index, total, frame.offset_ms / 1000.0);
        }
    }
    process.close_input().await?;

    Ok(process)
}

/// Result of one unit of a run
#[derive(Debug)]
pub struct UnitOutcome {
    pub name: String,
    pub output: PathBuf,
    pub result: Result<()>,
}

/// Outcomes of every unit of a run, in execution order
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
}

/// Render every unit sequentially.
///
/// Each unit is independent: a failure is logged and recorded, and the next
/// unit starts regardless.
pub async fn run<P, L>(
    units: &[RenderUnit],
    settings: &RenderSettings,
    provider: &P,
    launcher: &L,
) -> RunReport
where
    P: SurfaceProvider + Clone + Send + 'static,
    L: EncoderLauncher,
{
    let mut report = RunReport::default();

    for unit in units {
        let started = Instant::now();
        let result = match RenderRequest::for_unit(unit) {
            Ok(request) => render_one(provider, launcher, &request, settings).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => info!(
                "Done: {} ({:.1}s)",
                unit.output.display(),
                started.elapsed().as_secs_f64()
            ),
            Err(e) => error!("Failed: {}: {}", unit.name(), e),
        }

        report.outcomes.push(UnitOutcome {
            name: unit.name(),
            output: unit.output.clone(),
            result,
        });
    }

    info!(
        "{} of {} renders succeeded",
        report.succeeded(),
        report.outcomes.len()
    );
    report
}
