//! Content-source and output-format tables, and the job selection built on them.

use crate::{Error, FilterKind, RenderSettings, Result, Viewport};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One row of the content table: a scene document and how to name its renders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentSource {
    /// Label matched by the content filter (case-insensitive)
    pub label: String,
    /// Filesystem path or absolute `file://` / `http(s)://` URL
    pub document: String,
    /// Output file name prefix
    pub output_prefix: String,
    /// Duration override; falls back to `RenderSettings::default_duration_secs`
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// Optional audio track muxed into every render of this source
    #[serde(default)]
    pub audio: Option<PathBuf>,
}

impl ContentSource {
    pub fn new(label: &str, document: &str, output_prefix: &str) -> Self {
        Self {
            label: label.to_string(),
            document: document.to_string(),
            output_prefix: output_prefix.to_string(),
            duration_secs: None,
            audio: None,
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_audio(mut self, audio: impl Into<PathBuf>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    /// Resolve the duration against the run-wide default.
    pub fn job(&self, default_duration_secs: f64) -> RenderJob {
        RenderJob {
            label: self.label.clone(),
            document: self.document.clone(),
            output_prefix: self.output_prefix.clone(),
            duration_secs: self.duration_secs.unwrap_or(default_duration_secs),
            audio: self.audio.clone(),
        }
    }
}

/// One row of the format table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputFormat {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl OutputFormat {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self { label: label.to_string(), width, height }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

/// A content source with every optional field resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub label: String,
    pub document: String,
    pub output_prefix: String,
    pub duration_secs: f64,
    pub audio: Option<PathBuf>,
}

impl RenderJob {
    /// True when the document is given as a URL rather than a path.
    pub fn is_url(&self) -> bool {
        is_url(&self.document)
    }

    /// Directory the renders land in when no output directory is configured.
    pub fn document_dir(&self) -> PathBuf {
        if self.is_url() {
            return PathBuf::from(".");
        }
        match Path::new(&self.document).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// One (job × format) execution
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUnit {
    pub job: RenderJob,
    pub format: OutputFormat,
    /// Encoded output file
    pub output: PathBuf,
}

impl RenderUnit {
    /// Short human-readable name such as `video-funnel-mix 4x5`
    pub fn name(&self) -> String {
        format!("{} {}", self.job.output_prefix, self.format.label)
    }
}

/// Explicit configuration handed to the pipeline
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub sources: Vec<ContentSource>,
    pub formats: Vec<OutputFormat>,
    /// Where renders are written; `None` writes next to each document
    pub output_dir: Option<PathBuf>,
    pub settings: RenderSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            formats: default_formats(),
            output_dir: None,
            settings: RenderSettings::default(),
        }
    }
}

/// On-disk shape of a config file; absent tables fall back to the built-ins.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    sources: Option<Vec<ContentSource>>,
    #[serde(default)]
    formats: Option<Vec<OutputFormat>>,
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    settings: RenderSettings,
}

impl RenderConfig {
    /// Parse a JSON config. Relative paths are kept as written.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("Invalid config JSON: {}", e)))?;

        let config = Self {
            sources: file.sources.unwrap_or_else(default_sources),
            formats: file.formats.unwrap_or_else(default_formats),
            output_dir: file.output_dir,
            settings: file.settings,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config; relative paths resolve against the file's directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::from_json_str(&json)?.with_base_dir(base))
    }

    /// Resolve relative document, audio and output paths against `base`.
    pub fn with_base_dir(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        for source in &mut self.sources {
            if !is_url(&source.document) && Path::new(&source.document).is_relative() {
                source.document = base.join(&source.document).to_string_lossy().into_owned();
            }
            if let Some(audio) = source.audio.as_mut() {
                if audio.is_relative() {
                    *audio = base.join(&*audio);
                }
            }
        }
        if let Some(dir) = self.output_dir.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }

    /// Check table contents that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.settings.frame_rate == 0 {
            return Err(Error::ConfigError("frame_rate must be positive".into()));
        }
        let default_secs = self.settings.default_duration_secs;
        if !default_secs.is_finite() || default_secs <= 0.0 {
            return Err(Error::ConfigError(format!(
                "default_duration_secs must be positive, got {}",
                default_secs
            )));
        }
        for source in &self.sources {
            if let Some(secs) = source.duration_secs {
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(Error::ConfigError(format!(
                        "source {} has a non-positive duration",
                        source.label
                    )));
                }
            }
        }
        for format in &self.formats {
            format.viewport().validate()?;
        }
        Ok(())
    }

    pub fn content_labels(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.label.clone()).collect()
    }

    pub fn format_labels(&self) -> Vec<String> {
        self.formats.iter().map(|f| f.label.clone()).collect()
    }

    /// Sources matching `filter`, or all sources when no filter is given.
    pub fn select_sources(&self, filter: Option<&str>) -> Result<Vec<&ContentSource>> {
        select(&self.sources, filter, |s| &s.label, FilterKind::Content)
    }

    /// Formats matching `filter`, or all formats when no filter is given.
    pub fn select_formats(&self, filter: Option<&str>) -> Result<Vec<&OutputFormat>> {
        select(&self.formats, filter, |f| &f.label, FilterKind::Format)
    }

    /// Cross product of the selected sources and formats, sources outermost.
    ///
    /// Both filters are checked before anything is returned, so an unknown
    /// value never leads to partial work.
    pub fn plan(&self, content: Option<&str>, format: Option<&str>) -> Result<Vec<RenderUnit>> {
        let sources = self.select_sources(content)?;
        let formats = self.select_formats(format)?;

        let mut units = Vec::with_capacity(sources.len() * formats.len());
        for source in sources {
            let job = source.job(self.settings.default_duration_secs);
            for format in &formats {
                let output = self.output_path(&job, format);
                units.push(RenderUnit {
                    job: job.clone(),
                    format: (*format).clone(),
                    output,
                });
            }
        }
        Ok(units)
    }

    /// `{dir}/{prefix}-{format}.{container}`
    pub fn output_path(&self, job: &RenderJob, format: &OutputFormat) -> PathBuf {
        let dir = self.output_dir.clone().unwrap_or_else(|| job.document_dir());
        dir.join(format!(
            "{}-{}.{}",
            job.output_prefix, format.label, self.settings.encoder.container
        ))
    }
}

fn select<'a, T>(
    items: &'a [T],
    filter: Option<&str>,
    label: impl Fn(&T) -> &String,
    kind: FilterKind,
) -> Result<Vec<&'a T>> {
    let Some(filter) = filter else {
        return Ok(items.iter().collect());
    };

    let selected: Vec<&T> = items
        .iter()
        .filter(|item| label(item).eq_ignore_ascii_case(filter))
        .collect();

    if selected.is_empty() {
        return Err(Error::UnknownFilter {
            kind,
            value: filter.to_string(),
            available: items.iter().map(|item| label(item).clone()).collect(),
        });
    }
    Ok(selected)
}

pub(crate) fn is_url(document: &str) -> bool {
    ["file://", "http://", "https://"]
        .iter()
        .any(|scheme| document.starts_with(scheme))
}

fn default_sources() -> Vec<ContentSource> {
    vec![
        ContentSource::new("CZ", "video-irresistible.html", "video-irresistible"),
        ContentSource::new("EN", "video-irresistible-en.html", "video-irresistible-en"),
        ContentSource::new("RESTAURANTS", "video-restaurants.html", "video-restaurants")
            .with_duration(30.0),
        ContentSource::new("FUNNEL", "video-funnel-mix.html", "video-funnel-mix")
            .with_duration(30.0),
        ContentSource::new(
            "WORDPRESS",
            "video-wordpress-problems.html",
            "video-wordpress-problems",
        )
        .with_duration(45.0)
        .with_audio("video-wordpress-problems-voiceover.mp3"),
        ContentSource::new(
            "WORDPRESS-CZ",
            "video-wordpress-problems-cz.html",
            "video-wordpress-problems-cz",
        )
        .with_duration(45.0)
        .with_audio("video-wordpress-problems-cz-voiceover.mp3"),
    ]
}

fn default_formats() -> Vec<OutputFormat> {
    vec![
        OutputFormat::new("9x16", 1080, 1920),
        OutputFormat::new("4x5", 1080, 1350),
        OutputFormat::new("1x1", 1080, 1080),
        OutputFormat::new("16x9", 1920, 1080),
    ]
}
