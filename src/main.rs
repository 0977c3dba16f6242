use anyhow::Context;
use clap::Parser;
use scenereel::RenderConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Render animated HTML scenes into one video per output format
#[derive(Parser, Debug)]
#[command(name = "scenereel", version, about)]
struct Cli {
    /// Content source label (case-insensitive); all sources when omitted
    content: Option<String>,

    /// Output format label, e.g. 9x16 (case-insensitive); all formats when omitted
    format: Option<String>,

    /// JSON file with `sources`, `formats`, `output_dir` and `settings`
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the built-in scene table is resolved against
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Write renders here instead of next to each scene document
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Delay between page load and the first captured frame, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Encoder executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Chrome/Chromium executable (auto-detected by default)
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Launch Chrome without its sandbox (needed in most containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Navigation timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    nav_timeout_ms: u64,

    /// Print the content and format tables and exit
    #[arg(long)]
    list: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RenderConfig::default().with_base_dir(&cli.base_dir),
    };

    if let Some(dir) = &cli.out_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(fps) = cli.fps {
        config.settings.frame_rate = fps;
    }
    if let Some(ms) = cli.settle_ms {
        config.settings.settle_delay_ms = ms;
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.settings.encoder.program = ffmpeg.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_tables(config: &RenderConfig) {
    println!("Content sources:");
    for source in &config.sources {
        let duration = source
            .duration_secs
            .unwrap_or(config.settings.default_duration_secs);
        let audio = source
            .audio
            .as_ref()
            .map(|a| format!(" + {}", a.display()))
            .unwrap_or_default();
        println!("  {:<14} {} ({}s){}", source.label, source.document, duration, audio);
    }
    println!("Formats:");
    for format in &config.formats {
        println!("  {:<14} {}x{}", format.label, format.width, format.height);
    }
}

#[cfg(feature = "cdp")]
async fn render(cli: &Cli, config: &RenderConfig) -> anyhow::Result<bool> {
    use scenereel::cdp::{CdpOptions, CdpProvider};
    use scenereel::encoder::FfmpegLauncher;

    let units = config.plan(cli.content.as_deref(), cli.format.as_deref())?;

    let provider = CdpProvider::new(CdpOptions {
        chrome_path: cli.chrome.clone(),
        sandbox: !cli.no_sandbox,
        navigation_timeout: std::time::Duration::from_millis(cli.nav_timeout_ms),
        ..Default::default()
    });
    let launcher = FfmpegLauncher::new(config.settings.encoder.clone());

    let report = scenereel::run(&units, &config.settings, &provider, &launcher).await;
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            eprintln!("Error: {}: {}", failure.name, e);
        }
    }
    if report.is_success() {
        println!("\nAll done!");
    }
    Ok(report.is_success())
}

#[cfg(not(feature = "cdp"))]
async fn render(cli: &Cli, config: &RenderConfig) -> anyhow::Result<bool> {
    // Validate filters first so typos are reported the same way with or without a backend.
    config.plan(cli.content.as_deref(), cli.format.as_deref())?;
    anyhow::bail!("scenereel was built without a rendering backend (enable the `cdp` feature)")
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.list {
        print_tables(&config);
        return ExitCode::SUCCESS;
    }

    match render(&cli, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
