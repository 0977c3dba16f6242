//! Chrome DevTools Protocol surface implementation

use crate::surface::{self, Surface, SurfaceProvider};
use crate::{Error, Result, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Launch options for the headless Chrome backend
#[derive(Debug, Clone)]
pub struct CdpOptions {
    /// Chrome/Chromium binary; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Keep Chrome's sandbox enabled (disable inside containers)
    pub sandbox: bool,
    /// Upper bound for navigation and other protocol calls
    pub navigation_timeout: Duration,
    /// How long the browser may sit without protocol traffic before it is torn down
    pub idle_timeout: Duration,
}

impl Default for CdpOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            sandbox: true,
            navigation_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Extra Chrome flags. The device scale factor is pinned to 1 so one CSS
/// pixel is one captured pixel regardless of the host display.
pub fn chrome_args() -> Vec<&'static OsStr> {
    vec![
        OsStr::new("--hide-scrollbars"),
        OsStr::new("--force-device-scale-factor=1"),
    ]
}

/// Opens a fresh headless Chrome per surface
#[derive(Debug, Clone, Default)]
pub struct CdpProvider {
    options: CdpOptions,
}

impl CdpProvider {
    pub fn new(options: CdpOptions) -> Self {
        Self { options }
    }
}

impl SurfaceProvider for CdpProvider {
    type Surface = CdpSurface;

    fn open(&self, viewport: Viewport) -> Result<CdpSurface> {
        CdpSurface::launch(&self.options, viewport)
    }
}

/// CDP-backed surface (uses the `headless_chrome` crate)
///
/// Owns one browser process and a single tab whose window matches the
/// target viewport.
pub struct CdpSurface {
    browser: Browser,
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl CdpSurface {
    pub fn launch(options: &CdpOptions, viewport: Viewport) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(options.sandbox)
            .window_size(Some((viewport.width, viewport.height)))
            .path(options.chrome_path.clone())
            .idle_browser_timeout(options.idle_timeout)
            .args(chrome_args())
            .build()
            .map_err(|e| Error::SurfaceInit(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::SurfaceInit(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::SurfaceInit(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(options.navigation_timeout);

        debug!("launched headless Chrome at {}", viewport);
        Ok(Self { browser, tab, viewport })
    }

    fn eval(&self, script: &str, await_promise: bool) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab
            .evaluate(script, await_promise)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;
        Ok(result.value)
    }
}

impl Surface for CdpSurface {
    fn load(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation to {} failed: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        self.eval(&surface::quiescence_script(surface::NETWORK_IDLE_MS), true)
            .map_err(|e| Error::LoadError(format!("Waiting for network idle failed: {}", e)))?;

        Ok(())
    }

    fn freeze(&mut self, hidden_selectors: &[String]) -> Result<()> {
        let paused = self.eval(&surface::freeze_script(hidden_selectors), false)?;
        debug!("paused {} animations", paused.unwrap_or_default());
        Ok(())
    }

    fn seek(&mut self, offset_ms: f64) -> Result<()> {
        self.eval(&surface::seek_script(offset_ms), false)?;
        Ok(())
    }

    fn capture_png(&mut self) -> Result<Vec<u8>> {
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(self.viewport.width),
            height: f64::from(self.viewport.height),
            scale: 1.0,
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::CaptureError(format!("Screenshot failed: {}", e)))
    }

    fn close(self) -> Result<()> {
        // Dropping the browser terminates the Chrome child process.
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
