//! Rendering surface abstraction and the page scripts that drive it.

use crate::{Result, Viewport};

/// A browser-like viewport that renders one document into raster frames.
///
/// Implementations are blocking and need not be `Send`; the pipeline drives
/// them from a dedicated worker thread through [`crate::SurfaceHandle`].
pub trait Surface {
    /// Load `url` and wait until the document has no pending network activity.
    fn load(&mut self, url: &str) -> Result<()>;

    /// Pause every animation and hide the elements matching `hidden_selectors`.
    fn freeze(&mut self, hidden_selectors: &[String]) -> Result<()>;

    /// Move every animation's timeline to `offset_ms`.
    fn seek(&mut self, offset_ms: f64) -> Result<()>;

    /// Capture the visible viewport as PNG bytes.
    fn capture_png(&mut self) -> Result<Vec<u8>>;

    /// Release the surface and anything it launched.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Opens surfaces sized to a viewport
pub trait SurfaceProvider {
    type Surface: Surface;

    fn open(&self, viewport: Viewport) -> Result<Self::Surface>;
}

/// Milliseconds without new network activity before a page counts as quiescent
pub const NETWORK_IDLE_MS: u64 = 500;

/// Page script resolving once the document is loaded, fonts are ready, and no
/// new resource has started for `idle_ms` milliseconds.
pub fn quiescence_script(idle_ms: u64) -> String {
    format!(
        r#"(async function() {{
    if (document.readyState !== 'complete') {{
        await new Promise(function(resolve) {{ window.addEventListener('load', resolve, {{ once: true }}); }});
    }}
    if (document.fonts && document.fonts.ready) {{ await document.fonts.ready; }}
    const count = function() {{ return performance.getEntriesByType('resource').length; }};
    let seen = count();
    for (;;) {{
        await new Promise(function(resolve) {{ setTimeout(resolve, {idle_ms}); }});
        const now = count();
        if (now === seen) {{ return true; }}
        seen = now;
    }}
}})()"#,
        idle_ms = idle_ms
    )
}

/// Page script pausing all animations and hiding transient affordances.
pub fn freeze_script(hidden_selectors: &[String]) -> String {
    // JSON string literals are valid JS string literals.
    let selectors = serde_json::to_string(hidden_selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(function() {{
    document.getAnimations({{ subtree: true }}).forEach(function(a) {{ a.pause(); }});
    {selectors}.forEach(function(sel) {{
        document.querySelectorAll(sel).forEach(function(el) {{ el.style.display = 'none'; }});
    }});
    return document.getAnimations({{ subtree: true }}).length;
}})()"#,
        selectors = selectors
    )
}

/// Page script setting every animation's `currentTime` to `offset_ms`.
pub fn seek_script(offset_ms: f64) -> String {
    format!(
        "(function() {{ const t = {offset}; document.getAnimations({{ subtree: true }}).forEach(function(a) {{ a.currentTime = t; }}); return t; }})()",
        offset = offset_ms
    )
}
