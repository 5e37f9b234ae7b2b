use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration consumed by one render invocation.
///
/// The config is read at the start of each call and passed by injection;
/// nothing is cached process-wide, so a changed value takes effect on the
/// next call. Every field has a documented fallback.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Path to the ffmpeg executable. `None` falls back to `ffmpeg` on PATH.
    pub ffmpeg_path: Option<PathBuf>,
    /// Font file used by text layers that carry no per-layer override.
    /// `None` probes a platform-default list.
    pub font_file: Option<PathBuf>,
    /// Wall-clock bound for one ffmpeg invocation. Default 30 000 ms.
    pub timeout: Duration,
    /// Emit the full ffmpeg argument vector through `tracing` before spawn.
    pub log_command: bool,
    /// Root under which per-run temp directories are created.
    /// `None` falls back to the OS temp dir.
    pub temp_root: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            font_file: None,
            timeout: Duration::from_millis(30_000),
            log_command: false,
            temp_root: None,
        }
    }
}

impl RenderConfig {
    /// Resolve the executable to spawn: the configured override, else
    /// `ffmpeg` looked up on PATH by the OS.
    pub fn resolve_ffmpeg_bin(&self) -> PathBuf {
        match &self.ffmpeg_path {
            Some(p) if !p.as_os_str().is_empty() => p.clone(),
            _ => PathBuf::from("ffmpeg"),
        }
    }

    /// Resolve the font file for a text layer.
    ///
    /// A per-layer override wins unconditionally (no existence check; a bad
    /// path surfaces as a process error). The configured default is used
    /// when it exists on disk, else the platform candidates are probed.
    pub fn resolve_font_file(&self, layer_font: Option<&Path>) -> Option<PathBuf> {
        if let Some(font) = layer_font {
            return Some(font.to_path_buf());
        }
        if let Some(configured) = &self.font_file
            && !configured.as_os_str().is_empty()
            && configured.exists()
        {
            return Some(configured.clone());
        }
        default_font_candidates()
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }
}

/// Source of the configuration consumed by a render invocation.
///
/// The renderer asks its provider for a fresh snapshot at the start of each
/// call, so a provider backed by reloadable host config takes effect on the
/// next invocation without any process-wide state.
pub trait ConfigProvider: Send + Sync {
    /// A snapshot of the current configuration.
    fn render_config(&self) -> RenderConfig;
}

/// A fixed configuration is its own provider.
impl ConfigProvider for RenderConfig {
    fn render_config(&self) -> RenderConfig {
        self.clone()
    }
}

#[cfg(target_os = "windows")]
fn default_font_candidates() -> &'static [&'static str] {
    &[
        "C:/Windows/Fonts/msyh.ttc",
        "C:/Windows/Fonts/msyh.ttf",
        "C:/Windows/Fonts/simhei.ttf",
        "C:/Windows/Fonts/arial.ttf",
    ]
}

#[cfg(target_os = "macos")]
fn default_font_candidates() -> &'static [&'static str] {
    &[
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Helvetica.ttf",
    ]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn default_font_candidates() -> &'static [&'static str] {
    &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    ]
}
