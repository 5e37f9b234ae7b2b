//! Render entry point: request decode, dispatch, and delegation.
//!
//! A request is decoded once at the boundary into a discriminated input
//! (remote image, local image, spec file, or something for a delegate), then
//! routed:
//!
//! - plain images are decoded/re-encoded directly by ffmpeg
//! - composition specs go through the filter-graph compiler and the process
//!   orchestrator, wrapped in a run-scoped temp context
//! - anything else is offered to the injected delegate renderers before
//!   failing with `UnsupportedInput`

use crate::assets::resolve::{ResolvedAsset, is_http_url, to_fs_path};
use crate::config::{ConfigProvider, RenderConfig};
use crate::encode::output::OutputFormat;
use crate::exec::ffmpeg::run_ffmpeg;
use crate::filter::compile::{compile_image, compile_spec};
use crate::foundation::error::{FfrenderError, FfrenderResult};
use crate::runctx::RunContext;
use crate::spec::model::CompositionSpec;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A resolved render request, as consumed from the host collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Input reference: a file path, `file://` URL, or `http(s)://` URL.
    pub file: String,
    /// Requested output format. Defaults to PNG.
    #[serde(default, rename = "type")]
    pub format: Option<OutputFormat>,
    /// Encoder quality in `[1, 100]` (jpeg only).
    #[serde(default)]
    pub quality: Option<f64>,
    /// Wrap the single result in a one-element page list. Multi-frame
    /// output is unsupported; exactly one frame is always produced.
    #[serde(default)]
    pub multi_page: bool,
    /// Inline template data merged into the spec document (top-level keys)
    /// before validation. Ignored for remote inputs.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RenderRequest {
    /// Build a request for `file` with defaults for everything else.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            format: None,
            quality: None,
            multi_page: false,
            data: None,
        }
    }

    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// A finished render: base64-encoded image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    /// The single output image.
    Single(String),
    /// One-element list, returned when the request asked for `multiPage`.
    Pages(Vec<String>),
}

impl RenderOutput {
    fn from_bytes(bytes: &[u8], multi_page: bool) -> Self {
        let b64 = BASE64.encode(bytes);
        if multi_page {
            Self::Pages(vec![b64])
        } else {
            Self::Single(b64)
        }
    }
}

/// A rendering backend capability: something that can turn a request into
/// base64 image data.
pub trait Renderer: Send + Sync {
    /// Stable identifier used for delegate lookup.
    fn id(&self) -> &str;

    /// Render one request.
    fn render(&self, request: &RenderRequest) -> FfrenderResult<RenderOutput>;
}

/// An injected collection of renderer capabilities.
///
/// Delegation is a lookup against this collection, never a hidden global
/// list: the first renderer with a different id than the requester wins.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: Vec<Box<dyn Renderer>>,
}

impl RendererRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a renderer.
    pub fn register(&mut self, renderer: Box<dyn Renderer>) {
        self.renderers.push(renderer);
    }

    /// Look up a renderer by id.
    pub fn find(&self, id: &str) -> Option<&dyn Renderer> {
        self.renderers
            .iter()
            .find(|r| r.id() == id)
            .map(AsRef::as_ref)
    }

    /// The first renderer whose id differs from `requester`, if any.
    pub fn delegate_for(&self, requester: &str) -> Option<&dyn Renderer> {
        self.renderers
            .iter()
            .find(|r| r.id() != requester)
            .map(AsRef::as_ref)
    }

    /// Number of registered renderers.
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// Return `true` when no renderer is registered.
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

/// Where one decoded request is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestInput {
    /// Remote image URL, fetched by ffmpeg itself.
    RemoteImage(String),
    /// Remote non-image content; needs a delegate (browser) renderer.
    RemoteOther(String),
    /// Local raster image path.
    LocalImage(PathBuf),
    /// Local path that may hold a composition spec document.
    MaybeSpec(PathBuf),
    /// Anything else; offered to a delegate.
    Other(PathBuf),
}

/// Extensions recognized as flat raster images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

fn is_likely_image(input: &str) -> bool {
    let clean = input
        .split(['?', '#'])
        .next()
        .unwrap_or(input);
    Path::new(clean)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn classify(file: &str) -> RequestInput {
    if is_http_url(file) {
        if is_likely_image(file) {
            return RequestInput::RemoteImage(file.to_owned());
        }
        return RequestInput::RemoteOther(file.to_owned());
    }

    let fs_path = to_fs_path(file);
    let fs_path = std::path::absolute(&fs_path).unwrap_or(fs_path);
    if is_likely_image(&fs_path.to_string_lossy()) {
        return RequestInput::LocalImage(fs_path);
    }

    let ext = fs_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if matches!(ext.as_deref(), Some("json") | Some("ffrender")) {
        return RequestInput::MaybeSpec(fs_path);
    }
    RequestInput::Other(fs_path)
}

/// The ffmpeg-backed renderer: the crate's main entry point.
pub struct FfmpegRenderer {
    config: Box<dyn ConfigProvider>,
    delegates: RendererRegistry,
}

impl FfmpegRenderer {
    /// The renderer id used for registration and delegate lookup.
    pub const ID: &'static str = "ffmpeg";

    /// Create a renderer with no delegates.
    ///
    /// The provider is asked for a fresh config snapshot at the start of
    /// each invocation; a plain [`RenderConfig`] works as a fixed provider.
    pub fn new(config: impl ConfigProvider + 'static) -> Self {
        Self {
            config: Box::new(config),
            delegates: RendererRegistry::new(),
        }
    }

    /// Create a renderer with an injected delegate collection, consulted
    /// for inputs this renderer cannot handle.
    pub fn with_delegates(
        config: impl ConfigProvider + 'static,
        delegates: RendererRegistry,
    ) -> Self {
        Self {
            config: Box::new(config),
            delegates,
        }
    }

    /// A snapshot of the active configuration.
    pub fn config(&self) -> RenderConfig {
        self.config.render_config()
    }

    /// Render one request, following the dispatch state machine.
    #[tracing::instrument(skip(self, request), fields(file = %request.file))]
    pub fn render_request(&self, request: &RenderRequest) -> FfrenderResult<RenderOutput> {
        let format = request.output_format();

        match classify(&request.file) {
            RequestInput::RemoteImage(url) => {
                let bytes = self.render_image_to_bytes(
                    &ResolvedAsset::Url(url),
                    format,
                    request.quality,
                )?;
                Ok(RenderOutput::from_bytes(&bytes, request.multi_page))
            }
            RequestInput::RemoteOther(url) => self.delegate(request).ok_or_else(|| {
                FfrenderError::unsupported_input(format!(
                    "remote input '{url}' is not an image; register an HTML/URL renderer to handle it"
                ))
            })?,
            RequestInput::LocalImage(path) => {
                let bytes = self.render_image_to_bytes(
                    &ResolvedAsset::Path(path),
                    format,
                    request.quality,
                )?;
                Ok(RenderOutput::from_bytes(&bytes, request.multi_page))
            }
            RequestInput::MaybeSpec(path) => {
                match load_spec_with_data(&path, request.data.as_ref()) {
                    Ok(spec) => {
                        let spec_dir = path.parent().unwrap_or_else(|| Path::new("."));
                        let bytes = self.render_spec_to_bytes(
                            &spec,
                            spec_dir,
                            format,
                            request.quality,
                        )?;
                        Ok(RenderOutput::from_bytes(&bytes, request.multi_page))
                    }
                    // A json file that is not a spec falls through to the
                    // delegate, like any other unmatched input.
                    Err(_) => self.delegate_or_unsupported(request),
                }
            }
            RequestInput::Other(_) => self.delegate_or_unsupported(request),
        }
    }

    /// Render a parsed composition spec and return the raw encoded image
    /// bytes (callers base64-encode).
    ///
    /// The run-scoped temp context wraps compilation and execution; its
    /// resources are removed on every exit path before this returns.
    pub fn render_spec_to_bytes(
        &self,
        spec: &CompositionSpec,
        spec_dir: &Path,
        format: OutputFormat,
        quality: Option<f64>,
    ) -> FfrenderResult<Vec<u8>> {
        let config = self.config.render_config();
        spec.validate()?;
        let mut run = RunContext::create(&config)?;
        let plan = compile_spec(spec, spec_dir, &mut run, format, quality, &config)?;
        run_ffmpeg(&config, &plan.args)
    }

    /// Decode/re-encode a single flat image (local path or remote URL) and
    /// return the raw encoded bytes.
    pub fn render_image_to_bytes(
        &self,
        input: &ResolvedAsset,
        format: OutputFormat,
        quality: Option<f64>,
    ) -> FfrenderResult<Vec<u8>> {
        let config = self.config.render_config();
        let plan = compile_image(input, format, quality);
        run_ffmpeg(&config, &plan.args)
    }

    fn delegate(&self, request: &RenderRequest) -> Option<FfrenderResult<RenderOutput>> {
        let other = self.delegates.delegate_for(self.id())?;
        tracing::debug!(delegate = other.id(), "delegating render request");
        Some(other.render(request))
    }

    fn delegate_or_unsupported(&self, request: &RenderRequest) -> FfrenderResult<RenderOutput> {
        self.delegate(request).unwrap_or_else(|| {
            Err(FfrenderError::unsupported_input(request.file.clone()))
        })
    }
}

impl Renderer for FfmpegRenderer {
    fn id(&self) -> &str {
        Self::ID
    }

    fn render(&self, request: &RenderRequest) -> FfrenderResult<RenderOutput> {
        self.render_request(request)
    }
}

/// Read a spec document, shallow-merging `data`'s top-level keys over the
/// file's when present (the host's template-merge step, reduced to JSON).
fn load_spec_with_data(
    path: &Path,
    data: Option<&serde_json::Value>,
) -> FfrenderResult<CompositionSpec> {
    match data {
        Some(serde_json::Value::Object(overrides)) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                FfrenderError::validation(format!(
                    "open composition spec '{}': {e}",
                    path.display()
                ))
            })?;
            let mut value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
                FfrenderError::validation(format!("parse composition spec JSON: {e}"))
            })?;
            if let Some(doc) = value.as_object_mut() {
                for (key, val) in overrides {
                    doc.insert(key.clone(), val.clone());
                }
            }
            CompositionSpec::from_value(value)
        }
        _ => CompositionSpec::from_path(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_extension_probe_strips_query_and_fragment() {
        assert!(is_likely_image("https://example.com/a.png"));
        assert!(is_likely_image("https://example.com/a.PNG?x=1#frag"));
        assert!(is_likely_image("/data/photo.jpeg"));
        assert!(!is_likely_image("https://example.com/page.html"));
        assert!(!is_likely_image("https://example.com/"));
        assert!(!is_likely_image("/data/card.ffrender.json"));
    }

    #[test]
    fn classify_routes_remote_inputs_by_image_extension() {
        assert_eq!(
            classify("https://example.com/a.png"),
            RequestInput::RemoteImage("https://example.com/a.png".into())
        );
        assert_eq!(
            classify("https://example.com/page"),
            RequestInput::RemoteOther("https://example.com/page".into())
        );
    }

    #[cfg(unix)]
    #[test]
    fn classify_routes_local_inputs() {
        assert_eq!(
            classify("/data/a.webp"),
            RequestInput::LocalImage(PathBuf::from("/data/a.webp"))
        );
        assert_eq!(
            classify("/data/card.ffrender.json"),
            RequestInput::MaybeSpec(PathBuf::from("/data/card.ffrender.json"))
        );
        assert_eq!(
            classify("file:///data/card.json"),
            RequestInput::MaybeSpec(PathBuf::from("/data/card.json"))
        );
        assert_eq!(
            classify("/data/notes.txt"),
            RequestInput::Other(PathBuf::from("/data/notes.txt"))
        );
    }

    #[test]
    fn request_decodes_host_field_names() {
        let req: RenderRequest = serde_json::from_value(json!({
            "file": "/data/card.json",
            "type": "jpeg",
            "quality": 80,
            "multiPage": true
        }))
        .unwrap();
        assert_eq!(req.format, Some(OutputFormat::Jpeg));
        assert_eq!(req.quality, Some(80.0));
        assert!(req.multi_page);
        assert!(req.data.is_none());
        assert_eq!(RenderRequest::new("x").output_format(), OutputFormat::Png);
    }

    #[test]
    fn output_wraps_pages_when_multi_page() {
        assert_eq!(
            RenderOutput::from_bytes(b"ab", false),
            RenderOutput::Single("YWI=".into())
        );
        assert_eq!(
            RenderOutput::from_bytes(b"ab", true),
            RenderOutput::Pages(vec!["YWI=".into()])
        );
    }

    struct StubRenderer {
        id: &'static str,
    }

    impl Renderer for StubRenderer {
        fn id(&self) -> &str {
            self.id
        }

        fn render(&self, _request: &RenderRequest) -> FfrenderResult<RenderOutput> {
            Ok(RenderOutput::Single(format!("from-{}", self.id)))
        }
    }

    #[test]
    fn registry_skips_the_requesting_renderer() {
        let mut registry = RendererRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(StubRenderer { id: "ffmpeg" }));
        registry.register(Box::new(StubRenderer { id: "browser" }));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("browser").unwrap().id(), "browser");
        assert!(registry.find("missing").is_none());
        assert_eq!(registry.delegate_for("ffmpeg").unwrap().id(), "browser");
        assert_eq!(registry.delegate_for("browser").unwrap().id(), "ffmpeg");
    }

    #[test]
    fn config_provider_is_consulted_per_invocation() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct SharedConfig(Arc<Mutex<RenderConfig>>);

        impl ConfigProvider for SharedConfig {
            fn render_config(&self) -> RenderConfig {
                self.0.lock().unwrap().clone()
            }
        }

        let shared = SharedConfig(Arc::new(Mutex::new(RenderConfig::default())));
        let renderer = FfmpegRenderer::new(shared.clone());
        assert_eq!(
            renderer.config().timeout,
            std::time::Duration::from_millis(30_000)
        );

        shared.0.lock().unwrap().timeout = std::time::Duration::from_millis(50);
        assert_eq!(
            renderer.config().timeout,
            std::time::Duration::from_millis(50)
        );
    }

    #[test]
    fn spec_data_merge_overrides_top_level_keys() {
        let dir = std::env::temp_dir().join(format!(
            "ffrender_merge_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("card.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({"width": 100, "height": 50})).unwrap(),
        )
        .unwrap();

        let merged = load_spec_with_data(&path, Some(&json!({"width": 400}))).unwrap();
        assert_eq!(merged.width, 400.0);
        assert_eq!(merged.height, 50.0);

        let plain = load_spec_with_data(&path, None).unwrap();
        assert_eq!(plain.width, 100.0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
