use crate::foundation::error::{FfrenderError, FfrenderResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Fit policy reconciling a source image's aspect ratio with its target
/// rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Unconstrained scale to the exact target size.
    Fill,
    /// Scale to fit entirely inside the target; the remainder is padded.
    Contain,
    /// Scale to fill the target; the overflow is center-cropped.
    #[default]
    Cover,
}

/// Canvas background: a fill color and/or a full-canvas image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackgroundSpec {
    /// Fill color under everything else. Absent means fully transparent.
    #[serde(default)]
    pub color: Option<String>,
    /// Background image source, drawn over the fill color.
    #[serde(default)]
    pub src: Option<String>,
    /// Fit mode for the background image.
    #[serde(default)]
    pub fit: Option<FitMode>,
}

/// One visual element placed on the canvas, discriminated by `type`.
///
/// Array order is the compositing (painter's) order: later entries are drawn
/// on top of earlier ones and on top of the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerSpec {
    /// A raster image placed in a target rectangle.
    Image(ImageLayerSpec),
    /// Literal text drawn at an origin point.
    Text(TextLayerSpec),
}

/// An image layer: a source asset scaled into a placement rectangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLayerSpec {
    /// Asset reference: absolute/relative path, `file://` URL or `http(s)://` URL.
    pub src: String,
    /// Left edge of the placement rectangle, rounded to pixels.
    pub x: f64,
    /// Top edge of the placement rectangle, rounded to pixels.
    pub y: f64,
    /// Target width in pixels.
    pub width: f64,
    /// Target height in pixels.
    pub height: f64,
    /// Aspect-ratio policy. Defaults to [`FitMode::Cover`].
    #[serde(default)]
    pub fit: FitMode,
    /// Post-scale alpha multiplier in `[0, 1)`.
    ///
    /// Values outside that range (including the common `1.0`) mean "no
    /// adjustment" so the fully-opaque default skips the filter stage.
    #[serde(default)]
    pub opacity: Option<f64>,
}

/// A text layer: literal content drawn with a font at an origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayerSpec {
    /// Literal text content. Never embedded in the filter program directly;
    /// it is written to a run-scoped scratch file instead.
    pub text: String,
    /// Text origin x, rounded to pixels.
    pub x: f64,
    /// Text origin y, rounded to pixels.
    pub y: f64,
    /// Font size in pixels, rounded.
    pub font_size: f64,
    /// Font color. Defaults to opaque white.
    #[serde(default)]
    pub color: Option<String>,
    /// Per-layer font file override.
    #[serde(default)]
    pub font_file: Option<PathBuf>,
    /// Optional background rectangle drawn under the text.
    #[serde(default, rename = "box")]
    pub text_box: Option<TextBoxSpec>,
}

/// Background rectangle under a text layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBoxSpec {
    /// Box fill color.
    #[serde(default)]
    pub color: Option<String>,
    /// Box border width in pixels.
    #[serde(default)]
    pub border: Option<f64>,
}

/// The JSON-facing composition document: a fixed-size canvas, an optional
/// background, and an ordered stack of layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionSpec {
    /// Format version, reserved for forward compatibility. Currently fixed
    /// at `1`; absent is treated as `1`.
    #[serde(default)]
    pub version: Option<u32>,
    /// Canvas width in pixels. Must be > 0.
    pub width: f64,
    /// Canvas height in pixels. Must be > 0.
    pub height: f64,
    /// Optional background fill and/or image.
    #[serde(default)]
    pub background: Option<BackgroundSpec>,
    /// Ordered layer stack. Absent means no extra layers.
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

impl CompositionSpec {
    /// Parse a composition spec from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> FfrenderResult<Self> {
        let spec: Self = serde_json::from_reader(r)
            .map_err(|e| FfrenderError::validation(format!("parse composition spec JSON: {e}")))?;
        Ok(spec)
    }

    /// Parse a composition spec from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> FfrenderResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FfrenderError::validation(format!("open composition spec '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Parse a composition spec from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> FfrenderResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| FfrenderError::validation(format!("parse composition spec JSON: {e}")))
    }

    /// Validate canvas dimensions and the reserved version field.
    pub fn validate(&self) -> FfrenderResult<()> {
        if !self.width.is_finite() || !self.height.is_finite() {
            return Err(FfrenderError::validation(
                "spec width/height must be finite numbers",
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(FfrenderError::validation(format!(
                "spec width/height must be > 0 (got {}x{})",
                self.width, self.height
            )));
        }
        match self.version {
            None | Some(1) => {}
            Some(other) => {
                return Err(FfrenderError::validation(format!(
                    "unsupported spec version {other} (expected 1)"
                )));
            }
        }
        Ok(())
    }

    /// Canvas width rounded to whole pixels.
    pub fn canvas_width(&self) -> i64 {
        self.width.round() as i64
    }

    /// Canvas height rounded to whole pixels.
    pub fn canvas_height(&self) -> i64 {
        self.height.round() as i64
    }

    /// The background image, if present, expressed as an implicit first
    /// image layer covering the full canvas. This makes `background.src`
    /// and an explicit full-canvas image layer equivalent.
    pub(crate) fn background_image_layer(&self) -> Option<ImageLayerSpec> {
        let bg = self.background.as_ref()?;
        let src = bg.src.as_ref()?;
        Some(ImageLayerSpec {
            src: src.clone(),
            x: 0.0,
            y: 0.0,
            width: self.width,
            height: self.height,
            fit: bg.fit.unwrap_or_default(),
            opacity: None,
        })
    }

    /// The background fill color string, if any.
    pub(crate) fn background_color(&self) -> Option<&str> {
        self.background.as_ref()?.color.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_spec_with_defaults() {
        let spec = CompositionSpec::from_value(json!({"width": 200, "height": 100})).unwrap();
        spec.validate().unwrap();
        assert_eq!(spec.canvas_width(), 200);
        assert_eq!(spec.canvas_height(), 100);
        assert!(spec.background.is_none());
        assert!(spec.layers.is_empty());
        assert!(spec.background_image_layer().is_none());
    }

    #[test]
    fn parses_tagged_layers_in_order() {
        let spec = CompositionSpec::from_value(json!({
            "width": 640, "height": 480,
            "layers": [
                {"type": "image", "src": "a.png", "x": 0, "y": 0, "width": 64, "height": 64},
                {"type": "text", "text": "hi", "x": 10, "y": 10, "fontSize": 20},
            ]
        }))
        .unwrap();
        assert_eq!(spec.layers.len(), 2);
        assert!(matches!(spec.layers[0], LayerSpec::Image(_)));
        match &spec.layers[1] {
            LayerSpec::Text(t) => {
                assert_eq!(t.text, "hi");
                assert_eq!(t.font_size, 20.0);
                assert!(t.color.is_none());
            }
            other => panic!("expected text layer, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        for (w, h) in [(0.0, 100.0), (-1.0, 100.0), (100.0, 0.0), (100.0, -5.0)] {
            let spec = CompositionSpec::from_value(json!({"width": w, "height": h})).unwrap();
            let err = spec.validate().unwrap_err();
            assert!(matches!(err, FfrenderError::Validation(_)), "{w}x{h}");
        }
    }

    #[test]
    fn rejects_non_numeric_dimensions_at_parse() {
        assert!(CompositionSpec::from_value(json!({"width": "wide", "height": 10})).is_err());
        assert!(CompositionSpec::from_value(json!({"height": 10})).is_err());
    }

    #[test]
    fn rejects_layers_that_are_not_an_array() {
        let err =
            CompositionSpec::from_value(json!({"width": 10, "height": 10, "layers": "nope"}))
                .unwrap_err();
        assert!(matches!(err, FfrenderError::Validation(_)));
    }

    #[test]
    fn version_gate_accepts_absent_and_one() {
        CompositionSpec::from_value(json!({"width": 1, "height": 1}))
            .unwrap()
            .validate()
            .unwrap();
        CompositionSpec::from_value(json!({"version": 1, "width": 1, "height": 1}))
            .unwrap()
            .validate()
            .unwrap();
        let err = CompositionSpec::from_value(json!({"version": 2, "width": 1, "height": 1}))
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn background_src_folds_into_full_canvas_layer() {
        let spec = CompositionSpec::from_value(json!({
            "width": 300, "height": 150,
            "background": {"src": "bg.png", "fit": "contain"}
        }))
        .unwrap();
        let bg = spec.background_image_layer().unwrap();
        assert_eq!(bg.src, "bg.png");
        assert_eq!((bg.x, bg.y), (0.0, 0.0));
        assert_eq!((bg.width, bg.height), (300.0, 150.0));
        assert_eq!(bg.fit, FitMode::Contain);
        assert!(bg.opacity.is_none());
    }

    #[test]
    fn background_fit_defaults_to_cover() {
        let spec = CompositionSpec::from_value(json!({
            "width": 10, "height": 10,
            "background": {"src": "bg.png"}
        }))
        .unwrap();
        assert_eq!(spec.background_image_layer().unwrap().fit, FitMode::Cover);
    }

    #[test]
    fn text_box_uses_the_box_key() {
        let spec = CompositionSpec::from_value(json!({
            "width": 10, "height": 10,
            "layers": [{
                "type": "text", "text": "t", "x": 0, "y": 0, "fontSize": 12,
                "box": {"color": "#000000", "border": 4}
            }]
        }))
        .unwrap();
        let LayerSpec::Text(t) = &spec.layers[0] else {
            panic!("expected text layer");
        };
        let text_box = t.text_box.as_ref().unwrap();
        assert_eq!(text_box.color.as_deref(), Some("#000000"));
        assert_eq!(text_box.border, Some(4.0));
    }
}
