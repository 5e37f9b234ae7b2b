//! Compilation of a validated [`CompositionSpec`] into one ffmpeg argument
//! vector.
//!
//! Input 0 is always a `lavfi` solid-color canvas source; each image layer
//! contributes one further `-i` input plus a scale/fit/opacity chain and an
//! overlay; each text layer contributes a `drawtext` stage referencing a
//! run-scoped scratch file. Layer declaration order is preserved exactly.

use crate::assets::resolve::{ResolvedAsset, resolve_asset};
use crate::config::RenderConfig;
use crate::encode::output::OutputFormat;
use crate::filter::graph::{AspectPolicy, DrawTextOp, FilterChain, FilterGraph, FilterOp};
use crate::filter::sanitize::{TRANSPARENT, sanitize_color};
use crate::foundation::error::{FfrenderError, FfrenderResult};
use crate::runctx::RunContext;
use crate::spec::model::{CompositionSpec, FitMode, ImageLayerSpec, LayerSpec, TextLayerSpec};
use std::path::Path;

/// A fully compiled invocation: the complete argument vector and the filter
/// program embedded in it (kept separately for logging and tests).
///
/// Compiling the same spec twice with the same config yields byte-identical
/// arguments apart from the run-scoped scratch paths.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    /// Arguments passed to the ffmpeg executable, in order.
    pub args: Vec<String>,
    /// The serialized `filter_complex` program.
    pub filter_program: String,
}

fn round_px(v: f64) -> i64 {
    v.round() as i64
}

/// Compile a spec-based render into a [`RenderPlan`].
///
/// `spec_dir` is the directory the spec file lives in; relative asset paths
/// resolve against it. Scratch text files are created in `run`, so the run
/// context must outlive the process invocation consuming the plan.
pub fn compile_spec(
    spec: &CompositionSpec,
    spec_dir: &Path,
    run: &mut RunContext,
    format: OutputFormat,
    quality: Option<f64>,
    config: &RenderConfig,
) -> FfrenderResult<RenderPlan> {
    spec.validate()?;

    let bg_color = sanitize_color(spec.background_color())?;

    // background.src is folded in as an implicit first image layer covering
    // the full canvas, making it equivalent to an explicit full-canvas layer.
    // The declared layer array order is authoritative after that: stages are
    // emitted in one interleaved pass so later entries always composite on
    // top of earlier ones, whatever their kind.
    let background_layer = spec.background_image_layer();

    let mut graph = FilterGraph::new();
    graph.push(FilterChain::new(
        ["0:v"],
        vec![FilterOp::Format { pix_fmt: "rgba" }],
        "base0",
    ));

    let mut inputs: Vec<ResolvedAsset> = Vec::new();
    let mut current = "base0".to_owned();
    let mut step = 0usize;

    let mut push_image = |graph: &mut FilterGraph,
                          inputs: &mut Vec<ResolvedAsset>,
                          current: &mut String,
                          step: &mut usize,
                          layer: &ImageLayerSpec| {
        inputs.push(resolve_asset(&layer.src, spec_dir));
        let input_index = inputs.len();
        let img_label = format!("img{input_index}");
        graph.push(FilterChain::new(
            [format!("{input_index}:v")],
            image_chain_ops(layer),
            img_label.clone(),
        ));
        *step += 1;
        let next = format!("base{step}");
        graph.push(FilterChain::new(
            [current.clone(), img_label],
            vec![FilterOp::Overlay {
                x: round_px(layer.x),
                y: round_px(layer.y),
            }],
            next.clone(),
        ));
        *current = next;
    };

    if let Some(bg) = &background_layer {
        push_image(&mut graph, &mut inputs, &mut current, &mut step, bg);
    }

    for layer in &spec.layers {
        match layer {
            LayerSpec::Image(img) => {
                push_image(&mut graph, &mut inputs, &mut current, &mut step, img);
            }
            LayerSpec::Text(text) => {
                let op = drawtext_op(text, run, config)?;
                step += 1;
                let next = format!("base{step}");
                graph.push(FilterChain::new(
                    [current.clone()],
                    vec![FilterOp::DrawText(op)],
                    next.clone(),
                ));
                current = next;
            }
        }
    }

    let filter_program = graph.program();

    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-f", "lavfi", "-i"]
        .map(str::to_owned)
        .to_vec();
    args.push(format!(
        "color=c={bg_color}:s={}x{}:d=1",
        spec.canvas_width(),
        spec.canvas_height()
    ));
    for input in &inputs {
        args.push("-i".to_owned());
        args.push(input.input_arg());
    }
    args.push("-filter_complex".to_owned());
    args.push(filter_program.clone());
    args.push("-map".to_owned());
    args.push(format!("[{current}]"));
    args.extend(["-frames:v", "1", "-an", "-sn"].map(str::to_owned));
    args.extend(format.encoder_args(quality));

    Ok(RenderPlan {
        args,
        filter_program,
    })
}

/// Compile a direct single-image decode (no filter graph): one input, one
/// frame, encoder tail.
pub fn compile_image(input: &ResolvedAsset, format: OutputFormat, quality: Option<f64>) -> RenderPlan {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-i"]
        .map(str::to_owned)
        .to_vec();
    args.push(input.input_arg());
    args.extend(["-frames:v", "1", "-an", "-sn"].map(str::to_owned));
    args.extend(format.encoder_args(quality));
    RenderPlan {
        args,
        filter_program: String::new(),
    }
}

/// The per-layer scale/fit/opacity chain, before the overlay.
fn image_chain_ops(layer: &ImageLayerSpec) -> Vec<FilterOp> {
    let width = round_px(layer.width);
    let height = round_px(layer.height);
    let mut ops = vec![FilterOp::Format { pix_fmt: "rgba" }];

    match layer.fit {
        FitMode::Contain => {
            ops.push(FilterOp::Scale {
                width,
                height,
                aspect: AspectPolicy::Decrease,
            });
            ops.push(FilterOp::Pad {
                width,
                height,
                color: TRANSPARENT.to_owned(),
            });
        }
        FitMode::Cover => {
            ops.push(FilterOp::Scale {
                width,
                height,
                aspect: AspectPolicy::Increase,
            });
            ops.push(FilterOp::Crop { width, height });
        }
        FitMode::Fill => {
            ops.push(FilterOp::Scale {
                width,
                height,
                aspect: AspectPolicy::Exact,
            });
        }
    }

    // Values outside [0, 1) mean "fully opaque, no adjustment" and skip the
    // stage entirely.
    if let Some(opacity) = layer.opacity
        && opacity.is_finite()
        && (0.0..1.0).contains(&opacity)
    {
        ops.push(FilterOp::AlphaMultiply { opacity });
    }

    ops
}

fn drawtext_op(
    layer: &TextLayerSpec,
    run: &mut RunContext,
    config: &RenderConfig,
) -> FfrenderResult<DrawTextOp> {
    let font_file = config
        .resolve_font_file(layer.font_file.as_deref())
        .ok_or_else(|| {
            FfrenderError::missing_font(
                "no usable font file for text layer (set `font_file` in the render config or `fontFile` on the layer)",
            )
        })?;

    // The literal text goes to a scratch file; embedding it inline in the
    // filter string would open a second escaping surface.
    let text_file = run.create_text_file(&layer.text)?;

    let color = layer
        .color
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("#ffffff");
    let font_color = sanitize_color(Some(color))?;

    let (box_color, box_border) = match layer.text_box.as_ref().and_then(|b| b.color.as_deref()) {
        Some(c) => (
            Some(sanitize_color(Some(c))?),
            layer
                .text_box
                .as_ref()
                .and_then(|b| b.border)
                .filter(|v| *v > 0.0)
                .map(round_px),
        ),
        None => (None, None),
    };

    Ok(DrawTextOp {
        font_file: font_file.to_string_lossy().into_owned(),
        text_file: text_file.to_string_lossy().into_owned(),
        x: round_px(layer.x),
        y: round_px(layer.y),
        font_size: round_px(layer.font_size),
        font_color,
        box_color,
        box_border,
    })
}
