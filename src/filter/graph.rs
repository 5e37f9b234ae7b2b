//! Typed intermediate representation of the ffmpeg filter program.
//!
//! The compiler builds a list of labeled chains of typed ops and only the
//! final serialization step renders them to the textual `filter_complex`
//! mini-language. Escaping rules live in one place ([`FilterOp::render`])
//! and are unit-testable without spawning a process.

use crate::filter::sanitize::escape_filter_value;
use std::fmt::Write as _;

/// Aspect-ratio policy for a [`FilterOp::Scale`] stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectPolicy {
    /// Unconstrained scale to the exact target size.
    Exact,
    /// Keep aspect, scale down to fit inside the target (`contain`).
    Decrease,
    /// Keep aspect, scale up to fill the target (`cover`).
    Increase,
}

/// Parameters of one `drawtext` stage.
///
/// `font_file` and `text_file` are raw values escaped at render time; color
/// tokens have already passed the sanitizer and need no further escaping.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTextOp {
    /// Font file path.
    pub font_file: String,
    /// Scratch file holding the literal text content.
    pub text_file: String,
    /// Text origin x in pixels.
    pub x: i64,
    /// Text origin y in pixels.
    pub y: i64,
    /// Font size in pixels.
    pub font_size: i64,
    /// Sanitized font color token.
    pub font_color: String,
    /// Sanitized background box color token, when a box is drawn.
    pub box_color: Option<String>,
    /// Box border width in pixels.
    pub box_border: Option<i64>,
}

/// One typed stage inside a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Normalize the stream to an alpha-capable pixel format.
    Format {
        /// Target pixel format, e.g. `rgba`.
        pix_fmt: &'static str,
    },
    /// Scale to a target rectangle under an aspect policy.
    Scale {
        /// Target width.
        width: i64,
        /// Target height.
        height: i64,
        /// Aspect-ratio policy.
        aspect: AspectPolicy,
    },
    /// Center-crop to the target rectangle (pairs with `cover` scaling).
    Crop {
        /// Target width.
        width: i64,
        /// Target height.
        height: i64,
    },
    /// Center-pad to the target rectangle (pairs with `contain` scaling).
    Pad {
        /// Target width.
        width: i64,
        /// Target height.
        height: i64,
        /// Sanitized padding color token.
        color: String,
    },
    /// Multiply the alpha channel by a constant in `[0, 1)`.
    AlphaMultiply {
        /// The alpha factor.
        opacity: f64,
    },
    /// Composite the second input over the first at a pixel offset.
    Overlay {
        /// Left offset of the overlaid stream.
        x: i64,
        /// Top offset of the overlaid stream.
        y: i64,
    },
    /// Draw text from a scratch file.
    DrawText(DrawTextOp),
}

impl FilterOp {
    /// Render this op to its textual filter form.
    pub fn render(&self) -> String {
        match self {
            Self::Format { pix_fmt } => format!("format={pix_fmt}"),
            Self::Scale {
                width,
                height,
                aspect,
            } => match aspect {
                AspectPolicy::Exact => format!("scale=w={width}:h={height}"),
                AspectPolicy::Decrease => {
                    format!("scale=w={width}:h={height}:force_original_aspect_ratio=decrease")
                }
                AspectPolicy::Increase => {
                    format!("scale=w={width}:h={height}:force_original_aspect_ratio=increase")
                }
            },
            Self::Crop { width, height } => format!("crop=w={width}:h={height}"),
            Self::Pad {
                width,
                height,
                color,
            } => format!("pad=w={width}:h={height}:x=(ow-iw)/2:y=(oh-ih)/2:color={color}"),
            Self::AlphaMultiply { opacity } => format!("colorchannelmixer=aa={opacity}"),
            Self::Overlay { x, y } => format!("overlay={x}:{y}:format=auto"),
            Self::DrawText(op) => {
                let mut opts = vec![
                    format!("fontfile={}", escape_filter_value(&op.font_file)),
                    format!("textfile={}", escape_filter_value(&op.text_file)),
                    "reload=0".to_owned(),
                    format!("x={}", op.x),
                    format!("y={}", op.y),
                    format!("fontsize={}", op.font_size),
                    format!("fontcolor={}", op.font_color),
                ];
                if let Some(box_color) = &op.box_color {
                    opts.push("box=1".to_owned());
                    opts.push(format!("boxcolor={box_color}"));
                    if let Some(border) = op.box_border {
                        opts.push(format!("boxborderw={border}"));
                    }
                }
                format!("drawtext={}", opts.join(":"))
            }
        }
    }
}

/// One labeled chain: input pads, a comma-joined op list, an output pad.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    /// Input pad labels, e.g. `0:v` or `base0`.
    pub inputs: Vec<String>,
    /// Ops applied in sequence.
    pub ops: Vec<FilterOp>,
    /// Output pad label.
    pub output: String,
}

impl FilterChain {
    /// Build a chain from input labels, ops and an output label.
    pub fn new(
        inputs: impl IntoIterator<Item = impl Into<String>>,
        ops: Vec<FilterOp>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ops,
            output: output.into(),
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for input in &self.inputs {
            let _ = write!(out, "[{input}]");
        }
        out.push_str(
            &self
                .ops
                .iter()
                .map(FilterOp::render)
                .collect::<Vec<_>>()
                .join(","),
        );
        let _ = write!(out, "[{}]", self.output);
        out
    }
}

/// An ordered filter program: chains joined by `;`, plus the label mapped to
/// the output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
}

impl FilterGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chain. Declaration order is authoritative: it encodes the
    /// painter's-algorithm z-order and is preserved exactly.
    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    /// The output label of the last chain, i.e. the running base.
    pub fn last_label(&self) -> Option<&str> {
        self.chains.last().map(|c| c.output.as_str())
    }

    /// Serialize the whole graph to the `filter_complex` program string.
    pub fn program(&self) -> String {
        self.chains
            .iter()
            .map(FilterChain::render)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Number of chains in the graph.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Return `true` when the graph has no chains.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_renders_aspect_policy() {
        let exact = FilterOp::Scale {
            width: 100,
            height: 50,
            aspect: AspectPolicy::Exact,
        };
        assert_eq!(exact.render(), "scale=w=100:h=50");

        let cover = FilterOp::Scale {
            width: 100,
            height: 50,
            aspect: AspectPolicy::Increase,
        };
        assert_eq!(
            cover.render(),
            "scale=w=100:h=50:force_original_aspect_ratio=increase"
        );
    }

    #[test]
    fn pad_centers_and_carries_color() {
        let op = FilterOp::Pad {
            width: 64,
            height: 64,
            color: "black@0.0".to_owned(),
        };
        assert_eq!(
            op.render(),
            "pad=w=64:h=64:x=(ow-iw)/2:y=(oh-ih)/2:color=black@0.0"
        );
    }

    #[test]
    fn drawtext_escapes_paths_but_not_color_tokens() {
        let op = FilterOp::DrawText(DrawTextOp {
            font_file: "C:\\Fonts\\a.ttf".to_owned(),
            text_file: "/tmp/run/text-0.txt".to_owned(),
            x: 10,
            y: 20,
            font_size: 24,
            font_color: "0xffffff".to_owned(),
            box_color: None,
            box_border: None,
        });
        assert_eq!(
            op.render(),
            "drawtext=fontfile='C\\:/Fonts/a.ttf':textfile='/tmp/run/text-0.txt':reload=0:x=10:y=20:fontsize=24:fontcolor=0xffffff"
        );
    }

    #[test]
    fn drawtext_box_border_requires_box_color() {
        let op = FilterOp::DrawText(DrawTextOp {
            font_file: "f.ttf".to_owned(),
            text_file: "t.txt".to_owned(),
            x: 0,
            y: 0,
            font_size: 12,
            font_color: "white".to_owned(),
            box_color: Some("0x000000@0.5".to_owned()),
            box_border: Some(6),
        });
        let rendered = op.render();
        assert!(rendered.ends_with("box=1:boxcolor=0x000000@0.5:boxborderw=6"));
    }

    #[test]
    fn graph_joins_chains_in_declaration_order() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::new(
            ["0:v"],
            vec![FilterOp::Format { pix_fmt: "rgba" }],
            "base0",
        ));
        graph.push(FilterChain::new(
            ["base0", "img1"],
            vec![FilterOp::Overlay { x: 5, y: 7 }],
            "base1",
        ));
        assert_eq!(
            graph.program(),
            "[0:v]format=rgba[base0];[base0][img1]overlay=5:7:format=auto[base1]"
        );
        assert_eq!(graph.last_label(), Some("base1"));
    }
}
