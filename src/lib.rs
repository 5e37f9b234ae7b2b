//! ffrender turns a declarative JSON canvas description (a background plus
//! an ordered stack of image and text layers) into a single still image by
//! compiling an ffmpeg `filter_complex` program and orchestrating one child
//! process per render.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: [`RenderRequest`] → discriminated input (image / spec / delegate)
//! 2. **Validate**: spec JSON → typed [`CompositionSpec`]
//! 3. **Compile**: spec + resolved assets → typed filter IR → argument vector
//! 4. **Execute**: spawn ffmpeg, enforce the timeout, classify the exit
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Injection-proof by construction**: untrusted colors, paths and text
//!   pass through one sanitizer; arguments are a discrete vector, never a
//!   shell string; literal text lives in scratch files, never inline.
//! - **No leaks**: every run owns a private temp directory that is removed
//!   on success, error and timeout alike.
//! - **Deterministic**: compiling the same spec twice yields byte-identical
//!   arguments apart from run-scoped scratch paths.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod config;
mod encode;
mod exec;
mod filter;
mod foundation;
mod render;
mod runctx;
mod spec;

pub use crate::assets::resolve::{ResolvedAsset, is_file_url, is_http_url, resolve_asset, to_fs_path};
pub use crate::config::{ConfigProvider, RenderConfig};
pub use crate::encode::output::OutputFormat;
pub use crate::filter::compile::{RenderPlan, compile_image, compile_spec};
pub use crate::filter::graph::{AspectPolicy, DrawTextOp, FilterChain, FilterGraph, FilterOp};
pub use crate::filter::sanitize::{escape_filter_value, sanitize_color};
pub use crate::foundation::error::{FfrenderError, FfrenderResult};
pub use crate::render::{
    FfmpegRenderer, RenderOutput, RenderRequest, Renderer, RendererRegistry,
};
pub use crate::runctx::RunContext;
pub use crate::spec::model::{
    BackgroundSpec, CompositionSpec, FitMode, ImageLayerSpec, LayerSpec, TextBoxSpec,
    TextLayerSpec,
};
