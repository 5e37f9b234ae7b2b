//! Resolution of layer `src` references into process inputs.
//!
//! Remote references pass through for ffmpeg to fetch; everything else
//! becomes a filesystem path. Existence is deliberately not pre-checked: a
//! missing file surfaces as a process-level error from ffmpeg, not here.

use std::path::{Path, PathBuf};

/// A resolved input the process orchestrator can consume, either a URL
/// fetched by ffmpeg itself or an absolute filesystem path. Resolved assets
/// are immutable inputs; source files are never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAsset {
    /// Remote `http(s)://` reference, passed through unchanged.
    Url(String),
    /// Local filesystem path.
    Path(PathBuf),
}

impl ResolvedAsset {
    /// The value handed to ffmpeg as an `-i` input argument.
    pub fn input_arg(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.to_string_lossy().into_owned(),
        }
    }
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Return `true` for `http://` / `https://` references (case-insensitive).
pub fn is_http_url(input: &str) -> bool {
    has_prefix_ignore_case(input, "http://") || has_prefix_ignore_case(input, "https://")
}

/// Return `true` for `file://` references (case-insensitive).
pub fn is_file_url(input: &str) -> bool {
    has_prefix_ignore_case(input, "file://")
}

/// Convert a `file://` URL into a native filesystem path.
///
/// Windows drive-letter forms need care: `file:///C:/x` strips to `/C:/x`
/// which must lose the leading slash, while `file://C:/x` strips to `C:/x`
/// which is already a path. Non-`file://` inputs are returned unchanged.
pub fn to_fs_path(input: &str) -> PathBuf {
    if !is_file_url(input) {
        return PathBuf::from(input);
    }
    let stripped = &input["file://".len()..];
    if is_rooted_drive_path(stripped) {
        return PathBuf::from(&stripped[1..]);
    }
    PathBuf::from(stripped)
}

/// `/C:/...` or `/C:\...`
fn is_rooted_drive_path(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 4
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
        && matches!(bytes[3], b'/' | b'\\')
}

/// Resolve a layer's `src` against the spec file's directory.
///
/// Remote references pass through; `file://` URLs become native paths;
/// everything else is a filesystem path, made absolute relative to
/// `base_dir` when needed.
pub fn resolve_asset(src: &str, base_dir: &Path) -> ResolvedAsset {
    let src = src.trim();
    if is_http_url(src) {
        return ResolvedAsset::Url(src.to_owned());
    }
    let fs_path = to_fs_path(src);
    if fs_path.is_absolute() {
        return ResolvedAsset::Path(fs_path);
    }
    ResolvedAsset::Path(base_dir.join(fs_path))
}
