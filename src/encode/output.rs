//! Mapping of the requested output kind onto ffmpeg encoder arguments.

use serde::{Deserialize, Serialize};

/// Default quality applied when a jpeg request carries none (or a
/// non-numeric value).
const DEFAULT_JPEG_QUALITY: f64 = 90.0;

/// Requested still-image output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless RGBA PNG.
    #[default]
    Png,
    /// Quality-scaled JPEG (no alpha).
    Jpeg,
    /// Lossy WebP with alpha.
    Webp,
}

impl OutputFormat {
    /// Lowercase name, matching the request's `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    /// Encoder argument tail for one still frame piped to stdout.
    ///
    /// The jpeg quality in `[1, 100]` (default 90) is linearly inverted onto
    /// ffmpeg's native 2–31 `-q:v` scale, where lower means better.
    pub(crate) fn encoder_args(self, quality: Option<f64>) -> Vec<String> {
        match self {
            Self::Png => ["-f", "image2pipe", "-vcodec", "png", "-pix_fmt", "rgba", "-"]
                .map(str::to_owned)
                .to_vec(),
            Self::Webp => [
                "-f",
                "image2pipe",
                "-vcodec",
                "libwebp",
                "-pix_fmt",
                "yuva420p",
                "-",
            ]
            .map(str::to_owned)
            .to_vec(),
            Self::Jpeg => {
                let q = quality
                    .filter(|q| q.is_finite())
                    .unwrap_or(DEFAULT_JPEG_QUALITY)
                    .clamp(1.0, 100.0);
                let qscale = (31.0 - (q / 100.0) * 29.0).round() as i64;
                let mut args = vec!["-q:v".to_owned(), qscale.to_string()];
                args.extend(
                    ["-f", "image2pipe", "-vcodec", "mjpeg", "-"].map(str::to_owned),
                );
                args
            }
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(format!("unknown output format \"{other}\" (expected png, jpeg or webp)")),
        }
    }
}
