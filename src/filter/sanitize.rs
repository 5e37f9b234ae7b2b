//! Conversion of untrusted user values into filter-graph-safe tokens.
//!
//! Everything that ends up inside `-filter_complex` goes through one of the
//! two functions here: colors become restricted tokens, free-form values
//! (file paths, in particular) are quoted and escaped.

use crate::foundation::error::{FfrenderError, FfrenderResult};

/// Fully-transparent black, the default for every absent color.
pub(crate) const TRANSPARENT: &str = "black@0.0";

/// Sanitize a user-supplied color into an ffmpeg color token.
///
/// Accepted inputs:
/// - absent / empty / `transparent` → fully-transparent black
/// - `#RRGGBB` → `0xrrggbb`
/// - `#RRGGBBAA` → `0xrrggbb@<alpha>` with alpha = AA/255
/// - any other token restricted to `[A-Za-z0-9#@._-]` (named or
///   engine-native colors) passes through unchanged
///
/// Everything else fails with [`FfrenderError::UnsafeValue`] to prevent
/// filter-syntax injection.
pub fn sanitize_color(color: Option<&str>) -> FfrenderResult<String> {
    let Some(color) = color else {
        return Ok(TRANSPARENT.to_owned());
    };
    let color = color.trim();
    if color.is_empty() || color == "transparent" {
        return Ok(TRANSPARENT.to_owned());
    }
    if let Some(token) = parse_hex_color(color) {
        return Ok(token);
    }
    if color
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '@' | '.' | '_' | '-'))
    {
        return Ok(color.to_owned());
    }
    Err(FfrenderError::unsafe_value(format!(
        "unsafe color value: {color}"
    )))
}

/// Parse `#RRGGBB[AA]` into the `0xrrggbb[@alpha]` form. Returns `None` for
/// anything that is not a 6/8-digit hex literal (the caller then applies the
/// restricted-token rule instead).
fn parse_hex_color(color: &str) -> Option<String> {
    let hex = color.strip_prefix('#')?;
    if !matches!(hex.len(), 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let rgb = hex[0..6].to_ascii_lowercase();
    if hex.len() == 8 {
        let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
        let alpha = f64::from(a) / 255.0;
        return Some(format!("0x{rgb}@{alpha}"));
    }
    Some(format!("0x{rgb}"))
}

/// Escape a free-form value for embedding in a filter-graph option.
///
/// Backslashes are normalized to forward slashes first (Windows paths), then
/// the value is wrapped in single quotes with internal `'` and `:`
/// backslash-escaped — the two characters that are syntactically significant
/// inside the filter mini-language.
pub fn escape_filter_value(value: &str) -> String {
    let normalized = value.replace('\\', "/");
    let escaped = normalized.replace('\'', "\\'").replace(':', "\\:");
    format!("'{escaped}'")
}
