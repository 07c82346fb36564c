use thiserror::Error;

use crate::exif::{RawTagMap, Rational, TagValue};

/// Placeholder identity when the camera model tag is absent.
const UNKNOWN_CAMERA: &str = "Unknown camera";

/// Separator between fragments of the settings and auxiliary lines.
const SEPARATOR: &str = " · ";

/// Color role of an overlay line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineColor {
    /// Neutral light text (lens, settings, date/GPS).
    Primary,
    /// Highlight color for the camera identity line.
    Accent,
}

/// One semantic unit of overlay text with its color role.
///
/// Lines are produced in priority order (identity first) and rendered in
/// reverse from the bottom edge upward, so the identity line ends up
/// closest to the bottom of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledLine {
    pub text: String,
    pub color: LineColor,
}

impl StyledLine {
    fn accent(text: impl Into<String>) -> Self {
        Self { text: text.into(), color: LineColor::Accent }
    }

    fn primary(text: impl Into<String>) -> Self {
        Self { text: text.into(), color: LineColor::Primary }
    }
}

/// Error for malformed tag input. Absence of individual tags is never an
/// error — only input that is not a mapping at all.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("tag input is not a mapping (got {0})")]
    NotAMapping(&'static str),
}

/// Build the ordered overlay lines from a raw tag map.
///
/// Categories with no matching tags contribute zero lines; only the
/// identity line always renders, via its fallback placeholder.
pub fn format_lines(tags: &RawTagMap) -> Vec<StyledLine> {
    let mut lines = Vec::new();

    let model = tags.text("Model").filter(|s| !s.is_empty());
    let lens = tags.text("LensModel").filter(|s| !s.is_empty());

    // When the lens name repeats the model name, the lens line supersedes
    // the identity line (substring heuristic, kept as observed).
    match (model, lens) {
        (Some(m), Some(l)) if l.contains(m) => {
            lines.push(StyledLine::accent(l));
        }
        (model, lens) => {
            lines.push(StyledLine::accent(model.unwrap_or(UNKNOWN_CAMERA)));
            if let Some(l) = lens {
                lines.push(StyledLine::primary(l));
            }
        }
    }

    let mut settings = Vec::new();
    if let Some(fl) = positive(tags.number("FocalLength")) {
        settings.push(format!("{}mm", fmt_number(fl)));
    }
    if let Some(f) = positive(tags.number("FNumber")) {
        settings.push(format!("f/{}", fmt_number(f)));
    }
    if let Some(t) = positive(tags.number("ExposureTime")) {
        settings.push(fmt_exposure(t));
    }
    if let Some(iso) = positive(tags.number("ISOSpeedRatings")) {
        settings.push(format!("ISO {}", fmt_number(iso)));
    }
    if !settings.is_empty() {
        lines.push(StyledLine::primary(settings.join(SEPARATOR)));
    }

    let mut aux = Vec::new();
    if let Some(date) = tags.text("DateTimeOriginal").and_then(fmt_date) {
        aux.push(date);
    }
    if let Some(gps) = fmt_gps(tags) {
        aux.push(gps);
    }
    if !aux.is_empty() {
        lines.push(StyledLine::primary(aux.join(SEPARATOR)));
    }

    lines
}

/// Build overlay lines from an untyped JSON tag mapping.
///
/// Fails only when the input is not an object; unconvertible entry values
/// are treated as absent tags.
pub fn format_json(value: &serde_json::Value) -> Result<Vec<StyledLine>, FormatError> {
    let object = value
        .as_object()
        .ok_or_else(|| FormatError::NotAMapping(json_type_name(value)))?;

    let tags: RawTagMap = object
        .iter()
        .filter_map(|(name, v)| TagValue::from_json(v).map(|tv| (name.clone(), tv)))
        .collect();

    Ok(format_lines(&tags))
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Shortest decimal form — `50` rather than `50.0`, `2.8` as-is.
fn fmt_number(v: f64) -> String {
    v.to_string()
}

/// Sub-second exposures render as the rounded reciprocal.
fn fmt_exposure(t: f64) -> String {
    if t < 1.0 {
        format!("1/{}s", (1.0 / t).round() as i64)
    } else {
        format!("{}s", fmt_number(t))
    }
}

/// Date portion only, separators normalized (`2023:04:01 12:30:45` →
/// `2023-04-01`).
fn fmt_date(raw: &str) -> Option<String> {
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S") {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    let date = raw.trim().split_whitespace().next()?;
    if date.is_empty() {
        return None;
    }
    Some(date.replace(':', "-"))
}

/// Decimal-degree GPS fragment, 4-decimal precision, hemisphere letters.
/// The sign from a S/W reference is carried by the letter.
fn fmt_gps(tags: &RawTagMap) -> Option<String> {
    let lat = dms_to_decimal(tags.rationals("GPSLatitude")?)?;
    let lon = dms_to_decimal(tags.rationals("GPSLongitude")?)?;
    let lat_ref = hemisphere(tags.text("GPSLatitudeRef"), 'N', 'S');
    let lon_ref = hemisphere(tags.text("GPSLongitudeRef"), 'E', 'W');

    Some(format!("{lat:.4}°{lat_ref}{SEPARATOR}{lon:.4}°{lon_ref}"))
}

fn hemisphere(tag: Option<&str>, positive: char, negative: char) -> char {
    match tag.and_then(|s| s.trim().chars().next()) {
        Some(c) if c.eq_ignore_ascii_case(&negative) => negative,
        _ => positive,
    }
}

/// Convert a degree/minute/second triple to decimal degrees.
fn dms_to_decimal(dms: &[Rational]) -> Option<f64> {
    if dms.len() != 3 {
        return None;
    }
    let degrees = dms[0].value()?;
    let minutes = dms[1].value()?;
    let seconds = dms[2].value()?;
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}
