use nom_exif::*;
use std::collections::HashMap;
use std::path::Path;

/// A rational tag value — numerator/denominator pair as stored in the
/// EXIF directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational(pub i64, pub i64);

impl Rational {
    /// Reduce the pair to its decimal ratio. `None` for a zero denominator.
    pub fn value(self) -> Option<f64> {
        if self.1 == 0 {
            None
        } else {
            Some(self.0 as f64 / self.1 as f64)
        }
    }
}

/// A single raw tag value. Numeric tags may arrive as plain numbers or as
/// rational pairs; GPS coordinates arrive as degree/minute/second triples.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Number(f64),
    Rational(Rational),
    Rationals(Vec<Rational>),
}

impl TagValue {
    /// Interpret the value as a number, reducing rationals.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TagValue::Number(n) => Some(*n),
            TagValue::Rational(r) => r.value(),
            TagValue::Text(s) => s.trim().parse().ok(),
            TagValue::Rationals(_) => None,
        }
    }

    /// Interpret the value as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Interpret the value as a sequence of rational pairs (GPS triples).
    pub fn as_rationals(&self) -> Option<&[Rational]> {
        match self {
            TagValue::Rationals(rs) => Some(rs.as_slice()),
            _ => None,
        }
    }

    /// Convert a JSON value into a tag value. Rational pairs are encoded as
    /// two-element integer arrays, GPS triples as arrays of such pairs.
    pub fn from_json(value: &serde_json::Value) -> Option<TagValue> {
        use serde_json::Value;
        match value {
            Value::String(s) => Some(TagValue::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(TagValue::Number),
            Value::Array(items) => {
                if let Some(r) = json_rational(items) {
                    return Some(TagValue::Rational(r));
                }
                let triple: Option<Vec<Rational>> = items
                    .iter()
                    .map(|item| item.as_array().and_then(|pair| json_rational(pair)))
                    .collect();
                triple.map(TagValue::Rationals)
            }
            _ => None,
        }
    }
}

fn json_rational(items: &[serde_json::Value]) -> Option<Rational> {
    if items.len() != 2 {
        return None;
    }
    Some(Rational(items[0].as_i64()?, items[1].as_i64()?))
}

/// A mapping from tag name to raw value, as produced by the extraction
/// boundary. Any tag may be absent — an empty map is valid input everywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTagMap(HashMap<String, TagValue>);

impl RawTagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: TagValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.0.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(TagValue::as_text)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(TagValue::as_number)
    }

    pub fn rationals(&self, name: &str) -> Option<&[Rational]> {
        self.get(name).and_then(TagValue::as_rationals)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, TagValue)> for RawTagMap {
    fn from_iter<T: IntoIterator<Item = (String, TagValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The EXIF tags the overlay consumes, paired with their map keys.
const OVERLAY_TAGS: &[(ExifTag, &str)] = &[
    (ExifTag::Model, "Model"),
    (ExifTag::LensModel, "LensModel"),
    (ExifTag::FocalLength, "FocalLength"),
    (ExifTag::FNumber, "FNumber"),
    (ExifTag::ExposureTime, "ExposureTime"),
    (ExifTag::ISOSpeedRatings, "ISOSpeedRatings"),
    (ExifTag::DateTimeOriginal, "DateTimeOriginal"),
];

/// Read the overlay-relevant tags from an image file.
///
/// A file with no EXIF directory (or one nom-exif cannot parse) yields an
/// empty map — the overlay then renders only the fallback identity line.
pub fn read_tags(path: &Path) -> RawTagMap {
    let mut parser = MediaParser::new();
    let ms = match MediaSource::file_path(path) {
        Ok(ms) => ms,
        Err(e) => {
            log::warn!("Failed to open {}: {e}", path.display());
            return RawTagMap::default();
        }
    };

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return RawTagMap::default();
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let mut tags = RawTagMap::new();

    for (tag, name) in OVERLAY_TAGS {
        if let Some(val) = exif.get(*tag) {
            if let Some(converted) = entry_to_tag_value(val) {
                tags.insert(*name, converted);
            }
        }
    }

    if let Some(gps) = gps_info {
        tags.insert("GPSLatitude", TagValue::Rationals(latlng_to_rationals(&gps.latitude)));
        tags.insert("GPSLatitudeRef", TagValue::Text(gps.latitude_ref.to_string()));
        tags.insert("GPSLongitude", TagValue::Rationals(latlng_to_rationals(&gps.longitude)));
        tags.insert("GPSLongitudeRef", TagValue::Text(gps.longitude_ref.to_string()));
    }

    tags
}

/// Convert a nom-exif entry into a tag value, preserving rationals as pairs.
fn entry_to_tag_value(val: &EntryValue) -> Option<TagValue> {
    let converted = match val {
        EntryValue::Text(s) => {
            let s = s.trim().trim_matches('"');
            if s.is_empty() {
                return None;
            }
            TagValue::Text(s.to_string())
        }
        EntryValue::URational(r) => TagValue::Rational(Rational(r.0 as i64, r.1 as i64)),
        EntryValue::IRational(r) => TagValue::Rational(Rational(r.0 as i64, r.1 as i64)),
        EntryValue::URationalArray(rs) => {
            TagValue::Rationals(rs.iter().map(|r| Rational(r.0 as i64, r.1 as i64)).collect())
        }
        EntryValue::IRationalArray(rs) => {
            TagValue::Rationals(rs.iter().map(|r| Rational(r.0 as i64, r.1 as i64)).collect())
        }
        EntryValue::U16(n) => TagValue::Number(*n as f64),
        EntryValue::U32(n) => TagValue::Number(*n as f64),
        EntryValue::F32(n) => TagValue::Number(*n as f64),
        EntryValue::F64(n) => TagValue::Number(*n),
        // Canonical EXIF datetime form; the formatter normalizes it further.
        EntryValue::Time(t) => TagValue::Text(t.format("%Y:%m:%d %H:%M:%S").to_string()),
        other => {
            let s = other.to_string();
            let s = s.trim().trim_matches('"');
            if s.is_empty() {
                return None;
            }
            TagValue::Text(s.to_string())
        }
    };
    Some(converted)
}

/// Flatten a nom-exif LatLng (3 URationals: deg, min, sec) into pairs.
fn latlng_to_rationals(latlng: &LatLng) -> Vec<Rational> {
    vec![
        Rational(latlng.0.0 as i64, latlng.0.1 as i64),
        Rational(latlng.1.0 as i64, latlng.1.1 as i64),
        Rational(latlng.2.0 as i64, latlng.2.1 as i64),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_reduces() {
        assert_eq!(Rational(28, 10).value(), Some(2.8));
        assert_eq!(Rational(50, 1).value(), Some(50.0));
        assert_eq!(Rational(1, 0).value(), None);
    }

    #[test]
    fn tag_value_as_number() {
        assert_eq!(TagValue::Number(2.8).as_number(), Some(2.8));
        assert_eq!(TagValue::Rational(Rational(1, 250)).as_number(), Some(0.004));
        assert_eq!(TagValue::Text("100".into()).as_number(), Some(100.0));
        assert_eq!(TagValue::Text("Camera".into()).as_number(), None);
    }

    #[test]
    fn tag_value_from_json() {
        use serde_json::json;
        assert_eq!(
            TagValue::from_json(&json!("Camera X")),
            Some(TagValue::Text("Camera X".into()))
        );
        assert_eq!(TagValue::from_json(&json!(2.8)), Some(TagValue::Number(2.8)));
        assert_eq!(
            TagValue::from_json(&json!([1, 250])),
            Some(TagValue::Rational(Rational(1, 250)))
        );
        assert_eq!(
            TagValue::from_json(&json!([[48, 1], [8, 1], [1500, 100]])),
            Some(TagValue::Rationals(vec![
                Rational(48, 1),
                Rational(8, 1),
                Rational(1500, 100),
            ]))
        );
        assert_eq!(TagValue::from_json(&serde_json::Value::Null), None);
        assert_eq!(TagValue::from_json(&json!([1, 2, 3])), None);
    }

    #[test]
    fn read_tags_missing_file_is_empty() {
        let tags = read_tags(Path::new("/nonexistent/photo.jpg"));
        assert!(tags.is_empty());
    }

    #[test]
    fn read_tags_no_exif_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blank.jpg");
        // A 1x1 JPEG with no EXIF segment
        let img = image::RgbImage::from_pixel(1, 1, image::Rgb([0, 0, 0]));
        img.save(&path).unwrap();

        let tags = read_tags(&path);
        assert!(tags.is_empty());
    }
}
