//! EXIF tag extraction.
//!
//! This module is the tag-source boundary: [`read_tags`] pulls the
//! overlay-relevant tags out of a JPEG's EXIF directory into a
//! [`RawTagMap`]. Extraction is tolerant by design — a file with no EXIF
//! data yields an empty map, and the overlay falls back to its placeholder
//! identity line.

mod reader;

pub use reader::{RawTagMap, Rational, TagValue, read_tags};
