use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use crate::config::ExportConfig;
use crate::exif::{self, RawTagMap};
use crate::overlay::{StyledLine, format_lines};
use crate::session::{RenderContext, SessionId, SessionStore};

/// The only accepted input type. Anything else is rejected at collection
/// time with a user-visible notice.
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Collect JPEG files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Each rejected file is reported once;
/// rejections never affect other inputs.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_jpeg(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_jpeg(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a JPEG extension.
fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| JPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// The decoded half of one image's pipeline: raster plus extracted caption.
pub struct ExtractedImage {
    pub raster: RgbaImage,
    pub lines: Vec<StyledLine>,
    pub tags: RawTagMap,
}

/// Decode a JPEG and extract its caption lines.
///
/// Decode and tag extraction run as separate blocking tasks so neither
/// stalls the runtime; they are independent and joined at the end. A file
/// without EXIF data still succeeds — the caption is then just the
/// fallback identity line.
pub async fn decode_and_extract(path: &Path) -> Result<ExtractedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let decode = tokio::task::spawn_blocking(move || -> Result<RgbaImage> {
        let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
            .context("Failed to decode JPEG")?;
        Ok(img.to_rgba8())
    });

    let tag_path = path.to_path_buf();
    let extract = tokio::task::spawn_blocking(move || exif::read_tags(&tag_path));

    let (raster, tags) = tokio::join!(decode, extract);
    let raster = raster.context("Decode task failed")??;
    let tags = tags.context("Extract task failed")?;

    log::debug!("{}: {} tag(s) extracted", path.display(), tags.len());
    let lines = format_lines(&tags);

    Ok(ExtractedImage { raster, lines, tags })
}

/// Run one image's full pipeline into the store: decode, extract, format,
/// attach, render. Returns whether the pipeline succeeded.
///
/// Failure is terminal for the session (it stays unrendered) and never
/// affects other sessions.
pub async fn process_into_store(
    store: &mut SessionStore,
    id: SessionId,
    path: &Path,
    ctx: &RenderContext<'_>,
) -> bool {
    match decode_and_extract(path).await {
        Ok(extracted) => {
            store.complete(id, extracted.raster, extracted.lines, ctx);
            true
        }
        Err(err) => {
            log::error!("Failed to process {}: {err:#}", path.display());
            store.fail(id);
            false
        }
    }
}

/// Derive the export file name: the `.jpg`/`.jpeg` extension is replaced
/// case-insensitively, and the suffix lands before it.
pub fn labeled_file_name(name: &str, suffix: &str) -> String {
    let lower = name.to_lowercase();
    let stem_len = if lower.ends_with(".jpeg") {
        name.len() - 5
    } else if lower.ends_with(".jpg") {
        name.len() - 4
    } else {
        name.len()
    };
    format!("{}{}.jpg", &name[..stem_len], suffix)
}

/// Encode an output raster as JPEG at the given quality.
pub fn encode_jpeg(raster: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image::DynamicImage::ImageRgba8(raster.clone()).to_rgb8();
    let mut bytes = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(std::io::Cursor::new(&mut bytes), quality);
    rgb.write_with_encoder(encoder).context("Failed to encode JPEG")?;
    Ok(bytes)
}

/// Export every rendered session, in collection order, one write per
/// stagger interval. Unrendered sessions are skipped with a notice.
pub async fn export_sessions(store: &SessionStore, cfg: &ExportConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for session in store.sessions() {
        let Some(output) = session.output() else {
            log::warn!("Skipping unrendered image: {}", session.path.display());
            continue;
        };

        if !written.is_empty() {
            tokio::time::sleep(Duration::from_millis(cfg.stagger_ms)).await;
        }

        let file_name = session
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.jpg");
        let target_dir = match &cfg.output_dir {
            Some(dir) => dir.clone(),
            None => session
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let target = target_dir.join(labeled_file_name(file_name, &cfg.suffix));

        let bytes = encode_jpeg(output, cfg.quality)?;
        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;

        log::info!("Exported {}", target.display());
        written.push(target);
    }

    Ok(written)
}
