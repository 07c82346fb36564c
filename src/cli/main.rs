use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use exif_label::overlay::{LineColor, OverlayFont, Placement};
use exif_label::session::{RenderContext, SessionStore, StyleParams};
use exif_label::{config, exif, overlay, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "exif-label",
    version,
    about = "Overlay camera EXIF metadata onto JPEG photos — model, lens, exposure, date, and GPS rendered as a styled caption"
)]
struct Cli {
    /// JPEG files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output directory (default: next to each original)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Letterbox into a fixed tile, e.g. 1080x1080 (default: full-bleed)
    #[arg(long, value_name = "WxH")]
    letterbox: Option<String>,

    /// Caption scale, 10-100 (default from config)
    #[arg(long, value_name = "SCALE")]
    font_scale: Option<f32>,

    /// Caption opacity in percent, 0-100 (default from config)
    #[arg(long, value_name = "PERCENT")]
    opacity: Option<f32>,

    /// Print the caption lines for each image and exit
    #[arg(long = "show-tags")]
    show_tags: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;

    // CLI overrides
    if let Some(dir) = &cli.output {
        config.export.output_dir = Some(dir.clone());
    }

    // Validate inputs
    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Collect images
    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No JPEG files found in the specified paths.");
    }

    // Handle --show-tags
    if cli.show_tags {
        for image_path in &images {
            print_caption(image_path);
        }
        return Ok(());
    }

    log::info!("Found {} image(s) to process", images.len());

    // Resolve the overlay font
    let font = OverlayFont::resolve(
        config.render.font_path.as_deref(),
        config.render.font_family.as_deref(),
    )?;

    // Placement policy: letterboxed tile when requested, else full-bleed
    let placement = match &cli.letterbox {
        Some(size) => {
            let (width, height) = parse_letterbox(size)?;
            log::info!("Letterboxing into {width}x{height}");
            Placement::Letterbox { width, height }
        }
        None => Placement::FullBleed,
    };

    let ctx = RenderContext {
        render: &config.render,
        limits: &config.style,
        font: &font,
        placement,
    };

    // Default style, with CLI overrides
    let mut style = StyleParams::from_defaults(&config.style);
    if let Some(font_scale) = cli.font_scale {
        style.font_scale = font_scale;
    }
    if let Some(opacity) = cli.opacity {
        style.opacity = opacity / 100.0;
    }
    let style = style.clamped(&config.style);

    // One session per image; pipelines run concurrently, sessions stay
    // isolated
    let mut store = SessionStore::new(style);
    let mut tasks = tokio::task::JoinSet::new();
    for image_path in &images {
        let id = store.create(image_path);
        let task_path = image_path.clone();
        tasks.spawn(async move { (id, pipeline::decode_and_extract(&task_path).await) });
    }

    let total = images.len();
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, Ok(extracted))) => {
                let path = store.session(id).map(|s| s.path.clone()).unwrap_or_default();
                log::info!("Labeled: {}", path.display());
                store.complete(id, extracted.raster, extracted.lines, &ctx);
            }
            Ok((id, Err(err))) => {
                let path = store.session(id).map(|s| s.path.clone()).unwrap_or_default();
                log::error!("Failed to process {}: {err:#}", path.display());
                store.fail(id);
                failed += 1;
            }
            Err(err) => {
                log::error!("Pipeline task failed: {err}");
                failed += 1;
            }
        }
    }

    // Export in collection order, staggered
    if let Some(dir) = &config.export.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    let written = pipeline::export_sessions(&store, &config.export).await?;

    log::info!(
        "Done: {} exported, {failed} failed out of {total} images",
        written.len()
    );

    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the caption that would be rendered for one image.
fn print_caption(path: &Path) {
    let tags = exif::read_tags(path);
    let lines = overlay::format_lines(&tags);

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "─".repeat(60));
    for line in &lines {
        match line.color {
            LineColor::Accent => println!("  {RED}{}{RESET}", line.text),
            LineColor::Primary => println!("  {}", line.text),
        }
    }
    if tags.is_empty() {
        println!("  {DIM}(no EXIF metadata found){RESET}");
    }
}

/// Parse a `WxH` tile size, e.g. `1080x1080`.
fn parse_letterbox(size: &str) -> Result<(u32, u32)> {
    let (w, h) = size
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid tile size '{size}', expected WxH (e.g. 1080x1080)"))?;
    let width: u32 = w
        .trim()
        .parse()
        .with_context(|| format!("Invalid tile width '{w}'"))?;
    let height: u32 = h
        .trim()
        .parse()
        .with_context(|| format!("Invalid tile height '{h}'"))?;
    if width == 0 || height == 0 {
        anyhow::bail!("Tile dimensions must be non-zero");
    }
    Ok((width, height))
}
