//! Lumen headless runner
//!
//! Renders the demo scene for a number of frames on the headless device and
//! logs a summary.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_app::{init_tracing, App, DemoScene, LumenConfig};

/// Render the Lumen demo scene headlessly
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Render the Lumen demo scene on a headless device")]
#[command(version)]
struct Args {
    /// Configuration file (lumen.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to render
    #[arg(short, long, default_value = "120")]
    frames: u32,

    /// Rows in the scrolling list
    #[arg(long, default_value = "40")]
    rows: usize,

    /// Scroll the list by this many pixels on the first frame
    #[arg(long, default_value = "0")]
    scroll: f32,

    /// Override the logging filter from the configuration
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LumenConfig::load(path)?,
        None => LumenConfig::default(),
    };
    init_tracing(args.log.as_deref().unwrap_or(&config.logging.filter));

    let mut app = App::headless(&config)?;
    let scene = DemoScene::build(args.rows).context("Failed to build demo scene")?;
    app.set_root(scene.root.clone())?;

    let start = Instant::now();
    if args.scroll != 0.0 {
        // Offsets clamp against the last arrange, so lay out once first
        app.run(1, start)?;
        scene.scroll_by(args.scroll, start);
    }

    let report = app.run(args.frames, start)?;
    tracing::info!(
        "{} frames: {} draw calls, {} captures, {} failed subtrees",
        report.frames,
        report.draw_calls,
        report.captures,
        report.failed_subtrees
    );
    tracing::info!(
        "assets: {} live, {} peak, {} swept",
        report.live_assets,
        report.peak_live_assets,
        report.assets_swept
    );

    app.shutdown();
    Ok(())
}
