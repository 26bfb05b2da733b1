use anyhow::{Context, Result};
use clap::Parser;
use layoutlab::snapshot::file_name;
use layoutlab::{
    Classifier, DeviceId, FrameView, HeaderProbeClassifier, HeuristicClassifier,
    HttpSnapshotFetcher, LabConfig, Orientation, Preview, PreviewBoard,
};
use log::info;
use std::path::{Path, PathBuf};

/// Preview a URL across mobile, tablet, laptop and desktop frames.
#[derive(Debug, Parser)]
#[command(name = "layoutlab", version, about)]
struct Args {
    /// URL or bare host to preview (e.g. `localhost:3000`, `chatgpt.com`)
    url: String,

    /// Zoom factor applied to the frames (0.2 - 1.0)
    #[arg(long)]
    zoom: Option<f32>,

    /// Show a device in landscape; may be given for several devices
    #[arg(long = "rotate", value_name = "DEVICE")]
    rotate: Vec<DeviceId>,

    /// Directory to write fetched snapshot images to
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Print the board as JSON instead of text
    #[arg(long)]
    json: bool,

    /// JSON config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Probe framing headers of sites the built-in lists do not cover
    #[arg(long)]
    probe_headers: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("layoutlab=info"))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => LabConfig::from_json_file(path)?,
        None => LabConfig::default(),
    };
    config.probe_headers |= args.probe_headers;

    let fetcher = HttpSnapshotFetcher::new(&config.user_agent, config.timeout_ms)?;
    let board = if config.probe_headers {
        let classifier = HeaderProbeClassifier::new(&config.user_agent, config.timeout_ms)?;
        run(&args, config, classifier, fetcher).await?
    } else {
        run(&args, config, HeuristicClassifier, fetcher).await?
    };

    if board.state.is_landing() {
        anyhow::bail!("nothing to preview: the URL is empty");
    }

    if let Some(dir) = &args.out {
        write_images(&board, dir)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        print_board(&board);
    }
    Ok(())
}

async fn run<C: Classifier + 'static>(
    args: &Args,
    config: LabConfig,
    classifier: C,
    fetcher: HttpSnapshotFetcher,
) -> Result<PreviewBoard> {
    let preview = Preview::new(config, classifier, fetcher).await?;

    if let Some(zoom) = args.zoom {
        preview.set_zoom(zoom).await?;
    }
    for device in &args.rotate {
        if !preview.set_orientation(*device, Orientation::Landscape).await? {
            log::warn!("{} cannot rotate; keeping portrait", device);
        }
    }

    if preview.submit(&args.url).await?.is_some() {
        info!("analyzing {}", args.url.trim());
    }
    let board = preview.settled().await?;
    preview.close().await?;
    Ok(board)
}

fn write_images(board: &PreviewBoard, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for frame in &board.frames {
        if let Some(image) = &frame.image {
            let path = dir.join(file_name(frame.device, &frame.key, image));
            std::fs::write(&path, &image.data)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_board(board: &PreviewBoard) {
    println!(
        "{}  [{} View]  zoom {:.2}",
        board.state.canonical_url(),
        board.state.strategy().label(),
        board.state.zoom()
    );
    for frame in &board.frames {
        let what = match &frame.view {
            FrameView::Blank => "idle".to_string(),
            FrameView::Embed(spec) => format!("embed {} (sandbox: {})", spec.src, spec.sandbox),
            FrameView::Loading { .. } => "generating snapshot...".to_string(),
            FrameView::Snapshot { src, .. } => format!("snapshot {}", src),
            FrameView::Placeholder { src, alt, .. } => format!("{}: {}", alt, src),
        };
        println!(
            "  {:<22} {:<28} {:>6.0}x{:<6.0} {}",
            frame.name, frame.size_label, frame.scaled_width, frame.scaled_height, what
        );
    }
}
