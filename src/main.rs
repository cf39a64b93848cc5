//! Snapframe CLI
//!
//! Composes stills from image files and runs a scripted camera screen
//! session against the mock or a real camera.

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{Rgba, RgbaImage};
use snapframe::{
    capture::{
        CaptureConfig, ConfigError, FileConfig, Frame, FrameSource, MediaAccess, OverlayEntry,
    },
    compose::{
        AssetError, AssetLoader, CaptureFormat, ComposeError, Compositor, CompositorSettings,
        FsAssetLoader, MemoryAssetLoader, OverlayDescriptor, ViewportClass,
    },
    export::{DirectorySink, DownloadSink, ExportError, LogFeedback},
    metrics::{MetricsError, MetricsRegistry, MetricsSnapshot},
    screen::{CameraScreen, CaptureOutcome, ScreenError, ScreenOptions},
    StreamSession,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "metrics")]
use snapframe::metrics::{MetricsServer, MetricsServerConfig, MetricsState};
#[cfg(feature = "metrics")]
use std::sync::Arc;
#[cfg(feature = "metrics")]
use tokio::sync::RwLock;

const BUILTIN_OVERLAY: &str = "builtin:ring";

#[derive(Parser)]
#[command(name = "snapframe", version, about = "Camera capture with overlays")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose one still from an image file
    Compose(ComposeArgs),
    /// Drive a camera screen through a scripted session
    Demo(DemoArgs),
}

#[derive(Args)]
struct ComposeArgs {
    /// Frame image standing in for the live camera buffer
    frame: PathBuf,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size, default_value = "400x800")]
    viewport: (u32, u32),

    /// Overlay path, relative to the configured asset root
    #[arg(long)]
    overlay: Option<String>,

    /// Size the overlay for a narrow viewport
    #[arg(long, conflicts_with = "wide")]
    narrow: bool,

    /// Size the overlay for a wide viewport
    #[arg(long)]
    wide: bool,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Directory to write the still to
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct DemoArgs {
    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size, default_value = "400x800")]
    viewport: (u32, u32),

    /// Number of stills to take
    #[arg(long, default_value_t = 2)]
    shots: u32,

    /// Directory to write stills to
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Use a real camera instead of the synthetic one
    #[cfg(feature = "camera")]
    #[arg(long)]
    camera: bool,

    /// Serve metrics over HTTP until interrupted
    #[cfg(feature = "metrics")]
    #[arg(long)]
    serve_metrics: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for CaptureFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => CaptureFormat::Png,
            FormatArg::Jpeg => CaptureFormat::Jpeg,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read frame {path}: {source}")]
    Frame {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Screen(#[from] ScreenError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    Ok((w, h))
}

fn load_config(path: Option<&PathBuf>) -> Result<FileConfig, CliError> {
    let config = match path {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("Snapframe v{}", snapframe::VERSION);

    let result = match load_config(cli.config.as_ref()) {
        Ok(config) => match cli.command {
            Command::Compose(args) => run_compose(config, args).await,
            Command::Demo(args) => run_demo(config, args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_compose(mut config: FileConfig, args: ComposeArgs) -> Result<(), CliError> {
    if let Some(format) = args.format {
        config.compositor.format = format.into();
    }
    if let Some(dir) = args.out_dir {
        config.export.directory = dir;
    }

    let image = image::open(&args.frame).map_err(|source| CliError::Frame {
        path: args.frame.clone(),
        source,
    })?;
    let frame = Frame::from_image(image.to_rgba8(), 0);
    let (width, height) = args.viewport;
    let source = FrameSource::new(frame, width, height);

    let is_narrow = if args.narrow {
        true
    } else if args.wide {
        false
    } else {
        ViewportClass::from_width(width, config.compositor.narrow_breakpoint).is_narrow()
    };

    let compositor = Compositor::new(
        FsAssetLoader::new(config.compositor.asset_root.clone()),
        CompositorSettings::from_config(&config.compositor),
    );
    let overlay = args
        .overlay
        .map(|uri| OverlayDescriptor::new(uri).with_sizing(config.compositor.sizing()));

    let result = compositor
        .compose(&source, overlay.as_ref(), is_narrow)
        .await?;
    let path = DirectorySink::from_config(&config.export).offer(&result.image)?;

    println!(
        "{} ({}x{}, {} bytes, blake3 {})",
        path.display(),
        result.image.width(),
        result.image.height(),
        result.image.bytes().len(),
        result.image.digest().to_hex()
    );
    Ok(())
}

/// Overlay assets for the demo: files when a catalog is configured,
/// otherwise one generated ring.
enum DemoAssets {
    Files(FsAssetLoader),
    Builtin(MemoryAssetLoader),
}

impl DemoAssets {
    fn for_config(config: &mut FileConfig) -> Result<Self, CliError> {
        if !config.overlays.is_empty() {
            return Ok(DemoAssets::Files(FsAssetLoader::new(
                config.compositor.asset_root.clone(),
            )));
        }

        let ring = RgbaImage::from_fn(64, 64, |x, y| {
            let dx = x as f64 - 31.5;
            let dy = y as f64 - 31.5;
            let r = (dx * dx + dy * dy).sqrt();
            if (26.0..31.0).contains(&r) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let mut loader = MemoryAssetLoader::new();
        loader
            .insert_image(BUILTIN_OVERLAY, &ring)
            .map_err(ComposeError::from)?;
        config.overlays.push(OverlayEntry {
            name: "Ring".to_string(),
            uri: BUILTIN_OVERLAY.to_string(),
        });
        Ok(DemoAssets::Builtin(loader))
    }
}

impl AssetLoader for DemoAssets {
    async fn load(&self, uri: &str) -> Result<RgbaImage, AssetError> {
        match self {
            DemoAssets::Files(loader) => loader.load(uri).await,
            DemoAssets::Builtin(loader) => loader.load(uri).await,
        }
    }
}

/// Where demo metrics go.
enum MetricsSink {
    Local(MetricsRegistry),
    #[cfg(feature = "metrics")]
    Served(Arc<RwLock<MetricsState>>),
}

impl MetricsSink {
    async fn update(&self, snapshot: &MetricsSnapshot) {
        match self {
            MetricsSink::Local(registry) => registry.update(snapshot),
            #[cfg(feature = "metrics")]
            MetricsSink::Served(state) => state.read().await.update(snapshot),
        }
    }
}

async fn run_demo(mut config: FileConfig, args: DemoArgs) -> Result<(), CliError> {
    if let Some(dir) = args.out_dir.clone() {
        config.export.directory = dir;
    }

    #[cfg(feature = "camera")]
    if args.camera {
        let media = snapframe::capture::NokhwaMedia::new(&config.capture);
        return drive_demo(media, config, args).await;
    }

    let media = snapframe::capture::MockMedia::new();
    drive_demo(media, config, args).await
}

async fn drive_demo<M: MediaAccess>(
    media: M,
    mut config: FileConfig,
    args: DemoArgs,
) -> Result<(), CliError> {
    let assets = DemoAssets::for_config(&mut config)?;
    let capture: CaptureConfig = config.capture.clone();
    let session = StreamSession::new(media, capture, args.viewport);
    let compositor = Compositor::new(assets, CompositorSettings::from_config(&config.compositor));
    let mut screen = CameraScreen::new(
        session,
        compositor,
        DirectorySink::from_config(&config.export),
        LogFeedback,
        ScreenOptions::from_config(&config),
    );

    #[cfg(feature = "metrics")]
    let mut server_task = None;
    #[cfg(feature = "metrics")]
    let metrics = if args.serve_metrics {
        let server = MetricsServer::new(
            MetricsServerConfig::from_config(&config.metrics),
            MetricsRegistry::new()?,
        );
        let state = server.state();
        server_task = Some(tokio::spawn(server.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })));
        MetricsSink::Served(state)
    } else {
        MetricsSink::Local(MetricsRegistry::new()?)
    };
    #[cfg(not(feature = "metrics"))]
    let metrics = MetricsSink::Local(MetricsRegistry::new()?);

    screen.start().await?;
    metrics.update(&MetricsSnapshot::from_screen(&screen)).await;

    let catalog_len = screen.overlay_catalog().len();
    for shot in 0..args.shots {
        info!(
            shot,
            facing = %screen.state().facing(),
            actions = ?screen.available_actions(),
            "Live"
        );

        if catalog_len > 0 {
            screen.toggle_overlay_picker()?;
            screen.select_catalog_overlay(shot as usize % catalog_len)?;
        }

        match screen.capture().await? {
            CaptureOutcome::Captured(result) => {
                let path = screen.download()?;
                println!(
                    "shot {}: {} ({}x{})",
                    shot,
                    path.display(),
                    result.image.width(),
                    result.image.height()
                );
            }
            CaptureOutcome::Discarded => warn!(shot, "Capture discarded"),
        }
        metrics.update(&MetricsSnapshot::from_screen(&screen)).await;

        if screen.state().captured_image().is_some() {
            screen.cancel().await?;
        }
        if shot + 1 < args.shots {
            screen.switch_facing().await?;
        }
        metrics.update(&MetricsSnapshot::from_screen(&screen)).await;
    }

    let stats = screen.stats();
    info!(
        captures = stats.captures,
        failures = stats.capture_failures,
        discarded = stats.stale_discarded,
        downloads = stats.downloads,
        "Demo finished"
    );

    match metrics {
        MetricsSink::Local(registry) => print!("{}", registry.encode()?),
        #[cfg(feature = "metrics")]
        MetricsSink::Served(_) => {
            info!("Serving metrics, press Ctrl-C to exit");
            if let Some(task) = server_task {
                match task.await {
                    Ok(Err(e)) => warn!(error = %e, "Metrics server failed"),
                    Err(e) => warn!(error = %e, "Metrics server task panicked"),
                    Ok(Ok(())) => {}
                }
            }
        }
    }

    Ok(())
}
