use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glint_renderer::{ProgressiveRenderer, RenderConfig};

mod scenes;

use scenes::DemoScene;

/// Render a built-in demo scene progressively and write it as a PNG.
#[derive(Debug, Parser)]
#[command(name = "glint", version)]
struct Args {
    /// Scene to render
    #[arg(long, value_enum, default_value_t = DemoScene::Cornell)]
    scene: DemoScene,

    /// Width of the rendered image
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Height of the rendered image
    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Total samples per pixel to accumulate before writing the image
    #[arg(short, long, default_value_t = 64)]
    samples: u32,

    /// Samples per pixel in each worker batch (overrides the config file)
    #[arg(long)]
    batch: Option<u32>,

    /// Number of worker threads (overrides the config file)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Write an intermediate image every N samples per pixel
    #[arg(long)]
    snapshot_every: Option<u32>,

    /// JSON render config to start from
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,
}

impl Args {
    /// Load the config file (or defaults) and apply command-line overrides.
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => RenderConfig::default(),
        };

        if let Some(batch) = self.batch {
            config.samples_per_pixel = batch;
        }
        if let Some(threads) = self.threads {
            config.workers = Some(threads);
        }
        if self.config.is_none() {
            if let Some(background) = self.scene.background() {
                config.background = background;
            }
        }
        config.target_samples = Some(self.samples);

        config.validate().context("Invalid render settings")?;
        Ok(config)
    }
}

fn write_png(path: &Path, width: u32, height: u32, rgba: Vec<u8>) -> Result<()> {
    let image = image::RgbaImage::from_raw(width, height, rgba)
        .context("Frame size does not match the image dimensions")?;
    image
        .save(path)
        .with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Wrote {:?}", path);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = args.render_config()?;

    log::info!("Building {:?} scene", args.scene);
    let (scene, camera) = args.scene.build().context("Failed to build demo scene")?;
    let camera = camera.with_resolution(args.width, args.height);

    let mut renderer =
        ProgressiveRenderer::new(scene, camera, config).context("Failed to start renderer")?;
    let start = Instant::now();
    renderer.start();

    let step = args.snapshot_every.unwrap_or(args.samples).max(1);
    let mut reached = 0;
    while reached < args.samples && !renderer.is_converged() {
        let next = (reached + step).min(args.samples);
        renderer.wait_for_samples(next);
        reached = renderer.accumulation().min_samples();

        let stats = renderer.stats();
        log::info!(
            "{} / {} spp ({} batches merged, {} stale) after {:.2?}",
            reached,
            args.samples,
            stats.merged,
            stats.stale,
            start.elapsed()
        );

        if args.snapshot_every.is_some() && reached < args.samples {
            write_png(&args.output, args.width, args.height, renderer.frame_rgba())?;
        }

        if reached < next {
            // Nothing left to dispatch
            break;
        }
    }

    write_png(&args.output, args.width, args.height, renderer.frame_rgba())?;
    log::info!("Finished in {:.2?}", start.elapsed());
    Ok(())
}
