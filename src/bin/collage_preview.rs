use anyhow::{bail, Context, Result};
use log::{info, warn};
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::time::Duration;

use collage_view::cache::{self, LayeredImageCache};
use collage_view::{
    Bitmap, CollageController, CollageEvents, CollageRenderer, Config, HttpFetcher, MediaItem,
    MediaLoader, Size,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn parse_item(arg: &str) -> Result<MediaItem> {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        return Ok(MediaItem::remote(arg));
    }

    let image = image::open(arg).with_context(|| format!("Failed to open image {}", arg))?;
    Ok(MediaItem::inline(Bitmap::new(image)))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("Usage: collage-preview <output.png> <path-or-url>...");
    }
    let output = &args[0];
    let items = args[1..]
        .iter()
        .map(|arg| parse_item(arg))
        .collect::<Result<Vec<_>>>()?;

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    info!(
        "Rendering {} items at {}x{}",
        items.len(),
        config.render.width,
        config.render.height
    );

    let layered =
        LayeredImageCache::from_config(&config.cache).context("Failed to open image cache")?;
    let shared_cache = cache::install_shared(Arc::new(layered));
    let loader = MediaLoader::from_current_runtime(
        shared_cache,
        Arc::new(HttpFetcher::new(&config.network)),
    )?;

    let mut controller = CollageController::new(loader);
    controller.set_events(
        CollageEvents::new()
            .on_image_loaded(|url, bitmap| {
                info!(
                    "Loaded {} ({}x{})",
                    url,
                    bitmap.pixel_width(),
                    bitmap.pixel_height()
                )
            })
            .on_image_load_failed(|url, error| warn!("Could not load {}: {}", url, error)),
    );
    controller.layout(Size::new(
        config.render.width as f64,
        config.render.height as f64,
    ));
    controller.setup(items, config.layout_configuration());

    let deadline = Duration::from_secs(config.network.timeout_secs + 1);
    if tokio::time::timeout(deadline, controller.settle()).await.is_err() {
        warn!("Gave up waiting for images after {:?}", deadline);
        controller.cancel_pending_loads();
    }

    let mut renderer = CollageRenderer::new();
    if let Some(font_path) = &config.render.font_path {
        renderer = renderer
            .with_font_file(font_path)
            .with_context(|| format!("Failed to load font {}", font_path))?;
    }

    let canvas = renderer.render(&controller);
    canvas
        .save(output)
        .with_context(|| format!("Failed to save collage to {}", output))?;

    println!("Wrote {} ({} slots)", output, controller.slot_count());
    Ok(())
}
