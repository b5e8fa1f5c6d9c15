use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use winit::event_loop::EventLoop;

use comic_reader::cache_dir::CacheDir;
use comic_reader::cancel::CancellationToken;
use comic_reader::cli::Cli;
use comic_reader::files::collect_comics;
use comic_reader::loader::{spawn_gallery_loader, UserEvent};
use comic_reader::ui::App;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let comics = collect_comics(&cli.paths, cli.recursive);
    if comics.is_empty() {
        bail!("no comic archives found");
    }
    let config = cli.into_config(comics).map_err(|e| anyhow!(e))?;
    log::info!(
        "{} comics, page budget {} MB, cache in {}",
        config.comics.len(),
        config.pool.max_bytes / (1024 * 1024),
        config.cache_root.display()
    );

    let cache = Arc::new(CacheDir::new(&config.cache_root));
    cache
        .create()
        .with_context(|| format!("creating cache directory {}", config.cache_root.display()))?;

    let event_loop = EventLoop::<UserEvent>::with_user_event()
        .build()
        .context("creating event loop")?;
    let proxy = event_loop.create_proxy();

    // Covers are scanned in the background and appear as they finish
    let token = CancellationToken::new();
    let scanner = spawn_gallery_loader(
        config.comics.clone(),
        Arc::clone(&cache),
        config.thumb_dim,
        token.clone(),
        proxy.clone(),
    );

    let mut app = App::new(config, Arc::clone(&cache), proxy, token.clone());
    event_loop.run_app(&mut app).context("running event loop")?;

    // No scan may write covers once the cache is being removed
    token.cancel();
    if scanner.join().is_err() {
        log::warn!("Gallery loader panicked");
    }

    cache.cleanup().context("removing cache directory")?;
    Ok(())
}
