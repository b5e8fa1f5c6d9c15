use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use rayon::prelude::*;
use winit::event_loop::EventLoopProxy;

use crate::cache_dir::CacheDir;
use crate::cancel::CancellationToken;
use crate::comic::{Comic, ComicError};
use crate::pool::{Decode, DecodedImage, ImageDecoder, ImagePool, PoolConfig, PoolError};

// ---------------------------------------------------------------------------
// Events delivered to the UI thread
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum UserEvent {
    PageReady(usize),
    PageFailed(usize),
    ComicScanned { slot: usize, comic: Comic },
    GalleryComplete,
    OpenProgress { done: usize, total: usize },
    ComicOpened { comic: Box<Comic>, result: Result<(), ComicError> },
}

/// Where background threads send their results.
pub trait Notify: Send + 'static {
    fn notify(&self, event: UserEvent);
}

impl Notify for EventLoopProxy<UserEvent> {
    fn notify(&self, event: UserEvent) {
        if self.send_event(event).is_err() {
            log::debug!("event loop closed, dropping event");
        }
    }
}

// ---------------------------------------------------------------------------
// Page cache (shared between UI and prefetch workers via Mutex + Condvar)
// ---------------------------------------------------------------------------

/// How far either side of the current page to prefetch so that prefetching
/// never pushes the current page out of a pool holding `min_resident` pages.
pub fn prefetch_radius(min_resident: usize) -> usize {
    min_resident.saturating_sub(1) / 2
}

pub struct PageCache<D = ImageDecoder> {
    pub pool: ImagePool<D>,
    pub current: usize,
    radius: usize,
    in_progress: HashSet<usize>,
    failed: HashSet<usize>,
    token: CancellationToken,
}

pub type SharedPages<D = ImageDecoder> = Arc<(Mutex<PageCache<D>>, Condvar)>;

impl PageCache<ImageDecoder> {
    /// Register the extracted pages of a loaded comic.
    pub fn for_comic(comic: &Comic, config: PoolConfig) -> Result<Self, PoolError> {
        let mut pool = ImagePool::new(config);
        for page in comic.pages() {
            pool.add_image(page.clone())?;
        }
        Ok(Self::new(pool, prefetch_radius(config.min_resident)))
    }
}

impl<D: Decode> PageCache<D> {
    pub fn new(pool: ImagePool<D>, radius: usize) -> Self {
        Self {
            pool,
            current: 0,
            radius,
            in_progress: HashSet::new(),
            failed: HashSet::new(),
            token: CancellationToken::new(),
        }
    }

    pub fn into_shared(self) -> SharedPages<D> {
        Arc::new((Mutex::new(self), Condvar::new()))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn has_failed(&self, index: usize) -> bool {
        self.failed.contains(&index)
    }

    /// The page's pixels if they are already decoded, refreshing recency.
    pub fn resident_page(&mut self, index: usize) -> Option<Arc<DecodedImage>> {
        if !self.pool.is_resident(index) {
            return None;
        }
        self.pool.bitmap(index).ok()
    }

    fn wanted(&self, index: usize) -> bool {
        index < self.pool.len()
            && !self.pool.is_resident(index)
            && !self.in_progress.contains(&index)
            && !self.failed.contains(&index)
    }

    /// The current page first, then the nearest neighbours, forward first.
    pub fn find_work(&self) -> Option<usize> {
        if self.wanted(self.current) {
            return Some(self.current);
        }
        for dist in 1..=self.radius {
            let fwd = self.current + dist;
            if self.wanted(fwd) {
                return Some(fwd);
            }
            if let Some(bwd) = self.current.checked_sub(dist) {
                if self.wanted(bwd) {
                    return Some(bwd);
                }
            }
        }
        None
    }
}

/// Move the prefetch window and wake the workers.
pub fn set_current_page<D: Decode>(shared: &SharedPages<D>, index: usize) {
    let (lock, cvar) = &**shared;
    let mut state = lock.lock().unwrap();
    if state.current != index {
        log::debug!("current page {} -> {}", state.current, index);
        state.current = index;
        cvar.notify_all();
    }
}

/// Stop the workers of a page cache. Decodes already running finish first.
pub fn close_pages<D: Decode>(shared: &SharedPages<D>) {
    let (lock, cvar) = &**shared;
    lock.lock().unwrap().token.cancel();
    cvar.notify_all();
}

// ---------------------------------------------------------------------------
// Background workers
// ---------------------------------------------------------------------------

pub fn spawn_prefetch_workers<D, N>(shared: SharedPages<D>, notify: N, num_threads: usize) -> Vec<JoinHandle<()>>
where
    D: Decode + Clone + Send + 'static,
    N: Notify + Clone,
{
    (0..num_threads.max(1))
        .map(|_| {
            let shared = Arc::clone(&shared);
            let notify = notify.clone();
            thread::spawn(move || prefetch_loop(&shared, &notify))
        })
        .collect()
}

fn prefetch_loop<D, N>(shared: &SharedPages<D>, notify: &N)
where
    D: Decode + Clone,
    N: Notify,
{
    let (lock, cvar) = &**shared;
    loop {
        // Wait for work
        let (index, path, decoder) = {
            let mut state = lock.lock().unwrap();
            loop {
                if state.token.is_cancelled() {
                    return;
                }
                if let Some(index) = state.find_work() {
                    match state.pool.pending_path(index) {
                        Ok(Some(path)) => {
                            state.in_progress.insert(index);
                            break (index, path, state.pool.decoder().clone());
                        }
                        Ok(None) => continue,
                        Err(e) => {
                            log::warn!("Page {}: {}", index, e);
                            state.failed.insert(index);
                            continue;
                        }
                    }
                }
                state = cvar.wait(state).unwrap();
            }
        };

        let decoded = decoder.decode(&path);

        let mut state = lock.lock().unwrap();
        state.in_progress.remove(&index);
        if state.token.is_cancelled() {
            return;
        }
        let event = match decoded.and_then(|d| state.pool.install(index, d)) {
            Ok(_) => UserEvent::PageReady(index),
            Err(e) => {
                log::warn!("Page {}: {}", index, e);
                state.failed.insert(index);
                UserEvent::PageFailed(index)
            }
        };
        cvar.notify_all();
        drop(state);
        notify.notify(event);
    }
}

/// Scan every archive for its page count and cover, in parallel. Comics
/// arrive in completion order tagged with their slot in `paths`.
pub fn spawn_gallery_loader<N: Notify>(
    paths: Vec<PathBuf>,
    cache: Arc<CacheDir>,
    thumb_dim: u32,
    token: CancellationToken,
    notify: N,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let notify = Mutex::new(notify);
        paths.par_iter().enumerate().for_each(|(slot, path)| {
            if token.is_cancelled() {
                return;
            }
            match Comic::scan(path, &cache, thumb_dim) {
                Ok(comic) => notify.lock().unwrap().notify(UserEvent::ComicScanned { slot, comic }),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        });
        if !token.is_cancelled() {
            notify.lock().unwrap().notify(UserEvent::GalleryComplete);
        }
    })
}

/// Extract a comic's pages off the UI thread. Cancelling `token` stops
/// between pages; the result is delivered either way.
pub fn spawn_comic_opener<N: Notify>(
    mut comic: Comic,
    cache: Arc<CacheDir>,
    token: CancellationToken,
    notify: N,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let result = comic.load(&cache, &token, |done, total| notify.notify(UserEvent::OpenProgress { done, total }));
        notify.notify(UserEvent::ComicOpened { comic: Box::new(comic), result });
    })
}
