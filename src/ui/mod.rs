use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use softbuffer::Surface;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::cache_dir::CacheDir;
use crate::cancel::CancellationToken;
use crate::cli::ReaderConfig;
use crate::comic::{Comic, ComicError};
use crate::loader::{spawn_comic_opener, spawn_prefetch_workers, PageCache, UserEvent};
use crate::navigator::Navigation;
use crate::ui::render::{draw_bottom_text, FrameCanvas, RenderContext};
use crate::ui::state::{gallery_intent, GalleryState, ReaderState};
use crate::viewport::{Point, Size};

pub mod render;
pub mod state;

const DOUBLE_CLICK: Duration = Duration::from_millis(400);

pub enum Screen {
    Gallery,
    Opening { slot: usize, name: String, done: usize, total: usize },
    Reading(ReaderState),
}

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

pub struct App {
    config: ReaderConfig,
    cache: Arc<CacheDir>,
    proxy: EventLoopProxy<UserEvent>,
    gallery_token: CancellationToken,
    /// The comic being extracted, if any.
    opener: Option<(CancellationToken, JoinHandle<()>)>,
    pub gallery: GalleryState,
    pub screen: Screen,
    pub window: Option<Arc<Window>>,
    pub context: Option<softbuffer::Context<Arc<Window>>>,
    pub surface: Option<Surface<Arc<Window>, Arc<Window>>>,
    pub next_redraw: Option<Instant>,
    cursor: Point,
    last_click: Option<Instant>,
}

impl App {
    pub fn new(
        config: ReaderConfig,
        cache: Arc<CacheDir>,
        proxy: EventLoopProxy<UserEvent>,
        gallery_token: CancellationToken,
    ) -> Self {
        let gallery = GalleryState::new(config.thumb_dim);
        Self {
            config,
            cache,
            proxy,
            gallery_token,
            opener: None,
            gallery,
            screen: Screen::Gallery,
            window: None,
            context: None,
            surface: None,
            next_redraw: None,
            cursor: Point::default(),
            last_click: None,
        }
    }

    fn client_size(&self) -> Size {
        self.window
            .as_ref()
            .map(|w| {
                let size = w.inner_size();
                Size::new(size.width as f64, size.height as f64)
            })
            .unwrap_or_default()
    }

    fn request_redraw(&self) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn open_current(&mut self) {
        let Some((slot, comic)) = self.gallery.gallery.take_current() else {
            return;
        };
        log::info!("Opening {}", comic.path().display());
        let name = comic.name().to_string();
        let total = comic.len();
        let token = CancellationToken::new();
        let handle = spawn_comic_opener(comic, Arc::clone(&self.cache), token.clone(), self.proxy.clone());
        self.opener = Some((token, handle));
        self.screen = Screen::Opening { slot, name, done: 0, total };
    }

    /// Cancel the comic being extracted and wait for its thread.
    fn stop_opener(&mut self) {
        if let Some((token, handle)) = self.opener.take() {
            token.cancel();
            if handle.join().is_err() {
                log::warn!("Comic opener panicked");
            }
        }
    }

    fn comic_opened(&mut self, comic: Comic, result: Result<(), ComicError>) {
        let Screen::Opening { slot, .. } = self.screen else {
            log::warn!("{} opened while not waiting for it", comic.name());
            return;
        };
        // The thread has finished once it reports
        self.stop_opener();
        if let Err(ComicError::Cancelled { .. }) = result {
            log::info!("Stopped opening {}", comic.name());
            self.gallery.gallery.restore(slot, comic);
            self.screen = Screen::Gallery;
            return;
        }
        if let Err(e) = result {
            log::error!("Cannot open {}: {}", comic.path().display(), e);
            self.gallery.gallery.restore(slot, comic);
            self.screen = Screen::Gallery;
            return;
        }
        let pages = match PageCache::for_comic(&comic, self.config.pool) {
            Ok(pages) => pages.into_shared(),
            Err(e) => {
                log::error!("Cannot read {}: {}", comic.path().display(), e);
                self.gallery.gallery.restore(slot, comic);
                self.screen = Screen::Gallery;
                return;
            }
        };
        spawn_prefetch_workers(Arc::clone(&pages), self.proxy.clone(), self.config.workers);
        let client = self.client_size();
        self.screen = Screen::Reading(ReaderState::new(slot, comic, pages, client));
    }

    fn close_reader(&mut self) {
        if let Screen::Reading(reader) = std::mem::replace(&mut self.screen, Screen::Gallery) {
            let (slot, comic) = reader.close(&self.cache);
            self.gallery.gallery.restore(slot, comic);
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: &Key) {
        let now = Instant::now();
        match &mut self.screen {
            Screen::Gallery => {
                if *key == Key::Named(NamedKey::Enter) {
                    self.open_current();
                    return;
                }
                match gallery_intent(key) {
                    Navigation::Back => event_loop.exit(),
                    intent => {
                        self.gallery.gallery.handle_input(intent, now);
                    }
                }
            }
            Screen::Opening { .. } => {
                // The opener reports back with a cancellation error
                if *key == Key::Named(NamedKey::Escape) {
                    if let Some((token, _)) = &self.opener {
                        token.cancel();
                    }
                }
            }
            Screen::Reading(reader) => {
                if reader.handle_key(key, now) == Navigation::Back {
                    self.close_reader();
                }
            }
        }
    }

    fn handle_click(&mut self, pressed: bool) {
        let Screen::Reading(reader) = &mut self.screen else {
            return;
        };
        if !pressed {
            reader.end_drag();
            return;
        }
        let now = Instant::now();
        let double = self.last_click.is_some_and(|t| now.duration_since(t) <= DOUBLE_CLICK);
        if double {
            self.last_click = None;
            reader.double_click(self.cursor);
        } else {
            self.last_click = Some(now);
            reader.begin_drag(self.cursor);
        }
    }

    fn window_title(&self) -> String {
        match &self.screen {
            Screen::Gallery => self.gallery.title(),
            Screen::Opening { name, done, total, .. } => format!("{} [extracting {}/{}]", name, done, total),
            Screen::Reading(reader) => reader.title(),
        }
    }

    /// Stop background work and delete what was extracted.
    fn shutdown(&mut self) {
        self.gallery_token.cancel();
        self.stop_opener();
        self.close_reader();
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("comic-reader")
            .with_inner_size(LogicalSize::new(1280u32, 900u32));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let surface = softbuffer::Context::new(Arc::clone(&window)).and_then(|context| {
            let surface = Surface::new(&context, Arc::clone(&window))?;
            Ok((context, surface))
        });
        match surface {
            Ok((context, surface)) => {
                self.context = Some(context);
                self.surface = Some(surface);
            }
            Err(e) => {
                log::error!("Cannot create drawing surface: {}", e);
                event_loop.exit();
                return;
            }
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::PageReady(index) | UserEvent::PageFailed(index) => {
                if let Screen::Reading(ref reader) = self.screen {
                    if reader.page_ready(index) {
                        self.request_redraw();
                    }
                }
            }
            UserEvent::ComicScanned { slot, comic } => {
                self.gallery.insert(slot, comic);
                self.request_redraw();
            }
            UserEvent::GalleryComplete => {
                log::info!("Gallery complete: {} comics", self.gallery.gallery.len());
                self.gallery.complete = true;
                self.request_redraw();
            }
            UserEvent::OpenProgress { done: d, total: t } => {
                if let Screen::Opening { ref mut done, ref mut total, .. } = self.screen {
                    *done = d;
                    *total = t;
                    self.request_redraw();
                }
            }
            UserEvent::ComicOpened { comic, result } => {
                self.comic_opened(*comic, result);
                self.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                let (w, h) = (width.max(1), height.max(1));
                if let (Some(surface), Some(nw), Some(nh)) =
                    (self.surface.as_mut(), NonZeroU32::new(w), NonZeroU32::new(h))
                {
                    if let Err(e) = surface.resize(nw, nh) {
                        log::warn!("Surface resize failed: {}", e);
                    }
                }
                if let Screen::Reading(ref mut reader) = self.screen {
                    reader.resize(Size::new(w as f64, h as f64));
                }
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    self.handle_key(event_loop, &event.logical_key);
                    self.request_redraw();
                }
            }

            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.handle_click(state == ElementState::Pressed);
                self.request_redraw();
            }

            WindowEvent::CursorMoved { position: PhysicalPosition { x, y }, .. } => {
                self.cursor = Point::new(x, y);
                if let Screen::Reading(ref mut reader) = self.screen {
                    if reader.drag_to(self.cursor) {
                        self.request_redraw();
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y as f64,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y / 40.0,
                };
                let cursor = self.cursor;
                if let Screen::Reading(ref mut reader) = self.screen {
                    if reader.wheel(cursor, lines) {
                        self.request_redraw();
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(window) = self.window.clone() else {
                    return;
                };
                let size = window.inner_size();
                let (fb_w, fb_h) = (size.width.max(1), size.height.max(1));
                let client = Size::new(fb_w as f64, fb_h as f64);
                let now = Instant::now();

                match self.screen {
                    Screen::Reading(ref mut reader) => {
                        reader.tick(now);
                    }
                    _ => {
                        self.gallery.gallery.tick(now);
                    }
                }
                window.set_title(&self.window_title());

                if let Some(ref mut surface) = self.surface {
                    if let (Some(nw), Some(nh)) = (NonZeroU32::new(fb_w), NonZeroU32::new(fb_h)) {
                        if let Err(e) = surface.resize(nw, nh) {
                            log::warn!("Surface resize failed: {}", e);
                        }
                    }
                    match surface.buffer_mut() {
                        Ok(mut buffer) => {
                            let mut canvas = FrameCanvas::new(&mut buffer, fb_w, fb_h);
                            match self.screen {
                                Screen::Reading(ref mut reader) => reader.render(&mut canvas),
                                Screen::Opening { ref name, done, total, .. } => {
                                    self.gallery.render(&mut canvas, client, now);
                                    canvas.reset();
                                    let label = format!("Extracting {} {}/{}", name, done, total);
                                    draw_bottom_text(&mut canvas, &label, client);
                                }
                                Screen::Gallery => self.gallery.render(&mut canvas, client, now),
                            }
                            if let Err(e) = buffer.present() {
                                log::warn!("Present failed: {}", e);
                            }
                        }
                        Err(e) => log::warn!("No frame buffer: {}", e),
                    }
                }

                // Schedule the next frame only while something animates
                self.next_redraw = match self.screen {
                    Screen::Reading(ref reader) => reader.next_frame(now),
                    _ => self.gallery.gallery.next_frame(now),
                };
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(when) = self.next_redraw {
            if Instant::now() >= when {
                self.next_redraw = None;
                self.request_redraw();
            } else {
                event_loop.set_control_flow(ControlFlow::WaitUntil(when));
            }
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
