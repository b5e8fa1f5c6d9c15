use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use winit::keyboard::{Key, NamedKey};

use crate::cache_dir::CacheDir;
use crate::comic::Comic;
use crate::gallery::{layout_covers, Gallery};
use crate::gesture::{Gesture, GestureState};
use crate::loader::{close_pages, set_current_page, SharedPages};
use crate::navigator::{
    apply_zoom_cycle, compute_step, entry_viewport, initial_viewport, optimize_viewport, turn_page, Navigation,
    ScrollMode, Step, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};
use crate::pool::{Decode, DecodedImage, ImageDecoder, ImagePool, PoolConfig};
use crate::ui::render::{
    draw_bottom_text, draw_wrapped_text, rgb, text_size, RenderContext, BG_COLOR, PLACEHOLDER_COLOR, TEXT_COLOR,
};
use crate::viewport::{Point, Size, Viewport};

// ---------------------------------------------------------------------------
// Key bindings
// ---------------------------------------------------------------------------

pub fn reader_intent(key: &Key, mode: ScrollMode) -> Navigation {
    match key {
        Key::Named(NamedKey::ArrowRight) => mode.forward(),
        Key::Named(NamedKey::ArrowLeft) => mode.backward(),
        Key::Named(NamedKey::PageDown) => Navigation::NextPage,
        Key::Named(NamedKey::PageUp) => Navigation::PreviousPage,
        Key::Named(NamedKey::Home) => Navigation::JumpToPage(0),
        Key::Named(NamedKey::End) => Navigation::JumpToPage(usize::MAX),
        Key::Named(NamedKey::Escape) => Navigation::Back,
        Key::Character(s) if s.eq_ignore_ascii_case("s") => Navigation::SwitchScroll,
        _ => Navigation::NoOp,
    }
}

/// Enter is not an intent; the app opens the focused comic itself.
pub fn gallery_intent(key: &Key) -> Navigation {
    match key {
        Key::Named(NamedKey::ArrowRight) => Navigation::NextComic,
        Key::Named(NamedKey::ArrowLeft) => Navigation::PreviousComic,
        Key::Named(NamedKey::Escape) => Navigation::Back,
        Key::Character(s) => match s.chars().next() {
            Some(c) if c.is_alphanumeric() => Navigation::JumpToComic(c),
            _ => Navigation::NoOp,
        },
        _ => Navigation::NoOp,
    }
}

/// Longest page number that can be typed.
const PAGE_ENTRY_DIGITS: usize = 6;

/// One line of text centered in the client area.
fn draw_centered_text(ctx: &mut impl RenderContext, text: &str, client: Size) {
    let size = text_size(text);
    let color = rgb(TEXT_COLOR[0], TEXT_COLOR[1], TEXT_COLOR[2]);
    ctx.draw_text(text, (client.width - size.width) / 2.0, (client.height - size.height) / 2.0, color);
}

// ---------------------------------------------------------------------------
// Reader screen
// ---------------------------------------------------------------------------

pub struct ReaderState<D = ImageDecoder> {
    pub slot: usize,
    pub comic: Comic,
    pages: SharedPages<D>,
    index: usize,
    viewport: Viewport,
    gesture: Gesture,
    scroll_mode: ScrollMode,
    client: Size,
    /// Page we came from, until the new page is decoded and positioned.
    entered_from: Option<usize>,
    /// Digits typed so far for go-to-page.
    page_entry: String,
}

impl<D: Decode> ReaderState<D> {
    pub fn new(slot: usize, comic: Comic, pages: SharedPages<D>, client: Size) -> Self {
        set_current_page(&pages, 0);
        Self {
            slot,
            comic,
            pages,
            index: 0,
            viewport: Viewport::default(),
            gesture: Gesture::new(),
            scroll_mode: ScrollMode::default(),
            client,
            entered_from: None,
            page_entry: String::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scroll_mode(&self) -> ScrollMode {
        self.scroll_mode
    }

    pub fn is_animating(&self) -> bool {
        self.gesture.is_animating()
    }

    fn page_count(&self) -> usize {
        self.comic.pages().len()
    }

    fn page(&self) -> Option<Arc<DecodedImage>> {
        let (lock, _) = &*self.pages;
        lock.lock().unwrap().resident_page(self.index)
    }

    fn page_failed(&self) -> bool {
        let (lock, _) = &*self.pages;
        lock.lock().unwrap().has_failed(self.index)
    }

    /// The current page, with the viewport placed on it once it is decoded.
    fn layout(&mut self) -> Option<Arc<DecodedImage>> {
        let page = self.page()?;
        if self.client.width <= 0.0 || self.client.height <= 0.0 {
            return Some(page);
        }
        let size = page.size();
        if self.viewport.is_empty() {
            self.viewport = initial_viewport(self.client, size);
        }
        if let Some(from) = self.entered_from.take() {
            self.viewport = entry_viewport(&self.viewport, from, self.index, size);
        }
        if self.gesture.is_settled() {
            optimize_viewport(&mut self.viewport, size);
        }
        Some(page)
    }

    fn go_to(&mut self, target: usize) -> bool {
        if target == self.index {
            return false;
        }
        log::debug!("{}: page {} -> {}", self.comic.name(), self.index, target);
        self.entered_from = Some(self.index);
        self.index = target;
        set_current_page(&self.pages, target);
        true
    }

    fn turn(&mut self, intent: Navigation) -> bool {
        self.go_to(turn_page(self.index, self.page_count(), intent))
    }

    /// Apply a navigation intent. Returns `true` if a redraw is needed.
    /// Intents are ignored while a pan or animation is in progress.
    pub fn handle_input(&mut self, intent: Navigation, now: Instant) -> bool {
        if !self.gesture.is_settled() {
            log::debug!("ignoring {:?} during {:?}", intent, self.gesture.state());
            return false;
        }
        match intent {
            Navigation::SwitchScroll => {
                self.scroll_mode = self.scroll_mode.toggled();
                log::debug!("scroll mode {:?}", self.scroll_mode);
                true
            }
            Navigation::NextView | Navigation::PreviousView => {
                // No step until the page's size is known
                let Some(page) = self.layout() else {
                    return false;
                };
                match compute_step(intent, &self.viewport, page.size()) {
                    Step::Shift(delta) => self.gesture.begin_animation(delta, now),
                    Step::NextPage => self.turn(Navigation::NextPage),
                    Step::PreviousPage => self.turn(Navigation::PreviousPage),
                    Step::None => false,
                }
            }
            Navigation::NextPage | Navigation::PreviousPage | Navigation::JumpToPage(_) => self.turn(intent),
            _ => false,
        }
    }

    /// Keys of the reader screen. Digits, Backspace and Enter drive
    /// go-to-page; Escape first abandons a page number being typed.
    /// Returns `Navigation::Back` when the reader should close, otherwise
    /// `NoOp` once the key has been handled.
    pub fn handle_key(&mut self, key: &Key, now: Instant) -> Navigation {
        match key {
            Key::Character(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
                for digit in s.chars() {
                    if self.page_entry.len() < PAGE_ENTRY_DIGITS {
                        self.page_entry.push(digit);
                    }
                }
            }
            Key::Named(NamedKey::Backspace) => {
                self.page_entry.pop();
            }
            Key::Named(NamedKey::Enter) => {
                self.submit_page_entry(now);
            }
            Key::Named(NamedKey::Escape) if !self.page_entry.is_empty() => self.page_entry.clear(),
            _ => match reader_intent(key, self.scroll_mode) {
                Navigation::Back => return Navigation::Back,
                intent => {
                    self.handle_input(intent, now);
                }
            },
        }
        Navigation::NoOp
    }

    /// The page number being typed, if any.
    pub fn page_entry(&self) -> Option<&str> {
        (!self.page_entry.is_empty()).then_some(self.page_entry.as_str())
    }

    /// Jump to the typed 1-based page number. Page 0 is ignored and large
    /// numbers land on the last page.
    fn submit_page_entry(&mut self, now: Instant) -> bool {
        let entry = std::mem::take(&mut self.page_entry);
        match entry.parse::<usize>() {
            Ok(page) if page > 0 => self.handle_input(Navigation::JumpToPage(page - 1), now),
            _ => false,
        }
    }

    pub fn page_ready(&self, index: usize) -> bool {
        index == self.index
    }

    pub fn resize(&mut self, client: Size) {
        if !self.viewport.is_empty() && client.width > 0.0 && client.height > 0.0 {
            self.viewport.fit_aspect(client);
        }
        self.client = client;
    }

    /// Zoom around the cursor. Positive `lines` zooms in.
    pub fn wheel(&mut self, cursor: Point, lines: f64) -> bool {
        if lines == 0.0 || self.gesture.is_animating() || self.viewport.is_empty() {
            return false;
        }
        self.gesture.finish_pan(&mut self.viewport);
        let anchor = self.viewport.map_client_point(cursor, self.client);
        let factor = if lines > 0.0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        self.viewport.scale_at_point(anchor, factor);
        true
    }

    pub fn double_click(&mut self, cursor: Point) -> bool {
        if !self.gesture.is_settled() {
            return false;
        }
        let Some(page) = self.layout() else {
            return false;
        };
        if self.viewport.is_empty() {
            return false;
        }
        apply_zoom_cycle(&mut self.viewport, cursor, self.client, page.size());
        true
    }

    pub fn begin_drag(&mut self, cursor: Point) -> bool {
        if self.viewport.is_empty() {
            return false;
        }
        let origin = self.viewport.map_client_point(cursor, self.client);
        self.gesture.begin_pan(origin)
    }

    pub fn drag_to(&mut self, cursor: Point) -> bool {
        if !matches!(self.gesture.state(), GestureState::Panning { .. }) {
            return false;
        }
        let point = self.viewport.map_client_point(cursor, self.client);
        self.gesture.update_pan(point);
        true
    }

    pub fn end_drag(&mut self) -> bool {
        self.gesture.finish_pan(&mut self.viewport)
    }

    /// Advance a running animation. Returns `true` once it finished.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.gesture.tick(now, &mut self.viewport)
    }

    pub fn next_frame(&self, now: Instant) -> Option<Instant> {
        self.gesture.next_frame(now)
    }

    pub fn title(&self) -> String {
        let status = if self.page_failed() {
            " (unreadable)"
        } else if self.page().is_none() {
            " (loading)"
        } else {
            ""
        };
        format!("{} [{}/{}]{}", self.comic.name(), self.index + 1, self.page_count(), status)
    }

    pub fn render(&mut self, ctx: &mut impl RenderContext) {
        ctx.reset();
        ctx.clear(rgb(BG_COLOR[0], BG_COLOR[1], BG_COLOR[2]));
        match self.layout() {
            Some(page) if !self.viewport.is_empty() => {
                let size = page.size();
                let position = self.viewport.position() + self.gesture.offset();
                ctx.scale(self.viewport.zoom(self.client));
                ctx.translate(-position.x, -position.y);
                ctx.draw_bitmap(&page, 0.0, 0.0, size.width, size.height);
                ctx.reset();
            }
            Some(_) => {}
            None if self.page_failed() => draw_centered_text(ctx, "Unreadable page", self.client),
            None => draw_centered_text(ctx, "Loading...", self.client),
        }
        let label = match self.page_entry() {
            Some(entry) => format!("Go to page: {entry}"),
            None => format!("{}/{}", self.index + 1, self.page_count()),
        };
        draw_bottom_text(ctx, &label, self.client);
    }

    /// Stop prefetching and delete the extracted pages.
    pub fn close(mut self, cache: &CacheDir) -> (usize, Comic) {
        close_pages(&self.pages);
        if let Err(e) = self.comic.unload(cache) {
            log::warn!("{}", e);
        }
        log::info!("Closed {}", self.comic.name());
        (self.slot, self.comic)
    }
}

// ---------------------------------------------------------------------------
// Gallery screen
// ---------------------------------------------------------------------------

pub struct GalleryState {
    pub gallery: Gallery,
    covers: ImagePool,
    cover_index: HashMap<usize, usize>,
    broken: HashSet<usize>,
    thumb_dim: u32,
    pub complete: bool,
}

impl GalleryState {
    pub fn new(thumb_dim: u32) -> Self {
        Self {
            gallery: Gallery::new(),
            covers: ImagePool::new(PoolConfig::default()),
            cover_index: HashMap::new(),
            broken: HashSet::new(),
            thumb_dim,
            complete: false,
        }
    }

    pub fn insert(&mut self, slot: usize, comic: Comic) {
        match self.covers.add_image(comic.cover().to_path_buf()) {
            Ok(index) => {
                self.cover_index.insert(slot, index);
            }
            Err(e) => log::warn!("{}: {}", comic.name(), e),
        }
        self.gallery.insert(slot, comic);
    }

    fn cover(&mut self, index: usize) -> Option<Arc<DecodedImage>> {
        let slot = self.gallery.slot(index)?;
        let cover = *self.cover_index.get(&slot)?;
        if self.broken.contains(&cover) {
            return None;
        }
        match self.covers.bitmap(cover) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Cover: {}", e);
                self.broken.insert(cover);
                None
            }
        }
    }

    pub fn title(&self) -> String {
        match self.gallery.current() {
            Some(comic) => format!("{} ({}/{})", comic.name(), self.gallery.current_index() + 1, self.gallery.len()),
            None if self.complete => "No readable comics".to_string(),
            None => "Scanning...".to_string(),
        }
    }

    /// Draws the cover row above the focused comic's name. The row slides
    /// while the gallery's focus animation runs.
    pub fn render(&mut self, ctx: &mut impl RenderContext, client: Size, now: Instant) {
        ctx.reset();
        ctx.clear(rgb(BG_COLOR[0], BG_COLOR[1], BG_COLOR[2]));

        let name = match self.gallery.current() {
            Some(comic) => comic.name().to_string(),
            None => {
                draw_centered_text(ctx, &self.title(), client);
                return;
            }
        };
        let text_height = draw_wrapped_text(ctx, &name, client);
        let area = Size::new(client.width, (client.height - text_height).max(0.0));

        let position = self.gallery.position(now);
        let count = self.gallery.len();
        let thumb_dim = self.thumb_dim;
        let placements = layout_covers(position, count, area, thumb_dim, |i| self.cover(i).map(|c| c.size()));

        let placeholder = thumb_dim as f64;
        for placement in placements {
            ctx.reset();
            ctx.translate(placement.center.x, placement.center.y);
            ctx.scale(placement.scale);
            match self.cover(placement.index) {
                Some(image) => {
                    let size = image.size();
                    ctx.draw_bitmap(&image, -size.width / 2.0, -size.height / 2.0, size.width, size.height);
                }
                None => {
                    let color = rgb(PLACEHOLDER_COLOR[0], PLACEHOLDER_COLOR[1], PLACEHOLDER_COLOR[2]);
                    ctx.fill_rect(-placeholder / 2.0, -placeholder / 2.0, placeholder, placeholder, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::archive::tests::{png_bytes, write_zip};
    use crate::cancel::CancellationToken;
    use crate::gesture::STEP_ANIMATION;
    use crate::loader::PageCache;
    use crate::pool::PoolError;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Scale(f64),
        Translate(f64, f64),
        Reset,
        Clear,
        Fill(f64, f64, f64, f64),
        Draw(f64, f64, f64, f64),
        Text(String, f64, f64),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl RenderContext for Recorder {
        fn scale(&mut self, factor: f64) {
            self.ops.push(Op::Scale(factor));
        }
        fn translate(&mut self, dx: f64, dy: f64) {
            self.ops.push(Op::Translate(dx, dy));
        }
        fn reset(&mut self) {
            self.ops.push(Op::Reset);
        }
        fn clear(&mut self, _color: u32) {
            self.ops.push(Op::Clear);
        }
        fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, _color: u32) {
            self.ops.push(Op::Fill(x, y, w, h));
        }
        fn draw_bitmap(&mut self, _image: &DecodedImage, x: f64, y: f64, w: f64, h: f64) {
            self.ops.push(Op::Draw(x, y, w, h));
        }
        fn draw_text(&mut self, text: &str, x: f64, y: f64, _color: u32) {
            self.ops.push(Op::Text(text.to_string(), x, y));
        }
    }

    fn texts(recorder: &Recorder) -> Vec<&str> {
        recorder
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(text, ..) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every page decodes to 1000x1500.
    #[derive(Clone)]
    struct TallPages;

    impl Decode for TallPages {
        fn decode(&self, _path: &Path) -> Result<DecodedImage, PoolError> {
            Ok(DecodedImage { rgb_bytes: Vec::new(), width: 1000, height: 1500, file_size: 0 })
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        cache: CacheDir,
        reader: ReaderState<TallPages>,
    }

    fn reader(pages: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Saga.cbz");
        let png = png_bytes(4, 4);
        let names: Vec<String> = (1..=pages).map(|i| format!("{i}.png")).collect();
        let files: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), png.as_slice())).collect();
        write_zip(&path, &files);

        let cache = CacheDir::new(dir.path().join("cache"));
        let mut comic = Comic::scan(&path, &cache, 16).unwrap();
        comic.load(&cache, &CancellationToken::new(), |_, _| {}).unwrap();

        let mut pool = ImagePool::with_decoder(PoolConfig::default(), TallPages);
        for page in comic.pages() {
            pool.add_image(page.clone()).unwrap();
        }
        let shared = PageCache::new(pool, 1).into_shared();
        let reader = ReaderState::new(0, comic, shared, Size::new(500.0, 500.0));
        Fixture { _dir: dir, cache, reader }
    }

    fn decode(reader: &ReaderState<TallPages>, index: usize) {
        reader.pages.0.lock().unwrap().pool.bitmap(index).unwrap();
    }

    fn assert_at(reader: &ReaderState<TallPages>, x: f64, y: f64) {
        let position = reader.viewport().position();
        assert!(
            (position.x - x).abs() < 1e-6 && (position.y - y).abs() < 1e-6,
            "viewport at {position:?}, expected ({x}, {y})"
        );
    }

    #[test]
    fn first_render_fits_page_width() {
        let mut f = reader(2);
        let mut recorder = Recorder::default();
        f.reader.render(&mut recorder);
        assert_eq!(recorder.ops[..2], [Op::Reset, Op::Clear]);
        assert_eq!(texts(&recorder), ["Loading...", "1/2"]);
        assert!(!recorder.ops.iter().any(|op| matches!(op, Op::Draw(..))));
        assert_eq!(f.reader.title(), "Saga [1/2] (loading)");

        decode(&f.reader, 0);
        let mut recorder = Recorder::default();
        f.reader.render(&mut recorder);
        assert_at(&f.reader, 0.0, 0.0);
        assert!((f.reader.viewport().width - 1000.0).abs() < 1e-6);
        assert!((f.reader.viewport().height - 1000.0).abs() < 1e-6);
        assert!(matches!(recorder.ops[2], Op::Scale(z) if (z - 0.5).abs() < 1e-9));
        assert_eq!(recorder.ops[4], Op::Draw(0.0, 0.0, 1000.0, 1500.0));
        assert_eq!(recorder.ops[5], Op::Reset);
        assert_eq!(texts(&recorder), ["1/2"]);
        assert_eq!(f.reader.title(), "Saga [1/2]");
    }

    #[test]
    fn view_steps_animate_then_turn_the_page() {
        let mut f = reader(2);
        decode(&f.reader, 0);
        f.reader.render(&mut Recorder::default());
        let start = Instant::now();

        assert!(f.reader.handle_input(Navigation::NextView, start));
        assert!(f.reader.is_animating());
        assert!(!f.reader.handle_input(Navigation::NextPage, start));
        assert!(f.reader.tick(start + STEP_ANIMATION));
        assert_at(&f.reader, 0.0, 500.0);

        assert!(f.reader.handle_input(Navigation::NextView, start + STEP_ANIMATION));
        assert_eq!(f.reader.index(), 1);
        decode(&f.reader, 1);
        f.reader.render(&mut Recorder::default());
        assert_at(&f.reader, 0.0, 0.0);

        // backwards lands on the bottom of the previous page
        assert!(f.reader.handle_input(Navigation::PreviousView, start + STEP_ANIMATION * 2));
        assert_eq!(f.reader.index(), 0);
        f.reader.render(&mut Recorder::default());
        assert_at(&f.reader, 0.0, 500.0);
    }

    #[test]
    fn page_turns_saturate() {
        let mut f = reader(3);
        let now = Instant::now();
        assert!(!f.reader.handle_input(Navigation::PreviousPage, now));
        assert!(f.reader.handle_input(Navigation::JumpToPage(usize::MAX), now));
        assert_eq!(f.reader.index(), 2);
        assert!(!f.reader.handle_input(Navigation::NextPage, now));
        assert!(f.reader.page_ready(2));
        assert!(!f.reader.page_ready(1));
    }

    #[test]
    fn view_steps_wait_for_the_page_to_decode() {
        let mut f = reader(3);
        let now = Instant::now();
        assert!(!f.reader.handle_input(Navigation::NextView, now));
        assert!(!f.reader.handle_input(Navigation::NextView, now));
        assert_eq!(f.reader.index(), 0);
        assert!(!f.reader.handle_input(Navigation::PreviousView, now));
        assert_eq!(f.reader.index(), 0);

        decode(&f.reader, 0);
        f.reader.render(&mut Recorder::default());
        assert!(f.reader.handle_input(Navigation::NextView, now));
        assert_eq!(f.reader.index(), 0);
        assert!(f.reader.is_animating());
    }

    #[test]
    fn typed_page_numbers_jump() {
        let mut f = reader(5);
        let now = Instant::now();
        let key = |s: &str| Key::Character(s.into());

        assert_eq!(f.reader.handle_key(&key("4"), now), Navigation::NoOp);
        assert_eq!(f.reader.page_entry(), Some("4"));
        f.reader.handle_key(&Key::Named(NamedKey::Enter), now);
        assert_eq!(f.reader.index(), 3);
        assert_eq!(f.reader.page_entry(), None);

        f.reader.handle_key(&key("9"), now);
        f.reader.handle_key(&key("9"), now);
        f.reader.handle_key(&Key::Named(NamedKey::Enter), now);
        assert_eq!(f.reader.index(), 4);

        f.reader.handle_key(&key("0"), now);
        f.reader.handle_key(&Key::Named(NamedKey::Enter), now);
        assert_eq!(f.reader.index(), 4);

        f.reader.handle_key(&key("2"), now);
        f.reader.handle_key(&key("7"), now);
        f.reader.handle_key(&Key::Named(NamedKey::Backspace), now);
        assert_eq!(f.reader.page_entry(), Some("2"));
        let mut recorder = Recorder::default();
        f.reader.render(&mut recorder);
        assert_eq!(texts(&recorder).last(), Some(&"Go to page: 2"));
        f.reader.handle_key(&Key::Named(NamedKey::Enter), now);
        assert_eq!(f.reader.index(), 1);
    }

    #[test]
    fn escape_abandons_a_typed_page_before_closing() {
        let mut f = reader(3);
        let now = Instant::now();
        let escape = Key::Named(NamedKey::Escape);
        f.reader.handle_key(&Key::Character("3".into()), now);
        assert_eq!(f.reader.handle_key(&escape, now), Navigation::NoOp);
        assert_eq!(f.reader.page_entry(), None);
        assert_eq!(f.reader.index(), 0);
        assert_eq!(f.reader.handle_key(&escape, now), Navigation::Back);
        assert_eq!(f.reader.handle_key(&Key::Named(NamedKey::PageDown), now), Navigation::NoOp);
        assert_eq!(f.reader.index(), 1);
    }

    #[test]
    fn scroll_mode_switches_arrow_keys() {
        let mut f = reader(2);
        let right = Key::Named(NamedKey::ArrowRight);
        assert_eq!(reader_intent(&right, f.reader.scroll_mode()), Navigation::NextView);
        assert!(f.reader.handle_input(Navigation::SwitchScroll, Instant::now()));
        assert_eq!(reader_intent(&right, f.reader.scroll_mode()), Navigation::NextPage);
    }

    #[test]
    fn wheel_zoom_keeps_cursor_point() {
        let mut f = reader(1);
        decode(&f.reader, 0);
        f.reader.render(&mut Recorder::default());
        let cursor = Point::new(100.0, 300.0);
        let client = Size::new(500.0, 500.0);
        let before = f.reader.viewport().map_client_point(cursor, client);

        assert!(f.reader.wheel(cursor, 1.0));
        assert!((f.reader.viewport().width - 800.0).abs() < 1e-6);
        let after = f.reader.viewport().map_client_point(cursor, client);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
        assert!(!f.reader.wheel(cursor, 0.0));
    }

    #[test]
    fn drag_pans_and_wheel_commits_it() {
        let mut f = reader(1);
        decode(&f.reader, 0);
        f.reader.render(&mut Recorder::default());

        assert!(f.reader.begin_drag(Point::new(100.0, 100.0)));
        assert!(f.reader.drag_to(Point::new(100.0, 50.0)));
        assert_at(&f.reader, 0.0, 0.0);
        assert!(f.reader.end_drag());
        assert_at(&f.reader, 0.0, 100.0);

        assert!(f.reader.begin_drag(Point::new(100.0, 100.0)));
        f.reader.drag_to(Point::new(100.0, 90.0));
        f.reader.wheel(Point::new(0.0, 0.0), -1.0);
        assert!(!f.reader.drag_to(Point::new(100.0, 0.0)));
    }

    #[test]
    fn double_click_cycles_zoom() {
        let mut f = reader(1);
        decode(&f.reader, 0);
        f.reader.render(&mut Recorder::default());
        assert!(f.reader.double_click(Point::new(0.0, 0.0)));
        // width fit (0.5) -> 1:1
        assert!((f.reader.viewport().width - 500.0).abs() < 1e-6);
    }

    #[test]
    fn resize_keeps_client_aspect() {
        let mut f = reader(1);
        decode(&f.reader, 0);
        f.reader.render(&mut Recorder::default());
        f.reader.resize(Size::new(1000.0, 500.0));
        let vp = *f.reader.viewport();
        assert!((vp.width / vp.height - 2.0).abs() < 1e-9);
    }

    #[test]
    fn close_removes_extracted_pages() {
        let f = reader(1);
        let cache = f.cache;
        let dir = cache.comic_dir("Saga");
        assert!(dir.exists());
        let (slot, comic) = f.reader.close(&cache);
        assert_eq!(slot, 0);
        assert!(!comic.is_loaded());
        assert!(!dir.exists());
    }

    #[test]
    fn gallery_keys() {
        assert_eq!(gallery_intent(&Key::Named(NamedKey::ArrowLeft)), Navigation::PreviousComic);
        assert_eq!(gallery_intent(&Key::Character("x".into())), Navigation::JumpToComic('x'));
        assert_eq!(gallery_intent(&Key::Named(NamedKey::Escape)), Navigation::Back);
        assert_eq!(reader_intent(&Key::Named(NamedKey::End), ScrollMode::Pages), Navigation::JumpToPage(usize::MAX));
        assert_eq!(reader_intent(&Key::Character("S".into()), ScrollMode::Pages), Navigation::SwitchScroll);
    }

    #[test]
    fn gallery_draws_focused_cover_centered() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path().join("cache"));
        let mut state = GalleryState::new(16);
        assert_eq!(state.title(), "Scanning...");
        for (slot, name) in ["a", "b"].iter().enumerate() {
            let path = dir.path().join(format!("{name}.cbz"));
            write_zip(&path, &[("1.png", &png_bytes(4, 6))]);
            state.insert(slot, Comic::scan(&path, &cache, 16).unwrap());
        }
        assert_eq!(state.title(), "a (1/2)");

        // One line of name text leaves a 100 pixel row for the covers.
        let mut recorder = Recorder::default();
        state.render(&mut recorder, Size::new(300.0, 115.0), Instant::now());
        assert_eq!(recorder.ops[2], Op::Text("a".to_string(), 145.5, 100.0));
        let first = recorder.ops.iter().position(|op| matches!(op, Op::Translate(..))).unwrap();
        assert_eq!(recorder.ops[first], Op::Translate(150.0, 50.0));
        assert_eq!(recorder.ops[first + 1], Op::Scale(15.0));
        assert_eq!(recorder.ops[first + 2], Op::Draw(-2.0, -3.0, 4.0, 6.0));
        assert_eq!(recorder.ops.iter().filter(|op| matches!(op, Op::Draw(..))).count(), 2);
    }
}
