//! Cover gallery: which comic is focused, and where each visible cover goes.

use std::time::{Duration, Instant};

use crate::comic::Comic;
use crate::gesture::Tween;
use crate::navigator::Navigation;
use crate::viewport::{Point, Size};

const FOCUSED_COVER: f64 = 0.9;
const OTHER_COVER: f64 = 0.7;
const GAP: f64 = 0.1;

pub const FOCUS_ANIMATION: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
pub struct Gallery {
    /// Comics sorted by the slot they were given on the command line.
    comics: Vec<(usize, Comic)>,
    current: usize,
    /// Fractional focus sliding towards `current`.
    scroll: Option<Tween>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scanned comic. The focused comic stays focused.
    pub fn insert(&mut self, slot: usize, comic: Comic) {
        self.scroll = None;
        let pos = self.comics.partition_point(|(s, _)| *s < slot);
        if !self.comics.is_empty() && pos <= self.current {
            self.current += 1;
        }
        self.comics.insert(pos, (slot, comic));
    }

    pub fn len(&self) -> usize {
        self.comics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comics.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Comic> {
        self.comics.get(self.current).map(|(_, c)| c)
    }

    pub fn get(&self, index: usize) -> Option<&Comic> {
        self.comics.get(index).map(|(_, c)| c)
    }

    pub fn slot(&self, index: usize) -> Option<usize> {
        self.comics.get(index).map(|(s, _)| *s)
    }

    /// Take the focused comic out to open it.
    pub fn take_current(&mut self) -> Option<(usize, Comic)> {
        self.scroll = None;
        if self.current < self.comics.len() {
            Some(self.comics.remove(self.current))
        } else {
            None
        }
    }

    /// Put a comic back after reading, focusing it again.
    pub fn restore(&mut self, slot: usize, comic: Comic) {
        self.scroll = None;
        let pos = self.comics.partition_point(|(s, _)| *s < slot);
        self.comics.insert(pos, (slot, comic));
        self.current = pos;
    }

    /// Returns `true` if the focus moved. The row slides from wherever it
    /// is at `now` to the new focus.
    pub fn handle_input(&mut self, intent: Navigation, now: Instant) -> bool {
        if self.comics.is_empty() {
            return false;
        }
        let before = self.current;
        let from = self.position(now);
        match intent {
            Navigation::NextComic => self.current = (self.current + 1).min(self.comics.len() - 1),
            Navigation::PreviousComic => self.current = self.current.saturating_sub(1),
            Navigation::JumpToComic(letter) => {
                if let Some(index) = self.find_starting_with(letter) {
                    self.current = index;
                }
            }
            _ => {}
        }
        if before == self.current {
            return false;
        }
        self.scroll = Some(Tween::new(from, self.current as f64, now, FOCUS_ANIMATION));
        true
    }

    /// Focus position to lay the row out from; fractional while sliding.
    pub fn position(&self, now: Instant) -> f64 {
        match self.scroll {
            Some(tween) => tween.value(now),
            None => self.current as f64,
        }
    }

    /// Drop a finished slide. Returns `true` while still sliding.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.scroll.is_some_and(|t| t.is_finished(now)) {
            self.scroll = None;
        }
        self.scroll.is_some()
    }

    pub fn next_frame(&self, now: Instant) -> Option<Instant> {
        self.scroll.and_then(|t| t.next_frame(now))
    }

    fn find_starting_with(&self, letter: char) -> Option<usize> {
        let letter = letter.to_lowercase().collect::<String>();
        let count = self.comics.len();
        (1..=count)
            .map(|offset| (self.current + offset) % count)
            .find(|&i| self.comics[i].1.name().to_lowercase().starts_with(&letter))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverPlacement {
    pub index: usize,
    pub center: Point,
    pub scale: f64,
}

/// A cover on the row: horizontal center, scale and drawn width.
#[derive(Debug, Clone, Copy)]
struct RowCover {
    index: usize,
    x: f64,
    scale: f64,
    width: f64,
}

/// Covers around an integral focus, focused first, then rightwards, then
/// leftwards. Each side ends with its first cover past the edge so that
/// blending two rows never drops a cover that is still visible.
fn row(focus: usize, count: usize, area: Size, gap: f64, size_of: &mut impl FnMut(usize) -> Size) -> Vec<RowCover> {
    let size = size_of(focus);
    let scale = FOCUSED_COVER * area.height / size.height;
    let focused = RowCover { index: focus, x: area.width / 2.0, scale, width: scale * size.width };
    let mut covers = vec![focused];

    let mut prev = focused;
    for i in focus + 1..count {
        let size = size_of(i);
        let scale = OTHER_COVER * area.height / size.height;
        let x = prev.x + prev.width + gap * scale;
        prev = RowCover { index: i, x, scale, width: scale * size.width };
        covers.push(prev);
        if x - prev.width / 2.0 > area.width {
            break;
        }
    }

    let mut prev = focused;
    for i in (0..focus).rev() {
        let size = size_of(i);
        let scale = OTHER_COVER * area.height / size.height;
        let x = prev.x - prev.width - gap * scale;
        prev = RowCover { index: i, x, scale, width: scale * size.width };
        covers.push(prev);
        if x + prev.width / 2.0 < 0.0 {
            break;
        }
    }
    covers
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Lay covers out in a row around the focus `position`, which may be
/// fractional while the row slides. Covers entirely outside `area` are
/// left out; the focused cover comes first. Covers whose size is not
/// known yet take the space of a square thumbnail.
pub fn layout_covers(
    position: f64,
    count: usize,
    area: Size,
    thumb_dim: u32,
    mut size_of: impl FnMut(usize) -> Option<Size>,
) -> Vec<CoverPlacement> {
    if count == 0 || area.height <= 0.0 {
        return Vec::new();
    }
    let placeholder = Size::new(thumb_dim as f64, thumb_dim as f64);
    let gap = GAP * thumb_dim as f64;
    let mut size_of = |i| size_of(i).filter(|s| s.height > 0.0).unwrap_or(placeholder);

    let position = position.clamp(0.0, (count - 1) as f64);
    let lower = position.floor() as usize;
    let t = position - lower as f64;
    let mut covers = row(lower, count, area, gap, &mut size_of);
    if t > 0.0 && lower + 1 < count {
        let target = row(lower + 1, count, area, gap, &mut size_of);
        for cover in &mut covers {
            if let Some(to) = target.iter().find(|c| c.index == cover.index) {
                cover.x = lerp(cover.x, to.x, t);
                cover.scale = lerp(cover.scale, to.scale, t);
                cover.width = lerp(cover.width, to.width, t);
            }
        }
        let extra: Vec<_> = target
            .into_iter()
            .filter(|to| !covers.iter().any(|c| c.index == to.index))
            .collect();
        covers.extend(extra);
    }

    covers
        .into_iter()
        .filter(|c| c.x + c.width / 2.0 >= 0.0 && c.x - c.width / 2.0 <= area.width)
        .map(|c| CoverPlacement { index: c.index, center: Point::new(c.x, area.height / 2.0), scale: c.scale })
        .collect()
}
