//! View-movement decisions: where the next step of reading goes, which zoom
//! level comes next, and how a viewport is kept inside the page.
//!
//! Everything here is a pure function of the viewport and the page size;
//! the reader screen owns the state and decides when to call these.

use crate::fuzzy;
use crate::viewport::{Point, Size, Viewport};

/// Wheel factor applied to the viewport when zooming in.
pub const WHEEL_ZOOM_IN: f64 = 0.8;
/// Wheel factor applied to the viewport when zooming out.
pub const WHEEL_ZOOM_OUT: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    NextComic,
    PreviousComic,
    /// Jump to the next comic whose name starts with this letter.
    JumpToComic(char),
    /// Leave the reader.
    Back,
    NextPage,
    PreviousPage,
    NextView,
    PreviousView,
    JumpToPage(usize),
    SwitchScroll,
    NoOp,
}

/// Result of a view step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Stay on the page and move the view by this delta.
    Shift(Point),
    NextPage,
    PreviousPage,
    None,
}

/// What the forward/backward keys do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollMode {
    #[default]
    ViewSteps,
    Pages,
}

impl ScrollMode {
    pub fn toggled(self) -> Self {
        match self {
            ScrollMode::ViewSteps => ScrollMode::Pages,
            ScrollMode::Pages => ScrollMode::ViewSteps,
        }
    }

    pub fn forward(self) -> Navigation {
        match self {
            ScrollMode::ViewSteps => Navigation::NextView,
            ScrollMode::Pages => Navigation::NextPage,
        }
    }

    pub fn backward(self) -> Navigation {
        match self {
            ScrollMode::ViewSteps => Navigation::PreviousView,
            ScrollMode::Pages => Navigation::PreviousPage,
        }
    }
}

/// Next reading-order step: exhaust a row left to right, then drop down
/// half a view and return to the left edge. `PreviousView` mirrors it.
pub fn compute_step(direction: Navigation, viewport: &Viewport, image: Size) -> Step {
    let (iw, ih) = (image.width, image.height);
    match direction {
        Navigation::NextView => {
            if fuzzy::greater_equal(viewport.right(), iw) && fuzzy::greater_equal(viewport.bottom(), ih) {
                return Step::NextPage;
            }
            if fuzzy::less(viewport.right(), iw) {
                return Step::Shift(Point::new((viewport.width / 2.0).min(iw - viewport.right()), 0.0));
            }
            Step::Shift(Point::new(
                -(iw - viewport.width).max(0.0),
                (viewport.height / 2.0).min(ih - viewport.bottom()),
            ))
        }
        Navigation::PreviousView => {
            if fuzzy::less_equal(viewport.left(), 0.0) && fuzzy::less_equal(viewport.top(), 0.0) {
                return Step::PreviousPage;
            }
            if fuzzy::greater(viewport.left(), 0.0) {
                return Step::Shift(Point::new(-(viewport.width / 2.0).min(viewport.left()), 0.0));
            }
            Step::Shift(Point::new(
                (iw - viewport.width).max(0.0),
                -(viewport.height / 2.0).min(viewport.top()),
            ))
        }
        _ => Step::None,
    }
}

/// Page index after a page-level intent, saturating at both ends.
pub fn turn_page(index: usize, count: usize, intent: Navigation) -> usize {
    let last = count.saturating_sub(1);
    match intent {
        Navigation::NextPage => (index + 1).min(last),
        Navigation::PreviousPage => index.saturating_sub(1),
        Navigation::JumpToPage(target) => target.min(last),
        _ => index,
    }
}

/// Viewport for a page entered from `from` towards `to`: top-left when
/// moving forward, bottom-right when moving back.
pub fn entry_viewport(viewport: &Viewport, from: usize, to: usize, image: Size) -> Viewport {
    let mut entered = *viewport;
    if to > from {
        entered.move_left_top_to(Point::new(0.0, 0.0));
    } else if to < from {
        entered.move_right_bottom_to(Point::new(image.width, image.height));
    }
    entered
}

/// Next zoom level in the cycle width-fit / height-fit / 1:1.
pub fn next_zoom(current: f64, client: Size, image: Size) -> f64 {
    let mut candidates = vec![client.width / image.width, client.height / image.height, 1.0];
    candidates.sort_by(f64::total_cmp);
    candidates.dedup_by(|a, b| fuzzy::equal(*a, *b));

    candidates
        .iter()
        .copied()
        .find(|&z| current < z && !fuzzy::equal(current, z))
        .unwrap_or(candidates[0])
}

/// Advance the zoom cycle, keeping the image point under `client_anchor`.
pub fn apply_zoom_cycle(viewport: &mut Viewport, client_anchor: Point, client: Size, image: Size) {
    let current = viewport.zoom(client);
    let next = next_zoom(current, client, image);
    let anchor = viewport.map_client_point(client_anchor, client);
    viewport.scale_at_point(anchor, current / next);
}

/// First layout of a page: the client area at 1:1, then two zoom cycles.
pub fn initial_viewport(client: Size, image: Size) -> Viewport {
    let mut viewport = Viewport::new(0.0, 0.0, client.width, client.height);
    apply_zoom_cycle(&mut viewport, Point::default(), client, image);
    apply_zoom_cycle(&mut viewport, Point::default(), client, image);
    viewport
}

/// Keep the viewport inside the image: undo zooming out past the fit,
/// center any axis that is larger than the image, clamp the rest.
pub fn optimize_viewport(viewport: &mut Viewport, image: Size) {
    let (iw, ih) = (image.width, image.height);

    if viewport.width > iw && viewport.height > ih {
        let scale = (iw / viewport.width).max(ih / viewport.height);
        let center = viewport.center();
        viewport.scale_at_point(center, scale);
    }

    if viewport.width > iw {
        let y = viewport.center().y;
        viewport.set_center(Point::new(iw / 2.0, y));
    } else if viewport.left() < 0.0 {
        viewport.translate(-viewport.left(), 0.0);
    } else if viewport.right() > iw {
        viewport.translate(iw - viewport.right(), 0.0);
    }

    if viewport.height > ih {
        let x = viewport.center().x;
        viewport.set_center(Point::new(x, ih / 2.0));
    } else if viewport.top() < 0.0 {
        viewport.translate(0.0, -viewport.top());
    } else if viewport.bottom() > ih {
        viewport.translate(0.0, ih - viewport.bottom());
    }
}
