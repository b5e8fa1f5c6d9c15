//! Interactive gesture state of the reader.
//!
//! Only one gesture is active at a time. A drag pan and an animated view
//! step both accumulate a vector that is drawn on top of the viewport and
//! committed into it when the gesture ends. A pan cannot start while an
//! animation is running; the request is rejected and the animation runs to
//! completion.

use std::time::{Duration, Instant};

use crate::viewport::{Point, Viewport};

pub const STEP_ANIMATION: Duration = Duration::from_millis(100);

/// Linear progress in `[0, 1]` of an animation started at `started`.
fn progress(started: Instant, duration: Duration, now: Instant) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(started).as_secs_f64();
    (elapsed / duration.as_secs_f64()).min(1.0)
}

/// Frames are requested ten times per animation, never past its end.
fn next_frame(started: Instant, duration: Duration, now: Instant) -> Instant {
    (now + duration / 10).min(started + duration)
}

/// A scalar moving linearly from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    started: Instant,
    duration: Duration,
}

impl Tween {
    pub fn new(from: f64, to: f64, started: Instant, duration: Duration) -> Self {
        Self { from, to, started, duration }
    }

    pub fn value(&self, now: Instant) -> f64 {
        self.from + (self.to - self.from) * progress(self.started, self.duration, now)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        progress(self.started, self.duration, now) >= 1.0
    }

    pub fn next_frame(&self, now: Instant) -> Option<Instant> {
        (!self.is_finished(now)).then(|| next_frame(self.started, self.duration, now))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Settled,
    Panning {
        origin: Point,
        vector: Point,
    },
    Animating {
        target: Point,
        vector: Point,
        started: Instant,
        duration: Duration,
    },
}

#[derive(Debug)]
pub struct Gesture {
    state: GestureState,
}

impl Default for Gesture {
    fn default() -> Self {
        Self::new()
    }
}

impl Gesture {
    pub fn new() -> Self {
        Self { state: GestureState::Settled }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, GestureState::Settled)
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, GestureState::Animating { .. })
    }

    /// Uncommitted offset to add to the viewport position when drawing.
    pub fn offset(&self) -> Point {
        match self.state {
            GestureState::Settled => Point::default(),
            GestureState::Panning { vector, .. } | GestureState::Animating { vector, .. } => vector,
        }
    }

    /// Start a drag at an image-plane point. Returns `false` if rejected.
    pub fn begin_pan(&mut self, origin: Point) -> bool {
        if !self.is_settled() {
            return false;
        }
        self.state = GestureState::Panning { origin, vector: Point::default() };
        true
    }

    /// Dragging moves the content, so the view moves the opposite way.
    pub fn update_pan(&mut self, point: Point) {
        if let GestureState::Panning { origin, vector } = &mut self.state {
            *vector = *origin - point;
        }
    }

    /// Commit a drag. Does nothing unless a pan is in progress.
    pub fn finish_pan(&mut self, viewport: &mut Viewport) -> bool {
        match self.state {
            GestureState::Panning { vector, .. } => {
                self.commit(viewport, vector);
                true
            }
            _ => false,
        }
    }

    pub fn begin_animation(&mut self, target: Point, now: Instant) -> bool {
        if !self.is_settled() {
            return false;
        }
        self.state = GestureState::Animating {
            target,
            vector: Point::default(),
            started: now,
            duration: STEP_ANIMATION,
        };
        true
    }

    /// Advance a running animation. Returns `true` once it has been
    /// committed into `viewport`.
    pub fn tick(&mut self, now: Instant, viewport: &mut Viewport) -> bool {
        let GestureState::Animating { target, vector, started, duration } = &mut self.state else {
            return false;
        };
        let t = progress(*started, *duration, now);
        if t >= 1.0 {
            let target = *target;
            self.commit(viewport, target);
            return true;
        }
        *vector = Point::new(target.x * t, target.y * t);
        false
    }

    /// When the running animation wants its next frame.
    pub fn next_frame(&self, now: Instant) -> Option<Instant> {
        match self.state {
            GestureState::Animating { started, duration, .. } => Some(next_frame(started, duration, now)),
            _ => None,
        }
    }

    fn commit(&mut self, viewport: &mut Viewport, vector: Point) {
        viewport.translate_by(vector);
        self.state = GestureState::Settled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_commits_opposite_of_drag() {
        let mut gesture = Gesture::new();
        let mut viewport = Viewport::new(100.0, 100.0, 50.0, 50.0);

        assert!(gesture.begin_pan(Point::new(10.0, 10.0)));
        gesture.update_pan(Point::new(30.0, 5.0));
        assert_eq!(gesture.offset(), Point::new(-20.0, 5.0));
        assert_eq!(viewport.position(), Point::new(100.0, 100.0));

        assert!(gesture.finish_pan(&mut viewport));
        assert_eq!(viewport.position(), Point::new(80.0, 105.0));
        assert!(gesture.is_settled());
        assert_eq!(gesture.offset(), Point::default());
    }

    #[test]
    fn pan_rejected_while_animating() {
        let start = Instant::now();
        let mut gesture = Gesture::new();
        assert!(gesture.begin_animation(Point::new(100.0, 0.0), start));
        assert!(!gesture.begin_pan(Point::new(0.0, 0.0)));
        assert!(gesture.is_animating());

        let mut viewport = Viewport::new(0.0, 0.0, 10.0, 10.0);
        assert!(!gesture.finish_pan(&mut viewport));
        assert_eq!(viewport.position(), Point::new(0.0, 0.0));
    }

    #[test]
    fn animation_is_rejected_during_pan() {
        let mut gesture = Gesture::new();
        assert!(gesture.begin_pan(Point::default()));
        assert!(!gesture.begin_animation(Point::new(1.0, 1.0), Instant::now()));
    }

    #[test]
    fn animation_interpolates_then_commits() {
        let start = Instant::now();
        let mut gesture = Gesture::new();
        let mut viewport = Viewport::new(0.0, 0.0, 10.0, 10.0);
        gesture.begin_animation(Point::new(100.0, -40.0), start);

        assert!(!gesture.tick(start + STEP_ANIMATION / 2, &mut viewport));
        let halfway = gesture.offset();
        assert!((halfway.x - 50.0).abs() < 1e-6);
        assert!((halfway.y + 20.0).abs() < 1e-6);
        assert_eq!(viewport.position(), Point::new(0.0, 0.0));

        assert!(gesture.tick(start + STEP_ANIMATION, &mut viewport));
        assert_eq!(viewport.position(), Point::new(100.0, -40.0));
        assert!(gesture.is_settled());
        assert!(gesture.next_frame(start).is_none());
    }

    #[test]
    fn next_frame_never_passes_the_end() {
        let start = Instant::now();
        let mut gesture = Gesture::new();
        gesture.begin_animation(Point::new(1.0, 0.0), start);
        let late = start + STEP_ANIMATION - Duration::from_millis(1);
        assert_eq!(gesture.next_frame(late), Some(start + STEP_ANIMATION));
    }

    #[test]
    fn tween_runs_from_start_to_end() {
        let start = Instant::now();
        let tween = Tween::new(2.0, 4.0, start, Duration::from_millis(200));
        assert_eq!(tween.value(start), 2.0);
        assert!((tween.value(start + Duration::from_millis(50)) - 2.5).abs() < 1e-9);
        assert_eq!(tween.next_frame(start), Some(start + Duration::from_millis(20)));

        let end = start + Duration::from_millis(200);
        assert!(tween.is_finished(end));
        assert_eq!(tween.value(end + Duration::from_secs(1)), 4.0);
        assert_eq!(tween.next_frame(end), None);
    }
}
