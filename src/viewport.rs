//! Plain geometry value types and the visible window into an image.

use std::ops::{Add, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Rectangle in image-plane coordinates. All-zero means "not laid out yet".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn set_center(&mut self, center: Point) {
        self.x = center.x - self.width / 2.0;
        self.y = center.y - self.height / 2.0;
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn translate_by(&mut self, delta: Point) {
        self.translate(delta.x, delta.y);
    }

    /// Scale about `anchor`: `factor < 1` zooms in, `factor > 1` zooms out.
    pub fn scale_at_point(&mut self, anchor: Point, factor: f64) {
        self.translate_by(-anchor);
        self.x *= factor;
        self.y *= factor;
        self.width *= factor;
        self.height *= factor;
        self.translate_by(anchor);
    }

    pub fn move_left_top_to(&mut self, point: Point) {
        self.x = point.x;
        self.y = point.y;
    }

    pub fn move_right_bottom_to(&mut self, point: Point) {
        self.x = point.x - self.width;
        self.y = point.y - self.height;
    }

    /// Shrink by `dx`/`dy` on every side; negative values grow.
    pub fn inset(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        self.width -= 2.0 * dx;
        self.height -= 2.0 * dy;
    }

    /// Match the client area's aspect ratio, keeping the center.
    pub fn fit_aspect(&mut self, client: Size) {
        if self.is_empty() || client.width <= 0.0 || client.height <= 0.0 {
            return;
        }
        let client_aspect = client.width / client.height;
        let aspect = self.width / self.height;
        if client_aspect > aspect {
            self.inset((self.width - client_aspect * self.height) / 2.0, 0.0);
        } else if client_aspect < aspect {
            self.inset(0.0, (self.height - self.width / client_aspect) / 2.0);
        }
    }

    /// Map a client-area pixel to the image-plane point it shows.
    pub fn map_client_point(&self, point: Point, client: Size) -> Point {
        Point::new(
            point.x * self.width / client.width + self.x,
            point.y * self.height / client.height + self.y,
        )
    }

    /// Screen pixels per image pixel.
    pub fn zoom(&self, client: Size) -> f64 {
        client.width / self.width
    }
}
