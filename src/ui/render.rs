use std::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Point as DisplayPoint, Size as DisplaySize};
use embedded_graphics::mono_font::ascii::FONT_9X15;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics::{Drawable, Pixel};

use crate::pool::DecodedImage;
use crate::viewport::Size;

pub const BG_COLOR: [u8; 3] = [25, 25, 25];
pub const PLACEHOLDER_COLOR: [u8; 3] = [60, 60, 60];
pub const TEXT_COLOR: [u8; 3] = [255, 255, 255];
pub const LABEL_COLOR: [u8; 3] = [128, 128, 128];

const FONT: &MonoFont<'static> = &FONT_9X15;
/// Padding around bottom text: extra width and height of its label box.
const LABEL_PAD: (f64, f64) = (15.0, 5.0);

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Drawing target with a current transform. `translate` is applied in the
/// already-scaled coordinate system, so `scale(z); translate(-p)` maps
/// `p` to the origin.
pub trait RenderContext {
    fn scale(&mut self, factor: f64);
    fn translate(&mut self, dx: f64, dy: f64);
    fn reset(&mut self);
    fn clear(&mut self, color: u32);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: u32);
    fn draw_bitmap(&mut self, image: &DecodedImage, x: f64, y: f64, w: f64, h: f64);
    /// Text with its top-left corner at (x, y). The transform moves text
    /// but does not scale it.
    fn draw_text(&mut self, text: &str, x: f64, y: f64, color: u32);
}

/// Size of `text` on one line in the overlay font.
pub fn text_size(text: &str) -> Size {
    let advance = FONT.character_size.width + FONT.character_spacing;
    Size::new((text.chars().count() as u32 * advance) as f64, FONT.character_size.height as f64)
}

/// Greedy word wrap to `max_width`. A word wider than the limit gets a
/// line of its own.
pub fn wrap_text(text: &str, max_width: f64) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        match lines.last_mut() {
            Some(line) if text_size(&format!("{line} {word}")).width <= max_width => {
                line.push(' ');
                line.push_str(word);
            }
            _ => lines.push(word.to_string()),
        }
    }
    lines
}

/// Centered lines stacked up from the bottom edge. Returns the height used.
pub fn draw_wrapped_text(ctx: &mut impl RenderContext, text: &str, client: Size) -> f64 {
    let lines = wrap_text(text, client.width);
    let line_height = text_size("").height;
    let color = rgb(TEXT_COLOR[0], TEXT_COLOR[1], TEXT_COLOR[2]);
    let mut y = client.height - lines.len() as f64 * line_height;
    for line in &lines {
        let width = text_size(line).width;
        ctx.draw_text(line, (client.width - width) / 2.0, y, color);
        y += line_height;
    }
    lines.len() as f64 * line_height
}

/// A short label in a box centered on the bottom edge.
pub fn draw_bottom_text(ctx: &mut impl RenderContext, text: &str, client: Size) {
    let size = text_size(text);
    let (bw, bh) = (size.width + LABEL_PAD.0, size.height + LABEL_PAD.1);
    let label = rgb(LABEL_COLOR[0], LABEL_COLOR[1], LABEL_COLOR[2]);
    ctx.fill_rect((client.width - bw) / 2.0, client.height - bh, bw, bh, label);
    let color = rgb(TEXT_COLOR[0], TEXT_COLOR[1], TEXT_COLOR[2]);
    ctx.draw_text(text, (client.width - size.width) / 2.0, client.height - size.height, color);
}

/// Glyph pixels from embedded-graphics, clipped to the frame.
struct GlyphTarget<'c, 'a> {
    canvas: &'c mut FrameCanvas<'a>,
}

impl OriginDimensions for GlyphTarget<'_, '_> {
    fn size(&self) -> DisplaySize {
        DisplaySize::new(self.canvas.width, self.canvas.height)
    }
}

impl DrawTarget for GlyphTarget<'_, '_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = (self.canvas.width as i32, self.canvas.height as i32);
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x >= width || point.y >= height {
                continue;
            }
            let i = point.y as usize * width as usize + point.x as usize;
            self.canvas.frame[i] = rgb(color.r(), color.g(), color.b());
        }
        Ok(())
    }
}

/// Software canvas over a softbuffer frame (u32 per pixel, 0x00RRGGBB).
pub struct FrameCanvas<'a> {
    frame: &'a mut [u32],
    width: u32,
    height: u32,
    scale: f64,
    origin: (f64, f64),
}

impl<'a> FrameCanvas<'a> {
    pub fn new(frame: &'a mut [u32], width: u32, height: u32) -> Self {
        debug_assert!(frame.len() >= width as usize * height as usize);
        Self { frame, width, height, scale: 1.0, origin: (0.0, 0.0) }
    }

    fn to_device(&self, x: f64, y: f64) -> (f64, f64) {
        (self.origin.0 + x * self.scale, self.origin.1 + y * self.scale)
    }

    /// Device pixel range covered by a user-space rectangle, clipped.
    fn device_rect(&self, x: f64, y: f64, w: f64, h: f64) -> Option<(f64, f64, f64, f64, [u32; 4])> {
        let (x0, y0) = self.to_device(x, y);
        let (dw, dh) = (w * self.scale, h * self.scale);
        if dw <= 0.0 || dh <= 0.0 {
            return None;
        }
        let dx_start = x0.max(0.0).round() as u32;
        let dy_start = y0.max(0.0).round() as u32;
        let dx_end = ((x0 + dw).round().max(0.0) as u32).min(self.width);
        let dy_end = ((y0 + dh).round().max(0.0) as u32).min(self.height);
        if dx_start >= dx_end || dy_start >= dy_end {
            return None;
        }
        Some((x0, y0, dw, dh, [dx_start, dy_start, dx_end, dy_end]))
    }
}

impl RenderContext for FrameCanvas<'_> {
    fn scale(&mut self, factor: f64) {
        self.scale *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.origin.0 += dx * self.scale;
        self.origin.1 += dy * self.scale;
    }

    fn reset(&mut self) {
        self.scale = 1.0;
        self.origin = (0.0, 0.0);
    }

    fn clear(&mut self, color: u32) {
        self.frame.fill(color);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: u32) {
        let Some((_, _, _, _, [xs, ys, xe, ye])) = self.device_rect(x, y, w, h) else {
            return;
        };
        let stride = self.width as usize;
        for dy in ys..ye {
            let row = dy as usize * stride;
            self.frame[row + xs as usize..row + xe as usize].fill(color);
        }
    }

    /// Nearest-neighbour blit of the whole image into a rectangle.
    fn draw_bitmap(&mut self, image: &DecodedImage, x: f64, y: f64, w: f64, h: f64) {
        if image.width == 0 || image.height == 0 {
            return;
        }
        let Some((x0, y0, dw, dh, [xs, ys, xe, ye])) = self.device_rect(x, y, w, h) else {
            return;
        };
        let (src_w, src_h) = (image.width as usize, image.height as usize);
        let sx_per_px = src_w as f64 / dw;
        let sy_per_px = src_h as f64 / dh;
        let stride = self.width as usize;

        for dy in ys..ye {
            let sy = (((dy as f64 + 0.5 - y0) * sy_per_px) as usize).min(src_h - 1);
            let src_row = sy * src_w;
            let dst_row = dy as usize * stride;
            for dx in xs..xe {
                let sx = (((dx as f64 + 0.5 - x0) * sx_per_px) as usize).min(src_w - 1);
                let si = (src_row + sx) * 3;
                let px = &image.rgb_bytes[si..si + 3];
                self.frame[dst_row + dx as usize] = rgb(px[0], px[1], px[2]);
            }
        }
    }

    fn draw_text(&mut self, text: &str, x: f64, y: f64, color: u32) {
        let (dx, dy) = self.to_device(x, y);
        let color = Rgb888::new((color >> 16) as u8, (color >> 8) as u8, color as u8);
        let style = MonoTextStyle::new(FONT, color);
        let origin = DisplayPoint::new(dx.round() as i32, dy.round() as i32);
        let mut target = GlyphTarget { canvas: self };
        let _ = Text::with_baseline(text, origin, style, Baseline::Top).draw(&mut target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 image: red, green / blue, white.
    fn checker() -> DecodedImage {
        DecodedImage {
            rgb_bytes: vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
            width: 2,
            height: 2,
            file_size: 0,
        }
    }

    const RED: u32 = 0xFF0000;
    const GREEN: u32 = 0x00FF00;
    const BLUE: u32 = 0x0000FF;
    const WHITE: u32 = 0xFFFFFF;

    #[test]
    fn packs_rgb() {
        assert_eq!(rgb(0x12, 0x34, 0x56), 0x123456);
    }

    #[test]
    fn blits_scaled_up() {
        let mut frame = vec![0u32; 16];
        let mut canvas = FrameCanvas::new(&mut frame, 4, 4);
        canvas.scale(2.0);
        canvas.draw_bitmap(&checker(), 0.0, 0.0, 2.0, 2.0);
        assert_eq!(
            frame,
            vec![
                RED, RED, GREEN, GREEN, //
                RED, RED, GREEN, GREEN, //
                BLUE, BLUE, WHITE, WHITE, //
                BLUE, BLUE, WHITE, WHITE,
            ]
        );
    }

    #[test]
    fn translate_is_in_scaled_units_and_clips() {
        let mut frame = vec![0u32; 16];
        let mut canvas = FrameCanvas::new(&mut frame, 4, 4);
        canvas.scale(2.0);
        canvas.translate(-1.0, -1.0);
        canvas.draw_bitmap(&checker(), 0.0, 0.0, 2.0, 2.0);
        // image point (1, 1) lands on the device origin
        assert_eq!(frame[0], WHITE);
        assert_eq!(frame[1], WHITE);
        assert_eq!(frame[2], 0);
        assert_eq!(frame[4 * 2], 0);
    }

    #[test]
    fn reset_restores_identity() {
        let mut frame = vec![0u32; 4];
        let mut canvas = FrameCanvas::new(&mut frame, 2, 2);
        canvas.scale(10.0);
        canvas.translate(5.0, 5.0);
        canvas.reset();
        canvas.fill_rect(1.0, 0.0, 1.0, 2.0, BLUE);
        assert_eq!(frame, vec![0, BLUE, 0, BLUE]);
    }

    #[test]
    fn off_screen_drawing_is_ignored() {
        let mut frame = vec![7u32; 4];
        let mut canvas = FrameCanvas::new(&mut frame, 2, 2);
        canvas.draw_bitmap(&checker(), -10.0, -10.0, 2.0, 2.0);
        canvas.fill_rect(5.0, 5.0, 3.0, 3.0, RED);
        canvas.draw_bitmap(&checker(), 0.0, 0.0, 0.0, 2.0);
        assert_eq!(frame, vec![7; 4]);
    }

    #[test]
    fn text_is_drawn_inside_its_extent() {
        let size = text_size("12");
        assert_eq!(size, Size::new(18.0, 15.0));

        let mut frame = vec![0u32; 40 * 20];
        let mut canvas = FrameCanvas::new(&mut frame, 40, 20);
        canvas.translate(5.0, 2.0);
        canvas.draw_text("12", 0.0, 0.0, WHITE);
        let lit: Vec<(usize, usize)> = (0..frame.len())
            .filter(|&i| frame[i] == WHITE)
            .map(|i| (i % 40, i / 40))
            .collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&(x, y)| (5..23).contains(&x) && (2..17).contains(&y)));
    }

    #[test]
    fn text_off_the_frame_is_clipped() {
        let mut frame = vec![0u32; 4];
        let mut canvas = FrameCanvas::new(&mut frame, 2, 2);
        canvas.draw_text("W", -20.0, -20.0, WHITE);
        canvas.draw_text("W", 100.0, 100.0, WHITE);
        assert_eq!(frame, vec![0; 4]);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        // 9 px per character
        assert_eq!(wrap_text("Saga of the Swamp Thing", 90.0), vec!["Saga of", "the Swamp", "Thing"]);
        assert_eq!(wrap_text("Incomprehensible x", 45.0), vec!["Incomprehensible", "x"]);
        assert_eq!(wrap_text("   ", 100.0), Vec::<String>::new());
    }
}
