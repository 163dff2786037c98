use std::path::Path;

use image::{Rgba as Pixel, RgbaImage};

use crate::Result;

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses a display color token: a named color or `#rgb` / `#rrggbb`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Some(hex) = token.strip_prefix('#') {
            return parse_hex(hex);
        }
        let named = match token.to_ascii_lowercase().as_str() {
            "red" => Rgba::rgb(255, 0, 0),
            "blue" => Rgba::rgb(0, 0, 255),
            "yellow" => Rgba::rgb(255, 255, 0),
            "green" => Rgba::rgb(0, 128, 0),
            "white" => Rgba::WHITE,
            "purple" => Rgba::rgb(128, 0, 128),
            "pink" => Rgba::rgb(255, 192, 203),
            "orange" => Rgba::rgb(255, 165, 0),
            "gold" => Rgba::rgb(255, 215, 0),
            "cyan" | "aqua" => Rgba::rgb(0, 255, 255),
            "magenta" | "fuchsia" => Rgba::rgb(255, 0, 255),
            "lime" => Rgba::rgb(0, 255, 0),
            "silver" => Rgba::rgb(192, 192, 192),
            "black" => Rgba::BLACK,
            _ => return None,
        };
        Some(named)
    }

    /// Like [`Rgba::parse`], falling back to white for unknown tokens.
    pub fn parse_or_white(token: &str) -> Self {
        Self::parse(token).unwrap_or_else(|| {
            tracing::warn!(color = token, "unknown color token, using white");
            Rgba::WHITE
        })
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    match digits.as_slice() {
        [r, g, b] => Some(Rgba::rgb(r * 17, g * 17, b * 17)),
        [r1, r0, g1, g0, b1, b0] => Some(Rgba::rgb(r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0)),
        _ => None,
    }
}

/// 2D drawing surface the show renders into.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Resets every pixel to the background.
    fn clear(&mut self);

    /// Fills a disc. `alpha` in `[0, 1]` scales the color's own alpha.
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba, alpha: f32);
}

/// Software RGBA surface on a black background.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            image: RgbaImage::new(width, height),
        };
        canvas.clear();
        canvas
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.image.width() || y >= self.image.height() {
            return None;
        }
        let [r, g, b, a] = self.image.get_pixel(x, y).0;
        Some(Rgba { r, g, b, a })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba, coverage: f32) {
        let pixel = self.image.get_pixel_mut(x, y);
        let mix = |dst: u8, src: u8| -> u8 {
            (dst as f32 + (src as f32 - dst as f32) * coverage).round() as u8
        };
        let [r, g, b, _] = pixel.0;
        *pixel = Pixel([mix(r, color.r), mix(g, color.g), mix(b, color.b), 255]);
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Pixel([0, 0, 0, 255]);
        }
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba, alpha: f32) {
        let coverage = (alpha * color.a as f32 / 255.0).clamp(0.0, 1.0);
        if coverage <= 0.0 || radius <= 0.0 || !x.is_finite() || !y.is_finite() {
            return;
        }

        let (width, height) = self.image.dimensions();
        let min_x = (x - radius).floor().max(0.0) as u32;
        let min_y = (y - radius).floor().max(0.0) as u32;
        let max_x = (x + radius).ceil().min(width as f32 - 1.0);
        let max_y = (y + radius).ceil().min(height as f32 - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }

        let radius_sq = radius * radius;
        for py in min_y..=max_y as u32 {
            for px in min_x..=max_x as u32 {
                let dx = px as f32 + 0.5 - x;
                let dy = py as f32 + 0.5 - y;
                if dx * dx + dy * dy <= radius_sq {
                    self.blend(px, py, color, coverage);
                }
            }
        }
    }
}

/// Surface that only remembers what was drawn. Useful for headless hosts and
/// for asserting on draw order.
#[derive(Debug, Clone, Default)]
pub struct DrawLog {
    width: u32,
    height: u32,
    pub circles: Vec<DrawnCircle>,
    pub clears: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawnCircle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Rgba,
    pub alpha: f32,
}

impl DrawLog {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl Surface for DrawLog {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.circles.clear();
        self.clears += 1;
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba, alpha: f32) {
        self.circles.push(DrawnCircle {
            x,
            y,
            radius,
            color,
            alpha,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_color_tokens() {
        assert_eq!(Rgba::parse("red"), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(Rgba::parse(" Pink "), Some(Rgba::rgb(255, 192, 203)));
        assert_eq!(Rgba::parse("#ff6666"), Some(Rgba::rgb(255, 102, 102)));
        assert_eq!(Rgba::parse("#fff"), Some(Rgba::WHITE));
        assert_eq!(Rgba::parse("#ff66"), None);
        assert_eq!(Rgba::parse("chartreuse-ish"), None);
        assert_eq!(Rgba::parse_or_white("nope"), Rgba::WHITE);
    }

    #[test]
    fn fills_and_clears_pixels() {
        let mut canvas = Canvas::new(20, 20);
        canvas.fill_circle(10.0, 10.0, 3.0, Rgba::rgb(255, 0, 0), 1.0);

        assert_eq!(canvas.pixel(10, 10), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(0, 0), Some(Rgba::BLACK));

        canvas.clear();
        assert_eq!(canvas.pixel(10, 10), Some(Rgba::BLACK));
    }

    #[test]
    fn alpha_blends_over_background() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_circle(2.0, 2.0, 1.0, Rgba::WHITE, 0.5);

        let pixel = canvas.pixel(1, 1).unwrap();
        assert!(pixel.r > 100 && pixel.r < 160);
    }

    #[test]
    fn ignores_offscreen_and_transparent_circles() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_circle(-50.0, -50.0, 2.0, Rgba::WHITE, 1.0);
        canvas.fill_circle(4.0, 4.0, 2.0, Rgba::WHITE, 0.0);
        canvas.fill_circle(f32::NAN, 4.0, 2.0, Rgba::WHITE, 1.0);

        assert!(canvas.image().pixels().all(|pixel| pixel.0 == [0, 0, 0, 255]));
    }
}
