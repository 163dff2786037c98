//! Off-screen glyph rasterization used to seed glyph shells.

use std::f32::consts::PI;

/// Square alpha-only raster a glyph was drawn into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRaster {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

/// Sampled raster position whose coverage passed the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterCell {
    pub x: u32,
    pub y: u32,
}

impl GlyphRaster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0; width as usize * height as usize],
        }
    }

    /// Builds a raster from row-major alpha values. Returns `None` when the
    /// buffer does not match the dimensions.
    pub fn from_alpha(width: u32, height: u32, alpha: Vec<u8>) -> Option<Self> {
        (alpha.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            alpha,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.alpha[y as usize * self.width as usize + x as usize]
    }

    fn set(&mut self, x: u32, y: u32, value: u8) {
        let index = y as usize * self.width as usize + x as usize;
        self.alpha[index] = self.alpha[index].max(value);
    }

    /// Visits the raster every `step` pixels in row-major order and keeps the
    /// cells whose alpha is strictly above `threshold`.
    pub fn sample(&self, step: u32, threshold: u8) -> Vec<RasterCell> {
        let step = step.max(1) as usize;
        let mut cells = Vec::new();
        for y in (0..self.height).step_by(step) {
            for x in (0..self.width).step_by(step) {
                if self.alpha_at(x, y) > threshold {
                    cells.push(RasterCell { x, y });
                }
            }
        }
        cells
    }
}

/// How a glyph should be drawn into its raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterRequest {
    /// Side length of the square raster.
    pub raster_size: u32,
    /// Nominal font size in raster pixels.
    pub font_px: f32,
    /// Stroke width of the outline drawn around the glyph, if any.
    pub outline: Option<f32>,
}

/// Renders text into an alpha raster.
pub trait GlyphRasterizer {
    fn rasterize(&self, text: &str, request: &RasterRequest) -> GlyphRaster;
}

const FONT_COLUMNS: usize = 5;
const FONT_ROWS: usize = 7;
/// Bitmap columns plus one column of spacing.
const CELL_COLUMNS: f32 = 6.0;

/// Built-in 5×7 bitmap font. Characters without a bitmap (emoji, kana, ...)
/// are drawn as a five-petal blossom.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFont;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Bitmap(&'static [u8; FONT_ROWS]),
    Blank,
    Blossom,
}

impl Shape {
    fn for_char(c: char) -> Self {
        if c == ' ' {
            return Shape::Blank;
        }
        match glyph_bitmap(c.to_ascii_uppercase()) {
            Some(rows) => Shape::Bitmap(rows),
            None => Shape::Blossom,
        }
    }

    /// Width of the shape relative to its height.
    fn aspect(self) -> f32 {
        match self {
            Shape::Blossom => 1.0,
            _ => CELL_COLUMNS / FONT_ROWS as f32,
        }
    }

    /// Coverage at normalised cell coordinates `u, v` in `[0, 1)`.
    fn covers(self, u: f32, v: f32) -> bool {
        match self {
            Shape::Blank => false,
            Shape::Bitmap(rows) => {
                let column = (u * CELL_COLUMNS) as usize;
                let row = (v * FONT_ROWS as f32) as usize;
                column < FONT_COLUMNS
                    && row < FONT_ROWS
                    && rows[row] & (1 << (FONT_COLUMNS - 1 - column)) != 0
            }
            Shape::Blossom => {
                let dx = u - 0.5;
                let dy = v - 0.5;
                let radius = (dx * dx + dy * dy).sqrt();
                let angle = dy.atan2(dx) + PI / 2.0;
                let petal = 0.3 + 0.2 * (2.5 * angle).cos().abs();
                radius <= petal
            }
        }
    }
}

impl GlyphRasterizer for BitmapFont {
    fn rasterize(&self, text: &str, request: &RasterRequest) -> GlyphRaster {
        let size = request.raster_size;
        let mut raster = GlyphRaster::new(size, size);

        let shapes: Vec<Shape> = text
            .chars()
            .filter(|c| !is_joiner(*c))
            .map(Shape::for_char)
            .collect();
        if shapes.is_empty() || size == 0 {
            return raster;
        }

        let margin = request.outline.unwrap_or(0.0).max(0.0);
        let available = (size as f32 - 2.0 * margin).max(1.0);
        let mut height = (request.font_px * 0.8).min(available);
        let total_aspect: f32 = shapes.iter().map(|shape| shape.aspect()).sum();
        if height * total_aspect > available {
            height = available / total_aspect;
        }

        let (center_x, center_y) = raster.center();
        let top = center_y - height / 2.0;
        let mut left = center_x - height * total_aspect / 2.0;
        let mut mask = vec![false; size as usize * size as usize];

        for shape in shapes {
            let width = height * shape.aspect();
            let x0 = left.max(0.0) as u32;
            let x1 = ((left + width).ceil().max(0.0) as u32).min(size);
            let y0 = top.max(0.0) as u32;
            let y1 = ((top + height).ceil().max(0.0) as u32).min(size);
            for y in y0..y1 {
                for x in x0..x1 {
                    let u = (x as f32 + 0.5 - left) / width;
                    let v = (y as f32 + 0.5 - top) / height;
                    if (0.0..1.0).contains(&u) && (0.0..1.0).contains(&v) && shape.covers(u, v) {
                        mask[y as usize * size as usize + x as usize] = true;
                    }
                }
            }
            left += width;
        }

        let reach = request
            .outline
            .map(|width| (width / 2.0).max(0.0))
            .unwrap_or(0.0);
        for y in 0..size {
            for x in 0..size {
                if mask[y as usize * size as usize + x as usize] {
                    raster.set(x, y, 255);
                    if reach > 0.0 {
                        stroke_around(&mut raster, x, y, reach);
                    }
                }
            }
        }
        raster
    }
}

fn stroke_around(raster: &mut GlyphRaster, x: u32, y: u32, reach: f32) {
    let span = reach.ceil() as i64;
    let reach_sq = reach * reach;
    for dy in -span..=span {
        for dx in -span..=span {
            if (dx * dx + dy * dy) as f32 > reach_sq {
                continue;
            }
            let (nx, ny) = (x as i64 + dx, y as i64 + dy);
            if nx >= 0 && ny >= 0 && (nx as u32) < raster.width && (ny as u32) < raster.height {
                raster.set(nx as u32, ny as u32, 255);
            }
        }
    }
}

/// Zero-width characters that only modify the previous glyph.
fn is_joiner(c: char) -> bool {
    matches!(c, '\u{200D}' | '\u{FE00}'..='\u{FE0F}' | '\u{1F3FB}'..='\u{1F3FF}')
}

fn glyph_bitmap(c: char) -> Option<&'static [u8; FONT_ROWS]> {
    let rows: &'static [u8; FONT_ROWS] = match c {
        '0' => &[0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => &[0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => &[0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => &[0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => &[0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => &[0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => &[0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => &[0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => &[0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => &[0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => &[0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => &[0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => &[0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => &[0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => &[0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => &[0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => &[0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => &[0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => &[0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => &[0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => &[0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => &[0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => &[0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => &[0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => &[0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => &[0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => &[0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => &[0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => &[0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => &[0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => &[0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => &[0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => &[0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => &[0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => &[0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => &[0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '!' => &[0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => &[0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '+' => &[0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '-' => &[0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => &[0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        _ => return None,
    };
    Some(rows)
}
