use image::{GrayImage, Luma, imageops};

use crate::geometry::PixelPoint;

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, p: PixelPoint) -> bool {
        p.x >= 0
            && p.y >= 0
            && (p.x as u32) >= self.x0
            && (p.x as u32) < self.x1
            && (p.y as u32) >= self.y0
            && (p.y as u32) < self.y1
    }

    /// Clip to `[0, width) x [0, height)`, keeping at least one pixel.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let x0 = self.x0.min(width.saturating_sub(1));
        let y0 = self.y0.min(height.saturating_sub(1));
        Self {
            x0,
            y0,
            x1: self.x1.min(width).max(x0 + 1),
            y1: self.y1.min(height).max(y0 + 1),
        }
    }
}

/// Palette-indexed raster surface; each pixel holds a palette slot.
#[derive(Clone, Debug)]
pub struct IndexedCanvas {
    pixels: GrayImage,
}

impl IndexedCanvas {
    pub fn new(width: u32, height: u32, fill: u8) -> Self {
        Self {
            pixels: GrayImage::from_pixel(width, height, Luma([fill])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn full_rect(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width(), self.height())
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0[0])
    }

    /// Set one pixel; positions outside the canvas are ignored.
    pub fn put(&mut self, p: PixelPoint, idx: u8) {
        if p.x < 0 || p.y < 0 {
            return;
        }
        if let Some(px) = self.pixels.get_pixel_mut_checked(p.x as u32, p.y as u32) {
            *px = Luma([idx]);
        }
    }

    /// One-pixel Bresenham line, both endpoints included.
    pub fn draw_line(&mut self, from: PixelPoint, to: PixelPoint, idx: u8) {
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        let mut p = from;

        loop {
            self.put(p, idx);
            if p == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                p.x += sx;
            }
            if e2 <= dx {
                err += dx;
                p.y += sy;
            }
        }
    }

    pub fn fill_rect(&mut self, rect: PixelRect, idx: u8) {
        let rect = rect.clamp_to(self.width(), self.height());
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                self.pixels.put_pixel(x, y, Luma([idx]));
            }
        }
    }

    /// One-pixel outline along the inside edge of `rect`.
    pub fn outline_rect(&mut self, rect: PixelRect, idx: u8) {
        if rect.is_empty() {
            return;
        }
        let (x0, y0) = (rect.x0 as i32, rect.y0 as i32);
        let (x1, y1) = (rect.x1 as i32 - 1, rect.y1 as i32 - 1);
        let corners = [
            PixelPoint::new(x0, y0),
            PixelPoint::new(x1, y0),
            PixelPoint::new(x1, y1),
            PixelPoint::new(x0, y1),
        ];
        for i in 0..4 {
            self.draw_line(corners[i], corners[(i + 1) % 4], idx);
        }
    }

    /// Copy of the pixels inside `rect` (clamped to the canvas), row-major.
    pub fn crop(&self, rect: PixelRect) -> GrayImage {
        let rect = rect.clamp_to(self.width(), self.height());
        imageops::crop_imm(&self.pixels, rect.x0, rect.y0, rect.width(), rect.height()).to_image()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}
