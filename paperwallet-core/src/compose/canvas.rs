use crate::error::Result;
use font8x8::UnicodeFonts;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Pixel, Rgba, RgbaImage};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Middle,
}

/// Clockwise rotation around the text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Deg90,
    Deg270,
}

impl Rotation {
    fn apply(self, u: f32, v: f32) -> (f32, f32) {
        match self {
            Rotation::None => (u, v),
            Rotation::Deg90 => (-v, u),
            Rotation::Deg270 => (v, -u),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub color: Rgba<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub color: Rgba<u8>,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub rotation: Rotation,
    pub shadow: Option<Shadow>,
}

impl TextStyle {
    pub fn new(size: f32, color: Rgba<u8>) -> Self {
        Self {
            size,
            bold: false,
            color,
            align: TextAlign::Left,
            baseline: TextBaseline::Top,
            rotation: Rotation::None,
            shadow: None,
        }
    }
}

/// Drawing surface used by the compositor.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>);
    /// Draws `image` with its top-left corner at (`x`, `y`), scaled to
    /// `size` when given.
    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, size: Option<(u32, u32)>);
    fn measure_text(&self, text: &str, size: f32) -> f32;
    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle);
}

/// Headless RGBA canvas with an embedded 8x8 monospace bitmap font.
pub struct RasterCanvas {
    image: RgbaImage,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn into_png(self) -> Result<Vec<u8>> {
        encode_png(self.image)
    }

    fn glyph_px(size: f32) -> u32 {
        size.round().max(1.0) as u32
    }

    fn blend(&mut self, x: f32, y: f32, color: Rgba<u8>) {
        let (x, y) = (x.floor(), y.floor());
        if x < 0.0 || y < 0.0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x < self.image.width() && y < self.image.height() {
            self.image.get_pixel_mut(x, y).blend(&color);
        }
    }

    fn draw_glyphs(&mut self, text: &str, x: f32, y: f32, style: &TextStyle, color: Rgba<u8>) {
        let px = Self::glyph_px(style.size);
        let width = self.measure_text(text, style.size);

        let u0 = match style.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => -width / 2.0,
        };
        let v0 = match style.baseline {
            TextBaseline::Top => 0.0,
            TextBaseline::Middle => -(px as f32) / 2.0,
        };

        for (i, ch) in text.chars().enumerate() {
            let glyph = font8x8::BASIC_FONTS
                .get(ch)
                .or_else(|| font8x8::BASIC_FONTS.get('?'))
                .unwrap_or([0; 8]);
            let origin = u0 + (i as u32 * px) as f32;

            for gy in 0..px {
                let row = glyph[(gy * 8 / px) as usize];
                for gx in 0..px {
                    if (row >> (gx * 8 / px)) & 1 == 0 {
                        continue;
                    }
                    let u = origin + gx as f32;
                    let v = v0 + gy as f32;
                    let (dx, dy) = style.rotation.apply(u, v);
                    self.blend(x + dx, y + dy, color);
                    if style.bold {
                        let (dx, dy) = style.rotation.apply(u + 1.0, v);
                        self.blend(x + dx, y + dy, color);
                    }
                }
            }
        }
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
        let x_end = x.saturating_add(width).min(self.image.width());
        let y_end = y.saturating_add(height).min(self.image.height());
        for py in y..y_end {
            for px in x..x_end {
                self.image.get_pixel_mut(px, py).blend(&color);
            }
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, size: Option<(u32, u32)>) {
        let (x, y) = (x.floor() as i64, y.floor() as i64);
        match size {
            Some((w, h)) if (w, h) != image.dimensions() => {
                let scaled = imageops::resize(image, w, h, FilterType::Triangle);
                imageops::overlay(&mut self.image, &scaled, x, y);
            }
            _ => imageops::overlay(&mut self.image, image, x, y),
        }
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        (text.chars().count() as u32 * Self::glyph_px(size)) as f32
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        if let Some(shadow) = style.shadow {
            self.draw_glyphs(
                text,
                x + shadow.offset_x,
                y + shadow.offset_y,
                style,
                shadow.color,
            );
        }
        self.draw_glyphs(text, x, y, style, style.color);
    }
}

pub fn encode_png(image: RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        FillRect { x: u32, y: u32, width: u32, height: u32 },
        Image { x: f32, y: f32, size: Option<(u32, u32)> },
        Text { text: String, x: f32, y: f32, style: TextStyle },
    }

    /// Canvas that remembers draw calls; text is measured as 0.6em per char.
    pub struct RecordingCanvas {
        pub width: u32,
        pub height: u32,
        pub ops: Vec<Op>,
    }

    impl RecordingCanvas {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ops: Vec::new(),
            }
        }

        pub fn texts(&self) -> Vec<(&str, &TextStyle)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text { text, style, .. } => Some((text.as_str(), style)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, _color: Rgba<u8>) {
            self.ops.push(Op::FillRect { x, y, width, height });
        }

        fn draw_image(&mut self, _image: &RgbaImage, x: f32, y: f32, size: Option<(u32, u32)>) {
            self.ops.push(Op::Image { x, y, size });
        }

        fn measure_text(&self, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * size * 0.6
        }

        fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
            self.ops.push(Op::Text {
                text: text.to_string(),
                x,
                y,
                style: *style,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([0xff, 0, 0, 0xff]);
    const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

    fn white_canvas(width: u32, height: u32) -> RasterCanvas {
        let mut canvas = RasterCanvas::new(width, height);
        canvas.fill_rect(0, 0, width, height, WHITE);
        canvas
    }

    fn painted(canvas: &RasterCanvas) -> Vec<(u32, u32)> {
        canvas
            .image()
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == RED)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_measure_is_monospace() {
        let canvas = RasterCanvas::new(10, 10);
        assert_eq!(canvas.measure_text("abcd", 8.0), 32.0);
        assert_eq!(canvas.measure_text("", 8.0), 0.0);
    }

    #[test]
    fn test_unrotated_text_stays_in_its_box() {
        let mut canvas = white_canvas(100, 40);
        canvas.fill_text("HI", 10.0, 5.0, &TextStyle::new(8.0, RED));

        let pixels = painted(&canvas);
        assert!(!pixels.is_empty());
        assert!(pixels
            .iter()
            .all(|&(x, y)| (10..26).contains(&x) && (5..13).contains(&y)));
    }

    #[test]
    fn test_rotated_text_runs_vertically() {
        let mut canvas = white_canvas(40, 100);
        let mut style = TextStyle::new(8.0, RED);
        style.rotation = Rotation::Deg90;
        canvas.fill_text("HELLO", 20.0, 10.0, &style);

        let pixels = painted(&canvas);
        let (min_y, max_y) = pixels
            .iter()
            .fold((u32::MAX, 0), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
        assert!(pixels.iter().all(|&(x, _)| x <= 20 && x >= 12));
        assert!(max_y - min_y > 30);
    }

    #[test]
    fn test_draw_image_scales() {
        let mut canvas = white_canvas(50, 50);
        let mut source = RgbaImage::new(200, 200);
        for p in source.pixels_mut() {
            *p = RED;
        }
        canvas.draw_image(&source, 10.0, 10.0, Some((20, 20)));

        let pixels = painted(&canvas);
        assert_eq!(pixels.len(), 400);
        assert!(pixels.contains(&(10, 10)));
        assert!(pixels.contains(&(29, 29)));
    }

    #[test]
    fn test_png_encoding() {
        let canvas = white_canvas(8, 8);
        let png = canvas.into_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
