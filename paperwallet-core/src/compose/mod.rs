//! Wallet card compositing.
//!
//! A card is the template image at natural size with both QR codes, the
//! rotated key strings and, for a positive denomination, the satoshi labels
//! drawn on top. Every coordinate is a fraction of the canvas size so the
//! same layout works for any template.

pub mod canvas;

pub use canvas::{Canvas, RasterCanvas, Rotation, Shadow, TextAlign, TextBaseline, TextStyle};

use crate::error::{PaperWalletError, Result};
use crate::qr::encode_qr;
use crate::types::{format_sats, WalletKeys};
use crate::wallet::{CompositionConfig, GeneratorConfig};
use base64::{engine::general_purpose, Engine as _};
use image::{Rgba, RgbaImage};
use std::path::Path;

pub const BLANK_WIDTH: u32 = 1200;
pub const BLANK_HEIGHT: u32 = 520;

/// Fonts are never scaled below this size.
pub const MIN_FONT_SIZE: f32 = 4.0;
const FIT_PADDING: f32 = 0.90;

const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
const SHADOW: Rgba<u8> = Rgba([0x00, 0x00, 0x00, 0x80]);

#[derive(Debug, Clone)]
pub struct Template {
    image: RgbaImage,
}

impl Template {
    pub fn load(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .map_err(|e| {
                PaperWalletError::compose(format!(
                    "Failed to load image: {}: {}",
                    path.display(),
                    e
                ))
            })?
            .to_rgba8();
        tracing::debug!(
            "Loaded template {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self { image })
    }

    /// Plain cream card with an orange frame.
    pub fn blank() -> Self {
        let mut canvas = RasterCanvas::new(BLANK_WIDTH, BLANK_HEIGHT);
        canvas.fill_rect(0, 0, BLANK_WIDTH, BLANK_HEIGHT, Rgba([0xf7, 0x93, 0x1a, 0xff]));
        canvas.fill_rect(
            6,
            6,
            BLANK_WIDTH - 12,
            BLANK_HEIGHT - 12,
            Rgba([0xff, 0xfa, 0xf0, 0xff]),
        );
        Self {
            image: canvas.into_image(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// One rendered card, PNG encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CompositeImage {
    pub fn from_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        let png = canvas::encode_png(image)?;
        Ok(Self { png, width, height })
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&self.png)
        )
    }
}

/// Cards stacked in a single column on a white page.
#[derive(Debug, Clone)]
pub struct MultiWalletComposite {
    pub image: CompositeImage,
    pub wallets: usize,
}

pub struct Compositor {
    template: Template,
    config: CompositionConfig,
}

impl Compositor {
    pub fn new(template: Template, config: CompositionConfig) -> Self {
        Self { template, config }
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let template = match &config.template {
            Some(path) => Template::load(path)?,
            None => Template::blank(),
        };
        Ok(Self::new(template, config.composition.clone()))
    }

    pub fn render(&self, keys: &WalletKeys) -> Result<RgbaImage> {
        let address_qr = encode_qr(&keys.address)?;
        let private_key_qr = encode_qr(&keys.private_key)?;
        Ok(self.render_with_codes(keys, &address_qr, &private_key_qr))
    }

    /// Same as [`Compositor::render`] with QR codes the caller already encoded.
    pub fn render_with_codes(
        &self,
        keys: &WalletKeys,
        address_qr: &RgbaImage,
        private_key_qr: &RgbaImage,
    ) -> RgbaImage {
        let mut canvas = RasterCanvas::from_image(self.template.image.clone());
        self.draw(&mut canvas, keys, address_qr, private_key_qr);
        canvas.into_image()
    }

    pub fn compose(&self, keys: &WalletKeys) -> Result<CompositeImage> {
        CompositeImage::from_image(self.render(keys)?)
    }

    pub fn compose_many(&self, wallets: &[WalletKeys]) -> Result<MultiWalletComposite> {
        let cards = wallets
            .iter()
            .map(|keys| self.render(keys))
            .collect::<Result<Vec<_>>>()?;
        self.preview(&cards)
    }

    /// Encodes the stacked page for cards that are already rendered.
    pub fn preview(&self, cards: &[RgbaImage]) -> Result<MultiWalletComposite> {
        Ok(MultiWalletComposite {
            image: CompositeImage::from_image(self.stack(cards)?)?,
            wallets: cards.len(),
        })
    }

    /// Stacks already rendered cards vertically. Every card is assumed to
    /// share the first card's size.
    pub fn stack(&self, cards: &[RgbaImage]) -> Result<RgbaImage> {
        let first = cards
            .first()
            .ok_or_else(|| PaperWalletError::compose("No wallet images to stack"))?;
        let (card_w, card_h) = first.dimensions();
        let (gap, padding) = (self.config.stack_gap, self.config.stack_padding);
        let (width, height) = stacked_dimensions(card_w, card_h, cards.len() as u32, gap, padding);

        let mut canvas = RasterCanvas::new(width, height);
        canvas.fill_rect(0, 0, width, height, WHITE);
        for (i, card) in cards.iter().enumerate() {
            let y = padding + i as u32 * (card_h + gap);
            canvas.draw_image(card, padding as f32, y as f32, None);
        }
        Ok(canvas.into_image())
    }

    /// Draws the card contents onto a canvas that already holds the template.
    pub fn draw<C: Canvas>(
        &self,
        canvas: &mut C,
        keys: &WalletKeys,
        address_qr: &RgbaImage,
        private_key_qr: &RgbaImage,
    ) {
        let cfg = &self.config;
        let (width, height) = (canvas.width(), canvas.height());
        let qr = cfg.qr_size;

        let (x, y) = cfg.address_qr.resolve(width, height);
        canvas.draw_image(address_qr, x, y, Some((qr, qr)));

        let (x, y) = cfg.private_key_qr.resolve(width, height);
        canvas.draw_image(private_key_qr, x - qr as f32, y, Some((qr, qr)));

        let mut key_style = TextStyle::new(cfg.key_font_size, rgb(cfg.address_color));
        key_style.bold = true;
        key_style.align = TextAlign::Center;
        key_style.baseline = TextBaseline::Top;
        key_style.rotation = Rotation::Deg90;
        let (x, y) = cfg.address_text.resolve(width, height);
        canvas.fill_text(&keys.address, x, y, &key_style);

        key_style.color = rgb(cfg.private_key_color);
        key_style.rotation = Rotation::Deg270;
        let (x, y) = cfg.private_key_text.resolve(width, height);
        canvas.fill_text(&keys.private_key, x, y, &key_style);

        let Some(sats) = keys.denomination() else {
            return;
        };
        let amount = format_sats(sats);

        let label = format!("{} SATOSHIS", amount);
        let (x, y) = cfg.satoshis_label.resolve(width, height);
        self.draw_fitted(
            canvas,
            &label,
            x,
            y,
            width as f32 * cfg.satoshis_label_max_width,
            cfg.satoshis_label_font_size,
        );

        for position in &cfg.satoshis_numbers {
            let (x, y) = position.resolve(width, height);
            self.draw_fitted(
                canvas,
                &amount,
                x,
                y,
                width as f32 * cfg.satoshis_number_max_width,
                cfg.satoshis_number_font_size,
            );
        }
    }

    fn draw_fitted<C: Canvas>(
        &self,
        canvas: &mut C,
        text: &str,
        x: f32,
        y: f32,
        max_width: f32,
        reference: f32,
    ) {
        let measured = canvas.measure_text(text, reference);
        let mut style = TextStyle::new(
            fit_font_size(measured, max_width, reference),
            rgb(self.config.satoshis_color),
        );
        style.baseline = TextBaseline::Middle;
        style.shadow = Some(Shadow {
            offset_x: 2.0,
            offset_y: 2.0,
            color: SHADOW,
        });
        canvas.fill_text(text, x, y, &style);
    }
}

/// Size at which text measured as `measured` (at `reference`) fits in
/// `max_width`: unchanged when it already fits, otherwise scaled down with
/// 10% slack and floored, never below [`MIN_FONT_SIZE`].
pub fn fit_font_size(measured: f32, max_width: f32, reference: f32) -> f32 {
    if measured <= max_width {
        return reference;
    }
    let scaled = (reference * (max_width * FIT_PADDING) / measured).floor();
    scaled.max(MIN_FONT_SIZE)
}

pub fn stacked_dimensions(
    card_width: u32,
    card_height: u32,
    count: u32,
    gap: u32,
    padding: u32,
) -> (u32, u32) {
    let width = card_width + padding * 2;
    let height = card_height * count + gap * count.saturating_sub(1) + padding * 2;
    (width, height)
}

fn rgb([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 0xff])
}

#[cfg(test)]
mod tests {
    use super::canvas::recording::{Op, RecordingCanvas};
    use super::*;

    fn keys(satoshis: Option<u64>) -> WalletKeys {
        WalletKeys {
            address: "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu".to_string(),
            private_key: "KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d".to_string(),
            satoshis,
        }
    }

    fn compositor() -> Compositor {
        Compositor::new(Template::blank(), CompositionConfig::default())
    }

    fn record(compositor: &Compositor, keys: &WalletKeys, width: u32) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::new(width, 500);
        let qr = RgbaImage::new(200, 200);
        compositor.draw(&mut canvas, keys, &qr, &qr);
        canvas
    }

    #[test]
    fn test_fit_font_size() {
        assert_eq!(fit_font_size(100.0, 200.0, 14.0), 14.0);
        assert_eq!(fit_font_size(200.0, 200.0, 14.0), 14.0);
        // 14 * 0.9 * 100 / 200 = 6.3
        assert_eq!(fit_font_size(200.0, 100.0, 14.0), 6.0);
        assert_eq!(fit_font_size(10_000.0, 10.0, 14.0), MIN_FONT_SIZE);
    }

    #[test]
    fn test_qr_placement() {
        let canvas = record(&compositor(), &keys(None), 1000);
        let images: Vec<_> = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Image { x, y, size } => Some((*x, *y, *size)),
                _ => None,
            })
            .collect();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0], (50.0, 200.0, Some((120, 120))));
        assert_eq!(images[1], (950.0 - 120.0, 200.0, Some((120, 120))));
    }

    #[test]
    fn test_key_text_rotation() {
        let canvas = record(&compositor(), &keys(None), 1000);
        let texts = canvas.texts();

        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].0, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert_eq!(texts[0].1.rotation, Rotation::Deg90);
        assert_eq!(texts[0].1.align, TextAlign::Center);
        assert!(texts[0].1.bold);
        assert_eq!(texts[1].1.rotation, Rotation::Deg270);
        assert_eq!(texts[1].1.color, Rgba([0xf7, 0x93, 0x1a, 0xff]));
    }

    #[test]
    fn test_no_denomination_for_absent_or_zero() {
        for satoshis in [None, Some(0)] {
            let canvas = record(&compositor(), &keys(satoshis), 1000);
            assert_eq!(canvas.texts().len(), 2);
        }
    }

    #[test]
    fn test_denomination_label_and_corners() {
        let canvas = record(&compositor(), &keys(Some(21_000_000)), 1000);
        let texts = canvas.texts();

        assert_eq!(texts.len(), 7);
        assert_eq!(texts[2].0, "21,000,000 SATOSHIS");
        assert!(texts[3..].iter().all(|(text, _)| *text == "21,000,000"));
        assert!(texts[2..]
            .iter()
            .all(|(_, style)| style.shadow.is_some() && style.baseline == TextBaseline::Middle));
    }

    #[test]
    fn test_denomination_scales_to_fit() {
        // Label is 19 chars, 0.6em each: 159.6px at 14px against 100px.
        let canvas = record(&compositor(), &keys(Some(21_000_000)), 400);
        let texts = canvas.texts();
        assert_eq!(texts[2].1.size, 7.0);

        // Wide canvas leaves the reference size alone.
        let canvas = record(&compositor(), &keys(Some(21_000_000)), 2000);
        assert_eq!(canvas.texts()[2].1.size, 14.0);
        assert_eq!(canvas.texts()[3].1.size, 12.0);
    }

    #[test]
    fn test_composite_is_deterministic() {
        let compositor = compositor();
        let first = compositor.compose(&keys(Some(21_000_000))).unwrap();
        let second = compositor.compose(&keys(Some(21_000_000))).unwrap();
        assert_eq!(first, second);
        assert_eq!((first.width, first.height), (BLANK_WIDTH, BLANK_HEIGHT));
    }

    #[test]
    fn test_composite_draws_on_template() {
        let compositor = compositor();
        let card = compositor.render(&keys(None)).unwrap();
        let blank = Template::blank();
        assert_eq!(card.dimensions(), blank.dimensions());
        assert_ne!(card, blank.image);
    }

    #[test]
    fn test_stacked_height() {
        let compositor = compositor();
        let wallets = vec![keys(None), keys(Some(1000)), keys(None)];
        let stacked = compositor.compose_many(&wallets).unwrap();

        let n = wallets.len() as u32;
        assert_eq!(stacked.wallets, 3);
        assert_eq!(stacked.image.width, BLANK_WIDTH + 2 * 40);
        assert_eq!(
            stacked.image.height,
            n * BLANK_HEIGHT + (n - 1) * 20 + 2 * 40
        );
    }

    #[test]
    fn test_stack_single_and_empty() {
        assert_eq!(stacked_dimensions(100, 50, 1, 20, 40), (180, 130));
        assert!(compositor().compose_many(&[]).is_err());
    }

    #[test]
    fn test_data_url() {
        let card = compositor().compose(&keys(None)).unwrap();
        assert!(card.to_data_url().starts_with("data:image/png;base64,iVBOR"));
    }
}
