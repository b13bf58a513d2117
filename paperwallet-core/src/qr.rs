use crate::error::{PaperWalletError, Result};
use image::{Rgba, RgbaImage};
use qrcode::render::unicode;
use qrcode::{Color, EcLevel, QrCode};

pub const QR_WIDTH: u32 = 200;
pub const QR_MARGIN: u32 = 2;
/// Pixels per module when the symbol does not fit in `QR_WIDTH`.
pub const QR_FALLBACK_SCALE: u32 = 4;

const DARK: Rgba<u8> = Rgba([0x00, 0x00, 0x00, 0xff]);
const LIGHT: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);

/// Encodes `text` as a `QR_WIDTH` square raster with a `QR_MARGIN` module
/// quiet zone, black on white.
///
/// The module scale is fractional and each output pixel samples the module
/// under it (floor). A symbol wider than `QR_WIDTH` modules, quiet zone
/// included, is drawn at `QR_FALLBACK_SCALE` pixels per module instead.
pub fn encode_qr(text: &str) -> Result<RgbaImage> {
    let code = encode(text)?;
    let size = code.width() as u32;
    let modules = code.to_colors();

    let (symbol, scale) = qr_geometry(size + QR_MARGIN * 2);
    let margin = QR_MARGIN as f32 * scale;

    let image = RgbaImage::from_fn(symbol, symbol, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let edge = symbol as f32 - margin;
        if fx < margin || fy < margin || fx >= edge || fy >= edge {
            return LIGHT;
        }
        let col = (((fx - margin) / scale).floor() as u32).min(size - 1);
        let row = (((fy - margin) / scale).floor() as u32).min(size - 1);
        match modules[(row * size + col) as usize] {
            Color::Dark => DARK,
            Color::Light => LIGHT,
        }
    });

    Ok(image)
}

/// Image side and pixels per module for a symbol `total` modules wide.
fn qr_geometry(total: u32) -> (u32, f32) {
    if QR_WIDTH >= total {
        (QR_WIDTH, QR_WIDTH as f32 / total as f32)
    } else {
        (total * QR_FALLBACK_SCALE, QR_FALLBACK_SCALE as f32)
    }
}

/// Compact Unicode rendering for showing a code in the terminal.
pub fn render_terminal(text: &str) -> Result<String> {
    let code = encode(text)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}

fn encode(text: &str) -> Result<QrCode> {
    QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)
        .map_err(|e| PaperWalletError::qr(format!("Failed to encode QR code: {}", e)))
}
