use crate::error::{PaperWalletError, Result};
use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub network: Network,
    /// Card background; the built-in blank card is used when unset.
    pub template: Option<PathBuf>,
    pub composition: CompositionConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            template: None,
            composition: CompositionConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        self.template = template;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(template) = &self.template {
            if template.as_os_str().is_empty() {
                return Err(PaperWalletError::config("Template path cannot be empty"));
            }
        }
        self.composition.validate()
    }
}

/// A point expressed as fractions of the canvas width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn resolve(&self, width: u32, height: u32) -> (f32, f32) {
        (width as f32 * self.x, height as f32 * self.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    pub qr_size: u32,
    pub address_qr: Position,
    /// Right edge of the private key QR code.
    pub private_key_qr: Position,
    pub address_text: Position,
    pub private_key_text: Position,
    pub key_font_size: f32,
    pub address_color: [u8; 3],
    pub private_key_color: [u8; 3],
    pub satoshis_label: Position,
    pub satoshis_label_font_size: f32,
    pub satoshis_label_max_width: f32,
    pub satoshis_numbers: [Position; 4],
    pub satoshis_number_font_size: f32,
    pub satoshis_number_max_width: f32,
    pub satoshis_color: [u8; 3],
    pub stack_gap: u32,
    pub stack_padding: u32,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            qr_size: 120,
            address_qr: Position::new(0.05, 0.40),
            private_key_qr: Position::new(0.95, 0.40),
            address_text: Position::new(0.009, 0.5),
            private_key_text: Position::new(0.99, 0.5),
            key_font_size: 8.0,
            address_color: [0x0d, 0x57, 0x9b],
            private_key_color: [0xf7, 0x93, 0x1a],
            satoshis_label: Position::new(0.78, 0.18),
            satoshis_label_font_size: 14.0,
            satoshis_label_max_width: 0.25,
            satoshis_numbers: [
                Position::new(0.05, 0.12),
                Position::new(0.84, 0.12),
                Position::new(0.05, 0.86),
                Position::new(0.84, 0.86),
            ],
            satoshis_number_font_size: 12.0,
            satoshis_number_max_width: 0.15,
            satoshis_color: [0xf7, 0x93, 0x1a],
            stack_gap: 20,
            stack_padding: 40,
        }
    }
}

impl CompositionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.qr_size == 0 {
            return Err(PaperWalletError::config("QR size must be greater than 0"));
        }

        let fonts = [
            self.key_font_size,
            self.satoshis_label_font_size,
            self.satoshis_number_font_size,
        ];
        if fonts.iter().any(|&size| size <= 0.0) {
            return Err(PaperWalletError::config("Font sizes must be greater than 0"));
        }

        let mut positions = vec![
            self.address_qr,
            self.private_key_qr,
            self.address_text,
            self.private_key_text,
            self.satoshis_label,
        ];
        positions.extend_from_slice(&self.satoshis_numbers);
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if positions.iter().any(|p| !in_unit(p.x) || !in_unit(p.y)) {
            return Err(PaperWalletError::config(
                "Layout positions must be fractions between 0 and 1",
            ));
        }

        if !in_unit(self.satoshis_label_max_width) || !in_unit(self.satoshis_number_max_width) {
            return Err(PaperWalletError::config(
                "Label widths must be fractions between 0 and 1",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
        assert_eq!(GeneratorConfig::default().network, Network::Bitcoin);
    }

    #[test]
    fn test_rejects_out_of_range_position() {
        let mut config = GeneratorConfig::default();
        config.composition.address_qr = Position::new(1.5, 0.4);
        assert!(matches!(config.validate(), Err(PaperWalletError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_qr_size() {
        let mut config = GeneratorConfig::new(Network::Testnet);
        config.composition.qr_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serializes() {
        let config = GeneratorConfig::new(Network::Signet);
        let json = serde_json::to_string(&config).unwrap();
        let back: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.network, Network::Signet);
        assert_eq!(back.composition.qr_size, 120);
    }
}
