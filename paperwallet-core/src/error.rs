use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaperWalletError>;

#[derive(Error, Debug)]
pub enum PaperWalletError {
    #[error("Please enter a valid number of wallets (1-20): {0}")]
    InvalidWalletCount(String),

    #[error("Please enter a valid Satoshis amount (must be a positive number): {0}")]
    InvalidSatoshis(String),

    #[error("Key derivation error: {0}")]
    Derivation(String),

    #[error("QR encoding error: {0}")]
    QrEncode(String),

    #[error("Image composition error: {0}")]
    Compose(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Please generate wallet(s) first")]
    NoWallets,

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Print error: {0}")]
    Print(String),

    #[error("Build file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("Inline error: {0}")]
    Inline(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaperWalletError {
    pub fn derivation(msg: impl Into<String>) -> Self {
        Self::Derivation(msg.into())
    }

    pub fn qr(msg: impl Into<String>) -> Self {
        Self::QrEncode(msg.into())
    }

    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose(msg.into())
    }

    pub fn clipboard(msg: impl Into<String>) -> Self {
        Self::Clipboard(msg.into())
    }

    pub fn print(msg: impl Into<String>) -> Self {
        Self::Print(msg.into())
    }

    pub fn inline(msg: impl Into<String>) -> Self {
        Self::Inline(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn dialog(msg: impl Into<String>) -> Self {
        Self::Dialog(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn missing_input(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput { path: path.into() }
    }

    /// Validation errors are shown to the user verbatim; everything else is
    /// reported generically with the detail going to the log.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidWalletCount(_) | Self::InvalidSatoshis(_)
        )
    }
}
