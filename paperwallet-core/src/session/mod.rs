//! Generation session: validates the user's inputs, derives and renders a
//! batch of wallets, and keeps the latest batch for the copy and print
//! actions.
//!
//! Requests are serialized. A request issued while another is running waits
//! for it and then replaces its result, so the session always holds the batch
//! of the most recently *started* request once everything settles.

pub mod clipboard;

pub use clipboard::{copy_text, Clipboard, CopyButton, COPIED_FOR, COPIED_LABEL, COPY_LABEL};

use crate::compose::{CompositeImage, Compositor, MultiWalletComposite};
use crate::error::{PaperWalletError, Result};
use crate::print::PrintDocument;
use crate::qr::encode_qr;
use crate::types::{format_sats, Wallet};
use crate::wallet::{generate_wallet, GeneratorConfig};
use bitcoin::Network;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const MIN_WALLETS: usize = 1;
pub const MAX_WALLETS: usize = 20;

/// Empty input means one wallet.
pub fn parse_wallet_count(input: &str) -> Result<usize> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(MIN_WALLETS);
    }
    match input.parse::<usize>() {
        Ok(count) if (MIN_WALLETS..=MAX_WALLETS).contains(&count) => Ok(count),
        _ => Err(PaperWalletError::InvalidWalletCount(input.to_string())),
    }
}

/// Empty input means no denomination.
pub fn parse_satoshis(input: &str) -> Result<Option<u64>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    input
        .parse::<u64>()
        .map(Some)
        .map_err(|_| PaperWalletError::InvalidSatoshis(input.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub count: usize,
    pub satoshis: Option<u64>,
}

impl GenerationRequest {
    pub fn new(count: usize, satoshis: Option<u64>) -> Result<Self> {
        if !(MIN_WALLETS..=MAX_WALLETS).contains(&count) {
            return Err(PaperWalletError::InvalidWalletCount(count.to_string()));
        }
        Ok(Self { count, satoshis })
    }

    pub fn from_inputs(count: &str, satoshis: &str) -> Result<Self> {
        let count = parse_wallet_count(count)?;
        let satoshis = parse_satoshis(satoshis)?;
        Ok(Self { count, satoshis })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Address,
    PrivateKey,
    Mnemonic,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Address, FieldKind::PrivateKey, FieldKind::Mnemonic];

    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Address => "Bitcoin Address (Segwit)",
            FieldKind::PrivateKey => "Private Key (WIF)",
            FieldKind::Mnemonic => "Mnemonic Phrase (12 words)",
        }
    }
}

/// A copyable text field of one wallet in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub wallet: usize,
    pub kind: FieldKind,
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FieldKind::Address => "address",
            FieldKind::PrivateKey => "privateKey",
            FieldKind::Mnemonic => "mnemonic",
        };
        write!(f, "{}-{}", kind, self.wallet)
    }
}

pub struct WalletSection {
    pub title: String,
    pub wallet: Wallet,
    pub address_qr: RgbaImage,
    pub private_key_qr: RgbaImage,
    pub card: CompositeImage,
}

/// Everything one generation request produced.
pub struct Batch {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub network: Network,
    pub sections: Vec<WalletSection>,
    pub preview: MultiWalletComposite,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.sections.iter().map(|s| &s.wallet)
    }

    pub fn cards(&self) -> Vec<CompositeImage> {
        self.sections.iter().map(|s| s.card.clone()).collect()
    }

    pub fn field_text(&self, field: FieldId) -> Option<&str> {
        let wallet = &self.sections.get(field.wallet)?.wallet;
        Some(match field.kind {
            FieldKind::Address => &wallet.address,
            FieldKind::PrivateKey => &wallet.private_key,
            FieldKind::Mnemonic => &wallet.mnemonic,
        })
    }

    pub fn fields(&self) -> Vec<FieldId> {
        (0..self.len())
            .flat_map(|wallet| FieldKind::ALL.into_iter().map(move |kind| FieldId { wallet, kind }))
            .collect()
    }

    pub fn preview_caption(&self) -> String {
        format!(
            "Preview (scaled to fit). Actual print size: {}px × {}px",
            self.preview.image.width, self.preview.image.height
        )
    }
}

pub fn section_title(index: usize, satoshis: Option<u64>) -> String {
    match satoshis.filter(|&s| s > 0) {
        Some(sats) => format!("Wallet {} - {} Satoshis", index + 1, format_sats(sats)),
        None => format!("Wallet {}", index + 1),
    }
}

/// Produces one wallet per call. [`generate_wallet`] unless replaced.
pub type WalletSource = Arc<dyn Fn(Network) -> Result<Wallet> + Send + Sync>;

pub struct Session {
    network: Network,
    compositor: Arc<Compositor>,
    source: WalletSource,
    current: RwLock<Option<Arc<Batch>>>,
    queue: Mutex<()>,
}

impl Session {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let compositor = Compositor::from_config(config)?;
        Ok(Self::with_compositor(config.network, compositor))
    }

    pub fn with_compositor(network: Network, compositor: Compositor) -> Self {
        Self {
            network,
            compositor: Arc::new(compositor),
            source: Arc::new(generate_wallet),
            current: RwLock::new(None),
            queue: Mutex::new(()),
        }
    }

    pub fn with_wallet_source(mut self, source: WalletSource) -> Self {
        self.source = source;
        self
    }

    /// Latest successfully generated batch.
    pub fn current(&self) -> Option<Arc<Batch>> {
        self.current.read().clone()
    }

    /// Runs one request to completion. On error the previous batch stays.
    pub async fn generate(&self, request: GenerationRequest) -> Result<Arc<Batch>> {
        let _turn = self.queue.lock().await;

        let compositor = self.compositor.clone();
        let source = self.source.clone();
        let network = self.network;
        let batch = tokio::task::spawn_blocking(move || {
            build_batch(&compositor, &*source, network, request)
        })
        .await
        .map_err(|e| PaperWalletError::internal(format!("Generation task failed: {}", e)))??;

        let batch = Arc::new(batch);
        *self.current.write() = Some(batch.clone());

        tracing::info!(
            "Generated batch {} with {} wallet(s)",
            batch.id,
            batch.len()
        );
        Ok(batch)
    }

    pub fn print_document(&self) -> Result<PrintDocument> {
        let batch = self.current().ok_or(PaperWalletError::NoWallets)?;
        PrintDocument::from_images(&batch.cards())
    }

    pub fn copy_field(
        &self,
        field: FieldId,
        button: &mut CopyButton,
        clipboard: &mut dyn Clipboard,
    ) -> Result<()> {
        let batch = self.current().ok_or(PaperWalletError::NoWallets)?;
        let text = batch
            .field_text(field)
            .ok_or_else(|| PaperWalletError::clipboard(format!("Unknown field {}", field)))?;
        copy_text(text, button, clipboard, Instant::now())
    }
}

fn build_batch(
    compositor: &Compositor,
    source: &(dyn Fn(Network) -> Result<Wallet> + Send + Sync),
    network: Network,
    request: GenerationRequest,
) -> Result<Batch> {
    tracing::info!("Generating {} wallet(s) on {:?}", request.count, network);

    let mut sections = Vec::with_capacity(request.count);
    let mut rendered = Vec::with_capacity(request.count);

    for index in 0..request.count {
        let wallet = source(network)?.with_satoshis(request.satoshis);
        let keys = wallet.keys();

        let address_qr = encode_qr(&wallet.address)?;
        let private_key_qr = encode_qr(&wallet.private_key)?;

        let card = compositor.render_with_codes(&keys, &address_qr, &private_key_qr);
        tracing::debug!("Rendered card {} of {}", index + 1, request.count);

        sections.push(WalletSection {
            title: section_title(index, wallet.satoshis),
            wallet,
            address_qr,
            private_key_qr,
            card: CompositeImage::from_image(card.clone())?,
        });
        rendered.push(card);
    }

    let preview = compositor.preview(&rendered)?;

    Ok(Batch {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        network,
        sections,
        preview,
    })
}
