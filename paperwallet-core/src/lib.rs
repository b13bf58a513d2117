//! Paper wallet core - BIP39/BIP84 key generation and printable wallet cards
//!
//! Generates native SegWit wallets from fresh 12-word mnemonics, renders them
//! onto a wallet template with scannable QR codes, and produces the print
//! page. The `inline` module folds a web build into one offline HTML file.

pub mod compose;
pub mod error;
pub mod inline;
pub mod print;
pub mod qr;
pub mod session;
pub mod types;
pub mod wallet;

pub use compose::{CompositeImage, Compositor, MultiWalletComposite, Template};
pub use error::{PaperWalletError, Result};
pub use inline::{inline_bundle, Bundler, InlineOutcome, InlineReport};
pub use print::PrintDocument;
pub use session::{Batch, FieldId, FieldKind, GenerationRequest, Session};
pub use types::{Wallet, WalletKeys};
pub use wallet::{derive_wallet, generate_wallet, CompositionConfig, GeneratorConfig};

pub use ::bitcoin::Network;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_and_print() {
        let session = Session::new(&GeneratorConfig::new(Network::Regtest)).unwrap();

        let request = GenerationRequest::from_inputs("2", "100000").unwrap();
        let batch = session.generate(request).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.wallets().all(|w| w.address.starts_with("bcrt1q")));
        assert_eq!(batch.sections[0].title, "Wallet 1 - 100,000 Satoshis");

        let html = session.print_document().unwrap().to_html();
        assert_eq!(html.matches("<img ").count(), 2);
    }
}
