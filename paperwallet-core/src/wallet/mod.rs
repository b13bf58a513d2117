pub mod config;

pub use config::{CompositionConfig, GeneratorConfig};

use crate::error::{PaperWalletError, Result};
use crate::types::Wallet;
use bip39::rand::rngs::OsRng;
use bip39::{Language, Mnemonic};
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::key::{CompressedPublicKey, Keypair};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Network, PrivateKey};
use std::str::FromStr;

/// First native-segwit receiving address of the first account.
pub const DERIVATION_PATH: &str = "m/84'/0'/0'/0/0";

pub const MNEMONIC_WORDS: usize = 12;

pub fn generate_mnemonic() -> Result<String> {
    let mnemonic = Mnemonic::generate_in_with(&mut OsRng, Language::English, MNEMONIC_WORDS)
        .map_err(|e| PaperWalletError::derivation(format!("Failed to generate mnemonic: {}", e)))?;
    Ok(mnemonic.to_string())
}

/// Derives the card contents for `mnemonic`. Deterministic: the same phrase
/// always yields the same address and WIF.
pub fn derive_wallet(mnemonic: &str, network: Network) -> Result<Wallet> {
    let parsed = Mnemonic::parse_in(Language::English, mnemonic)
        .map_err(|e| PaperWalletError::derivation(format!("Invalid mnemonic: {}", e)))?;

    let seed = parsed.to_seed("");
    if seed.iter().all(|&b| b == 0) {
        return Err(PaperWalletError::derivation(
            "Failed to generate seed from mnemonic",
        ));
    }

    let secp = Secp256k1::new();

    let root = Xpriv::new_master(network, &seed).map_err(|e| {
        PaperWalletError::derivation(format!("Failed to generate HD wallet root: {}", e))
    })?;

    let path = DerivationPath::from_str(DERIVATION_PATH)
        .map_err(|e| PaperWalletError::config(format!("Invalid derivation path: {}", e)))?;

    let child = root
        .derive_priv(&secp, &path)
        .map_err(|e| PaperWalletError::derivation(format!("Failed to derive wallet path: {}", e)))?;

    let keypair = Keypair::from_secret_key(&secp, &child.private_key);

    let wpkh = CompressedPublicKey(keypair.public_key());
    let address = Address::p2wpkh(&wpkh, network).to_string();
    if address.is_empty() {
        return Err(PaperWalletError::derivation(format!(
            "Failed to generate Bitcoin address for {:?}",
            network
        )));
    }

    let private_key = PrivateKey::new(keypair.secret_key(), network).to_wif();
    if private_key.is_empty() {
        return Err(PaperWalletError::derivation(
            "Failed to convert private key to WIF",
        ));
    }

    Ok(Wallet {
        address,
        private_key,
        mnemonic: parsed.to_string(),
        satoshis: None,
    })
}

/// Fresh mnemonic from the OS random source, then [`derive_wallet`].
pub fn generate_wallet(network: Network) -> Result<Wallet> {
    let mnemonic = generate_mnemonic()?;
    let wallet = derive_wallet(&mnemonic, network)?;
    tracing::debug!("Derived wallet {} on {:?}", wallet.address, network);
    Ok(wallet)
}
