pub mod generate;
pub mod inline;

pub use generate::{handle_generate_command, GenerateArgs};
pub use inline::{handle_inline_command, InlineArgs};

use bitcoin::Network;
use paperwallet_core::{PaperWalletError, Result};

pub fn parse_network(network: &str) -> Result<Network> {
    match network.to_lowercase().as_str() {
        "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
        "testnet" => Ok(Network::Testnet),
        "signet" => Ok(Network::Signet),
        "regtest" => Ok(Network::Regtest),
        _ => Err(PaperWalletError::config(format!(
            "Invalid network: {}. Supported networks: bitcoin, testnet, signet, regtest",
            network
        ))),
    }
}
