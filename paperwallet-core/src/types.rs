use serde::{Deserialize, Serialize};

/// A freshly generated paper wallet. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub private_key: String, // WIF
    pub mnemonic: String,
    pub satoshis: Option<u64>,
}

impl Wallet {
    pub fn with_satoshis(self, satoshis: Option<u64>) -> Self {
        Self { satoshis, ..self }
    }

    /// The subset drawn on the card. The mnemonic never goes on the card.
    pub fn keys(&self) -> WalletKeys {
        WalletKeys {
            address: self.address.clone(),
            private_key: self.private_key.clone(),
            satoshis: self.satoshis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletKeys {
    pub address: String,
    pub private_key: String,
    pub satoshis: Option<u64>,
}

impl WalletKeys {
    /// Denomination labels are only drawn for a positive amount.
    pub fn denomination(&self) -> Option<u64> {
        self.satoshis.filter(|&sats| sats > 0)
    }
}

/// Formats an amount with `,` thousands separators, e.g. `21,000,000`.
pub fn format_sats(sats: u64) -> String {
    let digits = sats.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
