use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::config::ChainInfo;
use crate::error::BalanceError;
use crate::format::{format_amount, usd_value};

/// Kind of balance a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "native")]
    Native,
    #[serde(rename = "ERC20")]
    Erc20,
}

/// Native coin balance of one address on one chain.
///
/// When `error` is set the balance fields are zero and carry no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeBalanceResult {
    pub token_type: TokenType,
    pub chain_id: String,
    pub chain_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    pub balance: String,
    pub balance_raw: String,
    pub error: Option<String>,
}

impl NativeBalanceResult {
    pub fn new(chain: &ChainInfo, balance_raw: String) -> Self {
        let balance = format_amount(&balance_raw, chain.native_decimals);
        Self {
            token_type: TokenType::Native,
            chain_id: chain.chain_id.clone(),
            chain_name: chain.chain_name.clone(),
            token_symbol: chain.native_symbol.clone(),
            decimals: chain.native_decimals,
            balance,
            balance_raw,
            error: None,
        }
    }

    pub fn zero(chain: &ChainInfo) -> Self {
        Self::new(chain, "0".to_string())
    }

    pub fn failed(chain: &ChainInfo, error: &BalanceError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::zero(chain)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// ERC-20 balance of one address for one token contract.
///
/// `error` is set only for single-token lookups that failed; entries inside
/// a token list are always successful rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalanceEntry {
    pub token_type: TokenType,
    pub contract_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    pub amount_raw: String,
    /// Human-readable amount, `amount_raw / 10^decimals`
    pub balance: String,
    pub price_usd: f64,
    pub chain_id: String,
    pub chain_name: String,
    pub error: Option<String>,
}

impl TokenBalanceEntry {
    pub fn new(
        chain: &ChainInfo,
        contract_address: String,
        token_name: String,
        token_symbol: String,
        decimals: u8,
        amount_raw: String,
        price_usd: f64,
    ) -> Self {
        let balance = format_amount(&amount_raw, decimals);
        Self {
            token_type: TokenType::Erc20,
            contract_address,
            token_name,
            token_symbol,
            decimals,
            amount_raw,
            balance,
            price_usd,
            chain_id: chain.chain_id.clone(),
            chain_name: chain.chain_name.clone(),
            error: None,
        }
    }

    /// Error row with the same shape as a successful one
    pub fn failed(chain: &ChainInfo, symbol: &str, error: &BalanceError) -> Self {
        Self {
            token_type: TokenType::Erc20,
            contract_address: String::new(),
            token_name: String::new(),
            token_symbol: symbol.trim().to_ascii_uppercase(),
            decimals: 0,
            amount_raw: "0".to_string(),
            balance: "0".to_string(),
            price_usd: 0.0,
            chain_id: chain.chain_id.clone(),
            chain_name: chain.chain_name.clone(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn usd_value(&self) -> f64 {
        if self.is_ok() {
            usd_value(&self.balance, self.price_usd)
        } else {
            0.0
        }
    }
}

/// All token entries collected for one address on one chain.
///
/// A set `error` means collection stopped early; `tokens` then holds what
/// was gathered before the failure. `truncated` marks a walk that hit the
/// page cap or the fetch deadline rather than a failing request, so the
/// collected entries are valid but incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenListResult {
    pub tokens: Vec<TokenBalanceEntry>,
    pub error: Option<String>,
    #[serde(default)]
    pub truncated: bool,
}

impl TokenListResult {
    pub fn complete(tokens: Vec<TokenBalanceEntry>) -> Self {
        Self {
            tokens,
            error: None,
            truncated: false,
        }
    }

    pub fn partial(tokens: Vec<TokenBalanceEntry>, error: &BalanceError) -> Self {
        Self {
            tokens,
            error: Some(error.to_string()),
            truncated: false,
        }
    }

    pub fn truncated(tokens: Vec<TokenBalanceEntry>, error: &BalanceError) -> Self {
        Self {
            tokens,
            error: Some(error.to_string()),
            truncated: true,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A chain that failed or returned incomplete results, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainWarning {
    pub chain_id: String,
    pub chain_name: String,
    pub message: String,
}

/// Balances for one address across every queried chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiChainResult {
    pub tokens: Vec<TokenBalanceEntry>,
    pub native_balances: Vec<NativeBalanceResult>,
    pub warnings: Vec<ChainWarning>,
}

impl MultiChainResult {
    pub fn total_usd_value(&self) -> f64 {
        self.tokens.iter().map(TokenBalanceEntry::usd_value).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Check that `address` is a 0x-prefixed, 40 hex digit EVM address.
pub fn validate_address(address: &str) -> Result<Address, BalanceError> {
    let invalid = || BalanceError::InvalidAddress(address.to_string());
    let hex = address.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    address.parse::<Address>().map_err(|_| invalid())
}
