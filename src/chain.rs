use async_trait::async_trait;

use crate::config::ChainInfo;
use crate::error::BalanceError;
use crate::token_api::{NativeRow, TokenRow};

/// One page of the token-balance listing
#[derive(Debug, Clone, Copy)]
pub struct TokenPageRequest<'a> {
    pub address: &'a str,
    pub chain: &'a ChainInfo,
    /// 1-based page number
    pub page: u32,
    pub limit: usize,
    /// Restrict the listing to a single contract
    pub contract: Option<&'a str>,
    pub include_null_balances: bool,
}

impl<'a> TokenPageRequest<'a> {
    pub fn new(address: &'a str, chain: &'a ChainInfo, page: u32, limit: usize) -> Self {
        Self {
            address,
            chain,
            page,
            limit,
            contract: None,
            include_null_balances: false,
        }
    }

    pub fn for_contract(mut self, contract: &'a str) -> Self {
        self.contract = Some(contract);
        self.include_null_balances = true;
        self
    }
}

/// Rows decoded from one page of the token listing.
///
/// `received` counts every element the upstream sent, including rows that
/// could not be decoded, and decides whether the page was short.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenPage {
    pub rows: Vec<TokenRow>,
    pub received: usize,
}

impl From<Vec<TokenRow>> for TokenPage {
    fn from(rows: Vec<TokenRow>) -> Self {
        Self {
            received: rows.len(),
            rows,
        }
    }
}

/// Upstream balance data source. `TokenApiProvider` talks HTTP; tests plug
/// in fixed datasets.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch the native balance row for an address. `Ok(None)` means the
    /// upstream returned no row, which callers treat as a zero balance.
    async fn native_balance(
        &self,
        address: &str,
        chain: &ChainInfo,
    ) -> Result<Option<NativeRow>, BalanceError>;

    /// Fetch one page of ERC-20 rows
    async fn token_page(&self, request: TokenPageRequest<'_>) -> Result<TokenPage, BalanceError>;
}
