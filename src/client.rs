use std::collections::HashSet;

use crate::chain::{BalanceSource, TokenPageRequest};
use crate::config::{ChainInfo, ClientConfig};
use crate::error::BalanceError;
use crate::paginate::collect_token_balances;
use crate::token_api::TokenApiProvider;
use crate::types::{validate_address, NativeBalanceResult, TokenBalanceEntry, TokenListResult};

/// Balance queries against one upstream source.
///
/// Every operation returns a record; failures end up in its `error` field
/// together with the chain it was about.
#[derive(Debug)]
pub struct BalanceClient<S = TokenApiProvider> {
    source: S,
    config: ClientConfig,
}

impl BalanceClient<TokenApiProvider> {
    /// Client for the hosted Token API. Fails without an API key.
    pub fn new(config: ClientConfig) -> Result<Self, BalanceError> {
        let source = TokenApiProvider::new(&config)?;
        Ok(Self { source, config })
    }
}

impl<S: BalanceSource> BalanceClient<S> {
    pub fn with_source(source: S, config: ClientConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Native balance of `address` on `chain`. An empty upstream answer is a
    /// zero balance.
    pub async fn get_native_balance(
        &self,
        address: &str,
        chain: &ChainInfo,
    ) -> NativeBalanceResult {
        if let Err(err) = validate_address(address) {
            return NativeBalanceResult::failed(chain, &err);
        }

        match self.source.native_balance(address, chain).await {
            Ok(Some(row)) => NativeBalanceResult::new(chain, row.raw_amount()),
            Ok(None) => NativeBalanceResult::zero(chain),
            Err(err) => {
                tracing::warn!(
                    target: "balances",
                    chain = %chain.chain_name,
                    %err,
                    "native balance failed"
                );
                NativeBalanceResult::failed(chain, &err)
            }
        }
    }

    /// Balance of one token, looked up by symbol in the chain's token table.
    pub async fn get_token_balance(
        &self,
        address: &str,
        chain: &ChainInfo,
        symbol: &str,
    ) -> TokenBalanceEntry {
        if let Err(err) = validate_address(address) {
            return TokenBalanceEntry::failed(chain, symbol, &err);
        }
        let token = match chain.resolve_token(symbol) {
            Ok(token) => token,
            Err(err) => return TokenBalanceEntry::failed(chain, symbol, &err),
        };

        let request = TokenPageRequest::new(address, chain, 1, self.config.page_limit)
            .for_contract(&token.address);
        match self.source.token_page(request).await {
            Ok(page) => page
                .rows
                .into_iter()
                .find(|row| row.is_contract(&token.address))
                .map(|row| row.into_entry(chain))
                .unwrap_or_else(|| {
                    let err = BalanceError::NoBalance {
                        symbol: symbol.trim().to_ascii_uppercase(),
                        chain: chain.chain_name.clone(),
                    };
                    TokenBalanceEntry::failed(chain, symbol, &err)
                }),
            Err(err) => {
                tracing::warn!(
                    target: "balances",
                    chain = %chain.chain_name,
                    symbol,
                    %err,
                    "token balance failed"
                );
                TokenBalanceEntry::failed(chain, symbol, &err)
            }
        }
    }

    /// Every token held by `address` on `chain`, optionally narrowed to
    /// `symbols` (case-insensitive) after collection.
    pub async fn get_all_token_balances(
        &self,
        address: &str,
        chain: &ChainInfo,
        symbols: Option<&[String]>,
    ) -> TokenListResult {
        if let Err(err) = validate_address(address) {
            return TokenListResult::partial(Vec::new(), &err);
        }

        let mut result = collect_token_balances(&self.source, &self.config, address, chain).await;
        if let Some(symbols) = symbols {
            let wanted: HashSet<String> = symbols
                .iter()
                .map(|s| s.trim().to_ascii_uppercase())
                .collect();
            result
                .tokens
                .retain(|t| wanted.contains(&t.token_symbol.to_ascii_uppercase()));
        }
        result
    }
}
