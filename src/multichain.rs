//! Best-effort balance collection across several chains.

use futures::stream::{self, StreamExt};
use tokio::time::{sleep, sleep_until, Instant};

use crate::chain::BalanceSource;
use crate::client::BalanceClient;
use crate::config::ChainInfo;
use crate::error::BalanceError;
use crate::types::{
    validate_address, ChainWarning, MultiChainResult, NativeBalanceResult, TokenBalanceEntry,
};

/// What one chain contributes to the aggregate
#[derive(Default)]
struct ChainOutcome {
    native: Option<NativeBalanceResult>,
    tokens: Vec<TokenBalanceEntry>,
    warning: Option<ChainWarning>,
}

impl ChainOutcome {
    fn failed(warning: ChainWarning) -> Self {
        Self {
            warning: Some(warning),
            ..Self::default()
        }
    }
}

impl<S: BalanceSource> BalanceClient<S> {
    /// Native and token balances of `address` on every chain in `chains`.
    ///
    /// A failing chain is left out of the balances and reported in
    /// `warnings`; the others are unaffected. A chain whose token listing
    /// was cut short by the page cap or the fetch deadline keeps what was
    /// collected and is reported in `warnings` as well. Output keeps the
    /// order of `chains` regardless of concurrency.
    ///
    /// Chains run one after another with `chain_delay` between them. With
    /// more than one chain in flight, starts are staggered by `chain_delay`
    /// instead.
    pub async fn get_multi_chain_balances(
        &self,
        address: &str,
        chains: &[ChainInfo],
    ) -> Result<MultiChainResult, BalanceError> {
        validate_address(address)?;

        let chain_delay = self.config().chain_delay;
        let concurrency = self.config().chain_concurrency();
        let first_start = Instant::now();
        let outcomes: Vec<ChainOutcome> = stream::iter(chains.iter().enumerate())
            .map(|(index, chain)| async move {
                if index > 0 && !chain_delay.is_zero() {
                    if concurrency > 1 {
                        sleep_until(first_start + chain_delay * index as u32).await;
                    } else {
                        sleep(chain_delay).await;
                    }
                }
                self.fetch_chain(address, chain).await
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut result = MultiChainResult::default();
        for outcome in outcomes {
            result.native_balances.extend(outcome.native);
            result.tokens.extend(outcome.tokens);
            result.warnings.extend(outcome.warning);
        }
        Ok(result)
    }

    async fn fetch_chain(&self, address: &str, chain: &ChainInfo) -> ChainOutcome {
        let native = self.get_native_balance(address, chain).await;
        if let Some(err) = &native.error {
            return ChainOutcome::failed(chain_warning(chain, format!("native balance: {err}")));
        }

        let tokens = self.get_all_token_balances(address, chain, None).await;
        let warning = match &tokens.error {
            None => None,
            Some(err) if tokens.truncated => Some(chain_warning(
                chain,
                format!(
                    "token balances incomplete: {err} ({} returned)",
                    tokens.tokens.len()
                ),
            )),
            Some(err) => {
                return ChainOutcome::failed(chain_warning(
                    chain,
                    format!(
                        "token balances: {err} ({} fetched before failure)",
                        tokens.tokens.len()
                    ),
                ));
            }
        };

        tracing::debug!(
            target: "balances",
            chain = %chain.chain_name,
            tokens = tokens.tokens.len(),
            "chain complete"
        );
        ChainOutcome {
            native: Some(native),
            tokens: tokens.tokens,
            warning,
        }
    }
}

fn chain_warning(chain: &ChainInfo, message: String) -> ChainWarning {
    tracing::warn!(target: "balances", chain = %chain.chain_name, %message, "skipping chain");
    ChainWarning {
        chain_id: chain.chain_id.clone(),
        chain_name: chain.chain_name.clone(),
        message,
    }
}
