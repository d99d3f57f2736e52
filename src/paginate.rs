//! Page-by-page collection of an address's token balances.
//!
//! The Token API caps pages at a fixed size and has no cursor or "has more"
//! flag, so the only end-of-data signal is a page shorter than the limit.
//! A completely full last page therefore costs one extra (empty) request.

use tokio::time::{sleep, timeout_at, Instant};

use crate::chain::{BalanceSource, TokenPageRequest};
use crate::config::{ChainInfo, ClientConfig};
use crate::error::BalanceError;
use crate::types::{TokenBalanceEntry, TokenListResult};

/// Collect every token entry for `address` on `chain`.
///
/// Pages are requested strictly in order. A rate-limited page is retried in
/// place after `rate_limit_backoff`, at most `max_rate_limit_retries` times.
/// Any other failure, the page cap or the `fetch_timeout` deadline end the
/// walk and return what was collected so far with the error attached; the
/// latter two also mark the result as truncated.
pub async fn collect_token_balances<S>(
    source: &S,
    config: &ClientConfig,
    address: &str,
    chain: &ChainInfo,
) -> TokenListResult
where
    S: BalanceSource + ?Sized,
{
    let deadline = Instant::now() + config.fetch_timeout;
    let mut collected: Vec<TokenBalanceEntry> = Vec::new();
    let mut page: u32 = 1;
    let mut retries: u32 = 0;

    loop {
        if page > config.max_pages {
            tracing::warn!(
                target: "balances",
                network = %chain.network_slug,
                max_pages = config.max_pages,
                "page limit reached"
            );
            let err = BalanceError::PageLimit(config.max_pages);
            return TokenListResult::truncated(collected, &err);
        }

        let request = TokenPageRequest::new(address, chain, page, config.page_limit);
        let outcome = match timeout_at(deadline, source.token_page(request)).await {
            Ok(outcome) => outcome,
            Err(_) => return timed_out(collected, config, chain),
        };

        match outcome {
            Ok(fetched) => {
                collected.extend(fetched.rows.into_iter().map(|row| row.into_entry(chain)));
                if fetched.received < config.page_limit {
                    return TokenListResult::complete(collected);
                }
                page += 1;
                retries = 0;
                if !wait(config.page_delay, deadline).await {
                    return timed_out(collected, config, chain);
                }
            }
            Err(err) if err.is_rate_limited() && retries < config.max_rate_limit_retries => {
                retries += 1;
                tracing::warn!(
                    target: "balances",
                    network = %chain.network_slug,
                    page,
                    attempt = retries,
                    backoff_ms = config.rate_limit_backoff.as_millis() as u64,
                    "rate limited, backing off"
                );
                if !wait(config.rate_limit_backoff, deadline).await {
                    return timed_out(collected, config, chain);
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "balances",
                    network = %chain.network_slug,
                    page,
                    collected = collected.len(),
                    %err,
                    "token pagination stopped"
                );
                return TokenListResult::partial(collected, &err);
            }
        }
    }
}

/// Sleep for `delay` unless that would cross the deadline.
async fn wait(delay: std::time::Duration, deadline: Instant) -> bool {
    if delay.is_zero() {
        return true;
    }
    timeout_at(deadline, sleep(delay)).await.is_ok()
}

fn timed_out(
    collected: Vec<TokenBalanceEntry>,
    config: &ClientConfig,
    chain: &ChainInfo,
) -> TokenListResult {
    let err = BalanceError::Timeout(format!(
        "token balances on {} not complete after {}s",
        chain.chain_name,
        config.fetch_timeout.as_secs()
    ));
    TokenListResult::truncated(collected, &err)
}
