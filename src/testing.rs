//! In-memory `BalanceSource` used by unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::chain::{BalanceSource, TokenPage, TokenPageRequest};
use crate::config::{ChainInfo, ChainRegistry, ClientConfig};
use crate::error::BalanceError;
use crate::token_api::{NativeRow, TokenRow};

pub const ADDRESS: &str = "0x78697a9cfc48C1e9d1040172d51833EF78083b10";
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub fn chain(key: &str) -> ChainInfo {
    ChainRegistry::load()
        .unwrap()
        .get_chain(key)
        .unwrap()
        .clone()
}

/// Config with every delay zeroed so tests do not wait on the clock
pub fn fast_config() -> ClientConfig {
    let mut config = ClientConfig::new("test-key");
    config.page_delay = Duration::ZERO;
    config.rate_limit_backoff = Duration::ZERO;
    config.chain_delay = Duration::ZERO;
    config
}

/// `n` distinct USD-priced token rows, six decimals each
pub fn token_rows(n: usize) -> Vec<TokenRow> {
    (0..n)
        .map(|i| TokenRow {
            contract: Some(format!("0x{:040x}", i + 1)),
            amount: Some(format!("{}000000", i + 1)),
            value: Some(1.0),
            name: Some(format!("Token {i}")),
            symbol: Some(format!("TK{i}")),
            decimals: Some(6),
            network: None,
        })
        .collect()
}

/// Fixed upstream dataset keyed by chain id, with scripted failures
#[derive(Default)]
pub struct FakeSource {
    native: HashMap<String, Result<Option<NativeRow>, BalanceError>>,
    tokens: HashMap<String, Vec<TokenRow>>,
    page_failures: Mutex<HashMap<(String, u32), VecDeque<BalanceError>>>,
    latency: Duration,
    pub page_requests: Mutex<Vec<(String, u32)>>,
    pub native_requests: Mutex<Vec<(String, Instant)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native(mut self, chain_id: &str, amount: &str) -> Self {
        let row = NativeRow {
            amount: Some(amount.to_string()),
            ..NativeRow::default()
        };
        self.native.insert(chain_id.to_string(), Ok(Some(row)));
        self
    }

    pub fn with_native_error(mut self, chain_id: &str, err: BalanceError) -> Self {
        self.native.insert(chain_id.to_string(), Err(err));
        self
    }

    pub fn with_tokens(mut self, chain_id: &str, rows: Vec<TokenRow>) -> Self {
        self.tokens.insert(chain_id.to_string(), rows);
        self
    }

    /// Fail the given page with `err` once per call to this method
    pub fn fail_page(self, chain_id: &str, page: u32, err: BalanceError) -> Self {
        self.page_failures
            .lock()
            .unwrap()
            .entry((chain_id.to_string(), page))
            .or_default()
            .push_back(err);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn pages_requested(&self, chain_id: &str) -> Vec<u32> {
        self.page_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == chain_id)
            .map(|(_, page)| *page)
            .collect()
    }

    /// When the first native request for `chain_id` arrived
    pub fn native_started_at(&self, chain_id: &str) -> Option<Instant> {
        self.native_requests
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == chain_id)
            .map(|(_, at)| *at)
    }

    pub fn total_requests(&self) -> usize {
        self.page_requests.lock().unwrap().len() + self.native_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl BalanceSource for FakeSource {
    async fn native_balance(
        &self,
        _address: &str,
        chain: &ChainInfo,
    ) -> Result<Option<NativeRow>, BalanceError> {
        self.native_requests
            .lock()
            .unwrap()
            .push((chain.chain_id.clone(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.native
            .get(&chain.chain_id)
            .cloned()
            .unwrap_or(Ok(None))
    }

    async fn token_page(&self, request: TokenPageRequest<'_>) -> Result<TokenPage, BalanceError> {
        let chain_id = request.chain.chain_id.clone();
        self.page_requests
            .lock()
            .unwrap()
            .push((chain_id.clone(), request.page));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let failure = self
            .page_failures
            .lock()
            .unwrap()
            .get_mut(&(chain_id.clone(), request.page))
            .and_then(VecDeque::pop_front);
        if let Some(err) = failure {
            return Err(err);
        }

        let rows = self.tokens.get(&chain_id).cloned().unwrap_or_default();
        if let Some(contract) = request.contract {
            let matching: Vec<TokenRow> =
                rows.into_iter().filter(|r| r.is_contract(contract)).collect();
            return Ok(matching.into());
        }
        let start = (request.page as usize - 1) * request.limit;
        let page: Vec<TokenRow> = rows.into_iter().skip(start).take(request.limit).collect();
        Ok(page.into())
    }
}
