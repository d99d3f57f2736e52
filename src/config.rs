use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::BalanceError;

pub const DEFAULT_BASE_URL: &str = "https://token-api.thegraph.com";
pub const API_KEY_ENV: &str = "THEGRAPH_API_KEY";

/// Upper bound on chains fetched at once, so the shared quota
/// (200 requests/minute) is not burst through.
pub const MAX_CONCURRENT_CHAINS: usize = 3;

/// All supported chains, in the order they are queried
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainRegistry {
    chains: Vec<ChainInfo>,
}

/// Configuration for a single chain
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChainInfo {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "name")]
    pub chain_name: String,
    #[serde(rename = "nativeSymbol")]
    pub native_symbol: String,
    #[serde(rename = "nativeDecimals", default = "default_native_decimals")]
    pub native_decimals: u8,
    /// Network name the Token API expects in its `network` parameter
    #[serde(rename = "network")]
    pub network_slug: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Known ERC-20 contracts, keyed by upper-case symbol
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenInfo>,
}

/// Token information from config
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenInfo {
    pub address: String,
    pub decimals: u8,
}

fn default_native_decimals() -> u8 {
    18
}

impl ChainRegistry {
    /// Load the registry from the embedded JSON
    pub fn load() -> Result<Self, BalanceError> {
        let config_str = include_str!("../config.json");
        Self::from_json(config_str)
    }

    pub fn from_json(json: &str) -> Result<Self, BalanceError> {
        let registry: ChainRegistry = serde_json::from_str(json)
            .map_err(|e| BalanceError::Config(format!("invalid chain registry: {e}")))?;
        if registry.chains.is_empty() {
            return Err(BalanceError::Config("chain registry is empty".into()));
        }
        Ok(registry)
    }

    /// Look up a chain by chain id, network slug, alias or display name.
    pub fn get_chain(&self, key: &str) -> Option<&ChainInfo> {
        let key = key.trim();
        self.chains.iter().find(|chain| chain.matches(key))
    }

    pub fn require_chain(&self, key: &str) -> Result<&ChainInfo, BalanceError> {
        self.get_chain(key)
            .ok_or_else(|| BalanceError::UnknownChain(key.to_string()))
    }

    pub fn chains(&self) -> &[ChainInfo] {
        &self.chains
    }
}

impl ChainInfo {
    fn matches(&self, key: &str) -> bool {
        self.chain_id == key
            || self.network_slug.eq_ignore_ascii_case(key)
            || self.chain_name.eq_ignore_ascii_case(key)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(key))
    }

    /// Resolve a human-readable symbol (e.g. "usdc") to its contract.
    pub fn resolve_token(&self, symbol: &str) -> Result<&TokenInfo, BalanceError> {
        self.tokens
            .get(&symbol.trim().to_ascii_uppercase())
            .ok_or_else(|| BalanceError::TokenNotFound {
                symbol: symbol.trim().to_ascii_uppercase(),
                chain: self.chain_name.clone(),
            })
    }
}

/// Bearer token for the Token API. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Runtime settings for talking to the Token API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; may carry a path prefix such as a proxy mount point
    pub base_url: String,
    pub api_key: ApiKey,
    /// Bound on a single HTTP call
    pub request_timeout: Duration,
    /// Bound on a whole paginated token fetch
    pub fetch_timeout: Duration,
    pub page_limit: usize,
    pub page_delay: Duration,
    pub rate_limit_backoff: Duration,
    pub max_rate_limit_retries: u32,
    pub max_pages: u32,
    pub chain_delay: Duration,
    pub max_concurrent_chains: usize,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: ApiKey::new(api_key),
            request_timeout: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(120),
            page_limit: 10,
            page_delay: Duration::from_millis(200),
            rate_limit_backoff: Duration::from_secs(5),
            max_rate_limit_retries: 3,
            max_pages: 100,
            chain_delay: Duration::from_millis(500),
            max_concurrent_chains: 1,
        }
    }

    /// Build a config from `THEGRAPH_API_KEY`. Only meant for process
    /// entry points; the library itself never reads the environment.
    pub fn from_env() -> Result<Self, BalanceError> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| BalanceError::Config(format!("{API_KEY_ENV} is not set")))?;
        let config = Self::new(key);
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<(), BalanceError> {
        if self.api_key.is_empty() {
            return Err(BalanceError::Config("API key is required".into()));
        }
        if self.page_limit == 0 {
            return Err(BalanceError::Config("page limit must be positive".into()));
        }
        Ok(())
    }

    pub(crate) fn chain_concurrency(&self) -> usize {
        self.max_concurrent_chains.clamp(1, MAX_CONCURRENT_CHAINS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_registry() {
        let registry = ChainRegistry::load().unwrap();
        let ids: Vec<_> = registry
            .chains()
            .iter()
            .map(|c| c.chain_id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "137", "8453"]);
    }

    #[test]
    fn test_lookup_by_id_slug_and_alias() {
        let registry = ChainRegistry::load().unwrap();
        assert_eq!(registry.get_chain("1").unwrap().chain_name, "Ethereum");
        assert_eq!(registry.get_chain("mainnet").unwrap().chain_id, "1");
        assert_eq!(registry.get_chain("Ethereum").unwrap().chain_id, "1");
        assert_eq!(registry.get_chain("POLYGON").unwrap().chain_id, "137");
        assert_eq!(registry.get_chain("8453").unwrap().network_slug, "base");
        assert!(registry.get_chain("solana").is_none());
        assert_eq!(
            registry.require_chain("solana").unwrap_err(),
            BalanceError::UnknownChain("solana".into())
        );
    }

    #[test]
    fn test_ethereum_config() {
        let registry = ChainRegistry::load().unwrap();
        let eth = registry.get_chain("ethereum").unwrap();
        assert_eq!(eth.native_symbol, "ETH");
        assert_eq!(eth.native_decimals, 18);
        assert!(eth.tokens.contains_key("USDC"));
        assert!(eth.tokens.contains_key("DAI"));
    }

    #[test]
    fn test_polygon_config() {
        let registry = ChainRegistry::load().unwrap();
        let polygon = registry.get_chain("matic").unwrap();
        assert_eq!(polygon.native_symbol, "MATIC");
        assert_eq!(polygon.resolve_token("usdc.e").unwrap().decimals, 6);
    }

    #[test]
    fn test_resolve_token() {
        let registry = ChainRegistry::load().unwrap();
        let base = registry.get_chain("base").unwrap();
        let usdc = base.resolve_token(" usdc ").unwrap();
        assert_eq!(usdc.address, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
        assert_eq!(usdc.decimals, 6);

        let err = base.resolve_token("NOTAREALTOKEN").unwrap_err();
        assert_eq!(
            err,
            BalanceError::TokenNotFound {
                symbol: "NOTAREALTOKEN".into(),
                chain: "Base".into()
            }
        );
    }

    #[test]
    fn test_registry_rejects_empty() {
        assert!(matches!(
            ChainRegistry::from_json(r#"{"chains": []}"#),
            Err(BalanceError::Config(_))
        ));
        assert!(ChainRegistry::from_json("not json").is_err());
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("  secret  ");
        assert_eq!(config.api_key.expose(), "secret");
        assert_eq!(config.page_limit, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn test_empty_key_is_config_error() {
        let config = ClientConfig::new("   ");
        assert!(matches!(config.validate(), Err(BalanceError::Config(_))));
    }

    #[test]
    fn test_chain_concurrency_is_capped() {
        let mut config = ClientConfig::new("k");
        config.max_concurrent_chains = 0;
        assert_eq!(config.chain_concurrency(), 1);
        config.max_concurrent_chains = 10;
        assert_eq!(config.chain_concurrency(), MAX_CONCURRENT_CHAINS);
    }
}
