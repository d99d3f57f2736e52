mod chain;
mod client;
mod config;
mod error;
pub mod format;
mod multichain;
mod paginate;
mod token_api;
mod types;

#[cfg(test)]
mod testing;

pub use chain::{BalanceSource, TokenPage, TokenPageRequest};
pub use client::BalanceClient;
pub use config::{
    ApiKey, ChainInfo, ChainRegistry, ClientConfig, TokenInfo, API_KEY_ENV, DEFAULT_BASE_URL,
};
pub use error::BalanceError;
pub use paginate::collect_token_balances;
pub use token_api::{NativeRow, TokenApiProvider, TokenRow};
pub use types::{
    validate_address, ChainWarning, MultiChainResult, NativeBalanceResult, TokenBalanceEntry,
    TokenListResult, TokenType,
};

/// Get native and token balances for an address on one chain
pub async fn get_balances(
    config: &ClientConfig,
    chain_name: &str,
    address: &str,
) -> Result<MultiChainResult, BalanceError> {
    let client = BalanceClient::new(config.clone())?;
    let registry = ChainRegistry::load()?;
    let chain = registry.require_chain(chain_name)?;
    client
        .get_multi_chain_balances(address, std::slice::from_ref(chain))
        .await
}

/// Get native and token balances for an address on every supported chain
pub async fn get_all_chain_balances(
    config: &ClientConfig,
    address: &str,
) -> Result<MultiChainResult, BalanceError> {
    let client = BalanceClient::new(config.clone())?;
    let registry = ChainRegistry::load()?;
    client.get_multi_chain_balances(address, registry.chains()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_config, ADDRESS};
    use serde_json::json;
    use tokio_test::assert_err;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = ClientConfig::new("").with_base_url(server.uri());
        let err = assert_err!(get_all_chain_balances(&config, ADDRESS).await);
        assert!(matches!(err, BalanceError::Config(_)), "got {err:?}");
        let err = assert_err!(get_balances(&config, "ethereum", "bogus").await);
        assert!(matches!(err, BalanceError::Config(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unknown_chain() {
        let err = assert_err!(get_balances(&fast_config(), "solana", ADDRESS).await);
        assert_eq!(err, BalanceError::UnknownChain("solana".into()));
    }

    #[tokio::test]
    async fn test_get_all_chain_balances_over_http() {
        let server = MockServer::start().await;
        for (network, amount) in [("mainnet", "3000000000000000000"), ("base", "0")] {
            Mock::given(method("GET"))
                .and(path("/v1/evm/balances/native"))
                .and(query_param("network", network))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": [{"address": ADDRESS, "amount": amount, "network": network}]
                })))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/v1/evm/balances/native"))
            .and(query_param("network", "polygon"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/evm/balances"))
            .and(query_param("network", "mainnet"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "contract": "0x6b175474e89094c44da98b954eedeac495271d0f",
                    "amount": "250000000000000000000",
                    "value": 1.0,
                    "name": "Dai Stablecoin",
                    "symbol": "DAI",
                    "decimals": 18,
                    "network": "mainnet"
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/evm/balances"))
            .and(query_param("network", "base"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let config = fast_config().with_base_url(server.uri());
        let result = get_all_chain_balances(&config, ADDRESS).await.unwrap();

        let natives: Vec<_> = result
            .native_balances
            .iter()
            .map(|n| (n.chain_id.as_str(), n.balance.as_str()))
            .collect();
        assert_eq!(natives, vec![("1", "3"), ("8453", "0")]);
        assert_eq!(result.tokens.len(), 1);
        assert_eq!(result.tokens[0].balance, "250");
        assert_eq!(result.total_usd_value(), 250.0);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].chain_name, "Polygon");
        assert_eq!(
            result.warnings[0].message,
            "native balance: http error 502: bad gateway"
        );
    }

    #[tokio::test]
    #[ignore] // Requires network access and THEGRAPH_API_KEY
    async fn test_live_vitalik_balances() {
        let config = ClientConfig::from_env().unwrap();
        let result =
            get_balances(&config, "ethereum", "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
                .await
                .unwrap();

        assert_eq!(result.native_balances.len(), 1);
        assert_eq!(result.native_balances[0].token_symbol, "ETH");
    }
}
