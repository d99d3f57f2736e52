use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::chain::{BalanceSource, TokenPage, TokenPageRequest};
use crate::config::{ChainInfo, ClientConfig};
use crate::error::BalanceError;
use crate::format::parse_raw_amount;
use crate::types::TokenBalanceEntry;

pub const NATIVE_BALANCES_PATH: &str = "/v1/evm/balances/native";
pub const TOKEN_BALANCES_PATH: &str = "/v1/evm/balances";

const MAX_ERROR_BODY: usize = 512;

/// Token API provider using plain HTTPS + bearer auth
#[derive(Debug, Clone)]
pub struct TokenApiProvider {
    client: Client,
    base: Url,
    native_page_limit: usize,
}

impl TokenApiProvider {
    /// Fails with [`BalanceError::Config`] when the key is missing, before
    /// any request is built.
    pub fn new(config: &ClientConfig) -> Result<Self, BalanceError> {
        config.validate()?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose()))
            .map_err(|_| BalanceError::Config("API key is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BalanceError::Config(format!("build http client: {e}")))?;
        let mut base = Url::parse(&config.base_url).map_err(|e| {
            BalanceError::Config(format!("invalid base url {}: {e}", config.base_url))
        })?;
        // Endpoints are joined relative to the base so a path prefix survives
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client,
            base,
            native_page_limit: config.page_limit,
        })
    }

    /// GET `path` below the base URL and decode its `data` rows, returning
    /// them together with the number of elements received.
    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(Vec<T>, usize), BalanceError> {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| BalanceError::Config(format!("invalid endpoint {path}: {e}")))?;

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(status, &body)?;
        Ok(parse_data(&body))
    }
}

#[async_trait]
impl BalanceSource for TokenApiProvider {
    async fn native_balance(
        &self,
        address: &str,
        chain: &ChainInfo,
    ) -> Result<Option<NativeRow>, BalanceError> {
        tracing::debug!(
            target: "balances",
            network = %chain.network_slug,
            %address,
            "fetching native balance"
        );
        let query = [
            ("network", chain.network_slug.clone()),
            ("address", address.to_string()),
            ("include_null_balances", "false".to_string()),
            ("limit", self.native_page_limit.to_string()),
            ("page", "1".to_string()),
        ];
        let (rows, _): (Vec<NativeRow>, _) = self.get_data(NATIVE_BALANCES_PATH, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn token_page(&self, request: TokenPageRequest<'_>) -> Result<TokenPage, BalanceError> {
        tracing::debug!(
            target: "balances",
            network = %request.chain.network_slug,
            page = request.page,
            contract = ?request.contract,
            "fetching token page"
        );
        let mut query = vec![
            ("network", request.chain.network_slug.clone()),
            ("address", request.address.to_string()),
            ("limit", request.limit.to_string()),
            ("page", request.page.to_string()),
            ("include_null_balances", request.include_null_balances.to_string()),
        ];
        if let Some(contract) = request.contract {
            query.push(("contract", contract.to_string()));
        }
        let (rows, received) = self.get_data(TOKEN_BALANCES_PATH, &query).await?;
        Ok(TokenPage { rows, received })
    }
}

/// Map an HTTP status onto the error taxonomy.
pub fn check_status(status: StatusCode, body: &str) -> Result<(), BalanceError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BalanceError::Unauthorized {
            status: status.as_u16(),
        }),
        StatusCode::TOO_MANY_REQUESTS => Err(BalanceError::RateLimited),
        _ => Err(BalanceError::Http {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        }),
    }
}

#[derive(Deserialize)]
struct DataEnvelope {
    data: Option<Vec<Value>>,
}

/// Pull the `data` array out of a response body and decode each element.
/// Anything that does not look like `{ "data": [...] }` counts as no data;
/// elements that fail to decode are skipped but still counted.
fn parse_data<T: DeserializeOwned>(body: &str) -> (Vec<T>, usize) {
    let items = match serde_json::from_str::<DataEnvelope>(body) {
        Ok(envelope) => envelope.data.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(
                target: "balances",
                %err,
                "unexpected response shape, treating as empty"
            );
            return (Vec::new(), 0);
        }
    };

    let received = items.len();
    let rows = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(row) => Some(row),
            Err(err) => {
                tracing::warn!(target: "balances", %err, "skipping malformed row");
                None
            }
        })
        .collect();
    (rows, received)
}

/// Native balance row as returned by `/balances/native`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NativeRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    /// Older responses carry the amount here instead
    #[serde(default, deserialize_with = "lenient_string")]
    pub balance: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub network: Option<String>,
}

impl NativeRow {
    /// Smallest-unit balance, preferring `amount` over `balance`.
    pub fn raw_amount(&self) -> String {
        let raw = self
            .amount
            .as_deref()
            .filter(|a| !a.is_empty())
            .or(self.balance.as_deref());
        normalize_amount(raw)
    }
}

/// ERC-20 row as returned by `/balances`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub contract: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_u8")]
    pub decimals: Option<u8>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub network: Option<String>,
}

impl TokenRow {
    pub fn into_entry(self, chain: &ChainInfo) -> TokenBalanceEntry {
        let amount_raw = normalize_amount(self.amount.as_deref());
        TokenBalanceEntry::new(
            chain,
            self.contract.unwrap_or_default(),
            self.name.unwrap_or_else(|| "Unknown".to_string()),
            self.symbol.unwrap_or_else(|| "UNKNOWN".to_string()),
            self.decimals.unwrap_or(18),
            amount_raw,
            self.value.unwrap_or(0.0),
        )
    }

    pub fn is_contract(&self, contract: &str) -> bool {
        self.contract
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(contract))
    }
}

fn normalize_amount(raw: Option<&str>) -> String {
    match raw {
        None => "0".to_string(),
        Some(raw) => match parse_raw_amount(raw) {
            Some(amount) => amount.to_string(),
            None => {
                tracing::warn!(
                    target: "balances",
                    amount = raw,
                    "unparseable amount, treating as zero"
                );
                "0".to_string()
            }
        },
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

fn lenient_u8<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
