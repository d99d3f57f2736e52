use thiserror::Error;

/// Everything that can go wrong while fetching balances.
///
/// Values are cheap to clone so they can be copied into result records and
/// chain warnings without holding on to transport handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unsupported network: {0}")]
    UnknownChain(String),

    #[error("token not found: {symbol} on {chain}")]
    TokenNotFound { symbol: String, chain: String },

    #[error("no balance reported: {symbol} on {chain}")]
    NoBalance { symbol: String, chain: String },

    #[error("reached maximum page limit ({0}); more tokens may exist")]
    PageLimit(u32),

    #[error("authentication failed")]
    Unauthorized { status: u16 },

    #[error("rate limited")]
    RateLimited,

    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl BalanceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl From<reqwest::Error> for BalanceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
