//! Metric specifications
//!
//! A [`MetricSpec`] describes everything needed to read one metric: the
//! endpoint, its query parameters and the [`Extractor`] that turns the decoded
//! body into a number. Upstream schemas differ only in their extractor; the
//! fetcher itself never branches on the endpoint.

use crate::error::FetchError;
use crate::types::Unit;
use serde::Deserialize;
use serde_json::Value;

/// Caller-supplied parse step
pub type ParseFn = fn(&Value) -> Result<f64, FetchError>;

/// How a numeric value is pulled out of a response body
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Number (or numeric string) at a JSON pointer, e.g. `/price`
    Field(String),
    /// `data.trades[]`: price of the record with the highest timestamp
    LatestTrade,
    /// `data.tickers[0].amount`
    FirstTickerAmount,
    /// Arbitrary parse function
    Custom(ParseFn),
}

impl Extractor {
    /// Extract the value from a decoded body
    pub fn extract(&self, body: &Value) -> Result<f64, FetchError> {
        match self {
            Extractor::Field(pointer) => {
                let field = body
                    .pointer(pointer)
                    .ok_or_else(|| FetchError::MissingField(pointer.clone()))?;
                Numeric::from_value(field, pointer)
            }
            Extractor::LatestTrade => latest_trade_price(body),
            Extractor::FirstTickerAmount => first_ticker_amount(body),
            Extractor::Custom(parse) => parse(body),
        }
    }
}

/// Number that upstreams send either as a JSON number or as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self, field: &str) -> Result<f64, FetchError> {
        match self {
            Numeric::Number(n) => Ok(*n),
            Numeric::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                FetchError::InvalidResponse(format!("{} is not numeric: {:?}", field, s))
            }),
        }
    }

    fn from_value(value: &Value, field: &str) -> Result<f64, FetchError> {
        Numeric::deserialize(value)
            .map_err(|_| FetchError::InvalidResponse(format!("{} is not numeric: {}", field, value)))?
            .value(field)
    }
}

/// Pionex response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TradesData {
    #[serde(default)]
    trades: Vec<Trade>,
}

#[derive(Debug, Deserialize)]
struct Trade {
    price: Numeric,
    timestamp: Numeric,
}

#[derive(Debug, Deserialize)]
struct TickersData {
    #[serde(default)]
    tickers: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    amount: Numeric,
}

fn decode<T: for<'de> Deserialize<'de>>(body: &Value) -> Result<T, FetchError> {
    let envelope = Envelope::<T>::deserialize(body)
        .map_err(|e| FetchError::InvalidResponse(format!("Unexpected schema: {}", e)))?;
    envelope
        .data
        .ok_or_else(|| FetchError::MissingField("data".to_string()))
}

fn latest_trade_price(body: &Value) -> Result<f64, FetchError> {
    let data: TradesData = decode(body)?;

    let mut latest: Option<(f64, &Trade)> = None;
    for trade in &data.trades {
        let ts = trade.timestamp.value("timestamp")?;
        if latest.map_or(true, |(best, _)| ts > best) {
            latest = Some((ts, trade));
        }
    }

    let (_, trade) = latest.ok_or_else(|| FetchError::MissingField("data.trades".to_string()))?;
    trade.price.value("price")
}

fn first_ticker_amount(body: &Value) -> Result<f64, FetchError> {
    let data: TickersData = decode(body)?;
    data.tickers
        .first()
        .ok_or_else(|| FetchError::MissingField("data.tickers".to_string()))?
        .amount
        .value("amount")
}

/// Description of one upstream metric
#[derive(Debug, Clone)]
pub struct MetricSpec {
    /// Metric name used in logs
    pub name: String,

    /// Endpoint URL without query string
    pub url: String,

    /// Query parameters
    pub query: Vec<(String, String)>,

    /// Append `t=<unix seconds>` to bypass CDN caches
    pub cache_bust: bool,

    /// Parse step
    pub extractor: Extractor,

    /// Unit of the extracted value
    pub unit: Unit,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>, extractor: Extractor, unit: Unit) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            query: Vec::new(),
            cache_bust: false,
            extractor,
            unit,
        }
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Enable the cache-busting timestamp parameter
    pub fn with_cache_bust(mut self) -> Self {
        self.cache_bust = true;
        self
    }

    /// NFT floor price in KAS at the JSON pointer `field`
    pub fn floor_price(url: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new("floor_price", url, Extractor::Field(field.into()), Unit::KAS)
    }

    /// Latest traded price in USD
    pub fn spot_price(url: impl Into<String>, symbol: &str, limit: u32) -> Self {
        Self::new("spot_price", url, Extractor::LatestTrade, Unit::USD)
            .with_query("symbol", symbol)
            .with_query("limit", limit.to_string())
    }

    /// 24h traded volume in USD
    pub fn volume_24h(url: impl Into<String>, symbol: &str) -> Self {
        Self::new("volume_24h", url, Extractor::FirstTickerAmount, Unit::USD)
            .with_query("symbol", symbol)
    }
}
