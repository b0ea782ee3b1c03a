use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::MarketDataError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolChanges {
    pub new: HashSet<String>,
    pub delisted: HashSet<String>,
}

impl SymbolChanges {
    pub fn is_new(&self, symbol: &str) -> bool {
        self.new.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }

    pub fn is_delisted(&self, symbol: &str) -> bool {
        self.delisted.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }
}

#[async_trait]
pub trait MarketData: Send + Sync {
    async fn spot_price(&self, symbol: &str) -> Result<f64, MarketDataError>;
    async fn future_price(&self, symbol: &str) -> Result<f64, MarketDataError>;
    async fn funding_rate(&self, symbol: &str) -> Result<f64, MarketDataError>;
    async fn symbol_changes(&self) -> Result<SymbolChanges, MarketDataError>;
}

// Binance REST, spot + USD-M futures
#[derive(Clone)]
pub struct BinanceClient {
    http: Client,
    spot_url: String,
    futures_url: String,
    // symbol -> status, captured on the first exchangeInfo call
    baseline: Arc<Mutex<Option<HashMap<String, String>>>>,
}

impl BinanceClient {
    pub fn new(spot_url: impl Into<String>, futures_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            spot_url: spot_url.into().trim_end_matches('/').to_string(),
            futures_url: futures_url.into().trim_end_matches('/').to_string(),
            baseline: Arc::new(Mutex::new(None)),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let res = self.http.get(url).query(query).send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(MarketDataError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        res.json::<T>().await.map_err(MarketDataError::from)
    }

    async fn ticker_price(&self, base: &str, path: &str, symbol: &str) -> Result<f64, MarketDataError> {
        let url = format!("{base}{path}");
        let symbol = symbol.to_uppercase();
        let ticker: TickerPrice = self.get_json(&url, &[("symbol", symbol.as_str())]).await?;
        parse_decimal(&ticker.symbol, &ticker.price)
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn spot_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.ticker_price(&self.spot_url, "/api/v3/ticker/price", symbol)
            .await
    }

    async fn future_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.ticker_price(&self.futures_url, "/fapi/v1/ticker/price", symbol)
            .await
    }

    async fn funding_rate(&self, symbol: &str) -> Result<f64, MarketDataError> {
        let url = format!("{}/fapi/v1/premiumIndex", self.futures_url);
        let symbol = symbol.to_uppercase();
        let index: PremiumIndex = self.get_json(&url, &[("symbol", symbol.as_str())]).await?;
        parse_decimal(&index.symbol, &index.last_funding_rate)
    }

    async fn symbol_changes(&self) -> Result<SymbolChanges, MarketDataError> {
        let url = format!("{}/api/v3/exchangeInfo", self.spot_url);
        let info: ExchangeInfo = self.get_json(&url, &[]).await?;

        let current: HashMap<String, String> = info
            .symbols
            .into_iter()
            .map(|s| (s.symbol.to_uppercase(), s.status))
            .collect();

        let mut baseline = self
            .baseline
            .lock()
            .map_err(|_| MarketDataError::Parse("listing baseline lock poisoned".to_string()))?;

        if let Some(base) = baseline.as_ref() {
            return Ok(diff_listings(base, &current));
        }

        // first snapshot: nothing to compare against yet
        tracing::info!(symbols = current.len(), "captured listing baseline");
        *baseline = Some(current);
        Ok(SymbolChanges::default())
    }
}

/// Compares the current exchange listing with the baseline snapshot.
///
/// New: trading now, unknown to the baseline. Delisted: known to the
/// baseline and either gone or no longer trading.
pub fn diff_listings(
    baseline: &HashMap<String, String>,
    current: &HashMap<String, String>,
) -> SymbolChanges {
    let new = current
        .iter()
        .filter(|(sym, status)| is_trading(status) && !baseline.contains_key(*sym))
        .map(|(sym, _)| sym.clone())
        .collect();

    let delisted = baseline
        .keys()
        .filter(|sym| current.get(*sym).is_none_or(|status| !is_trading(status)))
        .cloned()
        .collect();

    SymbolChanges { new, delisted }
}

fn is_trading(status: &str) -> bool {
    status.eq_ignore_ascii_case("TRADING")
}

fn parse_decimal(symbol: &str, raw: &str) -> Result<f64, MarketDataError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| MarketDataError::Parse(format!("{symbol}: '{raw}' is not a number")))?;

    if !value.is_finite() {
        return Err(MarketDataError::NonFinite {
            symbol: symbol.to_string(),
            value,
        });
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    symbol: String,
    last_funding_rate: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<ExchangeSymbol>,
}

#[derive(Debug, Deserialize)]
struct ExchangeSymbol {
    symbol: String,
    status: String,
}
