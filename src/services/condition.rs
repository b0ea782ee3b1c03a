use tokio::sync::OnceCell;

use crate::{
    error::MarketDataError,
    models::{Alert, AlertClass, Condition},
    services::market_data::{MarketData, SymbolChanges},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub met: bool,
    // fetched number, price classes only
    pub observed: Option<f64>,
}

impl Evaluation {
    fn not_met() -> Self {
        Self {
            met: false,
            observed: None,
        }
    }
}

// `>=`: value rose to at least threshold; `<=`: fell to at most
pub fn compare(condition: Condition, threshold: f64, value: f64) -> bool {
    match condition {
        Condition::Equal => threshold == value,
        Condition::AtLeast => threshold <= value,
        Condition::AtMost => threshold >= value,
        Condition::Unknown => false,
    }
}

pub fn listing_matches(class: AlertClass, symbol: &str, changes: &SymbolChanges) -> bool {
    match class {
        AlertClass::NewListing => changes.is_new(symbol),
        AlertClass::Delisting => changes.is_delisted(symbol),
        _ => false,
    }
}

/// Symbol listing changes fetched at most once per tick and shared by every
/// listing alert in it. A failure is remembered for the rest of the tick.
#[derive(Default)]
pub struct ListingSnapshot {
    cell: OnceCell<Result<SymbolChanges, String>>,
}

impl ListingSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get(&self, market: &dyn MarketData) -> Result<&SymbolChanges, MarketDataError> {
        let res = self
            .cell
            .get_or_init(|| async {
                market.symbol_changes().await.map_err(|e| e.to_string())
            })
            .await;

        res.as_ref()
            .map_err(|e| MarketDataError::ListingUnavailable(e.clone()))
    }
}

// errors are upstream failures; callers treat them as "not met"
pub async fn evaluate(
    alert: &Alert,
    market: &dyn MarketData,
    listings: &ListingSnapshot,
) -> Result<Evaluation, MarketDataError> {
    let value = match alert.alert_class {
        AlertClass::Spot => market.spot_price(&alert.symbol).await?,
        AlertClass::Future => market.future_price(&alert.symbol).await?,
        AlertClass::FundingRate => market.funding_rate(&alert.symbol).await?,
        AlertClass::NewListing | AlertClass::Delisting => {
            let changes = listings.get(market).await?;
            return Ok(Evaluation {
                met: listing_matches(alert.alert_class, &alert.symbol, changes),
                observed: None,
            });
        }
        AlertClass::Unknown => return Ok(Evaluation::not_met()),
    };

    if !value.is_finite() {
        return Err(MarketDataError::NonFinite {
            symbol: alert.symbol.clone(),
            value,
        });
    }

    Ok(Evaluation {
        met: compare(alert.condition, alert.threshold, value),
        observed: Some(value),
    })
}
