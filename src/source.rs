pub mod binance;
pub mod yahoo;

use chrono::{DateTime, Utc};
use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::SourceError;
use crate::model::{MarketKind, TimeFrame};
use crate::series::RawSeries;

/// Abstraction over a historical market-data provider.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn DataSource`).
pub trait DataSource: Send + Sync {
    fn kind(&self) -> MarketKind;

    /// Fetch the raw OHLCV table for `symbol` over `[start, end)` via REST.
    fn fetch_series(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<RawSeries, Report<SourceError>>>;
}

/// Select the data source for a market kind.
pub fn build_source(market: MarketKind) -> Box<dyn DataSource> {
    match market {
        MarketKind::Stock => Box::new(yahoo::YahooFinanceSource::new()),
        MarketKind::Crypto => Box::new(binance::BinanceSource::new()),
    }
}
