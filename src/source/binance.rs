use std::sync::Arc;

use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::model::{MarketKind, TimeFrame};
use crate::series::RawSeries;
use crate::source::DataSource;

const BINANCE_BASE_URL: &str = "https://api.binance.com";
const MAX_CANDLES_PER_REQUEST: usize = 1000;
/// Binance kline endpoint costs weight 2; limit ~2500 req/min (5000 weight/min)
/// = ~40 req/s. Use 20 for safety margin.
const BINANCE_REQUESTS_PER_SECOND: u32 = 20;

pub struct BinanceSource {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl BinanceSource {
    pub fn new() -> Self {
        let quota = Quota::per_second(nonzero!(BINANCE_REQUESTS_PER_SECOND));
        Self {
            client: reqwest::Client::new(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn fetch_page(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<BinanceKlineRow>, Report<SourceError>> {
        // Wait for rate limiter before making the request
        self.rate_limiter.until_ready().await;

        let url = format!("{BINANCE_BASE_URL}/api/v3/klines");
        let start_str = start_ms.to_string();
        let end_str = end_ms.to_string();
        let limit_str = MAX_CANDLES_PER_REQUEST.to_string();
        let params = [
            ("symbol", symbol),
            ("interval", timeframe.binance_interval()),
            ("startTime", start_str.as_str()),
            ("endTime", end_str.as_str()),
            ("limit", limit_str.as_str()),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .change_context(SourceError::Request {
                source: "binance".into(),
            })?;

        if !response.status().is_success() {
            return Err(Report::new(SourceError::Request {
                source: "binance".into(),
            })
            .attach(format!("HTTP status: {}", response.status())));
        }

        response
            .json()
            .await
            .change_context(SourceError::ResponseParse {
                source: "binance".into(),
            })
    }
}

impl Default for BinanceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for BinanceSource {
    fn kind(&self) -> MarketKind {
        MarketKind::Crypto
    }

    fn fetch_series(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<RawSeries, Report<SourceError>>> {
        let symbol = normalize_symbol(symbol);
        Box::pin(async move {
            let mut rows: Vec<BinanceKlineRow> = Vec::new();
            let mut cursor = start.timestamp_millis();
            let end_ms = end.timestamp_millis();

            // Page forward through the range; Binance caps each response at
            // MAX_CANDLES_PER_REQUEST rows.
            while cursor < end_ms {
                let page = self.fetch_page(&symbol, timeframe, cursor, end_ms).await?;
                if page.is_empty() {
                    break;
                }
                let page_len = page.len();
                debug!(symbol = %symbol, fetched = page_len, cursor, "binance page fetched");
                cursor = page[page_len - 1].0 + 1;
                rows.extend(page);
                if page_len < MAX_CANDLES_PER_REQUEST {
                    break;
                }
            }

            if rows.is_empty() {
                return Err(Report::new(SourceError::DataUnavailable { symbol }));
            }

            info!(
                symbol = %symbol,
                timeframe = %timeframe,
                fetched = rows.len(),
                "binance candle fetch complete"
            );

            rows_into_raw(rows)
        })
    }
}

/// Normalize a user-facing pair symbol to Binance format
/// (e.g. `"BTC/USDT"` → `"BTCUSDT"`).
fn normalize_symbol(symbol: &str) -> String {
    symbol.replace('/', "").to_uppercase()
}

/// Binance kline row: 12-element array
/// [open_time, open, high, low, close, volume, close_time, ...]
#[derive(Debug, Deserialize)]
struct BinanceKlineRow(
    i64,                        // 0: open_time (ms)
    String,                     // 1: open
    String,                     // 2: high
    String,                     // 3: low
    String,                     // 4: close
    String,                     // 5: volume
    #[allow(dead_code)] i64,    // 6: close_time
    #[allow(dead_code)] String, // 7: quote asset volume
    #[allow(dead_code)] i64,    // 8: number of trades
    #[allow(dead_code)] String, // 9: taker buy base volume
    #[allow(dead_code)] String, // 10: taker buy quote volume
    #[allow(dead_code)] String, // 11: ignore
);

fn rows_into_raw(rows: Vec<BinanceKlineRow>) -> Result<RawSeries, Report<SourceError>> {
    let parse_f64 = |s: &str| -> Result<f64, Report<SourceError>> {
        s.parse::<f64>().change_context(SourceError::ResponseParse {
            source: "binance".into(),
        })
    };

    let mut raw = RawSeries {
        timestamps: Vec::with_capacity(rows.len()),
        open: Some(Vec::with_capacity(rows.len())),
        high: Some(Vec::with_capacity(rows.len())),
        low: Some(Vec::with_capacity(rows.len())),
        close: Some(Vec::with_capacity(rows.len())),
        volume: Some(Vec::with_capacity(rows.len())),
    };

    for row in rows {
        let timestamp = DateTime::from_timestamp_millis(row.0).ok_or_else(|| {
            Report::new(SourceError::ResponseParse {
                source: "binance".into(),
            })
            .attach(format!("open_time out of range: {}", row.0))
        })?;
        raw.timestamps.push(timestamp);
        if let Some(col) = raw.open.as_mut() {
            col.push(parse_f64(&row.1)?);
        }
        if let Some(col) = raw.high.as_mut() {
            col.push(parse_f64(&row.2)?);
        }
        if let Some(col) = raw.low.as_mut() {
            col.push(parse_f64(&row.3)?);
        }
        if let Some(col) = raw.close.as_mut() {
            col.push(parse_f64(&row.4)?);
        }
        if let Some(col) = raw.volume.as_mut() {
            col.push(parse_f64(&row.5)?);
        }
    }

    Ok(raw)
}
