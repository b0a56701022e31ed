use std::sync::Arc;

use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::info;

use crate::error::SourceError;
use crate::model::{MarketKind, TimeFrame};
use crate::series::RawSeries;
use crate::source::DataSource;

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
/// Yahoo rejects requests without a browser-like user agent.
const YAHOO_USER_AGENT: &str = "Mozilla/5.0 (compatible; market-trend-analyzer/0.1)";
/// The unauthenticated chart API throttles aggressively; stay well below.
const YAHOO_REQUESTS_PER_SECOND: u32 = 4;

pub struct YahooFinanceSource {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl YahooFinanceSource {
    pub fn new() -> Self {
        let quota = Quota::per_second(nonzero!(YAHOO_REQUESTS_PER_SECOND));
        Self {
            client: reqwest::Client::new(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

impl Default for YahooFinanceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for YahooFinanceSource {
    fn kind(&self) -> MarketKind {
        MarketKind::Stock
    }

    fn fetch_series(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<RawSeries, Report<SourceError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            self.rate_limiter.until_ready().await;

            let url = format!("{YAHOO_BASE_URL}/v8/finance/chart/{symbol}");
            let period1 = start.timestamp().to_string();
            let period2 = end.timestamp().to_string();
            let params = [
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", timeframe.yahoo_interval()),
                ("events", "history"),
            ];

            let response = self
                .client
                .get(&url)
                .header(USER_AGENT, YAHOO_USER_AGENT)
                .query(&params)
                .send()
                .await
                .change_context(SourceError::Request {
                    source: "yahoo".into(),
                })?;

            if !response.status().is_success() {
                return Err(Report::new(SourceError::Request {
                    source: "yahoo".into(),
                })
                .attach(format!("HTTP status: {}", response.status())));
            }

            let payload: YahooChartResponse =
                response
                    .json()
                    .await
                    .change_context(SourceError::ResponseParse {
                        source: "yahoo".into(),
                    })?;

            let raw = payload_into_raw(payload, &symbol)?;

            info!(
                symbol = %symbol,
                timeframe = %timeframe,
                fetched = raw.timestamps.len(),
                "yahoo candle fetch complete"
            );

            Ok(raw)
        })
    }
}

// ── Chart API response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

/// Quote columns; individual entries are null when Yahoo has no value for
/// that period, and whole columns can be absent.
#[derive(Debug, Deserialize, Default)]
struct YahooQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

fn payload_into_raw(
    payload: YahooChartResponse,
    symbol: &str,
) -> Result<RawSeries, Report<SourceError>> {
    if let Some(error) = payload.chart.error {
        if !error.is_null() {
            return Err(Report::new(SourceError::DataUnavailable {
                symbol: symbol.to_owned(),
            })
            .attach(error.to_string()));
        }
    }

    let result = payload
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
        .ok_or_else(|| {
            Report::new(SourceError::DataUnavailable {
                symbol: symbol.to_owned(),
            })
        })?;

    let timestamps_secs = result.timestamp.unwrap_or_default();
    if timestamps_secs.is_empty() {
        return Err(Report::new(SourceError::DataUnavailable {
            symbol: symbol.to_owned(),
        }));
    }

    let mut timestamps = Vec::with_capacity(timestamps_secs.len());
    for secs in timestamps_secs {
        let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            Report::new(SourceError::ResponseParse {
                source: "yahoo".into(),
            })
            .attach(format!("timestamp out of range: {secs}"))
        })?;
        timestamps.push(timestamp);
    }

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    Ok(RawSeries {
        timestamps,
        open: quote.open.map(nulls_to_nan),
        high: quote.high.map(nulls_to_nan),
        low: quote.low.map(nulls_to_nan),
        close: quote.close.map(nulls_to_nan),
        volume: quote.volume.map(nulls_to_nan),
    })
}

/// Null entries become NaN, the missing-value sentinel that windowed
/// computations propagate downstream.
fn nulls_to_nan(column: Vec<Option<f64>>) -> Vec<f64> {
    column
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}
