use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketKind {
    Stock,
    Crypto,
}

impl MarketKind {
    /// Parse a CLI-format string into a `MarketKind`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stock" => Some(Self::Stock),
            "crypto" => Some(Self::Crypto),
            _ => None,
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stock => write!(f, "stock"),
            Self::Crypto => write!(f, "crypto"),
        }
    }
}

/// Candle timeframe supported by the application.
///
/// String representations match the CLI format (e.g. `"1h"`, `"1d"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Day1,
    Week1,
}

impl TimeFrame {
    /// Parse a CLI-format string into a `TimeFrame`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Self::Min1),
            "5m" => Some(Self::Min5),
            "15m" => Some(Self::Min15),
            "30m" => Some(Self::Min30),
            "1h" => Some(Self::Hour1),
            "1d" => Some(Self::Day1),
            "1w" => Some(Self::Week1),
            _ => None,
        }
    }

    /// Return the CLI-format string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Hour1 => "1h",
            Self::Day1 => "1d",
            Self::Week1 => "1w",
        }
    }

    /// Return the Binance kline interval string for this timeframe.
    pub fn binance_interval(self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Hour1 => "1h",
            Self::Day1 => "1d",
            Self::Week1 => "1w",
        }
    }

    /// Return the Yahoo Finance chart-API interval string for this timeframe.
    pub fn yahoo_interval(self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Hour1 => "60m",
            Self::Day1 => "1d",
            Self::Week1 => "1wk",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One historical trading period. Immutable once constructed.
///
/// Fields may carry NaN where the upstream source reported a missing value;
/// windowed computations propagate it rather than reject it.
#[derive(Debug, Clone)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Per-index trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "Bullish",
            Self::Bearish => "Bearish",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_round_trip() {
        let frames = [
            ("1m", TimeFrame::Min1),
            ("5m", TimeFrame::Min5),
            ("15m", TimeFrame::Min15),
            ("30m", TimeFrame::Min30),
            ("1h", TimeFrame::Hour1),
            ("1d", TimeFrame::Day1),
            ("1w", TimeFrame::Week1),
        ];
        for (s, tf) in frames {
            assert_eq!(TimeFrame::from_str(s), Some(tf));
            assert_eq!(tf.as_str(), s);
        }
    }

    #[test]
    fn timeframe_invalid_string_returns_none() {
        assert_eq!(TimeFrame::from_str("2m"), None);
        assert_eq!(TimeFrame::from_str(""), None);
    }

    #[test]
    fn hourly_yahoo_interval_differs_from_cli_form() {
        assert_eq!(TimeFrame::Hour1.yahoo_interval(), "60m");
        assert_eq!(TimeFrame::Week1.yahoo_interval(), "1wk");
    }

    #[test]
    fn market_kind_parse_and_display() {
        assert_eq!(MarketKind::from_str("stock"), Some(MarketKind::Stock));
        assert_eq!(MarketKind::from_str("crypto"), Some(MarketKind::Crypto));
        assert_eq!(MarketKind::from_str("forex"), None);
        assert_eq!(MarketKind::Crypto.to_string(), "crypto");
    }

    #[test]
    fn trend_label_display() {
        assert_eq!(TrendLabel::Bullish.to_string(), "Bullish");
        assert_eq!(TrendLabel::Bearish.as_str(), "Bearish");
        assert_eq!(TrendLabel::Neutral.as_str(), "Neutral");
    }
}
