use crate::model::TrendLabel;

/// Classify the per-index trend from the short SMA, long SMA and RSI series.
///
/// Rules checked in order, first match wins:
/// 1. short > long and RSI > 50 → Bullish
/// 2. short < long and RSI < 50 → Bearish
/// 3. otherwise → Neutral
///
/// NaN never satisfies `>` or `<`, so every index inside a warm-up region
/// falls through to Neutral without special-casing.
pub fn classify(sma_short: &[f64], sma_long: &[f64], rsi: &[f64]) -> Vec<TrendLabel> {
    sma_short
        .iter()
        .zip(sma_long)
        .zip(rsi)
        .map(|((&short, &long), &rsi)| {
            if short > long && rsi > 50.0 {
                TrendLabel::Bullish
            } else if short < long && rsi < 50.0 {
                TrendLabel::Bearish
            } else {
                TrendLabel::Neutral
            }
        })
        .collect()
}
