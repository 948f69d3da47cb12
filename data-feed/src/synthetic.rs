use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use chart_core::Tick;

/// Lower bound for simulated prices; a random walk never goes non-positive.
const PRICE_FLOOR: f64 = 0.01;

/// Static parameters of one simulated instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub symbol: String,
    pub start_price: f64,
    /// Per-step trend term of the price walk.
    pub drift: f64,
    /// Per-step fluctuation amplitude.
    pub volatility: f64,
}

impl SeriesSpec {
    pub fn new(symbol: impl Into<String>, start_price: f64, drift: f64, volatility: f64) -> Self {
        Self {
            symbol: symbol.into(),
            start_price,
            drift,
            volatility,
        }
    }
}

/// The stock universe the mock transport ships with.
pub fn default_universe() -> Vec<SeriesSpec> {
    vec![
        SeriesSpec::new("AAPL", 150.0, 0.0002, 0.1),
        SeriesSpec::new("GOOGL", 2_800.0, 0.0001, 0.15),
        SeriesSpec::new("AMZN", 3_400.0, 0.00015, 0.2),
        SeriesSpec::new("MSFT", 290.0, 0.00025, 0.1),
    ]
}

/// Point shape the generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickShape {
    /// Scalar value per point (line/bar charts).
    Value,
    /// Full OHLC per point (candlesticks).
    Ohlc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    pub shape: TickShape,
    /// Gap between consecutive generated timestamps.
    pub spacing_ms: i64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            shape: TickShape::Value,
            spacing_ms: 500,
        }
    }
}

#[derive(Debug, Clone)]
struct SeriesState {
    spec: SeriesSpec,
    last_price: f64,
}

/// Explicit generator object owning its whole simulation state: per-series
/// prices, the last emitted timestamp, and the RNG. Constructed per run or
/// per test; nothing is process-global, so tests cannot leak into each other.
#[derive(Debug)]
pub struct SyntheticFeed {
    series: Vec<SeriesState>,
    last_timestamp: DateTime<Utc>,
    rng: StdRng,
    config: SyntheticConfig,
}

impl SyntheticFeed {
    pub fn new(universe: Vec<SeriesSpec>, config: SyntheticConfig) -> Self {
        Self::at(universe, config, Utc::now(), StdRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn seeded(universe: Vec<SeriesSpec>, config: SyntheticConfig, seed: u64) -> Self {
        Self::at(universe, config, Utc::now(), StdRng::seed_from_u64(seed))
    }

    /// Fully pinned start state (clock and RNG).
    pub fn at(
        universe: Vec<SeriesSpec>,
        config: SyntheticConfig,
        start: DateTime<Utc>,
        rng: StdRng,
    ) -> Self {
        let series = universe
            .into_iter()
            .map(|spec| SeriesState {
                last_price: spec.start_price,
                spec,
            })
            .collect();
        Self {
            series,
            last_timestamp: start,
            rng,
            config,
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.spec.symbol.as_str())
    }

    /// Advance the simulated clock one step and produce one tick per symbol.
    ///
    /// Value shape follows a drifted random walk,
    /// `next = prev + prev * (drift + volatility * shock)` with the shock
    /// uniform in [-1, 1). OHLC shape opens at the previous close, spreads
    /// high/low by the volatility and closes uniformly inside the range.
    pub fn next_batch(&mut self) -> Vec<Tick> {
        self.last_timestamp += ChronoDuration::milliseconds(self.config.spacing_ms);
        let timestamp = self
            .last_timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut batch = Vec::with_capacity(self.series.len());
        for series in &mut self.series {
            let tick = match self.config.shape {
                TickShape::Value => {
                    let shock: f64 = self.rng.gen_range(-1.0..1.0);
                    let next = series.last_price
                        + series.last_price * (series.spec.drift + series.spec.volatility * shock);
                    series.last_price = next.max(PRICE_FLOOR);
                    Tick::value_point(&series.spec.symbol, &timestamp, series.last_price)
                }
                TickShape::Ohlc => {
                    let open = series.last_price;
                    let high = open * (1.0 + self.rng.gen_range(0.0..1.0) * series.spec.volatility);
                    let low =
                        (open * (1.0 - self.rng.gen_range(0.0..1.0) * series.spec.volatility))
                            .max(PRICE_FLOOR);
                    let close = if high > low {
                        self.rng.gen_range(low..high)
                    } else {
                        low
                    };
                    series.last_price = close;
                    Tick::ohlc_point(&series.spec.symbol, &timestamp, open, high, low, close)
                }
            };
            batch.push(tick);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chart_core::validate;
    use chrono::TimeZone;

    fn pinned(shape: TickShape, seed: u64) -> SyntheticFeed {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        SyntheticFeed::at(
            default_universe(),
            SyntheticConfig {
                shape,
                spacing_ms: 500,
            },
            start,
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn batches_cover_the_universe_and_validate_clean() {
        let mut feed = pinned(TickShape::Value, 42);
        let batch = feed.next_batch();
        assert_eq!(batch.len(), 4);
        assert_eq!(validate(&batch).len(), 4);
        let symbols: Vec<&str> = batch.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "GOOGL", "AMZN", "MSFT"]);
    }

    #[test]
    fn timestamps_advance_by_fixed_spacing() {
        let mut feed = pinned(TickShape::Value, 42);
        let first = feed.next_batch();
        let second = feed.next_batch();
        let t0 = first[0].timestamp_ms().unwrap();
        let t1 = second[0].timestamp_ms().unwrap();
        assert_eq!(t1 - t0, 500);
    }

    #[test]
    fn value_walk_derives_from_previous_price() {
        let mut feed = pinned(TickShape::Value, 42);
        let prev = feed.next_batch()[0].value.unwrap();
        let next = feed.next_batch()[0].value.unwrap();
        // one step moves at most drift + volatility, relative to prev
        let bound = prev * (0.0002 + 0.1) + 1e-9;
        assert!((next - prev).abs() <= bound, "step too large: {prev} -> {next}");
    }

    #[test]
    fn ohlc_opens_at_previous_close_and_stays_ordered() {
        let mut feed = pinned(TickShape::Ohlc, 7);
        let first = feed.next_batch();
        let second = feed.next_batch();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(b.open, a.close);
            let (open, high, low, close) =
                (b.open.unwrap(), b.high.unwrap(), b.low.unwrap(), b.close.unwrap());
            assert!(high >= open && low <= open);
            assert!(close >= low && close <= high);
        }
    }

    #[test]
    fn seeded_feeds_are_reproducible() {
        let mut a = pinned(TickShape::Value, 9);
        let mut b = pinned(TickShape::Value, 9);
        assert_eq!(a.next_batch(), b.next_batch());
        assert_eq!(a.next_batch(), b.next_batch());
    }

    #[test]
    fn prices_stay_positive_under_heavy_volatility() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let mut feed = SyntheticFeed::at(
            vec![SeriesSpec::new("PENNY", 0.02, -0.5, 2.0)],
            SyntheticConfig::default(),
            start,
            StdRng::seed_from_u64(1),
        );
        for _ in 0..200 {
            let batch = feed.next_batch();
            assert!(batch[0].value.unwrap() >= PRICE_FLOOR);
        }
    }
}
