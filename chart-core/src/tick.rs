use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// One timestamped price observation for a symbol, as delivered on the wire.
///
/// A point carries either a scalar `value` (line/bar charts), a full OHLC set
/// (candlesticks), or both. Numeric fields deserialize leniently: a
/// non-numeric JSON value becomes `None` instead of failing the whole batch,
/// so malformed points reach [`validate`] rather than poisoning their siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    /// ISO-8601 instant, kept as delivered. See [`Tick::instant`].
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
}

fn lenient_f64<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(de)?;
    Ok(raw.as_f64())
}

impl Tick {
    pub fn value_point(symbol: impl Into<String>, timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp: timestamp.into(),
            value: Some(value),
            open: None,
            high: None,
            low: None,
            close: None,
        }
    }

    pub fn ohlc_point(
        symbol: impl Into<String>,
        timestamp: impl Into<String>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp: timestamp.into(),
            value: None,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
        }
    }

    /// Parse the wire timestamp. `None` for anything RFC 3339 rejects.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn timestamp_ms(&self) -> Option<i64> {
        self.instant().map(|dt| dt.timestamp_millis())
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some_and(f64::is_finite)
    }

    pub fn has_ohlc(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|f| f.is_some_and(f64::is_finite))
    }

    /// The scalar used for line/bar plotting: `value`, else the OHLC midpoint.
    pub fn plot_value(&self) -> Option<f64> {
        if self.has_value() {
            return self.value;
        }
        if self.has_ohlc() {
            return Some((self.open.unwrap_or(0.0) + self.close.unwrap_or(0.0)) / 2.0);
        }
        None
    }

    /// The tallest visible value of this point (`high` for OHLC, else `value`).
    /// Zoom clamping uses this so the series is never clipped.
    pub fn peak(&self) -> Option<f64> {
        if self.has_ohlc() {
            self.high
        } else if self.has_value() {
            self.value
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.instant().is_some() && (self.has_value() || self.has_ohlc())
    }
}

/// Drop points whose timestamp fails to parse or which carry neither a finite
/// scalar value nor a complete finite OHLC set. Pure, order-preserving filter;
/// a finite `value` next to a broken OHLC field still passes, the two shapes
/// are independent.
pub fn validate(points: &[Tick]) -> Vec<Tick> {
    let kept: Vec<Tick> = points.iter().filter(|p| p.is_valid()).cloned().collect();
    let dropped = points.len() - kept.len();
    if dropped > 0 {
        debug!(dropped, total = points.len(), "dropped malformed tick points");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2024-03-01T20:00:00Z";

    #[test]
    fn validate_keeps_scalar_and_ohlc_points() {
        let points = vec![
            Tick::value_point("AAPL", TS, 10.0),
            Tick::ohlc_point("AAPL", TS, 10.0, 12.0, 9.0, 11.0),
        ];
        assert_eq!(validate(&points).len(), 2);
    }

    #[test]
    fn validate_drops_bad_timestamp() {
        let points = vec![Tick::value_point("AAPL", "not-a-date", 10.0)];
        assert!(validate(&points).is_empty());
    }

    #[test]
    fn validate_drops_non_numeric_value() {
        // value arrives as a string on the wire
        let raw = r#"[{"symbol":"AAPL","timestamp":"2024-03-01T20:00:00Z","value":"x"}]"#;
        let points: Vec<Tick> = serde_json::from_str(raw).unwrap();
        assert_eq!(points.len(), 1);
        assert!(points[0].value.is_none());
        assert!(validate(&points).is_empty());
    }

    #[test]
    fn validate_drops_nan_and_infinite() {
        let mut p = Tick::value_point("AAPL", TS, f64::NAN);
        assert!(validate(std::slice::from_ref(&p)).is_empty());
        p.value = Some(f64::INFINITY);
        assert!(validate(std::slice::from_ref(&p)).is_empty());
    }

    #[test]
    fn scalar_value_survives_broken_ohlc() {
        let mut p = Tick::value_point("AAPL", TS, 10.0);
        p.open = Some(f64::NAN);
        let kept = validate(std::slice::from_ref(&p));
        assert_eq!(kept.len(), 1);
        assert!(!kept[0].has_ohlc());
    }

    #[test]
    fn validate_is_idempotent() {
        let points = vec![
            Tick::value_point("AAPL", TS, 10.0),
            Tick::value_point("AAPL", "bad", 11.0),
            Tick::ohlc_point("MSFT", TS, 1.0, 2.0, 0.5, 1.5),
        ];
        let once = validate(&points);
        assert_eq!(validate(&once), once);
    }

    #[test]
    fn plot_value_prefers_scalar_then_midpoint() {
        let scalar = Tick::value_point("A", TS, 42.0);
        assert_eq!(scalar.plot_value(), Some(42.0));
        let ohlc = Tick::ohlc_point("A", TS, 10.0, 12.0, 9.0, 11.0);
        assert_eq!(ohlc.plot_value(), Some(10.5));
    }

    #[test]
    fn peak_uses_high_for_ohlc() {
        let ohlc = Tick::ohlc_point("A", TS, 10.0, 12.0, 9.0, 11.0);
        assert_eq!(ohlc.peak(), Some(12.0));
        assert_eq!(Tick::value_point("A", TS, 7.0).peak(), Some(7.0));
    }

    #[test]
    fn wire_round_trip_skips_absent_fields() {
        let p = Tick::value_point("AAPL", TS, 10.0);
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("open"));
        let back: Tick = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
