use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tick::Tick;

/// Stable identity of a drawn primitive.
///
/// Series-level primitives (one path per symbol) key on the symbol alone;
/// per-point marks and candles key on `(symbol, timestamp)` so a point keeps
/// its visual element across cycles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimitiveKey {
    Series(String),
    Point { symbol: String, timestamp: String },
}

/// Target geometry of a primitive, in plot pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Path { points: Vec<(f64, f64)> },
    Circle { cx: f64, cy: f64, r: f64 },
    Rect { x: f64, y: f64, width: f64, height: f64 },
    Candle {
        x: f64,
        half_width: f64,
        y_open: f64,
        y_close: f64,
        y_high: f64,
        y_low: f64,
        bullish: bool,
    },
}

impl Shape {
    /// The zero-extent geometry an entering primitive animates from: collapsed
    /// onto the value-zero baseline, keeping its x placement.
    pub fn collapsed(&self, baseline_y: f64) -> Shape {
        match self {
            Shape::Path { points } => Shape::Path {
                points: points.iter().map(|(x, _)| (*x, baseline_y)).collect(),
            },
            Shape::Circle { cx, r, .. } => Shape::Circle {
                cx: *cx,
                cy: baseline_y,
                r: *r,
            },
            Shape::Rect { x, width, .. } => Shape::Rect {
                x: *x,
                y: baseline_y,
                width: *width,
                height: 0.0,
            },
            Shape::Candle {
                x,
                half_width,
                bullish,
                ..
            } => Shape::Candle {
                x: *x,
                half_width: *half_width,
                y_open: baseline_y,
                y_close: baseline_y,
                y_high: baseline_y,
                y_low: baseline_y,
                bullish: *bullish,
            },
        }
    }
}

/// One visual element: target geometry, a color slot, and the source point
/// for tooltip lookup (per-point marks only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub shape: Shape,
    /// Index of the symbol within the chart, for palette assignment.
    pub series_index: usize,
    pub source: Option<Tick>,
}

pub type KeyedPrimitives = BTreeMap<PrimitiveKey, Primitive>;

/// Materialize a new primitive, animating from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterOp {
    pub key: PrimitiveKey,
    pub from: Shape,
    pub to: Primitive,
}

/// Animate an existing primitive from its previous geometry to the new target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOp {
    pub key: PrimitiveKey,
    pub from: Shape,
    pub to: Primitive,
}

/// The minimal set of visual mutations for one cycle, in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub enter: Vec<EnterOp>,
    pub update: Vec<UpdateOp>,
    pub exit: Vec<PrimitiveKey>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.enter.is_empty() && self.update.is_empty() && self.exit.is_empty()
    }
}

/// The last-rendered primitive set. Owned exclusively by the reconciliation
/// step; replaced wholesale on every cycle, never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawnSet {
    primitives: KeyedPrimitives,
}

impl DrawnSet {
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn get(&self, key: &PrimitiveKey) -> Option<&Primitive> {
        self.primitives.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PrimitiveKey> {
        self.primitives.keys()
    }

    /// Diff the incoming keyed set against what is currently drawn, then
    /// replace the drawn set with it.
    ///
    /// Enter = keys only in `new` (materialized collapsed onto the baseline),
    /// update = keys in both, exit = keys only in the previous set. Fully
    /// determined by the two inputs; both maps iterate in key order.
    pub fn reconcile(&mut self, new: KeyedPrimitives, baseline_y: f64) -> Diff {
        let mut diff = Diff::default();

        for (key, primitive) in &new {
            match self.primitives.get(key) {
                None => diff.enter.push(EnterOp {
                    key: key.clone(),
                    from: primitive.shape.collapsed(baseline_y),
                    to: primitive.clone(),
                }),
                Some(previous) => diff.update.push(UpdateOp {
                    key: key.clone(),
                    from: previous.shape.clone(),
                    to: primitive.clone(),
                }),
            }
        }
        for key in self.primitives.keys() {
            if !new.contains_key(key) {
                diff.exit.push(key.clone());
            }
        }

        self.primitives = new;
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(symbol: &str, ts: &str, cy: f64) -> (PrimitiveKey, Primitive) {
        (
            PrimitiveKey::Point {
                symbol: symbol.into(),
                timestamp: ts.into(),
            },
            Primitive {
                shape: Shape::Circle { cx: 1.0, cy, r: 4.0 },
                series_index: 0,
                source: None,
            },
        )
    }

    #[test]
    fn first_cycle_is_all_enter() {
        let mut drawn = DrawnSet::default();
        let new: KeyedPrimitives = [circle("AAPL", "t1", 10.0), circle("AAPL", "t2", 11.0)]
            .into_iter()
            .collect();
        let diff = drawn.reconcile(new, 450.0);
        assert_eq!(diff.enter.len(), 2);
        assert!(diff.update.is_empty());
        assert!(diff.exit.is_empty());
        assert_eq!(drawn.len(), 2);
        // entering marks grow from the baseline
        assert_eq!(
            diff.enter[0].from,
            Shape::Circle { cx: 1.0, cy: 450.0, r: 4.0 }
        );
    }

    #[test]
    fn shared_keys_update_with_previous_geometry() {
        let mut drawn = DrawnSet::default();
        drawn.reconcile([circle("AAPL", "t1", 10.0)].into_iter().collect(), 0.0);
        let diff = drawn.reconcile([circle("AAPL", "t1", 25.0)].into_iter().collect(), 0.0);
        assert_eq!(diff.update.len(), 1);
        assert_eq!(diff.update[0].from, Shape::Circle { cx: 1.0, cy: 10.0, r: 4.0 });
        assert_eq!(
            diff.update[0].to.shape,
            Shape::Circle { cx: 1.0, cy: 25.0, r: 4.0 }
        );
    }

    #[test]
    fn evicted_keys_exit() {
        let mut drawn = DrawnSet::default();
        drawn.reconcile(
            [circle("AAPL", "t1", 1.0), circle("AAPL", "t2", 2.0)]
                .into_iter()
                .collect(),
            0.0,
        );
        let diff = drawn.reconcile(
            [circle("AAPL", "t2", 2.0), circle("AAPL", "t3", 3.0)]
                .into_iter()
                .collect(),
            0.0,
        );
        assert_eq!(diff.enter.len(), 1);
        assert_eq!(diff.update.len(), 1);
        assert_eq!(
            diff.exit,
            vec![PrimitiveKey::Point {
                symbol: "AAPL".into(),
                timestamp: "t1".into()
            }]
        );
        assert_eq!(drawn.len(), 2);
    }

    #[test]
    fn partition_covers_union_exactly() {
        let mut drawn = DrawnSet::default();
        let prev: KeyedPrimitives = [circle("A", "t1", 1.0), circle("B", "t1", 2.0)]
            .into_iter()
            .collect();
        drawn.reconcile(prev.clone(), 0.0);
        let new: KeyedPrimitives = [circle("B", "t1", 3.0), circle("C", "t1", 4.0)]
            .into_iter()
            .collect();
        let diff = drawn.reconcile(new.clone(), 0.0);

        let mut seen: Vec<PrimitiveKey> = diff
            .enter
            .iter()
            .map(|e| e.key.clone())
            .chain(diff.update.iter().map(|u| u.key.clone()))
            .chain(diff.exit.iter().cloned())
            .collect();
        seen.sort();
        let mut union: Vec<PrimitiveKey> =
            prev.keys().chain(new.keys()).cloned().collect();
        union.sort();
        union.dedup();
        assert_eq!(seen, union);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let build = || {
            let mut drawn = DrawnSet::default();
            drawn.reconcile([circle("A", "t1", 1.0)].into_iter().collect(), 0.0);
            drawn.reconcile(
                [circle("A", "t2", 2.0), circle("B", "t1", 3.0)]
                    .into_iter()
                    .collect(),
                0.0,
            )
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn collapsed_candle_sits_on_baseline() {
        let candle = Shape::Candle {
            x: 10.0,
            half_width: 5.0,
            y_open: 30.0,
            y_close: 20.0,
            y_high: 15.0,
            y_low: 35.0,
            bullish: true,
        };
        match candle.collapsed(100.0) {
            Shape::Candle {
                y_open,
                y_close,
                y_high,
                y_low,
                ..
            } => {
                assert!([y_open, y_close, y_high, y_low].iter().all(|y| *y == 100.0));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
