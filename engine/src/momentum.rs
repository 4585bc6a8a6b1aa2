//! Deterministic score over all survivors (spec.md §4.7): pure function,
//! no I/O. `score = 2·|changePct| + log1p(volume)`, sorted descending.
//! The top-N trim is disabled by default — downstream stages are cheap
//! once volume averages are cached — but remains a configuration knob.

use crate::filters::SymbolSnapshot;
use crate::types::Snapshot;

pub struct MomentumRanked {
    pub symbol: String,
    pub snapshot: Snapshot,
    pub momentum_score: f64,
}

pub fn momentum_score(snapshot: &Snapshot) -> f64 {
    2.0 * snapshot.change_pct.abs() + (1.0 + snapshot.volume).ln()
}

pub fn rank(input: Vec<SymbolSnapshot>, top_n: Option<usize>) -> Vec<MomentumRanked> {
    let mut ranked: Vec<MomentumRanked> = input
        .into_iter()
        .map(|item| MomentumRanked {
            momentum_score: momentum_score(&item.snapshot),
            symbol: item.symbol,
            snapshot: item.snapshot,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.momentum_score
            .partial_cmp(&a.momentum_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if let Some(n) = top_n {
        ranked.truncate(n);
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snap(change_pct: f64, volume: f64) -> Snapshot {
        Snapshot {
            price: 1.0,
            volume,
            change_pct,
            high: 1.0,
            low: 1.0,
            prev_close: 1.0,
            as_of: Utc::now(),
        }
    }

    #[test]
    fn formula_matches_spec() {
        let s = snap(0.4, 9_000_000.0);
        let score = momentum_score(&s);
        let expected = 2.0 * 0.4 + (1.0 + 9_000_000.0_f64).ln();
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn sorts_descending_by_score() {
        let items = vec![
            SymbolSnapshot {
                symbol: "LOW".into(),
                snapshot: snap(0.1, 100_000.0),
            },
            SymbolSnapshot {
                symbol: "HIGH".into(),
                snapshot: snap(5.0, 10_000_000.0),
            },
        ];
        let ranked = rank(items, None);
        assert_eq!(ranked[0].symbol, "HIGH");
        assert_eq!(ranked[1].symbol, "LOW");
    }

    #[test]
    fn top_n_trim_is_a_knob_disabled_by_default() {
        let items = (0..5)
            .map(|i| SymbolSnapshot {
                symbol: format!("S{i}"),
                snapshot: snap(i as f64, 1_000_000.0),
            })
            .collect::<Vec<_>>();
        assert_eq!(rank(items.clone(), None).len(), 5);
        assert_eq!(rank(items, Some(2)).len(), 2);
    }

    #[test]
    fn deterministic_given_same_input() {
        let items = vec![
            SymbolSnapshot {
                symbol: "A".into(),
                snapshot: snap(1.0, 1_000_000.0),
            },
            SymbolSnapshot {
                symbol: "B".into(),
                snapshot: snap(2.0, 2_000_000.0),
            },
        ];
        let a = rank(items.clone(), None);
        let b = rank(items, None);
        assert_eq!(
            a.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>(),
            b.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>()
        );
    }
}
