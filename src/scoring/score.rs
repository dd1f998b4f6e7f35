//! Consolidated candidate score.

use crate::config::ScoringConfig;

/// Substituted for any missing or non-finite statistic.
pub const NEUTRAL: f64 = 0.5;

/// Normalises an average pick order to [0, 1], where 1 is the earliest pick.
pub fn pick_order_component(pick_order: Option<f64>, scoring: &ScoringConfig) -> f64 {
    let Some(order) = pick_order.filter(|p| p.is_finite()) else {
        return NEUTRAL;
    };
    let span = scoring.max_pick_order - scoring.min_pick_order;
    if span <= 0.0 {
        return NEUTRAL;
    }
    let clamped = order.clamp(scoring.min_pick_order, scoring.max_pick_order);
    1.0 - (clamped - scoring.min_pick_order) / span
}

pub fn win_rate_component(win_rate: Option<f64>) -> f64 {
    win_rate
        .filter(|w| w.is_finite())
        .map(|w| w.clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL)
}

/// Weighted blend of win rate and pick order.
pub fn consolidated_score(win_rate: Option<f64>, pick_order: Option<f64>, scoring: &ScoringConfig) -> f64 {
    scoring.win_rate * win_rate_component(win_rate)
        + scoring.pick_order * pick_order_component(pick_order, scoring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[rstest]
    #[case(None, None, 0.5)]
    #[case(Some(1.0), Some(1.0), 1.0)]
    #[case(Some(0.0), Some(50.0), 0.0)]
    #[case(Some(0.6), None, 0.4 * 0.6 + 0.6 * 0.5)]
    #[case(None, Some(0.0), 0.4 * 0.5 + 0.6)]
    #[case(Some(1.7), Some(80.0), 0.4)]
    #[case(Some(f64::NAN), Some(f64::INFINITY), 0.5)]
    fn test_score_cases(#[case] win_rate: Option<f64>, #[case] pick: Option<f64>, #[case] expected: f64) {
        let score = consolidated_score(win_rate, pick, &ScoringConfig::default());
        assert!(approx(score, expected), "got {score}, expected {expected}");
    }

    #[test]
    fn test_degenerate_pick_range_is_neutral() {
        let scoring = ScoringConfig {
            min_pick_order: 10.0,
            max_pick_order: 10.0,
            ..Default::default()
        };
        assert!(approx(pick_order_component(Some(3.0), &scoring), NEUTRAL));
    }

    proptest! {
        #[test]
        fn prop_monotonic_in_win_rate(a in 0.0f64..1.0, b in 0.0f64..1.0, pick in 1.0f64..50.0) {
            let scoring = ScoringConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                consolidated_score(Some(lo), Some(pick), &scoring)
                    <= consolidated_score(Some(hi), Some(pick), &scoring)
            );
        }

        #[test]
        fn prop_earlier_pick_never_scores_lower(a in 0.0f64..80.0, b in 0.0f64..80.0, wr in 0.0f64..1.0) {
            let scoring = ScoringConfig::default();
            let (early, late) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                consolidated_score(Some(wr), Some(early), &scoring)
                    >= consolidated_score(Some(wr), Some(late), &scoring)
            );
        }

        #[test]
        fn prop_score_in_unit_range(wr in proptest::option::of(-1.0f64..2.0), pick in proptest::option::of(-10.0f64..100.0)) {
            let score = consolidated_score(wr, pick, &ScoringConfig::default());
            prop_assert!((0.0..=1.0 + 1e-9).contains(&score));
        }
    }
}
