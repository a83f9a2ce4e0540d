/// Kelly Criterion stake fraction and edge helpers.
///
/// The Kelly formula sizes a bet to maximise the expected logarithm of wealth,
/// which balances risk and reward optimally over the long run.
///
/// Decimal-odds form:
///   f* = (odds·p − 1) / (odds − 1)
/// where
///   odds = decimal odds (total return per unit staked, stake included)
///   p    = calibrated probability that the bet wins
///
/// A *fractional* Kelly multiplier (0 < multiplier ≤ 1) is applied on top to
/// reduce variance at the cost of slightly lower expected growth.
use super::odds::{EdgeTriple, Outcome, ProbabilityTriple};

/// Full Kelly fraction for a bet at decimal `odds` with win probability `p`.
///
/// Returns `None` for degenerate odds (≤ 1.0, including the even-money
/// `odds == 1` case where the denominator vanishes). The value may be zero or
/// negative; callers treat that as "no bet".
pub fn kelly_fraction(p: f64, odds: f64) -> Option<f64> {
    if !odds.is_finite() || odds <= 1.0 {
        return None;
    }
    Some((odds * p - 1.0) / (odds - 1.0))
}

/// Edge per outcome: calibrated probability minus market probability.
pub fn edges(calibrated: &ProbabilityTriple, market: &ProbabilityTriple) -> EdgeTriple {
    calibrated.zip_with(market, |c, m| c - m)
}

/// Outcome with the largest edge. Ties go to the earlier outcome in
/// home, draw, away order.
pub fn best_edge(edges: &EdgeTriple) -> (Outcome, f64) {
    let mut best = (Outcome::Home, edges.home);
    for (outcome, value) in edges.iter().skip(1) {
        if value > best.1 {
            best = (outcome, value);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kelly_no_edge() {
        // Fair price: p = 0.5 at evens
        let f = kelly_fraction(0.5, 2.0).unwrap();
        assert_relative_eq!(f, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kelly_positive_edge() {
        // p = 0.6 at 2.0 → (1.2 − 1) / 1 = 0.2
        assert_relative_eq!(kelly_fraction(0.6, 2.0).unwrap(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_kelly_negative_edge() {
        assert!(kelly_fraction(0.3, 2.0).unwrap() < 0.0);
    }

    #[test]
    fn test_kelly_short_odds_small_edge() {
        // 0.5615 at 1.8 → (1.0107 − 1) / 0.8 ≈ 0.01337
        assert_relative_eq!(kelly_fraction(0.5615, 1.8).unwrap(), 0.013_375, epsilon = 1e-9);
    }

    #[test]
    fn test_kelly_degenerate_odds() {
        assert!(kelly_fraction(0.9, 1.0).is_none());
        assert!(kelly_fraction(0.9, 0.5).is_none());
        assert!(kelly_fraction(0.9, f64::NAN).is_none());
    }

    #[test]
    fn test_edges_are_signed_differences() {
        let e = edges(
            &ProbabilityTriple::new(0.55, 0.25, 0.20),
            &ProbabilityTriple::new(0.50, 0.28, 0.22),
        );
        assert_relative_eq!(e.home, 0.05, epsilon = 1e-12);
        assert_relative_eq!(e.draw, -0.03, epsilon = 1e-12);
        assert_relative_eq!(e.away, -0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_edges_tolerate_unnormalized_calibration() {
        // Clamped calibrated triple summing to 0.95 still yields edges.
        let e = edges(
            &ProbabilityTriple::new(0.85, 0.05, 0.05),
            &ProbabilityTriple::new(0.90, 0.06, 0.04),
        );
        assert_relative_eq!(e.sum(), -0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_best_edge_picks_maximum() {
        let (o, v) = best_edge(&EdgeTriple::new(-0.01, 0.02, 0.04));
        assert_eq!(o, Outcome::Away);
        assert_relative_eq!(v, 0.04);
    }

    #[test]
    fn test_best_edge_tie_goes_to_first() {
        let (o, _) = best_edge(&EdgeTriple::new(0.03, 0.03, 0.01));
        assert_eq!(o, Outcome::Home);
    }
}
