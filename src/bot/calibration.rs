/// Market calibration of model probabilities.
///
/// The raw Elo model is overconfident, so each outcome is shrunk toward the
/// de-vigged market price:
///
///   p_calibrated = (1 − α)·p_model + α·p_market
///
/// and then clamped into the configured probability band.
use super::odds::{Outcome, ProbabilityTriple};
use super::params::ModelParams;

/// Blend model and market probabilities with market weight `alpha`.
pub fn shrink_toward_market(
    model: &ProbabilityTriple,
    market: &ProbabilityTriple,
    alpha: f64,
) -> ProbabilityTriple {
    model.zip_with(market, |m, k| (1.0 - alpha) * m + alpha * k)
}

/// Clamp each component into `[lo, hi]` independently. The result is not
/// renormalized and may not sum to 1.
pub fn clamp_probabilities(p: &ProbabilityTriple, lo: f64, hi: f64) -> ProbabilityTriple {
    p.map(|v| v.clamp(lo, hi))
}

/// Rescale `p` to sum to 1 while keeping every component inside `[lo, hi]`.
///
/// Components that would leave the band are pinned at the bound and the
/// remaining mass is spread over the others in proportion to their values.
/// When the band cannot hold a distribution (3·lo > 1 or 3·hi < 1) the
/// components end up pinned and the sum is left as close as the band allows.
pub fn renormalize_within_bounds(p: &ProbabilityTriple, lo: f64, hi: f64) -> ProbabilityTriple {
    let mut values = [p.home, p.draw, p.away];
    let mut pinned = [false; 3];

    for _ in 0..Outcome::ALL.len() {
        let fixed_mass: f64 = (0..3).filter(|&i| pinned[i]).map(|i| values[i]).sum();
        let free: Vec<usize> = (0..3).filter(|&i| !pinned[i]).collect();
        if free.is_empty() {
            break;
        }
        let free_mass: f64 = free.iter().map(|&i| values[i]).sum();
        let target = 1.0 - fixed_mass;

        if free_mass > 0.0 {
            let scale = target / free_mass;
            for &i in &free {
                values[i] *= scale;
            }
        } else {
            let share = target / free.len() as f64;
            for &i in &free {
                values[i] = share;
            }
        }

        let mut newly_pinned = false;
        for &i in &free {
            if values[i] < lo || values[i] > hi {
                values[i] = values[i].clamp(lo, hi);
                pinned[i] = true;
                newly_pinned = true;
            }
        }
        if !newly_pinned {
            break;
        }
    }

    ProbabilityTriple::new(values[0], values[1], values[2])
}

/// Full calibration step: shrink toward the market, clamp to the configured
/// band, and optionally redistribute so the triple sums to 1.
pub fn calibrate(
    model: &ProbabilityTriple,
    market: &ProbabilityTriple,
    params: &ModelParams,
) -> ProbabilityTriple {
    let lo = params.min_probability_fraction();
    let hi = params.max_probability_fraction();
    let blended = shrink_toward_market(model, market, params.market_shrink);
    let clamped = clamp_probabilities(&blended, lo, hi);
    if params.renormalize_after_clamp {
        renormalize_within_bounds(&clamped, lo, hi)
    } else {
        clamped
    }
}
