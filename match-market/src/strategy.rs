//! Applicant strategies: anything that turns market parameters into an
//! ordered application list.

use crate::market::{Applicant, Market};
use crate::numbers::clamp_unit;
use crate::ranking::{build_ranking, rank_by_score};

/// Produces an ordered list of target universities for one applicant.
///
/// Implementations must return `min(count, N)` distinct indices in `0..N`,
/// most preferred first.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn rank_universities(&self, market: &Market, applicant: &Applicant, count: usize) -> Vec<usize>;
}

/// Selectivity-adjusted ranking followed by a desirability re-sort.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectivityStrategy;

impl Strategy for SelectivityStrategy {
    fn name(&self) -> &'static str {
        "selectivity"
    }

    fn rank_universities(
        &self,
        market: &Market,
        applicant: &Applicant,
        count: usize,
    ) -> Vec<usize> {
        build_ranking(market, applicant, count)
    }
}

/// Reference opponent heuristic: desirability weighted by a logistic
/// acceptance estimate fitted to the applicant's own spread of deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticStrategy;

/// Slope used when every delta is identical.
pub const FLAT_SLOPE: f64 = 1.0;

impl LogisticStrategy {
    /// Acceptance estimate per university, each within `[0, 1]`.
    #[must_use]
    pub fn acceptance(market: &Market, applicant: &Applicant) -> Vec<f64> {
        let mean = market.mean_combined_score();
        let deltas: Vec<f64> = (0..market.university_count())
            .map(|university| applicant.combined_score(university) - mean)
            .collect();
        let dmin = deltas.iter().copied().fold(f64::INFINITY, f64::min);
        let dmax = deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let midpoint = (dmin + dmax) / 2.0;
        let spread = dmax - dmin;
        let slope = if spread > 0.0 {
            99.0_f64.ln() / spread
        } else {
            FLAT_SLOPE
        };

        deltas
            .into_iter()
            .map(|delta| clamp_unit(1.0 / (1.0 + (-slope * (delta - midpoint)).exp())))
            .collect()
    }
}

impl Strategy for LogisticStrategy {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn rank_universities(
        &self,
        market: &Market,
        applicant: &Applicant,
        count: usize,
    ) -> Vec<usize> {
        let scores: Vec<f64> = Self::acceptance(market, applicant)
            .into_iter()
            .enumerate()
            .map(|(university, acceptance)| {
                market.desirability(applicant, university) * acceptance
            })
            .collect();
        let mut order = rank_by_score(&scores);
        order.truncate(count);
        order
    }
}
