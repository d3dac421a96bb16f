//! Selectivity-adjusted ranking of every university for one applicant.
//!
//! Universities earlier in the market's index order are assumed to be more
//! selective. Each one gets a target acceptance fraction; the applicant's
//! chance of clearing it comes from [`combined_score_cdf`]. The resulting
//! order is then truncated and the kept entries re-sorted by raw desirability.

use crate::market::{Applicant, Market};
use crate::numbers::{clamp_unit, usize_to_f64};
use crate::probability::combined_score_cdf;

/// Sort indices by descending score, ties broken by ascending index.
#[must_use]
pub fn rank_by_score(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&left, &right| {
        scores[right]
            .total_cmp(&scores[left])
            .then_with(|| left.cmp(&right))
    });
    order
}

/// Position-based selectivity, 1.0 for index 0 falling to 0.0 for the last university.
#[must_use]
pub fn rank_fraction(index: usize, universities: usize) -> f64 {
    if universities <= 1 {
        return 1.0;
    }
    1.0 - usize_to_f64(index) / usize_to_f64(universities - 1)
}

/// Expected maximum of the `universities - index` Uniform[0, 1] draws still
/// competing at this rank.
#[must_use]
pub fn expected_max(index: usize, universities: usize) -> f64 {
    let contenders = usize_to_f64(universities.saturating_sub(index).max(1));
    contenders / (contenders + 1.0)
}

/// Target acceptance fraction per university.
///
/// Blends [`rank_fraction`] and [`expected_max`] weighted by the aptitude and
/// synergy scales. With a zero quality weight the blend is replaced by the
/// expected-max term scaled by N / (N - 1).
#[must_use]
pub fn selectivity_targets(market: &Market) -> Vec<f64> {
    let universities = market.university_count();
    let spread = market.aptitude_scale + market.synergy_scale;
    let (rank_weight, max_weight) = if spread > 0.0 {
        (market.aptitude_scale / spread, market.synergy_scale / spread)
    } else {
        (0.5, 0.5)
    };
    let fallback_scale = if universities > 1 {
        usize_to_f64(universities) / usize_to_f64(universities - 1)
    } else {
        1.0
    };

    (0..universities)
        .map(|index| {
            let max_term = expected_max(index, universities);
            let target = if market.quality_weight > 0.0 {
                rank_weight * rank_fraction(index, universities) + max_weight * max_term
            } else {
                max_term * fallback_scale
            };
            clamp_unit(target)
        })
        .collect()
}

/// Selectivity-adjusted score of every university for `applicant`.
#[must_use]
pub fn selectivity_scores(market: &Market, applicant: &Applicant) -> Vec<f64> {
    selectivity_targets(market)
        .into_iter()
        .enumerate()
        .map(|(university, target)| {
            let chance = combined_score_cdf(
                applicant.combined_score(university),
                market.aptitude_scale,
                market.synergy_scale,
            );
            let factor = if target > 0.0 {
                (chance / target).min(1.0)
            } else {
                1.0
            };
            let synergy = applicant.synergy(university);
            factor.sqrt() * (factor * market.qualities[university] + synergy)
        })
        .collect()
}

/// Ordered list of `count` distinct universities for `applicant`.
///
/// The selectivity order picks which universities survive the cut; the
/// survivors are then ordered by quality + synergy.
#[must_use]
pub fn build_ranking(market: &Market, applicant: &Applicant, count: usize) -> Vec<usize> {
    let mut shortlist = rank_by_score(&selectivity_scores(market, applicant));
    shortlist.truncate(count.min(market.university_count()));

    // Equal desirability falls back to university index, not selectivity order.
    shortlist.sort_by(|&left, &right| {
        market
            .desirability(applicant, right)
            .total_cmp(&market.desirability(applicant, left))
            .then_with(|| left.cmp(&right))
    });
    shortlist
}

/// Complete ranking over all N universities.
#[must_use]
pub fn full_ranking(market: &Market, applicant: &Applicant) -> Vec<usize> {
    build_ranking(market, applicant, market.university_count())
}
