//! Match Market Engine
//!
//! Single-round, capacity-one assignment market between applicants and
//! universities. Synthesizes competing applicants, clears the market with
//! deferred acceptance, and estimates by Monte-Carlo where a focal applicant
//! realistically lands in order to pick its final list of targets.

pub mod clearing;
pub mod evaluator;
pub mod market;
pub mod numbers;
pub mod opponents;
pub mod probability;
pub mod ranking;
pub mod rng;
pub mod strategy;
pub mod window;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use clearing::{
    ApplicationList, Assignment, Clearing, Entrant, Proposal, UNRANKED, clear_market,
    find_blocking_pair,
};
pub use evaluator::{EvaluationConfig, MonteCarloEvaluator, Tally, run_trial};
pub use market::{Applicant, Market, MarketError};
pub use opponents::{draw_applicant, generate_opponents};
pub use probability::combined_score_cdf;
pub use ranking::{build_ranking, full_ranking};
pub use rng::{CountingRng, TrialRng, trial_stream};
pub use strategy::{LogisticStrategy, SelectivityStrategy, Strategy};
pub use window::{WINDOW_LEN, select_window};

/// Outcome of a target selection for one focal applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSelection {
    /// Final ordered list of [`WINDOW_LEN`] universities.
    pub targets: Vec<usize>,
    /// University the focal applicant landed at most often, if ever.
    pub best_target: Option<usize>,
    /// Offset of `targets` within `full_ranking`.
    pub window_start: usize,
    pub full_ranking: Vec<usize>,
    pub tally: Tally,
}

/// Evaluate `focal` in `market` and pick its target window.
///
/// Markets where both draw ceilings are zero short-circuit to the first
/// [`WINDOW_LEN`] universities in input order without simulating. When the
/// focal applicant never matches, the window slides to the end of its
/// full ranking.
///
/// # Errors
///
/// Returns an error if the inputs are invalid or the market has fewer than
/// [`WINDOW_LEN`] universities.
pub fn select_targets(
    market: &Market,
    focal: &Applicant,
    config: EvaluationConfig,
) -> Result<TargetSelection, MarketError> {
    select_targets_with(market, focal, config, Box::new(LogisticStrategy))
}

/// [`select_targets`] with a caller-chosen heuristic for opponents' lists.
///
/// # Errors
///
/// Same as [`select_targets`].
pub fn select_targets_with(
    market: &Market,
    focal: &Applicant,
    config: EvaluationConfig,
    opponent_strategy: Box<dyn Strategy>,
) -> Result<TargetSelection, MarketError> {
    market.validate()?;
    market.check_applicant(focal)?;
    let universities = market.university_count();
    if universities < WINDOW_LEN {
        return Err(MarketError::InsufficientUniversities {
            required: WINDOW_LEN,
            available: universities,
        });
    }

    if market.is_degenerate() {
        log::debug!("degenerate market: returning the first {WINDOW_LEN} universities");
        return Ok(TargetSelection {
            targets: (0..WINDOW_LEN).collect(),
            best_target: None,
            window_start: 0,
            full_ranking: (0..universities).collect(),
            tally: Tally::new(universities),
        });
    }

    let mut evaluator =
        MonteCarloEvaluator::new(market, focal, config)?.with_opponent_strategy(opponent_strategy);
    evaluator.run()?;
    let tally = evaluator.into_tally();

    let ranking = full_ranking(market, focal);
    let best_target = tally.best();
    let position = best_target
        .and_then(|university| window::position_of(&ranking, university))
        .unwrap_or(universities - 1);
    let window_start = window::window_start(position, ranking.len())?;
    let targets = select_window(&ranking, position)?;

    Ok(TargetSelection {
        targets,
        best_target,
        window_start,
        full_ranking: ranking,
        tally,
    })
}

/// Choose the focal applicant's ordered list of [`WINDOW_LEN`] targets with
/// the default evaluation settings.
///
/// # Errors
///
/// Returns an error if the inputs are inconsistent (sequence lengths other
/// than `total_universities`, negative scales, non-finite values) or the
/// market has fewer than [`WINDOW_LEN`] universities.
pub fn choose_targets(
    total_universities: usize,
    aptitude_scale: f64,
    quality_weight: f64,
    synergy_scale: f64,
    my_aptitude: f64,
    qualities: &[f64],
    my_synergies: &[f64],
) -> Result<Vec<usize>, MarketError> {
    if qualities.len() != total_universities {
        return Err(MarketError::LengthMismatch {
            field: "qualities",
            expected: total_universities,
            actual: qualities.len(),
        });
    }
    let market = Market::new(
        aptitude_scale,
        quality_weight,
        synergy_scale,
        qualities.to_vec(),
    )?;
    let focal = Applicant::new(my_aptitude, my_synergies.to_vec());
    select_targets(&market, &focal, EvaluationConfig::default()).map(|selection| selection.targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_market_returns_input_order() {
        let qualities: Vec<f64> = (1..=10).map(f64::from).collect();
        let targets = choose_targets(10, 0.0, 1.0, 0.0, 0.0, &qualities, &[0.0; 10]).unwrap();
        assert_eq!(targets, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn fewer_than_ten_universities_is_an_error() {
        assert_eq!(
            choose_targets(2, 10.0, 1.0, 10.0, 100.0, &[5.0, 1.0], &[0.0, 0.0]),
            Err(MarketError::InsufficientUniversities {
                required: WINDOW_LEN,
                available: 2
            })
        );
    }

    #[test]
    fn mismatched_sequences_are_rejected() {
        assert!(matches!(
            choose_targets(10, 1.0, 1.0, 1.0, 0.5, &[1.0; 9], &[0.0; 10]),
            Err(MarketError::LengthMismatch {
                field: "qualities",
                ..
            })
        ));
        assert!(matches!(
            choose_targets(10, 1.0, 1.0, 1.0, 0.5, &[1.0; 10], &[0.0; 4]),
            Err(MarketError::LengthMismatch {
                field: "synergies",
                ..
            })
        ));
    }

    #[test]
    fn selection_window_sits_inside_full_ranking() {
        let qualities: Vec<f64> = (0..20).map(|i| 40.0 - f64::from(i)).collect();
        let synergies: Vec<f64> = (0..20).map(|i| f64::from(i % 5)).collect();
        let market = Market::new(10.0, 1.0, 5.0, qualities).unwrap();
        let focal = Applicant::new(7.0, synergies);
        let config = EvaluationConfig {
            trials: 40,
            ..EvaluationConfig::default()
        };
        let selection = select_targets(&market, &focal, config).unwrap();
        assert_eq!(selection.targets.len(), WINDOW_LEN);
        assert_eq!(
            selection.targets,
            selection.full_ranking[selection.window_start..selection.window_start + WINDOW_LEN]
        );
        assert_eq!(selection.tally.trials(), 40);
        if let Some(best) = selection.best_target {
            assert!(selection.targets.contains(&best));
        }
    }

    #[test]
    fn opponent_strategy_is_swappable() {
        let qualities: Vec<f64> = (0..12).map(|i| 30.0 - f64::from(i)).collect();
        let market = Market::new(8.0, 1.0, 4.0, qualities).unwrap();
        let focal = Applicant::new(5.0, vec![2.0; 12]);
        let config = EvaluationConfig {
            trials: 25,
            ..EvaluationConfig::default()
        };
        let selection =
            select_targets_with(&market, &focal, config, Box::new(SelectivityStrategy)).unwrap();
        assert_eq!(selection.targets.len(), WINDOW_LEN);
        assert_eq!(selection.tally.trials(), 25);
    }
}
