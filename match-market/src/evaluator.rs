//! Monte-Carlo estimate of where the focal applicant lands.
//!
//! Every trial synthesizes a fresh opponent population, adds the focal
//! applicant with its fixed list, clears the market, and records the focal
//! applicant's seat in a [`Tally`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

use crate::clearing::{ApplicationList, Entrant, clear_market};
use crate::market::{Applicant, Market, MarketError};
use crate::numbers::ratio;
use crate::opponents::generate_opponents;
use crate::rng::trial_stream;
use crate::strategy::{LogisticStrategy, SelectivityStrategy, Strategy};

/// Settings for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "EvaluationConfig::default_trials")]
    pub trials: u64,
    /// Competitors per trial; `None` fills every other seat (N - 1).
    #[serde(default)]
    pub opponents: Option<usize>,
    #[serde(default = "EvaluationConfig::default_application_len")]
    pub application_len: usize,
    #[serde(default = "EvaluationConfig::default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub parallel: bool,
}

impl EvaluationConfig {
    const fn default_trials() -> u64 {
        500
    }

    const fn default_application_len() -> usize {
        10
    }

    const fn default_seed() -> u64 {
        1337
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate trial and list bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if `trials` or `application_len` is zero.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.trials == 0 {
            return Err(MarketError::InvalidConfig {
                field: "trials",
                reason: "at least one trial is required",
            });
        }
        if self.application_len == 0 {
            return Err(MarketError::InvalidConfig {
                field: "application_len",
                reason: "applications must list at least one university",
            });
        }
        Ok(())
    }

    /// Opponents per trial for a market of `universities` seats.
    #[must_use]
    pub fn opponent_count(&self, universities: usize) -> usize {
        self.opponents.unwrap_or_else(|| universities.saturating_sub(1))
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            trials: Self::default_trials(),
            opponents: None,
            application_len: Self::default_application_len(),
            seed: Self::default_seed(),
            parallel: false,
        }
    }
}

/// Per-university win counts for the focal applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    wins: Vec<u64>,
    trials: u64,
    unmatched: u64,
}

impl Tally {
    #[must_use]
    pub fn new(universities: usize) -> Self {
        Self {
            wins: vec![0; universities],
            trials: 0,
            unmatched: 0,
        }
    }

    /// Record one trial outcome; `None` is an unmatched trial.
    pub fn record(&mut self, seat: Option<usize>) {
        self.trials += 1;
        match seat.and_then(|university| self.wins.get_mut(university)) {
            Some(count) => *count += 1,
            None => self.unmatched += 1,
        }
    }

    /// Add another tally's counts into this one.
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.wins.iter_mut().zip(&other.wins) {
            *mine += theirs;
        }
        self.trials += other.trials;
        self.unmatched += other.unmatched;
    }

    #[must_use]
    pub fn merged(mut self, other: &Self) -> Self {
        self.merge(other);
        self
    }

    #[must_use]
    pub fn wins(&self, university: usize) -> u64 {
        self.wins.get(university).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn win_counts(&self) -> &[u64] {
        &self.wins
    }

    #[must_use]
    pub const fn trials(&self) -> u64 {
        self.trials
    }

    #[must_use]
    pub const fn unmatched(&self) -> u64 {
        self.unmatched
    }

    #[must_use]
    pub const fn matched(&self) -> u64 {
        self.trials.saturating_sub(self.unmatched)
    }

    /// Fraction of trials in which the focal applicant was matched.
    #[must_use]
    pub fn match_rate(&self) -> f64 {
        ratio(self.matched(), self.trials)
    }

    /// Estimated probability of landing at `university`.
    #[must_use]
    pub fn share(&self, university: usize) -> f64 {
        ratio(self.wins(university), self.trials)
    }

    /// University with the most wins, ties to the lowest index; `None` when
    /// the focal applicant never matched.
    #[must_use]
    pub fn best(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (university, &count) in self.wins.iter().enumerate() {
            if count == 0 {
                continue;
            }
            match best {
                Some((_, leader)) if leader >= count => {}
                _ => best = Some((university, count)),
            }
        }
        best.map(|(university, _)| university)
    }
}

/// Run a single trial: fresh opponents plus the focal entrant, cleared once.
///
/// Returns the focal applicant's seat, or `None` when unmatched.
///
/// # Errors
///
/// Returns an error if the opponent strategy produces an invalid list.
pub fn run_trial<R, S>(
    market: &Market,
    focal: &Entrant,
    opponents: usize,
    list_len: usize,
    strategy: &S,
    rng: &mut R,
) -> Result<Option<usize>, MarketError>
where
    R: rand::Rng + ?Sized,
    S: Strategy + ?Sized,
{
    let mut entrants = generate_opponents(market, opponents, list_len, strategy, rng)?;
    let focal_id = entrants.len();
    entrants.push(focal.clone());
    let clearing = clear_market(market.university_count(), &entrants);
    Ok(clearing.assignment.university_of(focal_id))
}

/// Resumable Monte-Carlo evaluation for one focal applicant.
pub struct MonteCarloEvaluator<'a> {
    market: &'a Market,
    focal: Entrant,
    config: EvaluationConfig,
    opponent_strategy: Box<dyn Strategy>,
    tally: Tally,
    completed: u64,
}

impl<'a> MonteCarloEvaluator<'a> {
    /// Prepare an evaluation; the focal applicant submits its selectivity ranking.
    ///
    /// # Errors
    ///
    /// Returns an error if the market, applicant, or configuration is invalid.
    pub fn new(
        market: &'a Market,
        focal: &Applicant,
        config: EvaluationConfig,
    ) -> Result<Self, MarketError> {
        market.validate()?;
        market.check_applicant(focal)?;
        config.validate()?;
        let ranked =
            SelectivityStrategy.rank_universities(market, focal, config.application_len);
        let list = ApplicationList::new(&ranked, market.university_count())?;
        Ok(Self {
            market,
            focal: Entrant::new(focal.clone(), list),
            tally: Tally::new(market.university_count()),
            config,
            opponent_strategy: Box::new(LogisticStrategy),
            completed: 0,
        })
    }

    /// Swap the heuristic used to build opponents' lists.
    #[must_use]
    pub fn with_opponent_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.opponent_strategy = strategy;
        self
    }

    #[must_use]
    pub fn focal_list(&self) -> &ApplicationList {
        &self.focal.list
    }

    #[must_use]
    pub const fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    #[must_use]
    pub fn opponent_strategy(&self) -> &dyn Strategy {
        self.opponent_strategy.as_ref()
    }

    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.completed
    }

    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.config.trials.saturating_sub(self.completed)
    }

    #[must_use]
    pub const fn tally(&self) -> &Tally {
        &self.tally
    }

    #[must_use]
    pub fn into_tally(self) -> Tally {
        self.tally
    }

    fn trial(&self, index: u64) -> Result<Option<usize>, MarketError> {
        let mut rng = trial_stream(self.config.seed, index);
        let seat = run_trial(
            self.market,
            &self.focal,
            self.config.opponent_count(self.market.university_count()),
            self.config.application_len,
            self.opponent_strategy.as_ref(),
            &mut rng,
        )?;
        log::trace!("trial {index}: seat {seat:?} after {} draws", rng.draws());
        Ok(seat)
    }

    /// Advance by `count` trials. Trial `i` always uses the same random
    /// stream, so batching and parallelism do not change the tally.
    ///
    /// # Errors
    ///
    /// Returns an error if a trial produces an invalid opponent list; trials
    /// merged before the failing batch stay in the tally.
    pub fn run_trials(&mut self, count: u64) -> Result<&Tally, MarketError> {
        let start = self.completed;
        let end = start.saturating_add(count);
        let universities = self.market.university_count();

        let this = &*self;
        let batch = if this.config.parallel {
            (start..end)
                .into_par_iter()
                .map(|index| this.trial(index))
                .try_fold(
                    || Tally::new(universities),
                    |mut tally, outcome| {
                        tally.record(outcome?);
                        Ok::<Tally, MarketError>(tally)
                    },
                )
                .try_reduce(|| Tally::new(universities), |left, right| Ok(left.merged(&right)))?
        } else {
            let mut tally = Tally::new(universities);
            for index in start..end {
                tally.record(this.trial(index)?);
            }
            tally
        };

        self.tally.merge(&batch);
        self.completed = end;
        Ok(&self.tally)
    }

    /// Run every remaining configured trial.
    ///
    /// # Errors
    ///
    /// Returns an error if a trial produces an invalid opponent list.
    pub fn run(&mut self) -> Result<&Tally, MarketError> {
        self.run_with_progress(1, |_, _, _| ControlFlow::Continue(()))
    }

    /// Run the remaining trials in up to `batches` chunks, reporting
    /// `(tally, completed, total)` after each. Returning `Break` stops
    /// between chunks with the tally intact.
    ///
    /// # Errors
    ///
    /// Returns an error if a trial produces an invalid opponent list.
    pub fn run_with_progress<F>(
        &mut self,
        batches: u64,
        mut on_progress: F,
    ) -> Result<&Tally, MarketError>
    where
        F: FnMut(&Tally, u64, u64) -> ControlFlow<()>,
    {
        let total = self.config.trials;
        let chunk = self.remaining().div_ceil(batches.max(1)).max(1);
        while self.remaining() > 0 {
            let step = chunk.min(self.remaining());
            self.run_trials(step)?;
            if on_progress(&self.tally, self.completed, total).is_break() {
                log::debug!("evaluation stopped after {} of {total} trials", self.completed);
                break;
            }
        }
        self.log_summary();
        Ok(&self.tally)
    }

    fn log_summary(&self) {
        if self.tally.trials() > 0 && self.tally.matched() == 0 {
            log::warn!(
                "focal applicant unmatched in all {} trials",
                self.tally.trials()
            );
        }
        log::debug!(
            "evaluated {} trials with {} opponents ({}): match rate {:.3}, best {:?}",
            self.tally.trials(),
            self.config.opponent_count(self.market.university_count()),
            self.opponent_strategy.name(),
            self.tally.match_rate(),
            self.tally.best()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> Market {
        let qualities = (0..12).map(|i| 20.0 - f64::from(i)).collect();
        Market::new(10.0, 1.0, 10.0, qualities).unwrap()
    }

    fn focal(aptitude: f64) -> Applicant {
        Applicant::new(aptitude, vec![5.0; 12])
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config = EvaluationConfig::from_json(r#"{"trials": 40}"#).unwrap();
        assert_eq!(config.trials, 40);
        assert_eq!(config.application_len, 10);
        assert_eq!(config.seed, 1337);
        assert_eq!(config.opponents, None);
        assert!(!config.parallel);
        assert_eq!(config.opponent_count(12), 11);
        assert_eq!(EvaluationConfig::default().trials, 500);
    }

    #[test]
    fn config_rejects_zero_trials_and_empty_lists() {
        let zero_trials = EvaluationConfig {
            trials: 0,
            ..EvaluationConfig::default()
        };
        assert!(matches!(
            zero_trials.validate(),
            Err(MarketError::InvalidConfig { field: "trials", .. })
        ));
        let empty_list = EvaluationConfig {
            application_len: 0,
            ..EvaluationConfig::default()
        };
        assert!(empty_list.validate().is_err());
    }

    #[test]
    fn tally_best_prefers_lowest_index_on_ties() {
        let mut tally = Tally::new(4);
        assert_eq!(tally.best(), None);
        tally.record(Some(2));
        tally.record(Some(1));
        tally.record(None);
        assert_eq!(tally.best(), Some(1));
        tally.record(Some(2));
        assert_eq!(tally.best(), Some(2));
        assert_eq!(tally.trials(), 4);
        assert_eq!(tally.unmatched(), 1);
        assert!((tally.match_rate() - 0.75).abs() < f64::EPSILON);
        assert!((tally.share(2) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn tally_merge_is_summation() {
        let mut left = Tally::new(3);
        left.record(Some(0));
        left.record(None);
        let mut right = Tally::new(3);
        right.record(Some(0));
        right.record(Some(2));
        let merged = left.clone().merged(&right);
        assert_eq!(merged.win_counts(), &[2, 0, 1]);
        assert_eq!(merged.trials(), 4);
        assert_eq!(merged, right.merged(&left));
    }

    #[test]
    fn trial_draws_scale_with_the_opponent_population() {
        let market = market();
        let entrant = Entrant::new(
            focal(5.0),
            ApplicationList::new(&[0, 1, 2], market.university_count()).unwrap(),
        );
        let draws = |opponents: usize| {
            let mut rng = trial_stream(5, 0);
            run_trial(&market, &entrant, opponents, 10, &LogisticStrategy, &mut rng).unwrap();
            rng.draws()
        };
        assert_eq!(draws(0), 0);
        // One aptitude plus a synergy per university for each opponent.
        assert!(draws(3) >= 3 * 13);
        assert!(draws(6) > draws(3));
    }

    #[test]
    fn inconsistent_deserialized_tally_does_not_underflow() {
        let tally: Tally =
            serde_json::from_str(r#"{"wins":[0,0],"trials":1,"unmatched":3}"#).unwrap();
        assert_eq!(tally.matched(), 0);
        assert!(tally.match_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn dominant_applicant_lands_in_first_choice() {
        let market = market();
        let star = focal(1_000.0);
        let config = EvaluationConfig {
            trials: 25,
            ..EvaluationConfig::default()
        };
        let mut evaluator = MonteCarloEvaluator::new(&market, &star, config).unwrap();
        let first_choice = evaluator.focal_list().as_slice()[0];
        let tally = evaluator.run().unwrap();
        assert_eq!(tally.trials(), 25);
        assert_eq!(tally.wins(first_choice), 25);
        assert_eq!(tally.best(), Some(first_choice));
    }

    #[test]
    fn batching_and_parallelism_do_not_change_results() {
        let market = market();
        let applicant = focal(6.0);
        let config = EvaluationConfig {
            trials: 60,
            seed: 99,
            ..EvaluationConfig::default()
        };

        let mut whole = MonteCarloEvaluator::new(&market, &applicant, config.clone()).unwrap();
        let whole_tally = whole.run().unwrap().clone();

        let mut stepped = MonteCarloEvaluator::new(&market, &applicant, config.clone()).unwrap();
        stepped.run_trials(17).unwrap();
        stepped.run_trials(43).unwrap();
        assert_eq!(stepped.tally(), &whole_tally);

        let parallel_config = EvaluationConfig {
            parallel: true,
            ..config
        };
        let mut parallel = MonteCarloEvaluator::new(&market, &applicant, parallel_config).unwrap();
        assert_eq!(parallel.run().unwrap(), &whole_tally);
    }

    #[test]
    fn progress_break_stops_between_batches() {
        let market = market();
        let applicant = focal(6.0);
        let config = EvaluationConfig {
            trials: 100,
            ..EvaluationConfig::default()
        };
        let mut evaluator = MonteCarloEvaluator::new(&market, &applicant, config).unwrap();
        let mut calls = 0;
        let tally = evaluator
            .run_with_progress(4, |_, completed, total| {
                calls += 1;
                assert_eq!(total, 100);
                if completed >= 50 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(tally.trials(), 50);
        assert_eq!(calls, 2);
        assert_eq!(evaluator.remaining(), 50);
    }

    #[test]
    fn misaligned_focal_applicant_is_rejected() {
        let market = market();
        let short = Applicant::new(1.0, vec![0.0; 3]);
        assert!(matches!(
            MonteCarloEvaluator::new(&market, &short, EvaluationConfig::default()),
            Err(MarketError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn opponent_strategy_is_pluggable() {
        let market = market();
        let applicant = focal(6.0);
        let config = EvaluationConfig {
            trials: 10,
            ..EvaluationConfig::default()
        };
        let mut evaluator = MonteCarloEvaluator::new(&market, &applicant, config)
            .unwrap()
            .with_opponent_strategy(Box::new(SelectivityStrategy));
        assert_eq!(evaluator.opponent_strategy().name(), "selectivity");
        assert_eq!(evaluator.run().unwrap().trials(), 10);
    }
}
