//! Markets to evaluate: loaded from JSON or synthesized from a seed.
use anyhow::{Context, Result, bail};
use match_market::rng::derive_stream_seed;
use match_market::{Applicant, Market, draw_applicant};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A market together with the applicant choosing targets in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketScenario {
    #[serde(default = "MarketScenario::default_name")]
    pub name: String,
    pub market: Market,
    pub focal: Applicant,
}

/// Parameters for a market synthesized from a seed.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisParams {
    pub universities: usize,
    pub aptitude_scale: f64,
    pub quality_weight: f64,
    pub synergy_scale: f64,
}

impl MarketScenario {
    fn default_name() -> String {
        "scenario".to_string()
    }

    /// Load and validate a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the market
    /// and focal applicant are inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let scenario: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        scenario.market.validate()?;
        scenario.market.check_applicant(&scenario.focal)?;
        Ok(scenario)
    }

    /// Draw a market and focal applicant from `seed`.
    ///
    /// Qualities are uniform on `[0, universities]` and listed best first; the
    /// focal applicant is drawn like any competitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters describe an invalid market.
    pub fn synthesize(params: SynthesisParams, seed: u64) -> Result<Self> {
        let ceiling = match_market::numbers::usize_to_f64(params.universities);
        let mut rng = ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"scenario"));
        let mut qualities: Vec<f64> = (0..params.universities)
            .map(|_| rng.gen_range(0.0..=ceiling.max(1.0)))
            .collect();
        qualities.sort_by(|a, b| b.total_cmp(a));
        let market = Market::new(
            params.aptitude_scale,
            params.quality_weight,
            params.synergy_scale,
            qualities,
        )?;
        let focal = draw_applicant(&market, &mut rng);
        log::debug!(
            "synthesized {} universities for seed {seed}, focal aptitude {:.3}",
            params.universities,
            focal.aptitude()
        );
        Ok(Self {
            name: format!("synthetic-{seed}"),
            market,
            focal,
        })
    }
}

/// Resolve CLI seed tokens into distinct seeds, keeping first-seen order.
///
/// Negative integers map to their magnitude; an empty list falls back to
/// `fallback`.
///
/// # Errors
///
/// Returns an error if a token is not an integer.
pub fn resolve_seeds(tokens: &[String], fallback: u64) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for token in tokens {
        let seed = if let Ok(value) = token.parse::<u64>() {
            value
        } else if let Ok(value) = token.parse::<i64>() {
            value.unsigned_abs()
        } else {
            bail!("Unrecognized seed token: {token}");
        };
        if seen.insert(seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        seeds.push(fallback);
    }
    Ok(seeds)
}
