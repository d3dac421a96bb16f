//! Synthetic competitor populations.
use rand::Rng;

use crate::clearing::{ApplicationList, Entrant};
use crate::market::{Applicant, Market, MarketError};
use crate::strategy::Strategy;

/// Draw a uniform value on `[0, ceiling]`; a zero ceiling yields 0.
fn draw_scaled<R: Rng + ?Sized>(rng: &mut R, ceiling: f64) -> f64 {
    if ceiling > 0.0 {
        rng.gen_range(0.0..=ceiling)
    } else {
        0.0
    }
}

/// Draw one applicant: aptitude on `[0, A]`, an independent synergy on
/// `[0, W]` for every university.
pub fn draw_applicant<R: Rng + ?Sized>(market: &Market, rng: &mut R) -> Applicant {
    let aptitude = draw_scaled(rng, market.aptitude_scale);
    let synergies = (0..market.university_count())
        .map(|_| draw_scaled(rng, market.synergy_scale))
        .collect();
    Applicant::new(aptitude, synergies)
}

/// Generate `count` fresh competitors, each submitting the first
/// `list_len` universities chosen by `strategy`.
///
/// # Errors
///
/// Returns an error if `strategy` produces a list with duplicate or
/// out-of-range universities.
pub fn generate_opponents<R, S>(
    market: &Market,
    count: usize,
    list_len: usize,
    strategy: &S,
    rng: &mut R,
) -> Result<Vec<Entrant>, MarketError>
where
    R: Rng + ?Sized,
    S: Strategy + ?Sized,
{
    let universities = market.university_count();
    (0..count)
        .map(|_| {
            let applicant = draw_applicant(market, rng);
            let ranked = strategy.rank_universities(market, &applicant, list_len);
            let list = ApplicationList::new(&ranked, universities)?;
            Ok(Entrant::new(applicant, list))
        })
        .collect()
}
