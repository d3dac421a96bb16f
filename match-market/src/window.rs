//! Contiguous target window around the best realistic university.
use crate::market::MarketError;

/// Number of universities in a final target list.
pub const WINDOW_LEN: usize = 10;

/// Entries kept ahead of the best target when the ranking allows it.
pub const WINDOW_LEAD: usize = 6;

/// First index of the window centred on `position` in a ranking of `len`.
///
/// # Errors
///
/// Returns an error if `len < WINDOW_LEN` or `position` is out of range.
pub fn window_start(position: usize, len: usize) -> Result<usize, MarketError> {
    if len < WINDOW_LEN {
        return Err(MarketError::InsufficientUniversities {
            required: WINDOW_LEN,
            available: len,
        });
    }
    if position >= len {
        return Err(MarketError::PositionOutOfRange { position, len });
    }
    Ok(position.saturating_sub(WINDOW_LEAD).min(len - WINDOW_LEN))
}

/// Slice of exactly [`WINDOW_LEN`] entries of `ranking` around `position`.
///
/// # Errors
///
/// Returns an error if the ranking is shorter than [`WINDOW_LEN`] or
/// `position` is out of range.
pub fn select_window(ranking: &[usize], position: usize) -> Result<Vec<usize>, MarketError> {
    let start = window_start(position, ranking.len())?;
    Ok(ranking[start..start + WINDOW_LEN].to_vec())
}

/// Position of `university` within `ranking`.
#[must_use]
pub fn position_of(ranking: &[usize], university: usize) -> Option<usize> {
    ranking.iter().position(|&ranked| ranked == university)
}
