//! Deferred-acceptance market clearing with capacity one on both sides.
//!
//! Every university holds a queue of proposals from the applicants that
//! listed it, sorted ascending so the strongest applicant sits at the end.
//! Unassigned universities pop their best remaining proposal each sweep; an
//! applicant takes the offer when unassigned or when the offering university
//! ranks strictly higher in its own list, releasing its previous seat.
//! Queues only shrink, so the sweep loop terminates.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;

use crate::market::{Applicant, MarketError};

/// Rank of a university that does not appear in an application list.
pub const UNRANKED: usize = usize::MAX;

/// Inline capacity of an application list.
pub const TYPICAL_LIST_LEN: usize = 10;

/// Ordered, duplicate-free list of universities, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationList {
    universities: SmallVec<[usize; TYPICAL_LIST_LEN]>,
}

impl ApplicationList {
    /// Build a list for a market of `universities` seats.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is repeated or outside `0..universities`.
    pub fn new(entries: &[usize], universities: usize) -> Result<Self, MarketError> {
        let mut seen = vec![false; universities];
        let mut list = SmallVec::with_capacity(entries.len());
        for &university in entries {
            match seen.get_mut(university) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(MarketError::InvalidApplicationList {
                        university,
                        universities,
                    });
                }
            }
            list.push(university);
        }
        Ok(Self { universities: list })
    }

    /// 0-based position of `university`, or [`UNRANKED`] when absent.
    #[must_use]
    pub fn rank(&self, university: usize) -> usize {
        self.universities
            .iter()
            .position(|&listed| listed == university)
            .unwrap_or(UNRANKED)
    }

    #[must_use]
    pub fn contains(&self, university: usize) -> bool {
        self.rank(university) != UNRANKED
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.universities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.universities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.universities.is_empty()
    }
}

/// An applicant taking part in one clearing run together with its submitted list.
#[derive(Debug, Clone)]
pub struct Entrant {
    pub applicant: Applicant,
    pub list: ApplicationList,
}

impl Entrant {
    #[must_use]
    pub const fn new(applicant: Applicant, list: ApplicationList) -> Self {
        Self { applicant, list }
    }
}

/// A (combined score, applicant) pair queued at one university.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    pub score: f64,
    pub applicant: usize,
}

impl Proposal {
    /// University-side preference: higher score wins, equal scores favour the lower id.
    #[must_use]
    pub fn preference(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.applicant.cmp(&self.applicant))
    }
}

/// Capacity-one matching between applicants and universities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    by_applicant: Vec<Option<usize>>,
    by_university: Vec<Option<usize>>,
}

impl Assignment {
    fn empty(applicants: usize, universities: usize) -> Self {
        Self {
            by_applicant: vec![None; applicants],
            by_university: vec![None; universities],
        }
    }

    fn assign(&mut self, applicant: usize, university: usize) {
        if let Some(previous) = self.by_applicant[applicant].replace(university) {
            self.by_university[previous] = None;
        }
        self.by_university[university] = Some(applicant);
    }

    /// University held by `applicant`, if any.
    #[must_use]
    pub fn university_of(&self, applicant: usize) -> Option<usize> {
        self.by_applicant.get(applicant).copied().flatten()
    }

    /// Applicant holding `university`, if any.
    #[must_use]
    pub fn applicant_at(&self, university: usize) -> Option<usize> {
        self.by_university.get(university).copied().flatten()
    }

    /// Matched (applicant, university) pairs in applicant order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.by_applicant
            .iter()
            .enumerate()
            .filter_map(|(applicant, seat)| seat.map(|university| (applicant, university)))
    }

    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.by_applicant.iter().flatten().count()
    }
}

/// Result of one clearing run.
#[derive(Debug, Clone)]
pub struct Clearing {
    pub assignment: Assignment,
    /// Sweeps over the universities, including the final no-change sweep.
    pub sweeps: usize,
}

/// Per-university proposal queues, ascending so the preferred applicant is last.
#[must_use]
pub fn proposal_queues(universities: usize, entrants: &[Entrant]) -> Vec<Vec<Proposal>> {
    let mut queues: Vec<Vec<Proposal>> = vec![Vec::new(); universities];
    for (applicant, entrant) in entrants.iter().enumerate() {
        for &university in entrant.list.as_slice() {
            if let Some(queue) = queues.get_mut(university) {
                queue.push(Proposal {
                    score: entrant.applicant.combined_score(university),
                    applicant,
                });
            }
        }
    }
    for queue in &mut queues {
        queue.sort_by(Proposal::preference);
    }
    queues
}

/// Clear the market to a stable fixed point.
///
/// Applicant ids are indices into `entrants`.
#[must_use]
pub fn clear_market(universities: usize, entrants: &[Entrant]) -> Clearing {
    let mut queues = proposal_queues(universities, entrants);
    let mut assignment = Assignment::empty(entrants.len(), universities);
    let mut sweeps = 0usize;

    loop {
        sweeps += 1;
        let mut moved = false;
        for university in 0..universities {
            if assignment.by_university[university].is_some() {
                continue;
            }
            let Some(proposal) = queues[university].pop() else {
                continue;
            };
            moved = true;
            let applicant = proposal.applicant;
            match assignment.by_applicant[applicant] {
                None => assignment.assign(applicant, university),
                Some(current) => {
                    let list = &entrants[applicant].list;
                    if list.rank(university) < list.rank(current) {
                        assignment.assign(applicant, university);
                    }
                }
            }
        }
        if !moved {
            break;
        }
    }

    log::trace!(
        "cleared {} entrants over {universities} universities in {sweeps} sweeps",
        entrants.len()
    );
    Clearing { assignment, sweeps }
}

/// First (applicant, university) pair that would both rather be matched to
/// each other, or `None` when `assignment` is stable for the submitted lists.
#[must_use]
pub fn find_blocking_pair(entrants: &[Entrant], assignment: &Assignment) -> Option<(usize, usize)> {
    for (applicant, entrant) in entrants.iter().enumerate() {
        let current_rank = assignment
            .university_of(applicant)
            .map_or(UNRANKED, |held| entrant.list.rank(held));
        for &university in entrant.list.as_slice() {
            if entrant.list.rank(university) >= current_rank {
                break;
            }
            let challenger = Proposal {
                score: entrant.applicant.combined_score(university),
                applicant,
            };
            let university_prefers = match assignment.applicant_at(university) {
                None => true,
                Some(holder) => {
                    let incumbent = Proposal {
                        score: entrants[holder].applicant.combined_score(university),
                        applicant: holder,
                    };
                    challenger.preference(&incumbent) == Ordering::Greater
                }
            };
            if university_prefers {
                return Some((applicant, university));
            }
        }
    }
    None
}
