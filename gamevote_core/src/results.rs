//! Reading back the results of closed periods.

use log::{debug, warn};
use snafu::ResultExt;

use crate::config::*;
use crate::error::*;
use crate::ledger;
use crate::registry;
use crate::store::Store;
use crate::tally::compute_tally;

/// What is shown after a period closed: the winner, why it won, and the
/// counts of every candidate that received a vote.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResultsView {
    pub result: VotingResult,
    pub winner_name: String,
    pub explanation: String,
    pub breakdown: Vec<TallyEntry>,
}

impl ResultsView {
    /// Checks that the breakdown supports the stored winner and reason.
    ///
    /// The winner must have the highest count, and the reason must be
    /// `MostVotes` exactly when nobody else shares that count.
    pub fn is_consistent(&self) -> bool {
        let top_count = match self.breakdown.first() {
            Some(e) => e.votes,
            None => return false,
        };
        let top: Vec<CandidateId> = self
            .breakdown
            .iter()
            .filter(|e| e.votes == top_count)
            .map(|e| e.candidate)
            .collect();
        let expected_reason = if top.len() == 1 {
            ReasonCode::MostVotes
        } else {
            ReasonCode::Random
        };
        top.contains(&self.result.winner) && self.result.reason == expected_reason
    }
}

/// The result with the latest computation time.
pub(crate) fn latest<S: Store>(store: &S) -> CoreResult<Option<VotingResult>> {
    let results = store.results().context(StorageSnafu {})?;
    Ok(results
        .into_iter()
        .max_by_key(|r| (r.computed_at, r.id)))
}

/// The result recorded for this exact window, if any.
pub(crate) fn result_for<S: Store>(
    store: &S,
    window: &PeriodWindow,
) -> CoreResult<Option<VotingResult>> {
    let results = store.results().context(StorageSnafu {})?;
    Ok(results
        .into_iter()
        .filter(|r| r.period == *window)
        .max_by_key(|r| (r.computed_at, r.id)))
}

/// Recomputes the per-candidate counts of a window, the same way the tally
/// engine grouped them when the period closed.
pub(crate) fn tally_for_period<S: Store>(
    store: &S,
    window: &PeriodWindow,
) -> CoreResult<Vec<TallyEntry>> {
    let votes = ledger::votes_in(store, window)?;
    let candidates = store.candidates().context(StorageSnafu {})?;
    let breakdown = compute_tally(&votes).breakdown(&candidates);
    debug!("tally_for_period: {}: {:?}", window, breakdown);
    Ok(breakdown)
}

/// The outcome of a closed window.
///
/// A window without votes has no result, by construction. A window with
/// votes but no result is an incomplete tally.
pub(crate) fn outcome<S: Store>(store: &S, window: &PeriodWindow) -> CoreResult<PeriodOutcome> {
    if let Some(r) = result_for(store, window)? {
        return Ok(PeriodOutcome::Decided(r));
    }
    if ledger::votes_in(store, window)?.is_empty() {
        return Ok(PeriodOutcome::NoVotes(*window));
    }
    warn!("outcome: period {} has votes but no result", window);
    IncompleteTallySnafu { window: *window }.fail()
}

pub(crate) fn view<S: Store>(
    store: &S,
    result: VotingResult,
    texts: &ReasonTexts,
) -> CoreResult<ResultsView> {
    let winner_name = match registry::get(store, result.winner) {
        Ok(c) => c.name,
        Err(VotingError::NotFound { .. }) => result.winner.to_string(),
        Err(e) => return Err(e),
    };
    let breakdown = tally_for_period(store, &result.period)?;
    let v = ResultsView {
        explanation: texts.text(result.reason).to_string(),
        winner_name,
        breakdown,
        result,
    };
    if !v.is_consistent() {
        warn!(
            "view: result {:?} does not match the recomputed tally {:?}",
            v.result, v.breakdown
        );
    }
    Ok(v)
}
