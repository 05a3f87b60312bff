//! Acceptance of ballots.
//!
//! A voter may vote once per period. The check compares the voter's most
//! recent vote with the opening time of the current period: a vote cast
//! strictly before the period opened belongs to an earlier period.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use snafu::{ensure, ResultExt};

use crate::config::*;
use crate::error::*;
use crate::registry;
use crate::store::Store;

/// The number of distinct candidates on a ballot.
pub const BALLOT_SIZE: usize = 2;

/// Checks that the voter has not voted since `opened_at`.
pub(crate) fn check_eligible<S: Store>(
    store: &S,
    opened_at: DateTime<Utc>,
    voter: &VoterId,
) -> CoreResult<()> {
    let latest = store.latest_vote_of(voter).context(StorageSnafu {})?;
    debug!(
        "check_eligible: {}: latest vote {:?}, period opened at {}",
        voter,
        latest.as_ref().map(|v| v.cast_at),
        opened_at
    );
    match latest {
        Some(v) if v.cast_at >= opened_at => IneligibleBallotSnafu {
            reason: Ineligibility::AlreadyVoted {
                voter: voter.clone(),
                cast_at: v.cast_at,
            },
        }
        .fail(),
        _ => Ok(()),
    }
}

fn opened_at_of(period: &VotingPeriod) -> CoreResult<DateTime<Utc>> {
    match (period.is_open, period.opened_at) {
        (true, Some(t)) => Ok(t),
        _ => StateViolationSnafu {
            state: period.state(),
            action: "cast a ballot",
        }
        .fail(),
    }
}

/// Turns the candidate names of a ballot into ids.
///
/// The period and the number of names are checked before any name is
/// looked up, in the same order as for a ballot given by ids.
pub(crate) fn resolve_choices<S: Store>(
    store: &S,
    period: &VotingPeriod,
    names: &[String],
) -> CoreResult<Vec<CandidateId>> {
    opened_at_of(period)?;
    ensure!(
        names.len() == BALLOT_SIZE,
        IneligibleBallotSnafu {
            reason: Ineligibility::WrongCandidateCount {
                given: names.len()
            },
        }
    );
    names
        .iter()
        .map(|n| registry::find_by_name(store, n).map(|c| c.id))
        .collect()
}

/// Validates the choices of a ballot against the registry.
fn check_choices<S: Store>(store: &S, choices: &[CandidateId]) -> CoreResult<()> {
    ensure!(
        choices.len() == BALLOT_SIZE,
        IneligibleBallotSnafu {
            reason: Ineligibility::WrongCandidateCount {
                given: choices.len()
            },
        }
    );
    let mut seen: HashSet<CandidateId> = HashSet::new();
    for cid in choices.iter() {
        ensure!(
            seen.insert(*cid),
            IneligibleBallotSnafu {
                reason: Ineligibility::DuplicateCandidate { candidate: *cid },
            }
        );
        let c = registry::get(store, *cid)?;
        ensure!(
            c.enabled,
            IneligibleBallotSnafu {
                reason: Ineligibility::DisabledCandidate { candidate: *cid },
            }
        );
    }
    Ok(())
}

/// Records a ballot as one vote per choice, all stamped with `now`.
///
/// The caller holds the service lock, so the eligibility checks and the
/// insert cannot interleave with another ballot or a transition.
pub(crate) fn cast_ballot<S: Store>(
    store: &mut S,
    period: &VotingPeriod,
    voter: &VoterId,
    choices: &[CandidateId],
    now: DateTime<Utc>,
) -> CoreResult<Vec<Vote>> {
    let res = try_cast_ballot(store, period, voter, choices, now);
    if let Err(e) = &res {
        warn!("cast_ballot: {}: {}", voter, e);
    }
    res
}

fn try_cast_ballot<S: Store>(
    store: &mut S,
    period: &VotingPeriod,
    voter: &VoterId,
    choices: &[CandidateId],
    now: DateTime<Utc>,
) -> CoreResult<Vec<Vote>> {
    let opened_at = opened_at_of(period)?;
    check_choices(store, choices)?;
    check_eligible(store, opened_at, voter)?;

    let new_votes: Vec<NewVote> = choices
        .iter()
        .map(|cid| NewVote {
            voter: voter.clone(),
            candidate: *cid,
            cast_at: now,
        })
        .collect();
    let votes = store.insert_votes(&new_votes).context(StorageSnafu {})?;
    info!(
        "cast_ballot: {} voted for {:?} at {}",
        voter,
        choices,
        now.to_rfc3339()
    );
    Ok(votes)
}

/// The votes cast inside the window, bounds included.
pub(crate) fn votes_in<S: Store>(store: &S, window: &PeriodWindow) -> CoreResult<Vec<Vote>> {
    store
        .votes_between(window.opened_at(), window.closed_at())
        .context(StorageSnafu {})
}
