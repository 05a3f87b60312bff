//! The persistence contract, and an in-memory implementation of it.
//!
//! The voting logic only relies on point lookups, range queries by
//! timestamp, inserts and updates. Anything that can provide those (a
//! document database, a file snapshot) can back a `VotingService`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::{ensure, Snafu};

use crate::config::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("storage unavailable: {message}"))]
    Unavailable { message: String },

    #[snafu(display("vote references unknown candidate {candidate}"))]
    DanglingCandidate { candidate: CandidateId },
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait Store: Send {
    fn candidate(&self, id: CandidateId) -> StoreResult<Option<Candidate>>;

    fn candidates(&self) -> StoreResult<Vec<Candidate>>;

    fn insert_candidate(&mut self, name: &str, enabled: bool) -> StoreResult<Candidate>;

    /// Returns the updated candidate, or None if no candidate has this id.
    fn set_candidate_enabled(
        &mut self,
        id: CandidateId,
        enabled: bool,
    ) -> StoreResult<Option<Candidate>>;

    /// Inserts all the votes or none of them.
    fn insert_votes(&mut self, votes: &[NewVote]) -> StoreResult<Vec<Vote>>;

    /// The vote of this voter with the latest `cast_at`.
    fn latest_vote_of(&self, voter: &VoterId) -> StoreResult<Option<Vote>>;

    /// All the votes with `from <= cast_at <= to`.
    fn votes_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Vote>>;

    fn period(&self) -> StoreResult<VotingPeriod>;

    fn save_period(&mut self, period: &VotingPeriod) -> StoreResult<()>;

    fn append_result(
        &mut self,
        decision: &Decision,
        computed_at: DateTime<Utc>,
        period: PeriodWindow,
    ) -> StoreResult<VotingResult>;

    fn results(&self) -> StoreResult<Vec<VotingResult>>;
}

/// A store that keeps everything in memory.
///
/// It serializes to JSON as a whole, which is how the command line keeps
/// its state between invocations.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
    period: VotingPeriod,
    results: Vec<VotingResult>,
    #[serde(rename = "nextCandidateId")]
    next_candidate_id: u32,
    #[serde(rename = "nextVoteId")]
    next_vote_id: u64,
    #[serde(rename = "nextResultId")]
    next_result_id: u64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Every vote ever recorded, in insertion order.
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }
}

impl Store for MemoryStore {
    fn candidate(&self, id: CandidateId) -> StoreResult<Option<Candidate>> {
        Ok(self.candidates.iter().find(|c| c.id == id).cloned())
    }

    fn candidates(&self) -> StoreResult<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }

    fn insert_candidate(&mut self, name: &str, enabled: bool) -> StoreResult<Candidate> {
        self.next_candidate_id += 1;
        let c = Candidate {
            id: CandidateId(self.next_candidate_id),
            name: name.to_string(),
            enabled,
        };
        self.candidates.push(c.clone());
        Ok(c)
    }

    fn set_candidate_enabled(
        &mut self,
        id: CandidateId,
        enabled: bool,
    ) -> StoreResult<Option<Candidate>> {
        Ok(self.candidates.iter_mut().find(|c| c.id == id).map(|c| {
            c.enabled = enabled;
            c.clone()
        }))
    }

    fn insert_votes(&mut self, votes: &[NewVote]) -> StoreResult<Vec<Vote>> {
        // Check everything before the first push.
        let known: HashSet<CandidateId> = self.candidates.iter().map(|c| c.id).collect();
        for v in votes.iter() {
            ensure!(
                known.contains(&v.candidate),
                DanglingCandidateSnafu {
                    candidate: v.candidate
                }
            );
        }
        let mut inserted: Vec<Vote> = Vec::with_capacity(votes.len());
        for v in votes.iter() {
            self.next_vote_id += 1;
            inserted.push(Vote {
                id: VoteId(self.next_vote_id),
                voter: v.voter.clone(),
                candidate: v.candidate,
                cast_at: v.cast_at,
            });
        }
        debug!("insert_votes: {:?}", inserted);
        self.votes.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    fn latest_vote_of(&self, voter: &VoterId) -> StoreResult<Option<Vote>> {
        Ok(self
            .votes
            .iter()
            .filter(|v| v.voter == *voter)
            .max_by_key(|v| (v.cast_at, v.id))
            .cloned())
    }

    fn votes_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Vote>> {
        Ok(self
            .votes
            .iter()
            .filter(|v| from <= v.cast_at && v.cast_at <= to)
            .cloned()
            .collect())
    }

    fn period(&self) -> StoreResult<VotingPeriod> {
        Ok(self.period.clone())
    }

    fn save_period(&mut self, period: &VotingPeriod) -> StoreResult<()> {
        self.period = period.clone();
        Ok(())
    }

    fn append_result(
        &mut self,
        decision: &Decision,
        computed_at: DateTime<Utc>,
        period: PeriodWindow,
    ) -> StoreResult<VotingResult> {
        self.next_result_id += 1;
        let r = VotingResult {
            id: ResultId(self.next_result_id),
            winner: decision.winner,
            reason: decision.reason,
            computed_at,
            period,
        };
        self.results.push(r.clone());
        Ok(r)
    }

    fn results(&self) -> StoreResult<Vec<VotingResult>> {
        Ok(self.results.clone())
    }
}
