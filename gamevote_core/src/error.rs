use std::fmt::Display;

use chrono::{DateTime, Utc};
use snafu::Snafu;

use crate::config::{CandidateId, PeriodState, PeriodWindow, VoterId};
use crate::store::StoreError;

/// Why a ballot was refused.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Ineligibility {
    /// A ballot carries exactly two choices.
    WrongCandidateCount { given: usize },
    DuplicateCandidate { candidate: CandidateId },
    DisabledCandidate { candidate: CandidateId },
    /// The voter already has a ballot cast since the period opened.
    AlreadyVoted {
        voter: VoterId,
        cast_at: DateTime<Utc>,
    },
}

impl Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ineligibility::WrongCandidateCount { given } => {
                write!(f, "expected 2 distinct candidates, got {}", given)
            }
            Ineligibility::DuplicateCandidate { candidate } => {
                write!(f, "candidate {} was chosen twice", candidate)
            }
            Ineligibility::DisabledCandidate { candidate } => {
                write!(f, "candidate {} is not enabled", candidate)
            }
            Ineligibility::AlreadyVoted { voter, cast_at } => write!(
                f,
                "{} already voted in this period (at {})",
                voter,
                cast_at.to_rfc3339()
            ),
        }
    }
}

/// Failures reported by the voting operations.
///
/// None of them are fatal: a failed operation leaves the state as it was
/// and can be retried by the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum VotingError {
    #[snafu(display("voting is {state}: cannot {action}"))]
    StateViolation {
        state: PeriodState,
        action: &'static str,
    },

    #[snafu(display("ballot rejected: {reason}"))]
    IneligibleBallot { reason: Ineligibility },

    #[snafu(display("{kind} {id} not found"))]
    NotFound { kind: &'static str, id: String },

    #[snafu(display("a candidate named {name:?} already exists"))]
    NameTaken { name: String },

    #[snafu(display("period {window} is closed but no result was recorded for it"))]
    IncompleteTally { window: PeriodWindow },

    #[snafu(display("{voter} is not allowed to administer voting"))]
    NotAuthorized { voter: VoterId },

    #[snafu(display(
        "a period cannot close at {} before it opened at {}",
        closed_at.to_rfc3339(),
        opened_at.to_rfc3339()
    ))]
    InvalidPeriod {
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    },

    #[snafu(display("storage failure"))]
    Storage { source: StoreError },
}

impl VotingError {
    /// The reason a ballot was refused, if this is a ballot rejection.
    pub fn ineligibility(&self) -> Option<&Ineligibility> {
        match self {
            VotingError::IneligibleBallot { reason } => Some(reason),
            _ => None,
        }
    }
}

pub type CoreResult<T> = Result<T, VotingError>;
