// ********* Identifiers ***********

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidPeriodSnafu, VotingError};
use snafu::ensure;

/// Identifier of a votable item, assigned by the store.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CandidateId(pub u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VoteId(pub u64);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ResultId(pub u64);

/// The identity of a voter, as handed over by the identity provider.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VoterId(pub String);

impl VoterId {
    pub fn new(s: &str) -> VoterId {
        VoterId(s.to_string())
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ********* Stored records ***********

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    /// Only enabled candidates are offered on an open ballot.
    pub enabled: bool,
}

/// The singleton record describing the current voting period.
///
/// `closed_at` is only meaningful after a close that followed an open.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct VotingPeriod {
    #[serde(rename = "isOpen")]
    pub is_open: bool,
    #[serde(rename = "openedAt")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(rename = "closedAt")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastChangedAt")]
    pub last_changed_at: Option<DateTime<Utc>>,
}

impl VotingPeriod {
    pub fn state(&self) -> PeriodState {
        if self.is_open {
            PeriodState::Open
        } else {
            PeriodState::Closed
        }
    }

    /// The window of the last completed period, if the period is closed and
    /// was opened before.
    pub fn last_window(&self) -> Option<PeriodWindow> {
        if self.is_open {
            return None;
        }
        match (self.opened_at, self.closed_at) {
            (Some(opened_at), Some(closed_at)) => PeriodWindow::new(opened_at, closed_at).ok(),
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum PeriodState {
    Open,
    Closed,
}

impl Display for PeriodState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodState::Open => write!(f, "open"),
            PeriodState::Closed => write!(f, "closed"),
        }
    }
}

/// One ballot entry. A ballot is stored as two of these, sharing `voter`
/// and `cast_at`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub voter: VoterId,
    pub candidate: CandidateId,
    #[serde(rename = "castAt")]
    pub cast_at: DateTime<Utc>,
}

/// A vote that has not been assigned an identifier yet.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NewVote {
    pub voter: VoterId,
    pub candidate: CandidateId,
    pub cast_at: DateTime<Utc>,
}

/// The closed interval `[opened_at, closed_at]` of one period.
///
/// It can only be built with `opened_at <= closed_at`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriodWindow")]
pub struct PeriodWindow {
    #[serde(rename = "openedAt")]
    opened_at: DateTime<Utc>,
    #[serde(rename = "closedAt")]
    closed_at: DateTime<Utc>,
}

impl PeriodWindow {
    pub fn new(
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    ) -> Result<PeriodWindow, VotingError> {
        ensure!(
            opened_at <= closed_at,
            InvalidPeriodSnafu {
                opened_at,
                closed_at
            }
        );
        Ok(PeriodWindow {
            opened_at,
            closed_at,
        })
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn closed_at(&self) -> DateTime<Utc> {
        self.closed_at
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.opened_at <= t && t <= self.closed_at
    }
}

impl Display for PeriodWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.opened_at.to_rfc3339(),
            self.closed_at.to_rfc3339()
        )
    }
}

#[derive(Deserialize)]
struct RawPeriodWindow {
    #[serde(rename = "openedAt")]
    opened_at: DateTime<Utc>,
    #[serde(rename = "closedAt")]
    closed_at: DateTime<Utc>,
}

impl TryFrom<RawPeriodWindow> for PeriodWindow {
    type Error = VotingError;

    fn try_from(raw: RawPeriodWindow) -> Result<Self, Self::Error> {
        PeriodWindow::new(raw.opened_at, raw.closed_at)
    }
}

/// How a winner was determined.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    MostVotes,
    Random,
}

impl ReasonCode {
    pub fn key(&self) -> &'static str {
        match self {
            ReasonCode::MostVotes => "MostVotes",
            ReasonCode::Random => "Random",
        }
    }
}

impl Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// The winner picked by the tally engine, before it is stored.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Decision {
    pub winner: CandidateId,
    pub reason: ReasonCode,
    /// The number of votes the winner (and every candidate tied with it) received.
    pub top_count: u64,
}

/// A stored, immutable result. It always points back at the period it resolved.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VotingResult {
    pub id: ResultId,
    pub winner: CandidateId,
    pub reason: ReasonCode,
    #[serde(rename = "computedAt")]
    pub computed_at: DateTime<Utc>,
    pub period: PeriodWindow,
}

// ******** Output data structures *********

/// One line of the per-candidate breakdown of a period.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyEntry {
    pub candidate: CandidateId,
    pub name: String,
    pub votes: u64,
}

/// The outcome of the last closed period.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PeriodOutcome {
    Decided(VotingResult),
    /// Nobody voted during the period. No result is recorded in that case.
    NoVotes(PeriodWindow),
}

// ********* Configuration **********

/// The human-readable explanations attached to each reason code.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReasonTexts {
    #[serde(rename = "mostVotes")]
    pub most_votes: String,
    pub random: String,
}

impl ReasonTexts {
    pub fn text(&self, reason: ReasonCode) -> &str {
        match reason {
            ReasonCode::MostVotes => self.most_votes.as_str(),
            ReasonCode::Random => self.random.as_str(),
        }
    }
}

impl Default for ReasonTexts {
    fn default() -> Self {
        ReasonTexts {
            most_votes: "The winner received the most votes.".to_string(),
            random: "Several candidates tied for the most votes; the winner was drawn at random among them.".to_string(),
        }
    }
}

/// The caller of an operation, as vouched for by the identity provider.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Identity {
    pub voter: VoterId,
    pub is_admin: bool,
}

impl Identity {
    pub fn voter(name: &str) -> Identity {
        Identity {
            voter: VoterId::new(name),
            is_admin: false,
        }
    }

    pub fn admin(name: &str) -> Identity {
        Identity {
            voter: VoterId::new(name),
            is_admin: true,
        }
    }
}
