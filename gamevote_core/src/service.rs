use chrono::{DateTime, Utc};
use log::{info, warn};
use parking_lot::Mutex;
use rand::RngCore;
use snafu::ResultExt;

use crate::clock::Clock;
use crate::config::*;
use crate::error::*;
use crate::ledger;
use crate::period::{self, Transition};
use crate::registry;
use crate::results::{self, ResultsView};
use crate::store::Store;
use crate::tally::compute_tally;

/// What a close request did.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Closing {
    AlreadyClosed,
    /// The period closed. `result` is None when nobody voted.
    Closed {
        window: PeriodWindow,
        result: Option<VotingResult>,
    },
}

impl Closing {
    pub fn transition(&self) -> Transition {
        match self {
            Closing::AlreadyClosed => Transition::Unchanged,
            Closing::Closed { .. } => Transition::Changed,
        }
    }
}

pub(crate) struct Inner<S> {
    pub(crate) store: S,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) rng: Box<dyn RngCore + Send>,
    pub(crate) texts: ReasonTexts,
}

/// The voting engine.
///
/// All the state (the period, the ballots, the results) lives in the store.
/// Every operation runs under one lock, so that checking whether the period
/// is open and acting on it happen as one step.
pub struct VotingService<S> {
    inner: Mutex<Inner<S>>,
}

impl<S: Store> VotingService<S> {
    pub(crate) fn from_inner(inner: Inner<S>) -> VotingService<S> {
        VotingService {
            inner: Mutex::new(inner),
        }
    }

    /// Gives the store back, for example to persist it.
    pub fn into_store(self) -> S {
        self.inner.into_inner().store
    }

    pub fn reason_texts(&self) -> ReasonTexts {
        self.inner.lock().texts.clone()
    }

    pub fn status(&self) -> CoreResult<VotingPeriod> {
        let inner = self.inner.lock();
        inner.store.period().context(StorageSnafu {})
    }

    pub fn open(&self) -> CoreResult<Transition> {
        let mut inner = self.inner.lock();
        let current = inner.store.period().context(StorageSnafu {})?;
        let now = inner.clock.now();
        match period::open(&current, now) {
            Some(next) => {
                inner.store.save_period(&next).context(StorageSnafu {})?;
                Ok(Transition::Changed)
            }
            None => Ok(Transition::Unchanged),
        }
    }

    /// Closes the period and records its result.
    ///
    /// The new period state is saved before the tally runs. If recording the
    /// result fails, the period stays closed without a result; `retally`
    /// recovers from that.
    pub fn close(&self) -> CoreResult<Closing> {
        let mut inner = self.inner.lock();
        let current = inner.store.period().context(StorageSnafu {})?;
        let now = inner.clock.now();
        let next = match period::close(&current, now) {
            Some(next) => next,
            None => return Ok(Closing::AlreadyClosed),
        };
        let opened_at = match next.opened_at {
            Some(t) => t,
            None => {
                return StateViolationSnafu {
                    state: PeriodState::Open,
                    action: "close a period that has no opening time",
                }
                .fail()
            }
        };
        let window = PeriodWindow::new(opened_at, now)?;
        inner.store.save_period(&next).context(StorageSnafu {})?;
        let result = tally_window(&mut *inner, &window)?;
        Ok(Closing::Closed { window, result })
    }

    pub fn cast_ballot(&self, voter: &VoterId, choices: &[CandidateId]) -> CoreResult<Vec<Vote>> {
        let mut inner = self.inner.lock();
        let current = inner.store.period().context(StorageSnafu {})?;
        let now = inner.clock.now();
        ledger::cast_ballot(&mut inner.store, &current, voter, choices, now)
    }

    /// Casts a ballot naming the candidates by display name.
    pub fn cast_ballot_by_name(&self, voter: &VoterId, names: &[String]) -> CoreResult<Vec<Vote>> {
        let mut inner = self.inner.lock();
        let current = inner.store.period().context(StorageSnafu {})?;
        let now = inner.clock.now();
        let choices = match ledger::resolve_choices(&inner.store, &current, names) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("cast_ballot_by_name: {}: {}", voter, e);
                return Err(e);
            }
        };
        ledger::cast_ballot(&mut inner.store, &current, voter, &choices, now)
    }

    /// Fails with the reason the voter cannot cast a ballot right now.
    pub fn check_eligibility(&self, voter: &VoterId) -> CoreResult<()> {
        let inner = self.inner.lock();
        let current = inner.store.period().context(StorageSnafu {})?;
        match (current.is_open, current.opened_at) {
            (true, Some(opened_at)) => ledger::check_eligible(&inner.store, opened_at, voter),
            _ => StateViolationSnafu {
                state: current.state(),
                action: "cast a ballot",
            }
            .fail(),
        }
    }

    /// Whether the voter may cast a ballot right now.
    pub fn is_eligible(&self, voter: &VoterId) -> CoreResult<bool> {
        match self.check_eligibility(voter) {
            Ok(()) => Ok(true),
            Err(VotingError::IneligibleBallot { .. }) | Err(VotingError::StateViolation { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// The enabled candidates, sorted by name.
    pub fn list_enabled(&self) -> CoreResult<Vec<Candidate>> {
        let inner = self.inner.lock();
        registry::list_enabled(&inner.store)
    }

    /// Every candidate, sorted by name.
    pub fn list_all(&self) -> CoreResult<Vec<Candidate>> {
        let inner = self.inner.lock();
        registry::list_all(&inner.store)
    }

    pub fn candidate(&self, id: CandidateId) -> CoreResult<Candidate> {
        let inner = self.inner.lock();
        registry::get(&inner.store, id)
    }

    pub fn candidate_by_name(&self, name: &str) -> CoreResult<Candidate> {
        let inner = self.inner.lock();
        registry::find_by_name(&inner.store, name)
    }

    pub fn add_candidate(&self, name: &str, enabled: bool) -> CoreResult<Candidate> {
        let mut inner = self.inner.lock();
        registry::add(&mut inner.store, name, enabled)
    }

    pub fn set_enabled(&self, id: CandidateId, enabled: bool) -> CoreResult<Candidate> {
        let mut inner = self.inner.lock();
        let current = inner.store.period().context(StorageSnafu {})?;
        registry::set_enabled(&mut inner.store, &current, id, enabled)
    }

    pub fn set_enabled_by_name(&self, name: &str, enabled: bool) -> CoreResult<Candidate> {
        let mut inner = self.inner.lock();
        let current = inner.store.period().context(StorageSnafu {})?;
        let id = registry::find_by_name(&inner.store, name)?.id;
        registry::set_enabled(&mut inner.store, &current, id, enabled)
    }

    /// The most recently computed result.
    pub fn latest(&self) -> CoreResult<Option<VotingResult>> {
        let inner = self.inner.lock();
        results::latest(&inner.store)
    }

    pub fn result_for_period(&self, window: &PeriodWindow) -> CoreResult<Option<VotingResult>> {
        let inner = self.inner.lock();
        results::result_for(&inner.store, window)
    }

    /// The vote counts of a window, highest first.
    pub fn tally_for_period(
        &self,
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    ) -> CoreResult<Vec<TallyEntry>> {
        let window = PeriodWindow::new(opened_at, closed_at)?;
        let inner = self.inner.lock();
        results::tally_for_period(&inner.store, &window)
    }

    /// The outcome of the last closed period.
    ///
    /// Results are not available while a period is open.
    pub fn outcome(&self) -> CoreResult<PeriodOutcome> {
        let inner = self.inner.lock();
        let window = last_window(&inner.store)?;
        results::outcome(&inner.store, &window)
    }

    /// The winner of the last closed period with its explanation and the
    /// counts behind it. None when nobody voted.
    pub fn results_view(&self) -> CoreResult<Option<ResultsView>> {
        let inner = self.inner.lock();
        let window = last_window(&inner.store)?;
        match results::outcome(&inner.store, &window)? {
            PeriodOutcome::Decided(r) => results::view(&inner.store, r, &inner.texts).map(Some),
            PeriodOutcome::NoVotes(_) => Ok(None),
        }
    }

    /// Records the missing result of the last closed period.
    ///
    /// Ballots are never removed, so the tally can be run again at any time.
    /// Does nothing if the result already exists.
    pub fn retally(&self) -> CoreResult<PeriodOutcome> {
        let mut inner = self.inner.lock();
        let window = last_window(&inner.store)?;
        if let Some(r) = results::result_for(&inner.store, &window)? {
            info!("retally: period {} already has result {:?}", window, r.id);
            return Ok(PeriodOutcome::Decided(r));
        }
        warn!("retally: recomputing the result of period {}", window);
        match tally_window(&mut *inner, &window)? {
            Some(r) => Ok(PeriodOutcome::Decided(r)),
            None => Ok(PeriodOutcome::NoVotes(window)),
        }
    }
}

fn last_window<S: Store>(store: &S) -> CoreResult<PeriodWindow> {
    let current = store.period().context(StorageSnafu {})?;
    if current.is_open {
        return StateViolationSnafu {
            state: PeriodState::Open,
            action: "show results",
        }
        .fail();
    }
    match current.last_window() {
        Some(w) => Ok(w),
        None => NotFoundSnafu {
            kind: "closed period",
            id: "(none)",
        }
        .fail(),
    }
}

/// Tallies the window and appends the result, if anybody voted.
fn tally_window<S: Store>(
    inner: &mut Inner<S>,
    window: &PeriodWindow,
) -> CoreResult<Option<VotingResult>> {
    let votes = ledger::votes_in(&inner.store, window)?;
    let tally = compute_tally(&votes);
    let decision = match tally.decide(&mut inner.rng) {
        Some(d) => d,
        None => {
            info!("tally_window: no votes in {}, no winner", window);
            return Ok(None);
        }
    };
    let computed_at = inner.clock.now();
    let r = inner
        .store
        .append_result(&decision, computed_at, *window)
        .context(StorageSnafu {})?;
    info!(
        "tally_window: result {:?} for {}: winner {} ({})",
        r.id, window, r.winner, r.reason
    );
    Ok(Some(r))
}
