use log::warn;
use snafu::ensure;

use crate::config::*;
use crate::error::*;
use crate::period::Transition;
use crate::results::ResultsView;
use crate::service::{Closing, VotingService};
use crate::store::Store;

pub const OPENED_MESSAGE: &str = "Voting is now open!";
pub const CLOSED_MESSAGE: &str = "Voting is now closed!";

/// One caller's view of the service.
///
/// The session carries the caller's identity and the message produced by
/// its last effective transition.
pub struct Session<'a, S> {
    service: &'a VotingService<S>,
    identity: Identity,
    response: Option<String>,
}

impl<'a, S: Store> Session<'a, S> {
    pub fn new(service: &'a VotingService<S>, identity: Identity) -> Session<'a, S> {
        Session {
            service,
            identity,
            response: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    fn require_admin(&self) -> CoreResult<()> {
        if !self.identity.is_admin {
            warn!("require_admin: {} is not an administrator", self.identity.voter);
        }
        ensure!(
            self.identity.is_admin,
            NotAuthorizedSnafu {
                voter: self.identity.voter.clone()
            }
        );
        Ok(())
    }

    pub fn open(&mut self) -> CoreResult<Transition> {
        self.require_admin()?;
        let t = self.service.open()?;
        if t == Transition::Changed {
            self.response = Some(OPENED_MESSAGE.to_string());
        }
        Ok(t)
    }

    pub fn close(&mut self) -> CoreResult<Closing> {
        self.require_admin()?;
        let c = self.service.close()?;
        if c.transition() == Transition::Changed {
            self.response = Some(CLOSED_MESSAGE.to_string());
        }
        Ok(c)
    }

    /// The candidates to choose from, when this voter may vote now.
    pub fn ballot_form(&self) -> CoreResult<Vec<Candidate>> {
        self.service.check_eligibility(&self.identity.voter)?;
        self.service.list_enabled()
    }

    pub fn cast_ballot(&mut self, choices: &[CandidateId]) -> CoreResult<Vec<Vote>> {
        self.service.cast_ballot(&self.identity.voter, choices)
    }

    pub fn cast_ballot_by_name(&mut self, names: &[String]) -> CoreResult<Vec<Vote>> {
        self.service.cast_ballot_by_name(&self.identity.voter, names)
    }

    pub fn list_enabled(&self) -> CoreResult<Vec<Candidate>> {
        self.service.list_enabled()
    }

    pub fn list_all(&self) -> CoreResult<Vec<Candidate>> {
        self.require_admin()?;
        self.service.list_all()
    }

    pub fn add_candidate(&mut self, name: &str, enabled: bool) -> CoreResult<Candidate> {
        self.require_admin()?;
        self.service.add_candidate(name, enabled)
    }

    pub fn set_enabled(&mut self, id: CandidateId, enabled: bool) -> CoreResult<Candidate> {
        self.require_admin()?;
        self.service.set_enabled(id, enabled)
    }

    pub fn set_enabled_by_name(&mut self, name: &str, enabled: bool) -> CoreResult<Candidate> {
        self.require_admin()?;
        self.service.set_enabled_by_name(name, enabled)
    }

    pub fn results(&self) -> CoreResult<Option<ResultsView>> {
        self.service.results_view()
    }

    pub fn retally(&mut self) -> CoreResult<PeriodOutcome> {
        self.require_admin()?;
        self.service.retally()
    }
}
