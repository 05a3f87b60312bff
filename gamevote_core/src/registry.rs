//! The set of votable candidates.

use log::{info, warn};
use snafu::{ensure, OptionExt, ResultExt};

use crate::config::*;
use crate::error::*;
use crate::store::Store;

pub(crate) fn list_all<S: Store>(store: &S) -> CoreResult<Vec<Candidate>> {
    let mut res = store.candidates().context(StorageSnafu {})?;
    res.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(res)
}

pub(crate) fn list_enabled<S: Store>(store: &S) -> CoreResult<Vec<Candidate>> {
    let mut res = list_all(store)?;
    res.retain(|c| c.enabled);
    Ok(res)
}

pub(crate) fn get<S: Store>(store: &S, id: CandidateId) -> CoreResult<Candidate> {
    store
        .candidate(id)
        .context(StorageSnafu {})?
        .context(NotFoundSnafu {
            kind: "candidate",
            id: id.to_string(),
        })
}

pub(crate) fn find_by_name<S: Store>(store: &S, name: &str) -> CoreResult<Candidate> {
    store
        .candidates()
        .context(StorageSnafu {})?
        .into_iter()
        .find(|c| c.name == name)
        .context(NotFoundSnafu {
            kind: "candidate",
            id: name.to_string(),
        })
}

pub(crate) fn add<S: Store>(store: &mut S, name: &str, enabled: bool) -> CoreResult<Candidate> {
    let taken = store
        .candidates()
        .context(StorageSnafu {})?
        .iter()
        .any(|c| c.name == name);
    ensure!(!taken, NameTakenSnafu { name });
    let c = store
        .insert_candidate(name, enabled)
        .context(StorageSnafu {})?;
    info!("add: candidate {} {:?} (enabled: {})", c.id, c.name, enabled);
    Ok(c)
}

/// Toggles a candidate.
///
/// This is allowed while a period is open. Votes already cast for a
/// candidate that gets disabled are kept and still counted.
pub(crate) fn set_enabled<S: Store>(
    store: &mut S,
    period: &VotingPeriod,
    id: CandidateId,
    enabled: bool,
) -> CoreResult<Candidate> {
    if period.is_open {
        warn!("set_enabled: changing candidate {} while voting is open", id);
    }
    let c = store
        .set_candidate_enabled(id, enabled)
        .context(StorageSnafu {})?
        .context(NotFoundSnafu {
            kind: "candidate",
            id: id.to_string(),
        })?;
    info!("set_enabled: {} {:?} -> {}", c.id, c.name, enabled);
    Ok(c)
}
