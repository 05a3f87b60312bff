//! The open/closed automaton of the voting period.
//!
//! The functions here only compute the next record. Persisting it and
//! running the tally are done by the service, under its lock.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::config::*;

/// Whether a transition request changed the period.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Transition {
    Changed,
    /// The period was already in the requested state.
    Unchanged,
}

/// Opens the period. Opening an open period does nothing.
pub fn open(period: &VotingPeriod, now: DateTime<Utc>) -> Option<VotingPeriod> {
    if period.is_open {
        debug!("open: already open since {:?}", period.opened_at);
        return None;
    }
    info!("open: voting opens at {}", now.to_rfc3339());
    Some(VotingPeriod {
        is_open: true,
        opened_at: Some(now),
        closed_at: period.closed_at,
        last_changed_at: Some(now),
    })
}

/// Closes the period. Closing a closed period does nothing.
pub fn close(period: &VotingPeriod, now: DateTime<Utc>) -> Option<VotingPeriod> {
    if !period.is_open {
        debug!("close: already closed since {:?}", period.closed_at);
        return None;
    }
    info!("close: voting closes at {}", now.to_rfc3339());
    Some(VotingPeriod {
        is_open: false,
        opened_at: period.opened_at,
        closed_at: Some(now),
        last_changed_at: Some(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn open_then_close() {
        let p0 = VotingPeriod::default();
        assert_eq!(p0.state(), PeriodState::Closed);

        let p1 = open(&p0, t(10)).unwrap();
        assert!(p1.is_open);
        assert_eq!(p1.opened_at, Some(t(10)));
        assert_eq!(p1.last_changed_at, Some(t(10)));
        assert_eq!(p1.closed_at, None);

        let p2 = close(&p1, t(20)).unwrap();
        assert!(!p2.is_open);
        assert_eq!(p2.opened_at, Some(t(10)));
        assert_eq!(p2.closed_at, Some(t(20)));
        assert_eq!(p2.last_window(), Some(PeriodWindow::new(t(10), t(20)).unwrap()));
    }

    #[test]
    fn redundant_transitions_are_noops() {
        let p0 = VotingPeriod::default();
        assert_eq!(close(&p0, t(5)), None);
        let p1 = open(&p0, t(10)).unwrap();
        assert_eq!(open(&p1, t(11)), None);
        let p2 = close(&p1, t(20)).unwrap();
        assert_eq!(close(&p2, t(21)), None);
    }

    #[test]
    fn reopening_keeps_previous_close_until_next_close() {
        let p1 = open(&VotingPeriod::default(), t(10)).unwrap();
        let p2 = close(&p1, t(20)).unwrap();
        let p3 = open(&p2, t(30)).unwrap();
        assert_eq!(p3.opened_at, Some(t(30)));
        assert_eq!(p3.closed_at, Some(t(20)));
        assert_eq!(p3.last_window(), None);
    }
}
