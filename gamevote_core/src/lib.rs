/*!
Recurring two-choice group votes.

An administrator opens a voting period, every voter casts one ballot naming
exactly two candidates, the administrator closes the period and a single
winner is computed. The result records whether the winner had the most
votes outright or was drawn at random among the tied candidates.

The entry point is [`VotingService`], usually created with
[`builder::ServiceBuilder`]. Storage is abstracted by the [`Store`] trait;
[`MemoryStore`] is provided.
*/

mod clock;
mod config;
mod error;
mod ledger;
mod period;
mod registry;
mod results;
mod service;
mod session;
mod store;
mod tally;

pub mod builder;
pub mod manual;

pub use crate::clock::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::ledger::BALLOT_SIZE;
pub use crate::period::Transition;
pub use crate::results::ResultsView;
pub use crate::service::{Closing, VotingService};
pub use crate::session::{Session, CLOSED_MESSAGE, OPENED_MESSAGE};
pub use crate::store::{MemoryStore, Store, StoreError, StoreResult};
pub use crate::tally::{compute_tally, Tally};
