use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::clock::{Clock, SystemClock};
use crate::config::*;
use crate::error::*;
use crate::registry;
use crate::service::{Inner, VotingService};
use crate::store::Store;

/// A builder for assembling a voting service.
///
/// The clock and the random source default to the system clock and an
/// entropy-seeded generator. Tests should pin both.
///
/// ```
/// use gamevote_core::builder::ServiceBuilder;
/// use gamevote_core::{MemoryStore, ReasonCode, VoterId, VotingError};
///
/// let service = ServiceBuilder::new(MemoryStore::new())
///     .seed(7)
///     .candidates(&["Azul".to_string(), "Catan".to_string(), "Wingspan".to_string()])?
///     .build();
///
/// service.open()?;
/// let azul = service.candidate_by_name("Azul")?.id;
/// let catan = service.candidate_by_name("Catan")?.id;
/// let wingspan = service.candidate_by_name("Wingspan")?.id;
/// service.cast_ballot(&VoterId::new("ann"), &[azul, catan])?;
/// service.cast_ballot(&VoterId::new("bob"), &[azul, wingspan])?;
/// service.close()?;
///
/// let latest = service.latest()?.unwrap();
/// assert_eq!(latest.winner, azul);
/// assert_eq!(latest.reason, ReasonCode::MostVotes);
/// # Ok::<(), VotingError>(())
/// ```
pub struct ServiceBuilder<S> {
    store: S,
    clock: Option<Box<dyn Clock>>,
    rng: Option<Box<dyn RngCore + Send>>,
    texts: ReasonTexts,
}

impl<S: Store> ServiceBuilder<S> {
    pub fn new(store: S) -> ServiceBuilder<S> {
        ServiceBuilder {
            store,
            clock: None,
            rng: None,
            texts: ReasonTexts::default(),
        }
    }

    pub fn clock<C: Clock + 'static>(self, clock: C) -> ServiceBuilder<S> {
        ServiceBuilder {
            clock: Some(Box::new(clock)),
            ..self
        }
    }

    /// Draws tie-breaks from a generator seeded with `seed`.
    pub fn seed(self, seed: u64) -> ServiceBuilder<S> {
        self.rng(StdRng::seed_from_u64(seed))
    }

    pub fn rng<R: RngCore + Send + 'static>(self, rng: R) -> ServiceBuilder<S> {
        ServiceBuilder {
            rng: Some(Box::new(rng)),
            ..self
        }
    }

    pub fn reason_texts(self, texts: ReasonTexts) -> ServiceBuilder<S> {
        ServiceBuilder { texts, ..self }
    }

    /// Registers enabled candidates. Names already present are skipped.
    pub fn candidates(mut self, names: &[String]) -> Result<ServiceBuilder<S>, VotingError> {
        for name in names.iter() {
            match registry::add(&mut self.store, name, true) {
                Ok(_) | Err(VotingError::NameTaken { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self)
    }

    pub fn build(self) -> VotingService<S> {
        VotingService::from_inner(Inner {
            store: self.store,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            rng: self
                .rng
                .unwrap_or_else(|| Box::new(StdRng::from_entropy())),
            texts: self.texts,
        })
    }
}
