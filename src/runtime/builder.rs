use rand::{rngs::StdRng, SeedableRng};

use super::{Application, FutureEventSet, Runtime, RuntimeLimit, State};
use crate::time::SimTime;

/// A builder for a runtime instance.
#[must_use]
pub struct Builder {
    pub(super) rng: StdRng,
    pub(super) limit: RuntimeLimit,
}

impl Builder {
    /// Creates a new unconfigured builder, with an RNG seeded by the OS.
    pub fn new() -> Builder {
        Builder {
            rng: StdRng::from_os_rng(),
            limit: RuntimeLimit::UNBOUNDED,
        }
    }

    /// Creates a `Builder` with a static seeded RNG.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            rng: StdRng::seed_from_u64(seed),
            limit: RuntimeLimit::UNBOUNDED,
        }
    }

    ///
    /// Bounds the number of events and the simulated time of the runtime.
    ///
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit = limit;
        self
    }

    ///
    /// Builds a new [`Runtime`] instance, using an application as core.
    ///
    pub fn build<A: Application>(self, app: A) -> Runtime<A> {
        crate::tracing::publish_time(SimTime::ZERO);

        Runtime {
            app,
            now: SimTime::ZERO,
            rng: self.rng,
            limit: self.limit,
            event_id: 0,
            itr: 0,
            state: State::Ready,
            future_event_set: FutureEventSet::new(SimTime::ZERO),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
