//!
//! The `starting -> stable -> stopped` lifecycle of network functions.
//!
//! Stabilization is a deferred [`Stabilize`] event. Timers are keyed by
//! entity and carry a token, so re-arming a timer invalidates the
//! previous one. Independent of that, a firing timer re-reads the entity
//! and does nothing if it is gone or no longer `starting`.
//!

use fxhash::FxHashMap;

use crate::{
    error::{Error, Result},
    model::{NetworkFunction, NfId, NfStatus},
    runtime::EventSink,
    store::TopologyStore,
    time::{Duration, SimTime},
};

/// The deferred `starting -> stable` transition of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stabilize {
    pub nf: NfId,
    pub token: u64,
}

/// The outcome of an explicit start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed { from: NfStatus, to: NfStatus },
    Unchanged(NfStatus),
}

#[derive(Debug)]
pub struct LifecycleController {
    delay: Duration,
    pending: FxHashMap<NfId, u64>,
    next_token: u64,
}

impl LifecycleController {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: FxHashMap::default(),
            next_token: 0,
        }
    }

    ///
    /// Arms the stabilization timer of `nf`, replacing a pending one.
    /// Returns the deadline.
    ///
    pub fn arm<E>(&mut self, nf: NfId, now: SimTime, sink: &mut impl EventSink<E>) -> SimTime
    where
        E: From<Stabilize>,
    {
        self.next_token += 1;
        let token = self.next_token;
        self.pending.insert(nf, token);

        let deadline = now + self.delay;
        sink.add(Stabilize { nf, token }.into(), deadline);
        tracing::debug!("armed stabilization of {nf} for {deadline}");
        deadline
    }

    /// Invalidates the pending timer of `nf`, if any.
    pub fn cancel(&mut self, nf: NfId) -> bool {
        self.pending.remove(&nf).is_some()
    }

    #[must_use]
    pub fn is_pending(&self, nf: NfId) -> bool {
        self.pending.contains_key(&nf)
    }

    ///
    /// Handles a firing timer. Returns the updated entity if it became
    /// `stable`, `None` if the timer was a no-op.
    ///
    pub fn stabilize(
        &mut self,
        store: &mut TopologyStore,
        timer: Stabilize,
        now: SimTime,
    ) -> Option<NetworkFunction> {
        if self.pending.get(&timer.nf) == Some(&timer.token) {
            self.pending.remove(&timer.nf);
        } else {
            tracing::debug!("ignoring superseded timer of {}", timer.nf);
            return None;
        }

        let Some(nf) = store.get(timer.nf) else {
            tracing::debug!("ignoring timer of removed {}", timer.nf);
            return None;
        };
        if nf.status != NfStatus::Starting {
            tracing::debug!("ignoring timer of {} in state {}", nf.name, nf.status);
            return None;
        }

        let mut nf = nf.clone();
        nf.status = NfStatus::Stable;
        nf.status_timestamp = now;
        store.update(nf.clone()).ok()?;
        tracing::info!("{} is stable", nf.name);
        Some(nf)
    }

    ///
    /// Stops a `starting` or `stable` entity.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the entity does not exist.
    ///
    pub fn stop(&mut self, store: &mut TopologyStore, id: NfId, now: SimTime) -> Result<Transition> {
        let mut nf = store
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{id} does not exist")))?;
        if nf.status == NfStatus::Stopped {
            return Ok(Transition::Unchanged(nf.status));
        }

        self.cancel(id);
        let from = nf.status;
        nf.status = NfStatus::Stopped;
        nf.status_timestamp = now;
        let name = nf.name.clone();
        store.update(nf)?;
        tracing::info!("{name} stopped");
        Ok(Transition::Changed {
            from,
            to: NfStatus::Stopped,
        })
    }

    ///
    /// Restarts a `stopped` entity. It re-enters `starting` and its
    /// stabilization timer is armed again.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the entity does not exist.
    ///
    pub fn start<E>(
        &mut self,
        store: &mut TopologyStore,
        id: NfId,
        now: SimTime,
        sink: &mut impl EventSink<E>,
    ) -> Result<Transition>
    where
        E: From<Stabilize>,
    {
        let mut nf = store
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{id} does not exist")))?;
        if nf.status != NfStatus::Stopped {
            return Ok(Transition::Unchanged(nf.status));
        }

        nf.status = NfStatus::Starting;
        nf.status_timestamp = now;
        let name = nf.name.clone();
        store.update(nf)?;
        self.arm(id, now, sink);
        tracing::info!("{name} starting");
        Ok(Transition::Changed {
            from: NfStatus::Stopped,
            to: NfStatus::Starting,
        })
    }
}
