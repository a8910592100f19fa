//!
//! Central primitives for running a discrete event simulation.
//!
//! A [`Runtime`] owns an [`Application`], the simulation clock, a seeded
//! RNG and the future event set. Events are handled one after another,
//! each running to completion, so the runtime is single-threaded and
//! cooperative by construction: nothing yields except dispatching.
//!

use crate::time::{Duration, SimTime};
use rand::{
    distr::{uniform::SampleRange, uniform::SampleUniform, StandardUniform},
    prelude::Distribution,
    rngs::StdRng,
    Rng,
};
use std::{any::type_name, fmt::Debug};

mod event;
pub use self::event::*;

mod limit;
pub use self::limit::*;

mod builder;
pub use self::builder::*;

///
/// The central management point for a generic
/// instance of a discrete event based simulation.
///
/// - Create an 'App' struct that implements the trait [`Application`].
///   This struct will hold the systems state and define the event set used in the simulation.
/// - Create your events that handle the logic of you simulation. They must implement [`Event`] with the generic
///   parameter A, where A is your 'App' struct.
/// - To bind those two together create a enum that implements [`EventSet`] that holds all your events.
///
pub struct Runtime<App>
where
    App: Application,
{
    /// The contained runtime application, defining globals and the used event set.
    pub app: App,

    now: SimTime,
    rng: StdRng,

    limit: RuntimeLimit,
    event_id: EventId,
    itr: usize,
    state: State,

    future_event_set: FutureEventSet<App>,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Ready,
    Running,
}

///
/// A split borrow of a [`Runtime`], handed to components that need
/// to mutate the application while scheduling events and drawing
/// random numbers.
///
pub struct Context<'a, A>
where
    A: Application,
{
    now: SimTime,
    rng: &'a mut StdRng,
    event_id: &'a mut EventId,
    future_event_set: &'a mut FutureEventSet<A>,
}

impl<A> Context<'_, A>
where
    A: Application,
{
    /// The current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The runtimes rng.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    /// Adds an event that will be handled at the given time.
    /// Times in the past are clamped to the current time.
    pub fn add_event(&mut self, event: impl Into<A::EventSet>, time: SimTime) {
        self.future_event_set.add(time.max(self.now), event.into());
        *self.event_id += 1;
    }

    /// Adds an event that will be handled in `duration` time units.
    pub fn add_event_in(&mut self, event: impl Into<A::EventSet>, duration: Duration) {
        let time = self.now + duration;
        self.add_event(event, time);
    }
}

impl<A> Runtime<A>
where
    A: Application,
{
    ///
    /// Creates a new runtime with an OS seeded RNG.
    ///
    pub fn new(app: A) -> Self {
        Builder::new().build(app)
    }

    ///
    /// Returns the number of events that were scheduled on this [`Runtime`] instance.
    ///
    #[inline]
    pub fn num_events_scheduled(&self) -> usize {
        self.event_id
    }

    ///
    /// Returns the number of events that were dispatched on this [`Runtime`] instance.
    ///
    pub fn num_events_dispatched(&self) -> usize {
        self.itr
    }

    ///
    /// Returns the number of events that still wait for their deadline.
    ///
    pub fn num_events_pending(&self) -> usize {
        self.future_event_set.len()
    }

    ///
    /// Returns the limit the runtime was built with.
    ///
    pub fn limit(&self) -> &RuntimeLimit {
        &self.limit
    }

    ///
    /// Whether the next pending event is held back by the limit.
    ///
    pub fn limit_reached(&self) -> bool {
        self.future_event_set
            .peek_time()
            .is_some_and(|next| self.limit.applies(self.itr + 1, next))
    }

    ///
    /// Returns the current simulation time.
    ///
    pub fn sim_time(&self) -> SimTime {
        self.now
    }

    ///
    /// Generates a random instance of type T with a Standard distribution.
    ///
    pub fn random<T>(&mut self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        self.rng.random::<T>()
    }

    ///
    /// Generates a random value in the given range.
    ///
    pub fn random_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.random_range(range)
    }

    ///
    /// Returns the rng.
    ///
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    ///
    /// Borrows the application and the scheduling half of the runtime
    /// at the same time.
    ///
    pub fn split(&mut self) -> (&mut A, Context<'_, A>) {
        (
            &mut self.app,
            Context {
                now: self.now,
                rng: &mut self.rng,
                event_id: &mut self.event_id,
                future_event_set: &mut self.future_event_set,
            },
        )
    }

    /// Starts the simulation. This is done implicitly by every
    /// dispatching function.
    pub fn start(&mut self) {
        if self.state == State::Running {
            return;
        }
        self.state = State::Running;
        tracing::trace!(
            "runtime {} started at {} with limit {}",
            type_name::<A>(),
            self.now,
            self.limit
        );
        A::at_sim_start(self);
    }

    /// Executes the next n events in the runtime queue.
    /// Returns the number of events actually dispatched.
    pub fn dispatch_n_events(&mut self, n: usize) -> usize {
        self.start();
        let mut count = 0;
        while count < n && self.dispatch_event() {
            count += 1;
        }
        count
    }

    /// Executes runtime events until the runtime reaches the designated time.
    /// Events scheduled exactly at `t` are dispatched.
    pub fn dispatch_events_until(&mut self, t: SimTime) {
        self.start();
        while self
            .future_event_set
            .peek_time()
            .is_some_and(|next| next <= t)
        {
            if !self.dispatch_event() {
                break;
            }
        }
    }

    /// Executes all events, until the future event set is empty or
    /// the limit applies.
    pub fn dispatch_all(&mut self) {
        self.start();
        while self.dispatch_event() {}
    }

    /// Executes events as long as `pred` holds for the application.
    /// Returns whether the predicate was resolved, i.e. `false` if the
    /// runtime ran out of events first.
    pub fn dispatch_while(&mut self, mut pred: impl FnMut(&A) -> bool) -> bool {
        self.start();
        while pred(&self.app) {
            if !self.dispatch_event() {
                return false;
            }
        }
        true
    }

    /// Dispatches every event up to `t` and moves the clock to `t`,
    /// even if no event was scheduled there.
    pub fn advance_to(&mut self, t: SimTime) {
        self.dispatch_events_until(t);
        if t > self.now && !self.limit.applies(self.itr, t) {
            self.set_now(t);
            self.future_event_set.set_floor(t);
        }
    }

    /// Advances the clock by `duration`, see [`Runtime::advance_to`].
    pub fn advance_by(&mut self, duration: Duration) {
        self.advance_to(self.now + duration);
    }

    /// Processes the next event in the future event list by calling its handler.
    /// Returns `false` if the simulation should stop.
    fn dispatch_event(&mut self) -> bool {
        let Some(next) = self.future_event_set.peek_time() else {
            return false;
        };
        if self.limit.applies(self.itr + 1, next) {
            return false;
        }
        let Some(node) = self.future_event_set.fetch_next() else {
            return false;
        };

        self.itr += 1;

        // Let this be the only position where SimTime is changed by events
        self.set_now(node.time);
        node.event.handle(self);

        true
    }

    fn set_now(&mut self, time: SimTime) {
        self.now = time;
        crate::tracing::publish_time(time);
    }

    ///
    /// Adds an event to the future event heap that will be handled in 'duration'
    /// time units.
    ///
    pub fn add_event_in(&mut self, event: impl Into<A::EventSet>, duration: impl Into<Duration>) {
        self.add_event(event, self.sim_time() + duration.into());
    }

    ///
    /// Adds an event to the future event heap that will be handled at the given time.
    /// Times in the past are clamped to the current time.
    ///
    pub fn add_event(&mut self, event: impl Into<A::EventSet>, time: SimTime) {
        self.future_event_set.add(time.max(self.now), event.into());
        self.event_id += 1;
    }
}

impl<A> Debug for Runtime<A>
where
    A: Application,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime<{}> {{ sim_time: {} (itr {} / {}) dispatched: {} enqueued: {} }}",
            type_name::<A>(),
            self.sim_time(),
            self.num_events_dispatched(),
            self.limit,
            self.num_events_scheduled(),
            self.future_event_set.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[derive(Debug)]
    enum Events {
        Record(usize),
        Repeat { left: usize },
    }

    impl EventSet<App> for Events {
        fn handle(self, rt: &mut Runtime<App>) {
            match self {
                Events::Record(id) => {
                    let now = rt.sim_time();
                    rt.app.log.push((now, id));
                }
                Events::Repeat { left } => {
                    let now = rt.sim_time();
                    rt.app.log.push((now, usize::MAX));
                    if left > 0 {
                        rt.add_event_in(Events::Repeat { left: left - 1 }, Duration::from_secs(1));
                    }
                }
            }
        }
    }

    #[derive(Default)]
    struct App {
        log: Vec<(SimTime, usize)>,
    }

    impl Application for App {
        type EventSet = Events;
    }

    #[test]
    #[serial]
    fn same_time_events_are_fifo() {
        let mut rt = Builder::seeded(1).build(App::default());
        for id in 0..5 {
            rt.add_event(Events::Record(id), SimTime::from(2.0));
        }
        rt.add_event(Events::Record(99), SimTime::from(1.0));
        rt.dispatch_all();

        let ids = rt.app.log.iter().map(|(_, id)| *id).collect::<Vec<_>>();
        assert_eq!(ids, vec![99, 0, 1, 2, 3, 4]);
        assert_eq!(rt.sim_time(), 2.0);
        assert_eq!(rt.num_events_dispatched(), 6);
    }

    #[test]
    #[serial]
    fn repeat_until_time() {
        let mut rt = Builder::seeded(1).build(App::default());
        rt.add_event(Events::Repeat { left: 15 }, SimTime::ZERO);
        rt.dispatch_events_until(SimTime::from(5.0));

        assert_eq!(rt.app.log.len(), 6);
        assert_eq!(rt.sim_time(), 5.0);
        assert_eq!(rt.num_events_pending(), 1);

        rt.dispatch_all();
        assert_eq!(rt.app.log.len(), 16);
        assert_eq!(rt.sim_time(), 15.0);
    }

    #[test]
    #[serial]
    fn advance_moves_clock_without_events() {
        let mut rt = Builder::seeded(1).build(App::default());
        rt.advance_by(Duration::from_secs(3));
        assert_eq!(rt.sim_time(), 3.0);

        // past deadlines are clamped to now
        rt.add_event(Events::Record(1), SimTime::from(1.0));
        rt.dispatch_all();
        assert_eq!(rt.app.log, vec![(SimTime::from(3.0), 1)]);
    }

    #[test]
    #[serial]
    fn limits_stop_dispatching() {
        let limit = RuntimeLimit {
            max_events: Some(3),
            ..RuntimeLimit::UNBOUNDED
        };
        let mut rt = Builder::seeded(1).limit(limit).build(App::default());
        rt.add_event(Events::Repeat { left: 10 }, SimTime::ZERO);
        assert!(!rt.limit_reached());
        rt.dispatch_all();
        assert_eq!(rt.num_events_dispatched(), 3);
        assert!(rt.limit_reached());

        let limit = RuntimeLimit {
            horizon: Some(SimTime::from(2.0)),
            ..RuntimeLimit::UNBOUNDED
        };
        let mut rt = Builder::seeded(1).limit(limit).build(App::default());
        rt.add_event(Events::Repeat { left: 10 }, SimTime::ZERO);
        rt.advance_by(Duration::from_secs(5));
        assert_eq!(rt.app.log.len(), 3);
        assert_eq!(rt.sim_time(), 2.0);
        assert!(rt.limit_reached());
    }

    #[test]
    #[serial]
    fn seeded_rng_is_reproducible() {
        let mut a = Builder::seeded(7).build(App::default());
        let mut b = Builder::seeded(7).build(App::default());
        let xs = (0..8).map(|_| a.random::<u64>()).collect::<Vec<_>>();
        let ys = (0..8).map(|_| b.random::<u64>()).collect::<Vec<_>>();
        assert_eq!(xs, ys);
    }
}
