use super::{Context, Runtime};
use crate::time::SimTime;
use std::{
    cmp,
    collections::BinaryHeap,
    fmt::{Debug, Display},
    marker::PhantomData,
};

///
/// A trait that defines an runtime application
/// that depends on a event set to be processed by the
/// runtime.
///
pub trait Application: Sized {
    ///
    /// The set of events used in the simulation.
    ///
    type EventSet: EventSet<Self>;

    ///
    /// A function that is called once, before the first event is dispatched.
    ///
    fn at_sim_start(_rt: &mut Runtime<Self>) {}
}

///
/// A type that can be used as a wrapper around all events
/// handled by an application A.
///
/// Note that ther is a cyclic dependecy between the event set
/// and the application, since specific events of the event set
/// require runtime params.
///
pub trait EventSet<App>
where
    App: Application<EventSet = Self>,
{
    ///
    /// A function to handle an upcoming event represented as a instance
    /// of the event set.
    ///
    /// This is usually just a match statement that calls
    /// the handle function on the given variant, as defined by the trait [Event].
    ///
    fn handle(self, rt: &mut Runtime<App>);
}

///
/// A type that can handle an event, specific to the given application,
/// and associated event set.
///
pub trait Event<App>
where
    App: Application,
{
    ///
    /// A function to handle an upcoming event represented as a specific
    /// instance of a event type.
    ///
    fn handle(self, rt: &mut Runtime<App>);
}

///
/// Something that accepts events for future dispatch.
///
/// Components schedule through this trait, so that they can be driven
/// by a [`Runtime`], a borrowed [`Context`] or a plain `Vec` in tests.
///
pub trait EventSink<E> {
    /// Schedules `event` to be handled at `time`.
    fn add(&mut self, event: E, time: SimTime);
}

impl<A: Application> EventSink<A::EventSet> for Runtime<A> {
    fn add(&mut self, event: A::EventSet, time: SimTime) {
        self.add_event(event, time);
    }
}

impl<A: Application> EventSink<A::EventSet> for Context<'_, A> {
    fn add(&mut self, event: A::EventSet, time: SimTime) {
        self.add_event(event, time);
    }
}

impl<E> EventSink<E> for Vec<(E, SimTime)> {
    fn add(&mut self, event: E, time: SimTime) {
        self.push((event, time));
    }
}

///
/// A runtime unqiue identifier for a event.
///
pub(crate) type EventId = usize;

///
/// A bin-heap node of a event from the applicaitons event set.
///
pub(crate) struct EventNode<A>
where
    A: Application,
{
    /// The deadline timestamp for the event.
    pub(crate) time: SimTime,
    /// A runtime-specific unique identifier, used to break ties in insertion order.
    pub(crate) id: EventId,
    /// The actual event.
    pub(crate) event: A::EventSet,

    _phantom: PhantomData<A>,
}

impl<A> cmp::PartialEq for EventNode<A>
where
    A: Application,
{
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<A> cmp::Eq for EventNode<A> where A: Application {}

impl<A> cmp::PartialOrd for EventNode<A>
where
    A: Application,
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> cmp::Ord for EventNode<A>
where
    A: Application,
{
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        // Inverted call should act as reverse
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl<A> Debug for EventNode<A>
where
    A: Application,
    A::EventSet: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EventNode {{ id: {} time: {} event: {:?} }}",
            self.id, self.time, self.event
        )
    }
}

impl<A> Display for EventNode<A>
where
    A: Application,
    A::EventSet: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EventNode {{ id: {} time: {} event: {} }}",
            self.id, self.time, self.event
        )
    }
}

///
/// The set of all events that are yet to be dispatched.
///
/// Events are ordered by their deadline. Events that share a deadline
/// are dispatched in the order they were added.
///
pub(crate) struct FutureEventSet<A>
where
    A: Application,
{
    heap: BinaryHeap<EventNode<A>>,
    next_id: EventId,
    last_event_simtime: SimTime,
}

impl<A> FutureEventSet<A>
where
    A: Application,
{
    pub(crate) fn new(start: SimTime) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
            next_id: 0,
            last_event_simtime: start,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|node| node.time)
    }

    pub(crate) fn fetch_next(&mut self) -> Option<EventNode<A>> {
        let node = self.heap.pop()?;
        self.last_event_simtime = node.time;
        Some(node)
    }

    /// Marks `time` as the new lower bound for scheduling.
    pub(crate) fn set_floor(&mut self, time: SimTime) {
        self.last_event_simtime = self.last_event_simtime.max(time);
    }

    pub(crate) fn add(&mut self, time: SimTime, event: A::EventSet) {
        debug_assert!(
            time >= self.last_event_simtime,
            "Sorry we cannot timetravel yet"
        );

        let node = EventNode {
            time: time.max(self.last_event_simtime),
            id: self.next_id,
            event,
            _phantom: PhantomData,
        };
        self.next_id += 1;
        self.heap.push(node);
    }
}
