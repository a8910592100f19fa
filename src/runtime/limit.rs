use crate::time::SimTime;
use std::fmt::Display;

///
/// Bounds the event execution of a runtime. A runtime stops
/// dispatching as soon as either bound is hit, pending events stay
/// in the future event set.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeLimit {
    /// The maximum number of dispatched events.
    pub max_events: Option<usize>,
    /// Events scheduled after this time are not dispatched.
    pub horizon: Option<SimTime>,
}

impl RuntimeLimit {
    /// A limit that never applies.
    pub const UNBOUNDED: RuntimeLimit = RuntimeLimit {
        max_events: None,
        horizon: None,
    };

    pub fn is_unbounded(&self) -> bool {
        self.max_events.is_none() && self.horizon.is_none()
    }

    /// Whether dispatching the `itr`-th event, scheduled at `time`,
    /// exceeds the limit.
    pub(crate) fn applies(&self, itr: usize, time: SimTime) -> bool {
        self.max_events.is_some_and(|max| itr > max) || self.horizon.is_some_and(|t| time > t)
    }
}

impl Display for RuntimeLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.max_events, self.horizon) {
            (None, None) => write!(f, "unbounded"),
            (Some(n), None) => write!(f, "{n} events"),
            (None, Some(t)) => write!(f, "horizon {t}"),
            (Some(n), Some(t)) => write!(f, "{n} events or horizon {t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded() {
        let limit = RuntimeLimit::default();
        assert!(limit.is_unbounded());
        assert_eq!(limit.to_string(), "unbounded");
        assert!(!limit.applies(usize::MAX, SimTime::MAX));
    }

    #[test]
    fn either_bound_applies() {
        let limit = RuntimeLimit {
            max_events: Some(100),
            horizon: Some(SimTime::from(60.0)),
        };
        assert_eq!(limit.to_string(), "100 events or horizon 60.000s");
        assert!(!limit.applies(100, SimTime::from(60.0)));
        assert!(limit.applies(101, SimTime::from(1.0)));
        assert!(limit.applies(1, SimTime::from(60.5)));

        let events = RuntimeLimit {
            max_events: Some(3),
            ..RuntimeLimit::UNBOUNDED
        };
        assert_eq!(events.to_string(), "3 events");
        assert!(!events.applies(3, SimTime::MAX));
    }
}
