//!
//! Convenience re-export of common members.
//!

//
// # Kernel
//

pub use crate::runtime::Application;
pub use crate::runtime::Builder;
pub use crate::runtime::Context;
pub use crate::runtime::Event;
pub use crate::runtime::EventSet;
pub use crate::runtime::EventSink;
pub use crate::runtime::Runtime;
pub use crate::runtime::RuntimeLimit;

pub use crate::time::Duration;
pub use crate::time::SimTime;

//
// # Topology
//

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::model::*;
pub use crate::store::{Change, EntityKind, StoreEvent, TopologyStore};

//
// # Simulation
//

pub use crate::config::SimConfig;
pub use crate::fixture::{Fixture, FixtureSource};
pub use crate::notify::{ChannelSink, Notification, NotificationSink};
pub use crate::orchestrator::Operation;
pub use crate::reachability::{PingMode, PingStats};
pub use crate::sim::{NfRequest, Simulation};
pub use crate::terminal::{Command, Outcome, Terminal};
