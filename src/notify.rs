//!
//! Fire-and-forget notifications about lifecycle changes and log lines.
//!
//! Sinks must never block the simulation. A sink that cannot deliver a
//! notification drops it.
//!

use std::{fmt::Display, sync::mpsc::Sender};
use tracing::Level;

use crate::{
    model::{NetworkFunction, NfId, NfStatus, NfType},
    time::SimTime,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A network function changed its status. `from` is `None` on creation.
    Lifecycle {
        nf: NfId,
        name: String,
        nf_type: NfType,
        from: Option<NfStatus>,
        to: NfStatus,
        at: SimTime,
    },
    /// A network function was removed from the topology.
    Removed {
        nf: NfId,
        name: String,
        at: SimTime,
    },
    /// A free-form log line.
    Log {
        level: Level,
        message: String,
        at: SimTime,
    },
}

impl Notification {
    #[must_use]
    pub fn lifecycle(nf: &NetworkFunction, from: Option<NfStatus>) -> Self {
        Notification::Lifecycle {
            nf: nf.id,
            name: nf.name.clone(),
            nf_type: nf.nf_type,
            from,
            to: nf.status,
            at: nf.status_timestamp,
        }
    }

    #[must_use]
    pub fn at(&self) -> SimTime {
        match self {
            Notification::Lifecycle { at, .. }
            | Notification::Removed { at, .. }
            | Notification::Log { at, .. } => *at,
        }
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::Lifecycle {
                name,
                from: None,
                to,
                ..
            } => write!(f, "{name} created ({to})"),
            Notification::Lifecycle {
                name,
                from: Some(from),
                to,
                ..
            } => write!(f, "{name} {from} -> {to}"),
            Notification::Removed { name, .. } => write!(f, "{name} removed"),
            Notification::Log { message, .. } => write!(f, "{message}"),
        }
    }
}

/// A consumer of notifications.
pub trait NotificationSink {
    fn notify(&mut self, notification: &Notification);
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, notification: &Notification) {
        match notification {
            Notification::Log { level, message, .. } => match *level {
                Level::ERROR => tracing::error!(target: "nfsim::notify", "{message}"),
                Level::WARN => tracing::warn!(target: "nfsim::notify", "{message}"),
                Level::INFO => tracing::info!(target: "nfsim::notify", "{message}"),
                Level::DEBUG => tracing::debug!(target: "nfsim::notify", "{message}"),
                _ => tracing::trace!(target: "nfsim::notify", "{message}"),
            },
            other => tracing::info!(target: "nfsim::notify", "{other}"),
        }
    }
}

/// Forwards notifications into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub Sender<Notification>);

impl NotificationSink for ChannelSink {
    fn notify(&mut self, notification: &Notification) {
        // a hung up receiver is not an error of the simulation
        let _ = self.0.send(notification.clone());
    }
}

/// Fans notifications out to a set of sinks.
#[derive(Default)]
pub struct NotificationHub {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl NotificationHub {
    /// A hub that forwards to [`TracingSink`].
    #[must_use]
    pub fn new() -> Self {
        let mut hub = Self::default();
        hub.add_sink(TracingSink);
        hub
    }

    pub fn add_sink(&mut self, sink: impl NotificationSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn publish(&mut self, notification: Notification) {
        for sink in &mut self.sinks {
            sink.notify(&notification);
        }
    }

    pub fn log(&mut self, level: Level, message: impl Into<String>, at: SimTime) {
        self.publish(Notification::Log {
            level,
            message: message.into(),
            at,
        });
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationHub {{ sinks: {} }}", self.sinks.len())
    }
}
