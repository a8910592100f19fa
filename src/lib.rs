#![allow(rustdoc::broken_intra_doc_links)]
//!
//! A discrete event simulation of 5G core network functions.
//!
//! No real processes or packets exist. Network functions, their links and
//! the service buses they share live in a [`TopologyStore`](crate::store::TopologyStore),
//! and every change happens inside the event handlers of a
//! [`Runtime`](crate::runtime::Runtime) driving a [`Simulation`](crate::sim::Simulation).
//!
//! The simulation covers
//! - conflict-free address and port allocation ([`alloc`]),
//! - the timed `starting -> stable -> stopped` lifecycle ([`lifecycle`]),
//! - compose-style orchestration commands against an idempotent
//!   topology ([`orchestrator`]),
//! - automatic wiring of declared connections ([`wiring`], [`fixture`]),
//! - probabilistic, subnet-aware pings ([`reachability`]).
//!
//! # Running a simulation
//!
//! ```
//! use nfsim::prelude::*;
//!
//! let mut rt = Builder::seeded(42).build(Simulation::new(SimConfig::default()).unwrap());
//! let console = rt.open_console();
//!
//! rt.run(console, Operation::BringUpAll).unwrap();
//! assert!(rt.app.store.nf_by_type(NfType::Amf).is_some());
//!
//! // network functions become stable after the stabilization delay
//! rt.wait(Duration::from_secs(6));
//! assert!(rt.app.store.nfs().all(|nf| nf.status == NfStatus::Stable));
//! ```
//!
//! The [`terminal`] module parses the text commands of the interactive
//! `nfsim` binary.
//!

pub mod prelude;

pub mod alloc;
pub mod config;
pub mod error;
pub mod fixture;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod reachability;
pub mod runtime;
pub mod sim;
pub mod store;
pub mod terminal;
pub mod time;
pub mod tracing;
pub mod wiring;
