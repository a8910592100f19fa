//!
//! Compose-style orchestration commands.
//!
//! A command is planned when it starts, against the topology as it is at
//! that moment. The plan is a sequence of [`Step`]s, each one a delay
//! followed by an [`Action`]. Steps run strictly one after another.
//!
//! The orchestrator is single-flight: commands submitted while another one
//! is running wait in a FIFO queue.
//!

use fxhash::{FxHashMap, FxHashSet};
use rand::Rng;
use std::{collections::VecDeque, fmt::Display};

use crate::{
    config::SimConfig,
    error::{Error, Result},
    fixture::{Fixture, FixtureSource, NfDef},
    model::{Bus, ConsoleId, NfId, NfType},
    store::TopologyStore,
    time::{Duration, SimTime},
    wiring,
};

/// An orchestration command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    BringUpAll,
    BringUp(NfType),
    TearDownAll,
    TearDown(NfType),
    Start(NfType),
    Stop(NfType),
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::BringUpAll => write!(f, "bring-up-all"),
            Operation::BringUp(t) => write!(f, "bring-up {}", t.service_name()),
            Operation::TearDownAll => write!(f, "tear-down-all"),
            Operation::TearDown(t) => write!(f, "tear-down {}", t.service_name()),
            Operation::Start(t) => write!(f, "start {}", t.service_name()),
            Operation::Stop(t) => write!(f, "stop {}", t.service_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub u64);

impl Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cmd#{}", self.0)
    }
}

/// A submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
    pub console: ConsoleId,
    pub op: Operation,
}

/// A single side effect of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateNetwork,
    /// Creates the fixture buses that do not exist yet.
    CreateBuses,
    Provision(NfDef),
    /// Imports the fixture links touching entities of this command.
    ImportLinks,
    Remove(NfId),
    /// Removes every bus and bus connection.
    RemoveBuses,
    RemoveNetwork,
    Start(NfId),
    Stop(NfId),
    Report(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub delay: Duration,
    pub action: Action,
}

impl Step {
    #[must_use]
    pub fn now(action: Action) -> Self {
        Self {
            delay: Duration::ZERO,
            action,
        }
    }
}

/// The planned steps of a command.
#[derive(Debug, Default)]
pub struct Plan {
    pub steps: VecDeque<Step>,
    pub fixture: Fixture,
    /// Set if the fixture could not be fetched and the default set is used.
    pub fallback: Option<Error>,
}

#[derive(Debug)]
struct Active {
    command: Command,
    started: SimTime,
    steps: VecDeque<Step>,
    fixture: Fixture,
    keys: FxHashMap<String, NfId>,
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    queue: VecDeque<Command>,
    active: Option<Active>,
    network_up: bool,
    next_id: u64,
    outcomes: FxHashMap<CommandId, Result<()>>,
}

impl Orchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a command. It starts once all earlier commands completed.
    pub fn submit(&mut self, console: ConsoleId, op: Operation) -> CommandId {
        self.next_id += 1;
        let id = CommandId(self.next_id);
        self.queue.push_back(Command { id, console, op });
        tracing::debug!("queued {id} '{op}' ({} waiting)", self.queue.len());
        id
    }

    /// Whether no command is running or waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    #[must_use]
    pub fn active_command(&self) -> Option<Command> {
        self.active.as_ref().map(|active| active.command)
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether the simulated compose network exists.
    #[must_use]
    pub fn network_up(&self) -> bool {
        self.network_up
    }

    pub fn set_network_up(&mut self, up: bool) {
        self.network_up = up;
    }

    /// Takes the next queued command, if none is running.
    pub fn dequeue(&mut self) -> Option<Command> {
        if self.active.is_some() {
            return None;
        }
        self.queue.pop_front()
    }

    pub fn activate(&mut self, command: Command, plan: Plan, now: SimTime) {
        tracing::info!("running {} '{}' ({} steps)", command.id, command.op, plan.steps.len());
        self.active = Some(Active {
            command,
            started: now,
            steps: plan.steps,
            fixture: plan.fixture,
            keys: FxHashMap::default(),
        });
    }

    /// The delay before the next step of the running command.
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        self.active.as_ref()?.steps.front().map(|step| step.delay)
    }

    /// Takes the next step, if `command` is still running.
    pub fn pop_step(&mut self, command: CommandId) -> Option<Step> {
        let active = self.active.as_mut()?;
        if active.command.id != command {
            return None;
        }
        active.steps.pop_front()
    }

    /// Remembers which entity a fixture key resolved to.
    pub fn record_key(&mut self, key: &str, nf: NfId) {
        if let Some(active) = &mut self.active {
            active.keys.insert(key.to_string(), nf);
        }
    }

    /// Completes the running command. Returns it and the time it took.
    pub fn finish(&mut self, result: Result<()>, now: SimTime) -> Option<(Command, Duration)> {
        let active = self.active.take()?;
        let elapsed = now - active.started;
        match &result {
            Ok(()) => tracing::info!("{} completed after {elapsed:?}", active.command.id),
            Err(e) => tracing::warn!("{} failed after {elapsed:?}: {e}", active.command.id),
        }
        self.outcomes.insert(active.command.id, result);
        Some((active.command, elapsed))
    }

    /// Records the outcome of a command that failed before it started.
    pub fn reject(&mut self, command: Command, err: Error) {
        tracing::warn!("{} '{}' rejected: {err}", command.id, command.op);
        self.outcomes.insert(command.id, Err(err));
    }

    #[must_use]
    pub fn outcome(&self, id: CommandId) -> Option<&Result<()>> {
        self.outcomes.get(&id)
    }

    pub fn take_outcome(&mut self, id: CommandId) -> Option<Result<()>> {
        self.outcomes.remove(&id)
    }

    ///
    /// Imports the links of the running command's fixture. Only links
    /// touching an entity provisioned by this command are considered.
    /// Returns the number of links that were checked.
    ///
    pub fn import_links(&self, store: &mut TopologyStore, now: SimTime) -> usize {
        let Some(active) = &self.active else {
            return 0;
        };
        import_links(store, &active.fixture, &active.keys, now)
    }

    /// The fixture of the running command.
    #[must_use]
    pub fn fixture(&self) -> Option<&Fixture> {
        self.active.as_ref().map(|active| &active.fixture)
    }

    ///
    /// Plans an operation against the current topology.
    ///
    /// # Errors
    ///
    /// Returns a `Conflict` error when bringing up a type that exists and a
    /// `NotFound` error when tearing down, starting or stopping a type
    /// without entities.
    ///
    pub fn plan(
        &self,
        op: Operation,
        store: &TopologyStore,
        config: &SimConfig,
        fixtures: &FixtureSource,
        rng: &mut impl Rng,
    ) -> Result<Plan> {
        let mut plan = Plan::default();
        match op {
            Operation::BringUpAll => {
                let (fixture, fallback) = fetch(fixtures);
                let core = fixture.without_radio_access();
                let present = store.types_present();
                let missing = core
                    .types()
                    .into_iter()
                    .filter(|t| !present.contains(t))
                    .filter_map(|t| core.nf_def(t).cloned())
                    .collect::<Vec<_>>();

                plan.fallback = fallback;
                if missing.is_empty() {
                    plan.steps.push_back(Step::now(Action::Report(
                        "All services are already running".to_string(),
                    )));
                    return Ok(plan);
                }

                if !self.network_up {
                    plan.steps.push_back(Step {
                        delay: config.startup_delay.sample(rng),
                        action: Action::CreateNetwork,
                    });
                }
                if !core.buses.is_empty() {
                    plan.steps.push_back(Step::now(Action::CreateBuses));
                }
                for def in missing {
                    plan.steps.push_back(Step {
                        delay: config.startup_delay.sample(rng),
                        action: Action::Provision(def),
                    });
                }
                if !core.connections.is_empty() || !core.bus_links.is_empty() {
                    plan.steps.push_back(Step::now(Action::ImportLinks));
                }
                plan.fixture = core;
            }
            Operation::BringUp(nf_type) => {
                if store.nf_by_type(nf_type).is_some() {
                    return Err(Error::conflict(format!(
                        "container {} already exists",
                        nf_type.service_name()
                    )));
                }
                let (fixture, fallback) = fetch(fixtures);
                let def = fixture
                    .nf_def(nf_type)
                    .cloned()
                    .unwrap_or_else(|| NfDef::bare(nf_type));

                plan.fallback = fallback;
                if !self.network_up {
                    plan.steps.push_back(Step {
                        delay: config.startup_delay.sample(rng),
                        action: Action::CreateNetwork,
                    });
                }
                plan.steps.push_back(Step {
                    delay: config.startup_delay.sample(rng),
                    action: Action::Provision(def),
                });
                plan.steps.push_back(Step::now(Action::ImportLinks));
                plan.fixture = fixture;
            }
            Operation::TearDownAll => {
                let mut ids = store.nfs().map(|nf| nf.id).collect::<Vec<_>>();
                ids.reverse();
                for id in ids {
                    plan.steps.push_back(Step {
                        delay: config.teardown_delay.sample(rng),
                        action: Action::Remove(id),
                    });
                }
                if store.count::<Bus>() > 0 {
                    plan.steps.push_back(Step::now(Action::RemoveBuses));
                }
                if self.network_up {
                    plan.steps.push_back(Step {
                        delay: config.teardown_delay.sample(rng),
                        action: Action::RemoveNetwork,
                    });
                }
                if plan.steps.is_empty() {
                    plan.steps.push_back(Step::now(Action::Report(
                        "Nothing to tear down".to_string(),
                    )));
                }
            }
            Operation::TearDown(nf_type) => {
                let mut ids = of_type(store, nf_type)?;
                ids.reverse();
                for id in ids {
                    plan.steps.push_back(Step {
                        delay: config.teardown_delay.sample(rng),
                        action: Action::Remove(id),
                    });
                }
            }
            Operation::Start(nf_type) => {
                for id in of_type(store, nf_type)? {
                    plan.steps.push_back(Step {
                        delay: config.control_delay(),
                        action: Action::Start(id),
                    });
                }
            }
            Operation::Stop(nf_type) => {
                for id in of_type(store, nf_type)? {
                    plan.steps.push_back(Step {
                        delay: config.control_delay(),
                        action: Action::Stop(id),
                    });
                }
            }
        }
        Ok(plan)
    }
}

fn of_type(store: &TopologyStore, nf_type: NfType) -> Result<Vec<NfId>> {
    let ids = store
        .nfs()
        .filter(|nf| nf.nf_type == nf_type)
        .map(|nf| nf.id)
        .collect::<Vec<_>>();
    if ids.is_empty() {
        return Err(Error::not_found(format!(
            "service {} is not running",
            nf_type.service_name()
        )));
    }
    Ok(ids)
}

/// Fetches a fixture, falling back to the default set on failure.
fn fetch(source: &FixtureSource) -> (Fixture, Option<Error>) {
    match source.fetch() {
        Ok(fixture) => (fixture, None),
        Err(e) => {
            tracing::warn!("fixture unavailable, using the default set: {e}");
            (Fixture::fallback(), Some(e))
        }
    }
}

///
/// Creates the connections of `fixture` that touch at least one entity in
/// `keys`, and every bus link whose ends resolve. Fixture keys not in
/// `keys` resolve to the oldest entity of their type, buses resolve by
/// name. Unresolvable links are skipped.
///
pub fn import_links(
    store: &mut TopologyStore,
    fixture: &Fixture,
    keys: &FxHashMap<String, NfId>,
    now: SimTime,
) -> usize {
    let created = keys.values().copied().collect::<FxHashSet<_>>();
    let resolve = |store: &TopologyStore, key: &str| {
        keys.get(key).copied().or_else(|| {
            let def = fixture.nf_by_key(key)?;
            store.nf_by_type(def.nf_type).map(|nf| nf.id)
        })
    };

    let mut n = 0;
    for con in &fixture.connections {
        let (Some(source), Some(target)) = (resolve(store, &con.source), resolve(store, &con.target))
        else {
            continue;
        };
        if source == target || !(created.contains(&source) || created.contains(&target)) {
            continue;
        }
        wiring::ensure_connection(
            store,
            source,
            target,
            (con.interface.as_str(), con.protocol.as_str()),
            false,
            now,
        );
        n += 1;
    }

    for link in &fixture.bus_links {
        let Some(nf) = resolve(store, &link.nf) else {
            continue;
        };
        let Some(bus_def) = fixture.bus_by_key(&link.bus) else {
            continue;
        };
        let Some(bus) = store.all::<Bus>().find(|bus| bus.name == bus_def.name).map(|bus| bus.id)
        else {
            continue;
        };
        wiring::ensure_bus_link(store, nf, bus, (link.interface.as_str(), link.protocol.as_str()), now);
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rand::{rngs::StdRng, SeedableRng};

    fn actions(plan: &Plan) -> Vec<&Action> {
        plan.steps.iter().map(|step| &step.action).collect()
    }

    #[test]
    fn single_flight_queue() {
        let mut orch = Orchestrator::new();
        let a = orch.submit(ConsoleId(1), Operation::BringUpAll);
        let b = orch.submit(ConsoleId(2), Operation::TearDownAll);
        assert!(a < b);

        let first = orch.dequeue().unwrap();
        assert_eq!(first.id, a);
        orch.activate(first, Plan::default(), SimTime::ZERO);
        assert!(orch.dequeue().is_none());
        assert_eq!(orch.queued(), 1);

        let (done, _) = orch.finish(Ok(()), SimTime::from(2.0)).unwrap();
        assert_eq!(done.id, a);
        assert_eq!(orch.outcome(a), Some(&Ok(())));
        assert_eq!(orch.dequeue().unwrap().id, b);
    }

    #[test]
    fn bring_up_all_on_empty_topology() {
        let orch = Orchestrator::new();
        let store = TopologyStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        let config = SimConfig::default();
        let plan = orch
            .plan(
                Operation::BringUpAll,
                &store,
                &config,
                &FixtureSource::Embedded,
                &mut rng,
            )
            .unwrap();

        assert!(plan.fallback.is_none());
        let actions = actions(&plan);
        assert_eq!(actions[0], &Action::CreateNetwork);
        assert_eq!(actions[1], &Action::CreateBuses);
        let provisions = actions
            .iter()
            .filter(|a| matches!(a, Action::Provision(_)))
            .count();
        assert_eq!(provisions, 11);
        assert_eq!(actions.last(), Some(&&Action::ImportLinks));

        for step in plan.steps.iter().filter(|s| matches!(s.action, Action::Provision(_))) {
            let d = step.delay.as_secs_f64();
            assert!((0.3..2.3).contains(&d), "{d}");
        }
    }

    #[test]
    fn fixture_failure_falls_back() {
        let orch = Orchestrator::new();
        let store = TopologyStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        let plan = orch
            .plan(
                Operation::BringUpAll,
                &store,
                &SimConfig::default(),
                &FixtureSource::Path("/nonexistent/fixture.yaml".into()),
                &mut rng,
            )
            .unwrap();

        assert_eq!(plan.fallback.clone().unwrap(), ErrorKind::ExternalResource);
        assert_eq!(plan.fixture, Fixture::fallback());
        assert!(!actions(&plan).contains(&&Action::CreateBuses));
    }

    #[test]
    fn missing_types() {
        let orch = Orchestrator::new();
        let store = TopologyStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        let config = SimConfig::default();

        for op in [
            Operation::TearDown(NfType::Amf),
            Operation::Start(NfType::Amf),
            Operation::Stop(NfType::Amf),
        ] {
            let err = orch
                .plan(op, &store, &config, &FixtureSource::Embedded, &mut rng)
                .unwrap_err();
            assert_eq!(err, ErrorKind::NotFound);
        }

        let plan = orch
            .plan(
                Operation::TearDownAll,
                &store,
                &config,
                &FixtureSource::Embedded,
                &mut rng,
            )
            .unwrap();
        assert!(matches!(actions(&plan).as_slice(), [Action::Report(_)]));
    }
}
