//!
//! The simulation application.
//!
//! [`Simulation`] owns the topology and every component acting on it.
//! All mutations run inside event handlers or through the methods of
//! `Runtime<Simulation>`, so there is exactly one writer at a time.
//!

use std::net::Ipv4Addr;
use tracing::Level;

use fxhash::FxHashMap;

use crate::{
    alloc::Allocator,
    config::SimConfig,
    error::{Error, Result},
    fixture::{Fixture, FixtureSource, NfDef},
    lifecycle::{LifecycleController, Stabilize, Transition},
    model::{
        parse_address, parse_port, Bus, BusConnection, ConsoleId, HttpProtocol, NetworkFunction,
        NfConfig, NfId, NfStatus, NfType, Position,
    },
    notify::{Notification, NotificationHub, NotificationSink},
    orchestrator::{Action, CommandId, Operation, Orchestrator},
    reachability::{subnet_peers, PingMode, PingProbe, PingReport, PingStats, Reachability},
    runtime::{Application, Context, Event, EventSet, Runtime},
    store::TopologyStore,
    time::{Duration, SimTime},
    wiring::{self, UpfPeers},
};

type Ctx<'a> = Context<'a, Simulation>;

/// The next step of the running orchestration command is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStep {
    pub command: CommandId,
}

/// The events of a [`Simulation`].
#[derive(Debug)]
pub enum SimEvent {
    Stabilize(Stabilize),
    CommandStep(CommandStep),
    PingProbe(PingProbe),
}

impl From<Stabilize> for SimEvent {
    fn from(event: Stabilize) -> Self {
        SimEvent::Stabilize(event)
    }
}

impl From<CommandStep> for SimEvent {
    fn from(event: CommandStep) -> Self {
        SimEvent::CommandStep(event)
    }
}

impl From<PingProbe> for SimEvent {
    fn from(event: PingProbe) -> Self {
        SimEvent::PingProbe(event)
    }
}

impl EventSet<Simulation> for SimEvent {
    fn handle(self, rt: &mut Runtime<Simulation>) {
        match self {
            SimEvent::Stabilize(event) => event.handle(rt),
            SimEvent::CommandStep(event) => event.handle(rt),
            SimEvent::PingProbe(event) => event.handle(rt),
        }
    }
}

impl Event<Simulation> for Stabilize {
    fn handle(self, rt: &mut Runtime<Simulation>) {
        let (app, mut ctx) = rt.split();
        app.on_stabilize(self, &mut ctx);
    }
}

impl Event<Simulation> for CommandStep {
    fn handle(self, rt: &mut Runtime<Simulation>) {
        let (app, mut ctx) = rt.split();
        app.on_command_step(self, &mut ctx);
    }
}

impl Event<Simulation> for PingProbe {
    fn handle(self, rt: &mut Runtime<Simulation>) {
        let (app, mut ctx) = rt.split();
        app.on_ping_probe(self, &mut ctx);
    }
}

/// Addressing requested for a manually added network function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NfRequest {
    pub ip: Option<String>,
    pub port: Option<u32>,
    pub position: Option<Position>,
}

/// A terminal session.
#[derive(Debug, Default)]
pub struct Console {
    /// The type whose entity acts as ping source.
    pub attached: Option<NfType>,
    output: Vec<String>,
    pings: Vec<PingStats>,
}

#[derive(Clone, Copy)]
enum Placement<'a> {
    /// Declared addresses are used if free, missing or taken ones are
    /// allocated.
    Declared(&'a NfDef),
    /// Requested addresses must be valid and free.
    Manual(&'a NfRequest),
}

/// Creates network functions. Borrows the parts of a [`Simulation`]
/// that creation touches, so that the store can be lent out separately.
struct Provisioner<'a> {
    config: &'a SimConfig,
    lifecycle: &'a mut LifecycleController,
    notifications: &'a mut NotificationHub,
}

impl Provisioner<'_> {
    fn create(
        &mut self,
        store: &mut TopologyStore,
        ctx: &mut Ctx<'_>,
        nf_type: NfType,
        placement: Placement<'_>,
    ) -> Result<NfId> {
        let alloc = Allocator::new(&self.config.allocation);
        let addresses = store.addresses_in_use();
        let ports = store.ports_in_use();

        let (ip_address, port, position) = match placement {
            Placement::Manual(request) => {
                let ip = match &request.ip {
                    Some(ip) => {
                        let ip = parse_address(ip)?;
                        if let Some(owner) = store.nf_by_address(ip) {
                            return Err(Error::conflict(format!(
                                "address {ip} is already used by {}",
                                owner.name
                            )));
                        }
                        ip
                    }
                    None => alloc.next_address(&addresses, ctx.rng()),
                };
                let port = match request.port {
                    Some(port) => {
                        let port = parse_port(port)?;
                        if ports.contains(&port) {
                            return Err(Error::conflict(format!("port {port} is already in use")));
                        }
                        port
                    }
                    None => alloc.next_port(&ports, ctx.rng()),
                };
                (ip, port, request.position.unwrap_or_default())
            }
            Placement::Declared(def) => {
                let ip = match def.ip {
                    Some(ip) if !addresses.contains(&ip) => ip,
                    declared => {
                        if let Some(ip) = declared {
                            tracing::debug!("declared address {ip} of {} is taken", def.key);
                        }
                        alloc.next_address(&addresses, ctx.rng())
                    }
                };
                let port = match def.port {
                    Some(port) if !ports.contains(&port) => port,
                    _ => alloc.next_port(&ports, ctx.rng()),
                };
                (ip, port, def.position)
            }
        };

        let now = ctx.now();
        let id = store.next_id();
        let nf = NetworkFunction {
            id,
            nf_type,
            name: store.next_name(nf_type),
            position,
            config: NfConfig {
                ip_address,
                port,
                http_protocol: self.config.http_protocol,
            },
            status: NfStatus::Starting,
            status_timestamp: now,
            created_at: now,
        };
        tracing::info!("{} created at {ip_address}:{port}", nf.name);
        self.notifications.publish(Notification::lifecycle(&nf, None));
        store.add(nf)?;
        self.lifecycle.arm::<SimEvent>(id, now, ctx);

        if matches!(placement, Placement::Manual(_)) {
            wiring::attach_to_first_bus(store, id, now);
        }
        Ok(id)
    }
}

/// A simulated 5G core deployment.
#[derive(Debug)]
pub struct Simulation {
    pub config: SimConfig,
    pub store: TopologyStore,
    pub lifecycle: LifecycleController,
    pub orchestrator: Orchestrator,
    pub reachability: Reachability,
    pub fixtures: FixtureSource,
    pub notifications: NotificationHub,
    consoles: FxHashMap<ConsoleId, Console>,
    next_console: u64,
}

impl Simulation {
    /// Creates an empty deployment. The fixture is taken from the
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if the configuration is invalid.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lifecycle: LifecycleController::new(config.stabilization_delay()),
            reachability: Reachability::new(config.ping),
            fixtures: FixtureSource::from(config.fixture.clone()),
            store: TopologyStore::new(),
            orchestrator: Orchestrator::new(),
            notifications: NotificationHub::new(),
            consoles: FxHashMap::default(),
            next_console: 0,
            config,
        })
    }

    #[must_use]
    pub fn with_fixtures(mut self, fixtures: FixtureSource) -> Self {
        self.fixtures = fixtures;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.notifications.add_sink(sink);
        self
    }

    /// Whether a command or a ping is still in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.orchestrator.is_idle() || self.reachability.is_active()
    }

    pub fn open_console(&mut self) -> ConsoleId {
        self.next_console += 1;
        let id = ConsoleId(self.next_console);
        self.consoles.insert(id, Console::default());
        id
    }

    #[must_use]
    pub fn console(&self, id: ConsoleId) -> Option<&Console> {
        self.consoles.get(&id)
    }

    ///
    /// Selects the type whose entity pings from this console.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the console does not exist.
    ///
    pub fn attach(&mut self, console: ConsoleId, nf_type: NfType) -> Result<()> {
        let console = self
            .consoles
            .get_mut(&console)
            .ok_or_else(|| Error::not_found(format!("{console} does not exist")))?;
        console.attached = Some(nf_type);
        Ok(())
    }

    /// Drains the output lines of a console.
    pub fn take_output(&mut self, console: ConsoleId) -> Vec<String> {
        self.consoles
            .get_mut(&console)
            .map(|console| std::mem::take(&mut console.output))
            .unwrap_or_default()
    }

    /// Drains the completed ping results of a console.
    pub fn take_ping_results(&mut self, console: ConsoleId) -> Vec<PingStats> {
        self.consoles
            .get_mut(&console)
            .map(|console| std::mem::take(&mut console.pings))
            .unwrap_or_default()
    }

    fn emit(&mut self, console: ConsoleId, line: impl Into<String>) {
        match self.consoles.get_mut(&console) {
            Some(console) => console.output.push(line.into()),
            None => tracing::trace!("dropping output of closed {console}"),
        }
    }

    fn provisioner(&mut self) -> (&mut TopologyStore, Provisioner<'_>) {
        (
            &mut self.store,
            Provisioner {
                config: &self.config,
                lifecycle: &mut self.lifecycle,
                notifications: &mut self.notifications,
            },
        )
    }

    //
    // # Orchestration
    //

    /// Queues an orchestration command.
    pub fn submit(&mut self, console: ConsoleId, op: Operation, ctx: &mut Ctx<'_>) -> CommandId {
        let idle = self.orchestrator.active_command().is_none();
        let id = self.orchestrator.submit(console, op);
        if idle {
            self.pump(ctx);
        }
        id
    }

    ///
    /// Drives the orchestrator until a step is scheduled or nothing is
    /// left to do. Must only be called while no step event is pending.
    ///
    fn pump(&mut self, ctx: &mut Ctx<'_>) {
        loop {
            if let Some(command) = self.orchestrator.active_command() {
                match self.orchestrator.next_delay() {
                    Some(delay) => {
                        ctx.add_event_in(CommandStep { command: command.id }, delay);
                        return;
                    }
                    None => {
                        self.orchestrator.finish(Ok(()), ctx.now());
                    }
                }
            }

            let Some(command) = self.orchestrator.dequeue() else {
                return;
            };
            let planned = self.orchestrator.plan(
                command.op,
                &self.store,
                &self.config,
                &self.fixtures,
                ctx.rng(),
            );
            match planned {
                Ok(plan) => {
                    if let Some(e) = &plan.fallback {
                        self.notifications.log(
                            Level::WARN,
                            format!("fixture unavailable, using the default set: {e}"),
                            ctx.now(),
                        );
                        self.emit(
                            command.console,
                            " ! Fixture unavailable, using the default service set",
                        );
                    }
                    self.orchestrator.activate(command, plan, ctx.now());
                }
                Err(e) => {
                    self.emit(command.console, format!("Error: {e}"));
                    self.orchestrator.reject(command, e);
                }
            }
        }
    }

    fn on_command_step(&mut self, step: CommandStep, ctx: &mut Ctx<'_>) {
        let Some(command) = self.orchestrator.active_command() else {
            return;
        };
        let Some(next) = self.orchestrator.pop_step(step.command) else {
            return;
        };

        if let Err(e) = self.execute(next.action, command.console, ctx) {
            // completed steps are kept, the rest of the command is dropped
            self.emit(command.console, format!("Error: {e}"));
            self.orchestrator.finish(Err(e), ctx.now());
        }
        self.pump(ctx);
    }

    fn execute(&mut self, action: Action, console: ConsoleId, ctx: &mut Ctx<'_>) -> Result<()> {
        let now = ctx.now();
        match action {
            Action::CreateNetwork => {
                self.orchestrator.set_network_up(true);
                let line = format!(" ✔ Network {}  Created", self.config.network_name);
                self.emit(console, line);
            }
            Action::CreateBuses => {
                let defs = self
                    .orchestrator
                    .fixture()
                    .map(|fixture| fixture.buses.clone())
                    .unwrap_or_default();
                for def in defs {
                    if self.store.all::<Bus>().any(|bus| bus.name == def.name) {
                        continue;
                    }
                    let id = self.store.next_id();
                    self.store.add(Bus {
                        id,
                        name: def.name,
                        position: def.position,
                        orientation: def.orientation,
                        length: def.length,
                    })?;
                }
            }
            Action::Provision(def) => {
                let service = def.nf_type.service_name();
                if let Some(existing) = self.store.nf_by_type(def.nf_type) {
                    let id = existing.id;
                    self.orchestrator.record_key(&def.key, id);
                    self.emit(console, format!(" ✔ Container {service}  Running"));
                    return Ok(());
                }
                let (store, mut provisioner) = self.provisioner();
                let id = provisioner.create(store, ctx, def.nf_type, Placement::Declared(&def))?;
                self.orchestrator.record_key(&def.key, id);
                self.emit(console, format!(" ✔ Container {service}  Started"));
            }
            Action::ImportLinks => {
                let n = self.orchestrator.import_links(&mut self.store, now);
                tracing::debug!("imported {n} fixture links");
            }
            Action::Remove(id) => match self.delete_nf(id, now) {
                Ok(nf) => {
                    let line = format!(" ✔ Container {}  Removed", nf.service_name());
                    self.emit(console, line);
                }
                Err(_) => tracing::debug!("{id} was removed before its teardown step"),
            },
            Action::RemoveBuses => {
                let links = self.store.all::<BusConnection>().map(|link| link.id).collect::<Vec<_>>();
                for id in links {
                    self.store.remove(id);
                }
                let buses = self.store.all::<Bus>().map(|bus| bus.id).collect::<Vec<_>>();
                for id in buses {
                    self.store.remove(id);
                }
            }
            Action::RemoveNetwork => {
                self.orchestrator.set_network_up(false);
                let line = format!(" ✔ Network {}  Removed", self.config.network_name);
                self.emit(console, line);
            }
            Action::Start(id) => {
                let transition = self.lifecycle.start::<SimEvent>(&mut self.store, id, now, ctx)?;
                self.report_transition(console, id, transition, "Started");
            }
            Action::Stop(id) => {
                let transition = self.lifecycle.stop(&mut self.store, id, now)?;
                self.report_transition(console, id, transition, "Stopped");
            }
            Action::Report(line) => self.emit(console, line),
        }
        Ok(())
    }

    fn report_transition(
        &mut self,
        console: ConsoleId,
        id: NfId,
        transition: Transition,
        verb: &str,
    ) {
        let Some(nf) = self.store.get(id).cloned() else {
            return;
        };
        let service = nf.service_name();
        match transition {
            Transition::Changed { from, .. } => {
                self.notifications
                    .publish(Notification::lifecycle(&nf, Some(from)));
                self.emit(console, format!(" ✔ Container {service}  {verb}"));
            }
            Transition::Unchanged(status) => {
                self.emit(console, format!(" ✔ Container {service}  Already {status}"));
            }
        }
    }

    //
    // # Lifecycle
    //

    fn on_stabilize(&mut self, timer: Stabilize, ctx: &mut Ctx<'_>) {
        let Some(nf) = self.lifecycle.stabilize(&mut self.store, timer, ctx.now()) else {
            return;
        };
        self.notifications
            .publish(Notification::lifecycle(&nf, Some(NfStatus::Starting)));

        if nf.nf_type == NfType::Upf {
            if let Err(e) = self.wire_upf(nf.id, ctx) {
                tracing::warn!("failed to wire {}: {e}", nf.name);
                self.notifications
                    .log(Level::WARN, format!("failed to wire {}: {e}", nf.name), ctx.now());
            }
        }
    }

    fn wire_upf(&mut self, upf: NfId, ctx: &mut Ctx<'_>) -> Result<UpfPeers> {
        let fixture = self.fixtures.fetch().unwrap_or_else(|e| {
            tracing::debug!("wiring with the default set: {e}");
            Fixture::fallback()
        });
        let now = ctx.now();
        let (store, mut provisioner) = self.provisioner();
        wiring::wire_upf(store, upf, now, |store, nf_type| {
            let def = fixture
                .nf_def(nf_type)
                .cloned()
                .unwrap_or_else(|| NfDef::bare(nf_type));
            provisioner.create(store, ctx, nf_type, Placement::Declared(&def))
        })
    }

    //
    // # Topology editing
    //

    ///
    /// Adds a network function with requested or allocated addresses.
    /// The new entity starts in `starting` and is attached to the first
    /// bus, unless its type never joins a bus.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for malformed addresses and a
    /// `Conflict` error for addresses already in use.
    ///
    pub fn add_nf(&mut self, nf_type: NfType, request: &NfRequest, ctx: &mut Ctx<'_>) -> Result<NfId> {
        let (store, mut provisioner) = self.provisioner();
        provisioner.create(store, ctx, nf_type, Placement::Manual(request))
    }

    ///
    /// Changes the address or port of a network function.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error for unknown entities, a `Validation`
    /// error for malformed values and a `Conflict` error for values
    /// used by another entity.
    ///
    pub fn update_nf_config(&mut self, id: NfId, ip: Option<&str>, port: Option<u32>) -> Result<()> {
        let mut nf = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{id} does not exist")))?;

        if let Some(ip) = ip {
            let ip = parse_address(ip)?;
            if let Some(owner) = self.store.nf_by_address(ip).filter(|owner| owner.id != id) {
                return Err(Error::conflict(format!(
                    "address {ip} is already used by {}",
                    owner.name
                )));
            }
            nf.config.ip_address = ip;
        }
        if let Some(port) = port {
            let port = parse_port(port)?;
            if self.store.nfs().any(|other| other.id != id && other.config.port == port) {
                return Err(Error::conflict(format!("port {port} is already in use")));
            }
            nf.config.port = port;
        }
        self.store.update(nf)
    }

    ///
    /// Removes a network function and every link touching it. A pending
    /// stabilization timer is cancelled.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the entity does not exist.
    ///
    pub fn delete_nf(&mut self, id: NfId, now: SimTime) -> Result<NetworkFunction> {
        let nf = self
            .store
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("{id} does not exist")))?;
        self.lifecycle.cancel(id);
        let links = self.store.detach(id);
        tracing::info!("{} removed with {links} links", nf.name);
        self.notifications.publish(Notification::Removed {
            nf: id,
            name: nf.name.clone(),
            at: now,
        });
        Ok(nf)
    }

    ///
    /// Switches the HTTP version of the deployment. Every network
    /// function and every HTTP bus connection follows. Returns the number
    /// of updated entities.
    ///
    /// # Errors
    ///
    /// Fails if an entity vanished from the store during the update.
    ///
    pub fn set_http_protocol(&mut self, protocol: HttpProtocol) -> Result<usize> {
        self.config.http_protocol = protocol;

        let nfs = self
            .store
            .nfs()
            .filter(|nf| nf.config.http_protocol != protocol)
            .cloned()
            .collect::<Vec<_>>();
        let links = self
            .store
            .all::<BusConnection>()
            .filter(|link| {
                link.protocol.to_ascii_uppercase().starts_with("HTTP")
                    && link.protocol != protocol.to_string()
            })
            .cloned()
            .collect::<Vec<_>>();

        let n = nfs.len() + links.len();
        for mut nf in nfs {
            nf.config.http_protocol = protocol;
            self.store.update(nf)?;
        }
        for mut link in links {
            link.protocol = protocol.to_string();
            self.store.update(link)?;
        }
        tracing::info!("switched to {protocol}, {n} entities updated");
        Ok(n)
    }

    //
    // # Reachability
    //

    /// The entity acting as ping source of a console.
    fn ping_source(&self, console: ConsoleId) -> Result<&NetworkFunction> {
        let nf_type = self
            .consoles
            .get(&console)
            .ok_or_else(|| Error::not_found(format!("{console} does not exist")))?
            .attached
            .ok_or_else(|| {
                Error::not_found("no service attached, use 'attach <service>' first")
            })?;
        self.store.nf_by_type(nf_type).ok_or_else(|| {
            Error::not_found(format!("service {} is not running", nf_type.service_name()))
        })
    }

    ///
    /// Pings `target`, or every other entity in the source's /24 if no
    /// target is given. Results arrive on the console as the probes run.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the console has no running source
    /// and a `State` error if the source is still pinging.
    ///
    pub fn ping(
        &mut self,
        console: ConsoleId,
        target: Option<Ipv4Addr>,
        mode: PingMode,
        ctx: &mut Ctx<'_>,
    ) -> Result<()> {
        let source = self.ping_source(console)?;
        let source_id = source.id;
        let targets = match target {
            Some(target) => vec![target],
            None => subnet_peers(&self.store, source),
        };
        if targets.is_empty() {
            let [a, b, c] = source.subnet();
            let line = format!("no other network functions in {a}.{b}.{c}.0/24");
            self.emit(console, line);
            return Ok(());
        }

        let report = self.reachability.begin::<SimEvent>(
            &self.store,
            source_id,
            console,
            targets,
            mode,
            ctx.now(),
            ctx,
        )?;
        self.apply(report);
        Ok(())
    }

    fn on_ping_probe(&mut self, probe: PingProbe, ctx: &mut Ctx<'_>) {
        let now = ctx.now();
        let Some(mut report) = self.reachability.probe(&self.store, probe, now, ctx.rng()) else {
            return;
        };
        if let Some((probe, at)) = report.next.take() {
            ctx.add_event(probe, at);
        }
        self.apply(report);
    }

    fn apply(&mut self, report: PingReport) {
        let Some(console) = self.consoles.get_mut(&report.console) else {
            return;
        };
        console.output.extend(report.lines);
        console.pings.extend(report.finished);
    }
}

impl Application for Simulation {
    type EventSet = SimEvent;

    fn at_sim_start(rt: &mut Runtime<Self>) {
        tracing::info!(
            "simulating network {} with {} entities",
            rt.app.config.network_name,
            rt.app.store.count::<NetworkFunction>()
        );
    }
}

///
/// Synchronous drivers. Each call mutates the topology, then dispatches
/// events until no command and no ping is in flight.
///
impl Runtime<Simulation> {
    pub fn open_console(&mut self) -> ConsoleId {
        self.app.open_console()
    }

    ///
    /// Selects the ping source of a console.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the console does not exist.
    ///
    pub fn attach(&mut self, console: ConsoleId, nf_type: NfType) -> Result<()> {
        self.app.attach(console, nf_type)
    }

    /// Queues a command without dispatching any events.
    pub fn submit(&mut self, console: ConsoleId, op: Operation) -> CommandId {
        let (app, mut ctx) = self.split();
        app.submit(console, op, &mut ctx)
    }

    /// Dispatches events until the simulation is idle. Returns `false` if
    /// the runtime ran out of events or hit its limit first.
    pub fn settle(&mut self) -> bool {
        self.dispatch_while(Simulation::is_busy)
    }

    ///
    /// Runs a command to completion.
    ///
    /// # Errors
    ///
    /// Returns the error that rejected or aborted the command.
    ///
    pub fn run(&mut self, console: ConsoleId, op: Operation) -> Result<()> {
        let id = self.submit(console, op);
        self.settle();
        if let Some(outcome) = self.app.orchestrator.take_outcome(id) {
            return outcome;
        }

        let e = if self.limit_reached() {
            Error::state(format!("{id} '{op}' halted at runtime limit {}", self.limit()))
        } else {
            Error::state(format!("{id} '{op}' did not complete"))
        };
        self.app.emit(console, format!("Error: {e}"));
        Err(e)
    }

    ///
    /// Pings a target, or the source's /24 if `target` is `None`, and
    /// returns the statistics of every target.
    ///
    /// # Errors
    ///
    /// See [`Simulation::ping`].
    ///
    pub fn ping(
        &mut self,
        console: ConsoleId,
        target: Option<Ipv4Addr>,
        mode: PingMode,
    ) -> Result<Vec<PingStats>> {
        let (app, mut ctx) = self.split();
        app.ping(console, target, mode, &mut ctx)?;
        self.settle();
        Ok(self.app.take_ping_results(console))
    }

    ///
    /// Adds a network function.
    ///
    /// # Errors
    ///
    /// See [`Simulation::add_nf`].
    ///
    pub fn add_nf(&mut self, nf_type: NfType, request: &NfRequest) -> Result<NfId> {
        let (app, mut ctx) = self.split();
        app.add_nf(nf_type, request, &mut ctx)
    }

    ///
    /// Removes a network function.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the entity does not exist.
    ///
    pub fn delete_nf(&mut self, id: NfId) -> Result<NetworkFunction> {
        let now = self.sim_time();
        self.app.delete_nf(id, now)
    }

    /// Lets simulated time pass.
    pub fn wait(&mut self, duration: Duration) {
        self.advance_by(duration);
    }

    pub fn take_output(&mut self, console: ConsoleId) -> Vec<String> {
        self.app.take_output(console)
    }
}
