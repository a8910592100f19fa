//!
//! The text command surface of a simulation.
//!
//! Every [`Terminal`] owns one console of the [`Simulation`]. Commands
//! run to completion before [`Terminal::execute`] returns, so the output
//! of a command is complete once it is printed.
//!

use std::{fmt::Write, net::Ipv4Addr, str::FromStr};

use crate::{
    error::{Error, Result},
    model::{
        parse_address, Bus, BusConnection, Connection, ConsoleId, HttpProtocol, NfId, NfType,
    },
    orchestrator::Operation,
    reachability::PingMode,
    runtime::Runtime,
    sim::Simulation,
    time::Duration,
};

/// A parsed terminal command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Deploys every service, or a single one.
    Up(Option<NfType>),
    /// Removes every service, or a single one.
    Down(Option<NfType>),
    Start(NfType),
    Stop(NfType),
    Status,
    Connections,
    Ping(Ipv4Addr),
    /// Pings within the source's /24, optionally a single target.
    PingSubnet(Option<Ipv4Addr>),
    Attach(NfType),
    /// Shows or switches the HTTP version.
    Protocol(Option<HttpProtocol>),
    Wait(Duration),
    Help,
    Clear,
    Exit,
}

impl Command {
    /// The orchestration operation behind a command, if any.
    #[must_use]
    pub fn operation(self) -> Option<Operation> {
        Some(match self {
            Command::Up(None) => Operation::BringUpAll,
            Command::Up(Some(t)) => Operation::BringUp(t),
            Command::Down(None) => Operation::TearDownAll,
            Command::Down(Some(t)) => Operation::TearDown(t),
            Command::Start(t) => Operation::Start(t),
            Command::Stop(t) => Operation::Stop(t),
            _ => return None,
        })
    }
}

fn service(arg: Option<&str>, usage: &str) -> Result<NfType> {
    match arg {
        Some(name) => NfType::resolve(name),
        None => Err(Error::validation(format!("usage: {usage}"))),
    }
}

fn address(arg: Option<&str>) -> Result<Option<Ipv4Addr>> {
    arg.map(parse_address).transpose()
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let words = line.split_whitespace().collect::<Vec<_>>();
        let arg = |i: usize| words.get(i).copied();

        let command = match words.as_slice() {
            ["bring-up-all"] => Command::Up(None),
            ["bring-up", ..] => Command::Up(Some(service(arg(1), "bring-up <service>")?)),
            ["tear-down-all"] => Command::Down(None),
            ["tear-down", ..] => Command::Down(Some(service(arg(1), "tear-down <service>")?)),
            ["start", ..] => Command::Start(service(arg(1), "start <service>")?),
            ["stop", ..] => Command::Stop(service(arg(1), "stop <service>")?),
            ["status"] | ["docker", "ps"] => Command::Status,
            ["connections"] => Command::Connections,
            ["ping", addr] => Command::Ping(parse_address(addr)?),
            ["ping"] => return Err(Error::validation("usage: ping <address>")),
            ["ping-subnet"] | ["ping-subnet", _] => Command::PingSubnet(address(arg(1))?),
            ["attach", ..] => Command::Attach(service(arg(1), "attach <service>")?),
            ["protocol"] => Command::Protocol(None),
            ["protocol", p] => Command::Protocol(Some(p.parse()?)),
            ["wait", secs] => {
                let duration = secs
                    .parse::<f64>()
                    .ok()
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .ok_or_else(|| Error::validation(format!("invalid duration '{secs}'")))?;
                Command::Wait(duration)
            }
            ["help"] => Command::Help,
            ["clear"] => Command::Clear,
            ["exit"] => Command::Exit,

            ["docker", "compose", "up", "-d"] => Command::Up(None),
            ["docker", "compose", "up", "-d", name] => Command::Up(Some(NfType::resolve(name)?)),
            ["docker", "compose", "down"] => Command::Down(None),
            ["docker", "compose", "down", name] => Command::Down(Some(NfType::resolve(name)?)),
            ["docker", "compose", "start", name] => Command::Start(NfType::resolve(name)?),
            ["docker", "compose", "stop", name] => Command::Stop(NfType::resolve(name)?),

            [] => return Err(Error::validation("empty command")),
            _ => {
                return Err(Error::not_found(format!(
                    "command not found: {}",
                    line.trim()
                )))
            }
        };
        Ok(command)
    }
}

/// What the presentation layer should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Output(Vec<String>),
    Clear,
    Exit,
}

const HELP: &[&str] = &[
    "bring-up-all                 deploy every core service",
    "bring-up <service>           deploy a single service",
    "tear-down-all                remove every service",
    "tear-down <service>          remove a single service",
    "start | stop <service>       start or stop a deployed service",
    "status                       list all network functions",
    "connections                  list all links",
    "attach <service>             ping from this service",
    "ping <address>               send 4 packets to an address",
    "ping-subnet [address]        ping within the attached service's /24",
    "protocol [HTTP/1|HTTP/2]     show or switch the HTTP version",
    "wait <seconds>               let simulated time pass",
    "docker compose up -d | down | start | stop [service]",
    "docker ps",
    "help | clear | exit",
];

/// A terminal session attached to one console of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    console: ConsoleId,
}

impl Terminal {
    /// Opens a new console on the simulation.
    pub fn open(rt: &mut Runtime<Simulation>) -> Self {
        Self {
            console: rt.open_console(),
        }
    }

    #[must_use]
    pub fn console(&self) -> ConsoleId {
        self.console
    }

    /// Parses and runs one line of input.
    pub fn execute(&self, rt: &mut Runtime<Simulation>, line: &str) -> Outcome {
        if line.trim().is_empty() {
            return Outcome::Output(Vec::new());
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return Outcome::Output(vec![e.to_string()]),
        };
        tracing::debug!("{} > {line}", self.console);

        match command {
            Command::Clear => return Outcome::Clear,
            Command::Exit => return Outcome::Exit,
            _ => {}
        }

        let mut lines = match self.run(rt, command) {
            Ok(lines) => lines,
            Err(e) => vec![format!("Error: {e}")],
        };
        let mut output = rt.take_output(self.console);
        output.append(&mut lines);
        Outcome::Output(output)
    }

    fn run(&self, rt: &mut Runtime<Simulation>, command: Command) -> Result<Vec<String>> {
        if let Some(op) = command.operation() {
            // failures are already reported on the console
            if let Err(e) = rt.run(self.console, op) {
                tracing::debug!("{op} failed: {e}");
            }
            return Ok(Vec::new());
        }

        match command {
            Command::Status => Ok(status(rt)),
            Command::Connections => Ok(connections(rt)),
            Command::Ping(target) => {
                rt.ping(self.console, Some(target), PingMode::Raw)?;
                Ok(Vec::new())
            }
            Command::PingSubnet(target) => {
                rt.ping(self.console, target, PingMode::SubnetRestricted)?;
                Ok(Vec::new())
            }
            Command::Attach(nf_type) => {
                rt.attach(self.console, nf_type)?;
                Ok(vec![format!("attached to {}", nf_type.service_name())])
            }
            Command::Protocol(None) => Ok(vec![format!(
                "http protocol: {}",
                rt.app.config.http_protocol
            )]),
            Command::Protocol(Some(protocol)) => {
                let n = rt.app.set_http_protocol(protocol)?;
                Ok(vec![format!("http protocol set to {protocol} ({n} updated)")])
            }
            Command::Wait(duration) => {
                rt.wait(duration);
                let mut lines = vec![format!("time is {}", rt.sim_time())];
                if rt.limit_reached() {
                    lines.push(format!("runtime limit reached ({})", rt.limit()));
                }
                Ok(lines)
            }
            Command::Help => Ok(HELP.iter().map(|line| (*line).to_string()).collect()),
            _ => Ok(Vec::new()),
        }
    }
}

fn status(rt: &Runtime<Simulation>) -> Vec<String> {
    let store = &rt.app.store;
    if store.nfs().next().is_none() {
        return vec!["no network functions".to_string()];
    }

    let mut lines = vec![format!(
        "{:<10} {:<10} {:<22} {:<9} {}",
        "NAME", "SERVICE", "ADDRESS", "STATUS", "SINCE"
    )];
    for nf in store.nfs() {
        let mut line = String::new();
        let _ = write!(
            line,
            "{:<10} {:<10} {:<22} {:<9} {}",
            nf.name,
            nf.service_name(),
            format!("{}:{}", nf.config.ip_address, nf.config.port),
            nf.status.to_string(),
            nf.status_timestamp
        );
        lines.push(line);
    }
    lines
}

fn connections(rt: &Runtime<Simulation>) -> Vec<String> {
    let store = &rt.app.store;
    let name = |id: NfId| store.get(id).map_or("?", |nf| nf.name.as_str());

    let mut lines = Vec::new();
    for con in store.all::<Connection>() {
        lines.push(format!(
            "{:<5} {} -> {} ({}{})",
            con.interface_name,
            name(con.source_id),
            name(con.target_id),
            con.protocol,
            if con.is_manual { ", manual" } else { "" }
        ));
    }
    for link in store.all::<BusConnection>() {
        let bus = store.get(link.bus_id).map_or("?", |bus: &Bus| bus.name.as_str());
        lines.push(format!(
            "{:<5} {} => {bus} ({})",
            link.interface_name,
            name(link.nf_id),
            link.protocol
        ));
    }
    if lines.is_empty() {
        lines.push("no connections".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parse_commands() {
        assert_eq!("bring-up-all".parse::<Command>().unwrap(), Command::Up(None));
        assert_eq!(
            "bring-up oai-amf".parse::<Command>().unwrap(),
            Command::Up(Some(NfType::Amf))
        );
        assert_eq!(
            "  stop   oai-smf ".parse::<Command>().unwrap(),
            Command::Stop(NfType::Smf)
        );
        assert_eq!("docker ps".parse::<Command>().unwrap(), Command::Status);
        assert_eq!(
            "docker compose up -d".parse::<Command>().unwrap(),
            Command::Up(None)
        );
        assert_eq!(
            "ping 192.168.70.132".parse::<Command>().unwrap(),
            Command::Ping(Ipv4Addr::new(192, 168, 70, 132))
        );
        assert_eq!(
            "ping-subnet".parse::<Command>().unwrap(),
            Command::PingSubnet(None)
        );
        assert_eq!(
            "wait 2.5".parse::<Command>().unwrap(),
            Command::Wait(Duration::from_millis(2500))
        );
        assert_eq!(
            "protocol HTTP/1".parse::<Command>().unwrap(),
            Command::Protocol(Some(HttpProtocol::Http1))
        );
    }

    #[test]
    fn parse_errors() {
        let err = "launch rockets".parse::<Command>().unwrap_err();
        assert_eq!(err, ErrorKind::NotFound);
        assert_eq!(err.to_string(), "command not found: launch rockets");

        let err = "bring-up oai-foo".parse::<Command>().unwrap_err();
        assert_eq!(err.to_string(), "no such service: oai-foo");

        assert_eq!("ping".parse::<Command>().unwrap_err(), ErrorKind::Validation);
        assert_eq!("ping 1.2.3".parse::<Command>().unwrap_err(), ErrorKind::Validation);
        assert_eq!("wait -1".parse::<Command>().unwrap_err(), ErrorKind::Validation);
        assert_eq!("wait 1e30".parse::<Command>().unwrap_err(), ErrorKind::Validation);
        assert_eq!("wait NaN".parse::<Command>().unwrap_err(), ErrorKind::Validation);
    }

    #[test]
    fn operations() {
        assert_eq!(Command::Up(None).operation(), Some(Operation::BringUpAll));
        assert_eq!(
            Command::Down(Some(NfType::Upf)).operation(),
            Some(Operation::TearDown(NfType::Upf))
        );
        assert_eq!(Command::Status.operation(), None);
    }
}
