#![allow(dead_code)]

use nfsim::prelude::*;

pub fn runtime() -> Runtime<Simulation> {
    runtime_with(Simulation::new(SimConfig::default()).unwrap())
}

pub fn runtime_with(sim: Simulation) -> Runtime<Simulation> {
    Builder::seeded(0x5c0e).build(sim)
}

/// A runtime with the demo deployment up and stable.
pub fn deployed() -> (Runtime<Simulation>, ConsoleId) {
    let mut rt = runtime();
    let console = rt.open_console();
    rt.run(console, Operation::BringUpAll).unwrap();
    rt.wait(Duration::from_secs(6));
    rt.take_output(console);
    (rt, console)
}

pub fn count_of(rt: &Runtime<Simulation>, typ: NfType) -> usize {
    rt.app.store.nfs().filter(|nf| nf.nf_type == typ).count()
}

pub fn interfaces(rt: &Runtime<Simulation>) -> Vec<String> {
    let mut names = rt
        .app
        .store
        .all::<Connection>()
        .map(|con| con.interface_name.clone())
        .collect::<Vec<_>>();
    names.sort();
    names
}
