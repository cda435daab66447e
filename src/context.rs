//! Capabilities consumed by the kernel and the per-call evaluation context.
//!
//! The hosting simulator owns agents, the diffusion field and the parameter
//! table. The kernel only sees them through the three traits below, bundled
//! into a [`Context`] for the duration of one [`execute_step`] call.
//!
//! [`execute_step`]: crate::ReactionNetwork::execute_step

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Identifier of a signal registered in the environment accessor.
pub type SignalId = usize;

/// Grid cell of the environment field covered by an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: usize,
    pub y: usize,
}

impl Coordinate {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Molecule-count capability an agent must provide to host reactions.
pub trait MoleculeStore {
    fn molecule_count(&self, name: &str) -> u64;

    fn add_molecules(&mut self, name: &str, amount: u64);

    /// Removes up to `amount` molecules. Counts never go below zero.
    fn remove_molecules(&mut self, name: &str, amount: u64);
}

/// Read-only accessor to the environment (diffusion) field.
pub trait Environment {
    fn signal_id(&self, name: &str) -> Option<SignalId>;

    /// Concentration of `signal` over the given grid cells.
    fn concentration(&self, signal: SignalId, coordinates: &[Coordinate]) -> f64;
}

/// Named simulation parameters.
pub trait ParameterTable {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl ParameterTable for () {
    fn lookup(&self, _name: &str) -> Option<f64> {
        None
    }
}

impl<S: BuildHasher> ParameterTable for HashMap<String, f64, S> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl ParameterTable for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Owned parameter table, deserializable from the `[parameters]` table of a
/// configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, f64>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, &value)| (name.as_str(), value))
    }
}

impl ParameterTable for Parameters {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name)
    }
}

/// Plain molecule-count table. Serves as the agent for replicate ensembles
/// and for hosts that keep no richer cell model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoleculeCounts(BTreeMap<String, u64>);

impl MoleculeCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, count: u64) -> Self {
        self.set(name, count);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, count: u64) {
        self.0.insert(name.into(), count);
    }

    pub fn get(&self, name: &str) -> u64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, &count)| (name.as_str(), count))
    }
}

impl MoleculeStore for MoleculeCounts {
    fn molecule_count(&self, name: &str) -> u64 {
        self.get(name)
    }

    fn add_molecules(&mut self, name: &str, amount: u64) {
        let count = self.0.entry(name.to_string()).or_insert(0);
        *count = count.saturating_add(amount);
    }

    fn remove_molecules(&mut self, name: &str, amount: u64) {
        if let Some(count) = self.0.get_mut(name) {
            *count = count.saturating_sub(amount);
        }
    }
}

/// Live references handed to every rate and condition evaluation.
///
/// Built once per [`execute_step`](crate::ReactionNetwork::execute_step) and
/// never snapshotted, so expressions observe counts changed by earlier events
/// of the same call.
pub struct Context<'a> {
    agent: &'a mut dyn MoleculeStore,
    environment: Option<&'a dyn Environment>,
    coordinates: &'a [Coordinate],
    parameters: &'a dyn ParameterTable,
}

impl<'a> Context<'a> {
    pub fn new(
        agent: &'a mut dyn MoleculeStore,
        environment: Option<&'a dyn Environment>,
        coordinates: &'a [Coordinate],
        parameters: &'a dyn ParameterTable,
    ) -> Self {
        Self {
            agent,
            environment,
            coordinates,
            parameters,
        }
    }

    pub fn molecule_count(&self, name: &str) -> u64 {
        self.agent.molecule_count(name)
    }

    /// Environment concentration of `name` at the agent's coordinates; 0 when
    /// there is no environment or the signal is not registered.
    pub fn concentration(&self, name: &str) -> f64 {
        self.environment
            .and_then(|env| {
                env.signal_id(name)
                    .map(|id| env.concentration(id, self.coordinates))
            })
            .unwrap_or(0.0)
    }

    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.lookup(name)
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        self.coordinates
    }

    /// Applies a net change to the agent, clamping removals at the current
    /// count. Returns the change actually applied.
    pub(crate) fn change_molecules(&mut self, name: &str, delta: i64) -> i64 {
        if delta > 0 {
            self.agent.add_molecules(name, delta as u64);
            delta
        } else if delta < 0 {
            let available = self.agent.molecule_count(name);
            let removed = delta.unsigned_abs().min(available);
            if removed > 0 {
                self.agent.remove_molecules(name, removed);
            }
            -(removed as i64)
        } else {
            0
        }
    }
}
