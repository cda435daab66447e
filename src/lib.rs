//! Stochastic intracellular reaction kernel for agent-based simulations.
//!
//! Each agent owns a [`ReactionNetwork`]: a table of molecule species, a list
//! of reaction rows and a propensity cache. Every simulation tick calls
//! [`ReactionNetwork::execute_step`], which advances the agent's molecule
//! counts with Gillespie's direct method. Propensities are kept in a sum
//! tree and, after each event, only the reactions that depend on a changed
//! molecule are recomputed.
//!
//! Rates and firing conditions are small expression trees ([`Expr`],
//! [`Condition`]) evaluated against a live [`Context`] that exposes the
//! agent's counts, the environment field and the simulation parameters.

mod config;
mod context;
mod engine;
mod ensemble;
mod error;
mod expression;
mod network;
mod program;
mod propensity;

pub use config::{EngineConfig, EnsembleConfig, SimulationConfig};
pub use context::{
    Context, Coordinate, Environment, MoleculeCounts, MoleculeStore, ParameterTable, Parameters,
    SignalId,
};
pub use engine::{StepReport, derive_seed};
pub use ensemble::run_replicates;
pub use error::{ReactionError, Result};
pub use expression::{BinaryOp, CompareOp, Condition, Expr, UnaryOp};
pub use network::{
    MoleculeId, MoleculeTable, NULL_MOLECULE, Reaction, ReactionId, ReactionNetwork,
    StoichiometryEntry,
};
pub use program::{HostObject, ReactionProgram};
