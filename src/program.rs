//! Binding of a reaction network to one simulated object.
//!
//! Hosts hold heterogeneous objects; only those exposing a [`MoleculeStore`]
//! can run reactions. The capability is checked once, when the program is
//! attached, rather than on every tick.

use crate::config::EngineConfig;
use crate::context::{Context, Coordinate, Environment, MoleculeStore, ParameterTable};
use crate::engine::{StepReport, derive_seed};
use crate::error::{ReactionError, Result};
use crate::network::ReactionNetwork;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Simulated object as seen by the reaction kernel.
pub trait HostObject {
    /// Type name used in error messages.
    fn kind(&self) -> &str;

    fn molecule_store(&self) -> Option<&dyn MoleculeStore> {
        None
    }

    fn molecule_store_mut(&mut self) -> Option<&mut dyn MoleculeStore> {
        None
    }
}

/// A network instance owned by one object, with its own random generator.
#[derive(Clone, Debug)]
pub struct ReactionProgram {
    network: ReactionNetwork,
    rng: ChaCha8Rng,
    config: EngineConfig,
}

impl ReactionProgram {
    /// Binds `network` to `host`. Fails when the host carries no molecule
    /// counts.
    ///
    /// `agent_index` selects the generator stream, so agents sharing a base
    /// seed still draw independent numbers.
    pub fn attach(
        network: ReactionNetwork,
        host: &dyn HostObject,
        config: &EngineConfig,
        agent_index: u64,
    ) -> Result<Self> {
        if host.molecule_store().is_none() {
            return Err(ReactionError::MissingCapability {
                kind: host.kind().to_string(),
            });
        }
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(derive_seed(Some(seed), agent_index)),
            None => ChaCha8Rng::from_entropy(),
        };
        debug!(
            kind = host.kind(),
            agent_index,
            reactions = network.reaction_count(),
            "attached reaction program"
        );
        Ok(Self {
            network,
            rng,
            config: config.clone(),
        })
    }

    /// Runs one simulation tick of length `time_step` on `host`.
    pub fn call(
        &mut self,
        host: &mut dyn HostObject,
        environment: Option<&dyn Environment>,
        coordinates: &[Coordinate],
        parameters: &dyn ParameterTable,
        time_step: f64,
    ) -> Result<StepReport> {
        let agent = match host.molecule_store_mut() {
            Some(agent) => agent,
            None => {
                return Err(ReactionError::MissingCapability {
                    kind: host.kind().to_string(),
                });
            }
        };
        let mut ctx = Context::new(agent, environment, coordinates, parameters);
        if self.config.refresh_external_on_entry {
            self.network.refresh_external(&ctx);
        }
        self.network
            .run_with_context(&mut ctx, time_step, &mut self.rng)
    }

    pub fn network(&self) -> &ReactionNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut ReactionNetwork {
        &mut self.network
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
