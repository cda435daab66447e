use crate::config::EnsembleConfig;
use crate::context::{MoleculeCounts, ParameterTable};
use crate::engine::derive_seed;
use crate::error::{ReactionError, Result};
use crate::network::ReactionNetwork;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::debug;

/// Runs `config.replicates` independent trajectories of `network` starting
/// from `initial`, without an environment, and returns the final counts in
/// replicate order.
///
/// Replicate `i` draws from a generator seeded with
/// `derive_seed(config.seed, i)`, so results depend on the seed only and not
/// on the number of worker threads.
pub fn run_replicates(
    network: &ReactionNetwork,
    initial: &MoleculeCounts,
    parameters: &(dyn ParameterTable + Sync),
    config: &EnsembleConfig,
) -> Result<Vec<MoleculeCounts>> {
    config.validate()?;

    let simulate = || -> Result<Vec<MoleculeCounts>> {
        (0..config.replicates)
            .into_par_iter()
            .map(|idx| {
                let mut network = network.clone();
                let mut counts = initial.clone();
                let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(config.seed, idx as u64));
                for _ in 0..config.steps {
                    let report = network.execute_step(
                        &mut counts,
                        None,
                        &[],
                        parameters,
                        config.time_step,
                        &mut rng,
                    )?;
                    if report.exhausted && network.total_propensity() <= 0.0 {
                        // no environment and fixed parameters: the state is final
                        break;
                    }
                }
                Ok(counts)
            })
            .collect()
    };

    let results = match config.threads {
        Some(n) => ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| ReactionError::ThreadPool(e.to_string()))?
            .install(simulate)?,
        None => simulate()?,
    };

    debug!(
        replicates = config.replicates,
        steps = config.steps,
        "replicate ensemble finished"
    );
    Ok(results)
}
