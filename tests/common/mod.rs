use cell_reactions::{
    Context, Coordinate, Environment, MoleculeCounts, ReactionNetwork, SignalId, StepReport,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Uniform environment field with a fixed set of signals.
#[allow(dead_code)]
pub struct UniformField {
    signals: Vec<(&'static str, f64)>,
}

#[allow(dead_code)]
impl UniformField {
    pub fn new() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    pub fn with_signal(mut self, name: &'static str, concentration: f64) -> Self {
        self.signals.push((name, concentration));
        self
    }
}

impl Environment for UniformField {
    fn signal_id(&self, name: &str) -> Option<SignalId> {
        self.signals.iter().position(|(signal, _)| *signal == name)
    }

    fn concentration(&self, signal: SignalId, _coordinates: &[Coordinate]) -> f64 {
        self.signals[signal].1
    }
}

#[allow(dead_code)]
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// One tick without environment or parameters.
#[allow(dead_code)]
pub fn step(
    network: &mut ReactionNetwork,
    counts: &mut MoleculeCounts,
    time_step: f64,
    rng: &mut ChaCha8Rng,
) -> StepReport {
    network
        .execute_step(counts, None, &[], &(), time_step, rng)
        .unwrap()
}

/// Propensities evaluated from scratch, bypassing the cache.
#[allow(dead_code)]
pub fn fresh_propensities(network: &ReactionNetwork, counts: &mut MoleculeCounts) -> Vec<f64> {
    let ctx = Context::new(counts, None, &[], &());
    (0..network.reaction_count())
        .map(|id| network.compute_propensity(id, &ctx).unwrap())
        .collect()
}
