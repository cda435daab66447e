//! Gillespie stochastic simulation over a [`ReactionNetwork`].
//!
//! Propensities live in a cache parallel to the reaction list. The cache is
//! built lazily on first use; after each fired reaction only the reactions
//! that depend on a changed molecule are recomputed.

use crate::context::{Context, Coordinate, Environment, MoleculeStore, ParameterTable};
use crate::error::{ReactionError, Result};
use crate::network::{MoleculeId, ReactionId, ReactionNetwork};
use crate::propensity::{PropensityCache, PropensityTree, build_dependency_graph, falling_factorial};
use rand::Rng;
use tracing::{debug, trace, warn};

/// Outcome of one [`ReactionNetwork::execute_step`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Number of reactions fired.
    pub events: u64,
    /// Simulated time of the last fired reaction, relative to the call start.
    pub elapsed: f64,
    /// The loop stopped because no reaction could fire.
    pub exhausted: bool,
}

impl ReactionNetwork {
    /// Advances the agent's molecule counts by up to `time_step` of simulated
    /// time.
    ///
    /// Reactions are sampled one at a time: the waiting time is exponential
    /// with the total propensity as rate and the reaction is chosen with
    /// probability proportional to its propensity. A sampled event that would
    /// land past `time_step` is not executed. When every propensity is zero
    /// the cache is fully recomputed once and the call returns.
    pub fn execute_step<R: Rng + ?Sized>(
        &mut self,
        agent: &mut dyn MoleculeStore,
        environment: Option<&dyn Environment>,
        coordinates: &[Coordinate],
        parameters: &dyn ParameterTable,
        time_step: f64,
        rng: &mut R,
    ) -> Result<StepReport> {
        let mut ctx = Context::new(agent, environment, coordinates, parameters);
        self.run_with_context(&mut ctx, time_step, rng)
    }

    /// Same as [`execute_step`](Self::execute_step) with a context built by
    /// the caller.
    pub fn run_with_context<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut Context<'_>,
        time_step: f64,
        rng: &mut R,
    ) -> Result<StepReport> {
        if !time_step.is_finite() || time_step < 0.0 {
            return Err(ReactionError::InvalidArgument(format!(
                "time step must be a finite non-negative number, got {time_step}"
            )));
        }
        if self.cache.is_empty() {
            self.refresh_all(ctx);
        }

        let mut report = StepReport::default();
        let mut elapsed = 0.0;
        while elapsed < time_step {
            let total = self.cache.total();
            if total.is_nan() || total <= 0.0 {
                // counts may have been changed from outside since the cache
                // was last valid
                self.refresh_all(ctx);
                report.exhausted = true;
                break;
            }

            let u1 = 1.0 - rng.r#gen::<f64>();
            elapsed += -u1.ln() / total;
            if elapsed >= time_step {
                break;
            }

            let u2: f64 = rng.r#gen();
            let chosen = self.cache.select(u2 * total);
            self.fire(chosen, ctx);
            report.events += 1;
            report.elapsed = elapsed;
        }

        debug!(
            events = report.events,
            elapsed = report.elapsed,
            exhausted = report.exhausted,
            "reaction step finished"
        );
        Ok(report)
    }

    /// Propensity of reaction `id` against `ctx`, bypassing the cache.
    pub fn compute_propensity(&self, id: ReactionId, ctx: &Context<'_>) -> Result<f64> {
        if id >= self.reactions.len() {
            return Err(ReactionError::UnknownReaction(id));
        }
        Ok(self.propensity_of(id, ctx))
    }

    /// Cached propensity of reaction `id`, if the cache is built.
    pub fn propensity(&self, id: ReactionId) -> Option<f64> {
        self.cache.values.get(id).copied()
    }

    /// Cached propensities; empty until the first step or refresh.
    pub fn propensities(&self) -> &[f64] {
        &self.cache.values
    }

    pub fn total_propensity(&self) -> f64 {
        self.cache.total()
    }

    /// Drops the cache so the next step rebuilds it from scratch.
    pub fn invalidate_propensities(&mut self) {
        self.cache.clear();
    }

    /// Recomputes every propensity, building the dependency graph first when
    /// the cache is empty.
    pub fn refresh_all(&mut self, ctx: &Context<'_>) {
        if self.cache.values.len() != self.reactions.len() || self.cache.is_empty() {
            self.rebuild_cache(ctx);
            return;
        }
        for idx in 0..self.reactions.len() {
            let value = self.propensity_of(idx, ctx);
            self.cache.values[idx] = value;
        }
        self.cache.tree.rebuild(&self.cache.values);
    }

    /// Recomputes the reactions whose rate or guard reads the environment or
    /// parameters. Both may change between ticks without the cache noticing.
    pub fn refresh_external(&mut self, ctx: &Context<'_>) {
        if self.cache.is_empty() {
            self.rebuild_cache(ctx);
            return;
        }
        for k in 0..self.cache.external.len() {
            let idx = self.cache.external[k];
            let value = self.propensity_of(idx, ctx);
            self.cache.set(idx, value);
        }
    }

    fn rebuild_cache(&mut self, ctx: &Context<'_>) {
        let expression_refs: Vec<Vec<MoleculeId>> = self
            .reactions
            .iter()
            .map(|reaction| {
                let mut names = reaction.rate().molecule_refs();
                if let Some(condition) = reaction.condition() {
                    for name in condition.molecule_refs() {
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
                names
                    .into_iter()
                    .filter_map(|name| self.molecules.id_of(name))
                    .collect()
            })
            .collect();
        let dependencies =
            build_dependency_graph(self.molecules.len(), &self.reactions, &expression_refs);
        let external = self
            .reactions
            .iter()
            .enumerate()
            .filter(|(_, reaction)| {
                reaction.rate().reads_external()
                    || reaction.condition().is_some_and(|cond| cond.reads_external())
            })
            .map(|(idx, _)| idx)
            .collect();

        let values: Vec<f64> = (0..self.reactions.len())
            .map(|idx| self.propensity_of(idx, ctx))
            .collect();
        let mut tree = PropensityTree::new(values.len());
        tree.rebuild(&values);

        self.cache = PropensityCache {
            values,
            tree,
            dependencies,
            external,
        };
        debug!(
            reactions = self.reactions.len(),
            molecules = self.molecules.len(),
            total = self.cache.total(),
            "rebuilt propensity cache"
        );
    }

    fn propensity_of(&self, id: ReactionId, ctx: &Context<'_>) -> f64 {
        let reaction = &self.reactions[id];
        if !reaction.evaluate_condition(ctx) {
            return 0.0;
        }

        let mut combinations = 1.0;
        for (molecule, entry) in reaction.entries() {
            if entry.requirement == 0 && !entry.must_not_have {
                continue;
            }
            let Some(name) = self.molecules.name(molecule) else {
                continue;
            };
            let count = ctx.molecule_count(name);
            if entry.must_not_have && count > 0 {
                return 0.0;
            }
            if u64::from(entry.requirement) > count {
                return 0.0;
            }
            combinations *= falling_factorial(count, entry.requirement);
        }

        let rate = reaction.evaluate_rate(ctx);
        if !rate.is_finite() {
            warn!(reaction = id, rate, "rate evaluated to a non-finite value; treating as 0");
            return 0.0;
        }
        if rate <= 0.0 {
            return 0.0;
        }
        let propensity = rate * combinations;
        if propensity.is_finite() { propensity } else { 0.0 }
    }

    fn fire(&mut self, id: ReactionId, ctx: &mut Context<'_>) {
        trace!(reaction = id, "firing reaction");
        for (molecule, entry) in self.reactions[id].entries() {
            let change = entry.net_change();
            if change == 0 {
                continue;
            }
            if let Some(name) = self.molecules.name(molecule) {
                let applied = ctx.change_molecules(name, change);
                if applied != change {
                    trace!(
                        reaction = id,
                        molecule = name,
                        requested = change,
                        applied,
                        "removal clamped at zero"
                    );
                }
            }
        }

        for k in 0..self.cache.dependencies[id].len() {
            let dep = self.cache.dependencies[id][k];
            let value = self.propensity_of(dep, ctx);
            self.cache.set(dep, value);
        }
    }
}

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Base used when no seed is configured, so unseeded ensembles still repeat.
const UNSEEDED_BASE: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Seed of generator stream `stream` (an agent or replicate index) under
/// `seed`. Distinct streams give decorrelated seeds.
pub fn derive_seed(seed: Option<u64>, stream: u64) -> u64 {
    let base = seed.unwrap_or(UNSEEDED_BASE);
    splitmix64((base ^ stream.wrapping_mul(GOLDEN_GAMMA)).wrapping_add(GOLDEN_GAMMA))
}

/// SplitMix64 output function.
fn splitmix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
