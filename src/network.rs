//! Reaction network model and the builder API used by reaction-language front
//! ends.
//!
//! A network is a molecule name table plus an ordered list of reaction rows.
//! Each row holds one [`StoichiometryEntry`] per known molecule; registering a
//! new molecule widens every existing row so that row width always equals the
//! table size.

use crate::context::Context;
use crate::error::{ReactionError, Result};
use crate::expression::{Condition, Expr};
use crate::propensity::PropensityCache;
use std::collections::HashMap;
use std::sync::Arc;

/// Pseudo-molecule for synthesis from / degradation to nothing.
pub const NULL_MOLECULE: &str = "null";

/// Index of a reaction row in its network.
pub type ReactionId = usize;

/// Stable index into the molecule name table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoleculeId(usize);

impl MoleculeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Append-only molecule name table.
#[derive(Clone, Debug, Default)]
pub struct MoleculeTable {
    names: Vec<String>,
    ids: HashMap<String, MoleculeId>,
}

impl MoleculeTable {
    pub fn id_of(&self, name: &str) -> Option<MoleculeId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: MoleculeId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MoleculeId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (MoleculeId(idx), name.as_str()))
    }

    /// Returns the id of `name`, registering it when unknown. The flag tells
    /// whether a new id was allocated.
    fn insert(&mut self, name: &str) -> (MoleculeId, bool) {
        if let Some(&id) = self.ids.get(name) {
            return (id, false);
        }
        let id = MoleculeId(self.names.len());
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        (id, true)
    }
}

/// Per reaction and molecule: units consumed, units produced, and whether the
/// molecule must be absent for the reaction to fire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoichiometryEntry {
    pub requirement: u32,
    pub product: u32,
    pub must_not_have: bool,
}

impl StoichiometryEntry {
    pub fn net_change(&self) -> i64 {
        i64::from(self.product) - i64::from(self.requirement)
    }

    pub fn is_empty(&self) -> bool {
        self.requirement == 0 && self.product == 0 && !self.must_not_have
    }
}

/// One row of the network.
#[derive(Clone, Debug)]
pub struct Reaction {
    rules: Vec<StoichiometryEntry>,
    /// Sorted indices of the non-empty entries of `rules`.
    active: Vec<usize>,
    rate: Expr,
    condition: Option<Condition>,
    reverse_of: Option<ReactionId>,
    reversed_by: Option<ReactionId>,
}

impl Reaction {
    fn new(rules: Vec<StoichiometryEntry>, rate: Expr) -> Self {
        let active = rules
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_empty())
            .map(|(idx, _)| idx)
            .collect();
        Self {
            rules,
            active,
            rate,
            condition: None,
            reverse_of: None,
            reversed_by: None,
        }
    }

    pub fn rate(&self) -> &Expr {
        &self.rate
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn entry(&self, id: MoleculeId) -> StoichiometryEntry {
        self.rules.get(id.0).copied().unwrap_or_default()
    }

    pub fn requirement(&self, id: MoleculeId) -> u32 {
        self.entry(id).requirement
    }

    pub fn product(&self, id: MoleculeId) -> u32 {
        self.entry(id).product
    }

    /// Row width; equals the molecule count of the owning network.
    pub fn width(&self) -> usize {
        self.rules.len()
    }

    /// Non-empty entries of the row, in molecule order.
    pub fn entries(&self) -> impl Iterator<Item = (MoleculeId, &StoichiometryEntry)> {
        self.active
            .iter()
            .map(|&idx| (MoleculeId(idx), &self.rules[idx]))
            .filter(|(_, entry)| !entry.is_empty())
    }

    /// For a backward row, the forward row it was generated with.
    pub fn reverse_of(&self) -> Option<ReactionId> {
        self.reverse_of
    }

    /// For a forward row, its generated backward row.
    pub fn reversed_by(&self) -> Option<ReactionId> {
        self.reversed_by
    }

    pub fn evaluate_rate(&self, ctx: &Context<'_>) -> f64 {
        self.rate.eval(ctx)
    }

    pub fn evaluate_condition(&self, ctx: &Context<'_>) -> bool {
        self.condition.as_ref().is_none_or(|cond| cond.eval(ctx))
    }

    /// Widening only appends empty entries, so `active` stays valid.
    fn resize(&mut self, width: usize) {
        self.rules.resize(width, StoichiometryEntry::default());
    }

    fn entry_mut(&mut self, id: MoleculeId) -> &mut StoichiometryEntry {
        if let Err(pos) = self.active.binary_search(&id.0) {
            self.active.insert(pos, id.0);
        }
        &mut self.rules[id.0]
    }
}

/// Molecule table, reaction rows and the propensity cache of one agent.
///
/// Built once by a front end and then driven tick by tick through
/// [`execute_step`](Self::execute_step). The cache is instance state, so each
/// agent needs its own network (clone it per agent).
#[derive(Clone, Debug, Default)]
pub struct ReactionNetwork {
    pub(crate) molecules: MoleculeTable,
    pub(crate) reactions: Vec<Reaction>,
    /// Last added row as it was before any condition was attached.
    pristine: Option<Reaction>,
    functions: HashMap<String, Arc<Expr>>,
    condition_functions: HashMap<String, Arc<Condition>>,
    pub(crate) cache: PropensityCache,
}

impl ReactionNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn molecules(&self) -> &MoleculeTable {
        &self.molecules
    }

    pub fn molecule_count(&self) -> usize {
        self.molecules.len()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    pub fn reaction(&self, id: ReactionId) -> Option<&Reaction> {
        self.reactions.get(id)
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Returns the id of `name`, registering it and widening every row by a
    /// zero entry when the name is new.
    pub fn resolve(&mut self, name: &str) -> MoleculeId {
        let (id, created) = self.molecules.insert(name);
        if created {
            let width = self.molecules.len();
            for reaction in &mut self.reactions {
                reaction.resize(width);
            }
            self.cache.clear();
        }
        id
    }

    /// Appends a reaction row. `"null"` entries are ignored and a name listed
    /// `k` times contributes `k` units.
    pub fn add_reaction<S: AsRef<str>>(
        &mut self,
        reactants: &[S],
        products: &[S],
        rate: impl Into<Expr>,
    ) -> ReactionId {
        let rules = self.build_rules(reactants, products);
        self.push_row(Reaction::new(rules, rate.into()))
    }

    /// Adds a forward row and an independent backward row with requirement
    /// and product swapped. Returns `(forward, backward)`.
    pub fn add_reversible<S: AsRef<str>>(
        &mut self,
        reactants: &[S],
        products: &[S],
        rate_forward: impl Into<Expr>,
        rate_backward: impl Into<Expr>,
    ) -> (ReactionId, ReactionId) {
        let rules = self.build_rules(reactants, products);
        let swapped = rules
            .iter()
            .map(|entry| StoichiometryEntry {
                requirement: entry.product,
                product: entry.requirement,
                must_not_have: false,
            })
            .collect();
        let forward = self.push_row(Reaction::new(rules, rate_forward.into()));
        let mut backward_row = Reaction::new(swapped, rate_backward.into());
        backward_row.reverse_of = Some(forward);
        let backward = self.push_row(backward_row);
        self.reactions[forward].reversed_by = Some(backward);
        (forward, backward)
    }

    /// Requires at least `required` units of `name` on the last row without
    /// consuming them. With `clone`, the last row is first duplicated from
    /// its unconditioned form and the requirement goes on the duplicate, so
    /// successive clones express alternatives.
    pub fn add_condition(&mut self, name: &str, required: u32, clone: bool) -> Result<ReactionId> {
        self.ensure_reaction()?;
        let id = self.resolve(name);
        let target = self.gate_target(clone)?;
        let entry = self.reactions[target].entry_mut(id);
        let diff = required.saturating_sub(entry.requirement);
        entry.requirement += diff;
        entry.product = entry.product.saturating_add(diff);
        Ok(target)
    }

    /// Blocks the last (or cloned) row while any `name` is present.
    pub fn add_inhibitor(&mut self, name: &str, clone: bool) -> Result<ReactionId> {
        self.ensure_reaction()?;
        let id = self.resolve(name);
        let target = self.gate_target(clone)?;
        self.reactions[target].entry_mut(id).must_not_have = true;
        Ok(target)
    }

    /// Attaches a boolean guard to the last (or cloned) row; an existing
    /// guard is combined with `and`.
    pub fn add_guard(&mut self, condition: Condition, clone: bool) -> Result<ReactionId> {
        self.ensure_reaction()?;
        let target = self.gate_target(clone)?;
        let reaction = &mut self.reactions[target];
        reaction.condition = Some(match reaction.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        Ok(target)
    }

    /// Registers a named rate function and returns a node referencing it.
    pub fn define_function(&mut self, name: impl Into<String>, body: Expr) -> Expr {
        let name = name.into();
        let body = Arc::new(body);
        self.functions.insert(name.clone(), Arc::clone(&body));
        Expr::Function(name, body)
    }

    pub fn function(&self, name: &str) -> Option<Expr> {
        self.functions
            .get(name)
            .map(|body| Expr::Function(name.to_string(), Arc::clone(body)))
    }

    /// Registers a named boolean function and returns a node referencing it.
    pub fn define_condition(&mut self, name: impl Into<String>, body: Condition) -> Condition {
        let name = name.into();
        let body = Arc::new(body);
        self.condition_functions
            .insert(name.clone(), Arc::clone(&body));
        Condition::Function(name, body)
    }

    pub fn condition_function(&self, name: &str) -> Option<Condition> {
        self.condition_functions
            .get(name)
            .map(|body| Condition::Function(name.to_string(), Arc::clone(body)))
    }

    fn build_rules<S: AsRef<str>>(
        &mut self,
        reactants: &[S],
        products: &[S],
    ) -> Vec<StoichiometryEntry> {
        let consumed: Vec<MoleculeId> = reactants
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| *name != NULL_MOLECULE)
            .map(|name| self.resolve(name))
            .collect();
        let produced: Vec<MoleculeId> = products
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| *name != NULL_MOLECULE)
            .map(|name| self.resolve(name))
            .collect();

        let mut rules = vec![StoichiometryEntry::default(); self.molecules.len()];
        for id in consumed {
            rules[id.0].requirement += 1;
        }
        for id in produced {
            rules[id.0].product += 1;
        }
        rules
    }

    fn push_row(&mut self, reaction: Reaction) -> ReactionId {
        self.pristine = Some(reaction.clone());
        self.reactions.push(reaction);
        self.cache.clear();
        self.reactions.len() - 1
    }

    fn ensure_reaction(&self) -> Result<()> {
        if self.reactions.is_empty() {
            return Err(ReactionError::NoReaction);
        }
        Ok(())
    }

    fn gate_target(&mut self, clone: bool) -> Result<ReactionId> {
        if clone {
            let mut row = self.pristine.clone().ok_or(ReactionError::NoReaction)?;
            // the stored copy may predate molecules registered since
            row.resize(self.molecules.len());
            row.reverse_of = None;
            row.reversed_by = None;
            self.reactions.push(row);
        }
        self.cache.clear();
        Ok(self.reactions.len() - 1)
    }
}
