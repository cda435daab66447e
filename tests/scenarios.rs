mod common;

use cell_reactions::{
    Context, EnsembleConfig, Expr, MoleculeCounts, Parameters, ReactionError, ReactionNetwork,
    run_replicates,
};
use common::{UniformField, fresh_propensities, seeded, step};

const NONE: &[&str] = &[];

#[test]
fn pure_synthesis_grows_monotonically() {
    let mut network = ReactionNetwork::new();
    network.add_reaction(&["null"], &["A"], 0.3);
    assert_eq!(network.molecule_count(), 1);
    assert_eq!(network.reaction_count(), 1);

    let mut counts = MoleculeCounts::new();
    let mut rng = seeded(2024);
    let mut previous = 0;
    for _ in 0..200 {
        step(&mut network, &mut counts, 1.0, &mut rng);
        let current = counts.get("A");
        assert!(current >= previous);
        previous = current;
    }
    // expected 60 after 200 time units
    assert!(previous > 20, "only {previous} molecules synthesized");
}

#[test]
fn conversion_conserves_mass() {
    let mut network = ReactionNetwork::new();
    network.add_reaction(&["A"], &["B"], 0.5);

    for seed in 0..20 {
        let mut network = network.clone();
        let mut counts = MoleculeCounts::new().with("A", 10);
        let mut rng = seeded(seed);
        let report = step(&mut network, &mut counts, 1_000.0, &mut rng);
        assert_eq!(counts.get("A") + counts.get("B"), 10);
        assert!(counts.get("B") > 0);
        assert_eq!(report.events, counts.get("B"));
    }
}

#[test]
fn gated_reaction_waits_for_its_condition() {
    let mut network = ReactionNetwork::new();
    let gated = network.add_reaction(&["A"], &["B"], 2.0);
    network
        .add_guard(Expr::molecule("C").ge(1.0), false)
        .unwrap();
    network.add_reaction(NONE, &["C"], 0.2);

    let mut counts = MoleculeCounts::new().with("A", 50);
    {
        let ctx = Context::new(&mut counts, None, &[], &());
        assert_eq!(network.compute_propensity(gated, &ctx).unwrap(), 0.0);
    }

    let mut rng = seeded(77);
    let mut fired = false;
    for _ in 0..500 {
        step(&mut network, &mut counts, 0.1, &mut rng);
        if counts.get("C") == 0 {
            assert_eq!(counts.get("B"), 0);
            assert_eq!(network.propensity(gated), Some(0.0));
        }
        fired |= counts.get("B") > 0;
    }
    assert!(counts.get("C") >= 1);
    assert!(fired);
}

#[test]
fn reversible_pair_keeps_declared_rates() {
    // A <-(10,20)-> B: forward rate 20, backward rate 10
    let mut network = ReactionNetwork::new();
    let (forward, backward) = network.add_reversible(&["A"], &["B"], 20.0, 10.0);

    let mut counts = MoleculeCounts::new().with("A", 1).with("B", 1);
    let ctx = Context::new(&mut counts, None, &[], &());
    let fwd = network.reaction(forward).unwrap();
    let bwd = network.reaction(backward).unwrap();
    assert_eq!(fwd.evaluate_rate(&ctx), 20.0);
    assert_eq!(bwd.evaluate_rate(&ctx), 10.0);
    assert_eq!(network.compute_propensity(forward, &ctx).unwrap(), 20.0);
    assert_eq!(network.compute_propensity(backward, &ctx).unwrap(), 10.0);
}

#[test]
fn unregistered_signal_evaluates_to_zero() {
    let field = UniformField::new().with_signal("oxygen", 3.0);
    let mut counts = MoleculeCounts::new();
    let ctx = Context::new(&mut counts, Some(&field), &[], &());
    assert_eq!(Expr::environment("glucose").eval(&ctx), 0.0);
    assert_eq!(Expr::environment("oxygen").eval(&ctx), 3.0);

    let mut network = ReactionNetwork::new();
    network.add_reaction(NONE, &["A"], Expr::environment("glucose"));
    let mut rng = seeded(5);
    let report = network
        .execute_step(&mut counts, Some(&field), &[], &(), 10.0, &mut rng)
        .unwrap();
    assert_eq!(report.events, 0);
    assert!(report.exhausted);
}

#[test]
fn environment_drives_rates() {
    let field = UniformField::new().with_signal("ligand", 4.0);
    let mut network = ReactionNetwork::new();
    network.add_reaction(NONE, &["R"], Expr::environment("ligand") * 0.5);

    let mut counts = MoleculeCounts::new();
    let mut rng = seeded(8);
    let report = network
        .execute_step(&mut counts, Some(&field), &[], &(), 5.0, &mut rng)
        .unwrap();
    assert_eq!(network.propensities(), &[2.0]);
    assert_eq!(counts.get("R"), report.events);
    assert!(report.events > 0);
    assert!(report.elapsed < 5.0);
}

#[test]
fn rate_tracks_molecules_changed_during_the_step() {
    // autocatalysis: every new A raises the synthesis rate
    let mut network = ReactionNetwork::new();
    network.add_reaction(NONE, &["A"], Expr::molecule("A") + 1.0);
    let mut counts = MoleculeCounts::new();
    let mut rng = seeded(13);
    step(&mut network, &mut counts, 1.0, &mut rng);

    let cached = network.propensities().to_vec();
    assert_eq!(cached, fresh_propensities(&network, &mut counts));
    assert_eq!(cached[0], counts.get("A") as f64 + 1.0);
}

#[test]
fn same_seed_same_trajectory() {
    let mut network = ReactionNetwork::new();
    network.add_reaction(NONE, &["A"], 5.0);
    network.add_reaction(&["A"], NONE, 1.0);
    network.add_reaction(&["A", "A"], &["D"], 0.01);

    let trajectory = |seed| {
        let mut network = network.clone();
        let mut counts = MoleculeCounts::new();
        let mut rng = seeded(seed);
        (0..50)
            .map(|_| {
                step(&mut network, &mut counts, 0.2, &mut rng);
                counts.clone()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(trajectory(99), trajectory(99));
    assert_ne!(trajectory(99), trajectory(100));
}

#[test]
fn replicates_do_not_depend_on_thread_count() {
    let mut network = ReactionNetwork::new();
    network.add_reaction(NONE, &["A"], Expr::parameter_or("k", 1.0));
    network.add_reaction(&["A"], &["B"], 0.3);
    let initial = MoleculeCounts::new().with("A", 5);
    let parameters = Parameters::new().with("k", 4.0);

    let config = |threads| EnsembleConfig {
        replicates: 12,
        threads,
        seed: Some(31),
        time_step: 0.5,
        steps: 10,
    };
    let single = run_replicates(&network, &initial, &parameters, &config(Some(1))).unwrap();
    let pooled = run_replicates(&network, &initial, &parameters, &config(Some(4))).unwrap();
    let global = run_replicates(&network, &initial, &parameters, &config(None)).unwrap();
    assert_eq!(single.len(), 12);
    assert_eq!(single, pooled);
    assert_eq!(single, global);
    assert!(single.windows(2).any(|pair| pair[0] != pair[1]));
}

#[test]
fn replicates_conserve_mass() {
    let mut network = ReactionNetwork::new();
    network.add_reversible(&["A"], &["B"], 1.0, 2.0);
    let initial = MoleculeCounts::new().with("A", 30);
    let config = EnsembleConfig {
        replicates: 8,
        threads: Some(2),
        seed: Some(3),
        time_step: 1.0,
        steps: 5,
    };
    for counts in run_replicates(&network, &initial, &(), &config).unwrap() {
        assert_eq!(counts.get("A") + counts.get("B"), 30);
    }
}

#[test]
fn replicates_validate_config() {
    let network = ReactionNetwork::new();
    let config = EnsembleConfig {
        replicates: 0,
        ..EnsembleConfig::default()
    };
    let result = run_replicates(&network, &MoleculeCounts::new(), &(), &config);
    assert!(matches!(result, Err(ReactionError::Config(_))));
}
