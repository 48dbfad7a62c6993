//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Two engines, same config, same seed.
//! They must produce identical KPI records and identical traces.
//! Any divergence is a blocker — do not merge until fixed.

use tutorsim_core::{
    config::{ScenarioConfig, SearchMode},
    engine::SimEngine,
    event::TraceEntry,
    run_scenario,
    stats::KpiRecord,
};

fn run_with_trace(config: &ScenarioConfig) -> (KpiRecord, Vec<TraceEntry>) {
    // RUST_LOG=debug prints every transition when a divergence needs chasing.
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = SimEngine::new(format!("det-test-{}", config.seed), config.clone())
        .expect("valid config");
    let kpis = engine.run().expect("run");
    (kpis, engine.trace().to_vec())
}

#[test]
fn same_seed_produces_identical_kpis_and_traces() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

    for config in [ScenarioConfig::base(), ScenarioConfig::deficit(), ScenarioConfig::growth()] {
        let config = config.with_seed(SEED);
        let (kpis_a, trace_a) = run_with_trace(&config);
        let (kpis_b, trace_b) = run_with_trace(&config);

        assert_eq!(kpis_a, kpis_b, "KPI records diverged for '{}'", config.name);
        assert_eq!(
            serde_json::to_string(&kpis_a).unwrap(),
            serde_json::to_string(&kpis_b).unwrap(),
            "KPI JSON diverged for '{}'",
            config.name
        );

        assert_eq!(
            trace_a.len(), trace_b.len(),
            "Trace lengths differ: {} vs {}",
            trace_a.len(), trace_b.len()
        );
        for (i, (a, b)) in trace_a.iter().zip(trace_b.iter()).enumerate() {
            assert_eq!(a, b, "Trace diverged at entry {i}:\n  A: {a}\n  B: {b}");
        }
    }
}

#[test]
fn release_notification_mode_is_deterministic_too() {
    let config = ScenarioConfig::base_strict()
        .with_seed(7)
        .with_search(SearchMode::OnRelease);
    let (kpis_a, trace_a) = run_with_trace(&config);
    let (kpis_b, trace_b) = run_with_trace(&config);
    assert_eq!(kpis_a, kpis_b);
    assert_eq!(trace_a, trace_b);
}

#[test]
fn run_scenario_matches_engine_run() {
    let config = ScenarioConfig::base().with_seed(11);
    let (kpis, _) = run_with_trace(&config);
    assert_eq!(run_scenario(&config).unwrap(), kpis, "disabling the trace changed the outcome");
}

#[test]
fn different_seeds_produce_different_runs() {
    let a = run_scenario(&ScenarioConfig::base().with_seed(42)).unwrap();
    let b = run_scenario(&ScenarioConfig::base().with_seed(99)).unwrap();

    // With different seeds arrival counts or waits should diverge.
    // This test verifies that seed differences are actually observable.
    assert_ne!(a, b, "Different seeds produced identical records — seed is not being used");
}

#[test]
fn engine_refuses_a_second_run() {
    let mut engine = SimEngine::new("det-twice".into(), ScenarioConfig::default_test()).unwrap();
    engine.run().unwrap();
    assert!(engine.run().is_err());
}
