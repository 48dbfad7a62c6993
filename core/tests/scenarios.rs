use tutorsim_core::{
    config::{rotating_roster, ScenarioConfig, ScriptedArrival, SearchMode},
    engine::SimEngine,
    event::SimEvent,
    model::{Domain, Level},
    run_scenario,
    stats::KpiRecord,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn presets() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::base(),
        ScenarioConfig::deficit(),
        ScenarioConfig::growth(),
        ScenarioConfig::base_strict(),
    ]
}

fn assert_invariants(kpis: &KpiRecord) {
    let name = &kpis.scenario;
    assert!(
        kpis.is_balanced(),
        "'{name}': served {} + abandoned {} + in flight {} != arrived {}",
        kpis.served, kpis.abandoned, kpis.in_flight, kpis.arrived
    );
    assert!((0.0..=1.0).contains(&kpis.volunteer_utilization), "'{name}' volunteers");
    assert!((0.0..=1.0).contains(&kpis.evaluator_utilization), "'{name}' evaluator");
    for v in &kpis.volunteers {
        assert!((0.0..=1.0).contains(&v.utilization), "'{name}' {}", v.name);
    }
    assert_eq!(kpis.total_wait.count, kpis.served);
    assert_eq!(kpis.matches.total, kpis.assignments.len() as u64);
    let by_severity: u64 = kpis.wait_by_severity.iter().map(|s| s.summary.count).sum();
    assert_eq!(by_severity, kpis.served);
    assert!(kpis.total_wait.max >= kpis.total_wait.mean);
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn presets_hold_invariants_across_seeds() {
    for seed in [1, 42, 777, 2026] {
        for config in presets() {
            assert_invariants(&run_scenario(&config.with_seed(seed)).unwrap());
        }
    }
}

#[test]
fn presets_hold_invariants_with_release_notification() {
    for seed in [1, 42] {
        for config in presets() {
            let config = config.with_seed(seed).with_search(SearchMode::OnRelease);
            assert_invariants(&run_scenario(&config).unwrap());
        }
    }
}

#[test]
fn growth_brings_more_children_than_base() {
    let base = run_scenario(&ScenarioConfig::base()).unwrap();
    let growth = run_scenario(&ScenarioConfig::growth()).unwrap();
    assert!(growth.arrived > base.arrived);
}

#[test]
fn poisson_arrivals_never_start_at_time_zero() {
    let mut engine = SimEngine::new("first-arrival".into(), ScenarioConfig::base()).unwrap();
    engine.run().unwrap();
    let first = engine
        .trace()
        .iter()
        .find(|e| matches!(e.event, SimEvent::ChildArrived { .. }))
        .expect("someone arrived");
    assert!(first.time > 0.0);
}

#[test]
fn trace_opens_and_closes_the_run() {
    let mut engine = SimEngine::new("trace-bounds".into(), ScenarioConfig::base()).unwrap();
    let kpis = engine.run().unwrap();
    let trace = engine.trace();
    assert!(matches!(trace.first().map(|e| &e.event), Some(SimEvent::RunInitialized { .. })));
    match trace.last().map(|e| &e.event) {
        Some(SimEvent::RunCompleted { arrived, in_flight, .. }) => {
            assert_eq!(*arrived, kpis.arrived);
            assert_eq!(*in_flight, kpis.in_flight);
        }
        other => panic!("expected RunCompleted, got {other:?}"),
    }
    assert!(trace.windows(2).all(|w| w[0].time <= w[1].time), "trace out of time order");
}

/// A child still in service at the horizon is in flight, not served,
/// and its volunteer has not been credited yet.
#[test]
fn unfinished_service_counts_in_flight() {
    let config = ScenarioConfig {
        horizon: 3.0,
        scripted_arrivals: Some(vec![ScriptedArrival {
            at:       0.0,
            severity: Level::Low,
            domain:   Domain::Numeracy,
        }]),
        ..ScenarioConfig::default_test()
    };
    let kpis = run_scenario(&config).unwrap();
    assert_eq!(kpis.arrived, 1);
    assert_eq!(kpis.served, 0);
    assert_eq!(kpis.in_flight, 1);
    assert_eq!(kpis.matches.total, 1);
    assert_eq!(kpis.volunteer_utilization, 0.0);
}

/// Arrivals scheduled exactly at the horizon still happen.
#[test]
fn arrival_at_horizon_is_admitted() {
    let config = ScenarioConfig {
        scripted_arrivals: Some(vec![ScriptedArrival {
            at:       20.0,
            severity: Level::High,
            domain:   Domain::Literacy,
        }]),
        ..ScenarioConfig::default_test()
    };
    let kpis = run_scenario(&config).unwrap();
    assert_eq!(kpis.arrived, 1);
    assert_eq!(kpis.in_flight, 1);
}

#[test]
fn empty_script_yields_an_empty_run() {
    let kpis = run_scenario(&ScenarioConfig::default_test()).unwrap();
    assert_eq!(kpis.arrived, 0);
    assert_eq!(kpis.total_wait.mean, 0.0);
    assert_eq!(kpis.matches.mismatch_pct, 0.0);
    assert_invariants(&kpis);
}

#[test]
fn rotating_roster_cycles_skill_and_domain() {
    let roster = rotating_roster(6);
    let skills: Vec<u8> = roster.iter().map(|r| r.skill).collect();
    let domains: Vec<Domain> = roster.iter().map(|r| r.domain).collect();
    assert_eq!(skills, vec![1, 2, 3, 1, 2, 3]);
    assert_eq!(domains[..3], Domain::ALL);
    assert_eq!(domains[3..], Domain::ALL);
    assert_eq!(roster[5].name, "Vol-06");

    let config = ScenarioConfig { roster, ..ScenarioConfig::growth() };
    assert_invariants(&run_scenario(&config).unwrap());
}

#[test]
fn scenario_loads_from_json_file() {
    let path = std::env::temp_dir().join(format!("tutorsim-scenario-{}.json", std::process::id()));
    let json = serde_json::json!({
        "name": "From file",
        "horizon": 10.0,
        "arrival_rate": 2.0,
        "roster": [
            { "name": "Vol-A", "skill": 2, "domain": "numeracy" },
            { "name": "Vol-B", "skill": 3, "domain": "literacy" }
        ],
        "policy": "strict",
        "search": { "mode": "on_release" }
    });
    std::fs::write(&path, json.to_string()).unwrap();

    let config = ScenarioConfig::load(path.to_str().unwrap()).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.seed, 42);
    assert_eq!(config.evaluator_capacity, 2);
    assert_eq!(config.search, SearchMode::OnRelease);
    assert_eq!(config.severity_weights, vec![0.50, 0.35, 0.15]);
    assert_invariants(&run_scenario(&config).unwrap());
}
