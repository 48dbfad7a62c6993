use tutorsim_core::{
    config::{MatchPolicy, RosterEntry, ScenarioConfig, ScriptedArrival},
    engine::SimEngine,
    event::SimEvent,
    matching::MatchQuality,
    model::{Domain, Level},
    run_scenario,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn one_child(severity: Level, domain: Domain, roster: Vec<RosterEntry>) -> ScenarioConfig {
    ScenarioConfig {
        scripted_arrivals: Some(vec![ScriptedArrival { at: 0.0, severity, domain }]),
        roster,
        ..ScenarioConfig::default_test()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Single child, single fully-skilled volunteer, fixed durations:
/// optimal match right after evaluation and utilization = service / horizon.
#[test]
fn single_child_is_matched_optimally_after_evaluation() {
    let config = one_child(
        Level::Low,
        Domain::Numeracy,
        vec![RosterEntry::new("Vol-01", 3, Domain::Numeracy)],
    );
    let mut engine = SimEngine::new("single-child".into(), config).unwrap();
    let kpis = engine.run().unwrap();

    assert_eq!(kpis.arrived, 1);
    assert_eq!(kpis.served, 1);
    assert_eq!(kpis.matches.optimal, 1);
    assert_eq!(kpis.volunteer_wait.max, 0.0);
    assert_eq!(kpis.volunteers[0].utilization, 4.0 / 20.0);
    assert_eq!(kpis.volunteer_utilization, 4.0 / 20.0);
    assert_eq!(kpis.evaluator_utilization, 1.0 / 20.0);
    // Time in system (5.0) minus service (4.0).
    assert_eq!(kpis.total_wait.mean, 1.0);

    let assigned = engine
        .trace()
        .iter()
        .find(|e| matches!(e.event, SimEvent::VolunteerAssigned { .. }))
        .expect("assignment traced");
    assert_eq!(assigned.time, 1.0);
}

#[test]
fn fallback_assigns_underskilled_same_domain_volunteer() {
    let config = one_child(
        Level::High,
        Domain::Literacy,
        vec![
            RosterEntry::new("Vol-01", 3, Domain::Numeracy),
            RosterEntry::new("Vol-02", 2, Domain::Literacy),
        ],
    );
    let kpis = run_scenario(&config).unwrap();
    assert_eq!(kpis.matches.suboptimal, 1);
    assert_eq!(kpis.assignments[0].volunteer, "Vol-02");
    assert_eq!(kpis.matches.mismatch_pct, 100.0);
}

#[test]
fn fallback_crosses_domains_when_no_same_domain_volunteer() {
    let config = one_child(
        Level::Moderate,
        Domain::GraphicSkills,
        vec![
            RosterEntry::new("Vol-01", 1, Domain::Numeracy),
            RosterEntry::new("Vol-02", 3, Domain::Literacy),
            RosterEntry::new("Vol-03", 2, Domain::Literacy),
        ],
    );
    let kpis = run_scenario(&config).unwrap();
    let a = &kpis.assignments[0];
    assert_eq!(a.quality, MatchQuality::Generalist);
    // Lowest sufficient skill across domains.
    assert_eq!(a.volunteer, "Vol-03");
}

/// Every recorded assignment agrees with the classification rules.
#[test]
fn recorded_quality_matches_classification() {
    for seed in [1, 2, 3, 4, 5] {
        for config in [ScenarioConfig::base(), ScenarioConfig::deficit(), ScenarioConfig::growth()] {
            let kpis = run_scenario(&config.with_seed(seed)).unwrap();
            for a in &kpis.assignments {
                match a.quality {
                    MatchQuality::Optimal => {
                        assert_eq!(a.volunteer_domain, a.child_domain);
                        assert!(a.skill >= a.severity);
                    }
                    MatchQuality::Suboptimal => {
                        assert_eq!(a.volunteer_domain, a.child_domain);
                        assert!(a.skill < a.severity);
                    }
                    MatchQuality::Generalist => {
                        assert_ne!(a.volunteer_domain, a.child_domain);
                    }
                }
            }
        }
    }
}

#[test]
fn strict_runs_only_ever_match_optimally() {
    for seed in [3, 17, 42, 1234] {
        let config = ScenarioConfig { policy: MatchPolicy::Strict, ..ScenarioConfig::deficit() };
        let kpis = run_scenario(&config.with_seed(seed)).unwrap();
        assert_eq!(kpis.matches.suboptimal, 0, "seed {seed}");
        assert_eq!(kpis.matches.generalist, 0, "seed {seed}");
        assert_eq!(kpis.matches.optimal, kpis.matches.total);
    }
}

#[test]
fn percentages_cover_all_assignments() {
    let kpis = run_scenario(&ScenarioConfig::growth()).unwrap();
    let m = kpis.matches;
    assert!(m.total > 0);
    assert_eq!(m.optimal + m.suboptimal + m.generalist, m.total);
    assert!((m.optimal_pct + m.suboptimal_pct + m.generalist_pct - 100.0).abs() < 1e-9);
    assert!((m.mismatch_pct - (m.suboptimal_pct + m.generalist_pct)).abs() < 1e-9);
}
