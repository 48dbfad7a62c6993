use tutorsim_core::{
    config::ScenarioConfig,
    engine::SimEngine,
    error::SimError,
    store::{new_run_id, ResultStore},
};

fn store() -> ResultStore {
    let store = ResultStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn run_ids_are_unique() {
    let a = new_run_id();
    let b = new_run_id();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn archived_run_can_be_read_back() {
    let mut store = store();
    let run_id = new_run_id();
    let config = ScenarioConfig::deficit();

    let mut engine = SimEngine::new(run_id.clone(), config.clone()).unwrap();
    let kpis = engine.run().unwrap();

    store.insert_run(&run_id, &config.name, config.seed, "0.1.0-test").expect("insert run");
    store.save_kpis(&run_id, &kpis).expect("save kpis");
    store.append_trace(&run_id, engine.trace()).expect("append trace");

    let row = store.load_run(&run_id).unwrap();
    assert_eq!(row.scenario, "A - Deficit");
    assert_eq!(row.seed, 42);
    assert!(chrono::DateTime::parse_from_rfc3339(&row.created_at).is_ok());

    let loaded = store.load_kpis(&run_id).unwrap();
    assert_eq!(loaded.arrived, kpis.arrived);
    assert_eq!(loaded.served, kpis.served);
    assert_eq!(loaded.assignments.len(), kpis.assignments.len());
    assert!((loaded.total_wait.mean - kpis.total_wait.mean).abs() < 1e-9);

    assert_eq!(store.trace_count(&run_id).unwrap(), engine.trace().len() as u64);
    let trace = store.load_trace(&run_id).unwrap();
    let names: Vec<&str> = trace.iter().map(|e| e.event.type_name()).collect();
    let expected: Vec<&str> = engine.trace().iter().map(|e| e.event.type_name()).collect();
    assert_eq!(names, expected);
}

#[test]
fn unknown_run_is_reported() {
    let store = store();
    assert!(matches!(store.load_kpis("missing"), Err(SimError::RunNotFound { .. })));
    assert!(matches!(store.load_run("missing"), Err(SimError::RunNotFound { .. })));
    assert_eq!(store.trace_count("missing").unwrap(), 0);
}

#[test]
fn kpis_require_a_registered_run() {
    let store = store();
    let kpis = tutorsim_core::run_scenario(&ScenarioConfig::default_test()).unwrap();
    assert!(matches!(store.save_kpis("orphan", &kpis), Err(SimError::Database(_))));
}

#[test]
fn run_ids_lists_every_archived_run() {
    let store = store();
    store.insert_run("run-a", "Base", 1, "test").unwrap();
    store.insert_run("run-b", "Base", 2, "test").unwrap();
    let mut ids = store.run_ids().unwrap();
    ids.sort();
    assert_eq!(ids, vec!["run-a".to_string(), "run-b".to_string()]);
}
