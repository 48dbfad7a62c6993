//! sim-runner: headless scenario runner for the tutoring-centre model.
//!
//! Usage:
//!   sim-runner --scenario all
//!   sim-runner --scenario deficit --seed 7 --trace
//!   sim-runner --config my_centre.json --search release --db runs.db
//!   sim-runner --scenario growth --horizon 26 --json

use anyhow::{bail, Result};
use std::env;
use tutorsim_core::{
    config::{ScenarioConfig, SearchMode},
    diagnosis::{self, AlertLevel},
    engine::SimEngine,
    stats::KpiRecord,
    store::{self, ResultStore},
};

const PRESETS: [&str; 4] = ["base", "deficit", "growth", "strict"];

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let scenario = parse_str(&args, "--scenario").unwrap_or("base");
    let config_path = parse_str(&args, "--config");
    let seed: Option<u64> = parse_opt(&args, "--seed");
    let horizon: Option<f64> = parse_opt(&args, "--horizon");
    let search = parse_str(&args, "--search").unwrap_or("poll");
    let trace = args.iter().any(|a| a == "--trace");
    let json = args.iter().any(|a| a == "--json");
    let db = parse_str(&args, "--db");

    let search = match search {
        "poll" => SearchMode::default(),
        "release" => SearchMode::OnRelease,
        other => bail!("unknown --search mode '{other}' (expected poll or release)"),
    };

    let mut configs = match config_path {
        Some(path) => vec![ScenarioConfig::load(path)?],
        None if scenario == "all" => PRESETS
            .iter()
            .filter_map(|name| ScenarioConfig::preset(name))
            .collect(),
        None => match ScenarioConfig::preset(scenario) {
            Some(config) => vec![config],
            None => bail!("unknown --scenario '{scenario}' (expected base, deficit, growth, strict or all)"),
        },
    };
    for config in &mut configs {
        if let Some(seed) = seed {
            config.seed = seed;
        }
        if let Some(horizon) = horizon {
            config.horizon = horizon;
        }
        // A config file chooses its own search mode unless overridden.
        if config_path.is_none() || parse_str(&args, "--search").is_some() {
            config.search = search;
        }
    }

    let mut results_db = match db {
        Some(path) => {
            let store = ResultStore::open(path)?;
            store.migrate()?;
            Some(store)
        }
        None => None,
    };

    let mut records = Vec::with_capacity(configs.len());
    for config in configs {
        let run_id = store::new_run_id();
        if !json {
            print_header(&run_id, &config);
        }

        let mut engine = SimEngine::new(run_id.clone(), config.clone())?.with_trace(trace || db.is_some());
        let kpis = engine.run()?;

        if trace && !json {
            println!("=== EVENT LOG ===");
            for entry in engine.trace() {
                println!("  {entry}");
            }
            println!();
        }
        if let Some(results) = results_db.as_mut() {
            results.insert_run(&run_id, &config.name, config.seed, env!("CARGO_PKG_VERSION"))?;
            results.save_kpis(&run_id, &kpis)?;
            results.append_trace(&run_id, engine.trace())?;
            log::info!("Archived run {run_id} ({} trace entries)", results.trace_count(&run_id)?);
        }
        if !json {
            print_summary(&kpis);
            print_diagnosis(&kpis);
        }
        records.push(kpis);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.len() > 1 {
        print_comparison(&records);
    }
    Ok(())
}

fn print_header(run_id: &str, config: &ScenarioConfig) {
    println!("=== SCENARIO: {} ===", config.name);
    println!("  run_id:       {run_id}");
    println!("  seed:         {}", config.seed);
    println!("  horizon:      {}", config.horizon);
    println!("  arrival rate: {}", config.arrival_rate);
    println!("  volunteers:   {}", config.roster.len());
    println!("  evaluators:   {}", config.evaluator_capacity);
    println!("  policy:       {:?}", config.policy);
    println!("  search:       {:?}", config.search);
    println!();
}

fn print_summary(kpis: &KpiRecord) {
    println!("=== RUN SUMMARY ===");
    println!("  arrived:      {}", kpis.arrived);
    println!("  served:       {}", kpis.served);
    println!("  abandoned:    {}", kpis.abandoned);
    println!("  in flight:    {}", kpis.in_flight);
    println!();
    println!("  wait (mean / median / max): {:.2} / {:.2} / {:.2}",
        kpis.total_wait.mean, kpis.total_wait.median, kpis.total_wait.max);
    println!("  evaluator wait (mean):      {:.2}", kpis.evaluator_wait.mean);
    println!("  volunteer wait (mean):      {:.2}", kpis.volunteer_wait.mean);
    for row in &kpis.wait_by_severity {
        println!("    severity {:<9} n={:<4} mean {:.2}",
            row.severity.label(), row.summary.count, row.summary.mean);
    }
    println!();

    let m = &kpis.matches;
    println!("  matches: {} total", m.total);
    println!("    [OK] optimal     {:>4} ({:.1}%)", m.optimal, m.optimal_pct);
    println!("    [!!] suboptimal  {:>4} ({:.1}%)", m.suboptimal, m.suboptimal_pct);
    println!("    [XX] generalist  {:>4} ({:.1}%)", m.generalist, m.generalist_pct);
    println!("    mismatch rate:   {:.1}%", m.mismatch_pct);
    println!();

    println!("  volunteer utilization:");
    for v in &kpis.volunteers {
        let filled = (v.utilization * 20.0).round() as usize;
        println!("    {:<8} skill {} {:<14} {:>5.1}% {}{}",
            v.name, v.skill.rank(), v.domain.label(), v.utilization * 100.0,
            "#".repeat(filled), ".".repeat(20 - filled.min(20)));
    }
    println!("    global: {:.1}%", kpis.volunteer_utilization * 100.0);
    println!("  evaluator utilization: {:.1}% ({:.1} busy, max queue {})",
        kpis.evaluator_utilization * 100.0, kpis.evaluator_busy_time, kpis.evaluator_max_queue);
    println!();
}

fn print_diagnosis(kpis: &KpiRecord) {
    println!("=== DIAGNOSIS ===");
    let alerts = diagnosis::diagnose(kpis);
    for alert in &alerts {
        println!("  {alert}");
    }
    if diagnosis::worst(&alerts) == AlertLevel::Red {
        log::warn!("Scenario '{}' has at least one red indicator", kpis.scenario);
    }
    println!();
}

fn print_comparison(records: &[KpiRecord]) {
    println!("=== SCENARIO COMPARISON ===");
    print!("{}", diagnosis::comparison_table(records));
    println!();

    let Some(base) = records.first() else { return };
    if diagnosis::baseline_acceptable(base) {
        println!("  [OK] '{}' keeps waits and mismatches acceptable.", base.scenario);
    } else {
        println!("  [!!] '{}' shows weaknesses; adjust resources first.", base.scenario);
    }
    if let Some(grown) = records.iter().find(|r| r.scenario.contains("Growth")) {
        if diagnosis::scales_with_demand(base, grown) {
            println!("  [OK] Waits stay within twice the baseline under growth.");
        } else {
            println!(
                "  [RED] Under growth the mean wait climbs to {:.1}; more volunteers are needed.",
                grown.total_wait.mean
            );
        }
    }
}

fn parse_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_opt<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
}
