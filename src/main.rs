//! Packsearch CLI - Run heuristic searches from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use packsearch::sandbox::policy::WORKER_FLAG;
use packsearch::schema::SearchConfig;
use packsearch::search::SearchEngine;
use packsearch::sink::JsonlSink;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Worker mode must dispatch before anything else: the executor spawns
    // this same binary and expects only the JSON response on stdout.
    if args.get(1).map(String::as_str) == Some(WORKER_FLAG) {
        std::process::exit(packsearch::sandbox::worker::run_worker());
    }

    env_logger::init();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Evolve bin-packing scoring heuristics from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!("  generations  Override the configured generation count");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: SearchConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });
    if let Some(generations) = args.get(2).and_then(|s| s.parse().ok()) {
        config.generations = generations;
    }

    println!("Packsearch");
    println!("==========");
    println!(
        "Islands: {} (population {} each)",
        config.num_islands, config.population_size
    );
    println!("Candidates/generation: {}", config.candidates_per_generation);
    println!("Top-K full evaluations: {}", config.top_k);
    println!("Generations: {}", config.generations);
    println!("Seed: {}", config.seed);
    println!();

    let records_path = config_path.with_extension("records.jsonl");
    let candidates_path = config_path.with_extension("candidates.jsonl");
    let mut sink = JsonlSink::create(&records_path, &candidates_path).unwrap_or_else(|e| {
        eprintln!("Error creating record sink: {}", e);
        std::process::exit(1);
    });

    let mut engine = SearchEngine::with_defaults(config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("Running search...");
    let start = Instant::now();
    let generations = engine.config().generations;
    for i in 0..generations {
        if let Err(e) = engine.step(&mut sink) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        if let Some(record) = engine.history().last() {
            println!(
                "  Generation {}/{}: {} generated, {} admitted, best={:?}",
                i + 1,
                generations,
                record.counts.generated,
                record.counts.admitted,
                record.best_score
            );
        }
    }
    let elapsed = start.elapsed();

    println!();
    match engine.best() {
        Some(best) => {
            println!("Best candidate (id {}, score {:?}):", best.id, best.rank_score());
            println!("{}", best.source);
        }
        None => println!("No candidate survived evaluation."),
    }
    println!();
    println!("Records written to {}", records_path.display());
    println!("Admitted candidates written to {}", candidates_path.display());
    println!("Time: {:.2}s", elapsed.as_secs_f32());
}

fn print_example_config() {
    let config = SearchConfig::default();
    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: {}", e),
    }
}
