//! Fixture generator — writes a JSON file of synthetic recipe records for
//! exercising the audit pipeline and sizing run costs before pointing it
//! at production exports.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::path::PathBuf;

/// Generate synthetic recipe batch records
#[derive(Parser, Debug)]
#[command(name = "recipeaudit-gen", version, about, long_about = None)]
struct Cli {
    /// Number of records to generate
    #[arg(short, long, default_value_t = 1000)]
    count: usize,

    /// Output path for the JSON file
    #[arg(short, long, default_value = "test_recipes.json")]
    output: PathBuf,

    /// RNG seed, for reproducible fixtures
    #[arg(short, long)]
    seed: Option<u64>,
}

const OPERATORS: [&str; 4] = ["John Doe", "Jane Smith", "Alice Brown", "Bob Johnson"];

fn generate_record(i: usize, rng: &mut StdRng) -> serde_json::Value {
    let steps: Vec<serde_json::Value> = (1..rng.gen_range(3..=6))
        .map(|s| {
            json!({
                "step_number": s,
                "description": format!(
                    "Step {} description with details about operation {}.",
                    s,
                    rng.gen_range(1..=10)
                ),
                "duration_minutes": rng.gen_range(5..=120),
            })
        })
        .collect();

    json!({
        "recipe_id": format!("RCP-{i:06}"),
        "product_name": format!("Product {}", rng.gen_range(1..=500)),
        "batch_size": format!("{} L", rng.gen_range(50..=1000)),
        "steps": steps,
        "parameters": {
            "target_temperature_celsius": rng.gen_range(20..=100),
            "ph_range": format!(
                "{:.1} - {:.1}",
                rng.gen_range(6.0..7.5),
                rng.gen_range(7.6..8.5)
            ),
            "operator": OPERATORS[rng.gen_range(0..OPERATORS.len())],
        },
        "notes": format!("Synthetic recipe record #{i} for pipeline and cost checks."),
    })
}

fn generate_records(count: usize, rng: &mut StdRng) -> Vec<serde_json::Value> {
    (1..=count).map(|i| generate_record(i, rng)).collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let records = generate_records(cli.count, &mut rng);
    std::fs::write(&cli.output, serde_json::to_string_pretty(&records)?)?;
    println!("Wrote {} records to {}", cli.count, cli.output.display());

    Ok(())
}
