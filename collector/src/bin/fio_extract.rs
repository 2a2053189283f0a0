use anyhow::Context;
use bench_collector::extract::extract_fio;
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Convert a fio JSON report into the metric record published with each run.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the output of `fio --output-format=json`
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let file = File::open(&cli.path)
        .with_context(|| format!("Failed to open fio output {}", cli.path.display()))?;

    let metrics = extract_fio(BufReader::new(file))
        .with_context(|| format!("Failed to extract metrics from {}", cli.path.display()))?;

    println!("{}", serde_json::to_string(&metrics)?);

    Ok(())
}
