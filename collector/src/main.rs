use anyhow::{bail, Context};
use bench_collector::config::CollectorConfig;
use bench_collector::model::TimeRange;
use bench_collector::store::HttpStore;
use bench_results_model::ResultAccumulator;
use clap::Parser;

/// Record benchmark runs completed in a time range into the results file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Address of the search store, `host:port` or a base URL
    store_address: String,

    /// Lower bound on run completion time, in epoch seconds
    lower_bound: i64,

    /// Upper bound on run completion time, in epoch seconds
    upper_bound: Option<i64>,
}

impl Cli {
    fn time_range(&self) -> anyhow::Result<TimeRange> {
        if let Some(upper) = self.upper_bound {
            if upper < self.lower_bound {
                bail!(
                    "Upper bound {upper} is before lower bound {}",
                    self.lower_bound
                );
            }
        }

        Ok(TimeRange {
            lower: self.lower_bound,
            upper: self.upper_bound,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let cli = Cli::parse();
    let range = cli.time_range()?;

    #[cfg(feature = "test_data")]
    log::info!("Test data generation enabled");

    let config = CollectorConfig::from_env();
    log::debug!("Using {config:?}");

    let accumulator = ResultAccumulator::load(&config.results_path)
        .context("Cannot continue without the existing results")?;
    log::debug!(
        "Loaded {} workloads from {}",
        accumulator.len(),
        config.results_path.display()
    );

    let store = HttpStore::new(&cli.store_address)?;

    #[cfg(feature = "test_data")]
    if let Err(e) = bench_collector::test_data::insert_scenario(range, &accumulator) {
        log::error!("Failed to record scenario: {e:?}");
    }

    let accumulator = bench_collector::collect_results(&store, &config, range, accumulator).await;

    #[cfg(feature = "test_data")]
    bench_collector::test_data::insert_expected_results(range, &accumulator, false)?;

    accumulator
        .save(&config.results_path)
        .context("Failed to save results")?;
    log::info!(
        "Saved {} workloads to {}",
        accumulator.len(),
        config.results_path.display()
    );

    Ok(())
}
