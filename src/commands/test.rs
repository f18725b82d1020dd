//! Test command implementation.
//!
//! Runs collections against the configured stats source and prints a
//! per-source breakdown.

use std::time::Instant;

use uwsgi_stats_exporter::projector::project_all;
use uwsgi_stats_exporter::{MetricCatalog, StatsCollector};

use crate::config::Config;

/// Tests metrics collection.
pub async fn command_test(
    iterations: usize,
    verbose: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🧪 uWSGI Stats Exporter - Test Mode");
    println!("===================================");

    let catalog = MetricCatalog::new()?;
    println!("📚 Catalog: {} stats validated", catalog.len());

    let collector = StatsCollector::new(
        config.stats_address(),
        catalog,
        config.collector_options(),
    )?;
    println!("🔌 Stats source: {}", collector.descriptor());

    let mut failed_runs = 0;

    for iteration in 1..=iterations {
        println!("\n🔄 Iteration {}/{}:", iteration, iterations);

        let start = Instant::now();
        let results = match collector.read_all().await {
            Ok(results) => results,
            Err(e) => {
                println!("   ❌ Collection failed: {}", e);
                failed_runs += 1;
                continue;
            }
        };
        println!("   📁 Found {} source(s)", results.len());

        for result in &results {
            match &result.outcome {
                Ok(snapshot) => println!(
                    "   ├─ ✅ {} (uWSGI {}, {} worker(s), {} socket(s))",
                    result.source.address,
                    snapshot.version,
                    snapshot.workers.len(),
                    snapshot.sockets.len()
                ),
                Err(e) => println!(
                    "   ├─ ❌ {} [{}]: {}",
                    result.source.address,
                    e.kind(),
                    e
                ),
            }
        }

        let samples = project_all(collector.catalog(), &results);
        println!(
            "   └─ 📊 {} samples in {:.2}ms",
            samples.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        if verbose {
            for sample in &samples {
                println!(
                    "      {} {:?} {}",
                    sample.name(),
                    sample.label_values,
                    sample.value
                );
            }
        }
    }

    if failed_runs > 0 {
        return Err(format!("{} of {} collection run(s) failed", failed_runs, iterations).into());
    }

    println!("\n✅ Test completed successfully");
    Ok(())
}
