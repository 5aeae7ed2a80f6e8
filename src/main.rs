use std::error::Error;
use std::fs;
use std::path::PathBuf;

use bts_locate::{
    read_measurements, select_for_clustering, write_clusters, write_estimates, AggregationMode, CellPipeline,
    ClusterFilter, DensityClusterer, EstimatorConfig, FailureReport, Technology,
};
use clap::Parser;
use tracing::{error, info, warn};

/// Locate cellular transmitters from drive-test timing measurements
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for Estimate_<name>.csv and ALL_clusters.csv
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Record sectors only, or also synthesize towers
    #[arg(long, default_value = "tower")]
    mode: AggregationMode,

    /// Restrict clustering to one channel, mcc or mnc (most common value if none given)
    #[arg(long, value_name = "FIELD[=VALUE]")]
    cluster_filter: Option<ClusterFilter>,

    /// Technology of inputs without a TECH: prefix
    #[arg(short, long, value_name = "TECH")]
    technology: Option<Technology>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Measurement CSV files, optionally prefixed as TECH:PATH
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<String>,
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt().with_target(false).with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}

/// Split an input argument into its technology and path
fn resolve_input(input: &str, default: Option<Technology>) -> Result<(Technology, PathBuf), String> {
    if let Some((prefix, path)) = input.split_once(':') {
        if let Ok(technology) = prefix.parse::<Technology>() {
            return Ok((technology, PathBuf::from(path)));
        }
    }
    match default {
        Some(technology) => Ok((technology, PathBuf::from(input))),
        None => Err(format!("no technology for '{}': use --technology or TECH:PATH", input)),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EstimatorConfig::from_file(path)?
        }
        None => EstimatorConfig::default(),
    };
    for warning in config.validate().warnings {
        warn!("Configuration: {}", warning);
    }

    let pipeline = CellPipeline::new(config, cli.mode);
    fs::create_dir_all(&cli.output_dir)?;

    let mut all_records = Vec::new();
    let mut failures = FailureReport::new();
    for input in &cli.inputs {
        let (technology, path) = resolve_input(input, cli.technology)?;
        let points = match read_measurements(&path) {
            Ok(points) => points,
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                continue;
            }
        };

        let estimate = pipeline.process_file(points, technology);
        let stem = path.file_stem().map_or_else(|| "input".into(), |s| s.to_string_lossy());
        let output = cli.output_dir.join(format!("Estimate_{}.csv", stem));
        write_estimates(&output, &estimate.records)?;
        info!("Wrote {} records to {}", estimate.records.len(), output.display());

        all_records.extend(estimate.records);
        failures.merge(estimate.report);
    }

    let selected = select_for_clustering(all_records, cli.cluster_filter.as_ref());
    let clusters = DensityClusterer::new(&pipeline.config().clustering).cluster(&selected);
    let output = cli.output_dir.join("ALL_clusters.csv");
    write_clusters(&output, &clusters)?;
    info!(
        "Clustered {} estimates into {} clusters, written to {}",
        selected.len(),
        clusters.len(),
        output.display()
    );
    info!("Run complete: {}", failures);

    Ok(())
}
