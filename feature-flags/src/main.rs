use anyhow::{bail, Context, Result};
use envconfig::Envconfig;

use common_logging::{init_tracing, FlexBool, LogConfig};
use common_metrics::setup_metrics_recorder;
use feature_flags::config::Config;
use feature_flags::{EvaluationContext, FlagService, StaticFlagSource};

#[derive(Envconfig, Debug)]
struct SnapshotConfig {
    #[envconfig(from = "FLAGS_SNAPSHOT_PATH")]
    definitions_path: String,

    #[envconfig(from = "FLAGS_OVERRIDES_PATH")]
    overrides_path: Option<String>,

    // Dumps the Prometheus exposition of this run to stderr
    #[envconfig(from = "FLAGS_PRINT_METRICS", default = "false")]
    print_metrics: FlexBool,
}

// Usage: feature-flags <user_id> <flag_key>...
// Prints the evaluation as the flags endpoint JSON. Pass "" as user_id for an anonymous request.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(&LogConfig::init_from_env()?)?;
    let metrics = setup_metrics_recorder().context("Failed to install metrics recorder")?;

    let config = Config::init_from_env().context("Invalid configuration")?;
    let snapshot = SnapshotConfig::init_from_env().context("Invalid snapshot configuration")?;

    let mut args = std::env::args().skip(1);
    let Some(user_id) = args.next() else {
        bail!("usage: feature-flags <user_id> <flag_key>...");
    };
    let flag_keys: Vec<String> = args.collect();

    let definitions = std::fs::read_to_string(&snapshot.definitions_path)
        .with_context(|| format!("reading {}", snapshot.definitions_path))?;
    let overrides = match &snapshot.overrides_path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
        None => "[]".to_string(),
    };
    let source = StaticFlagSource::from_json(&definitions, &overrides)?;

    tracing::info!(
        bucketing_hash = %config.bucketing_hash,
        flags = flag_keys.len(),
        "evaluating flags from snapshot"
    );

    let service = FlagService::new(source, &config);
    let response = service
        .evaluate(&EvaluationContext::new(Some(user_id), flag_keys))
        .await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    if *snapshot.print_metrics {
        eprintln!("{}", metrics.render());
    }
    Ok(())
}
