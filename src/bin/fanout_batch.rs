//! fanout-batch: run one batch through the in-process substrate
//!
//! Dispatches one unit per order ref on the command line (or a built-in demo
//! list when none are given) and prints the aggregated `BatchResult` as JSON.
//!
//! ## Configuration
//! - FANOUT_CONFIG: Path to a YAML config file (optional)
//! - FANOUT__BATCH__MAX_CONCURRENT: Outstanding dispatch limit (default: 3)
//! - FANOUT__EXECUTOR__KIND: `script` or `http`
//! - FANOUT_LOG: Log filter (default: info)

use std::sync::Arc;

use tracing::info;

use fanout::config::Config;
use fanout::orchestration::{BatchOptions, BatchOrchestrator};
use fanout::substrate::{LocalSubstrate, Substrate};
use fanout::unit::{build_executor, UnitInput};
use fanout::utils::bootstrap::init_tracing;

const DEMO_ORDER_REFS: &[&str] = &[
    "7307", "5493", "7387", "2614", "5999", "3078", "8577", "5479", "6606", "8448",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;

    let mut order_refs: Vec<String> = std::env::args().skip(1).collect();
    if order_refs.is_empty() {
        order_refs = DEMO_ORDER_REFS.iter().map(|r| r.to_string()).collect();
    }
    let inputs: Vec<UnitInput> = order_refs.into_iter().map(UnitInput::new).collect();

    let executor = build_executor(&config.executor)?;
    info!(
        executor = executor.name(),
        units = inputs.len(),
        max_concurrent = config.batch.max_concurrent,
        "fanout-batch started"
    );

    let substrate: Arc<dyn Substrate> = Arc::new(
        LocalSubstrate::new(executor, config.retry.clone())
            .with_reuse_policy(config.substrate.reuse_policy),
    );
    let orchestrator = BatchOrchestrator::new(substrate, BatchOptions::from(config.batch.clone()));

    let result = orchestrator.run_batch(inputs).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
