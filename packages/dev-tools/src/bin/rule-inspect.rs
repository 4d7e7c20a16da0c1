//! Rule File Inspector
//!
//! Loads the configured rules file into a forest and prints what the engine
//! sees: the forest summary, the tree structure and, optionally, the realized
//! document at one path.
//!
//! # Usage
//!
//! ```bash
//! # Summary and structure of conf/rules.json
//! cargo run --bin rule-inspect
//!
//! # Also print the document realized at /a/b
//! cargo run --bin rule-inspect -- /a/b
//!
//! # Keep refreshing from disk until Ctrl-C
//! RULES_FILE=conf/prod.json cargo run --bin rule-inspect -- --watch
//! ```
//!
//! # Environment Variables
//!
//! - `RULES_FILE`: Rules file (default: conf/rules.json)
//! - `RULE_TREE_NAME`: Name of the tree built from it (default: default)
//! - `REFRESH_INTERVAL`: Refresh period with `--watch` (default: 5s)
//! - `SHUTDOWN_TIMEOUT`: Grace period for stopping the refresh loop (default: 3s)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug")

use std::env;
use std::sync::Arc;

use ruleforest_core::{default_builder, EngineConfig, Forest, ProcessorRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut watch = false;
    let mut query = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--watch" | "-w" => watch = true,
            _ => query = Some(arg),
        }
    }

    let config = EngineConfig::from_env()?;
    tracing::info!("Rules file: {}", config.rules_file.display());

    let registry = Arc::new(ProcessorRegistry::standard());
    let builder = default_builder(config.clone(), registry);

    // Builders may issue blocking HTTP requests, keep them off the executor
    let forest = tokio::task::spawn_blocking(move || Arc::new(Forest::new([builder]))).await?;
    println!("{}", forest.info());

    let tree = forest
        .get(&config.tree_name)
        .ok_or_else(|| anyhow::anyhow!("tree '{}' failed to build", config.tree_name))?;
    println!("{}", serde_json::to_string_pretty(&tree.show_struct())?);

    if let Some(path) = query {
        let document = tokio::task::spawn_blocking(move || tree.get_string(&path)).await??;
        println!("{}", document);
    }

    if !watch {
        return Ok(());
    }

    let handle = forest.spawn_refresh(config.refresh_interval);
    tracing::info!(
        "Watching {} every {:?}, Ctrl-C to stop",
        config.rules_file.display(),
        config.refresh_interval
    );
    tokio::signal::ctrl_c().await?;

    if tokio::time::timeout(config.shutdown_timeout, handle.shutdown())
        .await
        .is_err()
    {
        tracing::warn!(
            "Refresh loop did not stop within {:?}",
            config.shutdown_timeout
        );
    }
    println!("{}", forest.info());
    Ok(())
}
