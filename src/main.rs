/*!
 * Process Tree Kernel - Main Entry Point
 *
 * Seeds the classroom topology, runs the guided demo, and prints the
 * final process table as JSON.
 */

use proctree_kernel::{
    init_tracing, run_demo, KernelConfig, LifecycleEngineBuilder, Topology, TracingObserver,
};
use miette::IntoDiagnostic;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize structured tracing
    init_tracing();

    info!("Process tree kernel starting...");
    info!("================================================");

    let config = KernelConfig::from_env()?;
    info!(
        reap_delay_ms = config.reap_delay.as_millis() as u64,
        demo_ms = config.demo.total().as_millis() as u64,
        exec_seed = ?config.exec_seed,
        "Configuration loaded"
    );

    let engine = LifecycleEngineBuilder::from_config(&config)
        .with_topology(Topology::classroom())
        .build()?;

    info!("Running guided demo...");
    let outcome = run_demo(&engine, config.demo, &TracingObserver).await?;
    info!(
        terminated = outcome.termination.terminated_pid,
        orphans = ?outcome.termination.orphaned_pids,
        "Demo finished"
    );

    // Let every pending reclamation fire before reporting
    engine.shutdown().await;

    let status = engine.status();
    info!(
        zombies = status.zombies,
        orphans = status.orphans,
        "Final system status"
    );

    let table = serde_json::to_string_pretty(&engine.snapshot()).into_diagnostic()?;
    println!("{table}");

    info!("Process tree kernel stopped");
    Ok(())
}
