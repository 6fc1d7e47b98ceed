//! sqspipe - relay messages from a source SQS queue to a destination queue

mod app;
mod args;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use sqspipe_core::application::RelayController;
use sqspipe_core::VERSION;
use sqspipe_infra_sqs::{connect, SqsQueue};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse and validate flags (usage goes to stdout)
    let (args, config) = match app::parse_args(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(exit) => {
            print!("{}", exit.output);
            std::process::exit(exit.code);
        }
    };

    // 2. Initialize logging
    let log_guard = logging::init();

    println!("Starting sqspipe version {VERSION}");

    // 3. Setup dependencies (DI wiring)
    let client = connect(&args.sqs_settings())
        .await
        .context("Failed to configure SQS client")?;
    let source = Arc::new(SqsQueue::new(client.clone(), &args.source));
    let destination = Arc::new(SqsQueue::new(client, &args.destination));

    info!(
        source = %args.source,
        destination = %args.destination,
        workers = config.workers,
        "Relaying messages"
    );

    // 4. Run the relay until drained, idle or interrupted
    let mut relay = RelayController::new(source, destination, config);
    let result = app::run_relay(&mut relay).await;
    match &result {
        Ok(Some(summary)) => info!(
            relayed = summary.relayed,
            remaining = summary.remaining,
            reason = %summary.stop_reason,
            "Relay stopped"
        ),
        Ok(None) => {}
        Err(e) => error!(error = %e, "Relay failed to start"),
    }

    // Flush queued log lines before the final stdout line
    drop(log_guard);

    result.context("Unable to run relay")?;
    println!("Done");
    Ok(())
}
