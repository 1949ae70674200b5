use flapjack_common::stats::PipelineStats;
use flapjack_common::types::MediumType;
use flapjack_notify::plugin::GatewayRegistry;
use flapjack_notify::{AlertQueue, Dispatcher, NotifierSettings, Resolver};
use flapjack_processor::{EventQueue, Processor, ProcessorSettings, Receiver};
use flapjack_server::config::ServerConfig;
use flapjack_server::pipeline::{Pipeline, QueueSet};
use flapjack_server::{seed, RunError, EXIT_USAGE};
use flapjack_store::memory::MemoryStore;
use flapjack_store::{EntityClass, Store};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  flapjack-server [config.toml]    Start the event processor and notifier");
    eprintln!("  flapjack-server --help           Show this help");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--help" | "-h") => {
            print_usage();
            ExitCode::SUCCESS
        }
        Some(flag) if flag.starts_with('-') => {
            eprintln!("Unknown option: {flag}");
            print_usage();
            ExitCode::from(EXIT_USAGE)
        }
        other => {
            let config_path = other.unwrap_or("config/flapjack.toml");
            match run_server(config_path).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    eprintln!("{error}");
                    ExitCode::from(error.exit_code())
                }
            }
        }
    }
}

async fn run_server(config_path: &str) -> Result<(), RunError> {
    let config = ServerConfig::load(config_path).map_err(RunError::Config)?;

    let directive = "flapjack=info".parse().map_err(|e| {
        RunError::Config(anyhow::anyhow!("bad log directive: {e}"))
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    tracing::info!(
        config = %config_path,
        gateways = config.gateways.len(),
        "flapjack-server starting"
    );

    // Store bootstrap.
    let store = Arc::new(MemoryStore::new());
    if let Some(seed_path) = &config.seed {
        seed::load_file(store.as_ref(), seed_path).map_err(RunError::Store)?;
    }

    let stats = Arc::new(PipelineStats::new());
    let events = Arc::new(EventQueue::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Dispatch pools, one per configured gateway.
    let notifier_settings = NotifierSettings {
        max_attempts: config.notifier.max_attempts,
        max_backoff_secs: config.notifier.max_backoff,
        shutdown_grace_secs: config.notifier.shutdown_grace,
        workers_per_medium: config.notifier.workers_per_medium,
    };
    let registry = GatewayRegistry::default();
    let mut queues: QueueSet = QueueSet::new();
    let mut worker_handles = Vec::new();
    for (medium_name, gateway_config) in &config.gateways {
        let medium_type: MediumType = medium_name.parse().map_err(|e: String| {
            RunError::Config(anyhow::anyhow!("gateways.{medium_name}: {e}"))
        })?;
        let gateway = registry
            .create_gateway(medium_type, &gateway_config.config)
            .map_err(|e| RunError::Config(anyhow::anyhow!("gateways.{medium_name}: {e}")))?;
        let queue_name = gateway_config
            .queue
            .clone()
            .unwrap_or_else(|| format!("{medium_type}_notifications"));
        let queue = Arc::new(AlertQueue::new(&queue_name));
        queues.insert(medium_type, queue.clone());

        let dispatcher = Arc::new(Dispatcher::new(
            queue,
            gateway,
            Duration::from_secs(gateway_config.timeout),
            notifier_settings.clone(),
            stats.clone(),
        ));
        worker_handles.extend(dispatcher.spawn_workers(&shutdown_rx));
        tracing::info!(medium = %medium_type, queue = %queue_name, "Gateway configured");
    }
    let queues = Arc::new(queues);

    // The receive -> process -> resolve -> enqueue loop.
    let processor_settings = ProcessorSettings {
        initial_failure_delay: config.processor.initial_failure_delay,
        repeat_failure_delay: config.processor.repeat_failure_delay,
        auto_create_checks: config.processor.auto_create_checks,
        new_check_maintenance_secs: config.processor.new_check_scheduled_maintenance_duration,
    };
    let pipeline = Pipeline::new(
        Receiver::new(events.clone(), stats.clone()),
        Processor::new(store.clone(), processor_settings, stats.clone()),
        Resolver::new(store.clone(), stats.clone()),
        queues.clone(),
        stats.clone(),
    );
    let pipeline_handle = tokio::spawn(pipeline.run(shutdown_rx.clone()));

    // Periodic state-history pruning.
    let retention_handle = if config.states_retention > 0 {
        let retention = chrono::Duration::seconds(config.states_retention as i64);
        let prune_store = store.clone();
        Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(3600));
            loop {
                tick.tick().await;
                let cutoff = chrono::Utc::now() - retention;
                let result = prune_store.with_lock(&[EntityClass::Check, EntityClass::State], |ops| {
                    let mut removed = 0;
                    for check_id in ops.check_ids() {
                        removed += ops.prune_states_before(&check_id, cutoff);
                    }
                    Ok(removed)
                });
                match result {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Pruned expired states")
                    }
                    Err(error) => tracing::error!(error = %error, "State pruning failed"),
                    _ => {}
                }
            }
        }))
    } else {
        None
    };

    tracing::info!("Server started");
    signal::ctrl_c().await.ok();
    tracing::info!("Shutting down gracefully");
    shutdown_tx.send(true).ok();

    // The pipeline finishes its in-flight event; dispatch workers get
    // shutdown_grace to finish in-flight deliveries, after which abandoned
    // alerts stay queued.
    pipeline_handle.await.ok();
    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(config.notifier.shutdown_grace);
    for mut handle in worker_handles {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if tokio::time::timeout(remaining, &mut handle).await.is_err() {
            tracing::warn!("Shutdown grace elapsed, abandoning in-flight delivery");
            handle.abort();
        }
    }
    if let Some(handle) = retention_handle {
        handle.abort();
    }

    stats.log_summary();
    tracing::info!("Server stopped");
    Ok(())
}
