use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use osa_core::InMemoryWorkflowStore;
use osa_harness::{Simulator, SimulatorConfig, DEFAULT_ENDPOINT};
use osa_ingest::{init_tracing, routes, IngestConfig, IngestService, LoggingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("osa-ingest")
        .version(osa_ingest::VERSION)
        .about("OSA multi-agent workflow ingestion")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the ingestion endpoint")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to TOML configuration (defaults apply if absent)"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Drive synthetic workflows through a running endpoint")
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .default_value("sweep")
                        .value_parser(["single", "concurrent", "sweep"])
                        .help("Simulation mode"),
                )
                .arg(
                    Arg::new("endpoint")
                        .long("endpoint")
                        .default_value(DEFAULT_ENDPOINT)
                        .help("Ingestion endpoint URL"),
                )
                .arg(
                    Arg::new("token")
                        .long("token")
                        .help("Bearer token sent with every submission"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Number of workflows in concurrent mode"),
                )
                .arg(
                    Arg::new("max-in-flight")
                        .long("max-in-flight")
                        .value_parser(value_parser!(usize))
                        .help("Cap on simultaneous submissions (unbounded if omitted)"),
                )
                .arg(
                    Arg::new("failure-probability")
                        .long("failure-probability")
                        .value_parser(value_parser!(f64))
                        .help("Per-agent failure probability, 0.0 to 1.0"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .default_value("30")
                        .value_parser(value_parser!(u64))
                        .help("Request timeout in seconds"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("serve", args)) => serve(args).await,
        Some(("simulate", args)) => {
            init_tracing(&LoggingConfig::default()).context("failed to install tracing subscriber")?;
            let passed = simulate(args).await?;
            std::process::exit(if passed { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}

async fn serve(args: &ArgMatches) -> anyhow::Result<()> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => IngestConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => IngestConfig::default(),
    };
    init_tracing(&config.logging).context("failed to install tracing subscriber")?;

    info!(
        version = osa_ingest::VERSION,
        policy = ?config.auth.policy,
        "starting {}",
        osa_ingest::SERVICE_NAME
    );

    let service = Arc::new(IngestService::from_config(
        &config,
        Arc::new(InMemoryWorkflowStore::new()),
    ));

    let (addr, server) = warp::serve(routes::api(service, config.max_body_bytes))
        .try_bind_with_graceful_shutdown(config.bind, shutdown_signal())
        .with_context(|| format!("binding {}", config.bind))?;

    info!(%addr, "listening");
    server.await;
    info!("server stopped");
    Ok(())
}

async fn simulate(args: &ArgMatches) -> anyhow::Result<bool> {
    let mut config = SimulatorConfig::default()
        .with_seed(args.get_one::<u64>("seed").copied().unwrap_or(42))
        .with_concurrency(args.get_one::<usize>("concurrency").copied().unwrap_or(10))
        .with_request_timeout(Duration::from_secs(
            args.get_one::<u64>("timeout").copied().unwrap_or(30),
        ));
    if let Some(endpoint) = args.get_one::<String>("endpoint") {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(token) = args.get_one::<String>("token") {
        config = config.with_token(token.clone());
    }
    if let Some(max_in_flight) = args.get_one::<usize>("max-in-flight") {
        config = config.with_max_in_flight(*max_in_flight);
    }
    if let Some(probability) = args.get_one::<f64>("failure-probability") {
        anyhow::ensure!(
            (0.0..=1.0).contains(probability),
            "failure probability must be between 0 and 1, got {probability}"
        );
        config = config.with_failure_probability(*probability);
    }

    let simulator = Simulator::new(config).context("failed to build HTTP client")?;
    let mode = args.get_one::<String>("mode").map_or("sweep", String::as_str);

    println!("Running OSA workflow simulation ({mode})...");
    println!("Endpoint: {}", simulator.config().endpoint);
    println!();

    let passed = match mode {
        "single" => {
            let record = simulator.run_single().await;
            println!("{}", record.describe());
            record.outcome.is_accepted() && !record.id_mismatch()
        }
        "concurrent" => {
            let report = simulator.run_concurrent().await;
            println!("{}", report.generate_text());
            report.passed()
        }
        _ => {
            let report = simulator.run_sweep().await;
            println!("{}", report.generate_text());
            report.passed()
        }
    };
    Ok(passed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("ctrl-c received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }
}
