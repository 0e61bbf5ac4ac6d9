use clap::Parser;
use docparse_tonic_core::proto::{FILE_DESCRIPTOR_SET, doc_parser_server::DocParserServer};
use docparse_tonic_server::server::config::{CliArgs, ServerConfig};
use docparse_tonic_server::server::engine::PassthroughEngine;
use docparse_tonic_server::server::service::handler::ParseService;
use docparse_tonic_server::server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;

// Using mimalloc for better performance under contention, especially in
// musl environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry();

    let output_dir = config.output_dir.clone();
    let service = ParseService::new(config.clone(), move |binding| {
        PassthroughEngine::load(binding, output_dir.clone())
    })?;

    let listener = TcpListener::bind(&config.server_addr).await?;
    let incoming = TcpListenerStream::new(listener);
    log_startup_info(&config);

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<DocParserServer<ParseService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Server::builder()
        .add_service(health_service)
        .add_service(reflection)
        .add_service(DocParserServer::new(service.clone()))
        .serve_with_incoming_shutdown(incoming, shutdown_signal(service, health_reporter))
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting parse service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting parse service on {} with {} worker slots",
            config.server_addr,
            config.num_slots()
        );
    }
}

async fn shutdown_signal(service: ParseService, health_reporter: HealthReporter) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    health_reporter
        .set_not_serving::<DocParserServer<ParseService>>()
        .await;

    // 2. Perform graceful shutdown
    if let Err(e) = service.shutdown().await {
        tracing::error!("Error during service shutdown: {:?}", e);
    }
}
