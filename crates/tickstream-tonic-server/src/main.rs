#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use futures::Stream;
use server::config::{CliArgs, ServerConfig};
use server::health::{control, register::HealthRegister};
use server::service::handler::TimeStreamService;
use server::telemetry::init_telemetry;
use server::tls::load_tls_config;
use std::sync::Arc;
use tickstream_tonic_core::{
    proto::{FILE_DESCRIPTOR_SET, time_service_server::TimeServiceServer},
    types::HealthStatus,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::server::NamedService;
use tonic::transport::ServerTlsConfig;
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let tls = match &config.tls {
        Some(paths) => Some(load_tls_config(paths).await?),
        None => None,
    };

    let grpc = TcpListener::bind(config.grpc_addr)
        .await
        .with_context(|| format!("failed to bind gRPC listener on {}", config.grpc_addr))?;
    let http = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind control listener on {}", config.http_addr))?;
    log_startup_info(&config);

    let res = run_server_with_incoming(
        TcpListenerStream::new(grpc),
        http,
        tls,
        &config,
        shutdown_signal(),
    )
    .await;

    providers.shutdown();
    res
}

/// Serves the gRPC surface on `incoming` and the control surface on `http`
/// until `signal` resolves, then drains both for at most
/// `config.shutdown_timeout`.
///
/// Shutdown first reports `NotServing` so health watchers and proxies stop
/// routing new streams, then ends every open time stream normally.
async fn run_server_with_incoming<I, IO, IE, S>(
    incoming: I,
    http: TcpListener,
    tls: Option<ServerTlsConfig>,
    config: &ServerConfig,
    signal: S,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
    S: Future<Output = ()>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    let register = Arc::new(
        HealthRegister::new(
            health_reporter,
            [TimeServiceServer::<TimeStreamService>::NAME],
        )
        .await,
    );

    let shutdown_token = CancellationToken::new();
    let service = TimeStreamService::new(config, shutdown_token.clone());

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let mut builder = Server::builder();
    if let Some(tls) = tls {
        builder = builder
            .tls_config(tls)
            .context("invalid TLS configuration")?;
    }

    let grpc = builder
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_time_service(service.clone()))
        .serve_with_incoming_shutdown(incoming, shutdown_token.clone().cancelled_owned());
    let grpc = async { grpc.await.context("gRPC server failed") };

    let control = axum::serve(http, control::router(Arc::clone(&register)))
        .with_graceful_shutdown(shutdown_token.clone().cancelled_owned());
    let control = async { control.await.context("control server failed") };

    let servers = async {
        tokio::try_join!(grpc, control)?;
        anyhow::Ok(())
    };
    tokio::pin!(servers);

    tokio::select! {
        res = &mut servers => return res,
        () = signal => {}
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    register
        .set_serving_status(HealthStatus::NotServing)
        .await;

    // 2. End open streams and stop both listeners
    service.shutdown();

    // 3. Wait for connections to drain. Health watchers keep their streams
    // open indefinitely, so the drain is bounded.
    match tokio::time::timeout(config.shutdown_timeout, servers).await {
        Ok(res) => res?,
        Err(_) => tracing::warn!(
            "Graceful drain timed out after {:?}",
            config.shutdown_timeout
        ),
    }

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting time service with full config: {:#?}", config);
    } else {
        tracing::info!(
            "gRPC server listening at {} (tls: {}), health toggle server listening at {}",
            config.grpc_addr,
            config.tls.is_some(),
            config.http_addr
        );
    }
}

fn build_time_service(service: TimeStreamService) -> TimeServiceServer<TimeStreamService> {
    TimeServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

async fn shutdown_signal() {
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
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
