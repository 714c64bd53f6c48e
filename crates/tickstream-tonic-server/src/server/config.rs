use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use std::{net::SocketAddr, path::PathBuf};
use tickstream_tonic_core::types::DEFAULT_TICK_INTERVAL;

/// Runtime configuration for the `tickstream-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first if present), with defaults suitable for running behind
/// a local proxy.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tickstream-tonic-server",
    version,
    about = "A gRPC service that streams the current time and exposes a toggleable health check"
)]
pub struct CliArgs {
    /// Address the gRPC listener binds to.
    ///
    /// Serves `TimeService`, the standard health service, and reflection.
    ///
    /// Environment variable: `GRPC_ADDR`
    #[arg(long, env = "GRPC_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub grpc_addr: String,

    /// Address the plain HTTP control listener binds to.
    ///
    /// Serves `/toggle-health`.
    ///
    /// Environment variable: `HTTP_ADDR`
    #[arg(long, env = "HTTP_ADDR", default_value_t = String::from("0.0.0.0:8081"))]
    pub http_addr: String,

    /// Milliseconds between two events on a time stream.
    ///
    /// Fixed for the lifetime of the process; every stream ticks at this rate.
    ///
    /// Environment variable: `TICK_INTERVAL_MS`
    #[arg(long, env = "TICK_INTERVAL_MS", default_value_t = DEFAULT_TICK_INTERVAL.as_millis() as u64)]
    pub tick_interval_ms: u64,

    /// Capacity of the per-stream buffer between a session and the transport.
    ///
    /// Small values keep a slow client from accumulating stale timestamps.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 4)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for both listeners to drain during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout: u64,

    /// PEM certificate chain presented by the gRPC listener.
    ///
    /// Environment variable: `TLS_CERT`
    #[arg(long, env = "TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key matching `--tls-cert`.
    ///
    /// Environment variable: `TLS_KEY`
    #[arg(long, env = "TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// PEM bundle of CAs that client certificates must chain to. Enables
    /// mutual TLS.
    ///
    /// Environment variable: `TLS_CLIENT_CA`
    #[arg(long, env = "TLS_CLIENT_CA", requires = "tls_cert")]
    pub tls_client_ca: Option<PathBuf>,
}

/// File locations of the TLS material for the gRPC listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub client_ca: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub grpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub tick_interval: Duration,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: Duration,
    pub tls: Option<TlsPaths>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: SocketAddr::from(([0, 0, 0, 0], 50051)),
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            tick_interval: DEFAULT_TICK_INTERVAL,
            stream_buffer_size: 4,
            shutdown_timeout: Duration::from_secs(5),
            tls: None,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.tick_interval_ms == 0 {
            bail!("TICK_INTERVAL_MS must be greater than 0");
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        let grpc_addr: SocketAddr = args
            .grpc_addr
            .parse()
            .with_context(|| format!("invalid GRPC_ADDR `{}`", args.grpc_addr))?;
        let http_addr: SocketAddr = args
            .http_addr
            .parse()
            .with_context(|| format!("invalid HTTP_ADDR `{}`", args.http_addr))?;

        if grpc_addr == http_addr {
            bail!("GRPC_ADDR and HTTP_ADDR must differ (both are {grpc_addr})");
        }

        let tls = match (args.tls_cert, args.tls_key, args.tls_client_ca) {
            (Some(cert), Some(key), client_ca) => Some(TlsPaths {
                cert,
                key,
                client_ca,
            }),
            (None, None, None) => None,
            (None, None, Some(_)) => bail!("TLS_CLIENT_CA requires TLS_CERT and TLS_KEY"),
            _ => bail!("TLS_CERT and TLS_KEY must be set together"),
        };

        Ok(Self {
            grpc_addr,
            http_addr,
            tick_interval: Duration::from_millis(args.tick_interval_ms),
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            tls,
        })
    }
}
