//! gRPC service implementation for periodic time streaming.
//!
//! This module defines [`TimeStreamService`], the concrete implementation of
//! the `TimeService` gRPC service. Every `StreamTime` call gets its own
//! background task running [`run_session`] with a private clock.
//!
//! ## Responsibilities
//!
//! - Refuse new streams once shutdown has started.
//! - Bind each session to the call's cancellation signal: the client dropping
//!   the response stream, or the service-wide shutdown token.
//! - Surface a failed write to the client as `Status::internal`.

use crate::server::{
    config::ServerConfig,
    streaming::{
        clock::{ClockSource, IntervalClock},
        session::run_session,
        sink::{ChannelSink, EventSink},
    },
    telemetry::{
        decrement_streams_inflight, increment_requests, increment_stream_errors,
        increment_streams_inflight, record_stream_duration,
    },
};
use core::{pin::Pin, time::Duration};
use tickstream_tonic_core::{
    Error,
    proto::{TimeEvent, TimeRequest, time_service_server::TimeService},
};
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::Instrument;

/// Streams the server's wall-clock time to each connected client.
///
/// Sessions are independent: they share no state besides the shutdown token,
/// and cancelling one never affects another.
#[derive(Clone)]
pub struct TimeStreamService {
    tick_interval: Duration,
    stream_buffer_size: usize,
    shutdown_token: CancellationToken,
}

impl TimeStreamService {
    pub fn new(config: &ServerConfig, shutdown_token: CancellationToken) -> Self {
        Self {
            tick_interval: config.tick_interval,
            stream_buffer_size: config.stream_buffer_size,
            shutdown_token,
        }
    }

    /// Ends every open stream normally and refuses new ones.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

#[tonic::async_trait]
impl TimeService for TimeStreamService {
    type StreamTimeStream = Pin<Box<dyn Stream<Item = Result<TimeEvent, Status>> + Send>>;

    #[tracing::instrument(skip_all, fields(remote_addr = ?req.remote_addr()))]
    async fn stream_time(
        &self,
        req: Request<TimeRequest>,
    ) -> Result<Response<Self::StreamTimeStream>, Status> {
        if self.shutdown_token.is_cancelled() {
            increment_stream_errors();
            return Err(Error::ServiceShutdown.into());
        }

        tracing::info!("StreamTime request received");
        increment_requests();
        increment_streams_inflight();
        let start = std::time::Instant::now();

        let (resp_tx, resp_rx) = mpsc::channel(self.stream_buffer_size);
        let clock = IntervalClock::new(self.tick_interval);
        let sink = ChannelSink::new(resp_tx.clone());

        // The transport drops the receiver when the client goes away, which
        // closes the channel.
        let closed_tx = resp_tx.clone();
        let shutdown_token = self.shutdown_token.clone();
        let cancel = async move {
            tokio::select! {
                () = closed_tx.closed() => tracing::info!("Client disconnected"),
                () = shutdown_token.cancelled() => tracing::info!("Closing stream for shutdown"),
            }
        };

        let fut = serve_stream(clock, sink, cancel, resp_tx, start)
            .instrument(tracing::info_span!("time_stream"));

        tokio::spawn(fut);

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }
}

/// Drives one session to completion and settles its metrics.
///
/// A failed write is counted as a stream error and forwarded on `resp_tx` as
/// `Status::internal`. With [`ChannelSink`] a write only fails once the
/// receiver is gone, and that also resolves `cancel`, so in practice the
/// forward reaches no one; sinks that fail for other reasons still get their
/// error to the client.
async fn serve_stream<C, S, F>(
    clock: C,
    sink: S,
    cancel: F,
    resp_tx: mpsc::Sender<Result<TimeEvent, Status>>,
    start: std::time::Instant,
) -> bool
where
    C: ClockSource,
    S: EventSink,
    F: Future<Output = ()>,
{
    let ok = match run_session(clock, sink, cancel).await {
        Ok(sent) => {
            tracing::debug!(sent, "Time stream finished");
            true
        }
        Err(e) => {
            increment_stream_errors();
            if resp_tx.send(Err(e.into())).await.is_err() {
                tracing::debug!("Client gone before error could be forwarded");
            }
            false
        }
    };
    decrement_streams_inflight();
    record_stream_duration(start.elapsed().as_millis() as f64);
    ok
}
