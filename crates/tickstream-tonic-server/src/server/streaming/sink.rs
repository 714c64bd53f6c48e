use tickstream_tonic_core::{Error, Result, proto::TimeEvent};
use tokio::sync::mpsc;
use tonic::Status;

/// Destination for the events of one time stream.
pub trait EventSink: Send {
    /// Writes one event. An error ends the session.
    fn send(&mut self, event: TimeEvent) -> impl Future<Output = Result<()>> + Send;
}

/// An [`EventSink`] that forwards events into the channel backing a gRPC
/// response stream.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<core::result::Result<TimeEvent, Status>>,
}

impl ChannelSink {
    pub const fn new(tx: mpsc::Sender<core::result::Result<TimeEvent, Status>>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    async fn send(&mut self, event: TimeEvent) -> Result<()> {
        self.tx
            .send(Ok(event))
            .await
            .map_err(|e| Error::ChannelError {
                context: format!("Failed to forward event: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(current_time: &str) -> TimeEvent {
        TimeEvent {
            current_time: current_time.to_string(),
        }
    }

    #[tokio::test]
    async fn forwards_events_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);

        sink.send(event("2024-05-01T12:00:01Z")).await.unwrap();
        sink.send(event("2024-05-01T12:00:02Z")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().unwrap().current_time, "2024-05-01T12:00:01Z");
        assert_eq!(rx.recv().await.unwrap().unwrap().current_time, "2024-05-01T12:00:02Z");
    }

    #[tokio::test]
    async fn closed_receiver_is_a_channel_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut sink = ChannelSink::new(tx);

        let err = sink.send(event("2024-05-01T12:00:01Z")).await.unwrap_err();
        assert!(matches!(err, Error::ChannelError { .. }));
    }
}
