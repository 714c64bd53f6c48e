use super::{clock::ClockSource, sink::EventSink};
use crate::server::telemetry::increment_events_sent;
use tickstream_tonic_core::{Result, proto::TimeEvent};

/// Runs one time stream until it is cancelled or a write fails.
///
/// The session waits on the first of two events:
///
/// - the next `clock` tick, which produces exactly one [`TimeEvent`] written
///   to `sink`;
/// - `cancel` resolving, which ends the session normally.
///
/// A write that is still pending when `cancel` resolves is abandoned, so a
/// stalled client cannot keep the timer alive.
///
/// # Returns
///
/// - `Ok(sent)` with the number of events delivered when `cancel` fires.
/// - `Err(_)` from the sink when a write fails. No event is written after it.
///
/// `clock` is owned by the session and dropped on every return path, which
/// releases its timer.
pub async fn run_session<C, S, F>(mut clock: C, mut sink: S, cancel: F) -> Result<u64>
where
    C: ClockSource,
    S: EventSink,
    F: Future<Output = ()>,
{
    tokio::pin!(cancel);
    let mut sent = 0;

    loop {
        let at = tokio::select! {
            biased;
            () = &mut cancel => {
                tracing::debug!(sent, "Time stream cancelled");
                return Ok(sent);
            }
            at = clock.tick() => at,
        };

        let event = TimeEvent::at(&at);
        tracing::trace!("Sending time: {}", event.current_time);

        tokio::select! {
            biased;
            () = &mut cancel => {
                tracing::debug!(sent, "Time stream cancelled during send");
                return Ok(sent);
            }
            res = sink.send(event) => {
                if let Err(e) = res {
                    tracing::warn!(sent, "Error sending time: {e}");
                    return Err(e);
                }
            }
        }

        sent += 1;
        increment_events_sent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::streaming::{clock::IntervalClock, sink::ChannelSink};
    use chrono::{DateTime, Local, TimeDelta};
    use core::time::Duration;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };
    use tickstream_tonic_core::Error;
    use tokio::{sync::mpsc, time};
    use tokio_util::sync::CancellationToken;

    /// Records every event it receives. Fails the `fail_on`-th write (1-based).
    #[derive(Default)]
    struct RecordingSink {
        events: Vec<TimeEvent>,
        calls: usize,
        fail_on: Option<usize>,
    }

    impl EventSink for &mut RecordingSink {
        async fn send(&mut self, event: TimeEvent) -> Result<()> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                return Err(Error::ChannelError {
                    context: "transport reset".into(),
                });
            }
            self.events.push(event);
            Ok(())
        }
    }

    /// Ticks immediately, one second apart, counting ticks consumed and
    /// flagging when it is dropped.
    struct CountingClock {
        next: DateTime<Local>,
        ticks: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    impl ClockSource for CountingClock {
        async fn tick(&mut self) -> DateTime<Local> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            let at = self.next;
            self.next += TimeDelta::seconds(1);
            at
        }
    }

    impl Drop for CountingClock {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    /// Never completes a write, like a client that stopped reading.
    struct StalledSink;

    impl EventSink for StalledSink {
        async fn send(&mut self, _event: TimeEvent) -> Result<()> {
            std::future::pending().await
        }
    }

    fn parse(event: &TimeEvent) -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339(&event.current_time).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn emits_one_event_per_tick_until_cancelled() {
        let clock = IntervalClock::new(Duration::from_secs(1));
        let mut sink = RecordingSink::default();

        let sent = run_session(clock, &mut sink, time::sleep(Duration::from_millis(3500)))
            .await
            .unwrap();

        assert_eq!(sent, 3);
        assert_eq!(sink.events.len(), 3);
        let times: Vec<_> = sink.events.iter().map(parse).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn events_carry_the_time_reported_by_the_clock() {
        let origin = Local::now();
        let clock = CountingClock {
            next: origin,
            ticks: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicBool::new(false)),
        };
        let mut sink = RecordingSink {
            fail_on: Some(4),
            ..Default::default()
        };

        run_session(clock, &mut sink, std::future::pending())
            .await
            .unwrap_err();

        let times: Vec<_> = sink.events.iter().map(parse).collect();
        assert_eq!(times.len(), 3);
        assert_eq!(times[0].timestamp(), origin.timestamp());
        assert_eq!(times[2] - times[0], TimeDelta::seconds(2));
    }

    #[tokio::test]
    async fn send_failure_stops_the_session_and_its_clock() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let clock = CountingClock {
            next: Local::now(),
            ticks: Arc::clone(&ticks),
            dropped: Arc::clone(&dropped),
        };
        let mut sink = RecordingSink {
            fail_on: Some(2),
            ..Default::default()
        };

        let err = run_session(clock, &mut sink, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ChannelError { .. }));
        assert_eq!(tonic::Status::from(err).code(), tonic::Code::Internal);
        assert_eq!(sink.events.len(), 1);
        assert_eq!(sink.calls, 2);
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_over_a_stalled_write() {
        let clock = IntervalClock::new(Duration::from_secs(1));
        let start = time::Instant::now();

        let sent = run_session(clock, StalledSink, time::sleep(Duration::from_secs(2)))
            .await
            .unwrap();

        assert_eq!(sent, 0);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_session_never_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let clock = CountingClock {
            next: Local::now(),
            ticks: Arc::clone(&ticks),
            dropped: Arc::new(AtomicBool::new(false)),
        };
        let mut sink = RecordingSink::default();

        let sent = run_session(clock, &mut sink, async {}).await.unwrap();

        assert_eq!(sent, 0);
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_only_observe_their_own_cancellation() {
        let tokens: Vec<_> = (0..4).map(|_| CancellationToken::new()).collect();
        let mut receivers = Vec::new();
        let mut handles = Vec::new();

        for token in &tokens {
            let (tx, rx) = mpsc::channel(16);
            receivers.push(rx);
            let clock = IntervalClock::new(Duration::from_secs(1));
            let cancel = token.clone().cancelled_owned();
            handles.push(tokio::spawn(run_session(clock, ChannelSink::new(tx), cancel)));
        }

        time::sleep(Duration::from_millis(1500)).await;
        tokens[0].cancel();

        time::sleep(Duration::from_secs(4)).await;
        for token in &tokens[1..] {
            token.cancel();
        }

        let mut sent = Vec::new();
        for handle in handles {
            sent.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(sent, vec![1, 5, 5, 5]);

        for (rx, expected) in receivers.iter_mut().zip(sent) {
            let mut received = 0;
            while let Ok(event) = rx.try_recv() {
                event.unwrap();
                received += 1;
            }
            assert_eq!(received, expected);
        }
    }
}
