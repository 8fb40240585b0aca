//! Session loop that owns the bus and the dispatcher
//!
//! One task reads frames from the bus adapter and dispatches them strictly in
//! arrival order. Counter snapshots are published on a watch channel after every
//! cycle, so observers always see the latest totals without slowing the loop.

use futures::Stream;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::BusAdapter;
use crate::config::SessionConfig;
use crate::dispatcher::{Dispatcher, SessionCounters};
use crate::{BridgeError, Result};

/// Cap on the backoff exponent after consecutive bus errors.
const MAX_BACKOFF_SHIFT: u32 = 5;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Stopped through the handle
    Cancelled,
    /// Bus adapter reported the bus closed
    BusClosed,
    /// Bus could not be configured
    ConfigureFailed { reason: String },
    /// Too many consecutive bus errors
    BusFailed { errors: u32, reason: String },
}

/// Final state of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub counters: SessionCounters,
    pub end: SessionEnd,
}

/// Spawns dispatch sessions.
pub struct Session;

impl Session {
    /// Spawn a session over `bus`.
    ///
    /// The dispatcher's counters are reset first; every session starts from zero.
    /// Must be called from within a tokio runtime.
    pub fn spawn<B>(bus: B, mut dispatcher: Dispatcher, config: SessionConfig) -> SessionHandle
    where
        B: BusAdapter,
    {
        dispatcher.reset();

        let (counters_tx, counters_rx) = watch::channel(dispatcher.counters());
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        let task = tokio::spawn(async move {
            Self::run(bus, dispatcher, config, counters_tx, cancel_task).await
        });

        SessionHandle { counters: counters_rx, cancel, task: Some(task), writer: None }
    }

    async fn run<B>(
        mut bus: B,
        mut dispatcher: Dispatcher,
        config: SessionConfig,
        counters_tx: watch::Sender<SessionCounters>,
        cancel: CancellationToken,
    ) -> SessionReport
    where
        B: BusAdapter,
    {
        if let Err(e) = bus.configure().await {
            error!("Bus configuration failed: {}", e);
            if let Err(e) = bus.stop().await {
                warn!("Bus stop failed: {}", e);
            }
            return SessionReport {
                counters: dispatcher.counters(),
                end: SessionEnd::ConfigureFailed { reason: e.to_string() },
            };
        }

        info!(packet_size = dispatcher.packet_size(), "Session started");
        let mut error_count = 0u32;

        let end = loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Session cancelled while waiting for the bus");
                    break SessionEnd::Cancelled;
                }
                result = bus.next_frame() => result,
            };

            match result {
                Ok(Some(raw)) => {
                    error_count = 0;
                    let outcome = dispatcher.dispatch(raw);
                    match outcome.error() {
                        Some(error) => debug!(%error, "Frame not actioned"),
                        None => debug!(?outcome, "Dispatch cycle finished"),
                    }
                    counters_tx.send_replace(dispatcher.counters());
                }
                Ok(None) => {
                    info!("Bus closed");
                    break SessionEnd::BusClosed;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Bus error ({}/{}): {}", error_count, config.max_bus_errors, e);

                    if error_count >= config.max_bus_errors {
                        error!("Too many bus errors, ending session");
                        break SessionEnd::BusFailed { errors: error_count, reason: e.to_string() };
                    }

                    let backoff = backoff_delay(config.error_backoff_ms, error_count);
                    tokio::select! {
                        _ = cancel.cancelled() => break SessionEnd::Cancelled,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        };

        if let Err(e) = bus.stop().await {
            warn!("Bus stop failed: {}", e);
        }

        let counters = dispatcher.counters();
        info!(
            received = counters.received,
            actioned = counters.actioned,
            "Session ended: {:?}",
            end
        );
        SessionReport { counters, end }
    }
}

/// Exponential backoff: base, 2x base, 4x base, ... capped at 32x base.
fn backoff_delay(base_ms: u64, error_count: u32) -> Duration {
    let shift = error_count.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_millis(base_ms.saturating_mul(1 << shift))
}

/// Handle to a running session.
///
/// Dropping the handle cancels the session.
pub struct SessionHandle {
    counters: watch::Receiver<SessionCounters>,
    cancel: CancellationToken,
    task: Option<JoinHandle<SessionReport>>,
    writer: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Tie a sink writer task to this session.
    ///
    /// [`join`](Self::join) waits for the writer to drain once the session has
    /// released its sinks.
    pub fn attach_writer(mut self, writer: JoinHandle<()>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Ask the session to stop. The current dispatch cycle always completes.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the session task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Latest published counters.
    pub fn counters(&self) -> SessionCounters {
        *self.counters.borrow()
    }

    /// Counter snapshots as a stream.
    ///
    /// Yields the current snapshot immediately, then each change. Intermediate
    /// snapshots are skipped when the reader falls behind. Ends with the session.
    pub fn counter_updates(&self) -> impl Stream<Item = SessionCounters> + 'static {
        WatchStream::new(self.counters.clone())
    }

    /// Wait for the session to end.
    pub async fn join(mut self) -> Result<SessionReport> {
        let task = self.task.take().ok_or_else(|| BridgeError::bus_failed("session already joined"))?;
        let report =
            task.await.map_err(|e| BridgeError::bus_failed_with_source("session task failed", Box::new(e)))?;

        if let Some(writer) = self.writer.take() {
            writer
                .await
                .map_err(|e| BridgeError::sink_failed("command writer failed", Some(Box::new(e))))?;
        }
        Ok(report)
    }

    /// Stop the session and wait at most `timeout` for it to end.
    pub async fn shutdown(self, timeout: Duration) -> Result<SessionReport> {
        self.stop();
        tokio::time::timeout(timeout, self.join())
            .await
            .map_err(|_| BridgeError::Timeout { duration: timeout })?
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("counters", &*self.counters.borrow())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ChannelBus, ReplayBus};
    use crate::dispatcher::standard_dispatcher;
    use crate::encoder::{FrameBuilder, encode_command};
    use crate::test_utils::{RecordingCommandSink, RecordingErrorSink};
    use futures::StreamExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn dispatcher() -> (Dispatcher, RecordingCommandSink) {
        let commands = RecordingCommandSink::default();
        let dispatcher =
            standard_dispatcher(Box::new(commands.clone()), Box::new(RecordingErrorSink::default()))
                .unwrap();
        (dispatcher, commands)
    }

    fn command(text: &str) -> Vec<u8> {
        encode_command(text).unwrap().as_bytes().to_vec()
    }

    /// Bus failing a fixed number of times before closing.
    struct FlakyBus {
        failures: u32,
        stops: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl BusAdapter for FlakyBus {
        async fn configure(&mut self) -> Result<()> {
            Ok(())
        }

        async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
            if self.failures == 0 {
                return Ok(None);
            }
            self.failures -= 1;
            Err(BridgeError::bus_failed("arbitration lost"))
        }

        async fn stop(&mut self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct BrokenBus {
        stops: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl BusAdapter for BrokenBus {
        async fn configure(&mut self) -> Result<()> {
            Err(BridgeError::bus_failed("peripheral missing"))
        }

        async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn stop(&mut self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn frames_are_dispatched_in_arrival_order() {
        let _ = tracing_subscriber::fmt::try_init();
        let (dispatcher, commands) = dispatcher();
        let (bus, sender) = ChannelBus::new(8);
        let handle = Session::spawn(bus, dispatcher, SessionConfig::default());

        for text in ["G28", "G1 X10", "M84"] {
            sender.send(command(text)).await.unwrap();
        }
        drop(sender);

        let report = handle.join().await.unwrap();
        assert_eq!(report.end, SessionEnd::BusClosed);
        assert_eq!(report.counters.received, 3);
        assert_eq!(report.counters.actioned, 1);
        assert_eq!(commands.commands(), vec!["G28", "G1 X10", "M84"]);
    }

    #[tokio::test]
    async fn stop_ends_session_and_stops_bus() {
        let (dispatcher, _) = dispatcher();
        let (bus, sender) = ChannelBus::new(8);
        let handle = Session::spawn(bus, dispatcher, SessionConfig::default());

        sender.send(command("G28")).await.unwrap();
        let mut updates = handle.counter_updates();
        while let Some(counters) = updates.next().await {
            if counters.received == 1 {
                break;
            }
        }

        handle.stop();
        let report = handle.join().await.unwrap();
        assert_eq!(report.end, SessionEnd::Cancelled);
        assert_eq!(report.counters.actioned, 1);
        assert!(sender.is_configured());
        assert!(sender.is_stopped());
    }

    #[tokio::test]
    async fn dropping_handle_cancels_session() {
        let (dispatcher, _) = dispatcher();
        let (bus, sender) = ChannelBus::new(1);
        drop(Session::spawn(bus, dispatcher, SessionConfig::default()));

        tokio::time::timeout(Duration::from_secs(1), async {
            while !sender.is_stopped() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn anomalous_frames_do_not_end_session() {
        let (dispatcher, commands) = dispatcher();
        let frames = vec![
            vec![0x01; 100],
            FrameBuilder::new(7).into_bytes(),
            FrameBuilder::new(1).valid(false).payload(b"G28").into_bytes(),
            command("G28"),
        ];
        let handle = Session::spawn(ReplayBus::from_frames(frames), dispatcher, SessionConfig::default());

        let report = handle.join().await.unwrap();
        assert_eq!(report.counters.received, 4);
        assert_eq!(report.counters.length_mismatches, 1);
        assert_eq!(report.counters.unknown_types, 1);
        assert_eq!(report.counters.rejected, 1);
        assert_eq!(report.counters.actioned, 1);
        assert_eq!(commands.commands(), vec!["G28"]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_bus_errors_are_retried() {
        let (dispatcher, _) = dispatcher();
        let stops = Arc::new(AtomicU32::new(0));
        let bus = FlakyBus { failures: 3, stops: Arc::clone(&stops) };

        let report = Session::spawn(bus, dispatcher, SessionConfig::default()).join().await.unwrap();
        assert_eq!(report.end, SessionEnd::BusClosed);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_bus_errors_end_session() {
        let (dispatcher, _) = dispatcher();
        let stops = Arc::new(AtomicU32::new(0));
        let bus = FlakyBus { failures: u32::MAX, stops: Arc::clone(&stops) };
        let config = SessionConfig { max_bus_errors: 3, ..SessionConfig::default() };

        let report = Session::spawn(bus, dispatcher, config).join().await.unwrap();
        assert!(matches!(report.end, SessionEnd::BusFailed { errors: 3, .. }));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn configure_failure_ends_session_without_reading() {
        let (dispatcher, _) = dispatcher();
        let bus = BrokenBus::default();
        let stops = Arc::clone(&bus.stops);

        let report = Session::spawn(bus, dispatcher, SessionConfig::default()).join().await.unwrap();
        assert!(matches!(report.end, SessionEnd::ConfigureFailed { .. }));
        assert_eq!(report.counters, SessionCounters::default());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unusable_replay_rate_fails_configure_instead_of_panicking() {
        let (dispatcher, commands) = dispatcher();
        let bus = ReplayBus::from_frames(vec![command("G28")]).with_rate(Some(1e-300));

        let report = Session::spawn(bus, dispatcher, SessionConfig::default()).join().await.unwrap();
        assert!(matches!(report.end, SessionEnd::ConfigureFailed { .. }));
        assert!(commands.commands().is_empty());
    }

    #[tokio::test]
    async fn join_waits_for_attached_writer() {
        let (dispatcher, _) = dispatcher();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let writer = tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = done_tx.send(());
        });

        let handle = Session::spawn(ReplayBus::from_frames(vec![]), dispatcher, SessionConfig::default())
            .attach_writer(writer);
        handle.join().await.unwrap();
        assert!(done_rx.await.is_ok());
    }

    #[tokio::test]
    async fn failed_writer_surfaces_from_join() {
        let (dispatcher, _) = dispatcher();
        let writer = tokio::spawn(std::future::pending::<()>());
        writer.abort();

        let handle = Session::spawn(ReplayBus::from_frames(vec![]), dispatcher, SessionConfig::default())
            .attach_writer(writer);
        assert!(matches!(handle.join().await, Err(BridgeError::Sink { .. })));
    }

    #[tokio::test]
    async fn counters_reset_for_each_session() {
        let (mut dispatcher, _) = dispatcher();
        dispatcher.dispatch(command("G28"));
        assert_eq!(dispatcher.counters().received, 1);

        let handle = Session::spawn(ReplayBus::from_frames(vec![]), dispatcher, SessionConfig::default());
        assert_eq!(handle.counters(), SessionCounters::default());
        assert_eq!(handle.join().await.unwrap().counters.received, 0);
    }

    #[tokio::test]
    async fn shutdown_returns_final_counters() {
        let (dispatcher, _) = dispatcher();
        let (bus, _sender) = ChannelBus::new(1);
        let handle = Session::spawn(bus, dispatcher, SessionConfig::default());

        let report = handle.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(report.end, SessionEnd::Cancelled);
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        assert_eq!(backoff_delay(50, 1), Duration::from_millis(50));
        assert_eq!(backoff_delay(50, 2), Duration::from_millis(100));
        assert_eq!(backoff_delay(50, 3), Duration::from_millis(200));
        assert_eq!(backoff_delay(50, 40), Duration::from_millis(1600));
    }
}
