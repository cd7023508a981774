// Sample poller - the timed fetch-parse-store-notify cycle
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Local;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::application::analyzer_gateway::{AnalyzerGateway, GatewayError};
use crate::domain::buffer::PlotBuffer;
use crate::domain::connection::ConnectionState;
use crate::domain::history::SampleHistory;
use crate::domain::reading::{Reading, parse_status_line};
use crate::infrastructure::csv_log::CsvLogWriter;

/// Notifications for the UI surface.
#[derive(Debug, Clone)]
pub enum PollerEvent {
    SampleReady(Reading),
    ConnectionLost { reason: String },
}

/// Owns the connection state machine and is the only writer to the plot
/// buffer, the sample history and the CSV log. Consumers read snapshots and
/// listen on the event channel.
pub struct SamplePoller {
    gateway: Arc<dyn AnalyzerGateway>,
    plot: Arc<RwLock<PlotBuffer>>,
    history: Arc<RwLock<SampleHistory>>,
    log_writer: Arc<Mutex<Option<CsvLogWriter>>>,
    acquiring: Arc<AtomicBool>,
    state: ConnectionState,
    poll_interval: Duration,
    events: mpsc::Sender<PollerEvent>,
}

impl SamplePoller {
    pub fn new(
        gateway: Arc<dyn AnalyzerGateway>,
        plot: Arc<RwLock<PlotBuffer>>,
        history: Arc<RwLock<SampleHistory>>,
        poll_interval: Duration,
        events: mpsc::Sender<PollerEvent>,
    ) -> Self {
        Self {
            gateway,
            plot,
            history,
            log_writer: Arc::new(Mutex::new(None)),
            acquiring: Arc::new(AtomicBool::new(true)),
            state: ConnectionState::Disconnected,
            poll_interval,
            events,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Enable or replace the CSV mirror. `None` disables persistence;
    /// polling itself is unaffected either way.
    pub fn set_log_writer(&self, writer: Option<CsvLogWriter>) {
        *self.log_writer.lock().expect("log writer lock poisoned") = writer;
    }

    /// Start/stop switch for the UI surface. Flipping it off halts sampling
    /// only; the session stays open and an in-flight fetch is discarded.
    pub fn acquisition_switch(&self) -> Arc<AtomicBool> {
        self.acquiring.clone()
    }

    /// Shared slot backing the CSV mirror, so the UI surface can change the
    /// save location while polling continues.
    pub fn log_writer_slot(&self) -> Arc<Mutex<Option<CsvLogWriter>>> {
        self.log_writer.clone()
    }

    /// Establish the session: Disconnected -> Connecting -> Connected, or
    /// back to Disconnected when setup fails.
    pub async fn connect(&mut self) -> Result<(), GatewayError> {
        self.state = ConnectionState::Connecting;
        match self.gateway.open().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!("analyzer session established");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Poll on the configured period until the session is lost or shutdown
    /// is signalled. Each cycle awaits its fetch before the next tick can
    /// fire, so at most one fetch is ever in flight.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.state == ConnectionState::Connected && !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.acquiring.load(Ordering::Relaxed) {
                        continue;
                    }
                    self.tick().await;
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    /// One fetch-parse-store-notify cycle.
    pub async fn tick(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }
        let timestamp = Local::now();

        let raw = match self.gateway.fetch_status_line().await {
            Ok(raw) => raw,
            Err(e) => {
                self.lose_connection(e).await;
                return;
            }
        };

        if !self.acquiring.load(Ordering::Relaxed) {
            debug!("acquisition stopped mid-fetch, discarding sample");
            return;
        }

        let reading = match parse_status_line(&raw) {
            Ok(values) => Reading::ok(timestamp, values),
            Err(e) => {
                warn!("unparseable sample ({e}), recording missing row");
                Reading::missing(timestamp)
            }
        };

        self.record(&reading);
        if self
            .events
            .send(PollerEvent::SampleReady(reading))
            .await
            .is_err()
        {
            debug!("event receiver dropped");
        }
    }

    /// Explicit shutdown: release the session unless a transport failure
    /// already did.
    pub async fn shutdown(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            self.gateway.release().await;
        }
        self.state = ConnectionState::Disconnected;
    }

    fn record(&self, reading: &Reading) {
        {
            let mut plot = self.plot.write().expect("plot buffer lock poisoned");
            plot.push(reading);
        }
        {
            let mut history = self.history.write().expect("history lock poisoned");
            history.push(reading.clone());
        }

        let writer = self.log_writer.lock().expect("log writer lock poisoned");
        if let Some(writer) = writer.as_ref() {
            if let Err(e) = writer.append(reading) {
                warn!(
                    "failed to append sample to {}: {e:#}",
                    writer.path().display()
                );
            }
        }
    }

    async fn lose_connection(&mut self, cause: GatewayError) {
        error!("session lost: {cause}");
        self.state = ConnectionState::Lost;
        self.gateway.release().await;
        let _ = self
            .events
            .send(PollerEvent::ConnectionLost {
                reason: cause.to_string(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    const STATUS_LINE: &str = "Ch1/R4: 0.02 Vol% Ch2/R4: 0.00 Vol% \
        Ch3/R4: 0.01 Vol% Ch4/R4: 0.11 Vol% Ch5/R4: 20.95 Vol%";

    /// Scripted gateway: pops one canned response per fetch.
    struct FakeGateway {
        responses: Mutex<VecDeque<Result<String, GatewayError>>>,
        released: AtomicBool,
    }

    impl FakeGateway {
        fn scripted(
            responses: impl IntoIterator<Item = Result<String, GatewayError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                released: AtomicBool::new(false),
            })
        }

        fn released(&self) -> bool {
            self.released.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalyzerGateway for FakeGateway {
        async fn open(&self) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn fetch_status_line(&self) -> Result<String, GatewayError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Transport("script exhausted".into())))
        }

        async fn release(&self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    struct Harness {
        poller: SamplePoller,
        gateway: Arc<FakeGateway>,
        plot: Arc<RwLock<PlotBuffer>>,
        history: Arc<RwLock<SampleHistory>>,
        events: mpsc::Receiver<PollerEvent>,
    }

    fn harness(responses: Vec<Result<String, GatewayError>>) -> Harness {
        let gateway = FakeGateway::scripted(responses);
        let plot = Arc::new(RwLock::new(PlotBuffer::new(100)));
        let history = Arc::new(RwLock::new(SampleHistory::new()));
        let (tx, rx) = mpsc::channel(16);
        let poller = SamplePoller::new(
            gateway.clone(),
            plot.clone(),
            history.clone(),
            Duration::from_secs(1),
            tx,
        );
        Harness {
            poller,
            gateway,
            plot,
            history,
            events: rx,
        }
    }

    #[tokio::test]
    async fn test_successful_tick_stores_and_notifies() {
        let mut h = harness(vec![Ok(STATUS_LINE.to_string())]);
        h.poller.connect().await.unwrap();
        h.poller.tick().await;

        assert_eq!(h.plot.read().unwrap().len(), 1);
        let history = h.history.read().unwrap();
        let latest = history.latest().unwrap();
        assert_eq!(latest.values.unwrap().o2, 20.95);

        match h.events.try_recv().unwrap() {
            PollerEvent::SampleReady(reading) => {
                assert_eq!(reading.values.unwrap().co2, 0.02);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_failure_records_missing_and_continues() {
        let garbled = STATUS_LINE.replace("Ch3/R4:", "");
        let mut h = harness(vec![Ok(STATUS_LINE.to_string()), Ok(garbled)]);
        h.poller.connect().await.unwrap();
        h.poller.tick().await;
        h.poller.tick().await;

        assert_eq!(h.poller.state(), ConnectionState::Connected);
        let history = h.history.read().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.rows()[0].values.is_some());
        assert!(history.rows()[1].values.is_none());

        // The plot buffer renders the failed sample as zeros.
        let snapshot = h.plot.read().unwrap().snapshot();
        assert_eq!(
            snapshot.channel(crate::domain::reading::GasChannel::O2),
            &[20.95, 0.0]
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_fatal() {
        let mut h = harness(vec![
            Ok(STATUS_LINE.to_string()),
            Err(GatewayError::Transport("session deleted".into())),
        ]);
        h.poller.connect().await.unwrap();
        h.poller.tick().await;
        h.poller.tick().await;

        assert_eq!(h.poller.state(), ConnectionState::Lost);
        assert!(h.gateway.released());

        // A further tick must not touch the buffers.
        h.poller.tick().await;
        assert_eq!(h.plot.read().unwrap().len(), 1);
        assert_eq!(h.history.read().unwrap().len(), 1);

        let mut saw_lost = false;
        while let Ok(event) = h.events.try_recv() {
            if matches!(event, PollerEvent::ConnectionLost { .. }) {
                saw_lost = true;
            }
        }
        assert!(saw_lost);
    }

    #[tokio::test]
    async fn test_timeout_is_fatal_like_transport() {
        let mut h = harness(vec![Err(GatewayError::Timeout(Duration::from_secs(10)))]);
        h.poller.connect().await.unwrap();
        h.poller.tick().await;

        assert_eq!(h.poller.state(), ConnectionState::Lost);
        assert!(h.gateway.released());
        assert!(h.plot.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stopping_acquisition_discards_in_flight_sample() {
        let mut h = harness(vec![Ok(STATUS_LINE.to_string())]);
        h.poller.connect().await.unwrap();
        h.poller
            .acquisition_switch()
            .store(false, Ordering::SeqCst);
        h.poller.tick().await;

        // Fetch resolved but the result was discarded; session stays open.
        assert!(h.plot.read().unwrap().is_empty());
        assert_eq!(h.poller.state(), ConnectionState::Connected);
        assert!(h.events.try_recv().is_err());
    }
}
