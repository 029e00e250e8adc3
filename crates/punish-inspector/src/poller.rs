//! Interval-driven [`MemoryInspector`].
//!
//! One tokio task per player samples health every
//! [`PollConfig::health_interval`]; a third task samples seat positions every
//! [`PollConfig::seat_interval`]. A health task compares each sample with
//! the previous one and publishes a [`HealthEvent`] when they differ.
//!
//! Reads fail routinely (menus, loading screens, the game restarting), so a
//! failed read is not fatal: the task forgets its previous sample, backs
//! off for [`PollConfig::retry_backoff`], and the first successful read
//! afterwards becomes the new reference without producing an event.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use punish_core::constants::{HEALTH_POLL_INTERVAL_MS, READ_RETRY_BACKOFF_MS, SEAT_POLL_INTERVAL_MS};
use punish_core::error::InspectorError;
use punish_core::traits::MemoryInspector;
use punish_core::types::{HealthEvent, HealthSink, InspectionTarget, PlayerId, SeatPositions};

/// Something that can read the watched values on demand.
pub trait HealthSource: Send + Sync + 'static {
    /// Prepare to read values described by `target`.
    fn attach(&self, target: &InspectionTarget) -> Result<(), InspectorError>;

    /// Release whatever `attach` acquired.
    fn detach(&self) {}

    fn read_health(&self, player: PlayerId) -> Result<i32, InspectorError>;

    fn read_seats(&self) -> Result<SeatPositions, InspectorError>;
}

/// Sampling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub health_interval: Duration,
    pub seat_interval: Duration,
    pub retry_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            health_interval: Duration::from_millis(HEALTH_POLL_INTERVAL_MS),
            seat_interval: Duration::from_millis(SEAT_POLL_INTERVAL_MS),
            retry_backoff: Duration::from_millis(READ_RETRY_BACKOFF_MS),
        }
    }
}

/// Latest samples, shared between the polling tasks and query callers.
#[derive(Debug, Default)]
struct Samples {
    health: [AtomicI32; 2],
    seats: Mutex<Option<SeatPositions>>,
}

impl Samples {
    fn slot(&self, player: PlayerId) -> &AtomicI32 {
        match player {
            PlayerId::One => &self.health[0],
            PlayerId::Two => &self.health[1],
        }
    }

    fn reset(&self) {
        for slot in &self.health {
            slot.store(0, Ordering::Relaxed);
        }
        *self.seats.lock() = None;
    }
}

/// [`MemoryInspector`] that polls a [`HealthSource`].
///
/// Must be started from inside a tokio runtime.
pub struct PollingInspector<S: HealthSource> {
    source: Arc<S>,
    config: PollConfig,
    samples: Arc<Samples>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: HealthSource> PollingInspector<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, PollConfig::default())
    }

    pub fn with_config(source: S, config: PollConfig) -> Self {
        Self {
            source: Arc::new(source),
            config,
            samples: Arc::new(Samples::default()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether polling tasks are currently running.
    pub fn is_running(&self) -> bool {
        !self.tasks.lock().is_empty()
    }
}

impl<S: HealthSource> std::fmt::Debug for PollingInspector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingInspector")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn poll_health<S: HealthSource>(
    source: Arc<S>,
    samples: Arc<Samples>,
    player: PlayerId,
    sink: HealthSink,
    config: PollConfig,
) {
    let mut last: Option<i32> = None;
    loop {
        match source.read_health(player) {
            Ok(health) => {
                match last {
                    Some(previous) if previous != health => {
                        sink.publish(HealthEvent::new(player, health, previous));
                    }
                    None => debug!(%player, health, "health reference sampled"),
                    _ => {}
                }
                last = Some(health);
                samples.slot(player).store(health, Ordering::Relaxed);
                sleep(config.health_interval).await;
            }
            Err(e) => {
                if last.take().is_some() {
                    debug!(%player, error = %e, "lost track of health; retrying");
                }
                samples.slot(player).store(0, Ordering::Relaxed);
                sleep(config.retry_backoff).await;
            }
        }
    }
}

async fn poll_seats<S: HealthSource>(source: Arc<S>, samples: Arc<Samples>, config: PollConfig) {
    loop {
        match source.read_seats() {
            Ok(seats) => {
                *samples.seats.lock() = Some(seats);
                sleep(config.seat_interval).await;
            }
            Err(e) => {
                debug!(error = %e, "seat read failed; keeping last known seats");
                sleep(config.retry_backoff).await;
            }
        }
    }
}

impl<S: HealthSource> MemoryInspector for PollingInspector<S> {
    fn start(&self, target: &InspectionTarget, sink: HealthSink) -> Result<(), InspectorError> {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            debug!("inspector already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| InspectorError::Unavailable(format!("no async runtime: {e}")))?;

        self.source.attach(target).map_err(|e| match e {
            InspectorError::Unavailable(_) => e,
            other => InspectorError::Unavailable(other.to_string()),
        })?;
        self.samples.reset();

        for player in PlayerId::ALL {
            tasks.push(runtime.spawn(poll_health(
                Arc::clone(&self.source),
                Arc::clone(&self.samples),
                player,
                sink.clone(),
                self.config,
            )));
        }
        tasks.push(runtime.spawn(poll_seats(
            Arc::clone(&self.source),
            Arc::clone(&self.samples),
            self.config,
        )));

        info!(process = %target.process_name, "inspector attached");
        Ok(())
    }

    fn stop(&self) {
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        self.source.detach();
        self.samples.reset();
        info!("inspector detached");
    }

    fn seat_positions(&self) -> Result<SeatPositions, InspectorError> {
        self.samples.seats.lock().ok_or(InspectorError::SeatsUnknown)
    }

    fn player_health(&self, player: PlayerId) -> i32 {
        self.samples.slot(player).load(Ordering::Relaxed)
    }
}

impl<S: HealthSource> Drop for PollingInspector<S> {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    /// Source whose values the test sets directly. `None` means the read fails.
    #[derive(Default)]
    struct FakeSource {
        health: Mutex<[Option<i32>; 2]>,
        seats: Mutex<Option<SeatPositions>>,
        refuse_attach: bool,
        detached: Mutex<bool>,
    }

    impl FakeSource {
        fn set(&self, player: PlayerId, value: Option<i32>) {
            self.health.lock()[player.number() as usize - 1] = value;
        }
    }

    impl HealthSource for FakeSource {
        fn attach(&self, _: &InspectionTarget) -> Result<(), InspectorError> {
            if self.refuse_attach {
                Err(InspectorError::Read("process not found".into()))
            } else {
                Ok(())
            }
        }
        fn detach(&self) {
            *self.detached.lock() = true;
        }
        fn read_health(&self, player: PlayerId) -> Result<i32, InspectorError> {
            self.health.lock()[player.number() as usize - 1]
                .ok_or_else(|| InspectorError::Read("null pointer in chain".into()))
        }
        fn read_seats(&self) -> Result<SeatPositions, InspectorError> {
            self.seats.lock().ok_or(InspectorError::Read("seat unreadable".into()))
        }
    }

    fn channel_sink() -> (HealthSink, mpsc::UnboundedReceiver<HealthEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (HealthSink::new(move |ev| { let _ = tx.send(ev); }), rx)
    }

    fn inspector(source: FakeSource) -> PollingInspector<FakeSource> {
        PollingInspector::new(source)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_changes_only() {
        let source = FakeSource::default();
        source.set(PlayerId::One, Some(420));
        source.set(PlayerId::Two, Some(420));
        let insp = inspector(source);
        let (sink, mut rx) = channel_sink();
        insp.start(&InspectionTarget::default(), sink).unwrap();

        sleep(Duration::from_millis(250)).await;
        assert!(rx.try_recv().is_err(), "unchanged health must not publish");

        insp.source().set(PlayerId::Two, Some(380));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().unwrap(), HealthEvent::new(PlayerId::Two, 380, 420));
        assert!(rx.try_recv().is_err());
        assert_eq!(insp.player_health(PlayerId::Two), 380);
        assert_eq!(insp.player_health(PlayerId::One), 420);
        insp.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_resets_reference() {
        let source = FakeSource::default();
        source.set(PlayerId::One, Some(420));
        let insp = inspector(source);
        let (sink, mut rx) = channel_sink();
        insp.start(&InspectionTarget::default(), sink).unwrap();
        sleep(Duration::from_millis(50)).await;

        insp.source().set(PlayerId::One, None);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(insp.player_health(PlayerId::One), 0);

        // New match: health comes back at a different value without an event.
        insp.source().set(PlayerId::One, Some(300));
        sleep(Duration::from_millis(1_200)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(insp.player_health(PlayerId::One), 300);
        insp.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn seats_unknown_until_first_read() {
        let source = FakeSource::default();
        let insp = inspector(source);
        let (sink, _rx) = channel_sink();
        insp.start(&InspectionTarget::default(), sink).unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(insp.seat_positions(), Err(InspectorError::SeatsUnknown));

        *insp.source().seats.lock() = Some(SeatPositions { networked: 2, local: 1 });
        sleep(Duration::from_millis(1_100)).await;
        assert_eq!(insp.seat_positions(), Ok(SeatPositions { networked: 2, local: 1 }));

        // A later failure keeps the last known value.
        *insp.source().seats.lock() = None;
        sleep(Duration::from_millis(600)).await;
        assert_eq!(insp.seat_positions(), Ok(SeatPositions { networked: 2, local: 1 }));
        insp.stop();
    }

    #[tokio::test]
    async fn attach_failure_is_unavailable() {
        let insp = inspector(FakeSource { refuse_attach: true, ..Default::default() });
        let (sink, _rx) = channel_sink();
        let err = insp.start(&InspectionTarget::default(), sink).unwrap_err();
        assert!(matches!(err, InspectorError::Unavailable(_)));
        assert!(!insp.is_running());
    }

    #[test]
    fn start_outside_runtime_is_unavailable() {
        let insp = inspector(FakeSource::default());
        let (sink, _rx) = channel_sink();
        let err = insp.start(&InspectionTarget::default(), sink).unwrap_err();
        assert!(matches!(err, InspectorError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_detaches_and_is_idempotent() {
        let source = FakeSource::default();
        source.set(PlayerId::One, Some(100));
        let insp = inspector(source);
        let (sink, mut rx) = channel_sink();
        insp.start(&InspectionTarget::default(), sink.clone()).unwrap();
        insp.start(&InspectionTarget::default(), sink).unwrap();
        assert!(insp.is_running());

        insp.stop();
        insp.stop();
        assert!(!insp.is_running());
        assert!(*insp.source().detached.lock());

        insp.source().set(PlayerId::One, Some(10));
        sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
    }
}
