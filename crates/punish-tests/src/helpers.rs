//! Shared fakes and a controller harness for the integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use punish_controller::{ControllerHandle, ControllerStatus, PunishmentController};
use punish_core::error::{DeviceError, InspectorError};
use punish_core::settings::{PunishSettings, SettingsHandle};
use punish_core::traits::{DeviceDriver, MemoryInspector};
use punish_core::types::{HealthEvent, HealthSink, InspectionTarget, PlayerId, SeatPositions};

/// Inspector whose events and seats are driven by the test.
#[derive(Debug)]
pub struct ScriptedInspector {
    sink: Mutex<Option<HealthSink>>,
    seats: Mutex<Result<SeatPositions, InspectorError>>,
    refuse_start: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub seat_queries: AtomicUsize,
}

impl ScriptedInspector {
    /// Inspector reporting the local player in the given networked seat.
    pub fn seated(networked: i32) -> Self {
        Self::with_seats(SeatPositions { networked, local: networked })
    }

    pub fn with_seats(seats: SeatPositions) -> Self {
        Self {
            sink: Mutex::new(None),
            seats: Mutex::new(Ok(seats)),
            refuse_start: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            seat_queries: AtomicUsize::new(0),
        }
    }

    pub fn set_seats(&self, seats: Result<SeatPositions, InspectorError>) {
        *self.seats.lock() = seats;
    }

    pub fn refuse_start(&self, refuse: bool) {
        self.refuse_start.store(refuse, Ordering::SeqCst);
    }

    pub fn is_attached(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Report a health change for `player` from `old` to `new`.
    ///
    /// Dropped silently when the inspector is not attached, like a real
    /// inspector that is not polling.
    pub fn health_change(&self, player: PlayerId, old: i32, new: i32) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.publish(HealthEvent::new(player, new, old));
        }
    }
}

impl MemoryInspector for ScriptedInspector {
    fn start(&self, _target: &InspectionTarget, sink: HealthSink) -> Result<(), InspectorError> {
        if self.refuse_start.load(Ordering::SeqCst) {
            return Err(InspectorError::Unavailable("GGST-Win64-Shipping.exe not running".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sink.lock().take();
    }

    fn seat_positions(&self) -> Result<SeatPositions, InspectorError> {
        self.seat_queries.fetch_add(1, Ordering::SeqCst);
        self.seats.lock().clone()
    }

    fn player_health(&self, _player: PlayerId) -> i32 {
        0
    }
}

/// Device that forwards every command to a channel and can be told to fail.
#[derive(Debug)]
pub struct RecordingDevice {
    tx: mpsc::UnboundedSender<u32>,
    failing: AtomicBool,
}

impl RecordingDevice {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<u32>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                failing: AtomicBool::new(false),
            },
            rx,
        )
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceDriver for RecordingDevice {
    async fn set_intensity(&self, value: u32) -> Result<(), DeviceError> {
        let _ = self.tx.send(value);
        if self.failing.load(Ordering::SeqCst) {
            Err(DeviceError::Disconnected)
        } else {
            Ok(())
        }
    }
}

/// A spawned controller wired to a [`ScriptedInspector`] and a [`RecordingDevice`].
pub struct Harness {
    pub controller: ControllerHandle,
    pub inspector: Arc<ScriptedInspector>,
    pub device: Arc<RecordingDevice>,
    pub settings: SettingsHandle,
    commands: mpsc::UnboundedReceiver<u32>,
}

impl Harness {
    /// Spawn an idle controller. The local player sits in networked seat 1.
    pub fn new(settings: PunishSettings) -> Self {
        Self::with_inspector(settings, ScriptedInspector::seated(1))
    }

    pub fn with_inspector(settings: PunishSettings, inspector: ScriptedInspector) -> Self {
        let settings = SettingsHandle::new(settings).expect("test settings must be valid");
        let inspector = Arc::new(inspector);
        let (device, commands) = RecordingDevice::new();
        let device = Arc::new(device);
        let controller = PunishmentController::spawn(
            settings.clone(),
            Arc::clone(&inspector) as Arc<dyn MemoryInspector>,
            Arc::clone(&device) as Arc<dyn DeviceDriver>,
        );
        Self {
            controller,
            inspector,
            device,
            settings,
            commands,
        }
    }

    /// Spawn, start monitoring, and consume the baseline command.
    pub async fn started(settings: PunishSettings) -> Self {
        let baseline = settings.baseline_intensity;
        let mut harness = Self::new(settings);
        harness.start().await;
        assert_eq!(harness.next_command().await, baseline, "start must command baseline");
        harness
    }

    pub async fn start(&self) {
        self.controller
            .start(InspectionTarget::default())
            .await
            .expect("controller start");
    }

    pub async fn stop(&self) {
        self.controller.stop().await.expect("controller stop");
    }

    pub async fn status(&self) -> ControllerStatus {
        self.controller.status().await.expect("controller status")
    }

    pub fn hit(&self, player: PlayerId, old: i32, new: i32) {
        self.inspector.health_change(player, old, new);
    }

    /// Wait for the next device command.
    pub async fn next_command(&mut self) -> u32 {
        self.commands.recv().await.expect("device link closed")
    }

    /// Every device command issued so far that has not been consumed.
    ///
    /// Round-trips through the controller first so all queued events are
    /// decided, then lets the device link drain.
    pub async fn drain_commands(&mut self) -> Vec<u32> {
        self.status().await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        let mut out = Vec::new();
        while let Ok(v) = self.commands.try_recv() {
            out.push(v);
        }
        out
    }
}

/// Settings used by the reference scenarios: baseline 20, multiplier 1.0,
/// cap 200, combo increment 5, two second decay.
pub fn scenario_settings() -> PunishSettings {
    PunishSettings {
        intensity_multiplier: 1.0,
        intensity_cap: 200,
        baseline_intensity: 20,
        combo_increment: 5,
        decay_duration_secs: 2.0,
        punish_all_players: false,
        is_local_match: false,
    }
}
