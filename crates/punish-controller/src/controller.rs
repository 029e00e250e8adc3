//! The punishment controller.
//!
//! Uses a command-channel architecture: [`ControllerHandle`] and the
//! inspector's [`HealthSink`] push [`Command`]s over one bounded mpsc
//! channel to a single background task that owns all controller state.
//! Each command runs to completion before the next is taken, and the decay
//! deadline is awaited in the same `select!` loop, so an event's whole
//! decision (intensity update plus timer cancel/arm) never interleaves with
//! another event or with a decay.

use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use punish_core::constants::{CONTROLLER_QUEUE_CAPACITY, REPORT_CHANNEL_CAPACITY};
use punish_core::error::ControllerError;
use punish_core::intensity::{direct_intensity, escalate, Escalation};
use punish_core::settings::{PunishSettings, SettingsHandle};
use punish_core::traits::{DeviceDriver, MemoryInspector};
use punish_core::types::{HealthEvent, HealthSink, InspectionTarget, PunishmentReport};

use crate::decay::{self, DecayTimer};
use crate::device::DeviceLink;

/// Requests handled by the controller task.
#[derive(Debug)]
enum Command {
    /// Attach the inspector and begin punishing.
    Start {
        target: InspectionTarget,
        reply: oneshot::Sender<Result<(), ControllerError>>,
    },
    /// Detach and return to baseline.
    Stop { reply: oneshot::Sender<()> },
    /// A health change reported by the inspector.
    Health(HealthEvent),
    /// Read the current state.
    Status { reply: oneshot::Sender<ControllerStatus> },
    /// Stop, then end the controller task.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub monitoring: bool,
    pub current_intensity: u32,
    pub decay_pending: bool,
}

/// Build a sink that forwards health events into the controller queue.
///
/// Holds only a weak sender so a running inspector does not keep the
/// controller alive. Never blocks: a full queue drops the event.
fn health_sink(tx: mpsc::WeakSender<Command>) -> HealthSink {
    HealthSink::new(move |event| {
        let Some(tx) = tx.upgrade() else {
            trace!(?event, "controller gone; health event dropped");
            return;
        };
        match tx.try_send(Command::Health(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(player = %event.player, "controller queue full; health event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                trace!(?event, "controller closed; health event dropped");
            }
        }
    })
}

/// Cloneable handle to a running [`PunishmentController`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Command>,
    reports: broadcast::Sender<PunishmentReport>,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Start monitoring `target`. Fails if the inspector cannot attach.
    pub async fn start(&self, target: InspectionTarget) -> Result<(), ControllerError> {
        self.request(|reply| Command::Start { target, reply }).await?
    }

    /// Stop monitoring and restore the baseline intensity. Idempotent.
    pub async fn stop(&self) -> Result<(), ControllerError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn status(&self) -> Result<ControllerStatus, ControllerError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Stop monitoring and end the controller task. Resolves once every
    /// queued device command, including the final baseline, is delivered.
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Receive a [`PunishmentReport`] for every qualifying hit.
    pub fn subscribe(&self) -> broadcast::Receiver<PunishmentReport> {
        self.reports.subscribe()
    }

    /// A sink feeding this controller, for event sources other than the
    /// inspector it was spawned with.
    pub fn health_sink(&self) -> HealthSink {
        health_sink(self.tx.downgrade())
    }
}

/// Controller state. Lives only inside the task spawned by [`spawn`](Self::spawn).
pub struct PunishmentController {
    settings: SettingsHandle,
    inspector: Arc<dyn MemoryInspector>,
    device: DeviceLink,
    reports: broadcast::Sender<PunishmentReport>,
    sink: HealthSink,
    monitoring: bool,
    current_intensity: u32,
    decay: DecayTimer,
}

impl PunishmentController {
    /// Spawn the controller task on the current tokio runtime.
    ///
    /// The controller starts idle; call [`ControllerHandle::start`] to begin.
    /// The task ends on [`ControllerHandle::shutdown`] or once every handle
    /// is dropped.
    pub fn spawn(
        settings: SettingsHandle,
        inspector: Arc<dyn MemoryInspector>,
        device: Arc<dyn DeviceDriver>,
    ) -> ControllerHandle {
        let (tx, rx) = mpsc::channel(CONTROLLER_QUEUE_CAPACITY);
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);

        let controller = Self {
            settings,
            inspector,
            device: DeviceLink::spawn(device),
            reports: reports.clone(),
            sink: health_sink(tx.downgrade()),
            monitoring: false,
            current_intensity: 0,
            decay: DecayTimer::new(),
        };
        tokio::spawn(controller.run(rx));

        ControllerHandle { tx, reports }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        debug!("punishment controller running");
        let shutdown = loop {
            let deadline = self.decay.deadline();
            tokio::select! {
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else {
                        break None;
                    };
                    if let ControlFlow::Break(reply) = self.handle(cmd) {
                        break Some(reply);
                    }
                }
                () = decay::wait_for(deadline) => self.on_decay_elapsed(),
            }
        };

        self.stop();
        self.device.close().await;
        debug!("punishment controller exited");
        if let Some(reply) = shutdown {
            let _ = reply.send(());
        }
    }

    /// Apply one command. Breaks with the reply channel on shutdown.
    fn handle(&mut self, cmd: Command) -> ControlFlow<oneshot::Sender<()>> {
        self.enforce_cap();
        match cmd {
            Command::Start { target, reply } => {
                let _ = reply.send(self.start(&target));
            }
            Command::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            Command::Health(event) => self.on_health_changed(event),
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown { reply } => return ControlFlow::Break(reply),
        }
        ControlFlow::Continue(())
    }

    /// Pull the running intensity down to a cap lowered since the last
    /// decision, and command the device to match.
    fn enforce_cap(&mut self) {
        if !self.monitoring {
            return;
        }
        let cap = self.settings.snapshot().intensity_cap;
        if self.current_intensity > cap {
            info!(from = self.current_intensity, cap, "intensity cap lowered; clamping");
            self.current_intensity = cap;
            self.device.send(cap);
        }
    }

    fn status(&self) -> ControllerStatus {
        ControllerStatus {
            monitoring: self.monitoring,
            current_intensity: self.current_intensity,
            decay_pending: self.decay.is_armed(),
        }
    }

    fn start(&mut self, target: &InspectionTarget) -> Result<(), ControllerError> {
        if self.monitoring {
            debug!("start requested while already monitoring");
            return Ok(());
        }

        if let Err(e) = self.inspector.start(target, self.sink.clone()) {
            warn!(process = %target.process_name, error = %e, "failed to start inspector");
            return Err(e.into());
        }

        self.monitoring = true;
        self.current_intensity = 0;
        self.decay.cancel();

        let baseline = self.settings.snapshot().baseline_intensity;
        self.device.send(baseline);
        info!(process = %target.process_name, baseline, "monitoring started");
        Ok(())
    }

    fn stop(&mut self) {
        self.decay.cancel();
        self.current_intensity = 0;

        if !self.monitoring {
            debug!("stop requested while idle");
            return;
        }
        self.monitoring = false;
        self.inspector.stop();

        let baseline = self.settings.snapshot().baseline_intensity;
        self.device.send(baseline);
        info!(baseline, "monitoring stopped; intensity restored to baseline");
    }

    /// Whether `event` concerns a fighter this session punishes.
    fn is_relevant(&self, event: &HealthEvent, settings: &PunishSettings) -> bool {
        let seats = self.inspector.seat_positions();
        if settings.punish_all_players {
            return true;
        }
        match seats {
            Ok(seats) => seats.owns(event.player, settings.is_local_match),
            Err(e) => {
                warn!(player = %event.player, error = %e, "seat unknown; event ignored");
                false
            }
        }
    }

    fn on_health_changed(&mut self, event: HealthEvent) {
        if !self.monitoring {
            trace!(?event, "not monitoring; event ignored");
            return;
        }

        let settings = self.settings.snapshot();
        if !self.is_relevant(&event, &settings) {
            trace!(player = %event.player, "opponent damage ignored");
            return;
        }

        let damage = event.damage();
        if !event.exceeds_chip_threshold() {
            trace!(player = %event.player, damage, "below chip threshold");
            return;
        }

        self.decay.cancel();

        let candidate = direct_intensity(
            damage,
            settings.intensity_multiplier,
            settings.intensity_cap,
        );
        let Escalation { intensity, rule } = escalate(
            self.current_intensity,
            candidate,
            settings.combo_increment,
            settings.intensity_cap,
        );
        self.current_intensity = intensity;

        self.device.send(intensity);
        self.decay.arm(settings.decay_duration());

        info!(player = %event.player, damage, intensity, %rule, "punishing");
        let _ = self.reports.send(PunishmentReport {
            player: event.player,
            damage,
            intensity,
            rule,
            at: Utc::now(),
        });
    }

    fn on_decay_elapsed(&mut self) {
        if !self.decay.fire() {
            return;
        }
        self.current_intensity = 0;
        let baseline = self.settings.snapshot().baseline_intensity;
        self.device.send(baseline);
        info!(baseline, "punishment window elapsed; back to baseline");
    }
}
