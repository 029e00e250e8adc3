//! Controller interactions checked against mockall collaborators.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use punish_controller::PunishmentController;
use punish_core::error::{ControllerError, DeviceError, InspectorError};
use punish_core::settings::SettingsHandle;
use punish_core::traits::{MockDeviceDriver, MockMemoryInspector};
use punish_core::types::{HealthEvent, HealthSink, InspectionTarget, PlayerId, SeatPositions};
use punish_tests::helpers::scenario_settings;

/// Device mock that reports every command on a channel and answers with `result`.
fn channel_device(result: Result<(), DeviceError>) -> (MockDeviceDriver, mpsc::UnboundedReceiver<u32>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut device = MockDeviceDriver::new();
    device.expect_set_intensity().returning(move |value| {
        let _ = tx.send(value);
        result.clone()
    });
    (device, rx)
}

/// Inspector mock that hands its sink to the test and sits in seat 1.
fn capturing_inspector() -> (MockMemoryInspector, Arc<Mutex<Option<HealthSink>>>) {
    let captured = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&captured);
    let mut inspector = MockMemoryInspector::new();
    inspector
        .expect_start()
        .times(1)
        .returning(move |_, sink| {
            *slot.lock() = Some(sink);
            Ok(())
        });
    inspector
        .expect_seat_positions()
        .returning(|| Ok(SeatPositions { networked: 1, local: 1 }));
    inspector.expect_stop().times(1).return_const(());
    (inspector, captured)
}

fn publish(sink: &Mutex<Option<HealthSink>>, event: HealthEvent) {
    sink.lock().as_ref().expect("inspector started").publish(event);
}

#[tokio::test(start_paused = true)]
async fn refused_start_never_touches_device() {
    let mut inspector = MockMemoryInspector::new();
    inspector
        .expect_start()
        .withf(|target, _| target.process_name == "GGST-Win64-Shipping.exe")
        .times(1)
        .returning(|_, _| Err(InspectorError::Unavailable("process not found".into())));
    inspector.expect_stop().never();
    let mut device = MockDeviceDriver::new();
    device.expect_set_intensity().never();

    let handle = PunishmentController::spawn(
        SettingsHandle::new(scenario_settings()).unwrap(),
        Arc::new(inspector),
        Arc::new(device),
    );

    let err = handle.start(InspectionTarget::guilty_gear_strive()).await.unwrap_err();
    assert_eq!(
        err,
        ControllerError::Inspector(InspectorError::Unavailable("process not found".into()))
    );
    let status = handle.status().await.unwrap();
    assert!(!status.monitoring);
    assert_eq!(status.current_intensity, 0);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sink_handed_to_inspector_drives_punishment() {
    let (inspector, sink) = capturing_inspector();
    let (device, mut commands) = channel_device(Ok(()));
    let handle = PunishmentController::spawn(
        SettingsHandle::new(scenario_settings()).unwrap(),
        Arc::new(inspector),
        Arc::new(device),
    );

    handle.start(InspectionTarget::guilty_gear_strive()).await.unwrap();
    assert_eq!(commands.recv().await, Some(20));

    publish(&sink, HealthEvent::new(PlayerId::One, 360, 420));
    assert_eq!(commands.recv().await, Some(60));

    handle.stop().await.unwrap();
    assert_eq!(commands.recv().await, Some(20));
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failing_device_keeps_controller_state() {
    let (inspector, sink) = capturing_inspector();
    let (device, mut commands) = channel_device(Err(DeviceError::Rejected("out of range".into())));
    let handle = PunishmentController::spawn(
        SettingsHandle::new(scenario_settings()).unwrap(),
        Arc::new(inspector),
        Arc::new(device),
    );

    handle.start(InspectionTarget::guilty_gear_strive()).await.unwrap();
    assert_eq!(commands.recv().await, Some(20));

    publish(&sink, HealthEvent::new(PlayerId::One, 70, 100));
    assert_eq!(commands.recv().await, Some(30));
    publish(&sink, HealthEvent::new(PlayerId::One, 55, 70));
    assert_eq!(commands.recv().await, Some(35));

    let status = handle.status().await.unwrap();
    assert!(status.monitoring);
    assert_eq!(status.current_intensity, 35);
    assert!(status.decay_pending);

    handle.stop().await.unwrap();
    assert_eq!(commands.recv().await, Some(20));
    handle.shutdown().await.unwrap();
}
