//! A recorded match played through the polling inspector and the controller.

use std::sync::Arc;
use std::time::Duration;

use punish_controller::PunishmentController;
use punish_core::settings::SettingsHandle;
use punish_core::types::{InspectionTarget, PlayerId, PunishRule};
use punish_inspector::{PollingInspector, ReplaySource};
use punish_tests::helpers::{scenario_settings, RecordingDevice};

const MATCH: &str = r#"
# 1P takes a 40 hit, then a 20 follow-up; 2P is hit after the window closes
{"at_ms": 0,    "p1": 420, "p2": 420}
{"at_ms": 1000, "p1": 380, "p2": 420}
{"at_ms": 1500, "p1": 360, "p2": 420}
{"at_ms": 1800, "p1": 355, "p2": 420}
{"at_ms": 5000, "p1": 355, "p2": 300}
"#;

#[tokio::test(start_paused = true)]
async fn replayed_match_produces_expected_commands() {
    let inspector = Arc::new(PollingInspector::new(ReplaySource::parse(MATCH).unwrap()));
    let (device, mut commands) = RecordingDevice::new();
    let handle = PunishmentController::spawn(
        SettingsHandle::new(scenario_settings()).unwrap(),
        inspector.clone(),
        Arc::new(device),
    );
    let mut reports = handle.subscribe();

    handle.start(InspectionTarget::default()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(inspector.source().finished());

    handle.stop().await.unwrap();
    handle.shutdown().await.unwrap();

    let mut seen = Vec::new();
    while let Some(v) = commands.recv().await {
        seen.push(v);
    }
    // start, direct 40, combo 45, decay, stop
    assert_eq!(seen, vec![20, 40, 45, 20, 20]);

    let first = reports.recv().await.unwrap();
    assert_eq!((first.player, first.damage, first.rule), (PlayerId::One, 40, PunishRule::Direct));
    let second = reports.recv().await.unwrap();
    assert_eq!((second.damage, second.intensity, second.rule), (20, 45, PunishRule::Combo));
    assert!(reports.try_recv().is_err(), "chip and opponent hits are not reported");
    assert!(!inspector.is_running());
}
