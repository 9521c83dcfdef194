//! Transmission scheduler tests against the fake transport.

mod common;

use common::FakeTransport;
use helmlink::clock::SystemClock;
use helmlink::link::manager::LinkManager;
use helmlink::link::types::{AdvertisedDevice, AlwaysReady, LinkConfig};
use helmlink::sensors::SensorHub;
use helmlink::telemetry::codec::TelemetryFrame;
use helmlink::telemetry::scheduler::TelemetryScheduler;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    transport: FakeTransport,
    hub: Arc<SensorHub>,
    link: Arc<LinkManager<FakeTransport>>,
    scheduler: Arc<TelemetryScheduler<FakeTransport>>,
}

fn harness(interval: Duration) -> Harness {
    let transport = FakeTransport::new();
    let clock = Arc::new(SystemClock);
    let hub = Arc::new(SensorHub::new(clock.clone()));
    let link = Arc::new(LinkManager::new(
        transport.clone(),
        Arc::new(AlwaysReady),
        clock,
        LinkConfig::default(),
    ));
    let scheduler = Arc::new(TelemetryScheduler::new(link.clone(), hub.clone(), interval));
    Harness {
        transport,
        hub,
        link,
        scheduler,
    }
}

async fn connect(h: &Harness) {
    h.transport.advertise("aa:bb:cc", Some("ESP32_Helmet"));
    h.transport.with_helmet_characteristic();
    h.link
        .connect(&AdvertisedDevice {
            device_id: "aa:bb:cc".to_string(),
            name: Some("ESP32_Helmet".to_string()),
            signal_strength: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_firings_while_disconnected_send_nothing() {
    let h = harness(Duration::from_millis(500));

    for _ in 0..10 {
        h.scheduler.fire();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.transport.written().is_empty());
    let stats = h.scheduler.stats();
    assert_eq!(stats.fires, 10);
    assert_eq!(stats.skipped_idle, 10);
    assert_eq!(h.link.diagnostics().frames_sent, 0);
}

#[tokio::test]
async fn test_firing_sends_encoded_snapshot() {
    let h = harness(Duration::from_millis(500));
    connect(&h).await;

    h.hub.update_speed(72.5);
    h.hub.update_roll(-14.0);
    h.hub.update_battery(63.0);

    h.scheduler.fire();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let written = h.transport.written();
    assert_eq!(written.len(), 1);

    let frame = TelemetryFrame::decode(written[0].as_slice().try_into().unwrap());
    assert_eq!(frame.speed_kmh, 72.5);
    assert_eq!(frame.lean_left_deg, 14.0);
    assert_eq!(frame.lean_right_deg, 0.0);
    assert_eq!(frame.battery_percent, 63.0);
}

#[tokio::test]
async fn test_firing_skips_while_send_in_flight() {
    let h = harness(Duration::from_millis(500));
    connect(&h).await;
    h.transport.set_write_delay(Duration::from_millis(200));

    h.scheduler.fire();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.scheduler.fire();

    tokio::time::sleep(Duration::from_millis(300)).await;

    // The second firing was skipped; exactly one frame went out.
    assert_eq!(h.transport.written().len(), 1);
    assert_eq!(h.scheduler.stats().skipped_busy, 1);
}

#[tokio::test]
async fn test_sends_resume_after_in_flight_completes() {
    let h = harness(Duration::from_millis(500));
    connect(&h).await;

    h.scheduler.fire();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.scheduler.fire();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.transport.written().len(), 2);
    assert_eq!(h.scheduler.stats().skipped_busy, 0);
}

#[tokio::test]
async fn test_started_loop_fires_periodically() {
    let h = harness(Duration::from_millis(10));
    connect(&h).await;

    h.scheduler.start();
    assert!(h.scheduler.is_running());
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.scheduler.stop();

    assert!(h.scheduler.stats().fires > 2);
    assert!(!h.transport.written().is_empty());
}

#[tokio::test]
async fn test_no_firing_after_stop_returns() {
    let h = harness(Duration::from_millis(10));
    connect(&h).await;

    h.scheduler.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.scheduler.stop();
    let fires_at_stop = h.scheduler.stats().fires;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.scheduler.stats().fires, fires_at_stop);
    assert!(!h.scheduler.is_running());
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let h = harness(Duration::from_millis(10));

    h.scheduler.start();
    h.scheduler.start();
    assert!(h.scheduler.is_running());
    h.scheduler.stop();
}

#[tokio::test]
async fn test_failed_send_does_not_stall_the_loop() {
    let h = harness(Duration::from_millis(500));
    connect(&h).await;
    h.transport.fail_writes(true);

    h.scheduler.fire();
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.transport.fail_writes(false);
    h.scheduler.fire();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.transport.written().len(), 1);
    assert_eq!(h.link.diagnostics().sends_failed, 1);
    assert_eq!(h.link.diagnostics().frames_sent, 1);
}
