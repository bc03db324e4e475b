//! The long-running scheduler loop.

use bundle_updater::test_utils::SchedulerFixture;
use std::time::Duration;

const CDN: &str = "https://cdn.example/app.asar.gz";

#[tokio::test]
async fn test_loop_keeps_checking_until_shutdown() {
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN]);
    fixture.serve_manifest("abc", &[CDN]);
    let mut scheduler = fixture
        .builder()
        .initial_delay(Duration::from_millis(1))
        .intervals(Duration::from_millis(5), Duration::from_millis(5))
        .build()
        .unwrap();

    let cycles = scheduler.run_until(tokio::time::sleep(Duration::from_millis(150))).await;

    assert!(cycles >= 2, "expected repeated cycles, got {cycles}");
    assert_eq!(fixture.transport.request_count(&fixture.manifest_url(0)) as u64, cycles);
    assert_eq!(fixture.transport.request_count(CDN), 0);
}

#[tokio::test]
async fn test_loop_survives_failing_cycles() {
    let fixture = SchedulerFixture::new();
    let mut scheduler = fixture
        .builder()
        .initial_delay(Duration::ZERO)
        .intervals(Duration::from_secs(3600), Duration::from_millis(1))
        .build()
        .unwrap();

    let cycles = scheduler.run_until(tokio::time::sleep(Duration::from_millis(400))).await;

    assert!(cycles >= 1);
    assert_eq!(fixture.transport.requests().len() as u64, cycles * 5);
}

#[tokio::test]
async fn test_loop_waits_for_initial_delay() {
    let fixture = SchedulerFixture::new();
    fixture.serve_manifest("abc", &[CDN]);
    let mut scheduler =
        fixture.builder().initial_delay(Duration::from_secs(3600)).build().unwrap();

    let cycles = scheduler.run_until(tokio::time::sleep(Duration::from_millis(20))).await;

    assert_eq!(cycles, 0);
    assert!(fixture.transport.requests().is_empty());
}
