//! Complete update cycles against fake mirrors.

use bundle_updater::restart::PromptOutcome;
use bundle_updater::scheduler::{CycleOutcome, CycleState};
use bundle_updater::test_utils::{SchedulerFixture, init_test_logging};
use std::time::Duration;

const CDN_A: &str = "https://cdn-a.example/app.asar.gz";
const CDN_B: &str = "https://cdn-b.example/app.asar.gz";

#[tokio::test]
async fn test_same_hash_only_fetches_manifest() {
    init_test_logging(None);
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN_A]);
    fixture.serve_manifest("abc", &[CDN_A]);

    let report = fixture.scheduler().run_cycle().await;

    assert!(report.outcome.is_success());
    assert!(report.manifest_fetched);
    assert!(!report.bundle_downloaded);
    assert_eq!(report.next_delay, Duration::from_secs(5 * 60));
    assert_eq!(fixture.transport.request_count(CDN_A), 0);
    assert_eq!(fixture.dialog.count(), 0);
}

#[tokio::test]
async fn test_new_release_is_staged_committed_and_prompted_once() {
    init_test_logging(None);
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN_A]);
    let served = fixture.serve_manifest("def", &[CDN_A, CDN_B]);
    fixture.serve_bundle(CDN_A, b"release def");

    let mut scheduler = fixture.scheduler();
    let report = scheduler.run_cycle().await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Updated {
            hash: "def".to_string()
        }
    );
    assert_eq!(report.next_delay, Duration::from_secs(5 * 60));
    assert_eq!(fixture.local_manifest_text().as_deref(), Some(served.as_str()));
    assert!(!fixture.paths.remote_manifest().exists());
    assert_eq!(std::fs::read(fixture.paths.staged_bundle()).unwrap(), b"release def");
    assert_eq!(report.prompted, Some(PromptOutcome::Deferred));
    assert_eq!(fixture.notifier.count(), 1);
    assert_eq!(fixture.dialog.count(), 1);
    assert_eq!(fixture.transport.request_count(CDN_B), 0);
}

#[tokio::test]
async fn test_second_cycle_without_remote_change_downloads_no_bundle() {
    let fixture = SchedulerFixture::new();
    fixture.serve_manifest("def", &[CDN_A]);
    fixture.serve_bundle(CDN_A, b"release def");
    let mut scheduler = fixture.scheduler();

    let first = scheduler.run_cycle().await;
    assert!(first.bundle_downloaded);
    fixture.transport.clear_requests();

    let second = scheduler.run_cycle().await;

    assert!(!second.bundle_downloaded);
    assert_eq!(fixture.transport.request_count(CDN_A), 0);
    assert_eq!(
        second.outcome,
        CycleOutcome::UpToDate {
            staged_pending: true
        }
    );
    assert_eq!(second.prompted, Some(PromptOutcome::Throttled));
}

#[tokio::test]
async fn test_bundle_falls_back_through_manifest_urls() {
    let fixture = SchedulerFixture::new();
    fixture.serve_manifest("def", &[CDN_A, CDN_B]);
    fixture.transport.fail(CDN_A, "HTTP status 503 Service Unavailable");
    fixture.serve_bundle(CDN_B, b"from b");

    let report = fixture.scheduler().run_cycle().await;

    assert!(report.outcome.is_success());
    assert_eq!(fixture.transport.request_count(CDN_A), 1);
    assert_eq!(fixture.transport.request_count(CDN_B), 1);
    assert_eq!(std::fs::read(fixture.paths.staged_bundle()).unwrap(), b"from b");
}

#[tokio::test]
async fn test_manifest_served_only_by_last_tier() {
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN_A]);
    let github = fixture.manifest_url(3);
    fixture
        .transport
        .serve(&github, bundle_updater::test_utils::manifest_json("abc", &[CDN_A]).into_bytes());

    let report = fixture.scheduler().run_cycle().await;

    assert!(report.outcome.is_success());
    assert!(github.starts_with("https://raw.githubusercontent.com/aby-ui/repo-release/master/"));
    assert_eq!(fixture.transport.requests().len(), 4);
}

#[tokio::test]
async fn test_all_mirrors_failing_leaves_state_untouched() {
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN_A]);
    let before = fixture.local_manifest_text();

    let report = fixture.scheduler().run_cycle().await;

    match &report.outcome {
        CycleOutcome::Failed {
            stage,
            kind,
            ..
        } => {
            assert_eq!(*stage, CycleState::CheckingManifest);
            assert_eq!(*kind, "exhausted_mirrors");
        }
        other => panic!("expected failure, got {other}"),
    }
    assert_eq!(report.next_delay, Duration::from_secs(2 * 60));
    assert_eq!(fixture.transport.requests().len(), 5);
    assert_eq!(fixture.local_manifest_text(), before);
    assert!(!fixture.paths.staged_bundle().exists());
    assert!(!fixture.paths.remote_manifest().exists());
}

#[tokio::test]
async fn test_manifest_without_urls_fails_download() {
    let fixture = SchedulerFixture::new();
    fixture.serve_manifest("def", &[]);

    let report = fixture.scheduler().run_cycle().await;

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed {
            stage: CycleState::Downloading,
            kind: "exhausted_mirrors",
            ..
        }
    ));
    assert!(fixture.local_manifest_text().is_none());
}
