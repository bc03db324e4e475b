//! Resuming after interrupted, corrupted or rejected cycles.

use bundle_updater::install::IntegrityPolicy;
use bundle_updater::restart::PromptOutcome;
use bundle_updater::scheduler::{CycleOutcome, CycleState};
use bundle_updater::test_utils::{SchedulerFixture, gzip, manifest_json};

const CDN: &str = "https://cdn.example/app.asar.gz";

#[tokio::test]
async fn test_crash_between_remove_and_rename_redownloads() {
    let fixture = SchedulerFixture::new();
    // Local manifest already removed, remote copy not yet renamed.
    std::fs::write(fixture.paths.remote_manifest(), manifest_json("def", &[CDN])).unwrap();
    fixture.stage_bundle(b"release def");
    let served = fixture.serve_manifest("def", &[CDN]);
    fixture.serve_bundle(CDN, b"release def");

    let report = fixture.scheduler().run_cycle().await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Updated {
            hash: "def".to_string()
        }
    );
    assert!(report.bundle_downloaded);
    assert_eq!(fixture.local_manifest_text().as_deref(), Some(served.as_str()));
}

#[tokio::test]
async fn test_unparsable_local_manifest_counts_as_never_updated() {
    let fixture = SchedulerFixture::new();
    std::fs::write(fixture.paths.local_manifest(), b"{ \"client\": ").unwrap();
    fixture.serve_manifest("abc", &[CDN]);
    fixture.serve_bundle(CDN, b"bundle");

    let report = fixture.scheduler().run_cycle().await;

    assert!(report.bundle_downloaded);
    assert!(report.outcome.is_success());
}

#[tokio::test]
async fn test_stream_error_then_recovery() {
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN]);
    fixture.serve_manifest("def", &[CDN]);
    let mut truncated = gzip(&vec![42u8; 64 * 1024]);
    truncated.truncate(truncated.len() / 2);
    fixture.transport.serve(CDN, truncated);
    let mut scheduler = fixture.scheduler();

    let failed = scheduler.run_cycle().await;
    assert!(matches!(
        failed.outcome,
        CycleOutcome::Failed {
            stage: CycleState::Installing,
            kind: "stream",
            ..
        }
    ));
    assert!(fixture.local_manifest_text().unwrap().contains("\"abc\""));
    assert_eq!(fixture.dialog.count(), 0);

    fixture.serve_bundle(CDN, b"good bundle");
    let recovered = scheduler.run_cycle().await;

    assert!(recovered.outcome.is_success());
    assert_eq!(std::fs::read(fixture.paths.staged_bundle()).unwrap(), b"good bundle");
    assert!(fixture.local_manifest_text().unwrap().contains("\"def\""));
}

#[tokio::test]
async fn test_staged_bundle_prompts_after_process_restart() {
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN]);
    fixture.serve_manifest("abc", &[CDN]);
    fixture.stage_bundle(b"staged earlier");

    let first = fixture.scheduler().run_cycle().await;
    assert_eq!(first.prompted, Some(PromptOutcome::Deferred));

    // A new scheduler stands in for a new process: the cooldown starts over.
    let second = fixture.scheduler().run_cycle().await;
    assert_eq!(second.prompted, Some(PromptOutcome::Deferred));
    assert_eq!(fixture.dialog.count(), 2);
}

#[tokio::test]
async fn test_enforced_integrity_rejects_mismatched_bundle() {
    let fixture = SchedulerFixture::new();
    fixture.seed_local("abc", &[CDN]);
    fixture.serve_manifest("def", &[CDN]);
    fixture.serve_bundle(CDN, b"bundle");
    let mut scheduler = fixture.builder().integrity(IntegrityPolicy::Enforce).build().unwrap();

    let report = scheduler.run_cycle().await;

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed {
            stage: CycleState::Installing,
            kind: "integrity",
            ..
        }
    ));
    assert!(fixture.local_manifest_text().unwrap().contains("\"abc\""));
    assert!(fixture.paths.remote_manifest().exists());
    assert!(!fixture.paths.staged_bundle().exists());

    // The release is withdrawn; nothing rejected may be offered for restart.
    fixture.serve_manifest("abc", &[CDN]);
    let report = fixture.scheduler().run_cycle().await;

    assert_eq!(
        report.outcome,
        CycleOutcome::UpToDate {
            staged_pending: false
        }
    );
    assert_eq!(report.prompted, None);
    assert_eq!(fixture.dialog.count(), 0);
}

#[tokio::test]
async fn test_enforced_integrity_accepts_matching_bundle() {
    // SHA-256 of "Hello, World!"
    let hash = "sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";
    let fixture = SchedulerFixture::new();
    fixture.serve_manifest(hash, &[CDN]);
    fixture.serve_bundle(CDN, b"Hello, World!");
    let mut scheduler = fixture.builder().integrity(IntegrityPolicy::Enforce).build().unwrap();

    let report = scheduler.run_cycle().await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Updated {
            hash: hash.to_string()
        }
    );
}
