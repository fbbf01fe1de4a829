// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download orchestrator integration tests.
//!
//! Each test builds an isolated harness. The account owner is `alice`.

use sharesync_core::{AssetQuality, DownloadBlacklist, QueueKind, QueueStore, UploadState, User};
use sharesync_download::DownloadFilter;
use sharesync_pipeline::QueueItem;
use sharesync_test_utils::{DescriptorBuilder, MockCrypto, TestHarness};
use tokio_util::sync::CancellationToken;

async fn harness_with_users() -> TestHarness {
    harness_with_threshold(6).await
}

async fn harness_with_threshold(threshold: u32) -> TestHarness {
    let harness = TestHarness::builder()
        .with_failed_attempts_threshold(threshold)
        .build()
        .await
        .unwrap();
    for (id, name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        harness.remote.add_user(User::new(id, name)).await;
    }
    harness
}

async fn run(harness: &TestHarness) -> sharesync_download::DownloadReport {
    harness
        .download
        .run(&DownloadFilter::default(), &CancellationToken::new())
        .await
        .unwrap()
}

// ---- Own assets ----

#[tokio::test]
async fn test_own_asset_in_library_is_not_downloaded() {
    let harness = harness_with_users().await;
    harness.library.add_asset("L1", "g1").await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .local_identifier("L1")
                .recipient("bob", &["G1"])
                .build(),
        )
        .await;

    let report = run(&harness).await;

    assert_eq!(report.received, vec!["g1".to_string()]);
    assert_eq!(report.matched_locally, vec!["g1".to_string()]);
    assert!(report.restored.is_empty());
    assert!(report.downloaded.is_empty());
    assert!(harness.local.descriptor("g1").await.is_none());
    assert_eq!(harness.recorder.count("identify_local_assets L1"), 1);

    let shared = harness
        .graph
        .asset_global_identifiers_shared_by(&["alice".to_string()], None, false)
        .await
        .unwrap();
    assert!(shared.contains_key("g1"));
}

#[tokio::test]
async fn test_own_asset_missing_from_library_is_restored_with_history() {
    let harness = harness_with_users().await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g2", "alice")
                .local_identifier("L9")
                .recipient("alice", &["G1"])
                .recipient("bob", &["G1"])
                .build(),
        )
        .await;
    harness
        .remote
        .put_asset(MockCrypto::sealed(
            "g2",
            &[AssetQuality::Low, AssetQuality::Hi],
            b"pixels",
        ))
        .await;

    let report = run(&harness).await;

    assert_eq!(report.restored, vec!["g2".to_string()]);
    assert!(report.downloaded.is_empty());
    assert!(harness.local.has_asset("g2").await);
    assert_eq!(
        harness.local.descriptor("g2").await.unwrap().upload_state,
        UploadState::Completed
    );

    assert_eq!(harness.queues.count(QueueKind::UploadHistory).await.unwrap(), 1);
    let shares = harness
        .queues
        .peek(QueueKind::ShareHistory, 0, None)
        .await
        .unwrap();
    assert_eq!(shares.len(), 1);
    // History keeps the date the group was created.
    assert_eq!(shares[0].created_at.timestamp(), 1_700_000_100);
    let QueueItem::ShareHistory(request) =
        QueueItem::decode(&shares[0].identifier, &shares[0].payload).unwrap()
    else {
        panic!("expected a share history item");
    };
    assert_eq!(request.global_identifier.as_deref(), Some("g2"));
    assert_eq!(request.local_identifier.as_deref(), Some("L9"));
    assert_eq!(request.group_id, "G1");
    assert_eq!(request.shared_with, vec![User::new("bob", "Bob")]);
    assert_eq!(request.event_originator.identifier, "alice");

    assert_eq!(harness.recorder.count("restore_upload_history G1"), 1);
    assert_eq!(harness.recorder.count("restore_share_history G1"), 1);
    assert_eq!(harness.recorder.count("complete_restoration bob"), 1);
}

#[tokio::test]
async fn test_restore_local_rebuilds_history_from_local_store() {
    let harness = harness_with_users().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g6", "alice")
                .recipient("alice", &["G1"])
                .recipient("carol", &["G1"])
                .build(),
        )
        .await;
    harness
        .local
        .put_asset(MockCrypto::sealed("g6", &[AssetQuality::Low], b"local"))
        .await;

    let restored = harness.download.restore_local().await.unwrap();

    assert_eq!(restored, vec!["g6".to_string()]);
    assert_eq!(harness.queues.count(QueueKind::UploadHistory).await.unwrap(), 1);
    assert_eq!(harness.queues.count(QueueKind::ShareHistory).await.unwrap(), 1);

    // Restoring again does not duplicate history.
    harness.download.restore_local().await.unwrap();
    assert_eq!(harness.queues.count(QueueKind::ShareHistory).await.unwrap(), 1);
}

// ---- Assets shared by others ----

#[tokio::test]
async fn test_asset_shared_by_others_is_downloaded() {
    let harness = harness_with_users().await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g3", "bob")
                .recipient("alice", &["G2"])
                .build(),
        )
        .await;
    harness
        .remote
        .put_asset(MockCrypto::sealed("g3", &[AssetQuality::Low], b"hello"))
        .await;

    let report = run(&harness).await;

    assert_eq!(report.downloaded, vec!["g3".to_string()]);
    assert!(report.failed.is_empty());
    assert!(harness.local.has_asset("g3").await);
    assert_eq!(harness.recorder.count("start_download g3"), 1);
    assert_eq!(harness.recorder.count("complete_download g3"), 1);
    assert_eq!(harness.recorder.count("complete_download_cycle"), 1);
    assert!(harness.download.last_fetch().is_some());

    let second = run(&harness).await;
    assert!(second.received.is_empty());
    assert_eq!(harness.recorder.count("complete_download g3"), 1);
}

#[tokio::test]
async fn test_unresolved_users_drop_descriptor() {
    let harness = harness_with_users().await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g5", "dave")
                .recipient("alice", &["G3"])
                .build(),
        )
        .await;

    let report = run(&harness).await;

    assert!(report.received.is_empty());
    assert!(harness.local.descriptor("g5").await.is_none());
    assert_eq!(harness.recorder.count("receive_descriptors"), 0);
}

#[tokio::test]
async fn test_in_flight_remote_uploads_are_not_downloaded() {
    let harness = harness_with_users().await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g7", "bob")
                .state(UploadState::Started)
                .recipient("alice", &["G2"])
                .build(),
        )
        .await;

    let report = run(&harness).await;
    assert!(report.received.is_empty());
}

// ---- Failures and blacklisting ----

#[tokio::test]
async fn test_repeated_failures_blacklist_the_asset() {
    let harness = harness_with_threshold(2).await;
    // Descriptor without a payload on the remote.
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g4", "bob")
                .recipient("alice", &["G2"])
                .build(),
        )
        .await;

    let first = run(&harness).await;
    assert_eq!(first.failed, vec!["g4".to_string()]);
    assert!(first.blacklisted.is_empty());
    // A cycle with failures does not move the fetch window.
    assert!(harness.download.last_fetch().is_none());

    let second = run(&harness).await;
    assert_eq!(second.failed, vec!["g4".to_string()]);
    assert_eq!(second.blacklisted, vec!["g4".to_string()]);
    assert_eq!(harness.recorder.count("fail_repeatedly g4"), 1);
    assert!(harness
        .blacklist
        .is_blacklisted(&"g4".to_string())
        .await
        .unwrap());

    let third = run(&harness).await;
    assert!(third.received.is_empty());
    assert_eq!(harness.recorder.count("fail_download g4"), 2);
}

#[tokio::test]
async fn test_successful_download_clears_attempts() {
    let harness = harness_with_threshold(2).await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g8", "bob")
                .recipient("alice", &["G2"])
                .build(),
        )
        .await;
    harness
        .remote
        .put_asset(MockCrypto::sealed("g8", &[AssetQuality::Low], b"data"))
        .await;
    harness.crypto.corrupt("g8").await;

    let first = run(&harness).await;
    assert_eq!(first.failed, vec!["g8".to_string()]);

    harness.crypto.repair("g8").await;
    let second = run(&harness).await;
    assert_eq!(second.downloaded, vec!["g8".to_string()]);

    // The attempt counter restarted, so one more failure is not enough.
    assert_eq!(
        harness
            .blacklist
            .record_failed_attempt(&"g8".to_string())
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_remote_failure_fails_the_cycle() {
    let harness = harness_with_users().await;
    harness.remote.fail("asset_descriptors").await;

    let result = harness
        .download
        .run(&DownloadFilter::default(), &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(harness.recorder.count("fail_download_cycle"), 1);
    assert!(harness.download.last_fetch().is_none());
}
