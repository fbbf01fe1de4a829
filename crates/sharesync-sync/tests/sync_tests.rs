// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation integration tests: asset descriptors, interactions and the
//! global sync sequence. The account owner is `alice`.

use chrono::DateTime;
use sharesync_core::types::{InteractionAnchor, Interactions, Message, Reaction};
use sharesync_core::{AssetQuality, UploadState, User};
use sharesync_sync::AssetsSyncReport;
use sharesync_test_utils::{group_info, DescriptorBuilder, MockCrypto, TestHarness};
use tokio_util::sync::CancellationToken;

async fn harness() -> TestHarness {
    harness_with(TestHarness::builder().build().await.unwrap()).await
}

async fn harness_with(harness: TestHarness) -> TestHarness {
    for (id, name) in [
        ("alice", "Alice"),
        ("bob", "Bob"),
        ("carol", "Carol"),
        ("dave", "Dave"),
    ] {
        harness.remote.add_user(User::new(id, name)).await;
    }
    harness
}

fn message(id: &str, sender: &str, secs: i64) -> Message {
    Message {
        interaction_id: id.into(),
        sender_user_identifier: sender.into(),
        in_reply_to_asset_global_identifier: None,
        in_reply_to_interaction_id: None,
        encrypted_message: format!("ciphertext-{id}"),
        created_at: DateTime::from_timestamp(secs, 0).unwrap(),
    }
}

fn reaction(sender: &str, kind: i32) -> Reaction {
    Reaction {
        sender_user_identifier: sender.into(),
        in_reply_to_asset_global_identifier: Some("g1".into()),
        in_reply_to_interaction_id: None,
        reaction_type: kind,
        added_at: DateTime::from_timestamp(1_700_000_500, 0).unwrap(),
    }
}

// ---- Shares ----

#[tokio::test]
async fn test_revoked_recipient_is_removed_locally() {
    let harness = harness().await;
    let shared = DescriptorBuilder::new("g1", "alice")
        .recipient("bob", &["G1"])
        .recipient("carol", &["G1"]);
    harness.local.put_descriptor(shared.build()).await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .recipient("bob", &["G1"])
                .build(),
        )
        .await;

    let report = harness.assets_sync.run().await.unwrap();

    assert_eq!(report.shares_revoked, 1);
    assert_eq!(report.errors, 0);
    let local = harness.local.descriptor("g1").await.unwrap();
    let recipients: Vec<_> = local
        .sharing_info
        .group_ids_by_recipient_user_identifier
        .keys()
        .cloned()
        .collect();
    assert_eq!(recipients, vec!["bob".to_string()]);
    assert_eq!(harness.recorder.count("users_removed_from_share g1 carol"), 1);
    // carol is no longer referenced anywhere on the remote.
    assert_eq!(harness.local.deleted_users().await, vec!["carol".to_string()]);
    assert_eq!(harness.recorder.count("users_removed carol"), 1);
}

#[tokio::test]
async fn test_added_recipient_extends_local_share() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .recipient("bob", &["G1"])
                .build(),
        )
        .await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .recipient("bob", &["G1"])
                .recipient("dave", &["G1"])
                .build(),
        )
        .await;

    let report = harness.assets_sync.run().await.unwrap();

    assert_eq!(report.shares_extended, 1);
    let local = harness.local.descriptor("g1").await.unwrap();
    assert!(local
        .sharing_info
        .group_ids_by_recipient_user_identifier
        .contains_key("dave"));
    assert_eq!(harness.recorder.count("users_added g1 dave"), 1);

    let shared = harness
        .graph
        .asset_global_identifiers_shared_with(&["dave".to_string()], None)
        .await
        .unwrap();
    assert!(shared.contains_key("g1"));
}

#[tokio::test]
async fn test_group_metadata_edit_is_applied() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .recipient("bob", &["G1"])
                .group("G1", group_info("old title", "alice", 1_700_000_100))
                .build(),
        )
        .await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .recipient("bob", &["G1"])
                .group("G1", group_info("new title", "alice", 1_700_000_100))
                .build(),
        )
        .await;

    let report = harness.assets_sync.run().await.unwrap();

    assert_eq!(report.groups_updated, 1);
    let local = harness.local.descriptor("g1").await.unwrap();
    assert_eq!(
        local.sharing_info.group_info_by_id["G1"]
            .encrypted_title
            .as_deref(),
        Some("new title")
    );
    assert_eq!(harness.recorder.count("groups_updated G1"), 1);
}

// ---- Assets ----

#[tokio::test]
async fn test_assets_deleted_on_remote_are_evicted() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g2", "bob")
                .recipient("alice", &["G2"])
                .build(),
        )
        .await;
    harness
        .local
        .put_asset(MockCrypto::sealed("g2", &[AssetQuality::Low], b"gone"))
        .await;
    // Own upload still in flight: the remote does not know it yet.
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g3", "alice")
                .state(UploadState::Started)
                .build(),
        )
        .await;

    let report = harness.assets_sync.run().await.unwrap();

    assert_eq!(report.assets_removed, 1);
    assert!(harness.local.descriptor("g2").await.is_none());
    assert!(!harness.local.has_asset("g2").await);
    assert!(harness.local.descriptor("g3").await.is_some());
    assert_eq!(harness.recorder.count("assets_deleted g2"), 1);
}

#[tokio::test]
async fn test_remote_failed_state_is_reconciled() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(DescriptorBuilder::new("g4", "alice").build())
        .await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g4", "alice")
                .state(UploadState::Failed)
                .build(),
        )
        .await;

    let report = harness.assets_sync.run().await.unwrap();

    assert!(report.state_changes > 0);
    assert_eq!(
        harness.local.descriptor("g4").await.unwrap().upload_state,
        UploadState::Failed
    );
    assert!(harness
        .local
        .marks()
        .await
        .iter()
        .all(|(gid, _, state)| gid == "g4" && *state == UploadState::Failed));
}

#[tokio::test]
async fn test_state_reconciliation_can_be_disabled() {
    let harness = harness_with(
        TestHarness::builder()
            .with_reconcile_upload_states(false)
            .build()
            .await
            .unwrap(),
    )
    .await;
    harness
        .local
        .put_descriptor(DescriptorBuilder::new("g4", "alice").build())
        .await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g4", "alice")
                .state(UploadState::Failed)
                .build(),
        )
        .await;

    let report = harness.assets_sync.run().await.unwrap();

    assert_eq!(report.state_changes, 0);
    assert!(harness.local.marks().await.is_empty());
}

#[tokio::test]
async fn test_unknown_users_are_evicted() {
    let harness = harness().await;
    let descriptor = DescriptorBuilder::new("g5", "alice")
        .recipient("bob", &["G5"])
        .build();
    harness.local.put_descriptor(descriptor.clone()).await;
    harness.remote.put_descriptor(descriptor).await;
    harness.remote.remove_user("bob").await;

    let report = harness.assets_sync.run().await.unwrap();

    assert_eq!(report.users_removed, 1);
    assert_eq!(harness.local.deleted_users().await, vec!["bob".to_string()]);
}

#[tokio::test]
async fn test_local_store_failure_is_counted_not_fatal() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g2", "bob")
                .recipient("alice", &["G2"])
                .build(),
        )
        .await;
    harness.local.fail("delete_assets").await;

    let report = harness.assets_sync.run().await.unwrap();

    assert_eq!(report.assets_removed, 0);
    assert!(report.errors >= 1);
    assert!(harness.local.descriptor("g2").await.is_some());

    harness.local.recover("delete_assets").await;
    let retry = harness.assets_sync.run().await.unwrap();
    assert_eq!(retry.assets_removed, 1);
}

// ---- Interactions ----

#[tokio::test]
async fn test_interactions_are_mirrored_from_remote() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .recipient("bob", &["G1"])
                .build(),
        )
        .await;
    harness.remote.add_thread("T1", &["alice", "bob"]).await;
    harness.remote.add_thread("T2", &["alice"]).await;

    harness
        .remote
        .set_interactions(
            InteractionAnchor::Group,
            "G1",
            Interactions {
                messages: vec![message("m1", "bob", 10), message("m2", "alice", 20)],
                reactions: vec![reaction("bob", 1)],
            },
        )
        .await;
    harness
        .local
        .set_interactions(
            InteractionAnchor::Group,
            "G1",
            Interactions {
                messages: vec![message("m1", "bob", 10)],
                reactions: vec![reaction("carol", 2)],
            },
        )
        .await;
    harness
        .remote
        .set_interactions(
            InteractionAnchor::Thread,
            "T1",
            Interactions {
                messages: vec![message("t1", "bob", 30)],
                reactions: Vec::new(),
            },
        )
        .await;

    let report = harness
        .interactions
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.anchors_synced, 2);
    assert_eq!(report.anchors_failed, 0);
    assert_eq!(report.messages_added, 2);
    assert_eq!(report.reactions_added, 1);
    assert_eq!(report.reactions_removed, 1);

    let group = harness
        .local
        .stored_interactions(InteractionAnchor::Group, "G1")
        .await;
    let ids: Vec<_> = group
        .messages
        .iter()
        .map(|m| m.interaction_id.as_str())
        .collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert_eq!(group.reactions.len(), 1);
    assert_eq!(group.reactions[0].sender_user_identifier, "bob");

    assert_eq!(harness.recorder.count("messages group:G1 1"), 1);
    assert_eq!(harness.recorder.count("messages thread:T1 1"), 1);
    assert_eq!(harness.recorder.count("reactions group:G1 +1 -1"), 1);

    // A second pass finds nothing to do.
    let again = harness
        .interactions
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(again.messages_added, 0);
    assert_eq!(again.reactions_added + again.reactions_removed, 0);
}

#[tokio::test]
async fn test_interaction_failures_are_per_anchor() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g1", "alice")
                .recipient("bob", &["G1"])
                .build(),
        )
        .await;
    harness.remote.fail("interactions").await;

    let report = harness
        .interactions
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.anchors_synced, 0);
    assert_eq!(report.anchors_failed, 1);
}

// ---- Global sync ----

#[tokio::test]
async fn test_global_sync_runs_every_step() {
    let harness = harness().await;
    harness
        .remote
        .put_descriptor(
            DescriptorBuilder::new("g9", "bob")
                .recipient("alice", &["G9"])
                .build(),
        )
        .await;
    harness
        .remote
        .put_asset(MockCrypto::sealed("g9", &[AssetQuality::Low], b"hi"))
        .await;

    let report = harness
        .global
        .run(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    let download = report.download.unwrap();
    assert_eq!(download.downloaded, vec!["g9".to_string()]);
    // The freshly downloaded asset matches the remote, so nothing to reconcile.
    assert_eq!(report.assets.unwrap(), AssetsSyncReport::default());
    assert_eq!(report.interactions.unwrap().anchors_synced, 1);
    assert!(!harness.global.is_running());
}

#[tokio::test]
async fn test_global_sync_continues_after_a_failed_step() {
    let harness = harness().await;
    harness
        .local
        .put_descriptor(
            DescriptorBuilder::new("g2", "bob")
                .recipient("alice", &["G2"])
                .build(),
        )
        .await;
    harness.remote.fail("threads").await;

    let result = harness.global.run(&CancellationToken::new()).await;

    assert!(result.is_err());
    // The asset step ran even though interactions failed afterwards.
    assert!(harness.local.descriptor("g2").await.is_none());
    assert!(!harness.global.is_running());
}

#[tokio::test]
async fn test_global_sync_stops_when_cancelled() {
    let harness = harness().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = harness.global.run(&cancel).await;
    assert!(matches!(result, Err(sharesync_core::SyncError::Cancelled)));
}
