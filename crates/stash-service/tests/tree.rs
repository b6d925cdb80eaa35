mod common;

use std::time::Duration;

use bytes::Bytes;

use common::Harness;
use stash_core::error::ErrorKind;
use stash_core::types::NodeId;
use stash_entity::user::NewUser;

#[tokio::test]
async fn register_provisions_named_root() {
    let h = Harness::new().await;
    let (ctx, root) = h.user("alice").await;

    assert!(root.is_root);
    assert_eq!(root.name, "alice");
    assert_eq!(h.nodes.get_root(&ctx).await.unwrap().id, root.id);

    let err = h
        .users
        .register(NewUser {
            email: "ALICE@example.com".into(),
            name: "imposter".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn listing_puts_folders_first_then_newest() {
    let h = Harness::new().await;
    let (ctx, root) = h.user("alice").await;

    let old_file = h.file(&ctx, &root, "old.txt", "1").await;
    tokio::time::sleep(Duration::from_millis(2)).await;
    let folder = h.folder(&ctx, &root, "docs").await;
    tokio::time::sleep(Duration::from_millis(2)).await;
    let new_file = h.file(&ctx, &root, "new.txt", "2").await;

    let ids: Vec<NodeId> = h
        .nodes
        .list_children(&ctx, root.id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec![folder.id, new_file.id, old_file.id]);
}

#[tokio::test]
async fn paths_and_ancestors_follow_the_tree() {
    let h = Harness::new().await;
    let (ctx, root) = h.user("alice").await;
    let docs = h.folder(&ctx, &root, "docs").await;
    let work = h.folder(&ctx, &docs, "work").await;
    let report = h.file(&ctx, &work, "report.txt", "r").await;

    let found = h.nodes.resolve_by_path(&ctx, "docs/work/report.txt").await.unwrap();
    assert_eq!(found.id, report.id);

    let ancestors: Vec<String> = h
        .nodes
        .ancestors(&ctx, report.id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(ancestors, vec!["alice", "docs", "work"]);

    let err = h.nodes.resolve_by_path(&ctx, "docs/missing").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn files_cannot_have_children_and_names_are_checked() {
    let h = Harness::new().await;
    let (ctx, root) = h.user("alice").await;
    let file = h.file(&ctx, &root, "a.txt", "a").await;

    let err = h.nodes.create_folder(&ctx, file.id, "inner").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);

    let err = h
        .nodes
        .create_file(&ctx, root.id, "bad/name", Bytes::from("x"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn other_owners_nodes_are_invisible() {
    let h = Harness::new().await;
    let (alice, alice_root) = h.user("alice").await;
    let (bob, _) = h.user("bob").await;
    let docs = h.folder(&alice, &alice_root, "docs").await;

    let err = h.nodes.create_folder(&bob, docs.id, "intruder").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = h.nodes.list_children(&bob, alice_root.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(h.nodes.search(&bob, "docs", false).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_creates_keep_containment() {
    let h = std::sync::Arc::new(Harness::new().await);
    let (ctx, root) = h.user("alice").await;
    let left = h.folder(&ctx, &root, "left").await;
    let right = h.folder(&ctx, &root, "right").await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let h = h.clone();
        let ctx = ctx.clone();
        let parent = if i % 2 == 0 { left.clone() } else { right.clone() };
        handles.push(tokio::spawn(async move {
            if i % 3 == 0 {
                h.folder(&ctx, &parent, &format!("dir{i}")).await
            } else {
                h.file(&ctx, &parent, &format!("f{i}.txt"), "x").await
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    h.node_repo.verify(ctx.user_id).await.unwrap();
    for child in h.nodes.list_children(&ctx, left.id).await.unwrap() {
        let chain: Vec<NodeId> = h
            .nodes
            .ancestors(&ctx, child.id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(chain, vec![root.id, left.id]);
    }
    assert_eq!(h.nodes.list_children(&ctx, left.id).await.unwrap().len(), 20);
    assert_eq!(h.nodes.list_children(&ctx, right.id).await.unwrap().len(), 20);
}

#[tokio::test]
async fn cloud_upload_completes_once() {
    let h = Harness::new().await;
    let (ctx, root) = h.user("alice").await;
    let file = h.file(&ctx, &root, "big.bin", "payload").await;

    let moved = h.migrate_to_cloud(&file).await;
    assert!(moved.payload().unwrap().uploaded_on_cloud);

    let err = h.nodes.complete_cloud_upload(file.id, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}
