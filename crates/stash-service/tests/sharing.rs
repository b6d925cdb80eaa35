mod common;

use common::Harness;
use stash_core::error::ErrorKind;
use stash_service::ShareOutcome;

#[tokio::test]
async fn share_is_idempotent_and_notifies_every_call() {
    let h = Harness::new().await;
    let (alice, root) = h.user("alice").await;
    let (bob, _) = h.user("bob").await;
    let a = h.file(&alice, &root, "a.txt", "a").await;
    let b = h.file(&alice, &root, "b.txt", "b").await;

    let first = h
        .shares
        .share(&alice, &[a.id, b.id], "bob@example.com")
        .await
        .unwrap();
    assert_eq!(
        first,
        ShareOutcome::Shared {
            grantee_id: bob.user_id,
            requested: 2,
            newly_granted: 2,
        }
    );

    let second = h
        .shares
        .share(&alice, &[a.id, b.id], "Bob@Example.com")
        .await
        .unwrap();
    assert_eq!(
        second,
        ShareOutcome::Shared {
            grantee_id: bob.user_id,
            requested: 2,
            newly_granted: 0,
        }
    );

    assert_eq!(h.shares.shared_with_me(&bob).await.unwrap().len(), 2);
    assert_eq!(h.shares.shared_by_me(&alice).await.unwrap().len(), 2);

    let notices = h.notifier.notices.lock().await;
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[1].files.len(), 2);
    assert_eq!(notices[1].newly_granted, 0);
    assert_eq!(notices[1].grantor_name, "alice");
}

#[tokio::test]
async fn empty_selection_is_a_message_not_a_fault() {
    let h = Harness::new().await;
    let (alice, _) = h.user("alice").await;
    h.user("bob").await;

    let outcome = h.shares.share(&alice, &[], "bob@example.com").await.unwrap();
    assert_eq!(
        outcome,
        ShareOutcome::NothingSelected {
            message: "Please select files to share".into(),
        }
    );
    assert!(h.notifier.notices.lock().await.is_empty());
}

#[tokio::test]
async fn unknown_grantee_is_a_silent_no_op() {
    let h = Harness::new().await;
    let (alice, root) = h.user("alice").await;
    let a = h.file(&alice, &root, "a.txt", "a").await;

    let outcome = h.shares.share(&alice, &[a.id], "nobody@example.com").await.unwrap();
    assert!(matches!(outcome, ShareOutcome::UnknownGrantee { .. }));
    assert!(h.shares.shared_by_me(&alice).await.unwrap().is_empty());
    assert!(h.notifier.notices.lock().await.is_empty());
}

#[tokio::test]
async fn only_live_owned_nodes_can_be_shared() {
    let h = Harness::new().await;
    let (alice, alice_root) = h.user("alice").await;
    let (bob, bob_root) = h.user("bob").await;
    let mine = h.file(&alice, &alice_root, "mine.txt", "m").await;
    let theirs = h.file(&bob, &bob_root, "theirs.txt", "t").await;

    let err = h
        .shares
        .share(&alice, &[mine.id, theirs.id], "bob@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(h.shares.shared_with_me(&bob).await.unwrap().is_empty());

    let err = h
        .shares
        .share(&alice, &[alice_root.id], "bob@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);

    h.trash.trash(&alice, mine.id).await.unwrap();
    let err = h
        .shares
        .share(&alice, &[mine.id], "bob@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[tokio::test]
async fn trashed_and_revoked_nodes_leave_shared_lists() {
    let h = Harness::new().await;
    let (alice, root) = h.user("alice").await;
    let (bob, _) = h.user("bob").await;
    let a = h.file(&alice, &root, "a.txt", "a").await;
    let b = h.file(&alice, &root, "b.txt", "b").await;
    h.shares
        .share(&alice, &[a.id, b.id], "bob@example.com")
        .await
        .unwrap();

    h.trash.trash(&alice, a.id).await.unwrap();
    let visible = h.shares.shared_with_me(&bob).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, b.id);

    assert!(h.shares.unshare(&alice, b.id, "bob@example.com").await.unwrap());
    assert!(!h.shares.unshare(&alice, b.id, "bob@example.com").await.unwrap());
    assert!(!h.shares.unshare(&alice, b.id, "nobody@example.com").await.unwrap());
    assert!(h.shares.shared_with_me(&bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn starring_twice_cancels_out() {
    let h = Harness::new().await;
    let (alice, root) = h.user("alice").await;
    let a = h.file(&alice, &root, "a.txt", "a").await;

    assert!(h.stars.toggle(&alice, a.id).await.unwrap());
    assert_eq!(h.stars.list(&alice).await.unwrap().len(), 1);
    assert!(!h.stars.toggle(&alice, a.id).await.unwrap());
    assert!(h.stars.list(&alice).await.unwrap().is_empty());

    let err = h.stars.toggle(&alice, root.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}
