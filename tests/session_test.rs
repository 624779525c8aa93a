//! Integration tests for session checks, refresh and termination.

mod helpers;

use std::time::Duration;

use doorman::expiry::parse_expiry;
use doorman::{ErrorKind, UserStorage};

use helpers::TestBed;

#[tokio::test]
async fn test_session_check_refreshes_and_extends() {
    let bed = TestBed::sqlite().await;
    let id = bed.create_user("alice", "wonderland", 0).await;

    let mut auth = bed.authenticator().await;
    auth.check_login("alice", "wonderland").await.unwrap();
    let token = auth.session().unwrap().to_string();
    let first = parse_expiry(auth.session_expiry().unwrap()).unwrap();

    // The stored expiry has one-second resolution.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let mut checker = bed.authenticator().await;
    let bound = checker.check_session(&token).await.unwrap();
    assert_eq!(bound, id);

    let second = parse_expiry(checker.session_expiry().unwrap()).unwrap();
    assert!(second > first, "expiry must move strictly forward");
    assert_eq!(checker.session(), Some(token.as_str()));

    // An immediate re-check against the refreshed session still works.
    checker.check_session(&token).await.unwrap();
    assert!(checker.is_identified());
}

#[tokio::test]
async fn test_unknown_token_leaves_the_instance_anonymous() {
    let bed = TestBed::sqlite().await;
    bed.create_user("alice", "wonderland", 0).await;

    let mut auth = bed.authenticator().await;
    let err = auth.check_session("deadbeef").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Rejected);
    assert!(!auth.is_identified());
    assert_eq!(auth.id(), None);
    assert_eq!(auth.login(), None);
    assert_eq!(auth.name(), None);
    assert_eq!(auth.level(), None);
    assert_eq!(auth.session(), None);
    assert_eq!(auth.session_expiry(), None);
}

#[tokio::test]
async fn test_empty_token_is_rejected_outright() {
    let bed = TestBed::sqlite().await;
    let mut auth = bed.authenticator().await;
    let err = auth.check_session("").await.unwrap_err();
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let bed = TestBed::sqlite().await;
    let id = bed.create_user("alice", "wonderland", 0).await;
    bed.storage
        .update_session(id, Some("stale-token"), Some("2000-01-01-00-00-00"))
        .await
        .unwrap();

    let mut auth = bed.authenticator().await;
    let err = auth.check_session("stale-token").await.unwrap_err();

    assert!(err.is_rejection());
    assert!(!auth.is_identified());
}

#[tokio::test]
async fn test_malformed_expiry_fails_closed() {
    let bed = TestBed::sqlite().await;
    let id = bed.create_user("alice", "wonderland", 0).await;

    for bad in ["soon", "2031-01-07", "2031-01-07 12:00:00"] {
        bed.storage
            .update_session(id, Some("tok"), Some(bad))
            .await
            .unwrap();
        let mut auth = bed.authenticator().await;
        let err = auth.check_session("tok").await.unwrap_err();
        assert!(err.is_rejection(), "expiry {bad:?} must fail closed");
    }
}

#[tokio::test]
async fn test_token_without_stored_expiry_is_rejected() {
    let bed = TestBed::sqlite().await;
    let id = bed.create_user("alice", "wonderland", 0).await;
    bed.storage
        .update_session(id, Some("orphan"), None)
        .await
        .unwrap();

    let mut auth = bed.authenticator().await;
    let err = auth.check_session("orphan").await.unwrap_err();
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_new_login_overwrites_the_previous_session() {
    let bed = TestBed::sqlite().await;
    bed.create_user("alice", "wonderland", 0).await;

    let mut auth = bed.authenticator().await;
    auth.check_login("alice", "wonderland").await.unwrap();
    let old_token = auth.session().unwrap().to_string();

    auth.check_login("alice", "wonderland").await.unwrap();
    let new_token = auth.session().unwrap().to_string();
    assert_ne!(old_token, new_token);

    let mut checker = bed.authenticator().await;
    checker.check_session(&old_token).await.unwrap_err();
    checker.check_session(&new_token).await.unwrap();
}

#[tokio::test]
async fn test_ending_a_session_invalidates_the_token() {
    let bed = TestBed::sqlite().await;
    let id = bed.create_user("alice", "wonderland", 0).await;

    let mut auth = bed.authenticator().await;
    auth.check_login("alice", "wonderland").await.unwrap();
    let token = auth.session().unwrap().to_string();

    auth.end_session().await.unwrap();
    assert!(!auth.is_identified());

    let row = bed.row(id).await.unwrap();
    assert!(row.session.is_none());
    assert!(row.session_exp.is_none());

    let mut checker = bed.authenticator().await;
    checker.check_session(&token).await.unwrap_err();
}

#[tokio::test]
async fn test_ending_without_a_session_is_a_rejected_no_op() {
    let bed = TestBed::sqlite().await;
    let mut auth = bed.authenticator().await;
    let err = auth.end_session().await.unwrap_err();
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_session_columns_always_move_as_a_pair() {
    let bed = TestBed::sqlite().await;
    let id = bed.create_user("alice", "wonderland", 0).await;

    let mut auth = bed.authenticator().await;
    auth.check_login("alice", "wonderland").await.unwrap();

    let row = bed.row(id).await.unwrap();
    assert!(row.session.is_some());
    assert!(row.session_exp.is_some());

    auth.end_session().await.unwrap();
    let row = bed.row(id).await.unwrap();
    assert!(row.session.is_none());
    assert!(row.session_exp.is_none());
}

#[tokio::test]
async fn test_purge_clears_only_stale_sessions() {
    let bed = TestBed::sqlite().await;
    let live_id = bed.create_user("alive", "pw", 0).await;
    let stale_id = bed.create_user("stale", "pw", 0).await;
    let broken_id = bed.create_user("broken", "pw", 0).await;
    let idle_id = bed.create_user("idle", "pw", 0).await;

    let mut auth = bed.authenticator().await;
    auth.check_login("alive", "pw").await.unwrap();
    let live_token = auth.session().unwrap().to_string();

    bed.storage
        .update_session(stale_id, Some("old"), Some("2000-01-01-00-00-00"))
        .await
        .unwrap();
    bed.storage
        .update_session(broken_id, Some("junk"), Some("not-a-timestamp"))
        .await
        .unwrap();

    let directory = bed.directory().await;
    assert_eq!(directory.purge_expired_sessions().await.unwrap(), 2);

    assert_eq!(
        bed.row(live_id).await.unwrap().session.as_deref(),
        Some(live_token.as_str())
    );
    assert!(bed.row(stale_id).await.unwrap().session.is_none());
    assert!(bed.row(broken_id).await.unwrap().session.is_none());
    assert!(bed.row(idle_id).await.unwrap().session.is_none());

    // nothing left to purge
    assert_eq!(directory.purge_expired_sessions().await.unwrap(), 0);
}

#[tokio::test]
async fn test_session_flow_on_the_memory_backend() {
    let bed = TestBed::memory().await;
    let id = bed.create_user("alice", "wonderland", 0).await;

    let mut auth = bed.authenticator().await;
    auth.check_login("alice", "wonderland").await.unwrap();
    let token = auth.session().unwrap().to_string();

    let mut checker = bed.authenticator().await;
    assert_eq!(checker.check_session(&token).await.unwrap(), id);

    checker.end_session().await.unwrap();
    checker.check_session(&token).await.unwrap_err();
    assert_eq!(checker.id(), None);
}
