//! End-to-end login tests: store on a temp directory, replies decoded back
//! from the wire frame.

use std::sync::Arc;

use stronghold::prelude::*;
use stronghold::protocol::ProtocolError;
use tempfile::TempDir;

async fn service() -> (TempDir, LoginService) {
    let dir = tempfile::tempdir().unwrap();
    let store = AvatarStore::open(StoreConfig::new(dir.path()), Village::empty())
        .await
        .unwrap();
    (dir, LoginService::new(Arc::new(store), LoginConfig::default()))
}

// =========================================================================
// New players
// =========================================================================

#[tokio::test]
async fn test_login_without_token_creates_avatar() {
    let (_dir, logins) = service().await;

    let outcome = logins.login(None).await.unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.avatar.login_count, 1);
    assert_eq!(outcome.avatar.level(), 10);
    let token = outcome.avatar.require_token().unwrap();
    assert!(logins.store().exists(token.as_str()).await);
}

#[tokio::test]
async fn test_login_frame_decodes_to_message() {
    let (_dir, logins) = service().await;

    let outcome = logins.login(None).await.unwrap();
    let codec = MessageCodec;

    assert_eq!(codec.peek_id(&outcome.frame).unwrap(), LoginSuccessMessage::ID);
    let decoded: LoginSuccessMessage = codec.decode(&outcome.frame).unwrap();
    assert_eq!(decoded, outcome.message);
    assert_eq!(decoded.user_id, outcome.avatar.id());
    assert_eq!(decoded.user_token, outcome.avatar.require_token().unwrap().as_str());
    assert_eq!(decoded.date_joined, outcome.avatar.date_joined);
}

// =========================================================================
// Returning players
// =========================================================================

#[tokio::test]
async fn test_login_with_token_loads_and_counts() {
    let (_dir, logins) = service().await;
    let first = logins.login(None).await.unwrap();
    let token = first.avatar.require_token().unwrap().as_str();

    let second = logins.login(Some(token)).await.unwrap();

    assert!(!second.created);
    assert_eq!(second.avatar.id(), first.avatar.id());
    assert_eq!(second.avatar.login_count, 2);
    assert_eq!(second.message.login_count, 2);
    assert!(second.avatar.date_last_played >= first.avatar.date_last_played);
    assert_eq!(
        logins.store().load(token).await.unwrap().login_count,
        2,
        "login count must be persisted"
    );
}

#[tokio::test]
async fn test_login_keeps_saved_progress() {
    let (_dir, logins) = service().await;
    let first = logins.login(None).await.unwrap();
    let mut avatar = first.avatar.clone();
    avatar.trophies = 800;
    avatar.set_level(14).unwrap();
    logins.store().save(&avatar).await.unwrap();

    let again = logins
        .login(Some(avatar.require_token().unwrap().as_str()))
        .await
        .unwrap();

    assert_eq!(again.avatar.trophies, 800);
    assert_eq!(again.avatar.level(), 14);
}

// =========================================================================
// Rejected logins
// =========================================================================

#[tokio::test]
async fn test_login_unknown_token_reports_not_found() {
    let (_dir, logins) = service().await;
    let token = stronghold::avatar::TokenGenerator::generate();

    let err = logins.login(Some(token.as_str())).await.unwrap_err();

    assert_eq!(err.client_code(), ClientCode::NotFound);
}

#[tokio::test]
async fn test_login_malformed_token_reports_not_found() {
    let (_dir, logins) = service().await;

    for bad in ["BADTOKEN!", "", "short"] {
        let err = logins.login(Some(bad)).await.unwrap_err();
        assert_eq!(err.client_code(), ClientCode::NotFound, "input: {bad:?}");
    }
    assert!(logins.store().is_empty().await);
}

#[tokio::test]
async fn test_login_corrupt_record_is_isolated() {
    let (dir, logins) = service().await;
    let broken = logins.login(None).await.unwrap();
    let healthy = logins.login(None).await.unwrap();
    let broken_token = broken.avatar.require_token().unwrap().as_str();
    std::fs::write(dir.path().join(broken_token).join("avatar.json"), b"[]").unwrap();

    let err = logins.login(Some(broken_token)).await.unwrap_err();
    let ok = logins
        .login(Some(healthy.avatar.require_token().unwrap().as_str()))
        .await;

    assert!(matches!(
        err,
        StrongholdError::Store(StoreError::CorruptRecord { .. })
    ));
    assert_eq!(err.client_code(), ClientCode::Internal);
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_decoding_truncated_login_frame_is_bad_request() {
    let (_dir, logins) = service().await;
    let outcome = logins.login(None).await.unwrap();
    let truncated = &outcome.frame[..outcome.frame.len() - 3];

    let err: StrongholdError = MessageCodec
        .decode::<LoginSuccessMessage>(truncated)
        .unwrap_err()
        .into();

    assert!(matches!(
        err,
        StrongholdError::Protocol(ProtocolError::Malformed { .. })
    ));
    assert_eq!(err.client_code(), ClientCode::BadRequest);
}
