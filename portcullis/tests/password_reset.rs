mod common;

use chrono::{Duration, Utc};
use common::{RecordingNotifier, Sent, count, pool, portcullis};
use portcullis::{AccountId, Device, Error, ErrorKind, RegisterRequest};
use portcullis_core::error::{AuthError, CodeError};

#[tokio::test]
async fn test_reset_password_replaces_credentials() {
    let pool = pool().await;
    let portcullis = portcullis(&pool).await;
    let device = Device::new("laptop");

    let registration = portcullis
        .register(RegisterRequest::new("a@x.com", "pw1", "alice"), &device)
        .await
        .unwrap();
    let account_id = &registration.account.id;

    portcullis
        .request_password_reset(account_id, "R1", Utc::now() + Duration::hours(1), &device)
        .await
        .unwrap();
    let stored = portcullis
        .get_reset_password_code(account_id, "R1")
        .await
        .unwrap();
    assert!(!stored.used);

    let mut account = portcullis.get_account(account_id).await.unwrap();
    account.password_hash = portcullis.hash_password("new password").unwrap();
    portcullis
        .reset_password(&account, "R1", &device)
        .await
        .unwrap();

    let error = portcullis.login("a@x.com", "pw1", &device).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unauthenticated);
    portcullis
        .login("a@x.com", "new password", &device)
        .await
        .unwrap();

    assert_eq!(count(&pool, "reset_codes").await, 0);
}

#[tokio::test]
async fn test_reset_code_is_single_use() {
    let pool = pool().await;
    let portcullis = portcullis(&pool).await;
    let device = Device::new("laptop");

    let registration = portcullis
        .register(RegisterRequest::new("a@x.com", "pw1", "alice"), &device)
        .await
        .unwrap();
    let account_id = &registration.account.id;
    let expires_at = Utc::now() + Duration::hours(1);

    portcullis
        .request_password_reset(account_id, "R1", expires_at, &device)
        .await
        .unwrap();
    portcullis
        .request_password_reset(account_id, "R2", expires_at, &device)
        .await
        .unwrap();

    portcullis
        .complete_password_reset(account_id, "R1", "second", &device)
        .await
        .unwrap();

    for code in ["R1", "R2"] {
        let error = portcullis
            .complete_password_reset(account_id, code, "third", &device)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Code(CodeError::NotFound)));
    }
    portcullis.login("a@x.com", "second", &device).await.unwrap();
}

#[tokio::test]
async fn test_invalid_reset_code_leaves_password() {
    let pool = pool().await;
    let portcullis = portcullis(&pool).await;
    let device = Device::new("laptop");

    let registration = portcullis
        .register(RegisterRequest::new("a@x.com", "pw1", "alice"), &device)
        .await
        .unwrap();
    let account_id = &registration.account.id;

    let error = portcullis
        .complete_password_reset(account_id, "never-issued", "new", &device)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Code(CodeError::NotFound)));

    portcullis
        .request_password_reset(account_id, "R1", Utc::now() - Duration::seconds(1), &device)
        .await
        .unwrap();
    let error = portcullis
        .complete_password_reset(account_id, "R1", "new", &device)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Code(CodeError::Expired)));
    assert_eq!(count(&pool, "reset_codes").await, 1);

    portcullis.login("a@x.com", "pw1", &device).await.unwrap();
}

#[tokio::test]
async fn test_request_reset_validates_input() {
    let pool = pool().await;
    let portcullis = portcullis(&pool).await;
    let device = Device::new("laptop");
    let expires_at = Utc::now() + Duration::hours(1);

    let error = portcullis
        .request_password_reset(&AccountId::new("acct_missing"), "R1", expires_at, &device)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Auth(AuthError::AccountNotFound)));

    let registration = portcullis
        .register(RegisterRequest::new("a@x.com", "pw1", "alice"), &device)
        .await
        .unwrap();
    let error = portcullis
        .request_password_reset(&registration.account.id, "  ", expires_at, &device)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    assert_eq!(count(&pool, "reset_codes").await, 0);
}

#[tokio::test]
async fn test_reset_code_reaches_notifier() {
    let pool = pool().await;
    let notifier = RecordingNotifier::default();
    let portcullis = common::builder(&pool)
        .with_notifier(notifier.clone())
        .build()
        .await
        .unwrap();
    let device = Device::new("laptop");

    let registration = portcullis
        .register(RegisterRequest::new("a@x.com", "pw1", "alice"), &device)
        .await
        .unwrap();
    portcullis
        .request_password_reset(
            &registration.account.id,
            "R1",
            Utc::now() + Duration::hours(1),
            &device,
        )
        .await
        .unwrap();

    assert_eq!(
        notifier.sent().last(),
        Some(&Sent::PasswordReset {
            account_id: registration.account.id.clone(),
            code: "R1".to_string(),
        })
    );
}

#[tokio::test]
async fn test_hash_password_rejects_blank() {
    let pool = pool().await;
    let portcullis = portcullis(&pool).await;

    let error = portcullis.hash_password("   ").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
}
