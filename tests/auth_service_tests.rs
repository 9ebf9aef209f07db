//! 认证服务集成测试

use bank_client::{
    models::{Role, Tokens},
    services::AuthService,
    storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
    ApiError,
};
use secrecy::Secret;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

mod common;
use common::{
    api_path, auth_response_json, create_test_client, create_unreachable_client, error_json,
    stored_value, user_json,
};

fn password(value: &str) -> Secret<String> {
    Secret::new(value.to_string())
}

#[tokio::test]
async fn test_login_persists_tokens_and_caches_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/login")))
        .and(body_json(json!({ "email": "holder@bank.test", "password": "hunter22" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response_json("a1", "r1")))
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, None);
    let auth = AuthService::new(test.client.clone());

    let user = auth
        .login("  holder@bank.test ", &password("hunter22"))
        .await
        .unwrap();

    assert_eq!(user.email, "holder@bank.test");
    assert_eq!(user.role, Role::AccountHolder);
    assert_eq!(stored_value(&test.store, ACCESS_TOKEN_KEY).as_deref(), Some("a1"));
    assert_eq!(stored_value(&test.store, REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    assert!(auth.is_authenticated());
    assert_eq!(auth.current_user().await.map(|u| u.id), Some("u-1".to_string()));

    server.verify().await;
}

#[tokio::test]
async fn test_signup_validation_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/signup")))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(error_json("VALIDATION_ERROR", "Password too short")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, None);
    let auth = AuthService::new(test.client.clone());

    let err = auth
        .signup("new@bank.test", &password("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation { .. }));
    assert_eq!(err.error_code(), Some("VALIDATION_ERROR"));
    assert_eq!(err.user_message(), "Password too short");
    assert!(!auth.is_authenticated());

    server.verify().await;
}

#[tokio::test]
async fn test_login_rejects_invalid_email_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/login")))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response_json("a1", "r1")))
        .expect(0)
        .mount(&server)
        .await;

    let test = create_test_client(&server, None);
    let auth = AuthService::new(test.client.clone());

    let err = auth.login("not-an-email", &password("pw")).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    server.verify().await;
}

#[tokio::test]
async fn test_logout_revokes_refresh_token_and_clears_storage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/logout")))
        .and(header("authorization", "Bearer a1"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let auth = AuthService::new(test.client.clone());

    auth.logout().await.unwrap();

    assert!(test.store.is_empty().unwrap());
    assert!(!auth.is_authenticated());
    assert!(auth.current_user().await.is_none());

    server.verify().await;
}

#[tokio::test]
async fn test_logout_clears_storage_even_when_server_unreachable() {
    let test = create_unreachable_client(Some(Tokens::new("a1", "r1")));
    let auth = AuthService::new(test.client.clone());

    let err = auth.logout().await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert!(test.store.is_empty().unwrap());
}

#[tokio::test]
async fn test_logout_without_credentials_skips_remote_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/logout")))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let test = create_test_client(&server, None);
    AuthService::new(test.client.clone()).logout().await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn test_bootstrap_restores_session_from_stored_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/auth/me")))
        .and(header("authorization", "Bearer a1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "user": user_json("u-7", "returning@bank.test") })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let auth = AuthService::new(test.client.clone());

    let user = auth.bootstrap().await.expect("session restored");
    assert_eq!(user.id, "u-7");
    assert_eq!(auth.current_user().await.map(|u| u.id), Some("u-7".to_string()));

    server.verify().await;
}

#[tokio::test]
async fn test_bootstrap_without_credentials_makes_no_request() {
    let server = MockServer::start().await;
    let test = create_test_client(&server, None);

    assert!(AuthService::new(test.client.clone()).bootstrap().await.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}
