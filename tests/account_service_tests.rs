//! 账户服务集成测试：资金操作两步确认流程

use bank_client::{
    models::{Account, PageRequest, Tokens},
    services::{AccountService, ActionOutcome, PendingAction, RateQuote},
    ApiError, OtpChallenge,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, header, header_exists, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

mod common;
use common::{account_json, api_path, create_test_client, error_json, movement_json};

fn eur_account(balance: i64) -> Account {
    serde_json::from_value(account_json("acc-1", "EUR", json!(balance))).unwrap()
}

fn idempotency_keys(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .filter_map(|r| r.headers.get("idempotency-key"))
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_deposit_sends_amount_as_string_with_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/accounts/acc-1/deposits")))
        .and(header("authorization", "Bearer a1"))
        .and(header_exists("idempotency-key"))
        .and(body_json(json!({ "amount_minor": "1500", "otp_code": "123456" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(movement_json("DEPOSIT", 1500, 2500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let accounts = AccountService::new(test.client.clone());

    let action = PendingAction::deposit(&eur_account(1000), 1500).unwrap();
    let outcome = accounts.confirm(&action, Some(" 123456 ")).await.unwrap();

    match outcome {
        ActionOutcome::Moved(movement) => {
            assert_eq!(movement.balance_minor.value(), 2500);
            assert_eq!(movement.transaction.amount_minor.value(), 1500);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let requests = server.received_requests().await.unwrap();
    let key = action.idempotency_key().unwrap().to_string();
    assert_eq!(idempotency_keys(&requests), vec![key]);

    server.verify().await;
}

#[tokio::test]
async fn test_otp_required_retry_reuses_idempotency_key() {
    let server = MockServer::start().await;

    // 无验证码的请求被要求补充验证码
    Mock::given(method("POST"))
        .and(path(api_path("/accounts/acc-1/withdrawals")))
        .and(body_json(json!({ "amount_minor": "400" })))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(error_json("OTP_REQUIRED", "Authenticator code required")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("/accounts/acc-1/withdrawals")))
        .and(body_json(json!({ "amount_minor": "400", "otp_code": "654321" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(movement_json("WITHDRAWAL", 400, 600)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let accounts = AccountService::new(test.client.clone());
    let action = PendingAction::withdraw(&eur_account(1000), 400).unwrap();

    let err = accounts.confirm(&action, None).await.unwrap_err();
    assert_eq!(err.otp_challenge(), Some(OtpChallenge::Required));
    assert_eq!(err.code(), Some(403));

    accounts.confirm(&action, Some("654321")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let keys = idempotency_keys(&requests);
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);

    server.verify().await;
}

#[tokio::test]
async fn test_convert_forwards_quote_with_timestamp() {
    let server = MockServer::start().await;
    let as_of = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    Mock::given(method("POST"))
        .and(path(api_path("/accounts/acc-1/convert")))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(movement_json("WITHDRAWAL", 500, 500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let accounts = AccountService::new(test.client.clone());
    let quote = RateQuote { rate: 1.08, as_of };
    let action = PendingAction::convert(&eur_account(1000), "usd", 500, Some(quote)).unwrap();

    accounts.confirm(&action, None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["to_currency"], "USD");
    assert_eq!(body["amount_minor"], "500");
    assert_eq!(body["rate"], 1.08);
    assert_eq!(
        body["rate_timestamp"].as_str().unwrap().parse::<chrono::DateTime<Utc>>().unwrap(),
        as_of
    );
    assert!(body.get("otp_code").is_none());

    server.verify().await;
}

#[tokio::test]
async fn test_close_account_sends_delete_with_otp_field() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(api_path("/accounts/acc-1")))
        .and(body_json(json!({ "otp_code": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": { "id": "acc-1", "status": "CLOSED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let accounts = AccountService::new(test.client.clone());
    let action = PendingAction::close(&eur_account(0)).unwrap();

    match accounts.confirm(&action, None).await.unwrap() {
        ActionOutcome::Closed(closed) => assert_eq!(closed.id, "acc-1"),
        other => panic!("unexpected outcome {other:?}"),
    }

    server.verify().await;
}

#[tokio::test]
async fn test_invalid_otp_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/accounts/acc-1/deposits")))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(error_json("OTP_INVALID", "Invalid code")),
        )
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let accounts = AccountService::new(test.client.clone());
    let action = PendingAction::deposit(&eur_account(0), 100).unwrap();

    let err = accounts.confirm(&action, Some("000000")).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
    assert_eq!(err.otp_challenge(), Some(OtpChallenge::Invalid));
}

#[tokio::test]
async fn test_list_transactions_is_paginated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/accounts/acc-1/transactions")))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [movement_json("DEPOSIT", 100, 100)["transaction"].clone()],
            "total": 6,
            "page": 2,
            "pageSize": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let page = AccountService::new(test.client.clone())
        .list_transactions("acc-1", PageRequest::new(2, 5))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages(), 2);
    assert!(!page.has_next());

    server.verify().await;
}

#[tokio::test]
async fn test_open_currencies_skips_closed_accounts() {
    let server = MockServer::start().await;
    let mut closed = account_json("acc-3", "GBP", json!(0));
    closed["status"] = json!("CLOSED");

    Mock::given(method("GET"))
        .and(path(api_path("/accounts")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [
                account_json("acc-1", "USD", json!("10")),
                account_json("acc-2", "EUR", json!(20)),
                account_json("acc-4", "EUR", json!(5)),
                closed
            ]
        })))
        .mount(&server)
        .await;

    let test = create_test_client(&server, Some(Tokens::new("a1", "r1")));
    let currencies = AccountService::new(test.client.clone())
        .open_currencies()
        .await
        .unwrap();

    assert_eq!(currencies, vec!["EUR".to_string(), "USD".to_string()]);
}
