//! API Integration Tests
//!
//! Drive the full router over an in-memory store.

use axum::http::StatusCode;
use serde_json::json;

use virtual_bank::{build_router, AppState, MemoryStore, RouterOptions};

mod common;

use common::{memory_app, register, send};

#[tokio::test]
async fn test_health() {
    let (app, _) = memory_app();

    let response = send(&app, "GET", "/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");
}

#[tokio::test]
async fn test_banking_flow_e2e() {
    let (app, _) = memory_app();
    let u1 = register(&app, "alice", "Alice", "Smith").await;
    let u2 = register(&app, "bob", "Bob", "Jones").await;

    // 1. Deposit 100 to U1
    let response = send(
        &app,
        "POST",
        "/api/transactions/deposit",
        Some(json!({ "customerId": u1, "amount": "100" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["type"], "DEPOSIT");
    assert_eq!(response.body["amount"], "100.00");
    assert_eq!(response.body["balanceAfterTransaction"], "100.00");
    assert_eq!(response.body["description"], "Money deposited");
    assert_eq!(response.body["customerId"], u1);

    // 2. Withdraw 30
    let response = send(
        &app,
        "POST",
        "/api/transactions/withdraw",
        Some(json!({ "customerId": u1, "amount": 30, "description": "Groceries" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["type"], "WITHDRAWAL");
    assert_eq!(response.body["balanceAfterTransaction"], "70.00");
    assert_eq!(response.body["description"], "Groceries");

    // 3. Transfer 50 from U1 to U2
    let response = send(
        &app,
        "POST",
        "/api/transactions/transfer",
        Some(json!({ "fromCustomerId": u1, "toCustomerId": u2, "amount": "50" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let entries = response.body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["type"], "WITHDRAWAL");
    assert_eq!(entries[0]["customerId"], u1);
    assert_eq!(entries[0]["balanceAfterTransaction"], "20.00");
    assert_eq!(entries[0]["description"], "Transfer to Bob Jones");
    assert_eq!(entries[1]["type"], "DEPOSIT");
    assert_eq!(entries[1]["customerId"], u2);
    assert_eq!(entries[1]["balanceAfterTransaction"], "50.00");
    assert_eq!(entries[1]["description"], "Transfer from Alice Smith");

    // 4. Overdraw attempt is rejected
    let response = send(
        &app,
        "POST",
        "/api/transactions/withdraw",
        Some(json!({ "customerId": u1, "amount": 999 })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["error"],
        "Insufficient balance. Available balance: 20.00"
    );
    assert_eq!(response.body["error_code"], "insufficient_funds");

    // 5. Balances
    let response = send(&app, "GET", &format!("/api/customers/{}/balance", u1), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["customerId"], u1);
    assert_eq!(response.body["username"], "alice");
    assert_eq!(response.body["balance"], "20.00");

    let response = send(&app, "GET", &format!("/api/customers/{}/balance", u2), None).await;
    assert_eq!(response.body["balance"], "50.00");

    // 6. History, newest first
    let response = send(
        &app,
        "GET",
        &format!("/api/transactions/customer/{}", u1),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let types: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["WITHDRAWAL", "WITHDRAWAL", "DEPOSIT"]);

    // 7. Passbook
    let response = send(
        &app,
        "GET",
        &format!("/api/transactions/customer/{}/passbook", u1),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["customerName"], "Alice Smith");
    assert_eq!(response.body["currentBalance"], "20.00");
    assert_eq!(response.body["totalTransactions"], 3);
    assert_eq!(response.body["transactions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_register_response_hides_password() {
    let (app, _) = memory_app();

    let response = send(
        &app,
        "POST",
        "/api/customers/register",
        Some(json!({
            "username": "jdoe",
            "email": "jdoe@example.com",
            "password": "hunter2",
            "firstName": "Jane",
            "lastName": "Doe",
            "phoneNumber": "555-0100"
        })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body.get("password").is_none());
    assert_eq!(response.body["username"], "jdoe");
    assert_eq!(response.body["phoneNumber"], "555-0100");
    assert_eq!(response.body["balance"], "0.00");
}

#[tokio::test]
async fn test_duplicate_registration() {
    let (app, _) = memory_app();
    register(&app, "alice", "Alice", "Smith").await;

    let response = send(
        &app,
        "POST",
        "/api/customers/register",
        Some(json!({
            "username": "alice",
            "email": "someone-else@example.com",
            "password": "pw",
            "firstName": "A",
            "lastName": "B"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Username already exists: alice");

    let response = send(
        &app,
        "POST",
        "/api/customers/register",
        Some(json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "pw",
            "firstName": "A",
            "lastName": "B"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Email already exists: alice@example.com");
}

#[tokio::test]
async fn test_login() {
    let (app, _) = memory_app();
    let id = register(&app, "alice", "Alice", "Smith").await;

    let response = send(
        &app,
        "POST",
        "/api/customers/login",
        Some(json!({ "username": "alice", "password": "secret" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id);

    let response = send(
        &app,
        "POST",
        "/api/customers/login",
        Some(json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid username or password");
}

#[tokio::test]
async fn test_customer_lookups() {
    let (app, _) = memory_app();
    let id = register(&app, "alice", "Alice", "Smith").await;

    let response = send(&app, "GET", &format!("/api/customers/{}", id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["firstName"], "Alice");

    let response = send(&app, "GET", "/api/customers/username/alice", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id);

    let response = send(&app, "GET", "/api/customers/999", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Customer not found with id: 999");

    let response = send(&app, "GET", "/api/customers/username/ghost", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = send(&app, "GET", "/api/customers/999/balance", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_amounts_rejected() {
    let (app, store) = memory_app();
    let u1 = register(&app, "alice", "Alice", "Smith").await;
    let u2 = register(&app, "bob", "Bob", "Jones").await;

    for amount in [json!(0), json!("-5"), json!("1.005")] {
        let response = send(
            &app,
            "POST",
            "/api/transactions/deposit",
            Some(json!({ "customerId": u1, "amount": amount })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error_code"], "invalid_amount");

        let response = send(
            &app,
            "POST",
            "/api/transactions/transfer",
            Some(json!({ "fromCustomerId": u1, "toCustomerId": u2, "amount": amount })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let response = send(
        &app,
        "POST",
        "/api/transactions/withdraw",
        Some(json!({ "customerId": u1, "amount": 0 })),
    )
    .await;
    assert_eq!(
        response.body["error"],
        "Withdrawal amount must be greater than zero"
    );

    assert_eq!(store.committed_entry_count(), 0);
}

#[tokio::test]
async fn test_self_transfer_rejected() {
    let (app, _) = memory_app();
    let u1 = register(&app, "alice", "Alice", "Smith").await;

    let response = send(
        &app,
        "POST",
        "/api/transactions/transfer",
        Some(json!({ "fromCustomerId": u1, "toCustomerId": u1, "amount": 1 })),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["error"],
        "Cannot transfer money to the same account"
    );
}

#[tokio::test]
async fn test_not_found_during_money_movement() {
    let (app, _) = memory_app();

    let response = send(
        &app,
        "POST",
        "/api/transactions/deposit",
        Some(json!({ "customerId": 4242, "amount": 10 })),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error_code"], "customer_not_found");

    let response = send(&app, "GET", "/api/transactions/9999", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Transaction not found with id: 9999");

    let response = send(&app, "GET", "/api/transactions/customer/4242", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_transaction_by_id() {
    let (app, _) = memory_app();
    let u1 = register(&app, "alice", "Alice", "Smith").await;

    let created = send(
        &app,
        "POST",
        "/api/transactions/deposit",
        Some(json!({ "customerId": u1, "amount": "12.50", "description": "Pocket money" })),
    )
    .await;
    let id = created.body["id"].as_i64().unwrap();

    let response = send(&app, "GET", &format!("/api/transactions/{}", id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, created.body);
}

#[tokio::test]
async fn test_malformed_requests() {
    let (app, _) = memory_app();

    let response = send(
        &app,
        "POST",
        "/api/transactions/deposit",
        Some(json!({ "amount": 10 })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error_code"], "invalid_request");
    assert!(response.body["error"].is_string());

    let response = send(&app, "GET", "/api/customers/not-a-number", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error_code"], "invalid_request");
}

#[tokio::test]
async fn test_correlation_id_echoed() {
    let (app, _) = memory_app();

    let response = send(&app, "GET", "/api/customers/1", None).await;

    let header = response
        .headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(uuid::Uuid::parse_str(header).is_ok());
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let (app, store) = memory_app();
    let u1 = register(&app, "alice", "Alice", "Smith").await;

    store.fail_writes_after(0);
    let response = send(
        &app,
        "POST",
        "/api/transactions/deposit",
        Some(json!({ "customerId": u1, "amount": 10 })),
    )
    .await;
    store.clear_write_failures();

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error_code"], "store_unavailable");
    assert_eq!(response.body["error"], "Service temporarily unavailable");
}

#[tokio::test]
async fn test_overlong_registration_fields_are_bad_requests() {
    let (app, store) = memory_app();

    let response = send(
        &app,
        "POST",
        "/api/customers/register",
        Some(json!({
            "username": "u".repeat(61),
            "email": "long@example.com",
            "password": "secret",
            "firstName": "Long",
            "lastName": "Name"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error_code"], "invalid_customer_data");
    assert_eq!(
        response.body["error"],
        "username must be at most 50 characters"
    );

    let response = send(
        &app,
        "POST",
        "/api/customers/register",
        Some(json!({
            "username": "phone",
            "email": "phone@example.com",
            "password": "secret",
            "firstName": "P",
            "lastName": "H",
            "phoneNumber": "5".repeat(25)
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(store.committed_account(1).is_none());
}

#[tokio::test]
async fn test_exhausted_conflict_retries_are_409() {
    let (app, store) = memory_app();
    let u1 = register(&app, "alice", "Alice", "Smith").await;

    store.interfere_with_next_commits(3);
    let response = send(
        &app,
        "POST",
        "/api/transactions/deposit",
        Some(json!({ "customerId": u1, "amount": 10 })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error_code"], "version_conflict");
    assert_eq!(store.committed_entry_count(), 0);

    let response = send(&app, "GET", &format!("/api/customers/{}/balance", u1), None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_debug_route() {
    let (app, _) = memory_app();
    let u1 = register(&app, "alice", "Alice", "Smith").await;
    send(
        &app,
        "POST",
        "/api/transactions/deposit",
        Some(json!({ "customerId": u1, "amount": 5 })),
    )
    .await;

    let response = send(
        &app,
        "GET",
        &format!("/api/transactions/debug/customer/{}", u1),
        None,
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["customerId"], u1);
    assert_eq!(response.body["transactionCount"], 1);
    assert!(response.body["timestamp"].is_string());
}

#[tokio::test]
async fn test_debug_route_disabled_in_production() {
    let options = RouterOptions {
        debug_routes: false,
        ..RouterOptions::default()
    };
    let app = build_router(AppState::new(MemoryStore::new()), &options);

    let response = send(&app, "GET", "/api/transactions/debug/customer/1", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
