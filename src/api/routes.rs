//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, FromRequest, FromRequestParts, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Account, LedgerEntry, OperationContext, Passbook};
use crate::error::{AppError, AppResult};
use crate::handlers::{
    DepositCommand, RegisterCommand, TransferCommand, WithdrawCommand,
};
use crate::store::Store;

use super::AppState;

// =========================================================================
// Extractors
// =========================================================================

/// JSON body whose rejections render as `{"error": ...}`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejections render as `{"error": ...}`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Opening balance
    #[serde(default)]
    pub balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of deposit and withdraw
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyRequest {
    pub customer_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_customer_id: i64,
    pub to_customer_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub customer_id: i64,
    pub username: String,
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugHistoryResponse {
    pub customer_id: i64,
    pub transaction_count: usize,
    pub transactions: Vec<LedgerEntry>,
    pub timestamp: DateTime<Utc>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
///
/// `debug_routes` adds the raw ledger dump used during development.
pub fn create_router<S: Store>(debug_routes: bool) -> Router<AppState<S>> {
    let customers = Router::new()
        .route("/register", post(register::<S>))
        .route("/login", post(login::<S>))
        .route("/:id", get(get_customer::<S>))
        .route("/username/:username", get(get_customer_by_username::<S>))
        .route("/:id/balance", get(get_balance::<S>));

    let mut transactions = Router::new()
        .route("/deposit", post(deposit::<S>))
        .route("/withdraw", post(withdraw::<S>))
        .route("/transfer", post(transfer::<S>))
        .route("/customer/:customer_id", get(get_history::<S>))
        .route("/customer/:customer_id/passbook", get(get_passbook::<S>))
        .route("/:transaction_id", get(get_transaction::<S>));

    if debug_routes {
        transactions = transactions.route(
            "/debug/customer/:customer_id",
            get(debug_customer_transactions::<S>),
        );
    }

    Router::new()
        .nest("/customers", customers)
        .nest("/transactions", transactions)
}

fn context_of(context: Option<Extension<OperationContext>>) -> OperationContext {
    context.map(|Extension(ctx)| ctx).unwrap_or_default()
}

// =========================================================================
// Customers
// =========================================================================

/// POST /api/customers/register
async fn register<S: Store>(
    State(state): State<AppState<S>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Account>)> {
    let mut command = RegisterCommand::new(
        request.username,
        request.email,
        request.password,
        request.first_name,
        request.last_name,
    );
    if let Some(phone_number) = request.phone_number {
        command = command.with_phone_number(phone_number);
    }
    if let Some(balance) = request.balance {
        command = command.with_opening_balance(balance);
    }

    let account = state.directory.register(command).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /api/customers/login
async fn login<S: Store>(
    State(state): State<AppState<S>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<Account>> {
    let account = state
        .directory
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(account))
}

/// GET /api/customers/:id
async fn get_customer<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Account>> {
    Ok(Json(state.directory.get_by_id(id).await?))
}

/// GET /api/customers/username/:username
async fn get_customer_by_username<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<Json<Account>> {
    Ok(Json(state.directory.get_by_username(&username).await?))
}

/// GET /api/customers/:id/balance
async fn get_balance<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<BalanceResponse>> {
    let account = state.directory.get_by_id(id).await?;

    Ok(Json(BalanceResponse {
        customer_id: account.id,
        username: account.username,
        balance: account.balance,
    }))
}

// =========================================================================
// Transactions
// =========================================================================

/// POST /api/transactions/deposit
async fn deposit<S: Store>(
    State(state): State<AppState<S>>,
    context: Option<Extension<OperationContext>>,
    ApiJson(request): ApiJson<MoneyRequest>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    let mut command = DepositCommand::new(request.customer_id, request.amount);
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    let entry = state.money.deposit(command, &context_of(context)).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/transactions/withdraw
async fn withdraw<S: Store>(
    State(state): State<AppState<S>>,
    context: Option<Extension<OperationContext>>,
    ApiJson(request): ApiJson<MoneyRequest>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    let mut command = WithdrawCommand::new(request.customer_id, request.amount);
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    let entry = state.money.withdraw(command, &context_of(context)).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/transactions/transfer
///
/// Responds with the debit entry followed by the credit entry.
async fn transfer<S: Store>(
    State(state): State<AppState<S>>,
    context: Option<Extension<OperationContext>>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> AppResult<(StatusCode, Json<Vec<LedgerEntry>>)> {
    let mut command = TransferCommand::new(
        request.from_customer_id,
        request.to_customer_id,
        request.amount,
    );
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    let entries = state.money.transfer(command, &context_of(context)).await?;

    Ok((StatusCode::CREATED, Json(entries.to_vec())))
}

/// GET /api/transactions/customer/:customer_id
async fn get_history<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(customer_id): ApiPath<i64>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    Ok(Json(state.money.history(customer_id).await?))
}

/// GET /api/transactions/customer/:customer_id/passbook
async fn get_passbook<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(customer_id): ApiPath<i64>,
) -> AppResult<Json<Passbook>> {
    Ok(Json(state.money.passbook(customer_id).await?))
}

/// GET /api/transactions/:transaction_id
async fn get_transaction<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(transaction_id): ApiPath<i64>,
) -> AppResult<Json<LedgerEntry>> {
    Ok(Json(state.money.entry(transaction_id).await?))
}

/// GET /api/transactions/debug/customer/:customer_id
async fn debug_customer_transactions<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(customer_id): ApiPath<i64>,
) -> AppResult<Json<DebugHistoryResponse>> {
    let transactions = state.money.history(customer_id).await?;

    tracing::debug!(
        customer_id,
        count = transactions.len(),
        "Debug ledger dump"
    );

    Ok(Json(DebugHistoryResponse {
        customer_id,
        transaction_count: transactions.len(),
        transactions,
        timestamp: Utc::now(),
    }))
}
