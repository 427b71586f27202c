use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use skylane_loyalty::account::MilesAccount;
use skylane_loyalty::transaction::{MilesTransaction, TransactionType};
use skylane_shared::{MilesUpdateEvent, MILES_UPDATES_TOPIC};

use crate::error::AppError;
use crate::middleware::auth::{AirlinePartner, GatewayUser};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/miles-smiles/enroll", post(enroll))
        .route("/miles-smiles/account", get(my_account))
        .route("/miles-smiles/transactions", get(my_transactions))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/miles-smiles/add-miles", post(add_miles))
}

pub fn partner_routes() -> Router<AppState> {
    Router::new().route("/miles-smiles/external/add-miles", post(external_add_miles))
}

/// POST /miles-smiles/enroll
async fn enroll(
    State(state): State<AppState>,
    Extension(user): Extension<GatewayUser>,
) -> Result<(StatusCode, Json<MilesAccount>), AppError> {
    state.sync_user(&user).await?;
    let account = state.ledger.enroll(user.id).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Serialize)]
struct AccountResponse {
    account: MilesAccount,
    miles_balance: Decimal,
}

/// GET /miles-smiles/account
async fn my_account(
    State(state): State<AppState>,
    Extension(user): Extension<GatewayUser>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state
        .ledger
        .account_for_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No miles account for this user".to_string()))?;
    let miles_balance = account.miles_balance;
    Ok(Json(AccountResponse {
        account,
        miles_balance,
    }))
}

/// GET /miles-smiles/transactions
async fn my_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<GatewayUser>,
) -> Result<Json<Vec<MilesTransaction>>, AppError> {
    let account = state
        .ledger
        .account_for_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No miles account for this user".to_string()))?;
    let transactions = state.ledger.transactions(account.id).await?;
    Ok(Json(transactions))
}

#[derive(Debug, Deserialize)]
pub struct AddMilesRequest {
    pub member_number: String,
    pub miles: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddMilesResponse {
    member_number: String,
    new_balance: Decimal,
}

/// POST /miles-smiles/add-miles
async fn add_miles(
    State(state): State<AppState>,
    Json(req): Json<AddMilesRequest>,
) -> Result<Json<AddMilesResponse>, AppError> {
    let account = find_member(&state, &req.member_number).await?;
    let description = req
        .description
        .unwrap_or_else(|| "Manual miles adjustment".to_string());

    let update = state
        .ledger
        .credit(
            account.id,
            req.miles,
            TransactionType::Adjustment,
            description.clone(),
            None,
            None,
        )
        .await?;

    notify_balance_change(&state, &update.account, req.miles, None, description).await;

    Ok(Json(AddMilesResponse {
        member_number: update.account.member_number.clone(),
        new_balance: update.account.miles_balance,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExternalAddMilesRequest {
    pub member_number: String,
    pub miles: Decimal,
}

/// POST /miles-smiles/external/add-miles
async fn external_add_miles(
    State(state): State<AppState>,
    Extension(partner): Extension<AirlinePartner>,
    Json(req): Json<ExternalAddMilesRequest>,
) -> Result<Json<AddMilesResponse>, AppError> {
    let account = find_member(&state, &req.member_number).await?;
    let description = format!("Partner miles from {}", partner.code);

    let update = state
        .ledger
        .credit(
            account.id,
            req.miles,
            TransactionType::Earn,
            description.clone(),
            None,
            None,
        )
        .await?;

    notify_balance_change(
        &state,
        &update.account,
        req.miles,
        Some(partner.code),
        description,
    )
    .await;

    Ok(Json(AddMilesResponse {
        member_number: update.account.member_number.clone(),
        new_balance: update.account.miles_balance,
    }))
}

async fn find_member(state: &AppState, member_number: &str) -> Result<MilesAccount, AppError> {
    state
        .ledger
        .account_by_member_number(member_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member not found: {}", member_number)))
}

/// Best-effort miles-update notification; a queue failure never fails the
/// request.
async fn notify_balance_change(
    state: &AppState,
    account: &MilesAccount,
    miles_delta: Decimal,
    airline_code: Option<String>,
    reason: String,
) {
    let email = match state.users.find(account.user_id).await {
        Ok(Some(user)) => user.email,
        Ok(None) => {
            error!(
                "No user record for member {}, skipping notification",
                account.member_number
            );
            return;
        }
        Err(err) => {
            error!("Failed to load user for notification: {}", err);
            return;
        }
    };

    let event = MilesUpdateEvent {
        member_id: account.id,
        email,
        miles_delta,
        new_balance: account.miles_balance,
        flight_id: None,
        airline_code,
        reason: Some(reason),
        enqueued_at: Utc::now().timestamp(),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => {
            if let Err(err) = state
                .events
                .publish(MILES_UPDATES_TOPIC, &account.member_number, &payload)
                .await
            {
                error!(
                    "Failed to enqueue miles update for {}: {}",
                    account.member_number, err
                );
            }
        }
        Err(err) => error!("Failed to serialize miles update event: {}", err),
    }
}
