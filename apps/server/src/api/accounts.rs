use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use poptimizer_core::data::DATE_FORMAT;
use poptimizer_core::portfolio::Portfolio;
use poptimizer_core::utc_midnight;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Deserialize)]
struct NewAccount {
    name: String,
}

#[derive(Deserialize)]
struct Amount {
    amount: i64,
}

async fn list_accounts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let names = state.account_service.list_accounts().await?;
    Ok(Json(names))
}

async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(account): Json<NewAccount>,
) -> ApiResult<StatusCode> {
    state.account_service.create_account(&account.name).await?;
    Ok(StatusCode::CREATED)
}

async fn get_account(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Portfolio>> {
    let account = state.account_service.get_account(&name).await?;
    Ok(Json(account))
}

async fn delete_account(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.account_service.delete_account(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_amount(
    Path((name, ticker)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Amount>,
) -> ApiResult<StatusCode> {
    state
        .account_service
        .set_amount(&name, &ticker, body.amount)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_portfolio(
    Path(date): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Portfolio>> {
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| ApiError::BadRequest(format!("wrong date {date}: {e}")))?;
    let portfolio = state
        .account_service
        .get_portfolio(utc_midnight(date))
        .await?;
    Ok(Json(portfolio))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{name}", get(get_account).delete(delete_account))
        .route("/accounts/{name}/{ticker}", put(set_amount))
        .route("/portfolio/{date}", get(get_portfolio))
}
