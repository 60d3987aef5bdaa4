use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use poptimizer_core::data::SelectedTicker;
use serde::Deserialize;

use crate::{error::ApiResult, main_lib::AppState};

#[derive(Deserialize)]
struct Selection {
    selected: bool,
}

async fn list_securities(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SelectedTicker>>> {
    let tickers = state.securities_edit_service.get().await?;
    Ok(Json(tickers))
}

async fn set_selected(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Selection>,
) -> ApiResult<StatusCode> {
    state
        .securities_edit_service
        .set_selected(&ticker, body.selected)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/securities", get(list_securities))
        .route("/securities/{ticker}/selected", put(set_selected))
}
