use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use poptimizer_core::data::{DividendCompareRow, RawDividend};

use crate::{error::ApiResult, main_lib::AppState};

/// User dividends of a ticker marked against the source.
async fn get_dividends(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DividendCompareRow>>> {
    let rows = state.raw_edit_service.get_dividends(&ticker).await?;
    Ok(Json(rows))
}

async fn save_dividends(
    Path(ticker): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(rows): Json<Vec<RawDividend>>,
) -> ApiResult<StatusCode> {
    state.raw_edit_service.save(&ticker, rows).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/raw/{ticker}", get(get_dividends).put(save_dividends))
}
