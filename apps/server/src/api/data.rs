use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use poptimizer_core::QualifiedId;

use crate::{error::ApiResult, main_lib::AppState};

/// Stored payload of any aggregate, as is.
async fn get_json(
    Path((sub, group, id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let json = state
        .viewer
        .get_json(&QualifiedId::new(sub, group, id))
        .await?;

    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/data/{sub}/{group}/{id}", get(get_json))
}
