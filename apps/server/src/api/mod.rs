use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::main_lib::AppState;

mod accounts;
mod data;
mod health;
mod raw;
mod securities;

pub fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(data::router())
        .merge(accounts::router())
        .merge(raw::router())
        .merge(securities::router());

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
