use std::sync::Arc;

use crate::config::Config;
use crate::telegram::TelegramSink;
use poptimizer_core::{
    data::{RawEditService, SecuritiesEditService},
    events::{CompositeSink, ErrorSink, LogSink},
    portfolio::{AccountService, AccountServiceTrait},
    updater::{UpdateService, UpdaterSettings, Updaters},
    utils::{Clock, SystemClock},
    JsonViewerTrait,
};
use poptimizer_market_data::{HttpGetter, ReqwestGetter};
use poptimizer_storage_sqlite::{db, DocumentRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub account_service: Arc<dyn AccountServiceTrait>,
    pub viewer: Arc<dyn JsonViewerTrait>,
    pub raw_edit_service: Arc<RawEditService>,
    pub securities_edit_service: Arc<SecuritiesEditService>,
}

pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Opens the store and wires the API state and the updater around it.
///
/// The updater is returned uninitialized; `UpdateService::init` restores the
/// user groups and must succeed before it runs.
pub async fn build_state(config: &Config) -> anyhow::Result<(Arc<AppState>, UpdateService)> {
    db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", config.db_path);

    let pool = db::create_pool(&config.db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());
    let store = Arc::new(DocumentRepository::new(
        pool,
        writer,
        config.dump_dir.clone(),
    ));

    let getter: Arc<dyn HttpGetter> = Arc::new(ReqwestGetter::new(config.http_connections)?);

    let mut sinks: Vec<Arc<dyn ErrorSink>> = vec![Arc::new(LogSink)];
    if let Some((token, chat_id)) = &config.telegram {
        let telegram = TelegramSink::new(getter.clone(), token.clone(), chat_id.clone()).await?;
        sinks.push(Arc::new(telegram));
        tracing::info!("telegram notifications enabled");
    }
    let sink: Arc<dyn ErrorSink> = Arc::new(CompositeSink::new(sinks));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = UpdaterSettings {
        concurrency: config.http_connections,
        cpi_sheet: config.cpi_sheet.clone(),
        status_lookback_days: config.status_lookback_days,
        timeout: config.update_timeout,
    };
    let updaters = Updaters::build(store.clone(), getter, clock.clone(), sink.clone(), &settings);
    let updater = UpdateService::new(updaters, store.clone(), clock, sink, settings.timeout);

    let state = Arc::new(AppState {
        account_service: Arc::new(AccountService::new(store.clone())),
        viewer: store.clone(),
        raw_edit_service: Arc::new(RawEditService::new(
            store.clone(),
            store.clone(),
            store.clone(),
        )),
        securities_edit_service: Arc::new(SecuritiesEditService::new(store.clone(), store)),
    });

    Ok((state, updater))
}
