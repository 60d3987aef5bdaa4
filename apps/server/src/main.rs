use poptimizer_server::{api::app_router, build_state, config::Config, init_tracing};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_format);

    let (state, mut updater) = build_state(&config).await?;
    updater.init().await?;

    let token = CancellationToken::new();
    let updater_task = tokio::spawn(updater.run(config.tick_interval, token.clone()));

    let router = app_router(state);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(token.clone()))
        .await?;

    token.cancel();
    updater_task.await?;
    tracing::info!("stopped");

    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!("can't listen for shutdown signal: {err}");
            }
            tracing::info!("shutdown signal received");
        }
        _ = token.cancelled() => {}
    }
    token.cancel();
}
