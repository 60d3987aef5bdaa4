use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use poptimizer_market_data::DEFAULT_MAX_CONNECTIONS;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub dump_dir: String,
    pub http_connections: usize,
    pub tick_interval: Duration,
    pub update_timeout: Duration,
    pub cpi_sheet: String,
    pub status_lookback_days: i64,
    /// Bot token and chat id; the Telegram sink is enabled only with both.
    pub telegram: Option<(String, String)>,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr = parse_var("POPT_LISTEN_ADDR", "127.0.0.1:10000")?;
        let db_path = var_or("POPT_DB_PATH", "./db/poptimizer.db");
        let dump_dir = var_or("POPT_DUMP_DIR", "./dump");
        let http_connections = parse_var(
            "POPT_HTTP_CONNECTIONS",
            &DEFAULT_MAX_CONNECTIONS.to_string(),
        )?;
        let tick_secs: u64 = parse_var("POPT_TICK_INTERVAL_SECS", "60")?;
        let timeout_secs: u64 = parse_var("POPT_UPDATE_TIMEOUT_SECS", "300")?;
        let cpi_sheet = var_or("POPT_CPI_SHEET", "01");
        let status_lookback_days = parse_var("POPT_STATUS_LOOKBACK_DAYS", "14")?;
        let telegram = match (
            std::env::var("POPT_TELEGRAM_TOKEN"),
            std::env::var("POPT_TELEGRAM_CHAT_ID"),
        ) {
            (Ok(token), Ok(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some((token, chat_id))
            }
            _ => None,
        };
        let log_format = var_or("POPT_LOG_FORMAT", "text");

        Ok(Self {
            listen_addr,
            db_path,
            dump_dir,
            http_connections,
            tick_interval: Duration::from_secs(tick_secs),
            update_timeout: Duration::from_secs(timeout_secs),
            cpi_sheet,
            status_lookback_days,
            telegram,
            log_format,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(name, default)
        .parse()
        .with_context(|| format!("Invalid {name}"))
}
