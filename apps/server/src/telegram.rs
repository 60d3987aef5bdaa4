//! Error sink that forwards update failures to a Telegram chat.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use poptimizer_core::errors::Error;
use poptimizer_core::events::ErrorSink;
use poptimizer_market_data::HttpGetter;
use tokio::runtime::Handle;

const API_URL: &str = "https://api.telegram.org/bot";
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TelegramSink {
    getter: Arc<dyn HttpGetter>,
    token: String,
    chat_id: String,
}

impl TelegramSink {
    /// Checks that the bot can reach the chat.
    pub async fn new(
        getter: Arc<dyn HttpGetter>,
        token: String,
        chat_id: String,
    ) -> anyhow::Result<Self> {
        let url = format!(
            "{API_URL}{token}/getChat?chat_id={}",
            urlencoding::encode(&chat_id)
        );
        let response = getter
            .get(&url, &[])
            .await
            .context("can't reach telegram")?;
        if response.status != 200 {
            bail!("telegram getChat failed with status {}", response.status);
        }

        Ok(Self {
            getter,
            token,
            chat_id,
        })
    }

    fn message_url(&self, text: &str) -> String {
        format!(
            "{API_URL}{}/SendMessage?chat_id={}&text={}&disable_web_page_preview=true&parse_mode=MarkdownV2",
            self.token,
            urlencoding::encode(&self.chat_id),
            urlencoding::encode(&escape_markdown(text)),
        )
    }
}

impl ErrorSink for TelegramSink {
    fn report(&self, error: &Error) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("no runtime to send telegram message: {error}");
            return;
        };

        let url = self.message_url(&error.to_string());
        let getter = self.getter.clone();

        handle.spawn(async move {
            match tokio::time::timeout(DISPATCH_TIMEOUT, getter.get(&url, &[])).await {
                Ok(Ok(response)) if response.status == 200 => {}
                Ok(Ok(response)) => {
                    tracing::warn!("telegram message rejected with status {}", response.status)
                }
                Ok(Err(err)) => tracing::warn!("can't send telegram message: {err}"),
                Err(_) => tracing::warn!("telegram message timed out"),
            }
        });
    }
}

/// Escapes MarkdownV2 control characters.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '[' | '!' | '(' | ')' | '-' | '_' | '.' | '>' | '{' | '}' | '=' | '+'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
