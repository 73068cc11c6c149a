/// Telegram notification boundary.
///
/// The monitor only depends on the `Notify` trait; the Telegram client
/// behind it is plumbing. Sends are best-effort at every call site: a
/// failed delivery is logged and never aborts the monitor.
use crate::config::TelegramConfig;
use std::time::Duration;

/// Errors from a single notification attempt.
#[derive(Debug)]
pub enum NotifyError {
    /// Building the HTTP client or performing the request failed.
    Http { source: reqwest::Error },
    /// Telegram accepted the request but rejected the message.
    Api { description: String },
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Http { source } => write!(f, "notification request failed: {}", source),
            NotifyError::Api { description } => {
                write!(f, "notification rejected: {}", description)
            }
        }
    }
}

impl std::error::Error for NotifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NotifyError::Http { source } => Some(source),
            NotifyError::Api { .. } => None,
        }
    }
}

/// Outbound message channel the monitor loop talks to.
pub trait Notify {
    fn send(&self, text: &str) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Sends messages through the Telegram bot API.
///
/// When constructed without credentials the notifier is disabled:
/// every send becomes a logged no-op and the watchdog still runs.
pub struct TelegramNotifier {
    credentials: Option<TelegramConfig>,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(credentials: Option<TelegramConfig>) -> Result<Self, NotifyError> {
        Self::with_api_base(credentials, "https://api.telegram.org".to_string())
    }

    fn with_api_base(
        credentials: Option<TelegramConfig>,
        api_base: String,
    ) -> Result<Self, NotifyError> {
        if credentials.is_none() {
            tracing::warn!("telegram credentials not set, notifications disabled");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| NotifyError::Http { source: e })?;
        Ok(Self {
            credentials,
            client,
            api_base,
        })
    }

    pub fn enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

impl Notify for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let Some(creds) = &self.credentials else {
            tracing::debug!(text, "notifications disabled, dropping message");
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, creds.bot_token);
        let response = self
            .client
            .post(&url)
            .form(&[("chat_id", creds.chat_id.as_str()), ("text", text)])
            .send()
            .await
            .map_err(|e| NotifyError::Http { source: e })?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NotifyError::Http { source: e })?;

        if body.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            tracing::debug!("notification delivered");
            Ok(())
        } else {
            let description = body
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("no description in response")
                .to_string();
            Err(NotifyError::Api { description })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_notifier_send_is_ok() {
        let notifier = TelegramNotifier::new(None).unwrap();
        assert!(!notifier.enabled());
        notifier.send("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_to_unreachable_endpoint_is_http_error() {
        let creds = TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
        };
        // Port 1 on loopback, nothing listens there
        let notifier = TelegramNotifier::with_api_base(
            Some(creds),
            "http://127.0.0.1:1".to_string(),
        )
        .unwrap();
        let err = notifier.send("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Http { .. }));
    }

    #[test]
    fn test_notify_error_display() {
        let err = NotifyError::Api {
            description: "chat not found".to_string(),
        };
        assert_eq!(err.to_string(), "notification rejected: chat not found");
    }
}
