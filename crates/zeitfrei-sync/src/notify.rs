//! Revocation notices.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use zeitfrei_types::{UserId, defaults};

use crate::error::{Result, SyncError};
use crate::report::DeauthReport;

/// A user revoked the application and was deauthorized.
#[derive(Debug, Clone, Serialize)]
pub struct RevocationNotice {
    pub user_id: UserId,
    pub username: String,
    /// Provider response that signalled the revocation.
    pub reason: String,
    pub report: DeauthReport,
    pub at: DateTime<Utc>,
}

impl RevocationNotice {
    /// One-line human summary. Carries no token material.
    pub fn summary(&self) -> String {
        format!(
            "User {} ({}) revoked authorization at {}; roles reversed in {} guild(s), {} failure(s)",
            self.username,
            self.user_id,
            self.at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.report.guilds.len(),
            self.report.failures(),
        )
    }
}

/// Where revocation notices go.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn notify_revoked(&self, notice: &RevocationNotice) -> Result<()>;
}

/// Shared notifier for use across async contexts.
pub type SharedNotifier = Arc<dyn Notifier>;

/// Writes notices to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_revoked(&self, notice: &RevocationNotice) -> Result<()> {
        tracing::warn!(user_id = %notice.user_id, reason = %notice.reason, "{}", notice.summary());
        Ok(())
    }
}

/// Posts notices to a Discord webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            timeout: defaults::request_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for WebhookNotifier {
    // Webhook URLs embed their own credential.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_revoked(&self, notice: &RevocationNotice) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "content": notice.summary() }))
            .send()
            .await
            .map_err(|e| SyncError::Notify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Notify(format!("webhook returned {}: {}", status, body)));
        }

        tracing::debug!(user_id = %notice.user_id, "Revocation notice delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    fn notice() -> RevocationNotice {
        RevocationNotice {
            user_id: UserId(80351110224678912),
            username: "nelly".to_string(),
            reason: "HTTP 400: invalid_grant".to_string(),
            report: DeauthReport {
                user_id: UserId(80351110224678912),
                credential_deleted: true,
                guilds: Vec::new(),
            },
            at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_names_user() {
        let summary = notice().summary();
        assert!(summary.contains("nelly"));
        assert!(summary.contains("80351110224678912"));
    }

    #[tokio::test]
    async fn test_webhook_posts_content() {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
        let sink = Arc::clone(&received);
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(body);
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let notifier = WebhookNotifier::new(reqwest::Client::new(), format!("http://{}/hook", addr));
        notifier.notify_revoked(&notice()).await.unwrap();

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert!(received[0]["content"].as_str().unwrap().contains("revoked authorization"));
    }

    #[tokio::test]
    async fn test_webhook_failure_is_reported() {
        let notifier = WebhookNotifier::new(reqwest::Client::new(), "http://127.0.0.1:1/hook")
            .with_timeout(Duration::from_secs(2));
        let err = notifier.notify_revoked(&notice()).await.unwrap_err();
        assert!(matches!(err, SyncError::Notify(_)));
    }
}
