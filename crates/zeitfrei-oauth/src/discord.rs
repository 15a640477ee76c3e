//! Discord OAuth2 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use zeitfrei_types::{TokenGrant, UserProfile, defaults};

use crate::error::ProviderError;
use crate::provider::IdentityProvider;

/// OAuth application settings for Discord.
#[derive(Clone)]
pub struct DiscordOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// API root, e.g. `https://discord.com/api`. Overridable for tests.
    pub api_base: String,
    pub timeout: Duration,
}

impl DiscordOAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            api_base: defaults::DISCORD_API_BASE.to_string(),
            timeout: defaults::request_timeout(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base.trim_end_matches('/'))
    }

    fn me_url(&self) -> String {
        format!("{}/users/@me", self.api_base.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for DiscordOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordOAuthConfig")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// [`IdentityProvider`] backed by Discord's OAuth2 endpoints.
///
/// The `reqwest::Client` is injected so the whole process shares one
/// connection pool.
#[derive(Debug, Clone)]
pub struct DiscordOAuthClient {
    http: reqwest::Client,
    config: DiscordOAuthConfig,
}

impl DiscordOAuthClient {
    pub fn new(http: reqwest::Client, config: DiscordOAuthConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &DiscordOAuthConfig {
        &self.config
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant, ProviderError> {
        let response = self
            .http
            .post(self.config.token_url())
            .timeout(self.config.timeout)
            .form(form)
            .send()
            .await?;

        parse_response(response).await
    }
}

#[async_trait]
impl IdentityProvider for DiscordOAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        tracing::debug!("Refreshing access token");
        self.post_token(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        tracing::debug!("Exchanging authorization code");
        self.post_token(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    async fn current_user(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let response = self
            .http
            .get(self.config.me_url())
            .timeout(self.config.timeout)
            .bearer_auth(access_token)
            .send()
            .await?;

        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ProviderError::from_status(status, body));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::Transient(format!("Failed to parse provider response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Form, Json, Router,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
    };
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn token_handler(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
        match (form.get("grant_type").map(String::as_str), form.get("refresh_token").map(String::as_str)) {
            (Some("refresh_token"), Some("good")) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "access_token": "new-access",
                    "refresh_token": "new-refresh",
                    "expires_in": 604800,
                    "token_type": "Bearer",
                    "scope": "identify guilds.join"
                })),
            ),
            (Some("refresh_token"), Some("revoked")) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "invalid_grant"})),
            ),
            (Some("refresh_token"), Some("slow")) => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                (StatusCode::OK, Json(serde_json::json!({})))
            }
            (Some("authorization_code"), _) if form.get("code").map(String::as_str) == Some("abc") => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "access_token": "code-access",
                    "refresh_token": "code-refresh",
                    "expires_in": 3600,
                    "token_type": "Bearer",
                    "scope": "identify"
                })),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"message": "boom"})),
            ),
        }
    }

    async fn me_handler(headers: HeaderMap) -> impl IntoResponse {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer code-access");
        if authorized {
            (
                StatusCode::OK,
                Json(serde_json::json!({"id": "80351110224678912", "username": "nelly", "discriminator": "1337"})),
            )
        } else {
            (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"message": "401: Unauthorized"})))
        }
    }

    async fn stub_client(timeout: Duration) -> DiscordOAuthClient {
        let app = Router::new()
            .route("/oauth2/token", post(token_handler))
            .route("/users/@me", get(me_handler));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let config = DiscordOAuthConfig::new("client", "secret", "http://localhost/callback")
            .with_api_base(format!("http://{}", addr))
            .with_timeout(timeout);
        DiscordOAuthClient::new(reqwest::Client::new(), config)
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let client = stub_client(Duration::from_secs(5)).await;
        let grant = client.refresh("good").await.unwrap();
        assert_eq!(grant.access_token, "new-access");
        assert_eq!(grant.refresh_token, "new-refresh");
        assert_eq!(grant.expires_in, 604800);
    }

    #[tokio::test]
    async fn test_refresh_invalid_grant_is_rejected() {
        let client = stub_client(Duration::from_secs(5)).await;
        let err = client.refresh("revoked").await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_refresh_server_error_is_transient() {
        let client = stub_client(Duration::from_secs(5)).await;
        let err = client.refresh("unknown").await.unwrap_err();
        assert!(matches!(err, ProviderError::Transient(_)));
    }

    #[tokio::test]
    async fn test_refresh_timeout_is_transient() {
        let client = stub_client(Duration::from_millis(100)).await;
        let err = client.refresh("slow").await.unwrap_err();
        assert!(matches!(err, ProviderError::Transient(_)));
    }

    #[tokio::test]
    async fn test_exchange_code_and_fetch_profile() {
        let client = stub_client(Duration::from_secs(5)).await;
        let grant = client.exchange_code("abc").await.unwrap();
        assert_eq!(grant.access_token, "code-access");

        let profile = client.current_user(&grant.access_token).await.unwrap();
        assert_eq!(profile.id.get(), 80351110224678912);
        assert_eq!(profile.discriminator, "1337");

        let err = client.current_user("stale").await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transient() {
        let config = DiscordOAuthConfig::new("client", "secret", "http://localhost/callback")
            .with_api_base("http://127.0.0.1:1")
            .with_timeout(Duration::from_secs(2));
        let client = DiscordOAuthClient::new(reqwest::Client::new(), config);

        let err = client.refresh("good").await.unwrap_err();
        assert!(matches!(err, ProviderError::Transient(_)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = DiscordOAuthConfig::new("client", "super-secret", "http://localhost/callback");
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
