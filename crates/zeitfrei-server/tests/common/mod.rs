//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response},
};
use chrono::{Duration, Utc};
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use zeitfrei_oauth::MockIdentityProvider;
use zeitfrei_server::{API_KEY_HEADER, ApiKey, Server, ServerConfig};
use zeitfrei_store::Database;
use zeitfrei_sync::{Gatekeeper, MockGuildApi, SyncOptions};
use zeitfrei_types::{GuildId, GuildRoleMapping, RoleId, UserCredential, UserId};

pub const API_KEY: &str = "test-api-key";
pub const HOME_GUILD: GuildId = GuildId(1000);

/// A router wired to in-memory storage and scripted Discord boundaries.
pub struct TestApp {
    pub router: Router,
    pub gatekeeper: Gatekeeper,
    pub provider: Arc<MockIdentityProvider>,
    pub guild_api: Arc<MockGuildApi>,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let provider = Arc::new(MockIdentityProvider::new());
        let guild_api = Arc::new(MockGuildApi::new());
        let gatekeeper = Gatekeeper::new(db, provider.clone(), guild_api.clone(), SyncOptions::new(HOME_GUILD));

        let config = ServerConfig::new(vec![ApiKey::new("music", API_KEY)]);
        let router = Server::new(gatekeeper.clone(), config).router();

        Self {
            router,
            gatekeeper,
            provider,
            guild_api,
        }
    }

    /// Store a user whose token expires `hours` from now (negative: expired).
    pub fn store_user(&self, id: u64, hours: i64) -> UserCredential {
        let credential = UserCredential {
            user_id: UserId(id),
            username: "nelly".to_string(),
            discriminator: "0".to_string(),
            access_token: "user-access".to_string(),
            refresh_token: "user-refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(hours),
        };
        self.gatekeeper.tokens().upsert(&credential).unwrap();
        credential
    }

    pub fn add_mapping(&self, guild: u64, unauth: u64, auth: u64) {
        self.gatekeeper
            .guilds()
            .add_mapping(&GuildRoleMapping::new(GuildId(guild), RoleId(unauth), RoleId(auth), 30))
            .unwrap();
    }

    /// Send an authenticated request.
    pub async fn send(&self, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
        self.send_with_key(method, uri, body, Some(API_KEY)).await
    }

    pub async fn send_with_key(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
        key: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub app: TestApp,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        let app = TestApp::new();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = ServerConfig::new(vec![ApiKey::new("music", API_KEY)]).with_bind_address(addr);
        let server = Server::new(app.gatekeeper.clone(), config);
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await;
        });

        Ok(Self {
            addr,
            client: Client::new(),
            app,
            shutdown: Some(tx),
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signal shutdown and wait for the serve loop to exit.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(std::time::Duration::from_secs(5), &mut self.handle).await??;
        Ok(())
    }
}
