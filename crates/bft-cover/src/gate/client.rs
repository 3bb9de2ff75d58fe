//! HTTP client for the BFT U-Control cloud.
//!
//! Two hosts are involved: the account host issues tokens and lists the
//! automations owned by a user; the dispatcher host executes remote
//! operations (`diagnosis`, `open`, `close`, `stop`) on one automation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::api::{GateApi, TokenProvider};
use super::error::{GateError, check_response_error};
use super::types::{CommandResult, GateCommand, GateTelemetry};

/// Endpoints and timeout for [`HttpGateClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub auth_url: String,
    pub dispatcher_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_AUTH_URL: &'static str = "https://ucontrol-api.bft-automation.com";
    pub const DEFAULT_DISPATCHER_URL: &'static str =
        "https://ucontrol-dispatcher.bft-automation.com/automations";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            dispatcher_url: Self::DEFAULT_DISPATCHER_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// reqwest-backed implementation of [`GateApi`] and [`TokenProvider`].
pub struct HttpGateClient {
    client: Client,
    auth_url: String,
    dispatcher_url: String,
    users_url: Url,
}

impl HttpGateClient {
    /// OAuth client credentials shared by every U-Control app.
    const OAUTH_CLIENT: (&'static str, &'static str) = ("particle", "particle");

    pub fn new(config: &ClientConfig) -> Result<Self, GateError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let auth_url = config.auth_url.trim_end_matches('/').to_string();
        let dispatcher_url = config.dispatcher_url.trim_end_matches('/').to_string();
        let users_url = Url::parse(&format!("{}/api/v1/users/", auth_url))?;

        Ok(Self {
            client,
            auth_url,
            dispatcher_url,
            users_url,
        })
    }

    /// GET `{dispatcher}/{device_id}/execute/{operation}` with a bearer token.
    async fn execute(
        &self,
        device_id: &str,
        token: &str,
        operation: &str,
    ) -> Result<reqwest::Response, GateError> {
        let url = format!("{}/{}/execute/{}", self.dispatcher_url, device_id, operation);
        debug!(url = %url, "Executing remote operation");

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        check_response_error(response).await
    }
}

#[async_trait]
impl GateApi for HttpGateClient {
    async fn fetch_telemetry(
        &self,
        device_id: &str,
        token: &str,
    ) -> Result<GateTelemetry, GateError> {
        let response = self.execute(device_id, token, "diagnosis").await?;
        Ok(response.json().await?)
    }

    async fn send_command(
        &self,
        device_id: &str,
        token: &str,
        command: GateCommand,
    ) -> Result<CommandResult, GateError> {
        let response = self.execute(device_id, token, command.as_str()).await?;
        Ok(response.json().await?)
    }

    async fn resolve_device_id(&self, name: &str, token: &str) -> Result<String, GateError> {
        let mut url = self.users_url.clone();
        url.query_pairs_mut().append_pair("access_token", token);

        let response = self.client.get(url).send().await?;
        let user: UserResponse = check_response_error(response).await?.json().await?;

        let automation = user
            .data
            .automations
            .into_iter()
            .find(|a| a.info.name == name)
            .ok_or_else(|| GateError::NotFound(name.to_string()))?;

        debug!(uuid = %automation.uuid, device = %name, "Resolved automation");
        Ok(automation.uuid)
    }
}

#[async_trait]
impl TokenProvider for HttpGateClient {
    async fn acquire_token(&self, username: &str, password: &str) -> Result<String, GateError> {
        let url = format!("{}/oauth/token", self.auth_url);
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "password")
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();

        let (client_id, client_secret) = Self::OAUTH_CLIENT;
        let response = self
            .client
            .post(&url)
            .basic_auth(client_id, Some(client_secret))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        // OAuth reports bad credentials as 400 invalid_grant.
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GateError::Auth(format!("status {status}: {message}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn revoke_token(
        &self,
        token: &str,
        username: &str,
        password: &str,
    ) -> Result<(), GateError> {
        let url = format!("{}/v1/access_tokens/{}", self.auth_url, token);

        let response = self
            .client
            .delete(&url)
            .basic_auth(username, Some(password))
            .send()
            .await?;
        let response = check_response_error(response).await?;

        let ack = response.text().await.unwrap_or_default();
        debug!(ack = %ack, "Access token revoked");
        Ok(())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserResponse {
    data: UserData,
}

#[derive(Deserialize)]
struct UserData {
    automations: Vec<Automation>,
}

#[derive(Deserialize)]
struct Automation {
    uuid: String,
    info: AutomationInfo,
}

#[derive(Deserialize)]
struct AutomationInfo {
    name: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base: &str, timeout: Duration) -> HttpGateClient {
        HttpGateClient::new(&ClientConfig {
            auth_url: base.to_string(),
            dispatcher_url: format!("{}/automations", base),
            timeout,
        })
        .unwrap()
    }

    fn header(headers: &HeaderMap, name: &str) -> String {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn acquire_token_posts_password_grant() {
        let router = Router::new().route(
            "/oauth/token",
            post(|headers: HeaderMap, body: String| async move {
                assert_eq!(
                    header(&headers, "authorization"),
                    "Basic cGFydGljbGU6cGFydGljbGU="
                );
                assert!(body.contains("grant_type=password"));
                assert!(body.contains("username=alice%40example.com"));
                assert!(body.contains("password=secret"));
                Json(json!({"access_token": "tok-123", "token_type": "bearer"}))
            }),
        );
        let base = spawn_stub(router).await;
        let client = client_for(&base, Duration::from_secs(5));

        let token = client
            .acquire_token("alice@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(token, "tok-123");
    }

    #[tokio::test]
    async fn acquire_token_rejection_is_auth_error() {
        let router = Router::new().route(
            "/oauth/token",
            post(|| async { (StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#) }),
        );
        let base = spawn_stub(router).await;
        let client = client_for(&base, Duration::from_secs(5));

        let err = client.acquire_token("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, GateError::Auth(_)));
    }

    #[tokio::test]
    async fn revoke_token_uses_user_credentials() {
        let router = Router::new().route(
            "/v1/access_tokens/{token}",
            delete(|Path(token): Path<String>, headers: HeaderMap| async move {
                assert_eq!(token, "tok-123");
                assert_eq!(header(&headers, "authorization"), "Basic YWxpY2U6c2VjcmV0");
                r#"{"ok":true}"#
            }),
        );
        let base = spawn_stub(router).await;
        let client = client_for(&base, Duration::from_secs(5));

        client.revoke_token("tok-123", "alice", "secret").await.unwrap();
    }

    #[tokio::test]
    async fn revoke_token_unauthorized_is_auth_error() {
        let router = Router::new().route(
            "/v1/access_tokens/{token}",
            delete(|| async { StatusCode::UNAUTHORIZED }),
        );
        let base = spawn_stub(router).await;
        let client = client_for(&base, Duration::from_secs(5));

        let err = client.revoke_token("tok", "alice", "bad").await.unwrap_err();
        assert!(matches!(err, GateError::Auth(_)));
    }

    fn users_router() -> Router {
        Router::new().route(
            "/api/v1/users/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("access_token").map(String::as_str), Some("tok"));
                Json(json!({
                    "data": {
                        "automations": [
                            {"uuid": "uuid-1", "info": {"name": "Side gate"}},
                            {"uuid": "uuid-2", "info": {"name": "Driveway"}},
                            {"uuid": "uuid-3", "info": {"name": "Driveway"}}
                        ]
                    }
                }))
            }),
        )
    }

    #[tokio::test]
    async fn resolve_device_id_returns_first_match() {
        let base = spawn_stub(users_router()).await;
        let client = client_for(&base, Duration::from_secs(5));

        let uuid = client.resolve_device_id("Driveway", "tok").await.unwrap();
        assert_eq!(uuid, "uuid-2");
    }

    #[tokio::test]
    async fn resolve_device_id_unknown_name_is_not_found() {
        let base = spawn_stub(users_router()).await;
        let client = client_for(&base, Duration::from_secs(5));

        let err = client.resolve_device_id("Garage", "tok").await.unwrap_err();
        assert!(matches!(err, GateError::NotFound(ref name) if name == "Garage"));
    }

    fn dispatcher_router(diagnosis: Value) -> Router {
        Router::new().route(
            "/automations/{device_id}/execute/{operation}",
            get(
                move |Path((device_id, operation)): Path<(String, String)>,
                      headers: HeaderMap| {
                    let diagnosis = diagnosis.clone();
                    async move {
                        assert_eq!(device_id, "uuid-2");
                        assert_eq!(header(&headers, "authorization"), "Bearer tok");
                        match operation.as_str() {
                            "diagnosis" => Json(diagnosis),
                            "open" => Json(json!({"status": "done"})),
                            other => Json(json!({"status": format!("{other}-queued")})),
                        }
                    }
                },
            ),
        )
    }

    #[tokio::test]
    async fn fetch_telemetry_reads_diagnosis() {
        let router = dispatcher_router(json!({
            "first_engine_pos_int": 100,
            "second_engine_pos_int": 100,
            "first_engine_vel_int": 0,
            "second_engine_vel_int": 0
        }));
        let base = spawn_stub(router).await;
        let client = client_for(&base, Duration::from_secs(5));

        let telemetry = client.fetch_telemetry("uuid-2", "tok").await.unwrap();
        assert_eq!(telemetry, GateTelemetry::new(100, 100, 0, 0));
    }

    #[tokio::test]
    async fn fetch_telemetry_missing_fields_is_malformed() {
        let router = dispatcher_router(json!({"error": "device offline"}));
        let base = spawn_stub(router).await;
        let client = client_for(&base, Duration::from_secs(5));

        let err = client.fetch_telemetry("uuid-2", "tok").await.unwrap_err();
        assert!(matches!(err, GateError::MalformedResponse(_)));
        assert!(err.is_unreachable());
    }

    #[tokio::test]
    async fn send_command_returns_status() {
        let base = spawn_stub(dispatcher_router(json!({}))).await;
        let client = client_for(&base, Duration::from_secs(5));

        let done = client
            .send_command("uuid-2", "tok", GateCommand::Open)
            .await
            .unwrap();
        assert!(done.is_done());

        let queued = client
            .send_command("uuid-2", "tok", GateCommand::Close)
            .await
            .unwrap();
        assert_eq!(queued.status.as_deref(), Some("close-queued"));
        assert!(!queued.is_done());
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = client_for(&base, Duration::from_secs(5));

        let err = client.fetch_telemetry("uuid-2", "tok").await.unwrap_err();
        assert!(matches!(err, GateError::Transport(_)));
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out_as_transport_error() {
        let router = Router::new().route(
            "/automations/{device_id}/execute/{operation}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        );
        let base = spawn_stub(router).await;
        let client = client_for(&base, Duration::from_millis(200));

        let err = client.fetch_telemetry("uuid-2", "tok").await.unwrap_err();
        match err {
            GateError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_auth_url_is_rejected() {
        let result = HttpGateClient::new(&ClientConfig {
            auth_url: "not a url".to_string(),
            ..ClientConfig::default()
        });
        assert!(matches!(result, Err(GateError::InvalidEndpoint(_))));
    }
}
