//! Settings API client that reports push subscriptions to the server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::PushConfig;
use crate::error::{PushError, Result};
use crate::subscription::PushSubscriptionRecord;

/// GraphQL mutation for the user settings update.
pub const UPDATE_SETTINGS_MUTATION: &str = "\
mutation UpdateUserSettings($userId: ID!, $input: UpdateUserSettingsInput!) {
  updateUserSettings(userId: $userId, input: $input) {
    settings { enableBrowserPushNotifications pushSubscriptionEndpoint }
    errors { field message }
  }
}";

/// Settings mutation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub enable_browser_push_notifications: bool,
    pub push_subscription_endpoint: String,
    /// JSON string of `{p256dh, auth}`, both standard base64.
    pub push_subscription_keys: String,
}

impl SettingsUpdate {
    /// Enable push for `subscription`.
    pub fn enable(subscription: &PushSubscriptionRecord) -> Result<Self> {
        let keys = serde_json::to_string(&subscription.keys.to_encoded())?;
        Ok(Self {
            enable_browser_push_notifications: true,
            push_subscription_endpoint: subscription.endpoint.clone(),
            push_subscription_keys: keys,
        })
    }

    /// Disable push and clear the stored endpoint.
    pub fn disable() -> Self {
        Self {
            enable_browser_push_notifications: false,
            push_subscription_endpoint: String::new(),
            push_subscription_keys: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: Option<String>,
    pub message: String,
}

/// Settings as the server stored them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedSettings {
    #[serde(default)]
    pub enable_browser_push_notifications: Option<bool>,
    #[serde(default)]
    pub push_subscription_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdateResponse {
    #[serde(default)]
    pub settings: Option<SyncedSettings>,
    #[serde(default)]
    pub errors: Option<Vec<FieldError>>,
}

impl SettingsUpdateResponse {
    /// The server stored the settings and reported no errors.
    pub fn is_confirmed(&self) -> bool {
        self.settings.is_some() && self.errors.as_ref().is_none_or(|e| e.is_empty())
    }
}

/// Transport for the settings mutation.
#[async_trait]
pub trait SettingsTransport: Send + Sync {
    async fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<SettingsUpdateResponse>;
}

#[async_trait]
impl<T: SettingsTransport + ?Sized> SettingsTransport for std::sync::Arc<T> {
    async fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<SettingsUpdateResponse> {
        (**self).update_settings(user_id, update).await
    }
}

/// GraphQL over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSettingsTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpSettingsTransport {
    pub fn new(url: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| PushError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &PushConfig) -> Result<Self> {
        Self::new(
            config.settings_url.clone(),
            u64::from(config.request_timeout_seconds),
        )
    }
}

#[async_trait]
impl SettingsTransport for HttpSettingsTransport {
    async fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<SettingsUpdateResponse> {
        let body = json!({
            "query": UPDATE_SETTINGS_MUTATION,
            "variables": { "userId": user_id, "input": update },
        });

        let response = self.client.post(&self.url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(PushError::sync(format!(
                "settings update failed with status: {}",
                response.status()
            )));
        }

        let envelope: Value = response.json().await?;
        parse_envelope(envelope)
    }
}

/// Unwrap `data.updateUserSettings`, folding top-level GraphQL errors in.
fn parse_envelope(envelope: Value) -> Result<SettingsUpdateResponse> {
    let mut response = match envelope.pointer("/data/updateUserSettings") {
        Some(Value::Null) | None => SettingsUpdateResponse::default(),
        Some(payload) => serde_json::from_value(payload.clone())
            .map_err(|e| PushError::sync(format!("unexpected settings response: {}", e)))?,
    };

    if let Some(errors) = envelope.get("errors").filter(|e| !e.is_null()) {
        let top_level: Vec<FieldError> = serde_json::from_value(errors.clone())
            .map_err(|e| PushError::sync(format!("unexpected error list: {}", e)))?;
        response.errors.get_or_insert_with(Vec::new).extend(top_level);
    }

    Ok(response)
}

/// Reports subscriptions to the settings API.
///
/// Results are plain booleans: a failed sync never rolls back the local
/// grant or the prompt record.
#[derive(Debug)]
pub struct BackendSyncClient<T: SettingsTransport> {
    transport: T,
}

impl<T: SettingsTransport> BackendSyncClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Enable push for `user_id` with `subscription`.
    pub async fn send(&self, subscription: &PushSubscriptionRecord, user_id: &str) -> bool {
        let update = match SettingsUpdate::enable(subscription) {
            Ok(update) => update,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode subscription keys");
                return false;
            }
        };
        self.deliver(user_id, &update).await
    }

    /// Disable push for `user_id`.
    pub async fn send_disabled(&self, user_id: &str) -> bool {
        self.deliver(user_id, &SettingsUpdate::disable()).await
    }

    async fn deliver(&self, user_id: &str, update: &SettingsUpdate) -> bool {
        match self.transport.update_settings(user_id, update).await {
            Ok(response) if response.is_confirmed() => {
                tracing::info!(
                    enabled = update.enable_browser_push_notifications,
                    "push settings synced"
                );
                true
            }
            Ok(response) => {
                let messages: Vec<&str> = response
                    .errors
                    .iter()
                    .flatten()
                    .map(|e| e.message.as_str())
                    .collect();
                tracing::warn!(errors = ?messages, "settings update rejected");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "settings update failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{MemorySettingsTransport, TransportMode};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn subscription() -> PushSubscriptionRecord {
        PushSubscriptionRecord::new("https://push.example.test/send/1", vec![0xfb, 0xff], b"auth".to_vec())
    }

    /// Answer one request with `status` and `body`; yields the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (PushConfig, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = PushConfig {
            settings_url: format!("http://{}/graphql", listener.local_addr().unwrap()),
            request_timeout_seconds: 5,
            ..PushConfig::default()
        };

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (config, server)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(head_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..head_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= head_end + 4 + length
    }

    fn http_client(config: &PushConfig) -> BackendSyncClient<HttpSettingsTransport> {
        BackendSyncClient::new(HttpSettingsTransport::from_config(config).unwrap())
    }

    #[tokio::test]
    async fn test_http_send_confirmed() {
        let (config, server) = serve_once(
            "200 OK",
            r#"{"data":{"updateUserSettings":{"settings":{"enableBrowserPushNotifications":true,"pushSubscriptionEndpoint":"https://push.example.test/send/1"},"errors":null}}}"#,
        )
        .await;

        assert!(http_client(&config).send(&subscription(), "user-1").await);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /graphql "));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["query"], UPDATE_SETTINGS_MUTATION);
        assert_eq!(body["variables"]["userId"], "user-1");
        assert_eq!(
            body["variables"]["input"]["pushSubscriptionEndpoint"],
            "https://push.example.test/send/1"
        );
    }

    #[tokio::test]
    async fn test_http_send_false_on_field_errors() {
        let (config, server) = serve_once(
            "200 OK",
            r#"{"data":{"updateUserSettings":{"settings":null,"errors":[{"field":"pushSubscriptionEndpoint","message":"invalid"}]}}}"#,
        )
        .await;

        assert!(!http_client(&config).send(&subscription(), "user-1").await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_server_error_is_sync_error() {
        let (config, server) =
            serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let transport = HttpSettingsTransport::from_config(&config).unwrap();

        let result = transport
            .update_settings("user-1", &SettingsUpdate::enable(&subscription()).unwrap())
            .await;

        assert!(matches!(result, Err(PushError::Sync { .. })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_send_false_on_server_error() {
        let (config, server) = serve_once("500 Internal Server Error", "{}").await;

        assert!(!http_client(&config).send(&subscription(), "user-1").await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_send_false_when_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = PushConfig {
            settings_url: format!("http://{}/graphql", listener.local_addr().unwrap()),
            request_timeout_seconds: 5,
            ..PushConfig::default()
        };
        drop(listener);

        assert!(!http_client(&config).send(&subscription(), "user-1").await);
    }

    #[test]
    fn test_enable_update_wire_shape() {
        let update = SettingsUpdate::enable(&subscription()).unwrap();
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json["enableBrowserPushNotifications"], true);
        assert_eq!(json["pushSubscriptionEndpoint"], "https://push.example.test/send/1");
        assert_eq!(
            json["pushSubscriptionKeys"],
            r#"{"p256dh":"+/8=","auth":"YXV0aA=="}"#
        );
    }

    #[test]
    fn test_disable_update_clears_endpoint() {
        let update = SettingsUpdate::disable();
        assert!(!update.enable_browser_push_notifications);
        assert!(update.push_subscription_endpoint.is_empty());
    }

    #[test]
    fn test_confirmed_requires_settings_and_no_errors() {
        let settings = Some(SyncedSettings::default());
        let error = FieldError {
            field: None,
            message: "nope".to_string(),
        };

        assert!(SettingsUpdateResponse { settings: settings.clone(), errors: None }.is_confirmed());
        assert!(SettingsUpdateResponse { settings: settings.clone(), errors: Some(vec![]) }.is_confirmed());
        assert!(!SettingsUpdateResponse { settings, errors: Some(vec![error]) }.is_confirmed());
        assert!(!SettingsUpdateResponse::default().is_confirmed());
    }

    #[test]
    fn test_parse_envelope_success() {
        let response = parse_envelope(json!({
            "data": {"updateUserSettings": {
                "settings": {"enableBrowserPushNotifications": true, "pushSubscriptionEndpoint": "e"},
                "errors": null
            }}
        }))
        .unwrap();

        assert!(response.is_confirmed());
        assert_eq!(
            response.settings.unwrap().push_subscription_endpoint.as_deref(),
            Some("e")
        );
    }

    #[test]
    fn test_parse_envelope_folds_top_level_errors() {
        let response = parse_envelope(json!({
            "data": null,
            "errors": [{"message": "not authorized"}]
        }))
        .unwrap();

        assert!(!response.is_confirmed());
        assert_eq!(response.errors.unwrap()[0].message, "not authorized");
    }

    #[test]
    fn test_parse_envelope_field_errors() {
        let response = parse_envelope(json!({
            "data": {"updateUserSettings": {
                "settings": null,
                "errors": [{"field": "pushSubscriptionEndpoint", "message": "invalid"}]
            }}
        }))
        .unwrap();

        assert!(!response.is_confirmed());
    }

    #[tokio::test]
    async fn test_send_true_when_confirmed() {
        let transport = Arc::new(MemorySettingsTransport::new());
        let client = BackendSyncClient::new(Arc::clone(&transport));

        assert!(client.send(&subscription(), "user-1").await);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "user-1");
        assert!(requests[0].1.enable_browser_push_notifications);
    }

    #[tokio::test]
    async fn test_send_false_on_field_errors() {
        let transport = MemorySettingsTransport::with_mode(TransportMode::Rejecting("invalid".to_string()));
        let client = BackendSyncClient::new(transport);

        assert!(!client.send(&subscription(), "user-1").await);
    }

    #[tokio::test]
    async fn test_send_false_on_transport_failure() {
        let transport = MemorySettingsTransport::with_mode(TransportMode::Unreachable);
        let client = BackendSyncClient::new(transport);

        assert!(!client.send(&subscription(), "user-1").await);
    }

    #[tokio::test]
    async fn test_send_disabled() {
        let transport = Arc::new(MemorySettingsTransport::new());
        let client = BackendSyncClient::new(Arc::clone(&transport));

        assert!(client.send_disabled("user-1").await);
        assert!(!transport.requests()[0].1.enable_browser_push_notifications);
    }
}
