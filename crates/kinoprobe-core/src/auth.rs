//! OAuth2 device-code authorization
//!
//! Implements the device grant the service exposes at `/oauth2/device`:
//! request a user code, have the user confirm it in a browser, and poll the
//! same endpoint until the token is issued. Polling respects the
//! server-advertised interval, backs off on `slow_down`, and gives up when
//! the device code's lifetime runs out.

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::client::{ApiClient, ApiRequest, HttpResponse};
use crate::error::{ProbeError, Result};
use crate::token::TokenPayload;

/// Environment variable for the OAuth client id
pub const ENV_CLIENT_ID: &str = "KINOPROBE_CLIENT_ID";
/// Environment variable for the OAuth client secret
pub const ENV_CLIENT_SECRET: &str = "KINOPROBE_CLIENT_SECRET";

const DEVICE_ENDPOINT: &str = "/oauth2/device";
/// Extra seconds added to the poll interval on each `slow_down`
const SLOW_DOWN_BACKOFF_SECS: u64 = 5;

/// The server's answer to a device-code request
#[derive(Debug, Clone)]
pub struct DeviceCode {
    /// Opaque code the client polls with
    pub code: String,
    /// Short code the user types at the verification page
    pub user_code: String,
    /// Where the user confirms the code
    pub verification_uri: String,
    /// Lifetime of the codes, seconds
    pub expires_in: u64,
    /// Minimum seconds between polls
    pub interval: u64,
}

impl DeviceCode {
    /// Extract a device code from a response, field by field
    ///
    /// Each missing or mistyped field is its own protocol error so the
    /// message names exactly what the server got wrong.
    fn from_response(response: &HttpResponse) -> Result<Self> {
        let body = response.json.as_ref().ok_or_else(|| {
            ProbeError::Protocol(format!(
                "device code request returned non-JSON body (status {})",
                response.status
            ))
        })?;

        Ok(Self {
            code: require_str(body, "code")?,
            user_code: require_str(body, "user_code")?,
            verification_uri: require_str(body, "verification_uri")?,
            expires_in: require_u64(body, "expires_in")?,
            interval: require_u64(body, "interval")?,
        })
    }
}

fn require_str(body: &Value, field: &str) -> Result<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ProbeError::Protocol(format!("device code response missing string field `{field}`"))
        })
}

fn require_u64(body: &Value, field: &str) -> Result<u64> {
    body.get(field).and_then(Value::as_u64).ok_or_else(|| {
        ProbeError::Protocol(format!("device code response missing integer field `{field}`"))
    })
}

/// A freshly issued token, as returned by the final poll
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Build the on-disk payload for this grant
    pub fn into_payload(self, base_url: &str) -> TokenPayload {
        TokenPayload {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            scope: self.scope,
            obtained_at: chrono::Utc::now(),
            base_url: base_url.to_string(),
            note: "issued via OAuth2 device flow".to_string(),
        }
    }
}

/// What one poll of the token endpoint concluded
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Token issued; polling is over
    Authorized(TokenGrant),
    /// User has not confirmed yet; poll again after the interval
    Pending,
    /// Polling too fast; widen the interval before the next poll
    SlowDown,
}

/// Classify one poll response
///
/// `authorization_pending` and `slow_down` are the only errors that keep the
/// flow alive; `expired_token` and `access_denied` are terminal, and
/// anything else is a protocol violation.
pub fn classify_poll_response(response: &HttpResponse) -> Result<PollOutcome> {
    let body = response.json.as_ref().ok_or_else(|| {
        ProbeError::Protocol(format!(
            "token poll returned non-JSON body (status {})",
            response.status
        ))
    })?;

    if let Some(token) = body.get("access_token").and_then(Value::as_str) {
        return Ok(PollOutcome::Authorized(TokenGrant {
            access_token: token.to_string(),
            refresh_token: body
                .get("refresh_token")
                .and_then(Value::as_str)
                .map(str::to_string),
            token_type: body
                .get("token_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            expires_in: body.get("expires_in").and_then(Value::as_u64),
            scope: body.get("scope").and_then(Value::as_str).map(str::to_string),
        }));
    }

    match body.get("error").and_then(Value::as_str) {
        Some("authorization_pending") => Ok(PollOutcome::Pending),
        Some("slow_down") => Ok(PollOutcome::SlowDown),
        Some("expired_token") => Err(ProbeError::AuthExpired),
        Some("access_denied") => Err(ProbeError::AuthDenied),
        Some(other) => Err(ProbeError::Protocol(format!(
            "token poll failed: {other} (status {})",
            response.status
        ))),
        None => Err(ProbeError::Protocol(format!(
            "token poll returned status {} with neither a token nor an error code",
            response.status
        ))),
    }
}

/// Drives the device grant against one client id/secret pair
pub struct DeviceAuthenticator<'a> {
    client: &'a ApiClient,
    client_id: String,
    client_secret: String,
}

impl<'a> DeviceAuthenticator<'a> {
    pub fn new(
        client: &'a ApiClient,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Ask the server for a fresh device code and user code
    pub async fn request_device_code(&self) -> Result<DeviceCode> {
        let request = ApiRequest::post(DEVICE_ENDPOINT)
            .form("grant_type", "device_code")
            .form("client_id", &self.client_id)
            .form("client_secret", &self.client_secret)
            .unauthorized();
        let response = self.client.execute(&request).await?;
        let device_code = DeviceCode::from_response(&response)?;
        info!(
            verification_uri = %device_code.verification_uri,
            expires_in = device_code.expires_in,
            "device code issued"
        );
        Ok(device_code)
    }

    /// Poll the token endpoint once for the given device code
    pub async fn poll_once(&self, device_code: &DeviceCode) -> Result<PollOutcome> {
        let request = ApiRequest::post(DEVICE_ENDPOINT)
            .form("grant_type", "device_token")
            .form("client_id", &self.client_id)
            .form("client_secret", &self.client_secret)
            .form("code", &device_code.code)
            .unauthorized();
        let response = self.client.execute(&request).await?;
        classify_poll_response(&response)
    }

    /// Poll until the user authorizes, the code expires, or access is denied
    ///
    /// `progress` is called before each sleep with the time remaining until
    /// the device code expires.
    pub async fn wait_for_authorization(
        &self,
        device_code: &DeviceCode,
        mut progress: impl FnMut(Duration),
    ) -> Result<TokenGrant> {
        let deadline = Instant::now() + Duration::from_secs(device_code.expires_in);
        let mut interval = device_code.interval.max(1);

        loop {
            match self.poll_once(device_code).await? {
                PollOutcome::Authorized(grant) => return Ok(grant),
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => {
                    interval += SLOW_DOWN_BACKOFF_SECS;
                    debug!(interval, "server asked to slow down");
                }
            }

            let now = Instant::now();
            if now + Duration::from_secs(interval) >= deadline {
                return Err(ProbeError::AuthTimeout);
            }
            progress(deadline - now);
            sleep(Duration::from_secs(interval)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn response_with(body: Value) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: BTreeMap::new(),
            raw_text: body.to_string(),
            json: Some(body),
        }
    }

    #[test]
    fn test_device_code_parses_all_fields() {
        let response = response_with(json!({
            "code": "dev-code",
            "user_code": "ABCD1234",
            "verification_uri": "https://service.example/device",
            "expires_in": 300,
            "interval": 5
        }));
        let code = DeviceCode::from_response(&response).unwrap();
        assert_eq!(code.user_code, "ABCD1234");
        assert_eq!(code.expires_in, 300);
        assert_eq!(code.interval, 5);
    }

    #[test]
    fn test_device_code_names_missing_field() {
        let response = response_with(json!({
            "code": "dev-code",
            "verification_uri": "https://service.example/device",
            "expires_in": 300,
            "interval": 5
        }));
        let err = DeviceCode::from_response(&response).unwrap_err();
        assert!(err.to_string().contains("user_code"));
    }

    #[test]
    fn test_device_code_rejects_mistyped_interval() {
        let response = response_with(json!({
            "code": "c",
            "user_code": "u",
            "verification_uri": "v",
            "expires_in": 300,
            "interval": "5"
        }));
        let err = DeviceCode::from_response(&response).unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_poll_authorized() {
        let response = response_with(json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "token_type": "bearer",
            "expires_in": 3600
        }));
        match classify_poll_response(&response).unwrap() {
            PollOutcome::Authorized(grant) => {
                assert_eq!(grant.access_token, "tok");
                assert_eq!(grant.refresh_token.as_deref(), Some("ref"));
                assert_eq!(grant.expires_in, Some(3600));
                assert!(grant.scope.is_none());
            }
            other => panic!("expected Authorized, got {other:?}"),
        }
    }

    #[test]
    fn test_poll_pending_and_slow_down() {
        let pending = response_with(json!({"error": "authorization_pending"}));
        assert!(matches!(
            classify_poll_response(&pending).unwrap(),
            PollOutcome::Pending
        ));

        let slow = response_with(json!({"error": "slow_down"}));
        assert!(matches!(
            classify_poll_response(&slow).unwrap(),
            PollOutcome::SlowDown
        ));
    }

    #[test]
    fn test_poll_terminal_errors() {
        let expired = response_with(json!({"error": "expired_token"}));
        assert!(matches!(
            classify_poll_response(&expired),
            Err(ProbeError::AuthExpired)
        ));

        let denied = response_with(json!({"error": "access_denied"}));
        assert!(matches!(
            classify_poll_response(&denied),
            Err(ProbeError::AuthDenied)
        ));
    }

    #[test]
    fn test_poll_unknown_error_is_protocol_error() {
        let response = response_with(json!({"error": "invalid_client"}));
        let err = classify_poll_response(&response).unwrap_err();
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn test_poll_non_json_is_protocol_error() {
        let response = HttpResponse {
            status: 502,
            headers: BTreeMap::new(),
            raw_text: "<html>bad gateway</html>".to_string(),
            json: None,
        };
        let err = classify_poll_response(&response).unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_grant_into_payload() {
        let grant = TokenGrant {
            access_token: "tok".to_string(),
            refresh_token: None,
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
            scope: None,
        };
        let payload = grant.into_payload("https://api.service-kp.com/");
        assert_eq!(payload.access_token, "tok");
        assert_eq!(payload.base_url, "https://api.service-kp.com/");
        assert!(payload.note.contains("device flow"));
    }
}
