//! Device-flow conformance probe
//!
//! Non-interactive: requests a device code, checks its shape, then polls the
//! token endpoint exactly once. Either an OAuth error string (normally
//! `authorization_pending`) or a full token payload is a conforming answer.

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::outcome::TestOutcome;
use crate::shape::{expect_int, expect_string};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

pub async fn device_flow(
    client: &ApiClient,
    writer: &SnapshotWriter,
    client_id: &str,
    client_secret: &str,
) -> TestOutcome {
    let mut errors = Vec::new();

    let code_request = ApiRequest::post("/oauth2/device")
        .form("grant_type", "device_code")
        .form("client_id", client_id)
        .form("client_secret", client_secret)
        .unauthorized();
    let Some(code_response) =
        exchange(client, writer, "auth_device_code", &code_request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    let mut code = None;
    if let Some(body) = json_object(&code_response, "device_code", &mut errors) {
        code = body.get("code").and_then(Value::as_str).map(str::to_string);
        expect_string(body.get("code"), "device_code.code", &mut errors);
        expect_string(body.get("user_code"), "device_code.user_code", &mut errors);
        expect_string(
            body.get("verification_uri"),
            "device_code.verification_uri",
            &mut errors,
        );
        expect_int(body.get("expires_in"), "device_code.expires_in", &mut errors);
        expect_int(body.get("interval"), "device_code.interval", &mut errors);
    }

    let Some(code) = code else {
        errors.push("device_code: missing code; cannot test device_token polling".to_string());
        return TestOutcome::fail(errors);
    };

    let poll_request = ApiRequest::post("/oauth2/device")
        .form("grant_type", "device_token")
        .form("client_id", client_id)
        .form("client_secret", client_secret)
        .form("code", code)
        .unauthorized();
    let Some(poll_response) =
        exchange(client, writer, "auth_device_token_poll", &poll_request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&poll_response, "device_token poll", &mut errors) {
        if body.contains_key("error") {
            expect_string(body.get("error"), "device_token.error", &mut errors);
        } else {
            expect_string(body.get("access_token"), "device_token.access_token", &mut errors);
            expect_string(body.get("refresh_token"), "device_token.refresh_token", &mut errors);
            expect_int(body.get("expires_in"), "device_token.expires_in", &mut errors);
        }
    }

    TestOutcome::from_errors(errors)
}
