//! Device inventory and settings probes

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::outcome::TestOutcome;
use crate::shape::{expect_array, expect_bool, expect_int, expect_object};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

/// Settings keys the official client always submits
const REQUIRED_SETTING_KEYS: [&str; 7] = [
    "supportSsl",
    "supportHevc",
    "supportHdr",
    "support4k",
    "mixedPlaylist",
    "streamingType",
    "serverLocation",
];

/// Device list, current-device info, one device's record and settings
///
/// Picks a device id, preferring the one `/v1/device/info` reports.
pub async fn inventory(
    client: &ApiClient,
    writer: &SnapshotWriter,
) -> (TestOutcome, Option<i64>) {
    let mut errors = Vec::new();

    let list = ApiRequest::get("/v1/device");
    let mut device_id = None;
    if let Some(response) = exchange(client, writer, "device_list", &list, None, &mut errors).await
        && let Some(body) = json_object(&response, "device", &mut errors)
    {
        let devices = body.get("devices");
        expect_array(devices, "device.devices", &mut errors);
        if let Some(first) = devices.and_then(Value::as_array).and_then(|d| d.first()) {
            device_id = first.get("id").and_then(Value::as_i64);
            let is_browser = first.get("is_browser");
            if is_browser.is_some_and(|v| !v.is_null()) {
                expect_bool(is_browser, "device.devices[0].is_browser", &mut errors);
            }
        }
    }

    let info = ApiRequest::get("/v1/device/info");
    if let Some(response) = exchange(client, writer, "device_info", &info, None, &mut errors).await
        && let Some(body) = json_object(&response, "device/info", &mut errors)
        && let Some(id) = body
            .get("device")
            .and_then(|d| d.get("id"))
            .and_then(Value::as_i64)
    {
        device_id = Some(id);
    }

    let Some(device_id) = device_id else {
        errors.push("could not pick deviceId from /v1/device or /v1/device/info".to_string());
        return (TestOutcome::fail(errors), None);
    };

    let record = ApiRequest::get(format!("/v1/device/{device_id}"));
    if let Some(response) = exchange(client, writer, "device_get", &record, None, &mut errors).await
        && response.json.is_none()
    {
        errors.push("device/{id}: response is not JSON".to_string());
    }

    let settings = ApiRequest::get(format!("/v1/device/{device_id}/settings"));
    if let Some(response) =
        exchange(client, writer, "device_settings_get", &settings, None, &mut errors).await
        && let Some(body) = json_object(&response, "device/settings", &mut errors)
    {
        expect_int(body.get("status"), "device.settings.status", &mut errors);
        let map = body.get("settings");
        if map.is_some_and(|v| !v.is_null()) {
            expect_object(map, "device.settings.settings", &mut errors);
        }
    }

    (TestOutcome::from_errors(errors), Some(device_id))
}

/// Normalize one settings entry to the integer the update form expects
///
/// Entries are `{value: bool|int|[{id, selected}, ...]}`. Booleans map to
/// 1/0; for lists the selected option's id wins, else the first id.
pub(crate) fn extract_setting_value_int(settings_map: Option<&Value>, key: &str) -> Option<i64> {
    let value = settings_map?.get(key)?.get("value")?;
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64(),
        Value::Array(options) => {
            let selected = options.iter().find(|opt| {
                opt.get("selected")
                    .is_some_and(|s| s.as_i64() == Some(1) || s.as_bool() == Some(true))
            });
            selected
                .and_then(|opt| opt.get("id").and_then(Value::as_i64))
                .or_else(|| {
                    options
                        .iter()
                        .find_map(|opt| opt.get("id").and_then(Value::as_i64))
                })
        }
        _ => None,
    }
}

/// Send a device notify ping and re-submit the current settings unchanged;
/// mutating but designed to leave the device as it was
pub async fn mutations(
    client: &ApiClient,
    writer: &SnapshotWriter,
    device_id: i64,
) -> TestOutcome {
    let mut errors = Vec::new();

    let notify = ApiRequest::post("/v1/device/notify")
        .form("title", "kinoprobe conformance run")
        .form("hardware", "PC")
        .form("software", "Windows");
    if let Some(response) =
        exchange(client, writer, "device_notify", &notify, None, &mut errors).await
        && response
            .json_get("status")
            .and_then(Value::as_i64)
            .is_none()
    {
        errors.push("device/notify: expected {status:int}".to_string());
    }

    // Fetch current settings so the update is a no-op re-submit.
    let current = ApiRequest::get(format!("/v1/device/{device_id}/settings"));
    let settings_map = match client.execute(&current).await {
        Ok(response) => response.json_get("settings").cloned(),
        Err(err) => {
            errors.push(format!("device settings fetch failed: {err}"));
            return TestOutcome::fail(errors);
        }
    };

    let mut update = ApiRequest::post(format!("/v1/device/{device_id}/settings"));
    for key in REQUIRED_SETTING_KEYS {
        match extract_setting_value_int(settings_map.as_ref(), key) {
            Some(value) => update = update.form(key, value),
            None => {
                errors.push(format!(
                    "device settings update skipped: could not extract int value for {key}"
                ));
                return TestOutcome::fail(errors);
            }
        }
    }

    if let Some(response) =
        exchange(client, writer, "device_settings_update", &update, None, &mut errors).await
        && response
            .json_get("status")
            .and_then(Value::as_i64)
            .is_none()
    {
        errors.push("device settings update: expected {status:int}".to_string());
    }

    TestOutcome::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_bool_value() {
        let map = json!({"supportSsl": {"value": true}, "supportHdr": {"value": false}});
        assert_eq!(extract_setting_value_int(Some(&map), "supportSsl"), Some(1));
        assert_eq!(extract_setting_value_int(Some(&map), "supportHdr"), Some(0));
    }

    #[test]
    fn test_extract_int_value() {
        let map = json!({"streamingType": {"value": 3}});
        assert_eq!(extract_setting_value_int(Some(&map), "streamingType"), Some(3));
    }

    #[test]
    fn test_extract_list_prefers_selected_option() {
        let map = json!({
            "serverLocation": {"value": [
                {"id": 1, "selected": 0},
                {"id": 2, "selected": 1},
                {"id": 3, "selected": 0}
            ]}
        });
        assert_eq!(extract_setting_value_int(Some(&map), "serverLocation"), Some(2));
    }

    #[test]
    fn test_extract_list_selected_bool() {
        let map = json!({"k": {"value": [{"id": 5, "selected": true}]}});
        assert_eq!(extract_setting_value_int(Some(&map), "k"), Some(5));
    }

    #[test]
    fn test_extract_list_falls_back_to_first_id() {
        let map = json!({"k": {"value": [{"label": "no id"}, {"id": 9}]}});
        assert_eq!(extract_setting_value_int(Some(&map), "k"), Some(9));
    }

    #[test]
    fn test_extract_missing_or_malformed() {
        let map = json!({"k": {"value": "str"}});
        assert_eq!(extract_setting_value_int(Some(&map), "k"), None);
        assert_eq!(extract_setting_value_int(Some(&map), "absent"), None);
        assert_eq!(extract_setting_value_int(None, "k"), None);
        assert_eq!(extract_setting_value_int(Some(&json!([])), "k"), None);
    }
}
