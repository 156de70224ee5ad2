//! Watch-history probes

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest, HttpResponse};
use crate::outcome::TestOutcome;
use crate::shape::expect_array;
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

/// Item and media ids observed in the history, fed into the clear probes
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryIds {
    pub item_id: Option<i64>,
    pub media_id: Option<i64>,
}

/// Read the history list and pick ids from its first entry
pub async fn listing(
    client: &ApiClient,
    writer: &SnapshotWriter,
) -> (TestOutcome, HistoryIds) {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/history").query("page", 1).query("perpage", 25);
    let Some(response) =
        exchange(client, writer, "history_list", &request, None, &mut errors).await
    else {
        return (TestOutcome::fail(errors), HistoryIds::default());
    };

    let mut picked = HistoryIds::default();
    if let Some(body) = json_object(&response, "history", &mut errors) {
        match body.get("history") {
            Some(history) if !history.is_null() => {
                expect_array(Some(history), "history.history", &mut errors);
                if let Some(first) = history.as_array().and_then(|h| h.first()) {
                    picked.item_id = first
                        .get("item")
                        .and_then(|it| it.get("id"))
                        .and_then(Value::as_i64);
                    picked.media_id = first
                        .get("media")
                        .and_then(|md| md.get("id"))
                        .and_then(Value::as_i64);
                }
            }
            // Documented as always present; its absence is a conformance error.
            _ => errors.push("history response missing 'history' field".to_string()),
        }
    }

    (TestOutcome::from_errors(errors), picked)
}

fn is_conforming_clear(response: &HttpResponse) -> bool {
    if response.status != 200 {
        return false;
    }
    match &response.json {
        None | Some(Value::Null) => true,
        Some(other) => other.get("status").and_then(Value::as_i64).is_some(),
    }
}

/// Clear history for a media, a season, and an item; destructive
///
/// Each target runs only when its id was discovered; a missing id is
/// reported per target instead of aborting the whole probe.
pub async fn clears(
    client: &ApiClient,
    writer: &SnapshotWriter,
    media_id: Option<i64>,
    season_id: Option<i64>,
    item_id: Option<i64>,
) -> TestOutcome {
    let mut errors = Vec::new();

    let targets = [
        ("media", "history_clear_for_media", "/v1/history/clear-for-media", media_id),
        ("season", "history_clear_for_season", "/v1/history/clear-for-season", season_id),
        ("item", "history_clear_for_item", "/v1/history/clear-for-item", item_id),
    ];

    for (target, snapshot_name, path, id) in targets {
        let Some(id) = id else {
            errors.push(format!("clear-for-{target} skipped: no {target}_id available"));
            continue;
        };
        let request = ApiRequest::post(path).query("id", id);
        if let Some(response) =
            exchange(client, writer, snapshot_name, &request, None, &mut errors).await
            && !is_conforming_clear(&response)
        {
            errors.push(format!(
                "clear-for-{target}: expected HTTP 200 with JSON null (or {{status:int}})"
            ));
        }
    }

    TestOutcome::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn response(status: u16, json: Option<Value>) -> HttpResponse {
        HttpResponse {
            status,
            headers: BTreeMap::new(),
            raw_text: json.as_ref().map(Value::to_string).unwrap_or_default(),
            json,
        }
    }

    #[test]
    fn test_clear_accepts_null_body() {
        assert!(is_conforming_clear(&response(200, Some(Value::Null))));
        assert!(is_conforming_clear(&response(200, None)));
    }

    #[test]
    fn test_clear_accepts_status_object() {
        assert!(is_conforming_clear(&response(200, Some(json!({"status": 200})))));
    }

    #[test]
    fn test_clear_rejects_non_200_and_odd_bodies() {
        assert!(!is_conforming_clear(&response(500, Some(Value::Null))));
        assert!(!is_conforming_clear(&response(200, Some(json!({"ok": true})))));
        assert!(!is_conforming_clear(&response(200, Some(json!({"status": "ok"})))));
    }
}
