//! Watching-state probes

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::outcome::TestOutcome;
use crate::shape::{expect_array, expect_int};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

/// Read-only watching info plus the movies/serials watch lists
pub async fn state(client: &ApiClient, writer: &SnapshotWriter, item_id: i64) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/watching").query("id", item_id);
    if let Some(response) =
        exchange(client, writer, "watching_info", &request, None, &mut errors).await
        && let Some(body) = json_object(&response, "watching", &mut errors)
        && body.contains_key("status")
    {
        expect_int(body.get("status"), "watching.status", &mut errors);
    }

    for name in ["movies", "serials"] {
        let request = ApiRequest::get(format!("/v1/watching/{name}"));
        let snapshot_name = format!("watching_{name}");
        if let Some(response) =
            exchange(client, writer, &snapshot_name, &request, None, &mut errors).await
            && let Some(body) = json_object(&response, &format!("watching/{name}"), &mut errors)
        {
            expect_array(body.get("items"), &format!("watching/{name}.items"), &mut errors);
        }
    }

    TestOutcome::from_errors(errors)
}

fn has_int_status(json: Option<&Value>) -> bool {
    json.and_then(|v| v.get("status")).and_then(Value::as_i64).is_some()
}

/// Mark playback position and toggle watched state; mutating
pub async fn mutations(
    client: &ApiClient,
    writer: &SnapshotWriter,
    item_id: i64,
    media_id: i64,
) -> TestOutcome {
    let mut errors = Vec::new();

    let marktime = ApiRequest::get("/v1/watching/marktime")
        .query("id", item_id)
        .query("video", media_id)
        .query("time", 120);
    if let Some(response) =
        exchange(client, writer, "watching_marktime", &marktime, None, &mut errors).await
        && !has_int_status(response.json.as_ref())
    {
        errors.push("marktime: expected {status:int}".to_string());
    }

    let toggle = ApiRequest::get("/v1/watching/toggle")
        .query("id", item_id)
        .query("video", media_id);
    if let Some(response) =
        exchange(client, writer, "watching_toggle", &toggle, None, &mut errors).await
        && !has_int_status(response.json.as_ref())
    {
        errors.push("toggle: expected {status:int,...}".to_string());
    }

    TestOutcome::from_errors(errors)
}

/// Toggle a serial's watchlist membership twice so the account ends up
/// where it started; mutating
pub async fn watchlist_toggle(
    client: &ApiClient,
    writer: &SnapshotWriter,
    serial_item_id: i64,
) -> TestOutcome {
    let mut errors = Vec::new();

    for round in [1, 2] {
        let request = ApiRequest::get("/v1/watching/togglewatchlist").query("id", serial_item_id);
        let snapshot_name = format!("watchlist_toggle_{round}");
        if let Some(response) =
            exchange(client, writer, &snapshot_name, &request, None, &mut errors).await
            && !has_int_status(response.json.as_ref())
        {
            errors.push("togglewatchlist: expected {status:int,...}".to_string());
        }
    }

    TestOutcome::from_errors(errors)
}
