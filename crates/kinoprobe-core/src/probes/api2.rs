//! Probes for the unofficial `api2/*` surface
//!
//! These endpoints are only known from observed client traffic, so the
//! assertions are deliberately loose: bodies are checked best-effort, and a
//! 404 on the endpoints known to 404 in the wild is a SKIP rather than a
//! failure. All calls go through a client bound to the api2 base URL, which
//! is recorded in each snapshot.

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest, HttpResponse};
use crate::outcome::TestOutcome;
use crate::shape::{expect_array, expect_int, expect_object, type_name};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

/// Cross-reference ids extracted from api2 item details
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossRefIds {
    pub imdb_id: Option<i64>,
    pub kinopoisk_id: Option<i64>,
}

/// `GET api2/v1.1/items/search`; picks an item id from `items[]`
pub async fn items_search(
    client: &ApiClient,
    writer: &SnapshotWriter,
) -> (TestOutcome, Option<i64>) {
    let mut errors = Vec::new();

    let request = ApiRequest::get("api2/v1.1/items/search").query("q", "terminator");
    let Some(response) = exchange(
        client,
        writer,
        "api2_items_search",
        &request,
        Some(client.base_url()),
        &mut errors,
    )
    .await
    else {
        return (TestOutcome::fail(errors), None);
    };

    let mut item_id = None;
    if let Some(body) = json_object(&response, "api2 search root", &mut errors) {
        item_id = body
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|it| it.get("id"))
            .and_then(Value::as_i64);
        if item_id.is_none() {
            errors.push("api2 search: could not pick itemId from items[]".to_string());
        }
    }

    (TestOutcome::from_errors(errors), item_id)
}

/// `GET api2/v1.1/items/{id}`; extracts imdb/kinopoisk ids when present
pub async fn item_details(
    client: &ApiClient,
    writer: &SnapshotWriter,
    item_id: i64,
) -> (TestOutcome, CrossRefIds) {
    let mut errors = Vec::new();

    let request = ApiRequest::get(format!("api2/v1.1/items/{item_id}"));
    let Some(response) = exchange(
        client,
        writer,
        "api2_item_details",
        &request,
        Some(client.base_url()),
        &mut errors,
    )
    .await
    else {
        return (TestOutcome::fail(errors), CrossRefIds::default());
    };

    let mut ids = CrossRefIds::default();
    if let Some(body) = json_object(&response, "api2 item root", &mut errors) {
        if body.contains_key("item") {
            expect_object(body.get("item"), "api2 item.item", &mut errors);
            if let Some(item) = body.get("item").and_then(Value::as_object) {
                ids.imdb_id = item.get("imdb").and_then(Value::as_i64);
                ids.kinopoisk_id = item.get("kinopoisk").and_then(Value::as_i64);
            }
        } else if body.contains_key("id") {
            expect_int(body.get("id"), "api2 item.id", &mut errors);
        }
        // Any other shape is recorded in the snapshot for later analysis.
    }

    (TestOutcome::from_errors(errors), ids)
}

/// `GET api2/v1.1/items/collections/{id}`
pub async fn item_collections(
    client: &ApiClient,
    writer: &SnapshotWriter,
    item_id: i64,
) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get(format!("api2/v1.1/items/collections/{item_id}"));
    let Some(response) = exchange(
        client,
        writer,
        "api2_item_collections",
        &request,
        Some(client.base_url()),
        &mut errors,
    )
    .await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "api2 collections root", &mut errors)
        && body.contains_key("items")
    {
        expect_array(body.get("items"), "api2 collections.items", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// `GET api2/v1/backdrop/{imdb}?kp_id=`; 404 means no artwork for the title
pub async fn backdrop(
    client: &ApiClient,
    writer: &SnapshotWriter,
    imdb_id: i64,
    kinopoisk_id: i64,
) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get(format!("api2/v1/backdrop/{imdb_id}")).query("kp_id", kinopoisk_id);
    let Some(response) = exchange(
        client,
        writer,
        "api2_backdrop",
        &request,
        Some(client.base_url()),
        &mut errors,
    )
    .await
    else {
        return TestOutcome::fail(errors);
    };

    if response.status == 404 {
        return TestOutcome::skip(
            "api2 backdrop returned 404 (no data for this title or endpoint disabled)",
        );
    }
    if response.status != 200 {
        errors.push(format!(
            "api2 backdrop: expected HTTP 200 (or 404), got {}",
            response.status
        ));
    }

    TestOutcome::from_errors(errors)
}

/// `GET api2/v1/imdb/{csv}`; observed to 404 on current deployments
pub async fn imdb_lookup(
    client: &ApiClient,
    writer: &SnapshotWriter,
    imdb_ids_csv: &str,
) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get(format!("api2/v1/imdb/{imdb_ids_csv}"));
    let Some(response) = exchange(
        client,
        writer,
        "api2_imdb",
        &request,
        Some(client.base_url()),
        &mut errors,
    )
    .await
    else {
        return TestOutcome::fail(errors);
    };

    if response.status == 404 {
        return TestOutcome::skip("api2 imdb returned 404 (matches observed client traffic)");
    }
    if response.status != 200 {
        errors.push(format!(
            "api2 imdb: expected HTTP 200 (or 404), got {}",
            response.status
        ));
    }
    if response.json.is_none() {
        errors.push("api2 imdb: response is not JSON".to_string());
    }

    TestOutcome::from_errors(errors)
}

fn check_object_or_null(response: &HttpResponse, at: &str, errors: &mut Vec<String>) {
    if response.status != 200 {
        errors.push(format!("{at}: expected HTTP 200, got {}", response.status));
    }
    if let Some(json) = &response.json
        && !json.is_null()
        && !json.is_object()
    {
        errors.push(format!("{at}: expected JSON object (or null), got {}", type_name(json)));
    }
}

/// Notification add/check/delete round trip; mutating
pub async fn notifications(
    client: &ApiClient,
    writer: &SnapshotWriter,
    item_id: i64,
    device_token: &str,
) -> TestOutcome {
    let mut errors = Vec::new();

    let steps = [
        ("api2 notifications add", "api2_notifications_add", format!("api2/v1.1/notifications/add/{item_id}")),
        ("api2 notifications check", "api2_notifications_check", format!("api2/v1.1/notifications/{item_id}")),
        ("api2 notifications delete", "api2_notifications_delete", format!("api2/v1.1/notifications/delete/{item_id}")),
    ];

    for (at, snapshot_name, path) in steps {
        let request = ApiRequest::get(path).query("device_token", device_token);
        if let Some(response) = exchange(
            client,
            writer,
            snapshot_name,
            &request,
            Some(client.base_url()),
            &mut errors,
        )
        .await
        {
            check_object_or_null(&response, at, &mut errors);
        }
    }

    TestOutcome::from_errors(errors)
}

/// `POST api2/v1/upload_report/{filename}` with a tiny plain-text body;
/// mutating
pub async fn upload_report(
    client: &ApiClient,
    writer: &SnapshotWriter,
    filename: &str,
) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::post(format!("api2/v1/upload_report/{filename}"))
        .raw_body(b"api2 upload_report probe\n".to_vec(), "application/octet-stream");
    let Some(response) = exchange(
        client,
        writer,
        "api2_upload_report",
        &request,
        Some(client.base_url()),
        &mut errors,
    )
    .await
    else {
        return TestOutcome::fail(errors);
    };

    if !matches!(response.status, 200 | 201 | 204) {
        errors.push(format!(
            "api2 upload_report: expected HTTP 200/201/204, got {}",
            response.status
        ));
    }

    TestOutcome::from_errors(errors)
}
