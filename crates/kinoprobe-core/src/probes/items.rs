//! Content listing, details, search, and per-item probes

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::outcome::TestOutcome;
use crate::shape::{expect_array, expect_int, expect_number, expect_object, expect_string, type_name};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object, pick_first_item_id, pick_media_id_from_item};

/// Paged movie listing; picks the first item id for dependent probes
pub async fn listing(
    client: &ApiClient,
    writer: &SnapshotWriter,
) -> (TestOutcome, Option<i64>) {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items")
        .query("type", "movie")
        .query("page", 1)
        .query("perpage", 5)
        .query("sort", "updated-");
    let Some(response) =
        exchange(client, writer, "content_items", &request, None, &mut errors).await
    else {
        return (TestOutcome::fail(errors), None);
    };

    let item_id = pick_first_item_id(response.json.as_ref());

    if let Some(body) = json_object(&response, "items", &mut errors) {
        if body.get("status").is_some_and(|v| !v.is_null()) {
            expect_int(body.get("status"), "status", &mut errors);
        }
        let items = body.get("items");
        expect_array(items, "items", &mut errors);
        if let Some(first) = items.and_then(Value::as_array).and_then(|a| a.first()) {
            expect_object(Some(first), "items[0]", &mut errors);
            if first.is_object() {
                expect_int(first.get("id"), "items[0].id", &mut errors);
                expect_string(first.get("title"), "items[0].title", &mut errors);
                expect_string(first.get("type"), "items[0].type", &mut errors);
            }
        }
        let pagination = body.get("pagination");
        if pagination.is_some_and(|v| !v.is_null()) {
            expect_object(pagination, "pagination", &mut errors);
            if let Some(pagination) = pagination.and_then(Value::as_object) {
                expect_int(pagination.get("total"), "pagination.total", &mut errors);
                expect_int(pagination.get("current"), "pagination.current", &mut errors);
                expect_int(pagination.get("perpage"), "pagination.perpage", &mut errors);
            }
        }
    }

    if item_id.is_none() {
        errors.push("could not pick itemId from /v1/items response".to_string());
    }

    (TestOutcome::from_errors(errors), item_id)
}

/// The optional listing filters the official client sends: `title`,
/// repeatable `conditions[]`, plus one free-form key
pub async fn listing_filters(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items")
        .query("type", "movie")
        .query("page", 1)
        .query("perpage", 5)
        .query("sort", "updated-")
        .query("title", "terminator")
        .query("conditions[]", "year>=1900")
        .query("country", "1");
    let Some(response) =
        exchange(client, writer, "content_items_filters", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if response.status != 200 {
        errors.push(format!(
            "items filters: expected HTTP 200, got {}",
            response.status
        ));
    }
    if let Some(body) = json_object(&response, "items_filters", &mut errors) {
        if body.get("status").is_some_and(|v| !v.is_null()) {
            expect_int(body.get("status"), "items_filters.status", &mut errors);
        }
        expect_array(body.get("items"), "items_filters.items", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// Item details with `nolinks=1`; picks a playable media id
pub async fn details(
    client: &ApiClient,
    writer: &SnapshotWriter,
    item_id: i64,
) -> (TestOutcome, Option<i64>) {
    let mut errors = Vec::new();

    let request = ApiRequest::get(format!("/v1/items/{item_id}")).query("nolinks", 1);
    let Some(response) =
        exchange(client, writer, "content_item_details", &request, None, &mut errors).await
    else {
        return (TestOutcome::fail(errors), None);
    };

    let mut media_id = None;
    if let Some(body) = json_object(&response, "item details", &mut errors) {
        let item = body.get("item");
        expect_object(item, "item", &mut errors);
        if let Some(item) = item.filter(|v| v.is_object()) {
            expect_int(item.get("id"), "item.id", &mut errors);
            expect_string(item.get("title"), "item.title", &mut errors);
            expect_string(item.get("type"), "item.type", &mut errors);

            let duration = item.get("duration");
            if duration.is_some_and(|v| !v.is_null()) {
                expect_object(duration, "item.duration", &mut errors);
                let average = duration.and_then(|d| d.get("average"));
                if average.is_some_and(|v| !v.is_null()) {
                    expect_number(average, "item.duration.average", &mut errors);
                }
            }

            media_id = pick_media_id_from_item(item);
        }
    }

    if media_id.is_none() {
        errors.push("could not pick mediaId from item details (videos/seasons/episodes)".to_string());
    }

    (TestOutcome::from_errors(errors), media_id)
}

pub async fn search(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items/search")
        .query("q", "terminator")
        .query("perpage", 5);
    let Some(response) =
        exchange(client, writer, "content_search", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "search", &mut errors) {
        expect_array(body.get("items"), "items", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

pub async fn similar(client: &ApiClient, writer: &SnapshotWriter, item_id: i64) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items/similar").query("id", item_id);
    let Some(response) =
        exchange(client, writer, "content_similar", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "similar", &mut errors) {
        expect_array(body.get("items"), "items", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// One of the `/v1/items/{fresh,hot,popular}` shortcut listings
pub async fn shortcut(
    client: &ApiClient,
    writer: &SnapshotWriter,
    name: &str,
    genre: Option<i64>,
) -> TestOutcome {
    let mut errors = Vec::new();

    let mut request = ApiRequest::get(format!("/v1/items/{name}"))
        .query("type", "movie")
        .query("page", 1)
        .query("perpage", 5);
    let snapshot_name = if let Some(genre) = genre {
        request = request.query("genre", genre);
        format!("content_{name}_genre")
    } else {
        format!("content_{name}")
    };

    let Some(response) =
        exchange(client, writer, &snapshot_name, &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, name, &mut errors) {
        expect_array(body.get("items"), "items", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// Trailer lookup; the live API answers with either an object or an array
pub async fn trailer(client: &ApiClient, writer: &SnapshotWriter, item_id: i64) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items/trailer").query("id", item_id);
    let Some(response) =
        exchange(client, writer, "content_trailer", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "trailer", &mut errors) {
        if body.get("status").is_some_and(|v| !v.is_null()) {
            expect_int(body.get("status"), "status", &mut errors);
        }
        match body.get("trailer") {
            None | Some(Value::Null) => {}
            Some(Value::Object(tr)) => {
                check_trailer_entry(tr, "trailer", &mut errors);
                if let Some(files) = tr.get("files")
                    && !files.is_null()
                {
                    expect_array(Some(files), "trailer.files", &mut errors);
                }
            }
            Some(Value::Array(entries)) => {
                if let Some(first) = entries.first() {
                    expect_object(Some(first), "trailer[0]", &mut errors);
                    if let Some(first) = first.as_object() {
                        check_trailer_entry(first, "trailer[0]", &mut errors);
                    }
                }
            }
            Some(other) => {
                errors.push(format!(
                    "trailer: expected object or array, got {}",
                    type_name(other)
                ));
            }
        }
    }

    TestOutcome::from_errors(errors)
}

fn check_trailer_entry(
    entry: &serde_json::Map<String, Value>,
    at: &str,
    errors: &mut Vec<String>,
) {
    if let Some(id) = entry.get("id")
        && !id.is_null()
        && !matches!(id, Value::String(_))
        && id.as_i64().is_none()
    {
        errors.push(format!("{at}.id: expected string|int, got {}", type_name(id)));
    }
    if let Some(url) = entry.get("url")
        && !url.is_null()
    {
        expect_string(Some(url), &format!("{at}.url"), errors);
    }
}

pub async fn comments(client: &ApiClient, writer: &SnapshotWriter, item_id: i64) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items/comments").query("id", item_id);
    let Some(response) =
        exchange(client, writer, "content_comments", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "comments", &mut errors) {
        expect_int(body.get("status"), "status", &mut errors);
        expect_array(body.get("comments"), "comments", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// Casts a like vote; mutating, gated by the runner
pub async fn vote(client: &ApiClient, writer: &SnapshotWriter, item_id: i64) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items/vote")
        .query("id", item_id)
        .query("like", 1);
    let Some(response) =
        exchange(client, writer, "content_vote_like", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "vote", &mut errors) {
        crate::shape::expect_bool(body.get("voted"), "voted", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// Best-effort pick of a serial (TV series) item id; no outcome of its own
pub async fn pick_serial_item(client: &ApiClient, writer: &SnapshotWriter) -> Option<i64> {
    let mut errors = Vec::new();
    let request = ApiRequest::get("/v1/items")
        .query("type", "serial")
        .query("page", 1)
        .query("perpage", 5)
        .query("sort", "updated-");
    let response =
        exchange(client, writer, "content_items_serial", &request, None, &mut errors).await?;
    pick_first_item_id(response.json.as_ref())
}
