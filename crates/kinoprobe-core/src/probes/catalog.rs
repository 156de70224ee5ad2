//! Catalog dictionary probes: references, TV channels, types, genres,
//! countries, and subtitle languages

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::outcome::TestOutcome;
use crate::shape::{expect_array, expect_int, expect_object, expect_string, type_name};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

/// How many leading array entries get their fields shape-checked
const SAMPLE_LEN: usize = 5;

const REFERENCE_NAMES: [&str; 5] = [
    "server-location",
    "streaming-type",
    "voiceover-type",
    "voiceover-author",
    "video-quality",
];

/// All `/v1/references/{name}` dictionaries in one probe
pub async fn references(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    for name in REFERENCE_NAMES {
        let request = ApiRequest::get(format!("/v1/references/{name}"));
        let snapshot_name = format!("ref_{name}");
        let Some(response) =
            exchange(client, writer, &snapshot_name, &request, None, &mut errors).await
        else {
            continue;
        };
        if let Some(body) = json_object(&response, name, &mut errors) {
            if body.contains_key("status") {
                expect_int(body.get("status"), &format!("{name}.status"), &mut errors);
            }
            expect_array(body.get("items"), &format!("{name}.items"), &mut errors);
        }
    }

    TestOutcome::from_errors(errors)
}

pub async fn tv_channels(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/tv");
    let Some(response) = exchange(client, writer, "tv_channels", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "tv", &mut errors) {
        expect_int(body.get("status"), "tv.status", &mut errors);
        expect_array(body.get("channels"), "tv.channels", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// Content types dictionary; ids here are strings ("movie", "serial", ...)
pub async fn content_types(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/types");
    let Some(response) =
        exchange(client, writer, "content_types", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "types", &mut errors) {
        expect_int(body.get("status"), "types.status", &mut errors);
        let items = body.get("items");
        expect_array(items, "types.items", &mut errors);
        if let Some(items) = items.and_then(Value::as_array) {
            for (i, entry) in items.iter().take(SAMPLE_LEN).enumerate() {
                expect_object(Some(entry), &format!("types.items[{i}]"), &mut errors);
                if entry.is_object() {
                    expect_string(entry.get("id"), &format!("types.items[{i}].id"), &mut errors);
                    expect_string(
                        entry.get("title"),
                        &format!("types.items[{i}].title"),
                        &mut errors,
                    );
                }
            }
        }
    }

    TestOutcome::from_errors(errors)
}

/// Genres dictionary; also picks the first integer genre id for later probes
pub async fn genres(client: &ApiClient, writer: &SnapshotWriter) -> (TestOutcome, Option<i64>) {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/genres");
    let Some(response) =
        exchange(client, writer, "content_genres", &request, None, &mut errors).await
    else {
        return (TestOutcome::fail(errors), None);
    };

    let mut genre_id = None;
    if let Some(body) = json_object(&response, "genres", &mut errors) {
        expect_int(body.get("status"), "genres.status", &mut errors);
        let items = body.get("items");
        expect_array(items, "genres.items", &mut errors);
        if let Some(items) = items.and_then(Value::as_array) {
            genre_id = items.iter().find_map(|it| it.get("id").and_then(Value::as_i64));
            for (i, entry) in items.iter().take(SAMPLE_LEN).enumerate() {
                expect_object(Some(entry), &format!("genres.items[{i}]"), &mut errors);
                if entry.is_object() {
                    expect_int(entry.get("id"), &format!("genres.items[{i}].id"), &mut errors);
                    expect_string(
                        entry.get("title"),
                        &format!("genres.items[{i}].title"),
                        &mut errors,
                    );
                }
            }
        }
    }

    (TestOutcome::from_errors(errors), genre_id)
}

pub async fn countries(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/countries");
    let Some(response) =
        exchange(client, writer, "content_countries", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "countries", &mut errors) {
        expect_int(body.get("status"), "countries.status", &mut errors);
        let items = body.get("items");
        expect_array(items, "countries.items", &mut errors);
        if let Some(items) = items.and_then(Value::as_array) {
            for (i, entry) in items.iter().take(SAMPLE_LEN).enumerate() {
                expect_object(Some(entry), &format!("countries.items[{i}]"), &mut errors);
                if entry.is_object() {
                    expect_int(entry.get("id"), &format!("countries.items[{i}].id"), &mut errors);
                    expect_string(
                        entry.get("title"),
                        &format!("countries.items[{i}].title"),
                        &mut errors,
                    );
                }
            }
        }
    }

    TestOutcome::from_errors(errors)
}

/// Subtitle languages; deployments disagree on entry shape, so `id` may be an
/// int or a string and `lang`/`title` are optional
pub async fn subtitles(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/subtitles");
    let Some(response) =
        exchange(client, writer, "content_subtitles", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "subtitles", &mut errors) {
        if body.get("status").is_some_and(|v| !v.is_null()) {
            expect_int(body.get("status"), "subtitles.status", &mut errors);
        }
        let items = body.get("items");
        expect_array(items, "subtitles.items", &mut errors);
        if let Some(items) = items.and_then(Value::as_array) {
            for (i, entry) in items.iter().take(SAMPLE_LEN).enumerate() {
                expect_object(Some(entry), &format!("subtitles.items[{i}]"), &mut errors);
                let Some(entry) = entry.as_object() else { continue };

                if let Some(id) = entry.get("id")
                    && !id.is_null()
                    && !matches!(id, Value::String(_))
                    && id.as_i64().is_none()
                {
                    errors.push(format!(
                        "subtitles.items[{i}].id: expected int|string, got {}",
                        type_name(id)
                    ));
                }
                if let Some(lang) = entry.get("lang")
                    && !lang.is_null()
                {
                    expect_string(Some(lang), &format!("subtitles.items[{i}].lang"), &mut errors);
                }
                if let Some(title) = entry.get("title")
                    && !title.is_null()
                {
                    expect_string(Some(title), &format!("subtitles.items[{i}].title"), &mut errors);
                }
            }
        }
    }

    TestOutcome::from_errors(errors)
}
