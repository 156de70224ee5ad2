//! Endpoint probes
//!
//! One async function per conformance check. Probes are infallible: transport
//! errors are folded into the outcome's error list, and every exchange is
//! snapshotted whether or not its assertions hold. Probes that discover an
//! identifier return it alongside the outcome so the runner can thread it
//! into later probes.

pub mod api2;
pub mod auth;
pub mod bookmarks;
pub mod catalog;
pub mod collections;
pub mod device;
pub mod history;
pub mod items;
pub mod media;
pub mod user;
pub mod watching;

use serde_json::{Map, Value};

use crate::client::{ApiClient, ApiRequest, HttpResponse};
use crate::shape::type_name;
use crate::snapshot::{RequestDescriptor, SnapshotWriter};

/// Execute one exchange, snapshot it, and fold transport errors into `errors`
///
/// `base` is recorded in the descriptor only when the probe talks to a
/// non-default base URL.
pub(crate) async fn exchange(
    client: &ApiClient,
    writer: &SnapshotWriter,
    snapshot_name: &str,
    request: &ApiRequest,
    base: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<HttpResponse> {
    match client.execute(request).await {
        Ok(response) => {
            let descriptor = RequestDescriptor::for_request(request, base);
            writer.write(snapshot_name, &descriptor, &response);
            Some(response)
        }
        Err(err) => {
            errors.push(format!("{snapshot_name}: request failed: {err}"));
            None
        }
    }
}

/// Interpret the body as a JSON object, reporting anything else
pub(crate) fn json_object<'a>(
    response: &'a HttpResponse,
    at: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match &response.json {
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            errors.push(format!("{at}: expected object, got {}", type_name(other)));
            None
        }
        None => {
            errors.push(format!("{at}: response is not JSON"));
            None
        }
    }
}

/// `items[0].id` from a listing-shaped body, when it is an integer
pub(crate) fn pick_first_item_id(body: Option<&Value>) -> Option<i64> {
    body?.get("items")?.as_array()?.first()?.get("id")?.as_i64()
}

/// First media id inside an item: `videos[].id`, else `seasons[].episodes[].id`
pub(crate) fn pick_media_id_from_item(item: &Value) -> Option<i64> {
    if let Some(videos) = item.get("videos").and_then(Value::as_array) {
        for video in videos {
            if let Some(id) = video.get("id").and_then(Value::as_i64) {
                return Some(id);
            }
        }
    }
    if let Some(seasons) = item.get("seasons").and_then(Value::as_array) {
        for season in seasons {
            let Some(episodes) = season.get("episodes").and_then(Value::as_array) else {
                continue;
            };
            for episode in episodes {
                if let Some(id) = episode.get("id").and_then(Value::as_i64) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// First `seasons[].id` inside an item
pub(crate) fn pick_season_id_from_item(item: &Value) -> Option<i64> {
    item.get("seasons")?
        .as_array()?
        .iter()
        .find_map(|season| season.get("id").and_then(Value::as_i64))
}
