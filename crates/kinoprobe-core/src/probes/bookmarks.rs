//! Bookmark folder lifecycle probe
//!
//! Mutating: creates a uniquely named folder, files an item into it, then
//! removes both. The removals double as cleanup, so they run even when the
//! intermediate assertions failed.

use chrono::Utc;
use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::outcome::TestOutcome;
use crate::snapshot::SnapshotWriter;

use super::exchange;

fn has_items_array(json: Option<&Value>) -> bool {
    json.and_then(|v| v.get("items")).is_some_and(Value::is_array)
}

fn has_status_field(json: Option<&Value>) -> bool {
    json.and_then(|v| v.get("status")).is_some_and(|v| !v.is_null())
}

pub async fn lifecycle(
    client: &ApiClient,
    writer: &SnapshotWriter,
    item_id: i64,
) -> TestOutcome {
    let mut errors = Vec::new();
    let folder_title = format!("api-test-{}", Utc::now().timestamp());

    let list_before = ApiRequest::get("/v1/bookmarks");
    if let Some(response) =
        exchange(client, writer, "bookmarks_list_before", &list_before, None, &mut errors).await
        && !has_items_array(response.json.as_ref())
    {
        errors.push("bookmarks list: unexpected response (expected object with items[])".to_string());
    }

    let create = ApiRequest::post("/v1/bookmarks/create").form("title", &folder_title);
    let folder_id = match exchange(client, writer, "bookmarks_create_folder", &create, None, &mut errors)
        .await
    {
        Some(response) => response
            .json_get("folder")
            .and_then(|f| f.get("id"))
            .and_then(Value::as_i64),
        None => None,
    };
    let Some(folder_id) = folder_id else {
        errors.push("failed to create bookmark folder (no folder.id)".to_string());
        return TestOutcome::fail(errors);
    };

    let list_after = ApiRequest::get("/v1/bookmarks");
    match exchange(client, writer, "bookmarks_list_after", &list_after, None, &mut errors).await {
        Some(response) if has_items_array(response.json.as_ref()) => {
            let found = response
                .json_get("items")
                .and_then(Value::as_array)
                .is_some_and(|items| {
                    items
                        .iter()
                        .any(|f| f.get("id").and_then(Value::as_i64) == Some(folder_id))
                });
            if !found {
                errors.push("bookmarks list: created folder not found in items[]".to_string());
            }
        }
        Some(_) => errors.push("bookmarks list: unexpected response after create".to_string()),
        None => {}
    }

    let add = ApiRequest::post("/v1/bookmarks/add")
        .form("item", item_id)
        .form("folder", folder_id);
    if let Some(response) =
        exchange(client, writer, "bookmarks_add_item", &add, None, &mut errors).await
        && !has_status_field(response.json.as_ref())
    {
        errors.push("bookmark add: unexpected response (expected object with status)".to_string());
    }

    let folder_items = ApiRequest::get(format!("/v1/bookmarks/{folder_id}")).query("page", 1);
    if let Some(response) =
        exchange(client, writer, "bookmarks_folder_items", &folder_items, None, &mut errors).await
        && !has_items_array(response.json.as_ref())
    {
        errors.push(
            "bookmarks folder items: unexpected response (expected object with items[])".to_string(),
        );
    }

    let item_folders = ApiRequest::get("/v1/bookmarks/get-item-folders").query("item", item_id);
    if let Some(response) =
        exchange(client, writer, "bookmarks_item_folders", &item_folders, None, &mut errors).await
        && !response
            .json_get("folders")
            .is_some_and(Value::is_array)
    {
        errors.push(
            "bookmarks get-item-folders: unexpected response (expected object with folders[])"
                .to_string(),
        );
    }

    // Cleanup: both removals run unconditionally once the folder exists.
    let remove_item = ApiRequest::post("/v1/bookmarks/remove-item")
        .form("item", item_id)
        .form("folder", folder_id);
    if let Some(response) =
        exchange(client, writer, "bookmarks_remove_item", &remove_item, None, &mut errors).await
        && !has_status_field(response.json.as_ref())
    {
        errors.push("bookmark remove-item: unexpected response (expected object with status)".to_string());
    }

    let remove_folder = ApiRequest::post("/v1/bookmarks/remove-folder").form("folder", folder_id);
    if let Some(response) =
        exchange(client, writer, "bookmarks_remove_folder", &remove_folder, None, &mut errors).await
        && !has_status_field(response.json.as_ref())
    {
        errors.push("bookmark remove-folder: unexpected response (expected object with status)".to_string());
    }

    TestOutcome::from_errors(errors)
}
