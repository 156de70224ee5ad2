//! Curated collection probes

use crate::client::{ApiClient, ApiRequest, HttpResponse};
use crate::outcome::TestOutcome;
use crate::shape::{expect_array, expect_int};
use crate::snapshot::{RequestDescriptor, SnapshotWriter};

use super::{exchange, json_object, pick_first_item_id};

/// Sort keys worth trying; deployments accept different subsets
const SORT_CANDIDATES: [&str; 4] = ["updated-", "created-", "views-", "watchers-"];

/// Collection listing; picks the first collection id
pub async fn listing(
    client: &ApiClient,
    writer: &SnapshotWriter,
) -> (TestOutcome, Option<i64>) {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/collections").query("page", 1).query("perpage", 5);
    let Some(response) =
        exchange(client, writer, "collections_list", &request, None, &mut errors).await
    else {
        return (TestOutcome::fail(errors), None);
    };

    let collection_id = pick_first_item_id(response.json.as_ref());
    if let Some(body) = json_object(&response, "collections", &mut errors) {
        expect_array(body.get("items"), "items", &mut errors);
    }
    if collection_id.is_none() {
        errors.push("could not pick collectionId from /v1/collections".to_string());
    }

    (TestOutcome::from_errors(errors), collection_id)
}

fn is_normal_listing(response: &HttpResponse) -> bool {
    response.status == 200
        && response
            .json_get("items")
            .is_some_and(|items| items.is_array())
}

fn sort_request(sort: &str) -> ApiRequest {
    ApiRequest::get("/v1/collections")
        .query("sort", sort)
        .query("page", 1)
        .query("perpage", 5)
}

/// Probe the optional `sort` parameter
///
/// Tries a small candidate set until one yields a normal `{items: []}`
/// payload, then re-fetches with the accepted value; the re-fetched exchange
/// is the one snapshotted and shape-checked.
pub async fn sorted_listing(client: &ApiClient, writer: &SnapshotWriter) -> TestOutcome {
    let mut errors = Vec::new();

    let mut used = None;
    let mut last = None;
    for sort in SORT_CANDIDATES {
        let request = sort_request(sort);
        match client.execute(&request).await {
            Ok(response) => {
                let ok = is_normal_listing(&response);
                last = Some((request, response));
                if ok {
                    used = Some(sort);
                    break;
                }
            }
            Err(err) => errors.push(format!("collections sort ({sort}): request failed: {err}")),
        }
    }

    let Some(sort) = used else {
        if let Some((request, response)) = last {
            writer.write(
                "collections_list_sort",
                &RequestDescriptor::for_request(&request, None),
                &response,
            );
        }
        errors.push(
            "collections sort: none of the candidate sort values returned a normal {items: []} payload"
                .to_string(),
        );
        return TestOutcome::fail(errors);
    };

    let request = sort_request(sort);
    let Some(response) =
        exchange(client, writer, "collections_list_sort", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if response.status != 200 {
        errors.push(format!(
            "collections sort ({sort}): expected HTTP 200, got {}",
            response.status
        ));
    }
    if let Some(body) = json_object(&response, "collections.sort", &mut errors) {
        if body.get("status").is_some_and(|v| !v.is_null()) {
            expect_int(body.get("status"), "collections.sort.status", &mut errors);
        }
        expect_array(body.get("items"), "collections.sort.items", &mut errors);
    }

    TestOutcome::from_errors(errors)
}

/// Items inside one collection
pub async fn view(
    client: &ApiClient,
    writer: &SnapshotWriter,
    collection_id: i64,
) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/collections/view")
        .query("id", collection_id)
        .query("page", 1)
        .query("perpage", 5);
    let Some(response) =
        exchange(client, writer, "collections_view", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "collections.view", &mut errors) {
        expect_array(body.get("items"), "items", &mut errors);
    }

    TestOutcome::from_errors(errors)
}
