//! Playable link probes

use serde_json::Value;

use crate::client::{ApiClient, ApiRequest};
use crate::context::MediaFileRef;
use crate::outcome::TestOutcome;
use crate::shape::{expect_array, expect_object, expect_string};
use crate::snapshot::SnapshotWriter;

use super::{exchange, json_object};

/// Stream types in preference order
const STREAM_TYPES: [&str; 4] = ["hls4", "hls2", "hls", "http"];

/// Link listing for a media id; picks `files[0].file` plus the best available
/// stream type for the follow-up video-link probe
pub async fn links(
    client: &ApiClient,
    writer: &SnapshotWriter,
    media_id: i64,
) -> (TestOutcome, Option<MediaFileRef>) {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items/media-links").query("mid", media_id);
    let Some(response) =
        exchange(client, writer, "content_media_links", &request, None, &mut errors).await
    else {
        return (TestOutcome::fail(errors), None);
    };

    let mut picked = None;
    if let Some(body) = json_object(&response, "media-links", &mut errors) {
        let files = body.get("files");
        expect_array(files, "files", &mut errors);
        if let Some(first) = files.and_then(Value::as_array).and_then(|a| a.first()) {
            expect_object(Some(first), "files[0]", &mut errors);
            match first.get("file").and_then(Value::as_str) {
                Some(file) => {
                    let urls = first.get("urls").or_else(|| first.get("url"));
                    let stream_type = urls
                        .and_then(Value::as_object)
                        .and_then(|urls| {
                            STREAM_TYPES
                                .iter()
                                .find(|t| urls.get(**t).is_some_and(|v| !v.is_null()))
                        })
                        .copied()
                        .unwrap_or("http");
                    picked = Some(MediaFileRef {
                        file: file.to_string(),
                        stream_type: stream_type.to_string(),
                    });
                }
                None => errors.push("files[0].file missing or not a string".to_string()),
            }
        }
    }

    (TestOutcome::from_errors(errors), picked)
}

/// Resolve a direct video URL for a previously picked file reference
pub async fn video_link(
    client: &ApiClient,
    writer: &SnapshotWriter,
    file_ref: &MediaFileRef,
) -> TestOutcome {
    let mut errors = Vec::new();

    let request = ApiRequest::get("/v1/items/media-video-link")
        .query("file", &file_ref.file)
        .query("type", &file_ref.stream_type);
    let Some(response) =
        exchange(client, writer, "content_media_video_link", &request, None, &mut errors).await
    else {
        return TestOutcome::fail(errors);
    };

    if let Some(body) = json_object(&response, "media-video-link", &mut errors) {
        expect_string(body.get("url"), "url", &mut errors);
    }

    TestOutcome::from_errors(errors)
}
