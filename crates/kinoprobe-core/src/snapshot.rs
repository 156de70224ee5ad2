//! Redacted request/response snapshots
//!
//! Every probe persists the exchange it performed as
//! `<test_id>.snapshot.json` under a per-run timestamped directory. Both
//! sides pass through redaction before hitting disk, and a snapshot that
//! cannot be written only logs a warning: persistence problems must not
//! change test outcomes.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::client::{ApiRequest, HttpResponse};
use crate::error::Result;
use crate::redact::{redact_json, redact_text};

/// What was sent, as recorded in a snapshot
///
/// Authorization is represented by a placeholder header rather than the real
/// token so descriptors are safe before redaction even runs.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDescriptor {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
}

impl RequestDescriptor {
    /// Describe a request as it will be recorded
    pub fn for_request(request: &ApiRequest, base: Option<&str>) -> Self {
        let headers = request.authorized.then(|| {
            let mut map = Map::new();
            map.insert(
                "Authorization".to_string(),
                Value::String("Bearer <token>".to_string()),
            );
            map
        });

        Self {
            method: request.method.to_string(),
            path: request.path.clone(),
            base: base.map(str::to_string),
            query: pairs_to_map(&request.query),
            form: pairs_to_map(&request.form),
            headers,
        }
    }
}

/// Collapse wire pairs into a map; repeated keys become an array value
fn pairs_to_map(pairs: &[(String, String)]) -> Option<Map<String, Value>> {
    if pairs.is_empty() {
        return None;
    }
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value.clone());
        match map.get_mut(key) {
            None => {
                map.insert(key.clone(), value);
            }
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    Some(map)
}

#[derive(Debug, Serialize)]
struct SnapshotResponse {
    status: u16,
    headers: Map<String, Value>,
    raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Snapshot {
    request: Value,
    response: SnapshotResponse,
}

/// Writer bound to one run's output directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    /// Create the per-run directory `<root>/<timestamp>/` and bind to it
    pub fn create(root: &Path) -> Result<Self> {
        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let dir = root.join(stamp);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory snapshots land in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one exchange under `<test_id>.snapshot.json`
    ///
    /// Failures are logged and swallowed.
    pub fn write(&self, test_id: &str, request: &RequestDescriptor, response: &HttpResponse) {
        let request_value = match serde_json::to_value(request) {
            Ok(v) => redact_json(&v),
            Err(err) => {
                warn!(test_id, %err, "could not serialize request descriptor");
                return;
            }
        };

        let headers: Map<String, Value> = response
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let snapshot = Snapshot {
            request: request_value,
            response: SnapshotResponse {
                status: response.status,
                headers: redact_json(&Value::Object(headers))
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                raw_text: redact_text(&response.raw_text),
                json: response.json.as_ref().map(redact_json),
            },
        };

        let path = self.dir.join(format!("{test_id}.snapshot.json"));
        self.write_pretty(&path, &snapshot);
    }

    /// Persist an arbitrary JSON document (summaries, token metadata)
    pub fn write_json(&self, name: &str, value: &impl Serialize) {
        let path = self.dir.join(name);
        self.write_pretty(&path, value);
    }

    fn write_pretty(&self, path: &Path, value: &impl Serialize) {
        let result = serde_json::to_string_pretty(value)
            .map_err(std::io::Error::other)
            .and_then(|json| fs::write(path, json));
        if let Err(err) = result {
            warn!(path = %path.display(), %err, "could not write snapshot");
        }
    }
}
