//! Access-token resolution and persistence
//!
//! A run needs exactly one access token; candidates are consulted in a fixed
//! precedence order (command-line argument, environment variable, token
//! file) and the winning source is recorded so `token_source.json` can state
//! where the credential came from without ever containing it.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable consulted for the access token
pub const ENV_ACCESS_TOKEN: &str = "KINOPROBE_ACCESS_TOKEN";

/// Default token file path, relative to the working directory
pub const DEFAULT_TOKEN_FILE: &str = "kinoprobe_token.json";

/// Where the resolved token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Arg,
    Env,
    File,
    Missing,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenSource::Arg => "arg",
            TokenSource::Env => "env",
            TokenSource::File => "file",
            TokenSource::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// On-disk representation of an issued token
///
/// Written by the device-flow authenticator and read back by later runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub obtained_at: DateTime<Utc>,
    pub base_url: String,
    pub note: String,
}

/// Resolve the access token from the highest-precedence source available
///
/// Precedence: explicit argument, then environment value, then token file.
/// Whitespace-only candidates are treated as absent. Returns the token (if
/// any) together with the source tag describing where it came from.
pub fn resolve_access_token(
    arg: Option<&str>,
    env: Option<&str>,
    file_path: &Path,
) -> (Option<String>, TokenSource) {
    if let Some(token) = non_blank(arg) {
        return (Some(token), TokenSource::Arg);
    }
    if let Some(token) = non_blank(env) {
        return (Some(token), TokenSource::Env);
    }
    if let Some(token) = read_token_file(file_path) {
        return (Some(token), TokenSource::File);
    }
    (None, TokenSource::Missing)
}

fn non_blank(candidate: Option<&str>) -> Option<String> {
    candidate
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extract an access token from a token file, tolerating both formats
///
/// A JSON file yields its `access_token` (or legacy `token`) field; any
/// other file yields its first non-blank line that is not a `#` comment.
/// Unreadable or empty files yield `None`.
pub fn read_token_file(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) {
        let token = value
            .get("access_token")
            .or_else(|| value.get("token"))
            .and_then(|v| v.as_str())?;
        return non_blank(Some(token));
    }

    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Persist an issued token as pretty-printed JSON
pub fn write_token_file(path: &Path, payload: &TokenPayload) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(payload)?;
    fs::write(path, json)?;
    Ok(())
}

/// Abbreviate a token for terminal display
///
/// Shows at most the first six characters plus the full length, enough to
/// tell tokens apart without exposing them.
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…(len={})", token.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_arg_wins_over_env_and_file() {
        let (token, source) =
            resolve_access_token(Some("from-arg"), Some("from-env"), Path::new("/nonexistent"));
        assert_eq!(token.as_deref(), Some("from-arg"));
        assert_eq!(source, TokenSource::Arg);
    }

    #[test]
    fn test_blank_arg_falls_through_to_env() {
        let (token, source) =
            resolve_access_token(Some("   "), Some("from-env"), Path::new("/nonexistent"));
        assert_eq!(token.as_deref(), Some("from-env"));
        assert_eq!(source, TokenSource::Env);
    }

    #[test]
    fn test_missing_everything() {
        let (token, source) = resolve_access_token(None, None, Path::new("/nonexistent"));
        assert!(token.is_none());
        assert_eq!(source, TokenSource::Missing);
    }

    #[test]
    fn test_file_source_json_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", r#"{"access_token": "tok-json", "obtained_at": "x"}"#).unwrap();
        let (token, source) = resolve_access_token(None, None, file.path());
        assert_eq!(token.as_deref(), Some("tok-json"));
        assert_eq!(source, TokenSource::File);
    }

    #[test]
    fn test_file_source_legacy_token_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", r#"{"token": "tok-legacy"}"#).unwrap();
        assert_eq!(read_token_file(file.path()).as_deref(), Some("tok-legacy"));
    }

    #[test]
    fn test_file_source_plain_text_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# saved token").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "tok-plain").unwrap();
        assert_eq!(read_token_file(file.path()).as_deref(), Some("tok-plain"));
    }

    #[test]
    fn test_file_source_json_without_token_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", r#"{"refresh_token": "r"}"#).unwrap();
        assert!(read_token_file(file.path()).is_none());
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let payload = TokenPayload {
            access_token: "tok-abc".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
            scope: None,
            obtained_at: Utc::now(),
            base_url: "https://api.service-kp.com/".to_string(),
            note: "issued via device flow".to_string(),
        };
        write_token_file(&path, &payload).unwrap();
        assert_eq!(read_token_file(&path).as_deref(), Some("tok-abc"));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdefghij"), "abcdef…(len=10)");
        assert_eq!(mask_token("abc"), "abc…(len=3)");
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TokenSource::Env).unwrap(), "\"env\"");
        assert_eq!(TokenSource::File.to_string(), "file");
    }
}
