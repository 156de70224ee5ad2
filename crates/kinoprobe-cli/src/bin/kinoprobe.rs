//! Conformance-run CLI
//!
//! Resolves credentials, runs the full probe sequence, and exits with the
//! run's status code (0 all pass/skip, 1 any failure, 2 no credentials).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use kinoprobe_core::auth::{ENV_CLIENT_ID, ENV_CLIENT_SECRET};
use kinoprobe_core::client::DEFAULT_BASE_URL;
use kinoprobe_core::runner::{RunConfig, run};
use kinoprobe_core::token::DEFAULT_TOKEN_FILE;

const ENV_API2_DEVICE_TOKEN: &str = "KINOPROBE_API2_DEVICE_TOKEN";

#[derive(Parser, Debug)]
#[command(
    name = "kinoprobe",
    version,
    about = "Probe a KinoPub-style video catalog API and report conformance"
)]
struct Args {
    /// Base URL of the v1 API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Access token; overrides KINOPROBE_ACCESS_TOKEN and the token file
    #[arg(long)]
    token: Option<String>,

    /// Token file consulted when neither --token nor the env var is set
    #[arg(long, default_value = DEFAULT_TOKEN_FILE)]
    token_file: PathBuf,

    /// OAuth client id, used only by the device-flow probe
    #[arg(long)]
    client_id: Option<String>,

    /// OAuth client secret, used only by the device-flow probe
    #[arg(long)]
    client_secret: Option<String>,

    /// Enable probes that modify account state (votes, bookmarks, watchlist, device)
    #[arg(long)]
    include_mutating: bool,

    /// Enable destructive probes (history clears)
    #[arg(long)]
    include_destructive: bool,

    /// Probe the unofficial api2/* endpoints
    #[arg(long)]
    include_api2: bool,

    /// Base URL for api2 endpoints; derived from --base-url when omitted
    #[arg(long)]
    api2_base_url: Option<String>,

    /// Device token for the api2 notification probes
    #[arg(long)]
    api2_device_token: Option<String>,

    /// Enable the api2 upload_report probe (mutating; needs --include-mutating)
    #[arg(long)]
    api2_upload_report: bool,

    /// Directory that per-run snapshot directories are created under
    #[arg(long = "output-dir", default_value = "output")]
    output_root: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value_t = 30)]
    timeout_secs: u64,
}

fn env_fallback(arg: Option<String>, var: &str) -> Option<String> {
    arg.or_else(|| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = RunConfig {
        base_url: args.base_url,
        token: args.token,
        token_file: args.token_file,
        client_id: env_fallback(args.client_id, ENV_CLIENT_ID),
        client_secret: env_fallback(args.client_secret, ENV_CLIENT_SECRET),
        include_mutating: args.include_mutating,
        include_destructive: args.include_destructive,
        include_api2: args.include_api2,
        api2_base_url: args.api2_base_url,
        api2_device_token: env_fallback(args.api2_device_token, ENV_API2_DEVICE_TOKEN),
        api2_upload_report: args.api2_upload_report,
        output_root: args.output_root,
        timeout_secs: args.timeout_secs,
    };

    match run(&config).await {
        Ok(report) => ExitCode::from(report.exit_code as u8),
        Err(err) => {
            error!(%err, "conformance run aborted");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dir_and_timeout_flags() {
        let args = Args::try_parse_from([
            "kinoprobe",
            "--output-dir",
            "/tmp/probes",
            "--timeout",
            "10",
        ])
        .unwrap();
        assert_eq!(args.output_root, PathBuf::from("/tmp/probes"));
        assert_eq!(args.timeout_secs, 10);
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kinoprobe"]).unwrap();
        assert_eq!(args.output_root, PathBuf::from("output"));
        assert_eq!(args.timeout_secs, 30);
        assert!(!args.include_mutating);
        assert!(!args.include_destructive);
        assert!(!args.include_api2);
    }
}
