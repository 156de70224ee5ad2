//! Interactive token extraction via the OAuth2 device flow
//!
//! Prints the verification URL and user code, optionally opens a browser,
//! then polls until the user confirms. The issued token lands in the token
//! file that `kinoprobe` reads by default.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use kinoprobe_core::auth::{DeviceAuthenticator, ENV_CLIENT_ID, ENV_CLIENT_SECRET};
use kinoprobe_core::client::{ApiClient, ClientConfig, DEFAULT_BASE_URL};
use kinoprobe_core::error::ProbeError;
use kinoprobe_core::token::{mask_token, write_token_file};

#[derive(Parser, Debug)]
#[command(
    name = "kinoprobe-auth",
    version,
    about = "Obtain an access token through the OAuth2 device flow"
)]
struct Args {
    /// Base URL of the v1 API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// OAuth client id (or KINOPROBE_CLIENT_ID)
    #[arg(long)]
    client_id: Option<String>,

    /// OAuth client secret (or KINOPROBE_CLIENT_SECRET)
    #[arg(long)]
    client_secret: Option<String>,

    /// Where to write the issued token
    #[arg(long, default_value = kinoprobe_core::token::DEFAULT_TOKEN_FILE)]
    token_file: PathBuf,

    /// Try to open the verification page in a browser
    #[arg(long)]
    open_browser: bool,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value_t = 30)]
    timeout_secs: u64,
}

fn env_fallback(arg: Option<String>, var: &str) -> Option<String> {
    arg.or_else(|| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
}

/// Best-effort platform opener; failure only means the user types the URL
fn open_in_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd").args(["/C", "start", "", url]).spawn();
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = std::process::Command::new("xdg-open").arg(url).spawn();

    if let Err(err) = result {
        debug!(%err, "could not open browser");
    }
}

fn print_countdown(remaining: Duration) {
    let secs = remaining.as_secs();
    print!("\rWaiting for authorization... remaining {:4}:{:02}", secs / 60, secs % 60);
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let (Some(client_id), Some(client_secret)) = (
        env_fallback(args.client_id, ENV_CLIENT_ID),
        env_fallback(args.client_secret, ENV_CLIENT_SECRET),
    ) else {
        eprintln!(
            "missing OAuth credentials: pass --client-id/--client-secret or set \
             {ENV_CLIENT_ID}/{ENV_CLIENT_SECRET}"
        );
        return ExitCode::from(2);
    };

    let client = match ApiClient::with_config(
        ClientConfig {
            base_url: args.base_url.clone(),
            timeout_secs: args.timeout_secs,
        },
        None,
    ) {
        Ok(client) => client,
        Err(err) => {
            error!(%err, "could not build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let authenticator = DeviceAuthenticator::new(&client, client_id, client_secret);
    let device_code = match authenticator.request_device_code().await {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "device code request failed");
            return ExitCode::FAILURE;
        }
    };

    println!("Open {} and enter the code: {}", device_code.verification_uri, device_code.user_code);
    println!("The code expires in {} seconds.", device_code.expires_in);
    if args.open_browser {
        open_in_browser(&device_code.verification_uri);
    }

    let grant = match authenticator
        .wait_for_authorization(&device_code, print_countdown)
        .await
    {
        Ok(grant) => grant,
        Err(err) => {
            println!();
            match err {
                ProbeError::AuthExpired | ProbeError::AuthTimeout => {
                    eprintln!("the device code expired before the user authorized; run again")
                }
                ProbeError::AuthDenied => eprintln!("the user denied the authorization request"),
                other => error!(%other, "authorization polling failed"),
            }
            return ExitCode::FAILURE;
        }
    };
    println!();

    let masked = mask_token(&grant.access_token);
    let payload = grant.into_payload(client.base_url());
    if let Err(err) = write_token_file(&args.token_file, &payload) {
        error!(%err, path = %args.token_file.display(), "could not write token file");
        return ExitCode::FAILURE;
    }

    println!("Access token {masked} written to {}", args.token_file.display());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_open_is_opt_in() {
        let args = Args::try_parse_from(["kinoprobe-auth"]).unwrap();
        assert!(!args.open_browser);

        let args = Args::try_parse_from(["kinoprobe-auth", "--open-browser"]).unwrap();
        assert!(args.open_browser);
    }

    #[test]
    fn test_timeout_flag() {
        let args = Args::try_parse_from(["kinoprobe-auth", "--timeout", "15"]).unwrap();
        assert_eq!(args.timeout_secs, 15);
    }
}
