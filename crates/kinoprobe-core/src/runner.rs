//! Sequential conformance run
//!
//! Drives every probe in a fixed order, threading discovered identifiers
//! forward. The full inventory is always enumerated: a probe whose inputs
//! are missing, or whose gate flag is off, is recorded as SKIP rather than
//! omitted, so two runs are always comparable line by line.

use std::path::PathBuf;

use serde_json::json;
use tracing::{info, warn};

use crate::client::{ApiClient, ClientConfig, DEFAULT_BASE_URL, derive_api2_base_url};
use crate::context::RunContext;
use crate::error::Result;
use crate::outcome::{RunSummary, TestOutcome};
use crate::probes;
use crate::snapshot::SnapshotWriter;
use crate::token::{DEFAULT_TOKEN_FILE, ENV_ACCESS_TOKEN, TokenSource, resolve_access_token};

const SKIP_MUTATING: &str = "mutating tests disabled (enable with --include-mutating)";
const SKIP_DESTRUCTIVE: &str = "destructive tests disabled (enable with --include-destructive)";

/// Everything one run needs; built by the CLI from flags and environment
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: String,
    /// Explicit token argument; overrides environment and token file
    pub token: Option<String>,
    pub token_file: PathBuf,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub include_mutating: bool,
    pub include_destructive: bool,
    pub include_api2: bool,
    pub api2_base_url: Option<String>,
    pub api2_device_token: Option<String>,
    pub api2_upload_report: bool,
    pub output_root: PathBuf,
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            client_id: None,
            client_secret: None,
            include_mutating: false,
            include_destructive: false,
            include_api2: false,
            api2_base_url: None,
            api2_device_token: None,
            api2_upload_report: false,
            output_root: PathBuf::from("output"),
            timeout_secs: 30,
        }
    }
}

/// What a finished (or aborted) run produced
#[derive(Debug)]
pub struct RunReport {
    /// 0: all PASS/SKIP; 1: at least one FAIL; 2: no credentials
    pub exit_code: i32,
    pub summary: RunSummary,
    pub output_dir: PathBuf,
}

/// Execute the full probe sequence
pub async fn run(config: &RunConfig) -> Result<RunReport> {
    let writer = SnapshotWriter::create(&config.output_root)?;
    info!(output_dir = %writer.dir().display(), "conformance run starting");
    info!("snapshots may include personal account data returned by the API; do not share them");
    if config.include_mutating {
        warn!("mutating probes enabled (bookmarks/votes/watchlist/device); use a test account");
    }
    if config.include_destructive {
        warn!("destructive probes enabled (history clears); use a test account");
    }

    let env_token = std::env::var(ENV_ACCESS_TOKEN).ok();
    let (token, token_source) = resolve_access_token(
        config.token.as_deref(),
        env_token.as_deref(),
        &config.token_file,
    );
    writer.write_json(
        "token_source.json",
        &json!({
            "source": token_source,
            "token_file": config.token_file.display().to_string(),
            "token_meta": {"len": token.as_ref().map(|t| t.chars().count())},
        }),
    );

    let Some(token) = token else {
        warn!(
            "no access token: provide --token, set {ENV_ACCESS_TOKEN}, put one into {}, \
             or run kinoprobe-auth to obtain one",
            config.token_file.display()
        );
        return Ok(RunReport {
            exit_code: 2,
            summary: RunSummary::default(),
            output_dir: writer.dir().to_path_buf(),
        });
    };
    debug_assert_ne!(token_source, TokenSource::Missing);

    let client = ApiClient::with_config(
        ClientConfig {
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
        },
        Some(token.clone()),
    )?;

    let mut summary = RunSummary::default();
    let mut ctx = RunContext::default();

    // Auth + account.
    match (&config.client_id, &config.client_secret) {
        (Some(id), Some(secret)) => summary.record(
            "test-auth-oauth2-device-flow",
            probes::auth::device_flow(&client, &writer, id, secret).await,
        ),
        _ => summary.record(
            "test-auth-oauth2-device-flow",
            TestOutcome::skip("client_id/client_secret not available"),
        ),
    }
    summary.record("test-user", probes::user::profile(&client, &writer).await);

    // Dictionaries.
    summary.record("test-references", probes::catalog::references(&client, &writer).await);
    summary.record("test-tv", probes::catalog::tv_channels(&client, &writer).await);
    summary.record("test-content-types", probes::catalog::content_types(&client, &writer).await);
    let (outcome, genre_id) = probes::catalog::genres(&client, &writer).await;
    summary.record("test-content-genres", outcome);
    ctx.genre_id = genre_id;
    summary.record("test-content-countries", probes::catalog::countries(&client, &writer).await);
    summary.record("test-content-subtitles", probes::catalog::subtitles(&client, &writer).await);

    // Listing + details; later probes depend on the ids picked here.
    let (outcome, item_id) = probes::items::listing(&client, &writer).await;
    summary.record("test-content-items", outcome);
    ctx.item_id = item_id;
    summary.record(
        "test-content-items-filters",
        probes::items::listing_filters(&client, &writer).await,
    );

    const SKIP_NO_ITEM: &str = "no item id available from /v1/items";
    match ctx.item_id {
        Some(item_id) => {
            let (outcome, media_id) = probes::items::details(&client, &writer, item_id).await;
            summary.record("test-content-item-details", outcome);
            ctx.media_id = media_id;
        }
        None => summary.record("test-content-item-details", TestOutcome::skip(SKIP_NO_ITEM)),
    }

    summary.record("test-content-search", probes::items::search(&client, &writer).await);
    match ctx.item_id {
        Some(item_id) => summary.record(
            "test-content-similar",
            probes::items::similar(&client, &writer, item_id).await,
        ),
        None => summary.record("test-content-similar", TestOutcome::skip(SKIP_NO_ITEM)),
    }

    for name in ["fresh", "hot", "popular"] {
        summary.record(
            format!("test-content-{name}"),
            probes::items::shortcut(&client, &writer, name, None).await,
        );
        match ctx.genre_id {
            Some(genre_id) => summary.record(
                format!("test-content-{name}-genre"),
                probes::items::shortcut(&client, &writer, name, Some(genre_id)).await,
            ),
            None => summary.record(
                format!("test-content-{name}-genre"),
                TestOutcome::skip("could not pick genre_id from /v1/genres"),
            ),
        }
    }

    match ctx.item_id {
        Some(item_id) => {
            summary.record(
                "test-content-trailer",
                probes::items::trailer(&client, &writer, item_id).await,
            );
            summary.record(
                "test-content-comments",
                probes::items::comments(&client, &writer, item_id).await,
            );
        }
        None => {
            summary.record("test-content-trailer", TestOutcome::skip(SKIP_NO_ITEM));
            summary.record("test-content-comments", TestOutcome::skip(SKIP_NO_ITEM));
        }
    }

    summary.record(
        "test-content-vote-mutating",
        match (config.include_mutating, ctx.item_id) {
            (false, _) => TestOutcome::skip(SKIP_MUTATING),
            (true, None) => TestOutcome::skip(SKIP_NO_ITEM),
            (true, Some(item_id)) => probes::items::vote(&client, &writer, item_id).await,
        },
    );

    // Media links.
    match ctx.media_id {
        Some(media_id) => {
            let (outcome, file_ref) = probes::media::links(&client, &writer, media_id).await;
            summary.record("test-content-media-links", outcome);
            ctx.media_file = file_ref;
        }
        None => summary.record(
            "test-content-media-links",
            TestOutcome::skip("no media id available from item details"),
        ),
    }
    match &ctx.media_file {
        Some(file_ref) => summary.record(
            "test-content-media-video-link",
            probes::media::video_link(&client, &writer, file_ref).await,
        ),
        None => summary.record(
            "test-content-media-video-link",
            TestOutcome::skip("no playable file picked from media-links"),
        ),
    }

    // Collections.
    let (outcome, collection_id) = probes::collections::listing(&client, &writer).await;
    summary.record("test-collections", outcome);
    ctx.collection_id = collection_id;
    summary.record(
        "test-collections-sort",
        probes::collections::sorted_listing(&client, &writer).await,
    );
    match ctx.collection_id {
        Some(collection_id) => summary.record(
            "test-collections-view",
            probes::collections::view(&client, &writer, collection_id).await,
        ),
        None => summary.record(
            "test-collections-view",
            TestOutcome::skip("no collection id available from /v1/collections"),
        ),
    }

    // Bookmarks.
    summary.record(
        "test-bookmarks-mutating",
        match (config.include_mutating, ctx.item_id) {
            (false, _) => TestOutcome::skip(SKIP_MUTATING),
            (true, None) => TestOutcome::skip(SKIP_NO_ITEM),
            (true, Some(item_id)) => probes::bookmarks::lifecycle(&client, &writer, item_id).await,
        },
    );

    // Watching.
    match ctx.item_id {
        Some(item_id) => summary.record(
            "test-watching",
            probes::watching::state(&client, &writer, item_id).await,
        ),
        None => summary.record("test-watching", TestOutcome::skip(SKIP_NO_ITEM)),
    }
    summary.record(
        "test-watching-mutating",
        match (config.include_mutating, ctx.item_id, ctx.media_id) {
            (false, _, _) => TestOutcome::skip(SKIP_MUTATING),
            (true, Some(item_id), Some(media_id)) => {
                probes::watching::mutations(&client, &writer, item_id, media_id).await
            }
            (true, _, _) => TestOutcome::skip("no media_id available for watching mutation tests"),
        },
    );

    // A serial item is only needed for the watchlist toggle and season clears.
    if config.include_mutating || config.include_destructive {
        ctx.serial_item_id = probes::items::pick_serial_item(&client, &writer).await;
    }

    summary.record(
        "test-watchlist-toggle-mutating",
        match (config.include_mutating, ctx.serial_item_id) {
            (false, _) => TestOutcome::skip(SKIP_MUTATING),
            (true, None) => {
                TestOutcome::skip("could not pick serial item id from /v1/items?type=serial")
            }
            (true, Some(serial_item_id)) => {
                probes::watching::watchlist_toggle(&client, &writer, serial_item_id).await
            }
        },
    );

    if config.include_destructive
        && let Some(serial_item_id) = ctx.serial_item_id
    {
        ctx.season_id = fetch_season_id(&client, &writer, serial_item_id).await;
    }

    // History.
    let (outcome, picked) = probes::history::listing(&client, &writer).await;
    summary.record("test-history", outcome);
    ctx.history_item_id = picked.item_id;
    ctx.history_media_id = picked.media_id;
    summary.record(
        "test-history-mutating",
        if config.include_destructive {
            probes::history::clears(
                &client,
                &writer,
                ctx.history_media_id,
                ctx.season_id,
                ctx.history_item_id.or(ctx.item_id),
            )
            .await
        } else {
            TestOutcome::skip(SKIP_DESTRUCTIVE)
        },
    );

    // Device.
    let (outcome, device_id) = probes::device::inventory(&client, &writer).await;
    summary.record("test-device", outcome);
    ctx.device_id = device_id;
    summary.record(
        "test-device-mutating",
        match (config.include_mutating, ctx.device_id) {
            (false, _) => TestOutcome::skip(SKIP_MUTATING),
            (true, None) => TestOutcome::skip("no device_id available"),
            (true, Some(device_id)) => probes::device::mutations(&client, &writer, device_id).await,
        },
    );

    // api2.
    if config.include_api2 {
        run_api2(config, &client, &writer, &token, &mut ctx, &mut summary).await?;
    } else {
        summary.record("test-api2", TestOutcome::skip("api2 tests not enabled (use --include-api2)"));
    }

    writer.write_json("summary.json", &summary);
    print_summary(&summary, &writer);

    let exit_code = if summary.has_failures() { 1 } else { 0 };
    Ok(RunReport {
        exit_code,
        summary,
        output_dir: writer.dir().to_path_buf(),
    })
}

/// Season id for a serial, from its details response
async fn fetch_season_id(
    client: &ApiClient,
    writer: &SnapshotWriter,
    serial_item_id: i64,
) -> Option<i64> {
    use crate::client::ApiRequest;
    use crate::snapshot::RequestDescriptor;

    let request = ApiRequest::get(format!("/v1/items/{serial_item_id}")).query("nolinks", 1);
    let response = client.execute(&request).await.ok()?;
    writer.write(
        "serial_item_details",
        &RequestDescriptor::for_request(&request, None),
        &response,
    );
    let item = response.json_get("item")?;
    crate::probes::pick_season_id_from_item(item)
}

async fn run_api2(
    config: &RunConfig,
    client: &ApiClient,
    writer: &SnapshotWriter,
    token: &str,
    ctx: &mut RunContext,
    summary: &mut RunSummary,
) -> Result<()> {
    let api2_base = config
        .api2_base_url
        .clone()
        .unwrap_or_else(|| derive_api2_base_url(client.base_url()));
    let api2_client = ApiClient::with_config(
        ClientConfig {
            base_url: api2_base,
            timeout_secs: config.timeout_secs,
        },
        Some(token.to_string()),
    )?;

    let (outcome, api2_item_id) = probes::api2::items_search(&api2_client, writer).await;
    summary.record("test-api2-items-search", outcome);

    let Some(chosen_item_id) = api2_item_id.or(ctx.item_id) else {
        for id in [
            "test-api2-item-details",
            "test-api2-item-collections",
            "test-api2-backdrop",
            "test-api2-imdb",
            "test-api2-notifications-mutating",
            "test-api2-upload-report",
        ] {
            summary.record(id, TestOutcome::skip("no item id available for api2 probes"));
        }
        return Ok(());
    };

    let (outcome, cross_refs) = probes::api2::item_details(&api2_client, writer, chosen_item_id).await;
    summary.record("test-api2-item-details", outcome);
    ctx.imdb_id = cross_refs.imdb_id;
    ctx.kinopoisk_id = cross_refs.kinopoisk_id;

    summary.record(
        "test-api2-item-collections",
        probes::api2::item_collections(&api2_client, writer, chosen_item_id).await,
    );

    match (ctx.imdb_id, ctx.kinopoisk_id) {
        (Some(imdb_id), Some(kinopoisk_id)) => {
            summary.record(
                "test-api2-backdrop",
                probes::api2::backdrop(&api2_client, writer, imdb_id, kinopoisk_id).await,
            );
            summary.record(
                "test-api2-imdb",
                probes::api2::imdb_lookup(&api2_client, writer, &imdb_id.to_string()).await,
            );
        }
        _ => {
            summary.record(
                "test-api2-backdrop",
                TestOutcome::skip("api2 backdrop skipped: could not extract imdb_id/kinopoisk_id"),
            );
            summary.record(
                "test-api2-imdb",
                TestOutcome::skip("api2 imdb skipped: could not extract imdb_id"),
            );
        }
    }

    summary.record(
        "test-api2-notifications-mutating",
        match (&config.api2_device_token, config.include_mutating) {
            (None, _) => TestOutcome::skip("api2 notifications skipped: provide --api2-device-token"),
            (Some(_), false) => TestOutcome::skip(SKIP_MUTATING),
            (Some(device_token), true) => {
                probes::api2::notifications(&api2_client, writer, chosen_item_id, device_token).await
            }
        },
    );

    summary.record(
        "test-api2-upload-report",
        match (config.api2_upload_report, config.include_mutating) {
            (false, _) => TestOutcome::skip("api2 upload_report skipped (enable with --api2-upload-report)"),
            (true, false) => TestOutcome::skip(SKIP_MUTATING),
            (true, true) => probes::api2::upload_report(&api2_client, writer, "kinoprobe_report.txt").await,
        },
    );

    Ok(())
}

/// How many error lines get printed per test before truncation
const MAX_PRINTED_ERRORS: usize = 10;

fn print_summary(summary: &RunSummary, writer: &SnapshotWriter) {
    println!();
    println!("API conformance summary");
    println!("- Output: {}", writer.dir().display());
    println!();
    for record in &summary.results {
        println!("{:<4} {}", record.status, record.id);
        for error in record.errors.iter().take(MAX_PRINTED_ERRORS) {
            println!("  - {error}");
        }
        if record.errors.len() > MAX_PRINTED_ERRORS {
            println!("  - ... {} more", record.errors.len() - MAX_PRINTED_ERRORS);
        }
    }
}
