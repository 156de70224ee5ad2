//! Identifiers threaded between probes
//!
//! Probes discover identifiers opportunistically (the first item id from a
//! listing, the media id from item details) and later probes consume them.
//! Keeping every threadable identifier as an explicit optional field makes
//! the data flow visible at each call site; a missing field degrades the
//! dependent probes to SKIP, never aborts the run.

/// A playable file reference picked from the media-links response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileRef {
    /// Server-side file path as returned in `files[0].file`
    pub file: String,
    /// Preferred stream type (hls4 > hls2 > hls > http)
    pub stream_type: String,
}

/// All identifiers a run can discover and thread forward
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub genre_id: Option<i64>,
    pub item_id: Option<i64>,
    pub media_id: Option<i64>,
    pub collection_id: Option<i64>,
    pub device_id: Option<i64>,
    /// Serial (TV-series) item used for watchlist toggles and season lookup
    pub serial_item_id: Option<i64>,
    pub season_id: Option<i64>,
    pub media_file: Option<MediaFileRef>,
    /// Item/media ids observed in the watch history, preferred for clears
    pub history_item_id: Option<i64>,
    pub history_media_id: Option<i64>,
    /// Cross-reference ids surfaced by the unofficial api2 item details
    pub imdb_id: Option<i64>,
    pub kinopoisk_id: Option<i64>,
}
