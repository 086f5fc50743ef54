//! Extract pickup rows from the collection history page.

use once_cell::sync::Lazy;
use regex::Regex;

use super::FetchError;
use crate::snapshot::RawPickup;

/// Inline `<script>` bodies
static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>(.*?)</script>").expect("Invalid regex pattern"));

/// Marker identifying the chart script that embeds the pickup history
const DATA_MARKER: &str = "blackBinsData";

/// Assignment line holding the JSON rows, at the script's fixed indentation
const DATA_LINE_PREFIX: &str = "            res";

/// Parse the pickup rows embedded in the collection history page.
///
/// Expected shape inside one of the page's scripts:
/// ```text
///     var blackBinsData = ...;
///             res = [{"waste_type": "Black", "date_time": "...", "weight": "5.5"}, ...]
/// ```
pub fn extract_pickups(html: &str) -> Result<Vec<RawPickup>, FetchError> {
    for capture in SCRIPT_RE.captures_iter(html) {
        let body = &capture[1];
        if !body.contains(DATA_MARKER) {
            continue;
        }

        let Some(line) = body.lines().find(|l| l.starts_with(DATA_LINE_PREFIX)) else {
            continue;
        };
        let Some((_, json)) = line.trim().split_once('=') else {
            continue;
        };

        let json = json.trim().trim_end_matches(';');
        return Ok(serde_json::from_str(json)?);
    }

    Err(FetchError::MissingData)
}
