// src/feeds/normalize.rs
//! Content normalizer: raw payload entries → canonical [`FeedItem`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::feeds::error::FeedError;
use crate::feeds::payload::{RawEntry, RawPayload};
use crate::feeds::types::FeedItem;

/// Description budget in characters, before the ellipsis marker.
pub const DESCRIPTION_CAP: usize = 250;
pub const ELLIPSIS: &str = "...";
/// Items kept per source, in upstream order.
pub const MAX_ITEMS_PER_SOURCE: usize = 15;
pub const UNTITLED: &str = "Untitled";

/// Normalize a decoded payload, using the current time for undated items.
pub fn normalize(payload: &RawPayload, source_key: &str) -> Result<Vec<FeedItem>, FeedError> {
    normalize_at(payload, source_key, Utc::now())
}

/// Same as [`normalize`] with an explicit clock. Output is a pure function of
/// the arguments.
pub fn normalize_at(
    payload: &RawPayload,
    source_key: &str,
    now: DateTime<Utc>,
) -> Result<Vec<FeedItem>, FeedError> {
    let t0 = std::time::Instant::now();
    let entries = payload.entries()?;
    let items = normalize_entries(entries, source_key, now);

    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("feed_items_normalized_total").increment(items.len() as u64);
    Ok(items)
}

/// Clean every entry, drop repeated ids (first wins) and cap the list.
pub fn normalize_entries(
    entries: Vec<RawEntry>,
    source_key: &str,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len().min(MAX_ITEMS_PER_SOURCE));
    for entry in entries {
        let item = to_item(entry, source_key, now);
        if !seen.insert(item.unique_id.clone()) {
            continue;
        }
        out.push(item);
        if out.len() == MAX_ITEMS_PER_SOURCE {
            break;
        }
    }
    out
}

fn to_item(entry: RawEntry, source_key: &str, now: DateTime<Utc>) -> FeedItem {
    let title = entry
        .title
        .as_deref()
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let link = entry.link.as_deref().map(str::trim).unwrap_or_default().to_string();
    let description = truncate(
        &entry.description.as_deref().map(clean_text).unwrap_or_default(),
        DESCRIPTION_CAP,
    );
    let published_at = parse_date_or(entry.published.as_deref(), now);
    let unique_id = derive_unique_id(
        entry.id.as_deref(),
        &link,
        source_key,
        &title,
        &description,
    );
    let author = entry
        .author
        .as_deref()
        .map(clean_text)
        .filter(|a| !a.is_empty());

    FeedItem {
        title,
        link,
        description,
        published_at,
        unique_id,
        author,
    }
}

/// Strip tags, decode entities, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*?>").expect("tag regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));

    // 1) Tags first, so escaped markup survives as text
    let stripped = re_tags.replace_all(s, "");

    // 2) Entities, then typographic ellipsis to ASCII
    let decoded = html_escape::decode_html_entities(&stripped).replace('\u{2026}', ELLIPSIS);

    // 3) Whitespace (includes NBSP)
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Cap `s` at `cap` chars, appending [`ELLIPSIS`] when something was cut.
pub fn truncate(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        return s.to_string();
    }
    let mut out: String = s.chars().take(cap).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}

/// Lenient date parsing; `now` stands in for anything unparseable.
pub fn parse_date_or(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(parse_date)
        .unwrap_or(now)
}

pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// guid/id, else link, else a content hash over source, title and description.
pub fn derive_unique_id(
    id: Option<&str>,
    link: &str,
    source_key: &str,
    title: &str,
    description: &str,
) -> String {
    if let Some(id) = id.map(str::trim).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if !link.is_empty() {
        return link.to_string();
    }
    content_hash(&[source_key, title, description])
}

fn content_hash(parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut out = String::from("sha256:");
    for b in digest.iter().take(8) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
