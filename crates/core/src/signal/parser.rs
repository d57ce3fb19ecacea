use crate::signal::types::NewsItem;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub const MAX_ITEMS_PER_FEED: usize = 25;
pub const MAX_ITEMS_PER_ENTITY: usize = 50;

/// Extracts up to [`MAX_ITEMS_PER_FEED`] items from an RSS-style payload.
///
/// Parsing is tolerant: blocks without a title are skipped and text that contains no
/// well-formed `<item>` block yields an empty list.
pub fn parse_feed(text: &str) -> Vec<NewsItem> {
    let mut out = Vec::new();
    for block in item_blocks(text).take(MAX_ITEMS_PER_FEED) {
        let Some(title) = tag_text(block, "title") else {
            continue;
        };
        let publish_date = tag_text(block, "pubDate").and_then(|s| parse_publish_date(&s));
        out.push(NewsItem::new(title, publish_date));
    }
    out
}

/// Merges feeds in order, keeping the first item seen for each normalized title.
pub fn dedup_items<I>(feeds: I) -> Vec<NewsItem>
where
    I: IntoIterator<Item = Vec<NewsItem>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in feeds.into_iter().flatten() {
        if out.len() >= MAX_ITEMS_PER_ENTITY {
            break;
        }
        let key = normalize_title(&item.title);
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        out.push(item);
    }
    out
}

pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn item_blocks(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let start = find_open_tag(rest, "item")?;
        let body = &rest[start..];
        let open_end = body.find('>')? + 1;
        let close = body.find("</item>")?;
        if close < open_end {
            return None;
        }
        rest = &body[close + "</item>".len()..];
        Some(&body[open_end..close])
    })
}

// Matches `<tag>` and `<tag attr=..>` but not `<tagger>`.
fn find_open_tag(text: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut offset = 0;
    while let Some(pos) = text[offset..].find(&needle) {
        let at = offset + pos;
        let next = text[at + needle.len()..].chars().next();
        if matches!(next, Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r') | Some('/')) {
            return Some(at);
        }
        offset = at + needle.len();
    }
    None
}

fn tag_text(block: &str, tag: &str) -> Option<String> {
    let start = find_open_tag(block, tag)?;
    let body = &block[start..];
    let open_end = body.find('>')? + 1;
    let close = body.find(&format!("</{tag}>"))?;
    if close < open_end {
        return None;
    }
    let raw = body[open_end..close].trim();

    let text = match raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
    {
        Some(cdata) => cdata.trim().to_string(),
        None => decode_entities(raw),
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text.trim().to_string())
    }
}

fn decode_entities(s: &str) -> String {
    // `&amp;` goes last so "&amp;lt;" decodes to "&lt;" and not "<".
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn parse_publish_date(s: &str) -> Option<DateTime<Utc>> {
    let t = s.trim();
    DateTime::parse_from_rfc2822(t)
        .or_else(|_| DateTime::parse_from_rfc3339(t))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
